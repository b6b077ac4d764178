//! Turns a decoded JSON payload into a `Reply` chosen by call path.
//!
//! Top-level date-valued fields of an object payload are parsed first. Paths
//! containing a `tags` segment skip that pass since their keys are tag names.
//! Then:
//!
//! | path                        | reply                                  |
//! |-----------------------------|----------------------------------------|
//! | `posts/all`                 | `Bookmarks`, in server order           |
//! | `posts/get`, `posts/recent` | `Posts` with `posts` typed             |
//! | `posts/dates`               | `Dates` keyed by calendar day          |
//! | `posts/update`              | `UpdateTime` alone                     |
//! | `tags/get`                  | `Tags` sorted by name                  |
//! | `notes/list`                | `Notes` with each note's dates decoded |
//! | anything else               | `Done`, `Application` error, or `Document` |

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::warn;

use crate::client::{CallPath, Pinboard};
use crate::error::{Error, Result};
use crate::policy::{self, DATE_FIELDS};
use crate::types::{
    count_from_value, Bookmark, DateHistogram, Document, Field, NoteList, PostsPage, Reply, Tag,
};

const RESULT_CODE: &str = "result_code";
const RESULT_DONE: &str = "done";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    PostsAll,
    PostsPage,
    PostsDates,
    PostsUpdate,
    TagsGet,
    NotesList,
    Other,
}

impl Endpoint {
    fn of(path: &CallPath) -> Self {
        if path.is(&["posts", "all"]) {
            Endpoint::PostsAll
        } else if path.is(&["posts", "get"]) || path.is(&["posts", "recent"]) {
            Endpoint::PostsPage
        } else if path.is(&["posts", "dates"]) {
            Endpoint::PostsDates
        } else if path.is(&["posts", "update"]) {
            Endpoint::PostsUpdate
        } else if path.is(&["tags", "get"]) {
            Endpoint::TagsGet
        } else if path.is(&["notes", "list"]) {
            Endpoint::NotesList
        } else {
            Endpoint::Other
        }
    }
}

/// Parse a response body and type it for `path`.
pub fn map_reply(path: &CallPath, body: &str, client: &Pinboard) -> Result<Reply> {
    let value: Value = serde_json::from_str(body)?;
    map_value(path, value, client)
}

pub fn map_value(path: &CallPath, value: Value, client: &Pinboard) -> Result<Reply> {
    let endpoint = Endpoint::of(path);
    let map = match (endpoint, value) {
        (Endpoint::PostsAll, Value::Array(items)) => {
            return bookmarks(items, client).map(Reply::Bookmarks);
        }
        (Endpoint::PostsAll, other) => {
            return Err(Error::Deserialization(format!(
                "posts/all: expected an array, got {}",
                kind_of(&other)
            )));
        }
        (_, Value::Object(map)) => map,
        (_, other) => return Ok(Reply::Json(other)),
    };

    if endpoint == Endpoint::TagsGet {
        return tags(map).map(Reply::Tags);
    }

    let mut doc = if path.contains("tags") {
        plain_document(map)
    } else {
        decode_document(map)?
    };

    match endpoint {
        Endpoint::PostsPage => {
            let items = take_array(&mut doc, "posts")?;
            Ok(Reply::Posts(PostsPage {
                posts: bookmarks(items, client)?,
                fields: doc,
            }))
        }
        Endpoint::PostsDates => {
            let dates = take_object(&mut doc, "dates")?;
            Ok(Reply::Dates(DateHistogram {
                dates: date_counts(dates)?,
                fields: doc,
            }))
        }
        Endpoint::PostsUpdate => match doc.remove("update_time") {
            Some(Field::Time(t)) => Ok(Reply::UpdateTime(t)),
            _ => Err(Error::Deserialization(
                "posts/update: missing update_time".to_string(),
            )),
        },
        Endpoint::NotesList => {
            let notes = take_array(&mut doc, "notes")?
                .into_iter()
                .map(|note| match note {
                    Value::Object(map) => decode_document(map),
                    other => Err(Error::Deserialization(format!(
                        "notes/list: expected note object, got {}",
                        kind_of(&other)
                    ))),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Reply::Notes(NoteList { notes, fields: doc }))
        }
        _ => result_code(path, doc),
    }
}

/// Generic paths: interpret `result_code` when present.
fn result_code(path: &CallPath, doc: Document) -> Result<Reply> {
    let Some(code) = doc.json(RESULT_CODE) else {
        return Ok(Reply::Document(doc));
    };
    match code.as_str() {
        Some(RESULT_DONE) => Ok(Reply::Done),
        Some(other) => {
            warn!(path = %path, result_code = other, "call failed");
            Err(Error::Application(other.to_string()))
        }
        None => {
            warn!(path = %path, result_code = %code, "call failed");
            Err(Error::Application(code.to_string()))
        }
    }
}

/// Parse every date-valued field of an object.
pub(crate) fn decode_document(map: Map<String, Value>) -> Result<Document> {
    map.into_iter()
        .map(|(name, value)| {
            if !DATE_FIELDS.contains(&name.as_str()) {
                return Ok((name, Field::Json(value)));
            }
            let time = match &value {
                Value::String(s) => policy::decode_datetime(&name, s)?,
                other => {
                    return Err(Error::DateParse {
                        value: other.to_string(),
                        field: name,
                    })
                }
            };
            Ok((name, Field::Time(time)))
        })
        .collect()
}

fn plain_document(map: Map<String, Value>) -> Document {
    map.into_iter()
        .map(|(name, value)| (name, Field::Json(value)))
        .collect()
}

fn bookmarks(items: Vec<Value>, client: &Pinboard) -> Result<Vec<Bookmark>> {
    items
        .into_iter()
        .map(|item| Bookmark::from_value(item, client))
        .collect()
}

fn tags(map: Map<String, Value>) -> Result<Vec<Tag>> {
    let mut tags = map
        .into_iter()
        .map(|(name, count)| Tag::from_entry(name, &count))
        .collect::<Result<Vec<_>>>()?;
    tags.sort();
    Ok(tags)
}

fn date_counts(dates: Map<String, Value>) -> Result<BTreeMap<chrono::NaiveDate, u64>> {
    dates
        .into_iter()
        .map(|(day, count)| {
            let date = policy::decode_date("dates", &day)?;
            let count = count_from_value(&count).ok_or_else(|| {
                Error::Deserialization(format!("posts/dates: non-numeric count for {day}"))
            })?;
            Ok((date, count))
        })
        .collect()
}

fn take_array(doc: &mut Document, name: &str) -> Result<Vec<Value>> {
    match doc.remove(name) {
        Some(Field::Json(Value::Array(items))) => Ok(items),
        _ => Err(Error::Deserialization(format!(
            "expected array field {name:?}"
        ))),
    }
}

fn take_object(doc: &mut Document, name: &str) -> Result<Map<String, Value>> {
    match doc.remove(name) {
        Some(Field::Json(Value::Object(map))) => Ok(map),
        _ => Err(Error::Deserialization(format!(
            "expected object field {name:?}"
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
