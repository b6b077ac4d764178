//! Domain entities and decoded reply values.
//!
//! # Design
//! `Bookmark` and `Tag` are built only from decoded response payloads.
//! A `Bookmark` keeps a `Pinboard` handle so it can save or delete itself.
//! That handle is shared ownership of the immutable token, base URL and
//! transport, nothing more: it carries no client state, it outlives the
//! `Pinboard` value the bookmark was fetched with, and the client never
//! holds bookmarks, so there is no ownership cycle.
//!
//! `Bookmark` equality is deliberately asymmetric. `==` compares the `hash`
//! identifier while `!=` compares the `meta` fingerprint, so `a != b` asks
//! "has this bookmark changed?" rather than "is this a different bookmark?".
//! Both can be true at once. Ordering compares creation time only.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use url::Position;

use crate::client::{Pinboard, PreparedCall};
use crate::error::{Error, Result};
use crate::http::HttpResponse;
use crate::policy::{self, Param};

/// Bookmark record as the service sends it.
#[derive(Debug, Deserialize)]
pub(crate) struct RawBookmark {
    pub description: String,
    #[serde(default)]
    pub extended: String,
    pub href: String,
    #[serde(default)]
    pub meta: String,
    pub hash: String,
    #[serde(default)]
    pub shared: String,
    #[serde(default)]
    pub toread: String,
    #[serde(default)]
    pub tags: String,
    pub time: String,
}

/// One saved link.
#[derive(Clone)]
pub struct Bookmark {
    /// The bookmark title.
    pub description: String,
    pub extended: String,
    pub url: String,
    /// Fingerprint over tags, privacy and read state.
    pub meta: String,
    /// Stable identifier.
    pub hash: String,
    pub shared: bool,
    pub toread: bool,
    pub tags: Vec<String>,
    pub time: NaiveDateTime,
    client: Pinboard,
}

impl Bookmark {
    pub(crate) fn from_raw(raw: RawBookmark, client: &Pinboard) -> Result<Self> {
        Ok(Self {
            time: policy::decode_datetime("time", &raw.time)?,
            description: raw.description,
            extended: raw.extended,
            url: raw.href,
            meta: raw.meta,
            hash: raw.hash,
            shared: policy::bool_from_str(&raw.shared),
            toread: policy::bool_from_str(&raw.toread),
            tags: policy::split_list(&raw.tags),
            client: client.clone(),
        })
    }

    pub(crate) fn from_value(value: Value, client: &Pinboard) -> Result<Self> {
        let raw: RawBookmark = serde_json::from_value(value)?;
        Self::from_raw(raw, client)
    }

    /// The client this bookmark was fetched with.
    pub fn pinboard(&self) -> &Pinboard {
        &self.client
    }

    /// Prepare the `posts/add` call that overwrites this bookmark server-side.
    ///
    /// With `update_time` the bookmark's own timestamp is sent as `dt`,
    /// otherwise the service stamps the save with the current time.
    pub fn build_save(&self, update_time: bool) -> PreparedCall {
        let mut call = self
            .client
            .posts()
            .segment("add")
            .arg("url", self.url.as_str())
            .arg("description", self.description.as_str())
            .arg("extended", self.extended.as_str())
            .arg("tags", Param::List(self.tags.clone()))
            .arg("shared", self.shared)
            .arg("toread", self.toread);
        if update_time {
            call = call.arg("dt", self.time);
        }
        call.build()
    }

    /// Persist every mutable field with `posts/add`.
    pub fn save(&self, update_time: bool) -> Result<()> {
        self.client.send(self.build_save(update_time))?.into_done()
    }

    pub fn build_delete(&self) -> PreparedCall {
        self.client
            .posts()
            .segment("delete")
            .arg("url", self.url.as_str())
            .build()
    }

    /// Ask the service to delete the bookmark stored under this URL.
    pub fn delete(&self) -> Result<()> {
        self.client.send(self.build_delete())?.into_done()
    }
}

#[allow(clippy::partialeq_ne_impl)]
impl PartialEq for Bookmark {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }

    fn ne(&self, other: &Self) -> bool {
        self.meta != other.meta
    }
}

impl PartialOrd for Bookmark {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.time.cmp(&other.time))
    }
}

impl fmt::Debug for Bookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bookmark")
            .field("description", &self.description)
            .field("url", &self.url)
            .field("hash", &self.hash)
            .field("meta", &self.meta)
            .field("shared", &self.shared)
            .field("toread", &self.toread)
            .field("tags", &self.tags)
            .field("time", &self.time)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Bookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let host = url::Url::parse(&self.url)
            .map(|u| u[Position::BeforeUsername..Position::AfterPort].to_string())
            .unwrap_or_default();
        write!(
            f,
            "<Bookmark description=\"{}\" url=\"{}\">",
            self.description, host
        )
    }
}

/// A tag and the number of bookmarks carrying it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag {
    pub name: String,
    pub count: u64,
}

impl Tag {
    pub(crate) fn from_entry(name: String, count: &Value) -> Result<Self> {
        let count = count_from_value(count).ok_or_else(|| {
            Error::Deserialization(format!("tag {name:?} has non-numeric count {count}"))
        })?;
        Ok(Self { name, count })
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Tag name=\"{}\" count={}>", self.name, self.count)
    }
}

/// Counts arrive as strings (`"10"`) but numbers are accepted too.
pub(crate) fn count_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

/// A response field after timestamp decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Time(NaiveDateTime),
    Json(Value),
}

/// A decoded JSON object whose date-valued fields hold parsed timestamps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document(BTreeMap<String, Field>);

impl Document {
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.0.get(name)
    }

    pub fn time(&self, name: &str) -> Option<NaiveDateTime> {
        match self.0.get(name) {
            Some(Field::Time(t)) => Some(*t),
            _ => None,
        }
    }

    pub fn json(&self, name: &str) -> Option<&Value> {
        match self.0.get(name) {
            Some(Field::Json(v)) => Some(v),
            _ => None,
        }
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.json(name).and_then(Value::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, field: Field) {
        self.0.insert(name.into(), field);
    }

    pub fn remove(&mut self, name: &str) -> Option<Field> {
        self.0.remove(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Field)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Field)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Field)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// `posts/get` and `posts/recent`: bookmarks plus the envelope fields.
#[derive(Debug, Clone)]
pub struct PostsPage {
    pub posts: Vec<Bookmark>,
    /// Everything except `posts`, e.g. `date` and `user`.
    pub fields: Document,
}

impl PostsPage {
    pub fn date(&self) -> Option<NaiveDateTime> {
        self.fields.time("date")
    }

    pub fn user(&self) -> Option<&str> {
        self.fields.str("user")
    }
}

/// `posts/dates`: bookmark counts per calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DateHistogram {
    pub dates: BTreeMap<NaiveDate, u64>,
    pub fields: Document,
}

/// `notes/list`: note summaries with their timestamps decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteList {
    pub notes: Vec<Document>,
    pub fields: Document,
}

/// The typed result of a call, chosen by its call path.
#[derive(Debug, Clone)]
pub enum Reply {
    /// `posts/all`
    Bookmarks(Vec<Bookmark>),
    /// `posts/get`, `posts/recent`
    Posts(PostsPage),
    /// `posts/dates`
    Dates(DateHistogram),
    /// `posts/update`
    UpdateTime(NaiveDateTime),
    /// `tags/get`, sorted by name
    Tags(Vec<Tag>),
    /// `notes/list`
    Notes(NoteList),
    /// `result_code` was `"done"`.
    Done,
    Document(Document),
    /// A payload that is not a JSON object.
    Json(Value),
    /// Returned untouched when the call was made with `parse_response = false`.
    Raw(HttpResponse),
}

impl Reply {
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Bookmarks(_) => "bookmarks",
            Reply::Posts(_) => "posts",
            Reply::Dates(_) => "dates",
            Reply::UpdateTime(_) => "update_time",
            Reply::Tags(_) => "tags",
            Reply::Notes(_) => "notes",
            Reply::Done => "done",
            Reply::Document(_) => "document",
            Reply::Json(_) => "json",
            Reply::Raw(_) => "raw",
        }
    }

    fn unexpected<T>(self, expected: &'static str) -> Result<T> {
        Err(Error::UnexpectedReply {
            expected,
            actual: self.kind(),
        })
    }

    /// True for `Done`.
    pub fn is_done(&self) -> bool {
        matches!(self, Reply::Done)
    }

    pub fn into_done(self) -> Result<()> {
        match self {
            Reply::Done => Ok(()),
            other => other.unexpected("done"),
        }
    }

    pub fn into_bookmarks(self) -> Result<Vec<Bookmark>> {
        match self {
            Reply::Bookmarks(b) => Ok(b),
            other => other.unexpected("bookmarks"),
        }
    }

    pub fn into_posts(self) -> Result<PostsPage> {
        match self {
            Reply::Posts(p) => Ok(p),
            other => other.unexpected("posts"),
        }
    }

    pub fn into_dates(self) -> Result<DateHistogram> {
        match self {
            Reply::Dates(d) => Ok(d),
            other => other.unexpected("dates"),
        }
    }

    pub fn into_update_time(self) -> Result<NaiveDateTime> {
        match self {
            Reply::UpdateTime(t) => Ok(t),
            other => other.unexpected("update_time"),
        }
    }

    pub fn into_tags(self) -> Result<Vec<Tag>> {
        match self {
            Reply::Tags(t) => Ok(t),
            other => other.unexpected("tags"),
        }
    }

    pub fn into_notes(self) -> Result<NoteList> {
        match self {
            Reply::Notes(n) => Ok(n),
            other => other.unexpected("notes"),
        }
    }

    pub fn into_document(self) -> Result<Document> {
        match self {
            Reply::Document(d) => Ok(d),
            other => other.unexpected("document"),
        }
    }

    pub fn into_json(self) -> Result<Value> {
        match self {
            Reply::Json(v) => Ok(v),
            other => other.unexpected("json"),
        }
    }

    pub fn into_raw(self) -> Result<HttpResponse> {
        match self {
            Reply::Raw(r) => Ok(r),
            other => other.unexpected("raw"),
        }
    }
}
