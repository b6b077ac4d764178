//! Per-field wire encoding and decoding.
//!
//! # Design
//! The service transmits dates, booleans and tag lists as strings. Which
//! fields get which treatment is fixed by three disjoint name sets below;
//! they are static so no client instance can alter another's behavior.
//! Encoding is lenient: a value whose shape does not match its field's policy
//! is sent as-is. Decoding of timestamps is strict and reports `DateParse`.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};

/// Primary timestamp format, e.g. `2021-05-01T12:00:00Z`.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
/// Fallback timestamp format used by notes, e.g. `2021-05-01 12:00:00`.
pub const ALTERNATE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Calendar date format used by `posts/dates`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const DATE_FIELDS: &[&str] = &["dt", "date", "update_time", "created_at", "updated_at"];
pub const BOOLEAN_FIELDS: &[&str] = &["replace", "shared", "toread"];
pub const SPACE_DELIMITED_FIELDS: &[&str] = &["tag", "tags"];

/// Request flag the server expects as `1`/`0` instead of `yes`/`no`.
pub const META_FIELD: &str = "meta";

/// Which policy table a field name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Date,
    Boolean,
    SpaceDelimited,
}

impl FieldKind {
    pub fn of(name: &str) -> Option<Self> {
        if DATE_FIELDS.contains(&name) {
            Some(FieldKind::Date)
        } else if BOOLEAN_FIELDS.contains(&name) {
            Some(FieldKind::Boolean)
        } else if SPACE_DELIMITED_FIELDS.contains(&name) {
            Some(FieldKind::SpaceDelimited)
        } else {
            None
        }
    }
}

/// A caller-supplied argument value before wire encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Str(String),
    Int(i64),
    Bool(bool),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    List(Vec<String>),
}

impl Param {
    /// Truthiness used for the `meta` flag.
    pub fn is_truthy(&self) -> bool {
        match self {
            Param::Str(s) => !s.is_empty(),
            Param::Int(n) => *n != 0,
            Param::Bool(b) => *b,
            Param::DateTime(_) | Param::Date(_) => true,
            Param::List(items) => !items.is_empty(),
        }
    }
}

/// Plain stringification, applied to fields outside every policy table and
/// to values whose shape does not match their field's policy.
impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Str(s) => f.write_str(s),
            Param::Int(n) => write!(f, "{n}"),
            Param::Bool(b) => f.write_str(bool_to_str(*b)),
            Param::DateTime(dt) => write!(f, "{}", dt.format(ALTERNATE_DATETIME_FORMAT)),
            Param::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Param::List(items) => f.write_str(&items.join(" ")),
        }
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Param::Str(s.to_string())
    }
}

impl From<String> for Param {
    fn from(s: String) -> Self {
        Param::Str(s)
    }
}

impl From<&String> for Param {
    fn from(s: &String) -> Self {
        Param::Str(s.clone())
    }
}

impl From<i64> for Param {
    fn from(n: i64) -> Self {
        Param::Int(n)
    }
}

impl From<i32> for Param {
    fn from(n: i32) -> Self {
        Param::Int(i64::from(n))
    }
}

impl From<u32> for Param {
    fn from(n: u32) -> Self {
        Param::Int(i64::from(n))
    }
}

impl From<bool> for Param {
    fn from(b: bool) -> Self {
        Param::Bool(b)
    }
}

impl From<NaiveDateTime> for Param {
    fn from(dt: NaiveDateTime) -> Self {
        Param::DateTime(dt)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for Param {
    fn from(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Param::DateTime(dt.naive_utc())
    }
}

impl From<NaiveDate> for Param {
    fn from(d: NaiveDate) -> Self {
        Param::Date(d)
    }
}

impl From<Vec<String>> for Param {
    fn from(items: Vec<String>) -> Self {
        Param::List(items)
    }
}

impl From<&[&str]> for Param {
    fn from(items: &[&str]) -> Self {
        Param::List(items.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Param {
    fn from(items: [&str; N]) -> Self {
        Param::List(items.iter().map(|s| s.to_string()).collect())
    }
}

/// Render one argument for the query string according to its field's policy.
pub fn encode(name: &str, value: &Param) -> String {
    if name == META_FIELD {
        return if value.is_truthy() { "1" } else { "0" }.to_string();
    }
    match (FieldKind::of(name), value) {
        (Some(FieldKind::Date), Param::DateTime(dt)) => string_from_datetime(dt),
        (Some(FieldKind::Date), Param::Date(d)) => {
            string_from_datetime(&d.and_time(chrono::NaiveTime::MIN))
        }
        (Some(FieldKind::Boolean), Param::Bool(b)) => bool_to_str(*b).to_string(),
        (Some(FieldKind::SpaceDelimited), Param::List(items)) => join_list(items),
        _ => value.to_string(),
    }
}

pub fn string_from_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Parse a timestamp in the primary format, falling back to the alternate one.
pub fn datetime_from_str(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, ALTERNATE_DATETIME_FORMAT))
        .ok()
}

/// Like `datetime_from_str`, reporting the offending field on failure.
pub fn decode_datetime(field: &str, value: &str) -> Result<NaiveDateTime> {
    datetime_from_str(value).ok_or_else(|| Error::DateParse {
        field: field.to_string(),
        value: value.to_string(),
    })
}

pub fn decode_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| Error::DateParse {
        field: field.to_string(),
        value: value.to_string(),
    })
}

pub fn bool_to_str(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

pub fn bool_from_str(value: &str) -> bool {
    value == "yes"
}

pub fn join_list(items: &[String]) -> String {
    items.join(" ")
}

/// Split a space-delimited list. An empty string is an empty list.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(' ')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn policy_tables_are_disjoint() {
        for name in DATE_FIELDS {
            assert!(!BOOLEAN_FIELDS.contains(name));
            assert!(!SPACE_DELIMITED_FIELDS.contains(name));
        }
        for name in BOOLEAN_FIELDS {
            assert!(!SPACE_DELIMITED_FIELDS.contains(name));
        }
        assert!(FieldKind::of(META_FIELD).is_none());
    }

    #[test]
    fn boolean_fields_round_trip() {
        for field in BOOLEAN_FIELDS {
            for b in [true, false] {
                let wire = encode(field, &Param::Bool(b));
                assert!(wire == "yes" || wire == "no");
                assert_eq!(bool_from_str(&wire), b);
            }
        }
    }

    #[test]
    fn boolean_field_string_passes_through() {
        assert_eq!(encode("shared", &Param::from("no")), "no");
        assert_eq!(encode("toread", &Param::from("maybe")), "maybe");
    }

    #[test]
    fn list_fields_round_trip() {
        let tags = vec!["rust".to_string(), "api".to_string(), "to-read".to_string()];
        for field in SPACE_DELIMITED_FIELDS {
            let wire = encode(field, &Param::List(tags.clone()));
            assert_eq!(wire, "rust api to-read");
            assert_eq!(split_list(&wire), tags);
        }
    }

    #[test]
    fn list_field_string_passes_through() {
        assert_eq!(encode("tags", &Param::from("already joined")), "already joined");
    }

    #[test]
    fn empty_list_string_splits_to_nothing() {
        assert!(split_list("").is_empty());
    }

    #[test]
    fn datetime_round_trip() {
        let t = at(2021, 5, 1, 12, 0, 0);
        let wire = encode("dt", &Param::DateTime(t));
        assert_eq!(wire, "2021-05-01T12:00:00Z");
        assert_eq!(decode_datetime("dt", &wire).unwrap(), t);
    }

    #[test]
    fn date_value_encodes_as_midnight() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(encode("date", &Param::Date(d)), "2024-02-29T00:00:00Z");
    }

    #[test]
    fn date_field_string_passes_through() {
        assert_eq!(encode("dt", &Param::from("yesterday")), "yesterday");
    }

    #[test]
    fn alternate_format_is_accepted() {
        let t = decode_datetime("created_at", "2012-08-09 17:28:14").unwrap();
        assert_eq!(t, at(2012, 8, 9, 17, 28, 14));
    }

    #[test]
    fn unparseable_timestamp_reports_field() {
        let err = decode_datetime("update_time", "last tuesday").unwrap_err();
        match err {
            Error::DateParse { field, value } => {
                assert_eq!(field, "update_time");
                assert_eq!(value, "last tuesday");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn meta_uses_one_and_zero() {
        assert_eq!(encode("meta", &Param::Bool(true)), "1");
        assert_eq!(encode("meta", &Param::Bool(false)), "0");
        assert_eq!(encode("meta", &Param::from("yes")), "1");
        assert_eq!(encode("meta", &Param::from("")), "0");
        assert_eq!(encode("meta", &Param::Int(0)), "0");
    }

    #[test]
    fn unknown_fields_are_stringified() {
        assert_eq!(encode("count", &Param::Int(15)), "15");
        assert_eq!(encode("url", &Param::from("http://example.com")), "http://example.com");
    }
}
