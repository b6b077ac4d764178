//! Verify call building and reply parsing against JSON test vectors stored in
//! `test-vectors/`.
//!
//! Each case gives a call path and arguments, the query parameters the built
//! URL must carry, a simulated response, and the expected reply. Queries are
//! compared as decoded key/value pairs so parameter ordering does not matter.

use std::collections::HashMap;

use pinboard_core::{Error, HttpResponse, Param, Pinboard, Reply};
use serde_json::Value;

/// Map a JSON argument value onto the `Param` a caller would pass.
fn param(value: &Value) -> Param {
    match value {
        Value::String(s) => Param::Str(s.clone()),
        Value::Bool(b) => Param::Bool(*b),
        Value::Number(n) => Param::Int(n.as_i64().unwrap()),
        Value::Array(items) => Param::List(
            items
                .iter()
                .map(|i| i.as_str().unwrap().to_string())
                .collect(),
        ),
        other => panic!("unsupported argument: {other}"),
    }
}

fn check_reply(name: &str, result: Result<Reply, Error>, expected: &Value) {
    let kind = expected["kind"].as_str().unwrap();
    if kind == "error" {
        let err = result.expect_err(name);
        match expected["error"].as_str().unwrap() {
            "application" => match err {
                Error::Application(code) => {
                    assert_eq!(code, expected["message"].as_str().unwrap(), "{name}")
                }
                other => panic!("{name}: expected application error, got {other:?}"),
            },
            "authentication" => assert!(matches!(err, Error::Authentication), "{name}"),
            "service_unavailable" => assert!(matches!(err, Error::ServiceUnavailable), "{name}"),
            "date_parse" => assert!(matches!(err, Error::DateParse { .. }), "{name}"),
            other => panic!("{name}: unknown error kind {other}"),
        }
        return;
    }

    let reply = result.unwrap_or_else(|e| panic!("{name}: {e}"));
    assert_eq!(reply.kind(), kind, "{name}: reply kind");
    match reply {
        Reply::Done => {}
        Reply::Tags(tags) => {
            let got: Vec<Value> = tags
                .iter()
                .map(|t| serde_json::json!([t.name, t.count]))
                .collect();
            assert_eq!(Value::Array(got), expected["tags"], "{name}");
        }
        Reply::UpdateTime(t) => {
            assert_eq!(
                t.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                expected["value"].as_str().unwrap(),
                "{name}"
            );
        }
        Reply::Bookmarks(bookmarks) => {
            let hashes: Vec<&str> = bookmarks.iter().map(|b| b.hash.as_str()).collect();
            assert_eq!(serde_json::json!(hashes), expected["hashes"], "{name}");
        }
        Reply::Posts(page) => {
            let hashes: Vec<&str> = page.posts.iter().map(|b| b.hash.as_str()).collect();
            assert_eq!(serde_json::json!(hashes), expected["hashes"], "{name}");
        }
        Reply::Document(doc) => {
            for (key, value) in expected["fields"].as_object().unwrap() {
                assert_eq!(doc.json(key), Some(value), "{name}: field {key}");
            }
        }
        Reply::Raw(response) => {
            assert_eq!(response.body, expected["body"].as_str().unwrap(), "{name}");
        }
        other => panic!("{name}: no check for {} replies", other.kind()),
    }
}

#[test]
fn call_test_vectors() {
    let raw = include_str!("../../test-vectors/calls.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let pinboard = Pinboard::new(vectors["token"].as_str().unwrap());

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let path: Vec<&str> = case["path"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s.as_str().unwrap())
            .collect();

        // Build
        let mut call = pinboard.call(path[0]);
        for segment in &path[1..] {
            call = call.segment(*segment);
        }
        for (key, value) in case["args"].as_object().unwrap() {
            call = call.arg(key.as_str(), param(value));
        }
        let prepared = call.build();
        assert_eq!(prepared.path().to_string(), path.join("/"), "{name}: path");

        let url = url::Url::parse(&prepared.request().url).unwrap();
        assert_eq!(url.path(), format!("/v1/{}", path.join("/")), "{name}: url path");
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
        for (key, value) in case["expected_query"].as_object().unwrap() {
            assert_eq!(
                query.get(key).map(String::as_str),
                value.as_str(),
                "{name}: query {key}"
            );
        }
        assert!(!query.contains_key("parse_response"), "{name}: control flag leaked");
        assert_eq!(query["format"], "json", "{name}: format");

        // Parse
        let sim = &case["simulated_response"];
        let response = HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: sim["body"].as_str().unwrap().to_string(),
        };
        check_reply(name, prepared.parse(response), &case["expected_result"]);
    }
}
