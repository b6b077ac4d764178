//! Root client, call-path builder and named endpoints.
//!
//! # Design
//! `Pinboard` owns the immutable auth token, the API base URL and a shared
//! `Transport`. It is a cheap `Arc` handle, safe to clone into any number of
//! independent call chains.
//!
//! A call starts at a root segment (`pinboard.posts()`, or `pinboard.call(..)`
//! for anything) and grows with `segment`. The builder knows nothing about
//! which paths exist; an unknown path is only rejected by the service.
//! `Call::build` freezes the path and arguments into a `PreparedCall` holding
//! a plain `HttpRequest`, and `PreparedCall::parse` turns the matching
//! `HttpResponse` into a `Reply`. `Pinboard::send` does both around a single
//! `Transport::execute`, so the build and parse halves stay usable without I/O.
//!
//! The named methods (`posts_add`, `tags_get`, ...) are thin wrappers that
//! fill in the documented arguments and unwrap the expected `Reply` variant.

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::{HttpRequest, HttpResponse, Transport, UreqTransport, AUTH_TOKEN_PARAM};
use crate::mapper;
use crate::policy::{self, Param};
use crate::types::{Bookmark, DateHistogram, Document, NoteList, PostsPage, Reply, Tag};

pub const DEFAULT_BASE_URL: &str = "https://api.pinboard.in/v1";

const FORMAT_PARAM: &str = "format";
const PARSE_RESPONSE_ARG: &str = "parse_response";

/// The API credential, `username:HEX`. Never shown by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The username part of the token, if it has one.
    pub fn username(&self) -> Option<&str> {
        self.0.split_once(':').map(|(user, _)| user)
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

struct Inner {
    token: AuthToken,
    base_url: String,
    transport: Arc<dyn Transport>,
}

/// Client for the Pinboard v1 API.
#[derive(Clone)]
pub struct Pinboard {
    inner: Arc<Inner>,
}

impl fmt::Debug for Pinboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pinboard")
            .field("token", &self.inner.token)
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl Pinboard {
    /// Client talking to the public API over `ureq`.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_transport(token, UreqTransport::new())
    }

    pub fn with_transport(token: impl Into<String>, transport: impl Transport + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                token: AuthToken::new(token),
                base_url: DEFAULT_BASE_URL.to_string(),
                transport: Arc::new(transport),
            }),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_transport(
            config.token.clone(),
            UreqTransport::with_timeout(config.timeout),
        )
        .with_base_url(&config.base_url)
    }

    /// Point the client at another server, e.g. a local mock.
    pub fn with_base_url(self, base_url: &str) -> Self {
        Self {
            inner: Arc::new(Inner {
                token: self.inner.token.clone(),
                base_url: base_url.trim_end_matches('/').to_string(),
                transport: Arc::clone(&self.inner.transport),
            }),
        }
    }

    pub fn token(&self) -> &AuthToken {
        &self.inner.token
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Start a call at an arbitrary root segment.
    pub fn call(&self, root: impl Into<String>) -> Call {
        Call {
            client: self.clone(),
            path: CallPath::new(root),
            args: Vec::new(),
            parse_response: true,
        }
    }

    pub fn posts(&self) -> Call {
        self.call("posts")
    }

    pub fn tags(&self) -> Call {
        self.call("tags")
    }

    pub fn notes(&self) -> Call {
        self.call("notes")
    }

    pub fn user(&self) -> Call {
        self.call("user")
    }

    /// Execute a prepared call on this client's transport and parse the reply.
    pub fn send(&self, call: PreparedCall) -> Result<Reply> {
        let response = self.inner.transport.execute(call.request())?;
        call.parse(response)
    }

    /// Timestamp of the most recent change to any bookmark.
    pub fn posts_update(&self) -> Result<NaiveDateTime> {
        self.posts().segment("update").send()?.into_update_time()
    }

    pub fn posts_add(&self, post: &NewPost) -> Result<()> {
        let mut call = self
            .posts()
            .segment("add")
            .arg("url", post.url.as_str())
            .arg("description", post.description.as_str());
        if let Some(extended) = &post.extended {
            call = call.arg("extended", extended);
        }
        if !post.tags.is_empty() {
            call = call.arg("tags", post.tags.clone());
        }
        if let Some(dt) = post.dt {
            call = call.arg("dt", dt);
        }
        if let Some(replace) = post.replace {
            call = call.arg("replace", replace);
        }
        if let Some(shared) = post.shared {
            call = call.arg("shared", shared);
        }
        if let Some(toread) = post.toread {
            call = call.arg("toread", toread);
        }
        call.send()?.into_done()
    }

    pub fn posts_delete(&self, url: &str) -> Result<()> {
        self.posts().segment("delete").arg("url", url).send()?.into_done()
    }

    pub fn posts_get(&self, query: &PostsQuery) -> Result<PostsPage> {
        let mut call = self.posts().segment("get");
        if !query.tags.is_empty() {
            call = call.arg("tag", query.tags.clone());
        }
        if let Some(dt) = query.dt {
            call = call.arg("dt", dt);
        }
        if let Some(url) = &query.url {
            call = call.arg("url", url);
        }
        if query.meta {
            call = call.arg(policy::META_FIELD, true);
        }
        call.send()?.into_posts()
    }

    pub fn posts_recent(&self, tags: &[String], count: Option<u32>) -> Result<PostsPage> {
        let mut call = self.posts().segment("recent");
        if !tags.is_empty() {
            call = call.arg("tag", tags.to_vec());
        }
        if let Some(count) = count {
            call = call.arg("count", count);
        }
        call.send()?.into_posts()
    }

    pub fn posts_dates(&self, tags: &[String]) -> Result<DateHistogram> {
        let mut call = self.posts().segment("dates");
        if !tags.is_empty() {
            call = call.arg("tag", tags.to_vec());
        }
        call.send()?.into_dates()
    }

    pub fn posts_all(&self, query: &AllPostsQuery) -> Result<Vec<Bookmark>> {
        let mut call = self.posts().segment("all");
        if !query.tags.is_empty() {
            call = call.arg("tag", query.tags.clone());
        }
        if let Some(start) = query.start {
            call = call.arg("start", start);
        }
        if let Some(results) = query.results {
            call = call.arg("results", results);
        }
        // Not in the date table, so format them here.
        if let Some(fromdt) = &query.fromdt {
            call = call.arg("fromdt", policy::string_from_datetime(fromdt));
        }
        if let Some(todt) = &query.todt {
            call = call.arg("todt", policy::string_from_datetime(todt));
        }
        if query.meta {
            call = call.arg(policy::META_FIELD, true);
        }
        call.send()?.into_bookmarks()
    }

    /// Popular and recommended tags for a URL.
    pub fn posts_suggest(&self, url: &str) -> Result<Value> {
        self.posts().segment("suggest").arg("url", url).send()?.into_json()
    }

    pub fn tags_get(&self) -> Result<Vec<Tag>> {
        self.tags().segment("get").send()?.into_tags()
    }

    pub fn tags_delete(&self, tag: &str) -> Result<Document> {
        self.tags().segment("delete").arg("tag", tag).send()?.into_document()
    }

    pub fn tags_rename(&self, old: &str, new: &str) -> Result<Document> {
        self.tags()
            .segment("rename")
            .arg("old", old)
            .arg("new", new)
            .send()?
            .into_document()
    }

    pub fn user_secret(&self) -> Result<Document> {
        self.user().segment("secret").send()?.into_document()
    }

    pub fn user_api_token(&self) -> Result<Document> {
        self.user().segment("api_token").send()?.into_document()
    }

    pub fn notes_list(&self) -> Result<NoteList> {
        self.notes().segment("list").send()?.into_notes()
    }

    /// A single note with its text.
    pub fn note(&self, id: &str) -> Result<Document> {
        self.notes().segment(id).send()?.into_document()
    }
}

/// Arguments for `posts/add`.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub url: String,
    pub description: String,
    pub extended: Option<String>,
    pub tags: Vec<String>,
    pub dt: Option<NaiveDateTime>,
    pub replace: Option<bool>,
    pub shared: Option<bool>,
    pub toread: Option<bool>,
}

impl NewPost {
    pub fn new(url: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: description.into(),
            ..Self::default()
        }
    }
}

/// Filters for `posts/get`.
#[derive(Debug, Clone, Default)]
pub struct PostsQuery {
    pub tags: Vec<String>,
    pub dt: Option<NaiveDate>,
    pub url: Option<String>,
    pub meta: bool,
}

/// Filters for `posts/all`.
#[derive(Debug, Clone, Default)]
pub struct AllPostsQuery {
    pub tags: Vec<String>,
    pub start: Option<u32>,
    pub results: Option<u32>,
    pub fromdt: Option<NaiveDateTime>,
    pub todt: Option<NaiveDateTime>,
    pub meta: bool,
}

/// Ordered endpoint segments, e.g. `posts/add`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CallPath(Vec<String>);

impl CallPath {
    pub fn new(root: impl Into<String>) -> Self {
        Self(vec![root.into()])
    }

    pub fn push(&mut self, segment: impl Into<String>) {
        self.0.push(segment.into());
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Exact match against a literal path.
    pub fn is(&self, segments: &[&str]) -> bool {
        self.0.len() == segments.len() && self.0.iter().zip(segments).all(|(a, b)| a == b)
    }

    pub fn contains(&self, segment: &str) -> bool {
        self.0.iter().any(|s| s == segment)
    }
}

impl<S: Into<String>> FromIterator<S> for CallPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for CallPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// A call being assembled: path segments plus keyword arguments.
#[derive(Debug, Clone)]
#[must_use]
pub struct Call {
    client: Pinboard,
    path: CallPath,
    args: Vec<(String, Param)>,
    parse_response: bool,
}

impl Call {
    /// Append a path segment. Also used for index-style access such as a note id.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.path.push(segment);
        self
    }

    /// Set an argument, replacing any earlier value under the same name.
    ///
    /// `parse_response` is a control flag: it is consumed here and never sent.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Param>) -> Self {
        let name = name.into();
        let value = value.into();
        if name == PARSE_RESPONSE_ARG {
            self.parse_response = value.is_truthy();
            return self;
        }
        match self.args.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.args.push((name, value)),
        }
        self
    }

    pub fn args<I, K, V>(self, args: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Param>,
    {
        args.into_iter().fold(self, |call, (k, v)| call.arg(k, v))
    }

    /// With `false`, the reply is the untouched `HttpResponse`.
    pub fn parse_response(mut self, parse: bool) -> Self {
        self.parse_response = parse;
        self
    }

    pub fn path(&self) -> &CallPath {
        &self.path
    }

    /// Encode the arguments and produce the request URL.
    pub fn build(self) -> PreparedCall {
        let token = self.client.token().expose();
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.args {
            if name == FORMAT_PARAM || name == AUTH_TOKEN_PARAM {
                continue;
            }
            query.append_pair(name, &policy::encode(name, value));
        }
        query.append_pair(FORMAT_PARAM, "json");
        query.append_pair(AUTH_TOKEN_PARAM, token);

        let url = format!(
            "{}/{}?{}",
            self.client.base_url(),
            self.path,
            query.finish()
        );
        debug!(path = %self.path, args = self.args.len(), "built call");

        PreparedCall {
            client: self.client,
            path: self.path,
            parse_response: self.parse_response,
            request: HttpRequest {
                url,
                headers: Vec::new(),
            },
        }
    }

    /// Build, execute and parse in one step.
    pub fn send(self) -> Result<Reply> {
        let client = self.client.clone();
        client.send(self.build())
    }
}

/// A fully built request together with what is needed to interpret its reply.
#[derive(Debug, Clone)]
pub struct PreparedCall {
    client: Pinboard,
    path: CallPath,
    parse_response: bool,
    request: HttpRequest,
}

impl PreparedCall {
    pub fn path(&self) -> &CallPath {
        &self.path
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn parses_response(&self) -> bool {
        self.parse_response
    }

    /// Map the status, then decode and type the body for this call path.
    pub fn parse(self, response: HttpResponse) -> Result<Reply> {
        debug!(path = %self.path, status = response.status, "received response");
        check_status(&response)?;
        if !self.parse_response {
            return Ok(Reply::Raw(response));
        }
        mapper::map_reply(&self.path, &response.body, &self.client)
    }
}

/// Map error statuses to their dedicated `Error` variants.
fn check_status(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    Err(match response.status {
        401 => Error::Authentication,
        403 => Error::Forbidden,
        404 => Error::NotFound,
        500 => Error::Server {
            body: response.body.clone(),
        },
        503 => Error::ServiceUnavailable,
        status => Error::Http {
            status,
            body: response.body.clone(),
        },
    })
}
