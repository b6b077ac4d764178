use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const NOTE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A bookmark exactly as the API serializes it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Post {
    pub href: String,
    pub description: String,
    pub extended: String,
    pub meta: String,
    pub hash: String,
    pub time: String,
    pub shared: String,
    pub toread: String,
    pub tags: String,
}

impl Post {
    fn tag_list(&self) -> impl Iterator<Item = &str> {
        self.tags.split(' ').filter(|t| !t.is_empty())
    }

    fn has_tags(&self, wanted: &[&str]) -> bool {
        wanted.iter().all(|w| self.tag_list().any(|t| t == *w))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub hash: String,
    pub title: String,
    pub text: String,
    pub length: usize,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default)]
pub struct Store {
    posts: Vec<Post>,
    notes: Vec<Note>,
    update_time: Option<NaiveDateTime>,
}

impl Store {
    pub fn add_note(&mut self, title: &str, text: &str) -> String {
        let now = Utc::now().naive_utc().format(NOTE_DATETIME_FORMAT).to_string();
        let id = new_hash();
        self.notes.push(Note {
            id: id.clone(),
            hash: new_hash(),
            title: title.to_string(),
            text: text.to_string(),
            length: text.len(),
            created_at: now.clone(),
            updated_at: now,
        });
        id
    }

    fn touch(&mut self) {
        self.update_time = Some(Utc::now().naive_utc());
    }

    fn find(&self, url: &str) -> Option<usize> {
        self.posts.iter().position(|p| p.href == url)
    }
}

#[derive(Clone)]
pub struct AppState {
    token: String,
    user: String,
    store: Arc<RwLock<Store>>,
}

type Params = Query<HashMap<String, String>>;
type Reply = Result<Json<Value>, StatusCode>;

pub fn app(token: &str) -> Router {
    app_with_store(token, Store::default())
}

pub fn app_with_store(token: &str, store: Store) -> Router {
    let user = token.split(':').next().unwrap_or_default().to_string();
    let state = AppState {
        token: token.to_string(),
        user,
        store: Arc::new(RwLock::new(store)),
    };
    Router::new()
        .route("/v1/posts/update", get(posts_update))
        .route("/v1/posts/add", get(posts_add))
        .route("/v1/posts/delete", get(posts_delete))
        .route("/v1/posts/get", get(posts_get))
        .route("/v1/posts/recent", get(posts_recent))
        .route("/v1/posts/dates", get(posts_dates))
        .route("/v1/posts/all", get(posts_all))
        .route("/v1/posts/suggest", get(posts_suggest))
        .route("/v1/tags/get", get(tags_get))
        .route("/v1/tags/delete", get(tags_delete))
        .route("/v1/tags/rename", get(tags_rename))
        .route("/v1/user/secret", get(user_secret))
        .route("/v1/user/api_token", get(user_api_token))
        .route("/v1/notes/list", get(notes_list))
        .route("/v1/notes/{id}", get(note))
        .with_state(state)
}

pub async fn run(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, app).await
}

fn new_hash() -> String {
    Uuid::new_v4().simple().to_string()
}

fn authorize(state: &AppState, params: &HashMap<String, String>) -> Result<(), StatusCode> {
    if params.get("auth_token") != Some(&state.token) {
        debug!("rejecting request with bad token");
        return Err(StatusCode::UNAUTHORIZED);
    }
    if params.get("format").map(String::as_str) != Some("json") {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(())
}

fn result_code(code: &str) -> Reply {
    Ok(Json(json!({ "result_code": code })))
}

fn tag_filter(params: &HashMap<String, String>) -> Vec<&str> {
    params
        .get("tag")
        .map(|t| t.split(' ').filter(|t| !t.is_empty()).collect())
        .unwrap_or_default()
}

fn format_time(t: NaiveDateTime) -> String {
    t.format(DATETIME_FORMAT).to_string()
}

async fn posts_update(State(state): State<AppState>, Query(params): Params) -> Reply {
    authorize(&state, &params)?;
    let store = state.store.read().await;
    let t = store.update_time.unwrap_or_default();
    Ok(Json(json!({ "update_time": format_time(t) })))
}

async fn posts_add(State(state): State<AppState>, Query(params): Params) -> Reply {
    authorize(&state, &params)?;
    let Some(url) = params.get("url").filter(|u| !u.is_empty()) else {
        return result_code("missing url");
    };
    let Some(description) = params.get("description") else {
        return result_code("missing description");
    };
    let time = match params.get("dt") {
        Some(dt) => match NaiveDateTime::parse_from_str(dt, DATETIME_FORMAT) {
            Ok(t) => format_time(t),
            Err(_) => return result_code("invalid dt"),
        },
        None => format_time(Utc::now().naive_utc()),
    };
    let flag = |name: &str| match params.get(name).map(String::as_str) {
        Some("yes") => "yes".to_string(),
        _ => "no".to_string(),
    };

    let mut store = state.store.write().await;
    let existing = store.find(url);
    if existing.is_some() && params.get("replace").map(String::as_str) == Some("no") {
        return result_code("item already exists");
    }
    let hash = existing
        .map(|i| store.posts[i].hash.clone())
        .unwrap_or_else(new_hash);
    let post = Post {
        href: url.clone(),
        description: description.clone(),
        extended: params.get("extended").cloned().unwrap_or_default(),
        meta: new_hash(),
        hash,
        time,
        shared: flag("shared"),
        toread: flag("toread"),
        tags: params.get("tags").cloned().unwrap_or_default(),
    };
    match existing {
        Some(i) => store.posts[i] = post,
        None => store.posts.push(post),
    }
    store.touch();
    result_code("done")
}

async fn posts_delete(State(state): State<AppState>, Query(params): Params) -> Reply {
    authorize(&state, &params)?;
    let mut store = state.store.write().await;
    let found = params.get("url").and_then(|url| store.find(url));
    match found {
        Some(i) => {
            store.posts.remove(i);
            store.touch();
            result_code("done")
        }
        None => result_code("item not found"),
    }
}

async fn posts_get(State(state): State<AppState>, Query(params): Params) -> Reply {
    authorize(&state, &params)?;
    let store = state.store.read().await;
    let tags = tag_filter(&params);
    let day = params.get("dt").map(|dt| dt.chars().take(10).collect::<String>());
    let posts: Vec<&Post> = store
        .posts
        .iter()
        .filter(|p| params.get("url").map_or(true, |u| &p.href == u))
        .filter(|p| p.has_tags(&tags))
        .filter(|p| day.as_ref().map_or(true, |d| p.time.starts_with(d.as_str())))
        .collect();
    let date = posts
        .first()
        .map(|p| p.time.clone())
        .unwrap_or_else(|| format_time(Utc::now().naive_utc()));
    Ok(Json(json!({ "date": date, "user": state.user, "posts": posts })))
}

async fn posts_recent(State(state): State<AppState>, Query(params): Params) -> Reply {
    authorize(&state, &params)?;
    let store = state.store.read().await;
    let tags = tag_filter(&params);
    let count = params
        .get("count")
        .and_then(|c| c.parse::<usize>().ok())
        .unwrap_or(15)
        .min(100);
    let mut posts: Vec<&Post> = store.posts.iter().filter(|p| p.has_tags(&tags)).collect();
    posts.sort_by(|a, b| b.time.cmp(&a.time));
    posts.truncate(count);
    let date = posts
        .first()
        .map(|p| p.time.clone())
        .unwrap_or_else(|| format_time(Utc::now().naive_utc()));
    Ok(Json(json!({ "date": date, "user": state.user, "posts": posts })))
}

async fn posts_dates(State(state): State<AppState>, Query(params): Params) -> Reply {
    authorize(&state, &params)?;
    let store = state.store.read().await;
    let tags = tag_filter(&params);
    let mut dates: HashMap<String, usize> = HashMap::new();
    for post in store.posts.iter().filter(|p| p.has_tags(&tags)) {
        *dates.entry(post.time.chars().take(10).collect()).or_default() += 1;
    }
    let dates: HashMap<String, String> = dates
        .into_iter()
        .map(|(day, n)| (day, n.to_string()))
        .collect();
    Ok(Json(json!({
        "user": state.user,
        "tag": params.get("tag").cloned().unwrap_or_default(),
        "dates": dates,
    })))
}

async fn posts_all(State(state): State<AppState>, Query(params): Params) -> Reply {
    authorize(&state, &params)?;
    let store = state.store.read().await;
    let tags = tag_filter(&params);
    let start = params
        .get("start")
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(0);
    let results = params
        .get("results")
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(usize::MAX);
    let posts: Vec<&Post> = store
        .posts
        .iter()
        .rev()
        .filter(|p| p.has_tags(&tags))
        .skip(start)
        .take(results)
        .collect();
    Ok(Json(json!(posts)))
}

/// Popular tags come from the saved copy of the URL, recommended ones are the
/// user's most used tags.
async fn posts_suggest(State(state): State<AppState>, Query(params): Params) -> Reply {
    authorize(&state, &params)?;
    let Some(url) = params.get("url").filter(|u| !u.is_empty()) else {
        return result_code("missing url");
    };
    let store = state.store.read().await;
    let popular: Vec<&str> = store
        .find(url)
        .map(|i| store.posts[i].tag_list().collect())
        .unwrap_or_default();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for tag in store.posts.iter().flat_map(Post::tag_list) {
        *counts.entry(tag).or_default() += 1;
    }
    let mut recommended: Vec<(&str, usize)> = counts.into_iter().collect();
    recommended.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    let recommended: Vec<&str> = recommended.into_iter().take(5).map(|(t, _)| t).collect();
    Ok(Json(json!([{ "popular": popular }, { "recommended": recommended }])))
}

async fn tags_get(State(state): State<AppState>, Query(params): Params) -> Reply {
    authorize(&state, &params)?;
    let store = state.store.read().await;
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for tag in store.posts.iter().flat_map(Post::tag_list) {
        *counts.entry(tag).or_default() += 1;
    }
    let counts: HashMap<&str, String> = counts
        .into_iter()
        .map(|(tag, n)| (tag, n.to_string()))
        .collect();
    Ok(Json(json!(counts)))
}

fn retag(store: &mut Store, old: &str, new: Option<&str>) {
    for post in &mut store.posts {
        let tags: Vec<&str> = post
            .tag_list()
            .filter_map(|t| if t == old { new } else { Some(t) })
            .collect();
        let joined = tags.join(" ");
        if joined != post.tags {
            post.tags = joined;
            post.meta = new_hash();
        }
    }
    store.touch();
}

async fn tags_delete(State(state): State<AppState>, Query(params): Params) -> Reply {
    authorize(&state, &params)?;
    let Some(tag) = params.get("tag") else {
        return Ok(Json(json!({ "result": "missing tag" })));
    };
    retag(&mut *state.store.write().await, tag, None);
    Ok(Json(json!({ "result": "done" })))
}

async fn tags_rename(State(state): State<AppState>, Query(params): Params) -> Reply {
    authorize(&state, &params)?;
    let (Some(old), Some(new)) = (params.get("old"), params.get("new")) else {
        return Ok(Json(json!({ "result": "missing tag" })));
    };
    retag(&mut *state.store.write().await, old, Some(new.as_str()));
    Ok(Json(json!({ "result": "done" })))
}

async fn user_secret(State(state): State<AppState>, Query(params): Params) -> Reply {
    authorize(&state, &params)?;
    let secret: String = state.user.bytes().map(|b| format!("{b:02x}")).collect();
    Ok(Json(json!({ "result": secret })))
}

async fn user_api_token(State(state): State<AppState>, Query(params): Params) -> Reply {
    authorize(&state, &params)?;
    let secret = state.token.split_once(':').map(|(_, s)| s).unwrap_or_default();
    Ok(Json(json!({ "result": secret })))
}

async fn notes_list(State(state): State<AppState>, Query(params): Params) -> Reply {
    authorize(&state, &params)?;
    let store = state.store.read().await;
    let notes: Vec<Value> = store
        .notes
        .iter()
        .map(|n| {
            json!({
                "id": n.id,
                "hash": n.hash,
                "title": n.title,
                "length": n.length.to_string(),
                "created_at": n.created_at,
                "updated_at": n.updated_at,
            })
        })
        .collect();
    Ok(Json(json!({ "count": notes.len(), "notes": notes })))
}

async fn note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Params,
) -> Reply {
    authorize(&state, &params)?;
    let store = state.store.read().await;
    let note = store
        .notes
        .iter()
        .find(|n| n.id == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!(note)))
}
