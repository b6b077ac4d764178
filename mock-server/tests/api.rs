use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_store, Post, Store};
use serde_json::Value;
use tower::ServiceExt;

const TOKEN: &str = "tester:0123456789ABCDEF";
const AUTH: &str = "format=json&auth_token=tester%3A0123456789ABCDEF";

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn authed(path: &str, query: &str) -> Request<String> {
    if query.is_empty() {
        get(&format!("{path}?{AUTH}"))
    } else {
        get(&format!("{path}?{query}&{AUTH}"))
    }
}

// --- auth ---

#[tokio::test]
async fn missing_token_is_401() {
    let resp = app(TOKEN)
        .oneshot(get("/v1/posts/update?format=json"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_token_is_401() {
    let resp = app(TOKEN)
        .oneshot(get("/v1/tags/get?format=json&auth_token=tester%3Anope"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_json_format_is_400() {
    let resp = app(TOKEN)
        .oneshot(get("/v1/posts/update?format=xml&auth_token=tester%3A0123456789ABCDEF"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_path_is_404() {
    let resp = app(TOKEN)
        .oneshot(authed("/v1/posts/frobnicate", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- posts ---

#[tokio::test]
async fn add_without_url_reports_result_code() {
    let resp = app(TOKEN)
        .oneshot(authed("/v1/posts/add", "description=x"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["result_code"], "missing url");
}

#[tokio::test]
async fn delete_unknown_reports_item_not_found() {
    let resp = app(TOKEN)
        .oneshot(authed("/v1/posts/delete", "url=http%3A%2F%2Fnowhere"))
        .await
        .unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body["result_code"], "item not found");
}

#[tokio::test]
async fn update_time_is_formatted() {
    let resp = app(TOKEN)
        .oneshot(authed("/v1/posts/update", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["update_time"], "1970-01-01T00:00:00Z");
}

#[tokio::test]
async fn suggest_returns_popular_and_recommended() {
    let resp = app(TOKEN)
        .oneshot(authed("/v1/posts/suggest", "url=https%3A%2F%2Fexample.com"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body[0]["popular"], serde_json::json!([]));
    assert_eq!(body[1]["recommended"], serde_json::json!([]));
}

// --- notes ---

#[tokio::test]
async fn notes_list_and_fetch() {
    use tower::Service;

    let mut store = Store::default();
    let id = store.add_note("Groceries", "milk\neggs");
    let mut app = app_with_store(TOKEN, store).into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("/v1/notes/list", ""))
        .await
        .unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["notes"][0]["id"], id.as_str());
    assert_eq!(body["notes"][0]["length"], "9");

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed(&format!("/v1/notes/{id}"), ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["text"], "milk\neggs");

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("/v1/notes/doesnotexist", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- full bookmark lifecycle ---

#[tokio::test]
async fn bookmark_lifecycle() {
    use tower::Service;

    let mut app = app(TOKEN).into_service();

    // add
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed(
            "/v1/posts/add",
            "url=https%3A%2F%2Fexample.com&description=Example&tags=rust+api&shared=no&dt=2021-05-01T12%3A00%3A00Z",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["result_code"], "done");

    // get
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("/v1/posts/get", "url=https%3A%2F%2Fexample.com"))
        .await
        .unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body["user"], "tester");
    let posts: Vec<Post> = serde_json::from_value(body["posts"].clone()).unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].tags, "rust api");
    assert_eq!(posts[0].shared, "no");
    assert_eq!(posts[0].time, "2021-05-01T12:00:00Z");
    let first_meta = posts[0].meta.clone();
    let hash = posts[0].hash.clone();

    // re-add with replace=no is refused
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed(
            "/v1/posts/add",
            "url=https%3A%2F%2Fexample.com&description=Again&replace=no",
        ))
        .await
        .unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body["result_code"], "item already exists");

    // edit keeps hash, changes meta
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed(
            "/v1/posts/add",
            "url=https%3A%2F%2Fexample.com&description=Example&tags=rust&toread=yes",
        ))
        .await
        .unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body["result_code"], "done");

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("/v1/posts/all", ""))
        .await
        .unwrap();
    let posts: Vec<Post> = body_json(resp).await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].hash, hash);
    assert_ne!(posts[0].meta, first_meta);
    assert_eq!(posts[0].toread, "yes");

    // tags
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("/v1/tags/get", ""))
        .await
        .unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body["rust"], "1");
    assert!(body.get("api").is_none());

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("/v1/posts/delete", "url=https%3A%2F%2Fexample.com"))
        .await
        .unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body["result_code"], "done");

    // all after delete is empty
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("/v1/posts/all", ""))
        .await
        .unwrap();
    let posts: Vec<Post> = body_json(resp).await;
    assert!(posts.is_empty());
}
