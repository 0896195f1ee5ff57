use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    Router,
};
use bookstore_app::{auth, rest_api, state::AppState, user};
use bookstore_auth::token::TokenManager;
use bookstore_dal::user::{CreateUser, UserRepository};
use bookstore_types::claim::{ApiClaim, Role};
use http::{Request, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt as _;
use tracing::info;
use tracing_test::traced_test;

const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

struct TestApp {
    router: Router,
    state: AppState,
    _data_dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let data_dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/test.db", data_dir.path().display());
        let pool = bookstore_dal::new_pool(&url).await.unwrap();
        bookstore_dal::migrate(&pool).await.unwrap();

        let users = UserRepository::new(pool.clone());
        for (name, is_staff) in [("owner", false), ("other", false), ("staff", true)] {
            users
                .create(CreateUser {
                    username: name.to_string(),
                    password: Some(format!("{name}-password")),
                    is_staff,
                })
                .await
                .unwrap();
        }

        let tokens = TokenManager::new(SECRET, Duration::from_secs(3600)).unwrap();
        let state = AppState::new(pool, tokens);
        let router = Router::new()
            .nest("/books", rest_api::book::router())
            .nest("/relations", rest_api::relation::router())
            .nest("/auth", auth::router())
            .nest("/users", user::router())
            .with_state(state.clone());
        TestApp {
            router,
            state,
            _data_dir: data_dir,
        }
    }

    /// Token for user id 1 = owner, 2 = other, 3 = staff
    fn token(&self, user_id: i64) -> String {
        let roles = if user_id == 3 { vec![Role::Staff] } else { vec![] };
        let claim = ApiClaim::new_expired(user_id.to_string(), roles);
        self.state.tokens().issue(claim).unwrap()
    }

    async fn call(
        &self,
        method: &str,
        uri: &str,
        user_id: Option<i64>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header("authorization", format!("Bearer {}", self.token(user_id)));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        info!("Response: {:#?}", response);
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).to_string())
            })
        };
        (status, value)
    }
}

fn book(name: &str, price: Value, author: &str) -> Value {
    json!({"name": name, "price": price, "author_name": author})
}

#[tokio::test]
#[traced_test]
async fn test_book_permissions() {
    let app = TestApp::new().await;

    let (status, _) = app
        .call("POST", "/books", None, Some(book("Kniha", json!(23), "Vadym")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, created) = app
        .call(
            "POST",
            "/books",
            Some(1),
            Some(json!({"name": "Kniha", "price": 23, "author_name": "Vadym", "owner": 2})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["price"], "23.00");
    assert_eq!(created["rating"], Value::Null);
    assert_eq!(created["likes_count"], 0);
    assert!(created.get("owner_id").is_none());
    let id = created["id"].as_i64().unwrap();
    let url = format!("/books/{id}");

    let (status, body) = app
        .call("PUT", &url, Some(2), Some(book("Hacked", json!("1.00"), "X")))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
    let (_, unchanged) = app.call("GET", &url, None, None).await;
    assert_eq!(unchanged["name"], "Kniha");

    let (status, updated) = app
        .call("PUT", &url, Some(3), Some(book("Kniha 2", json!("53.5"), "Vadym")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["price"], "53.50");

    let (status, _) = app.call("DELETE", &url, Some(2), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.call("DELETE", &url, Some(1), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = app.call("GET", &url, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
#[traced_test]
async fn test_book_validation_and_query() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call("POST", "/books", Some(1), Some(book("Kniha", json!("1.234"), "Vadym")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
    assert!(body["fields"]["price"].is_array());

    let (status, body) = app
        .call("POST", "/books", Some(1), Some(json!({"name": "Kniha"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, body) = app.call("GET", "/books?ordering=owner", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_query");

    let (status, body) = app.call("GET", "/books?ordering=-price", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
#[traced_test]
async fn test_relations() {
    let app = TestApp::new().await;
    let (_, created) = app
        .call("POST", "/books", Some(1), Some(book("Kniha", json!(23), "Vadym")))
        .await;
    let url = format!("/relations/{}", created["id"]);

    let (status, _) = app.call("GET", &url, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, rel) = app.call("GET", &url, Some(2), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rel["like"], false);
    assert_eq!(rel["rate"], Value::Null);

    let (status, body) = app.call("PATCH", &url, Some(2), Some(json!({"rate": 6}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["rate"].is_array());

    let (status, rel) = app
        .call("PATCH", &url, Some(2), Some(json!({"like": true, "rate": 3})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rel["rate"], 3);
    let (_, rel) = app
        .call("PATCH", &url, Some(2), Some(json!({"in_bookmarks": true})))
        .await;
    assert_eq!(rel["like"], true);
    assert_eq!(rel["in_bookmarks"], true);
    assert_eq!(rel["rate"], 3);

    let (_, rel) = app
        .call("PUT", &url, Some(3), Some(json!({"like": true, "rate": 5})))
        .await;
    assert_eq!(rel["rate"], 5);

    let (_, listed) = app.call("GET", "/books", None, None).await;
    assert_eq!(listed[0]["likes_count"], 2);
    assert_eq!(listed[0]["annotated_likes"], 2);
    assert_eq!(listed[0]["rating"], "4.00");

    let (status, _) = app
        .call("PATCH", "/relations/9999", Some(2), Some(json!({"like": true})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[traced_test]
async fn test_login_and_users() {
    let app = TestApp::new().await;

    let (status, token) = app
        .call(
            "POST",
            "/auth/login",
            None,
            Some(json!({"username": "staff", "password": "staff-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let claim: ApiClaim = app
        .state
        .tokens()
        .validate(token.as_str().unwrap())
        .unwrap();
    assert_eq!(claim.sub, "3");
    assert!(claim.roles.contains(&Role::Staff));

    let (status, _) = app
        .call(
            "POST",
            "/auth/login",
            None,
            Some(json!({"username": "staff", "password": "wrong-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let new_user = json!({"username": "newbie", "password": "newbie-password"});
    let (status, _) = app.call("POST", "/users", Some(1), Some(new_user.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, user) = app.call("POST", "/users", Some(3), Some(new_user.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["is_staff"], false);
    let (status, _) = app.call("POST", "/users", Some(3), Some(new_user)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, users) = app.call("GET", "/users", Some(3), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 4);
}

#[tokio::test]
#[traced_test]
async fn test_token_of_deleted_user() {
    let app = TestApp::new().await;

    let (status, _) = app.call("DELETE", "/users/2", Some(3), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app
        .call("POST", "/books", Some(2), Some(book("Orphan", json!(10), "Nobody")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, Value::Null);

    let (status, books) = app.call("GET", "/books", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(books.as_array().unwrap().is_empty());
}
