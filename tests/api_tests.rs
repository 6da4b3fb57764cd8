use movie_catalog::{AppConfig, AppState, InMemoryRepository, create_router};
use reqwest::{StatusCode, redirect::Policy};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

async fn spawn_app() -> TestApp {
    let state = AppState::new(Arc::new(InMemoryRepository::new()), AppConfig::default());
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address }
}

/// A client that keeps cookies between requests and never follows redirects.
fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .unwrap()
}

/// Registers an account and returns a client signed in as it.
async fn signed_in(app: &TestApp, email: &str, role: &str) -> reqwest::Client {
    let client = browser();

    let res = client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "name": "A", "email": email, "password": "p", "role": role }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": email, "password": "p" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    client
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = browser().get(app.url("/health")).send().await.expect("req fail");

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_register_and_login_flow() {
    let app = spawn_app().await;
    let client = browser();

    let res = client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "name": "A", "email": "a@x.com", "password": "p", "role": "MANAGER" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "User created successfully");
    assert_eq!(body["user"]["email"], "a@x.com");
    assert_eq!(body["user"]["role"], "MANAGER");
    assert!(body["user"].get("password").is_none());

    let res = client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": "a@x.com", "password": "p" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let set_cookie = res
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("auth-token="));
    assert!(set_cookie.contains("HttpOnly"));

    let res = client.get(app.url("/api/auth/me")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let me: Value = res.json().await.unwrap();
    assert_eq!(me["isAuthenticated"], true);
    assert_eq!(me["user"]["email"], "a@x.com");

    let res = client.post(app.url("/api/auth/logout")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(app.url("/api/auth/me")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bad_credentials_and_duplicates() {
    let app = spawn_app().await;
    signed_in(&app, "a@x.com", "FLOORSTAFF").await;
    let client = browser();

    let res = client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": "a@x.com", "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().get("set-cookie").is_none());

    let res = client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "name": "B", "email": "a@x.com", "password": "q", "role": "MANAGER" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_movie_lifecycle_across_roles() {
    let app = spawn_app().await;
    let manager = signed_in(&app, "m@x.com", "MANAGER").await;
    let staff = signed_in(&app, "s@x.com", "FLOORSTAFF").await;

    // Create (FLOORSTAFF may create)
    let res = staff
        .post(app.url("/api/movies"))
        .json(&json!({ "title": "X", "rating": "G", "releaseDate": "2024-01-01" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let movie: Value = res.json().await.unwrap();
    assert_eq!(movie["id"], 1);
    assert_eq!(movie["title"], "X");
    assert_eq!(movie["rating"], "G");
    assert_eq!(movie["releaseDate"], "2024-01-01");
    assert!(movie["createdAt"].is_string());

    // List
    let res = staff.get(app.url("/api/movies")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let list: Vec<Value> = res.json().await.unwrap();
    assert_eq!(list.len(), 1);

    // Update
    let res = staff
        .put(app.url("/api/movies/1"))
        .json(&json!({ "title": "Y", "rating": "R", "releaseDate": "2023-02-01T00:00:00.000Z" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["title"], "Y");
    assert_eq!(updated["releaseDate"], "2023-02-01");

    // Delete is MANAGER only
    let res = staff.delete(app.url("/api/movies/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "FORBIDDEN");

    let res = manager.delete(app.url("/api/movies/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = manager.get(app.url("/api/movies/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_movie_validation_errors() {
    let app = spawn_app().await;
    let staff = signed_in(&app, "s@x.com", "FLOORSTAFF").await;

    let res = staff
        .post(app.url("/api/movies"))
        .json(&json!({ "title": "X", "rating": "X", "releaseDate": "2024-01-01" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["fields"][0]["field"], "rating");

    let res = staff
        .post(app.url("/api/movies"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["fields"][0]["field"], "body");

    let res = staff.get(app.url("/api/movies/abc")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let list: Vec<Value> = staff
        .get(app.url("/api/movies"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(list.is_empty());
}

#[tokio::test]
async fn test_edge_gate() {
    let app = spawn_app().await;
    let anonymous = browser();

    let res = anonymous.get(app.url("/api/movies")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let res = anonymous.get(app.url("/movie")).send().await.unwrap();
    assert!(res.status().is_redirection());
    assert_eq!(res.headers().get("location").unwrap(), "/");

    let res = anonymous
        .get(app.url("/api/movies"))
        .header("cookie", "auth-token=not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Three segments pass the gate but fail full verification.
    let res = anonymous
        .get(app.url("/api/movies"))
        .header("cookie", "auth-token=a.b.c")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = anonymous.get(app.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_catalog_page_for_signed_in_user() {
    let app = spawn_app().await;
    let staff = signed_in(&app, "s@x.com", "FLOORSTAFF").await;

    let res = staff.get(app.url("/movie")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let html = res.text().await.unwrap();
    assert!(html.contains("<html"));
}
