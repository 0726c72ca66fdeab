//! Drives the API router the way `main` does, minus the socket.

use std::convert::Infallible;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use hyper::{Method, Request, Response, StatusCode};
use serde_json::{Value, json};

use daymark::database::open_database;
use daymark::handlers::http::{Router, build_api_router};
use daymark::{AppState, RequestBody, ResponseBody};

const CONFIG: &str = r#"
[server]
cors_origin = "http://localhost:5173"

[database]
path = ":memory:"

[auth]
jwt_secret = "api-flow-test-secret-that-is-long-enough-42"
purge_interval_minutes = 0
"#;

struct Api {
    router: Router,
    state: AppState,
}

struct Reply {
    status: StatusCode,
    set_cookies: Vec<String>,
    body: Value,
}

impl Api {
    async fn new() -> Self {
        let config = shared::config::parse_config(CONFIG).unwrap();
        let db = open_database(&config.database.path).await.unwrap();
        Self {
            router: build_api_router(),
            state: AppState::new(db, config).unwrap(),
        }
    }

    async fn send(&self, req: Request<RequestBody>) -> Reply {
        let response = self.router.route(req, self.state.clone()).await.unwrap();
        read_reply(response).await
    }

    async fn call(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let bytes = body.map(|b| b.to_string()).unwrap_or_default();
        self.send(builder.body(body_from(bytes)).unwrap()).await
    }

    async fn with_cookie(&self, path: &str, cookie: &str) -> Reply {
        let req = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(COOKIE, cookie)
            .body(body_from(String::new()))
            .unwrap();
        self.send(req).await
    }

    /// Register and log in; returns (access token, refresh cookie pair).
    async fn sign_up(&self, email: &str) -> (String, String) {
        let reply = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "email": email, "password": "hunter22", "nickname": "Ann" })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);

        let reply = self
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": "hunter22" })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK);

        let access = reply.body["accessToken"].as_str().unwrap().to_string();
        (access, cookie_pair(&reply.set_cookies[0]))
    }
}

fn body_from(text: String) -> RequestBody {
    Full::new(Bytes::from(text))
        .map_err(|never: Infallible| -> hyper::Error { match never {} })
        .boxed()
}

async fn read_reply(response: Response<ResponseBody>) -> Reply {
    let status = response.status();
    let set_cookies = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    Reply {
        status,
        set_cookies,
        body,
    }
}

/// `name=value` from a `Set-Cookie` header.
fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn health_is_open() {
    let api = Api::new().await;
    let reply = api.call(Method::GET, "/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ok");
}

#[tokio::test]
async fn unknown_route_is_404() {
    let api = Api::new().await;
    let reply = api.call(Method::GET, "/api/nothing", None, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn login_returns_tokens_and_sets_cookie() {
    let api = Api::new().await;
    api.call(
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "email": "ann@example.com", "password": "hunter22", "nickname": "Ann" })),
    )
    .await;

    let reply = api
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ann@example.com", "password": "hunter22" })),
        )
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["user"]["email"], "ann@example.com");
    assert!(reply.body["user"].get("passwordHash").is_none());

    let refresh = reply.body["refreshToken"].as_str().unwrap();
    let cookie = &reply.set_cookies[0];
    assert!(cookie.starts_with(&format!("refresh_token={}", refresh)));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/api/auth"));
    assert!(cookie.contains(&format!("Max-Age={}", 7 * 24 * 60 * 60)));
}

#[tokio::test]
async fn bad_login_and_duplicate_register() {
    let api = Api::new().await;
    api.sign_up("ann@example.com").await;

    let reply = api
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ann@example.com", "password": "nope-nope" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["code"], "INVALID_CREDENTIALS");
    assert!(reply.set_cookies.is_empty());

    let reply = api
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "ann@example.com", "password": "hunter22", "nickname": "B" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let reply = api
        .call(Method::POST, "/api/auth/register", None, Some(json!({ "email": "x@y.com" })))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn resources_require_a_bearer_token() {
    let api = Api::new().await;

    let reply = api.call(Method::GET, "/api/quicklinks", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["message"], "Invalid or expired token");

    let reply = api
        .call(Method::GET, "/api/schedules", Some("not-a-token"), None)
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_token_is_not_a_bearer_token() {
    let api = Api::new().await;
    let (_, cookie) = api.sign_up("ann@example.com").await;
    let refresh = cookie.trim_start_matches("refresh_token=");

    let reply = api
        .call(Method::GET, "/api/quicklinks", Some(refresh), None)
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn quick_link_crud_and_reorder() {
    let api = Api::new().await;
    let (token, _) = api.sign_up("ann@example.com").await;
    let token = Some(token.as_str());

    let mut ids = Vec::new();
    for (title, url) in [("Docs", "https://docs.rs"), ("Crates", "https://crates.io")] {
        let reply = api
            .call(
                Method::POST,
                "/api/quicklinks",
                token,
                Some(json!({ "title": title, "url": url })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        ids.push(reply.body["quickLink"]["id"].as_i64().unwrap());
    }

    let reply = api
        .call(
            Method::POST,
            "/api/quicklinks",
            token,
            Some(json!({ "title": "Bad", "url": "ftp://nope" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = api
        .call(
            Method::POST,
            "/api/quicklinks/reorder",
            token,
            Some(json!({ "updates": [
                { "id": ids[1], "orderIndex": 0 },
                { "id": ids[0], "orderIndex": 1 },
            ] })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = api.call(Method::GET, "/api/quicklinks", token, None).await;
    let titles: Vec<_> = reply.body["quickLinks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["Crates", "Docs"]);

    let reply = api
        .call(
            Method::PUT,
            &format!("/api/quicklinks/{}", ids[0]),
            token,
            Some(json!({ "title": "Rust docs", "url": "" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["quickLink"]["title"], "Rust docs");
    assert_eq!(reply.body["quickLink"]["url"], "https://docs.rs");

    let path = format!("/api/quicklinks/{}", ids[0]);
    let reply = api.call(Method::DELETE, &path, token, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let reply = api.call(Method::DELETE, &path, token, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn schedules_filter_by_inclusive_range() {
    let api = Api::new().await;
    let (token, _) = api.sign_up("ann@example.com").await;
    let token = Some(token.as_str());

    for date in ["2024-03-01", "2024-03-15", "2024-04-01"] {
        let reply = api
            .call(
                Method::POST,
                "/api/schedules",
                token,
                Some(json!({
                    "title": format!("Event {}", date),
                    "date": date,
                    "hyperlinkUrl": "https://meet.example.com",
                })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
    }

    let reply = api
        .call(
            Method::GET,
            "/api/schedules?startDate=2024-03-01&endDate=2024-03-15",
            token,
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let dates: Vec<_> = reply.body["schedules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["date"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(dates, vec!["2024-03-01", "2024-03-15"]);

    let reply = api
        .call(
            Method::GET,
            "/api/schedules?startDate=2024-04-02&endDate=2024-04-01",
            token,
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = api
        .call(Method::GET, "/api/schedules?startDate=March", token, None)
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn schedule_content_clears_on_null_or_empty() {
    let api = Api::new().await;
    let (token, _) = api.sign_up("ann@example.com").await;
    let token = Some(token.as_str());

    let reply = api
        .call(
            Method::POST,
            "/api/schedules",
            token,
            Some(json!({
                "title": "Standup",
                "content": "agenda",
                "date": "2024-03-01",
                "hyperlinkUrl": "https://meet.example.com",
            })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["schedule"]["content"], "agenda");
    let path = format!("/api/schedules/{}", reply.body["schedule"]["id"]);

    let reply = api
        .call(Method::PUT, &path, token, Some(json!({ "title": "Sync" })))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["schedule"]["content"], "agenda");

    let reply = api
        .call(Method::PUT, &path, token, Some(json!({ "content": null })))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body["schedule"]["content"].is_null());
    assert_eq!(reply.body["schedule"]["title"], "Sync");

    let reply = api
        .call(Method::PUT, &path, token, Some(json!({ "content": "again" })))
        .await;
    assert_eq!(reply.body["schedule"]["content"], "again");

    let reply = api
        .call(Method::PUT, &path, token, Some(json!({ "content": "" })))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body["schedule"]["content"].is_null());
}

#[tokio::test]
async fn other_users_rows_are_not_found() {
    let api = Api::new().await;
    let (ann, _) = api.sign_up("ann@example.com").await;
    let (bob, _) = api.sign_up("bob@example.com").await;

    let reply = api
        .call(
            Method::POST,
            "/api/schedules",
            Some(&ann),
            Some(json!({
                "title": "Private",
                "date": "2024-05-05",
                "hyperlinkUrl": "https://meet.example.com",
            })),
        )
        .await;
    let id = reply.body["schedule"]["id"].as_i64().unwrap();
    let path = format!("/api/schedules/{}", id);

    let reply = api.call(Method::GET, &path, Some(&bob), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = api
        .call(Method::PUT, &path, Some(&bob), Some(json!({ "title": "Mine" })))
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = api.call(Method::DELETE, &path, Some(&bob), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = api.call(Method::GET, &path, Some(&ann), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["schedule"]["title"], "Private");

    let reply = api.call(Method::GET, "/api/schedules", Some(&bob), None).await;
    assert!(reply.body["schedules"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn refresh_via_cookie_then_logout() {
    let api = Api::new().await;
    let (_, cookie) = api.sign_up("ann@example.com").await;

    let reply = api.with_cookie("/api/auth/refresh", &cookie).await;
    assert_eq!(reply.status, StatusCode::OK);
    let access = reply.body["accessToken"].as_str().unwrap().to_string();
    assert!(reply.body.get("refreshToken").is_none());
    let rotated = cookie_pair(&reply.set_cookies[0]);
    assert_ne!(rotated, cookie);

    let reply = api
        .call(Method::GET, "/api/quicklinks", Some(&access), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);

    // The spent cookie is dead.
    let reply = api.with_cookie("/api/auth/refresh", &cookie).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = api.with_cookie("/api/auth/logout", &rotated).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.set_cookies[0].contains("Max-Age=0"));

    let reply = api.with_cookie("/api/auth/refresh", &rotated).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_from_body_and_without_token() {
    let api = Api::new().await;
    let (_, cookie) = api.sign_up("ann@example.com").await;
    let refresh = cookie.trim_start_matches("refresh_token=");

    let reply = api
        .call(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refreshToken": refresh })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = api.call(Method::POST, "/api/auth/refresh", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = api.call(Method::POST, "/api/auth/logout", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "Logged out successfully");
}
