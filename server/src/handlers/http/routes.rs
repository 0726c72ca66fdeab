use std::future::Future;
use std::pin::Pin;

use anyhow::{Context, Result};
use hyper::{Method, Request, Response, StatusCode};
use tracing::{debug, warn};

use shared::types::{ApiError, Identity};

use crate::handlers::http::utils::{deliver_api_error, deliver_error_json, get_bearer_token};
use crate::handlers::http::{auth, resources};
use crate::{AppState, RequestBody, ResponseBody};

// ---------------------------------------------------------------------------
// Handler type aliases
// ---------------------------------------------------------------------------
//
// Two tiers:
//
//   OpenHandler   : no auth.  Receives (req, state).
//                   Use for: register, login, refresh, logout, health.
//
//   GatedHandler  : access token verified by the router (signature + expiry,
//                   zero store reads).  Receives (req, state, identity).
//                   Use for: every quick link and schedule route.

type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response<ResponseBody>>> + Send>>;

type OpenHandler = Box<dyn Fn(Request<RequestBody>, AppState) -> HandlerFuture + Send + Sync>;

type GatedHandler =
    Box<dyn Fn(Request<RequestBody>, AppState, Identity) -> HandlerFuture + Send + Sync>;

// ---------------------------------------------------------------------------
// RouteKind
// ---------------------------------------------------------------------------

enum RouteKind {
    /// No authentication check.
    Open(OpenHandler),

    /// Bearer access token must verify. Handler receives the `Identity`.
    Gated(GatedHandler),
}

struct Route {
    method: Method,
    path: String,
    kind: RouteKind,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes_count", &self.routes.len())
            .finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    fn open<F, Fut>(mut self, method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(Request<RequestBody>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<ResponseBody>>> + Send + 'static,
    {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            kind: RouteKind::Open(Box::new(move |req, state| Box::pin(handler(req, state)))),
        });
        self
    }

    fn gated<F, Fut>(mut self, method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(Request<RequestBody>, AppState, Identity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<ResponseBody>>> + Send + 'static,
    {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            kind: RouteKind::Gated(Box::new(move |req, state, identity| {
                Box::pin(handler(req, state, identity))
            })),
        });
        self
    }

    // ── Open (no auth) ────────────────────────────────────────────────────────

    pub fn get<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<RequestBody>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<ResponseBody>>> + Send + 'static,
    {
        self.open(Method::GET, path, handler)
    }

    pub fn post<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<RequestBody>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<ResponseBody>>> + Send + 'static,
    {
        self.open(Method::POST, path, handler)
    }

    // ── Gated (bearer access token) ──────────────────────────────────────────
    //
    // The router verifies the access token before the handler is called.
    // Handlers receive the `Identity` and must NOT repeat the check.

    pub fn get_gated<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<RequestBody>, AppState, Identity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<ResponseBody>>> + Send + 'static,
    {
        self.gated(Method::GET, path, handler)
    }

    pub fn post_gated<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<RequestBody>, AppState, Identity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<ResponseBody>>> + Send + 'static,
    {
        self.gated(Method::POST, path, handler)
    }

    pub fn put_gated<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<RequestBody>, AppState, Identity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<ResponseBody>>> + Send + 'static,
    {
        self.gated(Method::PUT, path, handler)
    }

    pub fn delete_gated<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<RequestBody>, AppState, Identity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<ResponseBody>>> + Send + 'static,
    {
        self.gated(Method::DELETE, path, handler)
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// First registered match wins, so literal paths must be added before a
    /// `:param` path they would otherwise collide with.
    pub async fn route(
        &self,
        req: Request<RequestBody>,
        state: AppState,
    ) -> Result<Response<ResponseBody>> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        for route in &self.routes {
            if route.method != method || !Self::path_matches(&route.path, &path) {
                continue;
            }

            return match &route.kind {
                RouteKind::Open(h) => h(req, state).await,

                RouteKind::Gated(h) => match authorize(&req, &state) {
                    Ok(identity) => {
                        debug!("Gate passed {} {} for user {}", method, path, identity.user_id);
                        h(req, state, identity).await
                    }
                    Err(err) => {
                        warn!("Gate rejected {} {}", method, path);
                        deliver_api_error(&err).context("Failed to deliver 401 response")
                    }
                },
            };
        }

        deliver_error_json("NOT_FOUND", "Endpoint not found", StatusCode::NOT_FOUND)
            .context("Failed to deliver 404 response")
    }

    // ── Path matching ─────────────────────────────────────────────────────────

    pub fn path_matches(route_path: &str, request_path: &str) -> bool {
        // Strip query string from incoming request path before comparing.
        let clean = request_path.split('?').next().unwrap_or(request_path);

        if route_path == clean {
            return true;
        }

        // Segment-by-segment matching for `:param` wildcards.
        // e.g.  "/api/schedules/:id"  matches  "/api/schedules/42"
        let route_segs: Vec<&str> = route_path.split('/').collect();
        let path_segs: Vec<&str> = clean.split('/').collect();

        if route_segs.len() != path_segs.len() {
            return false;
        }

        route_segs
            .iter()
            .zip(path_segs.iter())
            .all(|(r, p)| (r.starts_with(':') && !p.is_empty()) || r == p)
    }
}

/// The request gate: bearer access token in, verified identity out.
pub fn authorize(req: &Request<RequestBody>, state: &AppState) -> Result<Identity, ApiError> {
    let token = get_bearer_token(req.headers()).ok_or(ApiError::Unauthorized)?;
    state.sessions.verify(&token)
}

// ---------------------------------------------------------------------------
// API router
//
// Auth tier is enforced here at the routing level; handlers MUST NOT repeat
// the auth call.
//
//   .get(...) / .post(...)    → Open   : handler gets (req, state)
//   .*_gated(...)             → Gated  : handler gets (req, state, identity)
// ---------------------------------------------------------------------------

pub fn build_api_router() -> Router {
    Router::new()
        // ── Public ───────────────────────────────────────────────────────────
        .get("/health", |_req, _state| async move {
            crate::handlers::http::utils::deliver_serialized_json(
                &serde_json::json!({ "status": "ok" }),
                StatusCode::OK,
            )
        })
        .post("/api/auth/register", |req, state| async move {
            auth::handle_register(req, state)
                .await
                .context("Register failed")
        })
        .post("/api/auth/login", |req, state| async move {
            auth::handle_login(req, state).await.context("Login failed")
        })
        .post("/api/auth/refresh", |req, state| async move {
            auth::handle_refresh(req, state)
                .await
                .context("Refresh failed")
        })
        .post("/api/auth/logout", |req, state| async move {
            auth::handle_logout(req, state).await.context("Logout failed")
        })
        // ── Quick links ──────────────────────────────────────────────────────
        .get_gated("/api/quicklinks", |req, state, identity| async move {
            resources::quicklinks::handle_list(req, state, identity)
                .await
                .context("Quick link list failed")
        })
        .post_gated("/api/quicklinks", |req, state, identity| async move {
            resources::quicklinks::handle_create(req, state, identity)
                .await
                .context("Quick link create failed")
        })
        .post_gated("/api/quicklinks/reorder", |req, state, identity| async move {
            resources::quicklinks::handle_reorder(req, state, identity)
                .await
                .context("Quick link reorder failed")
        })
        .put_gated("/api/quicklinks/:id", |req, state, identity| async move {
            resources::quicklinks::handle_update(req, state, identity)
                .await
                .context("Quick link update failed")
        })
        .delete_gated("/api/quicklinks/:id", |req, state, identity| async move {
            resources::quicklinks::handle_delete(req, state, identity)
                .await
                .context("Quick link delete failed")
        })
        // ── Schedules ────────────────────────────────────────────────────────
        .get_gated("/api/schedules", |req, state, identity| async move {
            resources::schedules::handle_list(req, state, identity)
                .await
                .context("Schedule list failed")
        })
        .post_gated("/api/schedules", |req, state, identity| async move {
            resources::schedules::handle_create(req, state, identity)
                .await
                .context("Schedule create failed")
        })
        .get_gated("/api/schedules/:id", |req, state, identity| async move {
            resources::schedules::handle_get(req, state, identity)
                .await
                .context("Schedule get failed")
        })
        .put_gated("/api/schedules/:id", |req, state, identity| async move {
            resources::schedules::handle_update(req, state, identity)
                .await
                .context("Schedule update failed")
        })
        .delete_gated("/api/schedules/:id", |req, state, identity| async move {
            resources::schedules::handle_delete(req, state, identity)
                .await
                .context("Schedule delete failed")
        })
}
