use std::sync::Arc;

use hyper::Response;
use tracing::{error, info};

use crate::handlers::http::Router;
use crate::handlers::http::utils::{bare_internal_error, deliver_error_json};
use crate::{AppState, RequestBody, ResponseBody};

/// Entry point for one request. Never fails: handler errors become a
/// generic 500 envelope.
pub async fn handle_request(
    req: hyper::Request<RequestBody>,
    router: Arc<Router>,
    state: AppState,
) -> Response<ResponseBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match router.route(req, state).await {
        Ok(response) => response,
        Err(e) => {
            error!("Unhandled error for {} {}: {:#}", method, path, e);
            deliver_error_json(
                "INTERNAL_ERROR",
                "An internal error occurred",
                hyper::StatusCode::INTERNAL_SERVER_ERROR,
            )
            .unwrap_or_else(|_| bare_internal_error())
        }
    };

    info!("{} {} -> {}", method, path, response.status().as_u16());
    response
}
