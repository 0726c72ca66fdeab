use anyhow::Result;
use hyper::{Request, Response, StatusCode};
use tracing::debug;

use shared::types::{RefreshData, RefreshResponse};

use crate::handlers::http::utils::{
    HttpCookieJar, deliver_api_error, deliver_serialized_json, read_json_body,
};
use crate::{AppState, RequestBody, ResponseBody};

/// `POST /api/auth/refresh`
///
/// Rotates the refresh token from the cookie, or from the body when no
/// cookie was sent. Only the new access token goes in the body.
pub async fn handle_refresh(
    req: Request<RequestBody>,
    state: AppState,
) -> Result<Response<ResponseBody>> {
    let mut jar = HttpCookieJar::from_headers(req.headers());

    // A missing or unreadable body just means no body token.
    let data: RefreshData = read_json_body(req).await.unwrap_or_default();
    debug!("Refresh body token present: {}", data.refresh_token.is_some());

    match state.sessions.refresh(&mut jar, data.refresh_token).await {
        Ok(pair) => {
            let body = RefreshResponse {
                access_token: pair.access_token,
            };
            let mut response = deliver_serialized_json(&body, StatusCode::OK)?;
            jar.apply(&mut response);
            Ok(response)
        }
        Err(err) => deliver_api_error(&err),
    }
}
