use anyhow::Result;
use hyper::{Request, Response, StatusCode};
use tracing::info;

use shared::types::RefreshData;

use crate::handlers::http::utils::{HttpCookieJar, deliver_message, read_json_body};
use crate::{AppState, RequestBody, ResponseBody};

/// `POST /api/auth/logout`. Always 200, always clears the refresh cookie.
pub async fn handle_logout(
    req: Request<RequestBody>,
    state: AppState,
) -> Result<Response<ResponseBody>> {
    let mut jar = HttpCookieJar::from_headers(req.headers());
    let data: RefreshData = read_json_body(req).await.unwrap_or_default();

    state.sessions.logout(&mut jar, data.refresh_token).await;
    info!("User logged out");

    let mut response = deliver_message("Logged out successfully", StatusCode::OK)?;
    jar.apply(&mut response);
    Ok(response)
}
