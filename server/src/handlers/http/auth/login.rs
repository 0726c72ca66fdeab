use anyhow::Result;
use hyper::{Request, Response, StatusCode};
use tracing::info;

use shared::types::{LoginData, LoginResponse};

use crate::handlers::http::utils::{
    HttpCookieJar, deliver_api_error, deliver_serialized_json, read_json_body,
};
use crate::session::authenticate;
use crate::{AppState, RequestBody, ResponseBody};

/// `POST /api/auth/login`
///
/// Responds with both tokens and the public profile, and sets the refresh
/// cookie.
pub async fn handle_login(
    req: Request<RequestBody>,
    state: AppState,
) -> Result<Response<ResponseBody>> {
    info!("Processing login request");

    let mut jar = HttpCookieJar::from_headers(req.headers());

    let data: LoginData = match read_json_body(req).await {
        Ok(data) => data,
        Err(err) => return deliver_api_error(&err),
    };

    let user = match authenticate(&state.db, data).await {
        Ok(user) => user,
        Err(err) => return deliver_api_error(&err),
    };

    let pair = match state.sessions.login(&user, &mut jar).await {
        Ok(pair) => pair,
        Err(err) => return deliver_api_error(&err),
    };

    info!("User logged in successfully: {}", user.id);

    let body = LoginResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        user: user.profile(),
    };

    let mut response = deliver_serialized_json(&body, StatusCode::OK)?;
    jar.apply(&mut response);
    Ok(response)
}
