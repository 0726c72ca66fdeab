use anyhow::Result;
use hyper::{Request, Response, StatusCode};
use tracing::info;

use shared::types::RegistrationData;

use crate::handlers::http::utils::{deliver_api_error, deliver_message, read_json_body};
use crate::session::register_account;
use crate::{AppState, RequestBody, ResponseBody};

/// `POST /api/auth/register`
pub async fn handle_register(
    req: Request<RequestBody>,
    state: AppState,
) -> Result<Response<ResponseBody>> {
    info!("Processing registration request");

    let data: RegistrationData = match read_json_body(req).await {
        Ok(data) => data,
        Err(err) => return deliver_api_error(&err),
    };

    match register_account(&state.db, data).await {
        Ok(user_id) => {
            info!("Registered user {}", user_id);
            deliver_message("User registered successfully", StatusCode::CREATED)
        }
        Err(err) => deliver_api_error(&err),
    }
}
