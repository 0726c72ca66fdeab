use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Response, StatusCode, header};
use serde::Serialize;
use tracing::{debug, error, warn};

use shared::types::{ApiError, ErrorResponse, MessageResponse};

use crate::ResponseBody;

/// Serialize any `Serialize` type and deliver it as a JSON response.
/// This is the primary helper all handlers should use instead of
/// writing their own one-off serialization + response-building blocks.
pub fn deliver_serialized_json<T: Serialize>(
    data: &T,
    status: StatusCode,
) -> Result<Response<ResponseBody>> {
    let json = serde_json::to_string(data).context("Failed to serialize response")?;

    debug!("Delivering serialized JSON response, size: {} bytes", json.len());

    let response = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(json)).boxed())
        .map_err(|e| anyhow!("Failed to build JSON response: {}", e))?;

    Ok(response)
}

/// Delivers a JSON error envelope with the specified code, message, and status.
pub fn deliver_error_json(
    error_code: &str,
    message: &str,
    status: StatusCode,
) -> Result<Response<ResponseBody>> {
    deliver_serialized_json(&ErrorResponse::new(error_code, message), status)
}

/// Render an [`ApiError`] as its error envelope.
pub fn deliver_api_error(err: &ApiError) -> Result<Response<ResponseBody>> {
    let status = err.status();
    if status.is_server_error() {
        error!("Responding {} {}", status.as_u16(), err.to_code());
    } else {
        warn!("Responding {} {}: {}", status.as_u16(), err.to_code(), err);
    }
    deliver_serialized_json(&err.to_response(), status)
}

/// `{"message": "..."}` with the given status.
pub fn deliver_message(message: &str, status: StatusCode) -> Result<Response<ResponseBody>> {
    deliver_serialized_json(&MessageResponse::new(message), status)
}

/// Last-resort 500 for when even the JSON helpers fail.
pub fn bare_internal_error() -> Response<ResponseBody> {
    let mut response = Response::new(Full::new(Bytes::from_static(
        br#"{"status":"error","code":"INTERNAL_ERROR","message":"An internal error occurred"}"#,
    ))
    .boxed());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}
