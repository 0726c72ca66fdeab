use std::collections::HashMap;

use http_body_util::{BodyExt, Limited};
use hyper::Request;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use shared::types::ApiError;

use crate::RequestBody;

/// Largest request body the API will read.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Read and deserialize a JSON body, capped at [`MAX_BODY_BYTES`].
///
/// An empty body is parsed as `{}` so that types with defaulted fields
/// surface as field-level validation errors instead of a parse error.
pub async fn read_json_body<T: DeserializeOwned>(req: Request<RequestBody>) -> Result<T, ApiError> {
    let bytes = match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("Failed to read request body: {}", e);
            return Err(ApiError::validation("Request body unreadable or too large"));
        }
    };

    debug!("Read request body, size: {} bytes", bytes.len());

    let source: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        &bytes
    };

    serde_json::from_slice(source).map_err(|e| {
        debug!("Rejected JSON body: {}", e);
        ApiError::validation("Invalid JSON body")
    })
}

/// Numeric `:id` taken from the last path segment.
pub fn path_id(req: &Request<RequestBody>) -> Option<i64> {
    req.uri()
        .path()
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
}

/// Decoded query string; later duplicates win.
pub fn query_params(req: &Request<RequestBody>) -> HashMap<String, String> {
    req.uri()
        .query()
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}
