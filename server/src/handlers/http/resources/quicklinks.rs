use anyhow::Result;
use hyper::{Request, Response, StatusCode};
use tracing::info;

use shared::types::{
    ApiError, Identity, NewQuickLinkData, QuickLinkEnvelope, QuickLinkList, ReorderData,
    UpdateQuickLinkData,
};

use crate::database::quick_links;
use crate::database::utils::{is_valid_url, sanitize_string};
use crate::handlers::http::utils::{
    deliver_api_error, deliver_message, deliver_serialized_json, path_id, read_json_body,
};
use crate::{AppState, RequestBody, ResponseBody, internal_failure};

const NOT_FOUND: ApiError = ApiError::NotFound("Quick link");

/// Trimmed value, or `None` when blank.
fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| sanitize_string(&v)).filter(|v| !v.is_empty())
}

fn check_url(url: &str) -> Result<(), ApiError> {
    if is_valid_url(url) {
        Ok(())
    } else {
        Err(ApiError::validation("URL must be an absolute http or https URL"))
    }
}

/// `GET /api/quicklinks`
pub async fn handle_list(
    _req: Request<RequestBody>,
    state: AppState,
    identity: Identity,
) -> Result<Response<ResponseBody>> {
    match quick_links::list_quick_links(&state.db, identity.user_id).await {
        Ok(quick_links) => deliver_serialized_json(&QuickLinkList { quick_links }, StatusCode::OK),
        Err(e) => deliver_api_error(&internal_failure("list quick links")(e)),
    }
}

/// `POST /api/quicklinks`. New links go to the end of the board.
pub async fn handle_create(
    req: Request<RequestBody>,
    state: AppState,
    identity: Identity,
) -> Result<Response<ResponseBody>> {
    match create(req, &state, &identity).await {
        Ok(envelope) => deliver_serialized_json(&envelope, StatusCode::CREATED),
        Err(err) => deliver_api_error(&err),
    }
}

async fn create(
    req: Request<RequestBody>,
    state: &AppState,
    identity: &Identity,
) -> Result<QuickLinkEnvelope, ApiError> {
    let data: NewQuickLinkData = read_json_body(req).await?;

    let (Some(title), Some(url)) = (non_blank(Some(data.title)), non_blank(Some(data.url))) else {
        return Err(ApiError::validation("Title and URL are required"));
    };
    check_url(&url)?;

    let quick_link = quick_links::create_quick_link(&state.db, identity.user_id, title, url)
        .await
        .map_err(internal_failure("create quick link"))?;

    info!("User {} added quick link {}", identity.user_id, quick_link.id);
    Ok(QuickLinkEnvelope { quick_link })
}

/// `PUT /api/quicklinks/:id`. Blank fields are left unchanged.
pub async fn handle_update(
    req: Request<RequestBody>,
    state: AppState,
    identity: Identity,
) -> Result<Response<ResponseBody>> {
    match update(req, &state, &identity).await {
        Ok(envelope) => deliver_serialized_json(&envelope, StatusCode::OK),
        Err(err) => deliver_api_error(&err),
    }
}

async fn update(
    req: Request<RequestBody>,
    state: &AppState,
    identity: &Identity,
) -> Result<QuickLinkEnvelope, ApiError> {
    let link_id = path_id(&req).ok_or(NOT_FOUND)?;
    let data: UpdateQuickLinkData = read_json_body(req).await?;

    let title = non_blank(data.title);
    let url = non_blank(data.url);
    if let Some(url) = &url {
        check_url(url)?;
    }

    let quick_link =
        quick_links::update_quick_link(&state.db, identity.user_id, link_id, title, url)
            .await
            .map_err(internal_failure("update quick link"))?
            .ok_or(NOT_FOUND)?;

    Ok(QuickLinkEnvelope { quick_link })
}

/// `POST /api/quicklinks/reorder`. All or nothing.
pub async fn handle_reorder(
    req: Request<RequestBody>,
    state: AppState,
    identity: Identity,
) -> Result<Response<ResponseBody>> {
    let data: ReorderData = match read_json_body(req).await {
        Ok(data) => data,
        Err(err) => return deliver_api_error(&err),
    };

    let count = data.updates.len();
    match quick_links::reorder_quick_links(&state.db, identity.user_id, data.updates).await {
        Ok(true) => {
            info!("User {} reordered {} quick links", identity.user_id, count);
            deliver_message("Quick links reordered", StatusCode::OK)
        }
        Ok(false) => deliver_api_error(&ApiError::validation(
            "Every id must be one of your quick links",
        )),
        Err(e) => deliver_api_error(&internal_failure("reorder quick links")(e)),
    }
}

/// `DELETE /api/quicklinks/:id`
pub async fn handle_delete(
    req: Request<RequestBody>,
    state: AppState,
    identity: Identity,
) -> Result<Response<ResponseBody>> {
    let Some(link_id) = path_id(&req) else {
        return deliver_api_error(&NOT_FOUND);
    };

    match quick_links::delete_quick_link(&state.db, identity.user_id, link_id).await {
        Ok(true) => {
            info!("User {} deleted quick link {}", identity.user_id, link_id);
            deliver_message("Link deleted successfully", StatusCode::OK)
        }
        Ok(false) => deliver_api_error(&NOT_FOUND),
        Err(e) => deliver_api_error(&internal_failure("delete quick link")(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_dropped() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some(" Docs ".into())).as_deref(), Some("Docs"));
    }

    #[test]
    fn url_must_be_http() {
        assert!(check_url("https://docs.rs").is_ok());
        assert!(check_url("javascript:alert(1)").is_err());
    }
}
