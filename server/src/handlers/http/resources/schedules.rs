use anyhow::Result;
use hyper::{Request, Response, StatusCode};
use tracing::info;

use shared::types::{
    ApiError, Identity, NewScheduleData, ScheduleEnvelope, ScheduleList, UpdateScheduleData,
};

use crate::database::schedules::{self, NewSchedule, SchedulePatch};
use crate::database::utils::{is_valid_date, is_valid_url, sanitize_string};
use crate::handlers::http::utils::{
    deliver_api_error, deliver_message, deliver_serialized_json, path_id, query_params,
    read_json_body,
};
use crate::{AppState, RequestBody, ResponseBody, internal_failure};

const NOT_FOUND: ApiError = ApiError::NotFound("Schedule");

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| sanitize_string(&v)).filter(|v| !v.is_empty())
}

fn check_date(field: &str, date: &str) -> Result<(), ApiError> {
    if is_valid_date(date) {
        Ok(())
    } else {
        Err(ApiError::validation(format!("{} must be a YYYY-MM-DD date", field)))
    }
}

fn check_url(url: &str) -> Result<(), ApiError> {
    if is_valid_url(url) {
        Ok(())
    } else {
        Err(ApiError::validation("hyperlinkUrl must be an absolute http or https URL"))
    }
}

/// `GET /api/schedules?startDate=&endDate=`. Both bounds inclusive.
pub async fn handle_list(
    req: Request<RequestBody>,
    state: AppState,
    identity: Identity,
) -> Result<Response<ResponseBody>> {
    match list(&req, &state, &identity).await {
        Ok(list) => deliver_serialized_json(&list, StatusCode::OK),
        Err(err) => deliver_api_error(&err),
    }
}

async fn list(
    req: &Request<RequestBody>,
    state: &AppState,
    identity: &Identity,
) -> Result<ScheduleList, ApiError> {
    let mut params = query_params(req);
    let start = non_blank(params.remove("startDate"));
    let end = non_blank(params.remove("endDate"));

    if let Some(start) = &start {
        check_date("startDate", start)?;
    }
    if let Some(end) = &end {
        check_date("endDate", end)?;
    }
    if let (Some(start), Some(end)) = (&start, &end) {
        if start > end {
            return Err(ApiError::validation("startDate must not be after endDate"));
        }
    }

    let schedules = schedules::list_schedules(&state.db, identity.user_id, start, end)
        .await
        .map_err(internal_failure("list schedules"))?;

    Ok(ScheduleList { schedules })
}

/// `POST /api/schedules`
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
) -> Result<ScheduleEnvelope, ApiError> {
    let data: NewScheduleData = read_json_body(req).await?;

    let (Some(title), Some(date), Some(hyperlink_url)) = (
        non_blank(Some(data.title)),
        non_blank(Some(data.date)),
        non_blank(Some(data.hyperlink_url)),
    ) else {
        return Err(ApiError::validation("Title, date, and hyperlinkUrl are required"));
    };
    check_date("date", &date)?;
    check_url(&hyperlink_url)?;

    let new_schedule = NewSchedule {
        title,
        content: non_blank(data.content),
        date,
        hyperlink_url,
    };

    let schedule = schedules::create_schedule(&state.db, identity.user_id, new_schedule)
        .await
        .map_err(internal_failure("create schedule"))?;

    info!("User {} created schedule {}", identity.user_id, schedule.id);
    Ok(ScheduleEnvelope { schedule })
}

/// `GET /api/schedules/:id`
pub async fn handle_get(
    req: Request<RequestBody>,
    state: AppState,
    identity: Identity,
) -> Result<Response<ResponseBody>> {
    let Some(schedule_id) = path_id(&req) else {
        return deliver_api_error(&NOT_FOUND);
    };

    match schedules::get_schedule(&state.db, identity.user_id, schedule_id).await {
        Ok(Some(schedule)) => deliver_serialized_json(&ScheduleEnvelope { schedule }, StatusCode::OK),
        Ok(None) => deliver_api_error(&NOT_FOUND),
        Err(e) => deliver_api_error(&internal_failure("get schedule")(e)),
    }
}

/// `PUT /api/schedules/:id`
///
/// Blank `title`, `date` and `hyperlinkUrl` are ignored. Any `content`
/// present replaces the stored one; `null` or an empty string clears it.
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
) -> Result<ScheduleEnvelope, ApiError> {
    let schedule_id = path_id(&req).ok_or(NOT_FOUND)?;
    let data: UpdateScheduleData = read_json_body(req).await?;

    let patch = SchedulePatch {
        title: non_blank(data.title),
        content: data.content.map(non_blank),
        date: non_blank(data.date),
        hyperlink_url: non_blank(data.hyperlink_url),
    };
    if let Some(date) = &patch.date {
        check_date("date", date)?;
    }
    if let Some(url) = &patch.hyperlink_url {
        check_url(url)?;
    }

    let schedule = schedules::update_schedule(&state.db, identity.user_id, schedule_id, patch)
        .await
        .map_err(internal_failure("update schedule"))?
        .ok_or(NOT_FOUND)?;

    Ok(ScheduleEnvelope { schedule })
}

/// `DELETE /api/schedules/:id`
pub async fn handle_delete(
    req: Request<RequestBody>,
    state: AppState,
    identity: Identity,
) -> Result<Response<ResponseBody>> {
    let Some(schedule_id) = path_id(&req) else {
        return deliver_api_error(&NOT_FOUND);
    };

    match schedules::delete_schedule(&state.db, identity.user_id, schedule_id).await {
        Ok(true) => {
            info!("User {} deleted schedule {}", identity.user_id, schedule_id);
            deliver_message("Schedule deleted successfully", StatusCode::OK)
        }
        Ok(false) => deliver_api_error(&NOT_FOUND),
        Err(e) => deliver_api_error(&internal_failure("delete schedule")(e)),
    }
}
