use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use maillist_server_app::{
    domain::subscriber::SubscriberRecord,
    ports::mailing::RemoteMember,
    services::subscription::TagOutcome,
};

use crate::{ApiError, AppState};

#[derive(serde::Deserialize)]
pub struct AddSubscriberRequest {
    email: String,
    group: Option<String>,
}

#[derive(serde::Deserialize)]
pub struct ListQuery {
    limit: Option<u32>,
}

#[derive(serde::Serialize)]
pub struct OperationResponse {
    email: String,
    operation: &'static str,
    status: &'static str,
    message: String,
}

#[derive(serde::Serialize)]
pub struct ListResponse {
    operation: &'static str,
    status: &'static str,
    items: usize,
    data: Vec<SubscriberRecord>,
}

#[derive(serde::Serialize)]
pub struct RecordResponse {
    email: String,
    operation: &'static str,
    status: &'static str,
    data: SubscriberRecord,
}

#[derive(serde::Serialize)]
pub struct RemoteStatusResponse {
    email: String,
    operation: &'static str,
    status: &'static str,
    result: RemoteMember,
}

pub async fn add(
    State(state): State<AppState>,
    Json(body): Json<AddSubscriberRequest>,
) -> Result<(StatusCode, Json<OperationResponse>), ApiError> {
    let registration = state
        .app
        .add_subscriber_workflow
        .add_subscriber(&body.email, body.group.as_deref())
        .await?;
    let message = match registration.tagging {
        TagOutcome::Applied => "Email successfully added to mailing list".to_string(),
        TagOutcome::Failed(e) => format!(
            "Email added to mailing list, but tagging failed: {}",
            e
        ),
    };
    Ok((
        StatusCode::CREATED,
        Json(OperationResponse {
            email: body.email,
            operation: "add",
            status: "success",
            message,
        }),
    ))
}

pub async fn get_all(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let data = state
        .app
        .list_subscribers_use_case
        .list_subscribers(query.limit.unwrap_or(0))
        .await?;
    Ok(Json(ListResponse {
        operation: "get",
        status: "success",
        items: data.len(),
        data,
    }))
}

pub async fn get_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<RecordResponse>, ApiError> {
    let record = state
        .app
        .get_subscriber_use_case
        .get_subscriber(&email)
        .await?;
    match record {
        Some(data) => Ok(Json(RecordResponse {
            email,
            operation: "get",
            status: "success",
            data,
        })),
        None => Err(ApiError::not_found("Email not found")),
    }
}

pub async fn remove(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<OperationResponse>, ApiError> {
    state
        .app
        .remove_subscriber_workflow
        .remove_subscriber(&email)
        .await?;
    Ok(Json(OperationResponse {
        email,
        operation: "delete",
        status: "success",
        message: "Email successfully deleted".to_string(),
    }))
}

pub async fn get_remote_status(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<RemoteStatusResponse>, ApiError> {
    let member = state
        .app
        .lookup_remote_status_use_case
        .lookup_remote_status(&email)
        .await?;
    match member {
        Some(result) => Ok(Json(RemoteStatusResponse {
            email,
            operation: "get",
            status: "success",
            result,
        })),
        None => Err(ApiError::not_found("User not found in mailing service")),
    }
}
