use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use serde::Deserialize;
use shared::{
    domain::{DeliveryId, DeliverymanId, NotificationId, ProblemId, UserId},
    error::{ApiError, ErrorCode},
    protocol::{
        CancelledDelivery, CreateDeliverymanRequest, CreateProblemRequest, CreatedDeliveryman,
        DeliveryProblemListing, DeliveryProblemRecord, DeliverymanSummary, NotificationPayload,
        UpdateDeliverymanRequest,
    },
};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::warn;

use crate::app_state::AppState;

const MAX_BODY_BYTES: usize = 64 * 1024;

type HttpResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    user_id: i64,
}

pub(crate) fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/problems", get(http_list_problems))
        .route(
            "/delivery/:delivery_id/problems",
            get(http_list_delivery_problems).post(http_create_problem),
        )
        .route("/problem/:id/cancel-delivery", delete(http_cancel_delivery))
        .route(
            "/deliverymen",
            get(http_list_deliverymen)
                .post(http_create_deliveryman)
                .put(http_update_deliveryman),
        )
        .route("/deliverymen/:id", delete(http_delete_deliveryman))
        .route("/notifications", get(http_list_notifications))
        .route("/notifications/:id", put(http_mark_notification_read))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Lookup and validation failures answer 400; only storage faults are 500.
fn reject(error: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match error.code {
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(error))
}

/// Malformed bodies, query strings and path segments all answer `Validation fails`.
fn accepted<T, E: std::fmt::Display>(extracted: Result<T, E>) -> HttpResult<T> {
    extracted.map_err(|rejection| {
        warn!(reason = %rejection, "rejected request input");
        reject(ApiError::validation())
    })
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> HttpResult<T> {
    accepted(payload).map(|Json(body)| body)
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> HttpResult<T> {
    accepted(params).map(|Query(params)| params)
}

fn path_id(segment: Result<Path<i64>, PathRejection>) -> HttpResult<i64> {
    accepted(segment).map(|Path(id)| id)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, StatusCode> {
    state.api.storage.health_check().await.map_err(|error| {
        warn!(%error, "health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    })?;
    Ok("ok")
}

async fn http_list_problems(
    State(state): State<Arc<AppState>>,
    q: Result<Query<PageQuery>, QueryRejection>,
) -> HttpResult<Json<Vec<DeliveryProblemListing>>> {
    let q = query(q)?;
    let problems = server_api::list_problems(&state.api, q.page)
        .await
        .map_err(reject)?;
    Ok(Json(problems))
}

async fn http_list_delivery_problems(
    State(state): State<Arc<AppState>>,
    delivery_id: Result<Path<i64>, PathRejection>,
    q: Result<Query<PageQuery>, QueryRejection>,
) -> HttpResult<Json<Vec<DeliveryProblemListing>>> {
    let delivery_id = path_id(delivery_id)?;
    let q = query(q)?;
    let problems =
        server_api::list_delivery_problems(&state.api, DeliveryId(delivery_id), q.page)
            .await
            .map_err(reject)?;
    Ok(Json(problems))
}

async fn http_create_problem(
    State(state): State<Arc<AppState>>,
    delivery_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CreateProblemRequest>, JsonRejection>,
) -> HttpResult<Json<DeliveryProblemRecord>> {
    let delivery_id = path_id(delivery_id)?;
    let req = json_body(payload)?;
    let problem = server_api::create_problem(&state.api, DeliveryId(delivery_id), req)
        .await
        .map_err(reject)?;
    Ok(Json(problem))
}

async fn http_cancel_delivery(
    State(state): State<Arc<AppState>>,
    problem_id: Result<Path<i64>, PathRejection>,
) -> HttpResult<Json<CancelledDelivery>> {
    let problem_id = path_id(problem_id)?;
    let delivery = server_api::cancel_delivery(&state.api, ProblemId(problem_id))
        .await
        .map_err(reject)?;
    Ok(Json(delivery))
}

async fn http_list_deliverymen(
    State(state): State<Arc<AppState>>,
) -> HttpResult<Json<Vec<DeliverymanSummary>>> {
    let deliverymen = server_api::list_deliverymen(&state.api)
        .await
        .map_err(reject)?;
    Ok(Json(deliverymen))
}

async fn http_create_deliveryman(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateDeliverymanRequest>, JsonRejection>,
) -> HttpResult<Json<CreatedDeliveryman>> {
    let req = json_body(payload)?;
    let created = server_api::create_deliveryman(&state.api, req)
        .await
        .map_err(reject)?;
    Ok(Json(created))
}

async fn http_update_deliveryman(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UpdateDeliverymanRequest>, JsonRejection>,
) -> HttpResult<Json<DeliverymanSummary>> {
    let req = json_body(payload)?;
    let updated = server_api::update_deliveryman(&state.api, req)
        .await
        .map_err(reject)?;
    Ok(Json(updated))
}

async fn http_delete_deliveryman(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> HttpResult<StatusCode> {
    let id = path_id(id)?;
    server_api::delete_deliveryman(&state.api, DeliverymanId(id))
        .await
        .map_err(reject)?;
    Ok(StatusCode::OK)
}

async fn http_list_notifications(
    State(state): State<Arc<AppState>>,
    q: Result<Query<UserQuery>, QueryRejection>,
) -> HttpResult<Json<Vec<NotificationPayload>>> {
    let q = query(q)?;
    let notifications = server_api::list_notifications(&state.api, UserId(q.user_id))
        .await
        .map_err(reject)?;
    Ok(Json(notifications))
}

async fn http_mark_notification_read(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    q: Result<Query<UserQuery>, QueryRejection>,
) -> HttpResult<StatusCode> {
    let id = path_id(id)?;
    let q = query(q)?;
    server_api::mark_notification_read(&state.api, UserId(q.user_id), NotificationId(id))
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
