//! HTTP endpoints for pool transfer operations.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::service::{PoolError, PoolTransferService};
use crate::domain::{LeadId, StaffId, TransferAction};
use crate::repository::{Page, PoolFilter, Store, TransferFilter};

/// Router builder exposing the pool surface. Transport authentication is
/// handled upstream; bodies carry the acting staff id explicitly.
pub fn pool_router<S>(service: Arc<PoolTransferService<S>>) -> Router
where
    S: Store + 'static,
{
    Router::new()
        .route("/api/v1/pool/leads", get(list_handler::<S>))
        .route("/api/v1/pool/leads/:lead_id", delete(delete_handler::<S>))
        .route("/api/v1/pool/leads/:lead_id/claim", post(claim_handler::<S>))
        .route("/api/v1/pool/leads/assign", post(assign_handler::<S>))
        .route(
            "/api/v1/pool/leads/batch-delete",
            post(batch_delete_handler::<S>),
        )
        .route("/api/v1/pool/transfers", get(transfers_handler::<S>))
        .route("/api/v1/leads/to-pool", post(to_pool_handler::<S>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct PoolListParams {
    #[serde(default)]
    page: Option<usize>,
    #[serde(default)]
    page_size: Option<usize>,
    #[serde(default)]
    keyword: Option<String>,
    #[serde(default)]
    drop_reason: Option<String>,
    #[serde(default)]
    previous_owner: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransferListParams {
    #[serde(default)]
    page: Option<usize>,
    #[serde(default)]
    page_size: Option<usize>,
    #[serde(default)]
    lead_id: Option<String>,
    #[serde(default)]
    action: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClaimRequest {
    staff_id: StaffId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignRequest {
    lead_ids: Vec<LeadId>,
    staff_id: StaffId,
    operator_staff_id: StaffId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToPoolRequest {
    lead_ids: Vec<LeadId>,
    operator_staff_id: StaffId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchDeleteRequest {
    lead_ids: Vec<LeadId>,
}

fn page_of(page: Option<usize>, page_size: Option<usize>) -> Page {
    Page::new(page.unwrap_or(1), page_size.unwrap_or(20))
}

fn error_response(error: PoolError) -> Response {
    let status = match &error {
        PoolError::LeadNotFound => StatusCode::NOT_FOUND,
        PoolError::NotInPool => StatusCode::CONFLICT,
        PoolError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

async fn list_handler<S>(
    State(service): State<Arc<PoolTransferService<S>>>,
    Query(params): Query<PoolListParams>,
) -> Response
where
    S: Store + 'static,
{
    let filter = PoolFilter {
        keyword: params.keyword,
        drop_reason: params.drop_reason,
        previous_owner: params.previous_owner,
    };
    match service.pool_leads(&filter, page_of(params.page, params.page_size)) {
        Ok(page) => (StatusCode::OK, axum::Json(page)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn claim_handler<S>(
    State(service): State<Arc<PoolTransferService<S>>>,
    Path(lead_id): Path<String>,
    axum::Json(request): axum::Json<ClaimRequest>,
) -> Response
where
    S: Store + 'static,
{
    match service.claim(&LeadId(lead_id), &request.staff_id) {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn assign_handler<S>(
    State(service): State<Arc<PoolTransferService<S>>>,
    axum::Json(request): axum::Json<AssignRequest>,
) -> Response
where
    S: Store + 'static,
{
    match service.assign(&request.lead_ids, &request.staff_id, &request.operator_staff_id) {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn to_pool_handler<S>(
    State(service): State<Arc<PoolTransferService<S>>>,
    axum::Json(request): axum::Json<ToPoolRequest>,
) -> Response
where
    S: Store + 'static,
{
    match service.return_to_pool(&request.lead_ids, &request.operator_staff_id) {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn delete_handler<S>(
    State(service): State<Arc<PoolTransferService<S>>>,
    Path(lead_id): Path<String>,
) -> Response
where
    S: Store + 'static,
{
    match service.delete(&LeadId(lead_id)) {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn batch_delete_handler<S>(
    State(service): State<Arc<PoolTransferService<S>>>,
    axum::Json(request): axum::Json<BatchDeleteRequest>,
) -> Response
where
    S: Store + 'static,
{
    match service.delete_batch(&request.lead_ids) {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn transfers_handler<S>(
    State(service): State<Arc<PoolTransferService<S>>>,
    Query(params): Query<TransferListParams>,
) -> Response
where
    S: Store + 'static,
{
    let action = match params.action.as_deref() {
        None => None,
        Some(label) => match TransferAction::from_label(label) {
            Some(action) => Some(action),
            None => {
                let payload = json!({ "error": format!("unknown transfer action '{label}'") });
                return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
            }
        },
    };
    let filter = TransferFilter {
        lead: params.lead_id.map(LeadId),
        action,
    };
    match service.transfers(&filter, page_of(params.page, params.page_size)) {
        Ok(page) => (StatusCode::OK, axum::Json(page)).into_response(),
        Err(error) => error_response(error),
    }
}
