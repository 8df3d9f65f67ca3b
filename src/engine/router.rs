//! Administrative HTTP surface for the recycling engine.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::runner::RecycleCycle;
use crate::repository::{RuleSource, Store};

pub struct RecycleApiState<S> {
    pub runner: Arc<RecycleCycle<S>>,
    pub store: Arc<S>,
}

impl<S> Clone for RecycleApiState<S> {
    fn clone(&self) -> Self {
        Self {
            runner: Arc::clone(&self.runner),
            store: Arc::clone(&self.store),
        }
    }
}

/// Router exposing the on-demand trigger and the rule configuration read.
pub fn recycle_router<S>(runner: Arc<RecycleCycle<S>>, store: Arc<S>) -> Router
where
    S: Store + 'static,
{
    Router::new()
        .route("/api/v1/recycle/run", post(run_handler::<S>))
        .route("/api/v1/recycle/rules", get(rules_handler::<S>))
        .with_state(RecycleApiState { runner, store })
}

/// Manual trigger. Unlike the scheduler, failures surface to the caller.
async fn run_handler<S>(State(state): State<RecycleApiState<S>>) -> Response
where
    S: Store + 'static,
{
    match state.runner.run_once() {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

async fn rules_handler<S>(State(state): State<RecycleApiState<S>>) -> Response
where
    S: Store + 'static,
{
    match state.store.recycle_rules() {
        Ok(rules) => (StatusCode::OK, axum::Json(rules)).into_response(),
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
