//! Administrative endpoints: validation report, grouping configuration
//! read/update, and on-demand EQIS recompute.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use crate::analysis::validator;
use crate::app::AppState;
use crate::grouping::manager::UpdateError;

pub(crate) async fn validation_report(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match validator::build_report(state.dao()).await {
        Ok(report) => Ok(Json(json!(report))),
        Err(err) => {
            error!(error = %err, "failed to build validation report");
            Err(internal_error(&err.to_string()))
        }
    }
}

pub(crate) async fn get_grouping_config(State(state): State<AppState>) -> Json<Value> {
    let config = state.config_manager().current_config().await;
    Json(json!(config))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConfigUpdateBody {
    #[serde(default)]
    reason: Option<String>,
    updates: serde_json::Map<String, Value>,
}

/// Manual partial configuration update. Unknown or mistyped parameters
/// are rejected with 422; accepted values are clamped into their domain.
pub(crate) async fn update_grouping_config(
    State(state): State<AppState>,
    Json(body): Json<ConfigUpdateBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let reason = body.reason.unwrap_or_else(|| "manual_update".to_string());

    match state
        .config_manager()
        .update_configuration(&body.updates, &reason)
        .await
    {
        Ok(config) => Ok(Json(json!(config))),
        Err(UpdateError::Invalid(err)) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": err.to_string() })),
        )),
        Err(UpdateError::Store(err)) => {
            error!(error = %err, "failed to persist configuration update");
            Err(internal_error(&err.to_string()))
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecomputeQuery {
    event_id: Option<i64>,
}

/// Recompute EQIS for one event or all of them.
pub(crate) async fn recompute_eqis(
    State(state): State<AppState>,
    Query(query): Query<RecomputeQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let computer = state.eqis_computer();

    let result = match query.event_id {
        Some(event_id) => computer.recompute_event(event_id).await.map(|()| 1),
        None => computer.recompute_all().await,
    };

    match result {
        Ok(events_computed) => Ok(Json(json!({ "events_computed": events_computed }))),
        Err(err) => {
            error!(error = %err, "EQIS recompute failed");
            Err(internal_error(&err.to_string()))
        }
    }
}

fn internal_error(message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
}
