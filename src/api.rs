use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;

use crate::controller::{Controller, Stage, StageTransition};
use crate::error::PipelineError;
use crate::scheduler::CycleGate;

#[derive(Clone)]
pub struct AppState {
    controller: Arc<Controller>,
    gate: CycleGate,
    metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(controller: Arc<Controller>, gate: CycleGate) -> Self {
        Self {
            controller,
            gate,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/run", post(run_cycle))
        .with_state(state.clone());
    if let Some(handle) = state.metrics {
        app = app.merge(crate::metrics::router_for(handle));
    }
    app
}

#[derive(Serialize)]
struct AbortedBody {
    status: &'static str,
    cycle_id: String,
    stage: Stage,
    error: PipelineError,
    transitions: Vec<StageTransition>,
}

/// The cycle runs in its own task holding the gate, so a client that hangs
/// up mid-cycle does not cancel it.
async fn run_cycle(State(state): State<AppState>) -> Response {
    let Ok(guard) = state.gate.try_enter() else {
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "status": "busy", "error": "a cycle is already running" })),
        )
            .into_response();
    };

    let controller = Arc::clone(&state.controller);
    let task = tokio::spawn(async move {
        let _guard = guard;
        controller.run_cycle().await
    });

    match task.await {
        Ok(Ok(outcome)) => (StatusCode::OK, Json(outcome)).into_response(),
        Ok(Err(aborted)) => {
            let body = AbortedBody {
                status: "aborted",
                cycle_id: aborted.cycle_id,
                stage: aborted.stage,
                error: aborted.error,
                transitions: aborted.transitions,
            };
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
        Err(join_err) => {
            tracing::error!(error = %join_err, "cycle task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "status": "failed", "error": join_err.to_string() })),
            )
                .into_response()
        }
    }
}
