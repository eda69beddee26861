use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use common::{
    rpc::routes, Ack, IntermediateLocationsRequest, IntermediateLocationsResponse, JobInfo,
    RegisterIntermediateRequest, TaskCompleteRequest, TaskReply, TaskRequest,
};
use tower_http::trace::TraceLayer;

use crate::error::Result;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(routes::HEALTH, get(health))
        .route(routes::JOB, get(get_job))
        .route(routes::REQUEST_TASK, post(request_task))
        .route(routes::COMPLETE_TASK, post(complete_task))
        .route(routes::REGISTER_INTERMEDIATE, post(register_intermediate))
        .route(routes::INTERMEDIATE_LOCATIONS, post(intermediate_locations))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> &'static str {
    "ok"
}

// Estado del job (IsDone + contadores)
async fn get_job(State(state): State<AppState>) -> Json<JobInfo> {
    Json(state.info())
}

// Asigna la siguiente tarea Idle de la fase actual, o Wait / Done
async fn request_task(
    State(state): State<AppState>,
    Json(req): Json<TaskRequest>,
) -> Json<TaskReply> {
    Json(state.request_task(&req.worker_id))
}

// Worker reporta que terminó una tarea
async fn complete_task(
    State(state): State<AppState>,
    Json(req): Json<TaskCompleteRequest>,
) -> Result<Json<Ack>> {
    state.report_completion(req.kind, req.id, req.epoch)?;
    Ok(Json(Ack { ok: true }))
}

// Una tarea map avisa dónde dejó los registros de una partición
async fn register_intermediate(
    State(state): State<AppState>,
    Json(req): Json<RegisterIntermediateRequest>,
) -> Result<Json<Ack>> {
    state.register_intermediate(req.partition, req.location)?;
    Ok(Json(Ack { ok: true }))
}

// Una tarea reduce pide los intermedios de su partición
async fn intermediate_locations(
    State(state): State<AppState>,
    Json(req): Json<IntermediateLocationsRequest>,
) -> Result<Json<IntermediateLocationsResponse>> {
    let locations = state.intermediate_locations(req.partition)?;
    Ok(Json(IntermediateLocationsResponse {
        partition: req.partition,
        locations,
    }))
}
