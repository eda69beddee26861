use serde::{Deserialize, Serialize};

use crate::task::{Epoch, TaskDescriptor, TaskId, TaskKind};

pub type WorkerId = String;

/// Rutas HTTP del coordinador. Las comparten el router y los clientes.
pub mod routes {
    pub const HEALTH: &str = "/health";
    pub const JOB: &str = "/api/v1/job";
    pub const REQUEST_TASK: &str = "/api/v1/tasks/next";
    pub const COMPLETE_TASK: &str = "/api/v1/tasks/complete";
    pub const REGISTER_INTERMEDIATE: &str = "/api/v1/intermediate";
    pub const INTERMEDIATE_LOCATIONS: &str = "/api/v1/intermediate/locations";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    pub worker_id: WorkerId,
}

/// Respuesta a RequestTask: una tarea, esperar, o no queda trabajo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskReply {
    Task { task: TaskDescriptor },
    Wait,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCompleteRequest {
    pub kind: TaskKind,
    pub id: TaskId,
    pub epoch: Epoch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterIntermediateRequest {
    pub partition: u32,
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntermediateLocationsRequest {
    pub partition: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntermediateLocationsResponse {
    pub partition: u32,
    pub locations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
}
