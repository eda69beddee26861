use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::{TaskId, TaskKind};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("tarea desconocida: {kind:?} {id}")]
    UnknownTask { kind: TaskKind, id: TaskId },

    #[error("partición fuera de rango: {partition} (n_reduce={n_reduce})")]
    PartitionOutOfRange { partition: u32, n_reduce: u32 },

    #[error("la tarea {kind:?} {id} nunca fue despachada")]
    NotDispatched { kind: TaskKind, id: TaskId },
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;

impl IntoResponse for CoordinatorError {
    fn into_response(self) -> Response {
        let status = match self {
            CoordinatorError::UnknownTask { .. } | CoordinatorError::PartitionOutOfRange { .. } => {
                StatusCode::NOT_FOUND
            }
            CoordinatorError::NotDispatched { .. } => StatusCode::CONFLICT,
        };
        (status, self.to_string()).into_response()
    }
}
