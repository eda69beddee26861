use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Índice de la tarea dentro de su tipo.
/// Para Map identifica el archivo de entrada, para Reduce la partición de salida.
pub type TaskId = usize;

/// Número de asignación de una tarea. Cambia en cada despacho.
pub type Epoch = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Map,
    Reduce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Idle,
    InProgress,
    Completed,
}

/// Estado completo de una tarea, tal como lo guarda el coordinador.
#[derive(Debug, Clone)]
pub struct Task {
    pub kind: TaskKind,
    pub id: TaskId,
    pub status: TaskStatus,

    /// Momento del último paso a InProgress
    pub assigned_at: Option<DateTime<Utc>>,
    /// Se incrementa en cada asignación; 0 = nunca despachada
    pub epoch: Epoch,

    /// Archivo de entrada (solo Map)
    pub input_path: Option<String>,
    pub n_reduce: u32,
}

impl Task {
    pub fn map(id: TaskId, input_path: String, n_reduce: u32) -> Self {
        Self {
            kind: TaskKind::Map,
            id,
            status: TaskStatus::Idle,
            assigned_at: None,
            epoch: 0,
            input_path: Some(input_path),
            n_reduce,
        }
    }

    pub fn reduce(id: TaskId, n_reduce: u32) -> Self {
        Self {
            kind: TaskKind::Reduce,
            id,
            status: TaskStatus::Idle,
            assigned_at: None,
            epoch: 0,
            input_path: None,
            n_reduce,
        }
    }

    pub fn descriptor(&self) -> TaskDescriptor {
        TaskDescriptor {
            kind: self.kind,
            id: self.id,
            epoch: self.epoch,
            input_path: self.input_path.clone(),
            n_reduce: self.n_reduce,
        }
    }
}

/// Lo que viaja al worker cuando se le asigna una tarea.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub kind: TaskKind,
    pub id: TaskId,
    pub epoch: Epoch,
    pub input_path: Option<String>,
    pub n_reduce: u32,
}
