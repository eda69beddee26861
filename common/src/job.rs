use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPhase {
    Map,
    Reduce,
    Done,
}

/// Foto del estado del job, para el endpoint de status y el cliente.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    pub phase: JobPhase,

    pub n_map: usize,
    pub n_reduce: usize,
    pub completed_map: usize,
    pub completed_reduce: usize,

    /// true sólo cuando todas las tareas Reduce reportaron
    pub done: bool,

    // -------- Métricas del job --------
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
