use tokio::{task::AbortHandle, time::sleep};

use common::{Epoch, TaskId, TaskKind};

use crate::state::AppState;

/// Timer de reclamo de una asignación:
/// - duerme `task_timeout`
/// - si la tarea sigue InProgress con el mismo epoch, vuelve a Idle
///
/// No avisa ni mata al worker original; si termina tarde, su reporte se acepta.
pub fn spawn_reclaim_timer(state: AppState, kind: TaskKind, id: TaskId, epoch: Epoch) -> AbortHandle {
    let timeout = state.task_timeout();
    tokio::spawn(async move {
        sleep(timeout).await;
        state.reclaim(kind, id, epoch);
    })
    .abort_handle()
}
