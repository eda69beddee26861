// coordinator/src/state.rs

use chrono::{DateTime, Utc};
use common::{
    Epoch, JobInfo, JobPhase, Task, TaskId, TaskKind, TaskReply, TaskStatus,
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::error::{CoordinatorError, Result};
use crate::failover;

/// Estado del job. No sabe nada de locks ni de timers: cada método es una
/// transición completa y la serialización la pone `AppState`.
#[derive(Debug)]
pub struct JobState {
    map_tasks: Vec<Task>,
    reduce_tasks: Vec<Task>,

    completed_map: usize,
    completed_reduce: usize,

    // partición -> ubicaciones registradas por las tareas map
    intermediates: Vec<Vec<String>>,

    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl JobState {
    /// Una tarea map por archivo de entrada y `n_reduce` tareas reduce.
    pub fn new(files: Vec<String>, n_reduce: u32) -> Self {
        let n_reduce = n_reduce.max(1);

        let map_tasks = files
            .into_iter()
            .enumerate()
            .map(|(id, file)| Task::map(id, file, n_reduce))
            .collect();
        let reduce_tasks = (0..n_reduce as usize)
            .map(|id| Task::reduce(id, n_reduce))
            .collect();

        Self {
            map_tasks,
            reduce_tasks,
            completed_map: 0,
            completed_reduce: 0,
            intermediates: vec![Vec::new(); n_reduce as usize],
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn n_map(&self) -> usize {
        self.map_tasks.len()
    }

    pub fn n_reduce(&self) -> u32 {
        self.reduce_tasks.len() as u32
    }

    pub fn map_phase_done(&self) -> bool {
        self.completed_map == self.map_tasks.len()
    }

    pub fn job_done(&self) -> bool {
        self.map_phase_done() && self.completed_reduce == self.reduce_tasks.len()
    }

    pub fn phase(&self) -> JobPhase {
        if !self.map_phase_done() {
            JobPhase::Map
        } else if !self.job_done() {
            JobPhase::Reduce
        } else {
            JobPhase::Done
        }
    }

    fn tasks_mut(&mut self, kind: TaskKind) -> &mut Vec<Task> {
        match kind {
            TaskKind::Map => &mut self.map_tasks,
            TaskKind::Reduce => &mut self.reduce_tasks,
        }
    }

    fn task_mut(&mut self, kind: TaskKind, id: TaskId) -> Result<&mut Task> {
        self.tasks_mut(kind)
            .get_mut(id)
            .ok_or(CoordinatorError::UnknownTask { kind, id })
    }

    pub fn task(&self, kind: TaskKind, id: TaskId) -> Option<&Task> {
        match kind {
            TaskKind::Map => self.map_tasks.get(id),
            TaskKind::Reduce => self.reduce_tasks.get(id),
        }
    }

    /// Primera tarea Idle (menor índice) de la fase actual -> InProgress.
    /// Si no hay ninguna libre pero la fase sigue abierta: Wait.
    pub fn assign_next(&mut self) -> TaskReply {
        let kind = match self.phase() {
            JobPhase::Map => TaskKind::Map,
            JobPhase::Reduce => TaskKind::Reduce,
            JobPhase::Done => return TaskReply::Done,
        };

        match self
            .tasks_mut(kind)
            .iter_mut()
            .find(|t| t.status == TaskStatus::Idle)
        {
            Some(task) => {
                task.status = TaskStatus::InProgress;
                task.epoch += 1;
                task.assigned_at = Some(Utc::now());
                TaskReply::Task {
                    task: task.descriptor(),
                }
            }
            None => TaskReply::Wait,
        }
    }

    /// Marca la tarea como Completed. Devuelve false si ya lo estaba
    /// (reporte duplicado, no es error).
    pub fn complete(&mut self, kind: TaskKind, id: TaskId) -> Result<bool> {
        let task = self.task_mut(kind, id)?;
        match task.status {
            TaskStatus::Completed => return Ok(false),
            TaskStatus::Idle if task.epoch == 0 => {
                return Err(CoordinatorError::NotDispatched { kind, id });
            }
            // Idle con epoch > 0: reclamada por timeout y terminada tarde
            _ => task.status = TaskStatus::Completed,
        }

        match kind {
            TaskKind::Map => self.completed_map += 1,
            TaskKind::Reduce => {
                self.completed_reduce += 1;
                if self.job_done() {
                    self.finished_at = Some(Utc::now());
                }
            }
        }
        Ok(true)
    }

    /// InProgress -> Idle, sólo si sigue en vuelo con la misma asignación.
    pub fn reclaim(&mut self, kind: TaskKind, id: TaskId, epoch: Epoch) -> bool {
        match self.task_mut(kind, id) {
            Ok(task) if task.status == TaskStatus::InProgress && task.epoch == epoch => {
                task.status = TaskStatus::Idle;
                true
            }
            _ => false,
        }
    }

    fn check_partition(&self, partition: u32) -> Result<usize> {
        let idx = partition as usize;
        if idx < self.intermediates.len() {
            Ok(idx)
        } else {
            Err(CoordinatorError::PartitionOutOfRange {
                partition,
                n_reduce: self.n_reduce(),
            })
        }
    }

    /// Agrega una ubicación intermedia. Devuelve false si no se agregó:
    /// ya estaba registrada, o la fase map ya cerró (el índice es de sólo lectura).
    pub fn register_intermediate(&mut self, partition: u32, location: String) -> Result<bool> {
        let idx = self.check_partition(partition)?;
        if self.map_phase_done() {
            return Ok(false);
        }

        let locations = &mut self.intermediates[idx];
        if locations.contains(&location) {
            return Ok(false);
        }
        locations.push(location);
        Ok(true)
    }

    pub fn intermediate_locations(&self, partition: u32) -> Result<Vec<String>> {
        let idx = self.check_partition(partition)?;
        Ok(self.intermediates[idx].clone())
    }

    pub fn info(&self) -> JobInfo {
        JobInfo {
            phase: self.phase(),
            n_map: self.map_tasks.len(),
            n_reduce: self.reduce_tasks.len(),
            completed_map: self.completed_map,
            completed_reduce: self.completed_reduce,
            done: self.job_done(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

struct Inner {
    job: JobState,
    // timer de reclamo vigente por tarea, con la asignación que vigila
    watchers: HashMap<(TaskKind, TaskId), (Epoch, AbortHandle)>,
}

/// Estado compartido del coordinador: un único lock sobre todo el job.
/// Ninguna operación mantiene el lock a través de un `.await`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<Inner>>,
    task_timeout: Duration,
}

impl AppState {
    pub fn new(job: JobState, task_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                job,
                watchers: HashMap::new(),
            })),
            task_timeout,
        }
    }

    pub fn task_timeout(&self) -> Duration {
        self.task_timeout
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// RequestTask: asigna la siguiente tarea y arranca su timer de reclamo.
    pub fn request_task(&self, worker_id: &str) -> TaskReply {
        let mut inner = self.lock();
        let reply = inner.job.assign_next();

        match &reply {
            TaskReply::Task { task } => {
                info!(
                    "asignando tarea {:?} {} (epoch={}, input={:?}) al worker {}",
                    task.kind, task.id, task.epoch, task.input_path, worker_id
                );
                let handle =
                    failover::spawn_reclaim_timer(self.clone(), task.kind, task.id, task.epoch);
                if let Some((_, old)) = inner
                    .watchers
                    .insert((task.kind, task.id), (task.epoch, handle))
                {
                    old.abort();
                }
            }
            TaskReply::Wait => {
                debug!("worker {} pidió tarea pero todas están en vuelo", worker_id);
            }
            TaskReply::Done => {
                debug!("worker {} pidió tarea pero el job ya terminó", worker_id);
            }
        }

        reply
    }

    /// ReportCompletion: idempotente. Un reporte de una asignación vieja
    /// también completa la tarea.
    pub fn report_completion(&self, kind: TaskKind, id: TaskId, epoch: Epoch) -> Result<()> {
        let mut inner = self.lock();
        let was_map_done = inner.job.map_phase_done();

        if !inner.job.complete(kind, id)? {
            debug!("reporte duplicado de tarea {:?} {} (epoch={})", kind, id, epoch);
            return Ok(());
        }

        if let Some((_, handle)) = inner.watchers.remove(&(kind, id)) {
            handle.abort();
        }

        let current = inner.job.task(kind, id).map(|t| t.epoch).unwrap_or(epoch);
        if current != epoch {
            warn!(
                "tarea {:?} {} completada por una asignación vieja (epoch={} actual={})",
                kind, id, epoch, current
            );
        }

        let info = inner.job.info();
        info!(
            "tarea {:?} {} completada (map {}/{}, reduce {}/{})",
            kind, id, info.completed_map, info.n_map, info.completed_reduce, info.n_reduce
        );
        if !was_map_done && inner.job.map_phase_done() {
            info!("fase map terminada, empiezan las tareas reduce");
        }
        if info.done {
            info!("job terminado");
        }
        Ok(())
    }

    /// Llamado por el timer: devuelve la tarea a Idle si sigue en vuelo
    /// con la misma asignación.
    pub fn reclaim(&self, kind: TaskKind, id: TaskId, epoch: Epoch) -> bool {
        let mut inner = self.lock();

        if matches!(inner.watchers.get(&(kind, id)), Some((e, _)) if *e == epoch) {
            inner.watchers.remove(&(kind, id));
        }

        let reclaimed = inner.job.reclaim(kind, id, epoch);
        if reclaimed {
            warn!(
                "tarea {:?} {} (epoch={}) sin completar tras {:?}, vuelve a Idle",
                kind, id, epoch, self.task_timeout
            );
        }
        reclaimed
    }

    pub fn register_intermediate(&self, partition: u32, location: String) -> Result<()> {
        let mut inner = self.lock();
        let map_done = inner.job.map_phase_done();

        if inner.job.register_intermediate(partition, location.clone())? {
            debug!("intermedio registrado: partición {} -> {}", partition, location);
        } else if map_done {
            warn!(
                "registro tardío ignorado (fase map cerrada): partición {} -> {}",
                partition, location
            );
        } else {
            debug!("registro repetido ignorado: partición {} -> {}", partition, location);
        }
        Ok(())
    }

    pub fn intermediate_locations(&self, partition: u32) -> Result<Vec<String>> {
        self.lock().job.intermediate_locations(partition)
    }

    pub fn is_done(&self) -> bool {
        self.lock().job.job_done()
    }

    pub fn info(&self) -> JobInfo {
        self.lock().job.info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("pg-{}.txt", i)).collect()
    }

    fn expect_task(reply: TaskReply) -> common::TaskDescriptor {
        match reply {
            TaskReply::Task { task } => task,
            other => panic!("se esperaba una tarea, llegó {:?}", other),
        }
    }

    #[test]
    fn new_crea_una_tarea_map_por_archivo() {
        let job = JobState::new(files(3), 2);
        assert_eq!(job.n_map(), 3);
        assert_eq!(job.n_reduce(), 2);
        assert_eq!(job.phase(), JobPhase::Map);
        assert!(!job.map_phase_done());
        assert!(!job.job_done());
        assert_eq!(
            job.task(TaskKind::Map, 1).unwrap().input_path.as_deref(),
            Some("pg-1.txt")
        );
    }

    #[test]
    fn n_reduce_cero_se_ajusta_a_uno() {
        let job = JobState::new(files(1), 0);
        assert_eq!(job.n_reduce(), 1);
    }

    #[test]
    fn asigna_map_en_orden_y_luego_wait() {
        let mut job = JobState::new(files(2), 2);

        let t0 = expect_task(job.assign_next());
        let t1 = expect_task(job.assign_next());
        assert_eq!((t0.kind, t0.id, t0.epoch), (TaskKind::Map, 0, 1));
        assert_eq!((t1.kind, t1.id), (TaskKind::Map, 1));
        assert_eq!(t0.n_reduce, 2);

        assert_eq!(job.assign_next(), TaskReply::Wait);
        assert_eq!(
            job.task(TaskKind::Map, 0).unwrap().status,
            TaskStatus::InProgress
        );
        assert!(job.task(TaskKind::Map, 0).unwrap().assigned_at.is_some());
    }

    #[test]
    fn no_hay_reduce_hasta_que_termina_map() {
        let mut job = JobState::new(files(2), 1);
        expect_task(job.assign_next());
        expect_task(job.assign_next());

        job.complete(TaskKind::Map, 0).unwrap();
        // falta map 1: nada de reduce todavía
        assert_eq!(job.assign_next(), TaskReply::Wait);
        assert_eq!(job.phase(), JobPhase::Map);

        job.complete(TaskKind::Map, 1).unwrap();
        assert!(job.map_phase_done());

        let r = expect_task(job.assign_next());
        assert_eq!((r.kind, r.id), (TaskKind::Reduce, 0));
        assert_eq!(r.input_path, None);
    }

    #[test]
    fn job_completo_devuelve_done() {
        let mut job = JobState::new(files(1), 2);
        expect_task(job.assign_next());
        job.complete(TaskKind::Map, 0).unwrap();

        expect_task(job.assign_next());
        expect_task(job.assign_next());
        job.complete(TaskKind::Reduce, 1).unwrap();
        assert!(!job.job_done());
        job.complete(TaskKind::Reduce, 0).unwrap();

        assert!(job.job_done());
        assert_eq!(job.assign_next(), TaskReply::Done);

        let info = job.info();
        assert_eq!(info.phase, JobPhase::Done);
        assert!(info.done);
        assert!(info.finished_at.is_some());
    }

    #[test]
    fn sin_archivos_arranca_directo_en_reduce() {
        let mut job = JobState::new(Vec::new(), 1);
        assert!(job.map_phase_done());
        let r = expect_task(job.assign_next());
        assert_eq!(r.kind, TaskKind::Reduce);
    }

    #[test]
    fn complete_es_idempotente() {
        let mut job = JobState::new(files(2), 1);
        expect_task(job.assign_next());

        assert!(job.complete(TaskKind::Map, 0).unwrap());
        assert!(!job.complete(TaskKind::Map, 0).unwrap());
        assert!(!job.complete(TaskKind::Map, 0).unwrap());

        let info = job.info();
        assert_eq!(info.completed_map, 1);
        assert!(!job.map_phase_done());
    }

    #[test]
    fn complete_rechaza_tarea_nunca_despachada_o_desconocida() {
        let mut job = JobState::new(files(1), 1);
        assert_eq!(
            job.complete(TaskKind::Map, 0),
            Err(CoordinatorError::NotDispatched {
                kind: TaskKind::Map,
                id: 0
            })
        );
        assert_eq!(
            job.complete(TaskKind::Reduce, 5),
            Err(CoordinatorError::UnknownTask {
                kind: TaskKind::Reduce,
                id: 5
            })
        );
    }

    #[test]
    fn reclaim_devuelve_a_idle_y_se_reasigna_con_nuevo_epoch() {
        let mut job = JobState::new(files(1), 1);
        let t = expect_task(job.assign_next());

        assert!(job.reclaim(TaskKind::Map, 0, t.epoch));
        assert_eq!(job.task(TaskKind::Map, 0).unwrap().status, TaskStatus::Idle);
        // segundo disparo con la misma asignación: ya no está en vuelo
        assert!(!job.reclaim(TaskKind::Map, 0, t.epoch));

        let again = expect_task(job.assign_next());
        assert_eq!(again.id, 0);
        assert_eq!(again.epoch, t.epoch + 1);

        // timer viejo no toca la asignación nueva
        assert!(!job.reclaim(TaskKind::Map, 0, t.epoch));
        assert_eq!(
            job.task(TaskKind::Map, 0).unwrap().status,
            TaskStatus::InProgress
        );
    }

    #[test]
    fn reclaim_no_toca_tareas_completadas() {
        let mut job = JobState::new(files(1), 1);
        let t = expect_task(job.assign_next());
        job.complete(TaskKind::Map, 0).unwrap();

        assert!(!job.reclaim(TaskKind::Map, 0, t.epoch));
        assert_eq!(
            job.task(TaskKind::Map, 0).unwrap().status,
            TaskStatus::Completed
        );
    }

    #[test]
    fn completar_tarde_una_tarea_reclamada_cuenta_una_vez() {
        let mut job = JobState::new(files(1), 1);
        let t = expect_task(job.assign_next());
        job.reclaim(TaskKind::Map, 0, t.epoch);

        // el worker lento termina igual
        assert!(job.complete(TaskKind::Map, 0).unwrap());
        assert!(job.map_phase_done());
        assert!(!job.complete(TaskKind::Map, 0).unwrap());
        assert_eq!(job.info().completed_map, 1);
    }

    #[test]
    fn register_intermediate_deduplica_y_se_cierra_con_la_fase_map() {
        let mut job = JobState::new(files(2), 2);
        expect_task(job.assign_next());
        expect_task(job.assign_next());

        assert!(job.register_intermediate(1, "mr-0-1".into()).unwrap());
        assert!(!job.register_intermediate(1, "mr-0-1".into()).unwrap());
        assert!(job.register_intermediate(1, "mr-1-1".into()).unwrap());

        job.complete(TaskKind::Map, 0).unwrap();
        job.complete(TaskKind::Map, 1).unwrap();

        // índice de sólo lectura en fase reduce
        assert!(!job.register_intermediate(1, "mr-9-1".into()).unwrap());
        assert_eq!(
            job.intermediate_locations(1).unwrap(),
            vec!["mr-0-1".to_string(), "mr-1-1".to_string()]
        );
        assert!(job.intermediate_locations(0).unwrap().is_empty());
    }

    #[test]
    fn particion_fuera_de_rango_es_error() {
        let mut job = JobState::new(files(1), 2);
        assert_eq!(
            job.register_intermediate(2, "x".into()),
            Err(CoordinatorError::PartitionOutOfRange {
                partition: 2,
                n_reduce: 2
            })
        );
        assert!(job.intermediate_locations(7).is_err());
    }
}
