use anyhow::{Context, Result};
use common::{endpoint, MapFn, ReduceFn, TaskDescriptor, TaskKind, TaskReply, WorkerId};
use std::{env, path::PathBuf, time::Duration};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::client::CoordinatorClient;
use crate::executor;

const DEFAULT_WAIT_MS: u64 = 1000;

/// Configuración del worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub coordinator_url: String,
    /// Directorio donde se escriben intermedios y salidas
    pub work_dir: PathBuf,
    /// Pausa cuando el coordinador responde Wait
    pub wait_interval: Duration,
}

impl WorkerConfig {
    /// Lee la configuración de variables de entorno:
    /// - MR_COORDINATOR_URL (por defecto, el puerto del usuario en 127.0.0.1)
    /// - MR_WORK_DIR (por defecto ".")
    /// - MR_WAIT_MS (por defecto 1000)
    pub fn from_env() -> Self {
        let work_dir = env::var("MR_WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let wait_ms = env::var("MR_WAIT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_WAIT_MS);

        Self {
            coordinator_url: endpoint::coordinator_base_url(),
            work_dir,
            wait_interval: Duration::from_millis(wait_ms),
        }
    }
}

/// Nombre del worker: hostname + uuid (solo para logs del coordinador).
fn new_worker_id() -> WorkerId {
    let hostname = hostname::get()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    format!("{}-{}", hostname, uuid::Uuid::new_v4())
}

pub struct Worker {
    id: WorkerId,
    client: CoordinatorClient,
    config: WorkerConfig,
    mapf: MapFn,
    reducef: ReduceFn,
}

impl Worker {
    pub fn new(config: WorkerConfig, mapf: MapFn, reducef: ReduceFn) -> Self {
        Self {
            id: new_worker_id(),
            client: CoordinatorClient::new(config.coordinator_url.clone()),
            config,
            mapf,
            reducef,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Loop principal del worker:
    /// - pide tarea
    /// - Done: sale
    /// - Wait: duerme y reintenta
    /// - Map / Reduce: ejecuta y reporta
    ///
    /// Cualquier error de E/S o de RPC corta el loop; el coordinador
    /// reasigna la tarea cuando vence su timeout.
    /// Devuelve cuántas tareas ejecutó.
    pub async fn run(&self) -> Result<usize> {
        info!(
            "worker {} arrancando contra {} (work_dir={})",
            self.id,
            self.client.base_url(),
            self.config.work_dir.display()
        );

        let mut executed = 0;
        loop {
            match self.client.request_task(&self.id).await? {
                TaskReply::Done => {
                    info!("worker {}: no queda trabajo, {} tareas ejecutadas", self.id, executed);
                    return Ok(executed);
                }
                TaskReply::Wait => {
                    debug!("worker {}: sin tareas libres, esperando {:?}", self.id, self.config.wait_interval);
                    sleep(self.config.wait_interval).await;
                }
                TaskReply::Task { task } => {
                    self.execute(task).await?;
                    executed += 1;
                }
            }
        }
    }

    async fn execute(&self, task: TaskDescriptor) -> Result<()> {
        info!(
            "worker {}: tarea {:?} {} (epoch={})",
            self.id, task.kind, task.id, task.epoch
        );

        match task.kind {
            TaskKind::Map => self.run_map(&task).await?,
            TaskKind::Reduce => self.run_reduce(&task).await?,
        }

        self.client
            .report_completion(task.kind, task.id, task.epoch)
            .await?;
        info!("worker {}: terminé tarea {:?} {}", self.id, task.kind, task.id);
        Ok(())
    }

    async fn run_map(&self, task: &TaskDescriptor) -> Result<()> {
        let mapf = self.mapf;
        let work_dir = self.config.work_dir.clone();
        let t = task.clone();

        let written = tokio::task::spawn_blocking(move || executor::run_map(&t, mapf, &work_dir))
            .await?
            .with_context(|| format!("map {} sobre {:?}", task.id, task.input_path))?;

        for (partition, location) in &written {
            self.client.register_intermediate(*partition, location).await?;
        }
        debug!("map {}: {} archivos intermedios", task.id, written.len());
        Ok(())
    }

    async fn run_reduce(&self, task: &TaskDescriptor) -> Result<()> {
        let partition = task.id as u32;
        let locations = self.client.fetch_intermediate_locations(partition).await?;
        debug!("reduce {}: {} archivos intermedios", partition, locations.len());

        let reducef = self.reducef;
        let work_dir = self.config.work_dir.clone();
        let out = tokio::task::spawn_blocking(move || {
            executor::run_reduce(partition, &locations, reducef, &work_dir)
        })
        .await?
        .with_context(|| format!("reduce de la partición {}", partition))?;

        debug!("reduce {}: salida en {}", partition, out.display());
        Ok(())
    }
}

/// Punto de entrada para una aplicación: arranca un worker con sus
/// funciones map y reduce y corre hasta que el job termina.
pub async fn run(config: WorkerConfig, mapf: MapFn, reducef: ReduceFn) -> Result<usize> {
    Worker::new(config, mapf, reducef).run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_id_incluye_uuid() {
        let a = new_worker_id();
        let b = new_worker_id();
        assert_ne!(a, b);
        assert!(a.len() > 36);
    }
}
