use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use coordinator::{AppState, Config, JobState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("coordinator=info,tower_http=info")),
        )
        .init();

    let config = Config::parse();
    let files = config.input_files();

    let job = JobState::new(files, config.n_reduce);
    info!(
        "job creado: {} tareas map, {} tareas reduce, timeout por tarea {:?}",
        job.n_map(),
        job.n_reduce(),
        config.task_timeout()
    );
    let state = AppState::new(job, config.task_timeout());

    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!("coordinador escuchando en {}", listener.local_addr()?);

    coordinator::serve(listener, state, config.shutdown_grace()).await?;
    info!("coordinador apagado");
    Ok(())
}
