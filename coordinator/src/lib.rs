pub mod config;
pub mod error;
pub mod failover;
pub mod handlers;
pub mod state;

use std::time::Duration;

use tokio::{net::TcpListener, time::sleep};
use tracing::info;

pub use config::Config;
pub use error::CoordinatorError;
pub use state::{AppState, JobState};

const DONE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Sirve las RPC del coordinador en `listener` hasta que el job termina.
/// Después de `IsDone()` sigue respondiendo durante `grace`, para que los
/// workers que están esperando reciban "done" y salgan solos.
pub async fn serve(listener: TcpListener, state: AppState, grace: Duration) -> std::io::Result<()> {
    let app = handlers::build_router(state.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state, grace))
        .await
}

async fn shutdown_signal(state: AppState, grace: Duration) {
    tokio::select! {
        _ = wait_until_done(&state) => {
            info!("job terminado, apagando en {:?}", grace);
            sleep(grace).await;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl-c recibido, apagando");
        }
    }
}

async fn wait_until_done(state: &AppState) {
    while !state.is_done() {
        sleep(DONE_POLL_INTERVAL).await;
    }
}
