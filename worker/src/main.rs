use anyhow::Result;
use common::wordcount;
use tracing_subscriber::EnvFilter;

use worker::WorkerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("worker=info,reqwest=info")),
        )
        .init();

    let config = WorkerConfig::from_env();
    worker::run(config, wordcount::map, wordcount::reduce).await?;
    Ok(())
}
