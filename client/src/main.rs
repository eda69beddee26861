use anyhow::Result;
use clap::{Parser, Subcommand};
use common::{endpoint, rpc::routes, JobInfo};
use reqwest::Client;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "client")]
#[command(about = "CLI simple para consultar al coordinador")]
struct Cli {
    /// URL del coordinador (por defecto MR_COORDINATOR_URL o el puerto del usuario)
    #[arg(long)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Muestra la fase y los contadores del job
    Status,
    /// Espera hasta que el job termine
    Wait {
        /// Intervalo entre consultas, en milisegundos
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

async fn fetch_job(client: &Client, base_url: &str) -> Result<JobInfo> {
    let url = format!("{}{}", base_url, routes::JOB);
    let resp = client.get(&url).send().await?.error_for_status()?;
    Ok(resp.json().await?)
}

fn print_job(job: &JobInfo) {
    println!("Job:");
    println!("  fase: {:?}", job.phase);
    println!("  map: {}/{}", job.completed_map, job.n_map);
    println!("  reduce: {}/{}", job.completed_reduce, job.n_reduce);
    println!("  terminado: {}", job.done);
    println!("  inicio: {}", job.started_at);
    if let Some(fin) = job.finished_at {
        println!("  fin: {}", fin);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base_url = cli.url.unwrap_or_else(endpoint::coordinator_base_url);

    match cli.command {
        Commands::Status => {
            let job = fetch_job(&client, &base_url).await?;
            print_job(&job);
        }
        Commands::Wait { interval_ms } => loop {
            let job = fetch_job(&client, &base_url).await?;
            if job.done {
                print_job(&job);
                break;
            }
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        },
    }

    Ok(())
}
