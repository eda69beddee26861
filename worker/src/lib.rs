pub mod client;
pub mod executor;
pub mod worker;

pub use client::CoordinatorClient;
pub use worker::{run, Worker, WorkerConfig};
