use anyhow::Result;
use common::{
    rpc::routes, Ack, Epoch, IntermediateLocationsRequest, IntermediateLocationsResponse,
    RegisterIntermediateRequest, TaskCompleteRequest, TaskId, TaskKind, TaskReply, TaskRequest,
    WorkerId,
};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

/// Cliente de las RPC del coordinador. Cualquier error de transporte o un
/// status != 2xx se devuelve como error: para el worker es fatal.
#[derive(Clone)]
pub struct CoordinatorClient {
    http: Client,
    base_url: String,
}

impl CoordinatorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, R>(&self, route: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, route);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn request_task(&self, worker_id: &WorkerId) -> Result<TaskReply> {
        self.post(
            routes::REQUEST_TASK,
            &TaskRequest {
                worker_id: worker_id.clone(),
            },
        )
        .await
    }

    pub async fn report_completion(&self, kind: TaskKind, id: TaskId, epoch: Epoch) -> Result<()> {
        let _: Ack = self
            .post(routes::COMPLETE_TASK, &TaskCompleteRequest { kind, id, epoch })
            .await?;
        Ok(())
    }

    pub async fn register_intermediate(&self, partition: u32, location: &str) -> Result<()> {
        let _: Ack = self
            .post(
                routes::REGISTER_INTERMEDIATE,
                &RegisterIntermediateRequest {
                    partition,
                    location: location.to_string(),
                },
            )
            .await?;
        Ok(())
    }

    pub async fn fetch_intermediate_locations(&self, partition: u32) -> Result<Vec<String>> {
        let resp: IntermediateLocationsResponse = self
            .post(
                routes::INTERMEDIATE_LOCATIONS,
                &IntermediateLocationsRequest { partition },
            )
            .await?;
        Ok(resp.locations)
    }
}
