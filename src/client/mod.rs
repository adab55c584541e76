//! HTTP client for the coldvault endpoints, as used by the views

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;

use crate::model::{InitiateResponse, StatusResponse, UploadResponse, UploadResult};

/// Default address of a local `coldvault serve`
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Calls the views make against the server
#[async_trait]
pub trait InventoryApi: Send + Sync {
    /// Upload `data` as an archive named `file_name`
    async fn upload(&self, file_name: &str, data: Bytes) -> Result<UploadResult>;

    /// Start an inventory job, returning its id
    async fn initiate_inventory(&self) -> Result<String>;

    /// Poll an inventory job
    async fn inventory_status(&self, job_id: &str) -> Result<StatusResponse>;
}

/// [`InventoryApi`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        HttpApi { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Read a JSON body, tolerating non-JSON bodies on error statuses
async fn decode<T: DeserializeOwned + Default>(resp: reqwest::Response) -> Result<(StatusCode, T)> {
    let status = resp.status();
    let bytes = resp.bytes().await.context("Failed to read response body")?;

    match serde_json::from_slice(&bytes) {
        Ok(body) => Ok((status, body)),
        Err(_) if !status.is_success() => Ok((status, T::default())),
        Err(e) => Err(e).context(format!("Invalid response body (HTTP {})", status)),
    }
}

#[async_trait]
impl InventoryApi for HttpApi {
    async fn upload(&self, file_name: &str, data: Bytes) -> Result<UploadResult> {
        let len = data.len() as u64;
        let part = Part::stream_with_length(data, len).file_name(file_name.to_string());
        let form = Form::new().part("file", part);

        let resp = self
            .client
            .post(self.url("/api/upload"))
            .multipart(form)
            .send()
            .await
            .context("Upload request failed")?;

        let (status, body): (_, UploadResponse) = decode(resp).await?;
        if !status.is_success() || !body.success {
            bail!("{}", body.error.unwrap_or_else(|| "Upload failed".to_string()));
        }

        Ok(UploadResult {
            archive_id: body.archive_id.unwrap_or_default(),
            location: body.location.unwrap_or_default(),
        })
    }

    async fn initiate_inventory(&self) -> Result<String> {
        let resp = self
            .client
            .post(self.url("/api/inventory/initiate"))
            .send()
            .await
            .context("Inventory initiation request failed")?;

        let (status, body): (_, InitiateResponse) = decode(resp).await?;
        if !status.is_success() || !body.success {
            bail!(
                "{}",
                body.error
                    .unwrap_or_else(|| "Failed to initiate inventory retrieval".to_string())
            );
        }

        body.job_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| anyhow!("Server returned no job id"))
    }

    async fn inventory_status(&self, job_id: &str) -> Result<StatusResponse> {
        let resp = self
            .client
            .get(self.url("/api/inventory/status"))
            .query(&[("jobId", job_id)])
            .send()
            .await
            .context("Inventory status request failed")?;

        let (status, body): (_, StatusResponse) = decode(resp).await?;
        if !status.is_success() {
            bail!(
                "{}",
                body.error
                    .unwrap_or_else(|| format!("Status check failed (HTTP {})", status))
            );
        }

        Ok(body)
    }
}
