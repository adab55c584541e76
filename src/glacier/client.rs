use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_glacier::Client;
use aws_sdk_glacier::primitives::ByteStream;
use aws_sdk_glacier::types::JobParameters;
use bytes::Bytes;

use super::{
    ArchiveReceipt, ArchiveService, INVENTORY_JOB_DESCRIPTION, INVENTORY_JOB_FORMAT,
    INVENTORY_JOB_TYPE, JobDescription, VaultConfig,
};

/// Wrapper around the AWS Glacier client, bound to a single vault
pub struct GlacierClient {
    client: Client,
    vault: VaultConfig,
    region: String,
}

impl GlacierClient {
    /// Wrap an already configured SDK client
    pub fn from_client(client: Client, vault: VaultConfig, region: String) -> Self {
        GlacierClient {
            client,
            vault,
            region,
        }
    }

    pub fn vault(&self) -> &VaultConfig {
        &self.vault
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

#[async_trait]
impl ArchiveService for GlacierClient {
    async fn upload_archive(&self, description: &str, body: Bytes) -> Result<ArchiveReceipt> {
        let size = body.len();
        let resp = self
            .client
            .upload_archive()
            .vault_name(&self.vault.vault_name)
            .account_id(&self.vault.account_id)
            .archive_description(description)
            .body(ByteStream::from(body))
            .send()
            .await
            .context(format!(
                "Failed to upload archive '{}' ({} bytes) to vault {}",
                description, size, self.vault.vault_name
            ))?;

        Ok(ArchiveReceipt {
            archive_id: resp.archive_id().map(String::from),
            location: resp.location().map(String::from),
        })
    }

    async fn initiate_inventory(&self) -> Result<Option<String>> {
        let params = JobParameters::builder()
            .r#type(INVENTORY_JOB_TYPE)
            .description(INVENTORY_JOB_DESCRIPTION)
            .format(INVENTORY_JOB_FORMAT)
            .build();

        let resp = self
            .client
            .initiate_job()
            .vault_name(&self.vault.vault_name)
            .account_id(&self.vault.account_id)
            .job_parameters(params)
            .send()
            .await
            .context(format!(
                "Failed to initiate inventory retrieval for vault {}",
                self.vault.vault_name
            ))?;

        Ok(resp.job_id().map(String::from))
    }

    async fn describe_job(&self, job_id: &str) -> Result<JobDescription> {
        let resp = self
            .client
            .describe_job()
            .vault_name(&self.vault.vault_name)
            .account_id(&self.vault.account_id)
            .job_id(job_id)
            .send()
            .await
            .context(format!("Failed to describe job {}", job_id))?;

        Ok(JobDescription {
            completed: Option::<bool>::from(resp.completed()).unwrap_or(false),
            status_code: resp.status_code().map(|s| s.as_str().to_string()),
        })
    }

    async fn job_output(&self, job_id: &str) -> Result<Bytes> {
        let resp = self
            .client
            .get_job_output()
            .vault_name(&self.vault.vault_name)
            .account_id(&self.vault.account_id)
            .job_id(job_id)
            .send()
            .await
            .context(format!("Failed to get output of job {}", job_id))?;

        let bytes = resp
            .body
            .collect()
            .await
            .context("Failed to read job output body")?
            .into_bytes();

        Ok(bytes)
    }
}
