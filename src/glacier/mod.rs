pub mod client;
pub mod config;

pub use client::GlacierClient;
pub use config::{ProviderConfig, VaultConfig, create_glacier_client};

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Job type requested for a full vault listing
pub const INVENTORY_JOB_TYPE: &str = "inventory-retrieval";
/// Description attached to inventory jobs we initiate
pub const INVENTORY_JOB_DESCRIPTION: &str = "Inventory retrieval job";
/// Output format requested for inventory jobs
pub const INVENTORY_JOB_FORMAT: &str = "JSON";

/// Result of uploading a single archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReceipt {
    pub archive_id: Option<String>,
    pub location: Option<String>,
}

/// Completion state of a vault job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescription {
    pub completed: bool,
    /// Service status code, e.g. `InProgress`, `Succeeded`, `Failed`
    pub status_code: Option<String>,
}

/// Operations the HTTP handlers need from the archive transfer service.
///
/// Implemented by [`GlacierClient`] for the real vault; tests substitute an
/// in-memory implementation.
#[async_trait]
pub trait ArchiveService: Send + Sync {
    /// Store `body` as a new archive described by `description`
    async fn upload_archive(&self, description: &str, body: Bytes) -> Result<ArchiveReceipt>;

    /// Start an asynchronous inventory-retrieval job, returning its id
    async fn initiate_inventory(&self) -> Result<Option<String>>;

    /// Fetch the completion state of a job
    async fn describe_job(&self, job_id: &str) -> Result<JobDescription>;

    /// Fetch the output of a completed job
    async fn job_output(&self, job_id: &str) -> Result<Bytes>;
}
