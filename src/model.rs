//! Data types shared by the HTTP handlers, the client and the views.
//!
//! Archive items keep the service's PascalCase field names so an inventory
//! payload can be deserialized as-is; everything that crosses our own HTTP
//! surface is camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status text given to a job right after it is initiated
pub const INITIAL_JOB_STATUS: &str = "In Progress";

/// One archive as reported by a vault inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ArchiveItem {
    pub archive_id: String,
    #[serde(default)]
    pub archive_description: Option<String>,
    #[serde(default)]
    pub creation_date: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, rename = "SHA256TreeHash")]
    pub sha256_tree_hash: String,
}

impl ArchiveItem {
    /// Description for display, falling back for unnamed archives
    pub fn display_name(&self) -> &str {
        match self.archive_description.as_deref() {
            Some(desc) if !desc.is_empty() => desc,
            _ => "Unnamed Archive",
        }
    }
}

/// Body of a completed inventory-retrieval job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InventoryPayload {
    #[serde(default, rename = "VaultARN")]
    pub vault_arn: Option<String>,
    #[serde(default)]
    pub inventory_date: Option<String>,
    #[serde(default)]
    pub archive_list: Vec<ArchiveItem>,
}

/// An inventory job tracked by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryJob {
    pub job_id: String,
    pub status: String,
    pub creation_date: String,
    pub completed: bool,
}

impl InventoryJob {
    /// A freshly initiated job
    pub fn started(job_id: String, now: DateTime<Utc>) -> Self {
        Self {
            job_id,
            status: INITIAL_JOB_STATUS.to_string(),
            creation_date: now.to_rfc3339(),
            completed: false,
        }
    }

    /// Parsed creation time, if the stored string is valid RFC 3339
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.creation_date)
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }
}

/// Archive list persisted together with the time it was fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedInventory {
    pub timestamp: String,
    pub archives: Vec<ArchiveItem>,
}

/// Identifier and location of a freshly uploaded archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub archive_id: String,
    pub location: String,
}

/// Response of `POST /api/upload`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response of `POST /api/inventory/initiate`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response of `GET /api/inventory/status`
///
/// `inventory` is serialized even when null so a completed job with an
/// empty output stays distinguishable from an incomplete one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn pending(status: String) -> Self {
        Self {
            completed: false,
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn finished(inventory: serde_json::Value) -> Self {
        Self {
            completed: true,
            inventory: Some(inventory),
            ..Default::default()
        }
    }

    /// The archive list of a completed job, if its payload is an object.
    ///
    /// A payload without `ArchiveList` yields an empty list.
    pub fn archive_list(&self) -> Option<anyhow::Result<Vec<ArchiveItem>>> {
        match self.inventory.as_ref()? {
            serde_json::Value::Null => None,
            value => Some(
                serde_json::from_value::<InventoryPayload>(value.clone())
                    .map(|payload| payload.archive_list)
                    .map_err(anyhow::Error::from),
            ),
        }
    }
}
