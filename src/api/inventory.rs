//! Inventory job endpoints
//!
//! Inventory retrieval is asynchronous on the vault side: a job is started,
//! then polled until the service reports it complete, at which point its
//! output holds the JSON listing.

use anyhow::anyhow;
use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::{debug, info};

use super::error::{ApiError, ApiResult};
use crate::AppState;
use crate::model::{InitiateResponse, StatusResponse};

/// Query parameters for the status endpoint
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "jobId")]
    pub job_id: Option<String>,
}

/// POST /api/inventory/initiate
///
/// Starts an inventory-retrieval job for the configured vault.
pub async fn initiate_inventory(
    State(state): State<AppState>,
) -> ApiResult<Json<InitiateResponse>> {
    let job_id = state
        .service
        .initiate_inventory()
        .await?
        .ok_or_else(|| anyhow!("Archive service returned no job id"))?;

    info!("Initiated inventory job {}", job_id);

    Ok(Json(InitiateResponse {
        success: true,
        job_id: Some(job_id),
        error: None,
    }))
}

/// GET /api/inventory/status?jobId=ID
///
/// Reports whether the job has completed. For a completed job the output is
/// fetched and returned as parsed JSON; an incomplete job only reports its
/// status code and its output is never requested.
pub async fn inventory_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<StatusResponse>> {
    let job_id = query
        .job_id
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::MissingJobId)?;

    let job = state.service.describe_job(&job_id).await?;

    if !job.completed {
        debug!(
            "Inventory job {} not complete: {}",
            job_id,
            job.status_code.as_deref().unwrap_or("-")
        );
        return Ok(Json(StatusResponse {
            completed: false,
            status: job.status_code,
            ..Default::default()
        }));
    }

    let output = state.service.job_output(&job_id).await?;
    let inventory = if output.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&output)?
    };

    info!("Inventory job {} complete ({} bytes)", job_id, output.len());

    Ok(Json(StatusResponse::finished(inventory)))
}
