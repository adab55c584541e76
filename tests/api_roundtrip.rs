//! End-to-end tests: the router served on a local port, driven through
//! `HttpApi` and the views exactly as the CLI drives them.
//!
//! The vault is replaced by an in-memory `ArchiveService`, so these tests
//! need no AWS access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use indicatif::ProgressBar;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use coldvault::client::{HttpApi, InventoryApi};
use coldvault::glacier::{ArchiveReceipt, ArchiveService, JobDescription};
use coldvault::model::ArchiveItem;
use coldvault::store::{JOB_KEY, LocalStore, RESULTS_KEY};
use coldvault::view::{InventoryView, Phase, PollOutcome, UploadView, ViewError, WatchExit};
use coldvault::{AppState, build_router};

/// In-memory vault: uploads become archives, inventory jobs complete once
/// `finish_jobs` is called
#[derive(Default)]
struct MemoryVault {
    archives: Mutex<Vec<ArchiveItem>>,
    jobs: Mutex<HashMap<String, bool>>,
    fail_initiate: bool,
}

impl MemoryVault {
    fn finish_jobs(&self) {
        for done in self.jobs.lock().unwrap().values_mut() {
            *done = true;
        }
    }
}

#[async_trait]
impl ArchiveService for MemoryVault {
    async fn upload_archive(&self, description: &str, body: Bytes) -> Result<ArchiveReceipt> {
        let mut archives = self.archives.lock().unwrap();
        let id = format!("archive-{}", archives.len() + 1);
        archives.push(ArchiveItem {
            archive_id: id.clone(),
            archive_description: Some(description.to_string()),
            creation_date: Utc::now().to_rfc3339(),
            size: body.len() as u64,
            sha256_tree_hash: "00".repeat(32),
        });
        Ok(ArchiveReceipt {
            location: Some(format!("/-/vaults/memory/archives/{id}")),
            archive_id: Some(id),
        })
    }

    async fn initiate_inventory(&self) -> Result<Option<String>> {
        if self.fail_initiate {
            return Err(anyhow!("AccessDeniedException: not authorized"));
        }
        let mut jobs = self.jobs.lock().unwrap();
        let id = format!("job-{}", jobs.len() + 1);
        jobs.insert(id.clone(), false);
        Ok(Some(id))
    }

    async fn describe_job(&self, job_id: &str) -> Result<JobDescription> {
        let jobs = self.jobs.lock().unwrap();
        let done = jobs
            .get(job_id)
            .copied()
            .ok_or_else(|| anyhow!("ResourceNotFoundException: {job_id}"))?;
        Ok(JobDescription {
            completed: done,
            status_code: Some(if done { "Succeeded" } else { "InProgress" }.to_string()),
        })
    }

    async fn job_output(&self, _job_id: &str) -> Result<Bytes> {
        let archives = self.archives.lock().unwrap();
        let body = json!({
            "VaultARN": "arn:aws:glacier:us-east-1:000000000000:vaults/memory",
            "InventoryDate": Utc::now().to_rfc3339(),
            "ArchiveList": &*archives,
        });
        Ok(Bytes::from(body.to_string()))
    }
}

/// Serve the router on an ephemeral port, returning its base URL
async fn spawn_server(vault: Arc<MemoryVault>) -> String {
    let app = build_router(AppState::new(vault));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Should bind");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_upload_then_inventory() {
    let vault = Arc::new(MemoryVault::default());
    let base_url = spawn_server(vault.clone()).await;
    let api: Arc<dyn InventoryApi> = Arc::new(HttpApi::new(base_url));

    // Upload through the view
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("photos-2024.tar");
    std::fs::write(&path, vec![7u8; 4096]).unwrap();

    let mut upload = UploadView::with_progress(api.clone(), ProgressBar::hidden());
    upload.select_file(Some(path));
    let result = upload.upload().await.unwrap().clone();
    assert_eq!(result.archive_id, "archive-1");
    assert_eq!(result.location, "/-/vaults/memory/archives/archive-1");

    // Start an inventory job and poll it
    let store = LocalStore::open(tmp.path().join("state")).unwrap();
    let mut view = InventoryView::load(api.clone(), store.clone(), Utc::now());
    let job_id = view.initiate(Utc::now()).await.unwrap().job_id.clone();
    assert_eq!(job_id, "job-1");

    assert_eq!(
        view.check_status(Utc::now()).await,
        PollOutcome::StillPending {
            status: "InProgress".to_string()
        }
    );

    vault.finish_jobs();
    assert_eq!(
        view.check_status(Utc::now()).await,
        PollOutcome::Completed { archives: 1 }
    );
    assert_eq!(view.phase(), Phase::Idle);
    assert_eq!(view.archives()[0].display_name(), "photos-2024.tar");
    assert_eq!(view.archives()[0].size, 4096);

    // A fresh load shows the cached list without a job
    assert_eq!(store.get(JOB_KEY).unwrap(), None);
    assert!(store.get(RESULTS_KEY).unwrap().is_some());
    let reloaded = InventoryView::load(api, store, Utc::now());
    assert_eq!(reloaded.phase(), Phase::Idle);
    assert_eq!(reloaded.archives(), view.archives());
}

#[tokio::test]
async fn test_job_resumes_across_loads() {
    let vault = Arc::new(MemoryVault::default());
    let base_url = spawn_server(vault.clone()).await;
    let api: Arc<dyn InventoryApi> = Arc::new(HttpApi::new(base_url));

    let tmp = tempfile::tempdir().unwrap();
    let store = LocalStore::open(tmp.path()).unwrap();

    let mut first = InventoryView::load(api.clone(), store.clone(), Utc::now());
    first.initiate(Utc::now()).await.unwrap();
    drop(first);

    let mut second = InventoryView::load(api.clone(), store.clone(), Utc::now());
    assert_eq!(second.phase(), Phase::Pending);
    assert!(matches!(
        second.initiate(Utc::now()).await,
        Err(ViewError::AlreadyPending(_))
    ));
    assert_eq!(vault.jobs.lock().unwrap().len(), 1);

    vault.finish_jobs();
    assert_eq!(
        second.check_status(Utc::now()).await,
        PollOutcome::Completed { archives: 0 }
    );
}

#[tokio::test]
async fn test_server_errors_reach_the_views() {
    let vault = Arc::new(MemoryVault {
        fail_initiate: true,
        ..Default::default()
    });
    let base_url = spawn_server(vault).await;
    let api = HttpApi::new(base_url);

    let err = api.initiate_inventory().await.unwrap_err();
    assert_eq!(err.to_string(), "AccessDeniedException: not authorized");

    // Unknown job: status endpoint answers 500, the client surfaces the message
    let err = api.inventory_status("job-404").await.unwrap_err();
    assert!(err.to_string().contains("ResourceNotFoundException"));

    // Missing job id is rejected before reaching the vault
    let err = api.inventory_status("").await.unwrap_err();
    assert_eq!(err.to_string(), "Job ID is required");
}

#[tokio::test]
async fn test_poll_survives_server_outage() {
    let tmp = tempfile::tempdir().unwrap();
    let store = LocalStore::open(tmp.path()).unwrap();

    // Nothing listens on this port
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let api: Arc<dyn InventoryApi> = Arc::new(HttpApi::new(format!("http://{addr}")));

    let mut view = InventoryView::load(api, store.clone(), Utc::now());
    view.finish_initiate(Ok("job-1".to_string()), Utc::now())
        .unwrap();

    assert_eq!(view.check_status(Utc::now()).await, PollOutcome::Failed);
    assert_eq!(view.phase(), Phase::Pending);
    assert!(store.get(JOB_KEY).unwrap().is_some());
}

#[tokio::test]
async fn test_poll_survives_unresponsive_server() {
    let tmp = tempfile::tempdir().unwrap();
    let store = LocalStore::open(tmp.path()).unwrap();

    // Accepts connections and never answers
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let accepted = connections.clone();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            accepted.fetch_add(1, Ordering::SeqCst);
            held.push(socket);
        }
    });

    let api: Arc<dyn InventoryApi> = Arc::new(HttpApi::new(format!("http://{addr}")));
    let mut view = InventoryView::load(api, store.clone(), Utc::now())
        .with_status_timeout(Duration::from_millis(200));
    view.finish_initiate(Ok("job-1".to_string()), Utc::now())
        .unwrap();

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        canceller.cancel();
    });

    let mut failures = 0;
    let exit = view
        .watch(Duration::from_millis(100), cancel, |_, outcome| {
            assert_eq!(outcome, &PollOutcome::Failed);
            failures += 1;
        })
        .await;

    assert_eq!(exit, WatchExit::Cancelled);
    assert!(failures >= 3, "only {failures} checks completed");
    assert!(connections.load(Ordering::SeqCst) >= 3);
    assert_eq!(view.phase(), Phase::Pending);
    assert!(store.get(JOB_KEY).unwrap().is_some());
}
