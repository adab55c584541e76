//! Inventory view: tracks one inventory job at a time, polls it until the
//! vault reports it complete, and keeps the resulting archive list cached.
//!
//! The job and the archive list are persisted in a [`LocalStore`] so a job
//! started in one run (they typically take hours) is picked up again by the
//! next run. A persisted job older than [`JOB_MAX_AGE`] is discarded on
//! load, and a cached list older than [`CACHE_MAX_AGE`] is not shown.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use colored::*;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ViewError;
use super::format::{format_bytes, format_date};
use crate::client::InventoryApi;
use crate::model::{ArchiveItem, CachedInventory, InventoryJob, StatusResponse};
use crate::store::{JOB_KEY, LocalStore, RESULTS_KEY};

/// Interval between status checks of a pending job
pub const CHECK_INTERVAL: Duration = Duration::from_secs(30);
/// Age after which a persisted job is abandoned
pub const JOB_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);
/// Age after which a cached archive list is ignored
pub const CACHE_MAX_AGE: Duration = Duration::from_secs(60 * 60);
/// A status check still unanswered after this counts as failed
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(20);

/// Whether a job is being tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Pending,
}

/// What a single status check did to the view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// No job is tracked
    NoJob,
    /// Job finished; the archive list was replaced
    Completed { archives: usize },
    /// Job still running; its status text was updated
    StillPending { status: String },
    /// Response carried nothing actionable
    Unchanged,
    /// Request or response failed; the next tick retries
    Failed,
}

/// Why [`InventoryView::watch`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchExit {
    /// The tracked job completed (or none was tracked)
    Idle,
    /// The cancellation token fired
    Cancelled,
}

/// `true` when `then` is less than `max_age` before `now`.
///
/// Timestamps in the future count as fresh.
fn is_fresh(then: DateTime<Utc>, now: DateTime<Utc>, max_age: Duration) -> bool {
    match (now - then).to_std() {
        Ok(age) => age < max_age,
        Err(_) => true,
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

pub struct InventoryView {
    api: Arc<dyn InventoryApi>,
    store: LocalStore,
    job: Option<InventoryJob>,
    archives: Vec<ArchiveItem>,
    last_updated: Option<String>,
    initiating: bool,
    error: Option<String>,
    status_timeout: Duration,
}

impl InventoryView {
    /// Build the view from persisted state.
    ///
    /// Resumes a job younger than [`JOB_MAX_AGE`] (older ones are removed)
    /// and shows a cached list younger than [`CACHE_MAX_AGE`]. Unreadable
    /// entries are logged and treated as absent.
    pub fn load(api: Arc<dyn InventoryApi>, store: LocalStore, now: DateTime<Utc>) -> Self {
        let mut view = InventoryView {
            api,
            store,
            job: None,
            archives: Vec::new(),
            last_updated: None,
            initiating: false,
            error: None,
            status_timeout: STATUS_TIMEOUT,
        };

        view.job = view.load_job(now);

        if let Some(cached) = view.load_cache(now) {
            view.archives = cached.archives;
            view.last_updated = Some(cached.timestamp);
        }

        view
    }

    /// Bound on a single status check (default [`STATUS_TIMEOUT`])
    pub fn with_status_timeout(mut self, timeout: Duration) -> Self {
        self.status_timeout = timeout;
        self
    }

    fn load_job(&self, now: DateTime<Utc>) -> Option<InventoryJob> {
        let job = match self.store.get_json::<InventoryJob>(JOB_KEY) {
            Ok(job) => job?,
            Err(e) => {
                warn!("Error loading saved inventory job: {:#}", e);
                self.forget(JOB_KEY);
                return None;
            }
        };

        match job.created_at() {
            Some(created) if is_fresh(created, now, JOB_MAX_AGE) => {
                info!("Resuming inventory job {} ({})", job.job_id, job.status);
                Some(job)
            }
            _ => {
                info!("Discarding expired inventory job {}", job.job_id);
                self.forget(JOB_KEY);
                None
            }
        }
    }

    fn load_cache(&self, now: DateTime<Utc>) -> Option<CachedInventory> {
        let cached = match self.store.get_json::<CachedInventory>(RESULTS_KEY) {
            Ok(cached) => cached?,
            Err(e) => {
                warn!("Error loading cached inventory: {:#}", e);
                return None;
            }
        };

        let created = parse_timestamp(&cached.timestamp)?;
        if is_fresh(created, now, CACHE_MAX_AGE) {
            Some(cached)
        } else {
            debug!("Ignoring stale inventory cache from {}", cached.timestamp);
            None
        }
    }

    fn forget(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            warn!("Error removing '{}': {:#}", key, e);
        }
    }

    pub fn phase(&self) -> Phase {
        if self.job.is_some() {
            Phase::Pending
        } else {
            Phase::Idle
        }
    }

    pub fn job(&self) -> Option<&InventoryJob> {
        self.job.as_ref()
    }

    pub fn archives(&self) -> &[ArchiveItem] {
        &self.archives
    }

    pub fn last_updated(&self) -> Option<&str> {
        self.last_updated.as_deref()
    }

    /// Last user-facing error, cleared by the next initiation
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_initiating(&self) -> bool {
        self.initiating
    }

    /// Whether the refresh control is enabled
    pub fn can_initiate(&self) -> bool {
        self.job.is_none() && !self.initiating
    }

    /// Mark an initiation as started.
    ///
    /// Refused while a job is pending or another initiation has not
    /// returned. Every successful call must be paired with
    /// [`finish_initiate`](Self::finish_initiate).
    pub fn begin_initiate(&mut self) -> Result<(), ViewError> {
        if let Some(job) = &self.job {
            return Err(ViewError::AlreadyPending(job.job_id.clone()));
        }
        if self.initiating {
            return Err(ViewError::InitiationInFlight);
        }

        self.initiating = true;
        self.error = None;
        Ok(())
    }

    /// Apply the result of an initiation request
    pub fn finish_initiate(
        &mut self,
        result: anyhow::Result<String>,
        now: DateTime<Utc>,
    ) -> Result<&InventoryJob, ViewError> {
        self.initiating = false;

        let job_id = match result {
            Ok(job_id) => job_id,
            Err(e) => {
                let err = ViewError::server(e);
                self.error = Some(err.to_string());
                return Err(err);
            }
        };

        let job = InventoryJob::started(job_id, now);
        info!("Started inventory job {}", job.job_id);
        self.persist_job(&job);
        Ok(&*self.job.insert(job))
    }

    /// Start an inventory job and begin tracking it
    pub async fn initiate(&mut self, now: DateTime<Utc>) -> Result<&InventoryJob, ViewError> {
        self.begin_initiate()?;
        let result = self.api.initiate_inventory().await;
        self.finish_initiate(result, now)
    }

    fn persist_job(&self, job: &InventoryJob) {
        if let Err(e) = self.store.set_json(JOB_KEY, job) {
            warn!("Error saving inventory job: {:#}", e);
        }
    }

    /// Check the tracked job once
    pub async fn check_status(&mut self, now: DateTime<Utc>) -> PollOutcome {
        let Some(job_id) = self.job.as_ref().map(|job| job.job_id.clone()) else {
            return PollOutcome::NoJob;
        };

        let request = self.api.inventory_status(&job_id);
        match tokio::time::timeout(self.status_timeout, request).await {
            Ok(Ok(resp)) => self.apply_status(resp, now),
            Ok(Err(e)) => {
                warn!("Error checking job status: {:#}", e);
                PollOutcome::Failed
            }
            Err(_) => {
                warn!(
                    "Status check for job {} timed out after {:?}",
                    job_id, self.status_timeout
                );
                PollOutcome::Failed
            }
        }
    }

    /// Check a pending job once, so a job that finished while nothing was
    /// watching it is collected as soon as the view is opened
    pub async fn sync(&mut self, now: DateTime<Utc>) -> PollOutcome {
        if self.phase() == Phase::Idle {
            return PollOutcome::NoJob;
        }
        self.check_status(now).await
    }

    /// Fold a status response into the view
    pub fn apply_status(&mut self, resp: StatusResponse, now: DateTime<Utc>) -> PollOutcome {
        let Some(job) = self.job.as_mut() else {
            return PollOutcome::NoJob;
        };

        if resp.completed {
            return match resp.archive_list() {
                Some(Ok(archives)) => self.complete(archives, now),
                Some(Err(e)) => {
                    warn!("Malformed inventory for job {}: {:#}", job.job_id, e);
                    PollOutcome::Failed
                }
                None => PollOutcome::Unchanged,
            };
        }

        match resp.status {
            Some(status) => {
                debug!("Inventory job {} status: {}", job.job_id, status);
                job.status = status.clone();
                let job = job.clone();
                self.persist_job(&job);
                PollOutcome::StillPending { status }
            }
            None => PollOutcome::Unchanged,
        }
    }

    fn complete(&mut self, archives: Vec<ArchiveItem>, now: DateTime<Utc>) -> PollOutcome {
        let count = archives.len();
        let cached = CachedInventory {
            timestamp: now.to_rfc3339(),
            archives,
        };

        if let Err(e) = self.store.set_json(RESULTS_KEY, &cached) {
            warn!("Error saving archives: {:#}", e);
        }

        if let Some(job) = self.job.take() {
            info!("Inventory job {} complete: {} archives", job.job_id, count);
        }
        self.forget(JOB_KEY);

        self.archives = cached.archives;
        self.last_updated = Some(cached.timestamp);
        PollOutcome::Completed { archives: count }
    }

    /// Poll the tracked job every `interval` until it completes or `cancel`
    /// fires. The first check runs immediately. `on_poll` sees the view after
    /// every check. A check still in flight when `cancel` fires is dropped.
    pub async fn watch<F>(
        &mut self,
        interval: Duration,
        cancel: CancellationToken,
        mut on_poll: F,
    ) -> WatchExit
    where
        F: FnMut(&InventoryView, &PollOutcome),
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.job.is_some() {
            tokio::select! {
                _ = cancel.cancelled() => return WatchExit::Cancelled,
                _ = ticker.tick() => {}
            }

            let outcome = tokio::select! {
                _ = cancel.cancelled() => return WatchExit::Cancelled,
                outcome = self.check_status(Utc::now()) => outcome,
            };

            on_poll(&*self, &outcome);
        }

        WatchExit::Idle
    }
}

impl fmt::Display for InventoryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "Archived Files".bold())?;
        if let Some(updated) = &self.last_updated {
            writeln!(f, "Last updated: {}", format_date(updated).dimmed())?;
        }

        if let Some(error) = &self.error {
            writeln!(f, "{} {}", "Error:".red().bold(), error)?;
        }

        if let Some(job) = &self.job {
            writeln!(f)?;
            writeln!(f, "{}", "Inventory Retrieval in Progress".yellow().bold())?;
            writeln!(f, "  Status:  {}", job.status)?;
            writeln!(f, "  Started: {}", format_date(&job.creation_date))?;
            writeln!(
                f,
                "  This process typically takes 3-5 hours to complete. You can exit and\n  \
                 run this command again later - the job will continue processing."
            )?;
        }

        if !self.archives.is_empty() {
            writeln!(f)?;
            writeln!(f, "{:<50} {:>12} CREATED", "NAME", "SIZE")?;
            writeln!(f, "{}", "-".repeat(90))?;
            for archive in &self.archives {
                writeln!(
                    f,
                    "{:<50} {:>12} {}",
                    archive.display_name().blue().bold(),
                    format_bytes(archive.size),
                    format_date(&archive.creation_date)
                )?;
                writeln!(f, "  ID: {}", archive.archive_id.dimmed())?;
            }
        } else if self.job.is_none() {
            writeln!(
                f,
                "{}",
                "No archives found. Run with --refresh to check for updates.".dimmed()
            )?;
        }

        Ok(())
    }
}
