//! Upload view: sends one file to the server and reports the archive id.
//!
//! The server answers only once the vault has stored the whole archive, so
//! the progress bar is simulated: it advances a fixed step every second and
//! holds short of completion until the response arrives.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use super::ViewError;
use super::format::format_bytes;
use crate::client::InventoryApi;
use crate::model::UploadResult;

/// Simulated progress step
pub const PROGRESS_STEP: u64 = 10;
/// Simulated progress never passes this before the server answers
pub const PROGRESS_HOLD: u64 = 90;
/// Time between simulated progress steps
pub const PROGRESS_TICK: Duration = Duration::from_secs(1);

/// Next simulated progress value
pub fn next_progress(current: u64) -> u64 {
    (current + PROGRESS_STEP).min(PROGRESS_HOLD)
}

pub struct UploadView {
    api: Arc<dyn InventoryApi>,
    file: Option<PathBuf>,
    progress: ProgressBar,
    error: Option<String>,
    success: Option<UploadResult>,
}

impl UploadView {
    pub fn new(api: Arc<dyn InventoryApi>) -> Self {
        let progress = ProgressBar::new(100);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("Uploading... [{bar:40.cyan/blue}] {pos}%")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self::with_progress(api, progress)
    }

    /// Use a caller-supplied progress bar (e.g. [`ProgressBar::hidden`])
    pub fn with_progress(api: Arc<dyn InventoryApi>, progress: ProgressBar) -> Self {
        UploadView {
            api,
            file: None,
            progress,
            error: None,
            success: None,
        }
    }

    /// Choose the file to upload, clearing any previous outcome
    pub fn select_file(&mut self, file: Option<PathBuf>) {
        self.file = file;
        self.error = None;
        self.success = None;
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn success(&self) -> Option<&UploadResult> {
        self.success.as_ref()
    }

    pub fn progress(&self) -> u64 {
        self.progress.position()
    }

    /// Upload the selected file
    pub async fn upload(&mut self) -> Result<&UploadResult, ViewError> {
        self.error = None;
        self.success = None;

        match self.send().await {
            Ok(result) => Ok(&*self.success.insert(result)),
            Err(err) => {
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn send(&mut self) -> Result<UploadResult, ViewError> {
        let path = self.file.clone().ok_or(ViewError::NoFileSelected)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|source| ViewError::ReadFile {
                path: path.clone(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        info!("Uploading {} ({})", path.display(), format_bytes(data.len() as u64));

        self.progress.reset();
        self.progress.set_position(0);
        let ticker = tokio::spawn(simulate_progress(self.progress.clone()));

        let result = self.api.upload(&file_name, Bytes::from(data)).await;
        ticker.abort();

        match result {
            Ok(result) => {
                self.progress.set_position(100);
                self.progress.finish();
                Ok(result)
            }
            Err(e) => {
                self.progress.abandon();
                Err(ViewError::server(e))
            }
        }
    }
}

async fn simulate_progress(progress: ProgressBar) {
    let mut ticker = tokio::time::interval(PROGRESS_TICK);
    // First tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let next = next_progress(progress.position());
        progress.set_position(next);
        if next >= PROGRESS_HOLD {
            break;
        }
    }
}
