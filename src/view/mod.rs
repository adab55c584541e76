//! Terminal views over the coldvault endpoints

pub mod format;
pub mod inventory;
pub mod upload;

pub use inventory::{InventoryView, Phase, PollOutcome, WatchExit};
pub use upload::UploadView;

use std::path::PathBuf;
use thiserror::Error;

/// Reasons a view refuses or fails a user action
#[derive(Debug, Error)]
pub enum ViewError {
    /// A job is already being tracked
    #[error("An inventory job is already in progress ({0})")]
    AlreadyPending(String),

    /// An earlier initiation has not returned yet
    #[error("An inventory request is already in flight")]
    InitiationInFlight,

    /// Upload requested without a file
    #[error("Please select a file first")]
    NoFileSelected,

    /// The selected file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The server or the transport reported an error
    #[error("{0}")]
    Server(String),
}

impl ViewError {
    pub(crate) fn server(err: anyhow::Error) -> Self {
        ViewError::Server(format!("{:#}", err))
    }
}
