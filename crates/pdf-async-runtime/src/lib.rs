use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::mpsc;

mod handlers;
mod worker;

pub use worker::{spawn_worker, worker_task};

// Re-export types from library crates
pub use pdf_compose::{
    CancelFlag, ComposeReport, ImageReference, Orientation, PaperSize, PdfSettings, SettingsStore,
    SortKey, SortOrder,
};

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Worker is no longer running")]
    WorkerStopped,
}

/// Commands sent from the host to the worker
#[derive(Debug)]
pub enum PdfCommand {
    LoadImages {
        paths: Vec<PathBuf>,
    },
    SortImages {
        images: Vec<ImageReference>,
        key: SortKey,
        order: SortOrder,
    },
    Compose {
        images: Vec<ImageReference>,
        /// Frozen copy taken when the command was issued
        settings: PdfSettings,
        output_path: PathBuf,
        cancel: CancelFlag,
    },
    LoadSettings,
    SaveSettings {
        settings: PdfSettings,
    },
}

/// Updates sent from the worker to the host
#[derive(Debug, Clone)]
pub enum PdfUpdate {
    Progress {
        operation: String,
        current: usize,
        total: usize,
    },
    ImagesLoaded {
        images: Vec<ImageReference>,
    },
    ImagesSorted {
        images: Vec<ImageReference>,
    },
    ComposeComplete {
        path: PathBuf,
        report: ComposeReport,
    },
    SettingsLoaded {
        settings: PdfSettings,
    },
    SettingsSaved {
        settings: PdfSettings,
    },
    Error {
        message: String,
    },
}

/// Host-side ends of the worker channels
pub struct WorkerHandle {
    pub command_tx: mpsc::UnboundedSender<PdfCommand>,
    pub update_rx: mpsc::UnboundedReceiver<PdfUpdate>,
}

impl WorkerHandle {
    pub fn send(&self, command: PdfCommand) -> Result<(), RuntimeError> {
        self.command_tx
            .send(command)
            .map_err(|_| RuntimeError::WorkerStopped)
    }

    pub async fn recv(&mut self) -> Option<PdfUpdate> {
        self.update_rx.recv().await
    }
}

/// The process-wide settings the host reads and edits.
///
/// Background work never reads this directly; it gets a [`snapshot`](Self::snapshot).
#[derive(Debug, Clone, Default)]
pub struct SharedSettings(Arc<RwLock<PdfSettings>>);

impl SharedSettings {
    pub fn new(settings: PdfSettings) -> Self {
        Self(Arc::new(RwLock::new(settings)))
    }

    pub fn snapshot(&self) -> PdfSettings {
        *self.0.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn update(&self, settings: PdfSettings) {
        *self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = settings;
    }
}
