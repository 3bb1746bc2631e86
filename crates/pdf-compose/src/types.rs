use crate::layout::{PageLayout, mm_to_pt};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image {}: {message}", .path.display())]
    ImageDecode { path: PathBuf, message: String },
    #[error("Failed to write document {}: {source}", .path.display())]
    DocumentWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Settings error: {0}")]
    Settings(String),
    #[error("Invalid launch argument: {0}")]
    InvalidLaunchArgument(String),
    #[error("Composition cancelled")]
    Cancelled,
    #[error("No images to compose")]
    NoImages,
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ComposeError>;

/// Paper size used for every page of the output document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PaperSize {
    /// Each page takes the native size of its image
    #[default]
    Automatic,
    A4,
    Letter,
    Legal,
    A3,
}

impl PaperSize {
    pub const ALL: [PaperSize; 5] = [
        PaperSize::Automatic,
        PaperSize::A4,
        PaperSize::Letter,
        PaperSize::Legal,
        PaperSize::A3,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PaperSize::Automatic => "Automatic",
            PaperSize::A4 => "A4",
            PaperSize::Letter => "Letter",
            PaperSize::Legal => "Legal",
            PaperSize::A3 => "A3",
        }
    }

    /// Whether pages take the size of their image
    pub fn is_automatic(self) -> bool {
        self == PaperSize::Automatic
    }

    /// Portrait dimensions in points (width < height), or `None` for `Automatic`
    pub fn dimensions_pt(self) -> Option<(f32, f32)> {
        match self {
            PaperSize::Automatic => None,
            PaperSize::A4 => Some((mm_to_pt(210.0), mm_to_pt(297.0))),
            PaperSize::Letter => Some((8.5 * 72.0, 11.0 * 72.0)),
            PaperSize::Legal => Some((8.5 * 72.0, 14.0 * 72.0)),
            PaperSize::A3 => Some((mm_to_pt(297.0), mm_to_pt(420.0))),
        }
    }

    /// Legacy settings files stored the enum ordinal
    pub(crate) fn from_ordinal(ordinal: u64) -> Option<Self> {
        Self::ALL.get(ordinal as usize).copied()
    }
}

impl fmt::Display for PaperSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PaperSize {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|size| size.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ComposeError::Settings(format!("Unknown paper size: {s}")))
    }
}

/// Page orientation preference for fixed paper sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    /// Portrait when the image is taller than wide, landscape otherwise
    #[default]
    Automatic,
    Portrait,
    Landscape,
}

impl Orientation {
    pub const ALL: [Orientation; 3] = [
        Orientation::Automatic,
        Orientation::Portrait,
        Orientation::Landscape,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Orientation::Automatic => "Automatic",
            Orientation::Portrait => "Portrait",
            Orientation::Landscape => "Landscape",
        }
    }

    pub(crate) fn from_ordinal(ordinal: u64) -> Option<Self> {
        Self::ALL.get(ordinal as usize).copied()
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Orientation {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|orientation| orientation.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ComposeError::Settings(format!("Unknown orientation: {s}")))
    }
}

/// What happened to one input image during composition
#[derive(Debug, Clone, PartialEq)]
pub enum ImageOutcome {
    Placed { page_index: usize, layout: PageLayout },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageReport {
    pub path: PathBuf,
    pub outcome: ImageOutcome,
}

/// Per-image results of a composition run, in input order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComposeReport {
    pub images: Vec<ImageReport>,
}

impl ComposeReport {
    pub fn page_count(&self) -> usize {
        self.pages().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.images
            .iter()
            .filter(|report| matches!(report.outcome, ImageOutcome::Skipped { .. }))
            .count()
    }

    /// Layouts of the pages that made it into the document, in page order
    pub fn pages(&self) -> impl Iterator<Item = &PageLayout> {
        self.images.iter().filter_map(|report| match &report.outcome {
            ImageOutcome::Placed { layout, .. } => Some(layout),
            ImageOutcome::Skipped { .. } => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&PathBuf, &str)> {
        self.images.iter().filter_map(|report| match &report.outcome {
            ImageOutcome::Skipped { reason } => Some((&report.path, reason.as_str())),
            ImageOutcome::Placed { .. } => None,
        })
    }
}
