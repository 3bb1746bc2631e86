mod compose;
mod formats;
mod launch;
mod layout;
mod settings;
mod sort;
mod source;
mod types;

pub use compose::{CancelFlag, ComposeOptions, ProgressFn, compose, compose_document};
pub use formats::{SUPPORTED_EXTENSIONS, is_supported_image};
pub use launch::{URI_SCHEME, collect_input_paths, parse_launch_args, parse_launch_uri};
pub use layout::{
    PX_TO_PT, PageLayout, Placement, compute_page_layout, effective_orientation, mm_to_pt,
};
pub use settings::{DATA_DIR_ENV, PdfSettings, SettingsStore, default_data_dir};
pub use sort::{SortKey, SortOrder, sort_images};
pub use source::{ImageReference, load_image_references};
pub use types::*;
