//! Image-to-PDF composition
//!
//! One page per input image, in input order. Images that cannot be decoded are
//! skipped and recorded in the [`ComposeReport`]; only a failure to write the
//! finished document aborts the whole operation.

use crate::layout::{PageLayout, compute_page_layout};
use crate::settings::PdfSettings;
use crate::source::ImageReference;
use crate::types::*;
use printpdf::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const DOCUMENT_TITLE: &str = "Converted Images";

/// Cooperative cancellation, checked between images
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Called after each image with (images processed, total images)
pub type ProgressFn = Box<dyn FnMut(usize, usize) + Send>;

#[derive(Default)]
pub struct ComposeOptions {
    pub cancel: CancelFlag,
    pub progress: Option<ProgressFn>,
}

impl ComposeOptions {
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: impl FnMut(usize, usize) + Send + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }
}

/// A decoded image ready to be embedded
struct DecodedImage {
    width: u32,
    height: u32,
    raw: RawImage,
}

fn decode_image(path: &Path) -> Result<DecodedImage> {
    let decode_error = |message: String| ComposeError::ImageDecode {
        path: path.to_owned(),
        message,
    };

    // printpdf's glob import has its own `image` module
    let image = ::image::ImageReader::open(path)
        .map_err(|e| decode_error(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| decode_error(e.to_string()))?
        .decode()
        .map_err(|e| decode_error(e.to_string()))?;

    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(decode_error("image has no pixels".to_string()));
    }

    let rgb = image.to_rgb8();
    Ok(DecodedImage {
        width,
        height,
        raw: RawImage {
            pixels: RawImageData::U8(rgb.into_raw()),
            width: width as usize,
            height: height as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        },
    })
}

fn image_page(doc: &mut PdfDocument, image: &DecodedImage, layout: &PageLayout) -> PdfPage {
    let image_id = doc.add_image(&image.raw);
    let placement = &layout.placement;

    // At 72 DPI one pixel is one point, so the scale maps pixels straight to points
    let ops = vec![Op::UseXobject {
        id: image_id,
        transform: XObjectTransform {
            translate_x: Some(Pt(placement.x)),
            translate_y: Some(Pt(placement.y)),
            scale_x: Some(placement.width / image.width as f32),
            scale_y: Some(placement.height / image.height as f32),
            dpi: Some(72.0),
            ..Default::default()
        },
    }];

    PdfPage::new(
        Mm::from(Pt(layout.page_width)),
        Mm::from(Pt(layout.page_height)),
        ops,
    )
}

/// Build the PDF in memory.
///
/// Returns the serialized document together with the per-image report.
pub fn compose_document(
    images: &[ImageReference],
    settings: PdfSettings,
    options: &mut ComposeOptions,
) -> Result<(Vec<u8>, ComposeReport)> {
    if images.is_empty() {
        return Err(ComposeError::NoImages);
    }

    if settings.paper_size.is_automatic() {
        log::info!("Composing {} image(s) at native size", images.len());
    } else {
        log::info!(
            "Composing {} image(s) on {} paper, {} orientation",
            images.len(),
            settings.paper_size,
            settings.orientation
        );
    }

    let mut doc = PdfDocument::new(DOCUMENT_TITLE);
    let mut report = ComposeReport::default();
    let total = images.len();

    for (index, image_ref) in images.iter().enumerate() {
        if options.cancel.is_cancelled() {
            log::info!("Composition cancelled after {} of {} image(s)", index, total);
            return Err(ComposeError::Cancelled);
        }

        let outcome = match decode_image(&image_ref.path) {
            Ok(image) => {
                let layout = compute_page_layout(image.width, image.height, &settings);
                let page = image_page(&mut doc, &image, &layout);
                doc.pages.push(page);
                log::debug!(
                    "Page {}: {} ({}x{} px) -> {:.2}x{:.2} pt",
                    doc.pages.len(),
                    image_ref.display_name,
                    image.width,
                    image.height,
                    layout.page_width,
                    layout.page_height
                );
                ImageOutcome::Placed {
                    page_index: doc.pages.len() - 1,
                    layout,
                }
            }
            Err(e) => {
                log::error!("Error processing image: {}", e);
                ImageOutcome::Skipped {
                    reason: e.to_string(),
                }
            }
        };

        report.images.push(ImageReport {
            path: image_ref.path.clone(),
            outcome,
        });

        if let Some(progress) = options.progress.as_mut() {
            progress(index + 1, total);
        }
    }

    if doc.pages.is_empty() {
        log::error!("None of the {} image(s) could be decoded", total);
        return Err(ComposeError::NoImages);
    }

    let mut warnings = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        log::debug!("PDF serialization produced {} warning(s)", warnings.len());
    }

    Ok((bytes, report))
}

/// Compose `images` into a PDF written to `output_path`.
///
/// The document is written to a temporary file next to `output_path` and then
/// renamed into place, so a failed run never leaves a partial document behind.
pub async fn compose(
    images: &[ImageReference],
    settings: PdfSettings,
    output_path: impl AsRef<Path>,
    options: ComposeOptions,
) -> Result<ComposeReport> {
    let images = images.to_vec();
    let output_path = output_path.as_ref().to_owned();

    let result = async {
        let (bytes, report) = tokio::task::spawn_blocking(move || {
            let mut options = options;
            compose_document(&images, settings, &mut options)
        })
        .await??;

        write_document(&output_path, bytes).await?;
        Ok::<_, ComposeError>(report)
    }
    .await;

    match &result {
        Ok(report) => log::info!(
            "Wrote {} page(s) to {} ({} skipped)",
            report.page_count(),
            output_path.display(),
            report.skipped_count()
        ),
        Err(e) => log::error!("Error converting images to PDF {}: {}", output_path.display(), e),
    }
    result
}

async fn write_document(output_path: &Path, bytes: Vec<u8>) -> Result<()> {
    let write_error = |source: std::io::Error| ComposeError::DocumentWrite {
        path: output_path.to_owned(),
        source,
    };

    let tmp_path = temp_sibling(output_path);
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_error)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, output_path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_error(e));
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.pdf".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}
