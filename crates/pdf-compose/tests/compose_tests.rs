use lopdf::Document;
use lopdf::content::Content;
use pdf_compose::*;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn write_image(dir: &Path, name: &str, width: u32, height: u32) -> ImageReference {
    let path = dir.join(name);
    image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 90]))
        .save(&path)
        .unwrap();
    ImageReference::new(path)
}

fn write_garbage(dir: &Path, name: &str) -> ImageReference {
    let path = dir.join(name);
    std::fs::write(&path, b"definitely not a png").unwrap();
    ImageReference::new(path)
}

/// Page (width, height) pairs of a PDF file, in page order
fn page_sizes(path: &Path) -> Vec<(f32, f32)> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .map(|&id| {
            let page = doc.get_object(id).unwrap().as_dict().unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            let coord = |i: usize| media_box[i].as_float().unwrap();
            (coord(2) - coord(0), coord(3) - coord(1))
        })
        .collect()
}

/// Combined `cm` matrix in effect when each page draws its image
fn image_matrices(path: &Path) -> Vec<[f32; 6]> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .map(|&id| {
            let content = Content::decode(&doc.get_page_content(id).unwrap()).unwrap();
            let mut ctm = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
            for op in &content.operations {
                match op.operator.as_str() {
                    "cm" => {
                        let m: Vec<f32> =
                            op.operands.iter().map(|o| o.as_float().unwrap()).collect();
                        ctm = [
                            m[0] * ctm[0] + m[1] * ctm[2],
                            m[0] * ctm[1] + m[1] * ctm[3],
                            m[2] * ctm[0] + m[3] * ctm[2],
                            m[2] * ctm[1] + m[3] * ctm[3],
                            m[4] * ctm[0] + m[5] * ctm[2] + ctm[4],
                            m[4] * ctm[1] + m[5] * ctm[3] + ctm[5],
                        ];
                    }
                    "Do" => return ctm,
                    _ => {}
                }
            }
            panic!("page draws no image");
        })
        .collect()
}

fn assert_matrix(actual: [f32; 6], expected: [f32; 6]) {
    assert!(
        actual.iter().zip(expected).all(|(a, e)| (a - e).abs() < 0.05),
        "expected {expected:?}, got {actual:?}"
    );
}

fn assert_size(actual: (f32, f32), expected: (f32, f32)) {
    assert!(
        (actual.0 - expected.0).abs() < 0.5 && (actual.1 - expected.1).abs() < 0.5,
        "expected {expected:?}, got {actual:?}"
    );
}

#[tokio::test]
async fn test_single_image_native_size() {
    let dir = TempDir::new().unwrap();
    let images = vec![write_image(dir.path(), "landscape.png", 800, 600)];
    let output = dir.path().join("out.pdf");

    let report = compose(&images, PdfSettings::default(), &output, ComposeOptions::default())
        .await
        .unwrap();

    assert_eq!(report.page_count(), 1);
    assert_eq!(report.skipped_count(), 0);
    let layout = report.pages().next().unwrap();
    assert_eq!((layout.page_width, layout.page_height), (600.0, 450.0));
    assert_eq!((layout.placement.x, layout.placement.y), (0.0, 0.0));

    let sizes = page_sizes(&output);
    assert_eq!(sizes.len(), 1);
    assert_size(sizes[0], (600.0, 450.0));
}

#[tokio::test]
async fn test_fixed_paper_pages() {
    let dir = TempDir::new().unwrap();
    let images = vec![
        write_image(dir.path(), "tall.png", 600, 800),
        write_image(dir.path(), "wide.jpg", 800, 600),
    ];
    let output = dir.path().join("a4.pdf");
    let settings = PdfSettings {
        paper_size: PaperSize::A4,
        orientation: Orientation::Automatic,
    };

    let report = compose(&images, settings, &output, ComposeOptions::default())
        .await
        .unwrap();
    assert_eq!(report.page_count(), 2);

    let sizes = page_sizes(&output);
    assert_eq!(sizes.len(), 2);
    assert_size(sizes[0], (595.28, 841.89));
    assert_size(sizes[1], (841.89, 595.28));
}

#[tokio::test]
async fn test_undecodable_image_is_skipped() {
    let dir = TempDir::new().unwrap();
    let images = vec![
        write_image(dir.path(), "first.png", 200, 100),
        write_garbage(dir.path(), "broken.png"),
        write_image(dir.path(), "third.bmp", 100, 300),
    ];
    let output = dir.path().join("out.pdf");

    let report = compose(&images, PdfSettings::default(), &output, ComposeOptions::default())
        .await
        .unwrap();

    assert_eq!(report.images.len(), 3);
    assert_eq!(report.page_count(), 2);
    assert_eq!(report.skipped_count(), 1);

    match &report.images[0].outcome {
        ImageOutcome::Placed { page_index, .. } => assert_eq!(*page_index, 0),
        other => panic!("Expected first image placed, got {other:?}"),
    }
    assert!(matches!(
        report.images[1].outcome,
        ImageOutcome::Skipped { .. }
    ));
    match &report.images[2].outcome {
        ImageOutcome::Placed { page_index, .. } => assert_eq!(*page_index, 1),
        other => panic!("Expected third image placed, got {other:?}"),
    }

    let skipped: Vec<_> = report.skipped().map(|(path, _)| path.clone()).collect();
    assert_eq!(skipped, vec![images[1].path.clone()]);

    // Relative order of the good images is kept
    let sizes = page_sizes(&output);
    assert_eq!(sizes.len(), 2);
    assert_size(sizes[0], (150.0, 75.0));
    assert_size(sizes[1], (75.0, 225.0));
}

#[tokio::test]
async fn test_missing_file_is_skipped() {
    let dir = TempDir::new().unwrap();
    let images = vec![
        ImageReference::new(dir.path().join("gone.png")),
        write_image(dir.path(), "present.png", 96, 96),
    ];
    let output = dir.path().join("out.pdf");

    let report = compose(&images, PdfSettings::default(), &output, ComposeOptions::default())
        .await
        .unwrap();
    assert_eq!(report.page_count(), 1);
    assert_eq!(report.skipped_count(), 1);
}

#[tokio::test]
async fn test_composition_is_repeatable() {
    let dir = TempDir::new().unwrap();
    let images = vec![
        write_image(dir.path(), "a.png", 320, 240),
        write_image(dir.path(), "b.png", 240, 320),
        write_image(dir.path(), "c.png", 500, 500),
    ];
    let settings = PdfSettings {
        paper_size: PaperSize::Letter,
        orientation: Orientation::Automatic,
    };

    let first = compose(&images, settings, dir.path().join("1.pdf"), ComposeOptions::default())
        .await
        .unwrap();
    let second = compose(&images, settings, dir.path().join("2.pdf"), ComposeOptions::default())
        .await
        .unwrap();

    let first_pages: Vec<_> = first.pages().copied().collect();
    let second_pages: Vec<_> = second.pages().copied().collect();
    assert_eq!(first_pages, second_pages);
    assert_eq!(
        page_sizes(&dir.path().join("1.pdf")),
        page_sizes(&dir.path().join("2.pdf"))
    );
}

#[tokio::test]
async fn test_empty_input_is_rejected() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.pdf");

    let result = compose(&[], PdfSettings::default(), &output, ComposeOptions::default()).await;
    assert!(matches!(result, Err(ComposeError::NoImages)));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_all_images_broken_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let images = vec![
        write_garbage(dir.path(), "x.png"),
        write_garbage(dir.path(), "y.jpg"),
    ];
    let output = dir.path().join("out.pdf");

    let options = ComposeOptions::default();
    let result = compose(&images, PdfSettings::default(), &output, options).await;
    assert!(matches!(result, Err(ComposeError::NoImages)));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_unwritable_output_fails() {
    let dir = TempDir::new().unwrap();
    let images = vec![write_image(dir.path(), "a.png", 10, 10)];
    let output: PathBuf = dir.path().join("no-such-dir").join("out.pdf");

    let options = ComposeOptions::default();
    let result = compose(&images, PdfSettings::default(), &output, options).await;
    assert!(matches!(result, Err(ComposeError::DocumentWrite { .. })));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_existing_output_is_replaced() {
    let dir = TempDir::new().unwrap();
    let images = vec![write_image(dir.path(), "a.png", 40, 20)];
    let output = dir.path().join("out.pdf");
    std::fs::write(&output, b"old contents").unwrap();

    compose(&images, PdfSettings::default(), &output, ComposeOptions::default())
        .await
        .unwrap();

    assert_eq!(page_sizes(&output).len(), 1);
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_cancelled_before_start_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let images = vec![write_image(dir.path(), "a.png", 10, 10)];
    let output = dir.path().join("out.pdf");

    let cancel = CancelFlag::new();
    cancel.cancel();
    let result = compose(
        &images,
        PdfSettings::default(),
        &output,
        ComposeOptions::default().with_cancel(cancel),
    )
    .await;

    assert!(matches!(result, Err(ComposeError::Cancelled)));
    assert!(!output.exists());
}

#[test]
fn test_cancel_between_images() {
    let dir = TempDir::new().unwrap();
    let images = vec![
        write_image(dir.path(), "a.png", 10, 10),
        write_image(dir.path(), "b.png", 10, 10),
        write_image(dir.path(), "c.png", 10, 10),
    ];

    let cancel = CancelFlag::new();
    let trigger = cancel.clone();
    let mut options = ComposeOptions::default()
        .with_cancel(cancel)
        .with_progress(move |current, _| {
            if current == 1 {
                trigger.cancel();
            }
        });

    let result = compose_document(&images, PdfSettings::default(), &mut options);
    assert!(matches!(result, Err(ComposeError::Cancelled)));
}

#[test]
fn test_progress_reports_every_image() {
    let dir = TempDir::new().unwrap();
    let images = vec![
        write_image(dir.path(), "a.png", 10, 10),
        write_garbage(dir.path(), "b.png"),
        write_image(dir.path(), "c.png", 10, 10),
    ];

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut options =
        ComposeOptions::default().with_progress(move |current, total| {
            sink.lock().unwrap().push((current, total));
        });

    let (bytes, report) = compose_document(&images, PdfSettings::default(), &mut options).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    assert_eq!(report.page_count(), 2);
    assert_eq!(*seen.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
}

#[tokio::test]
async fn test_image_is_drawn_where_the_layout_says() {
    let dir = TempDir::new().unwrap();
    let cases = [
        // Native size: the image covers the whole page
        (
            (800, 600),
            PaperSize::Automatic,
            Orientation::Automatic,
            [600.0, 0.0, 0.0, 450.0, 0.0, 0.0],
        ),
        // A4 portrait, fitted to the width and centered vertically
        (
            (600, 800),
            PaperSize::A4,
            Orientation::Automatic,
            [595.28, 0.0, 0.0, 793.70, 0.0, 24.09],
        ),
        // Landscape image forced onto a portrait Letter page
        (
            (800, 600),
            PaperSize::Letter,
            Orientation::Portrait,
            [612.0, 0.0, 0.0, 459.0, 0.0, 166.5],
        ),
    ];

    for (i, case) in cases.into_iter().enumerate() {
        let ((width, height), paper_size, orientation, expected) = case;
        let images = vec![write_image(dir.path(), &format!("{i}.png"), width, height)];
        let output = dir.path().join(format!("{i}.pdf"));
        let settings = PdfSettings {
            paper_size,
            orientation,
        };

        compose(&images, settings, &output, ComposeOptions::default())
            .await
            .unwrap();

        let matrices = image_matrices(&output);
        assert_eq!(matrices.len(), 1);
        assert_matrix(matrices[0], expected);
    }
}
