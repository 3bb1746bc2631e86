use crate::{
    CancelFlag, ImageReference, PdfSettings, PdfUpdate, SettingsStore, SortKey, SortOrder,
};
use pdf_compose::ComposeOptions;
use std::path::PathBuf;
use tokio::sync::mpsc;

pub async fn handle_load_images(
    paths: Vec<PathBuf>,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) {
    let images = pdf_compose::load_image_references(&paths).await;
    let _ = update_tx.send(PdfUpdate::ImagesLoaded { images });
}

pub async fn handle_sort_images(
    mut images: Vec<ImageReference>,
    key: SortKey,
    order: SortOrder,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) {
    // Date and size sorts stat every file
    let sorted = tokio::task::spawn_blocking(move || {
        pdf_compose::sort_images(&mut images, key, order);
        images
    })
    .await;

    match sorted {
        Ok(images) => {
            let _ = update_tx.send(PdfUpdate::ImagesSorted { images });
        }
        Err(e) => {
            let _ = update_tx.send(PdfUpdate::Error {
                message: format!("Failed to sort images: {e}"),
            });
        }
    }
}

pub async fn handle_compose(
    images: Vec<ImageReference>,
    settings: PdfSettings,
    output_path: PathBuf,
    cancel: CancelFlag,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) {
    let progress_tx = update_tx.clone();
    let options = ComposeOptions::default()
        .with_cancel(cancel)
        .with_progress(move |current, total| {
            let _ = progress_tx.send(PdfUpdate::Progress {
                operation: "Creating PDF".to_string(),
                current,
                total,
            });
        });

    match pdf_compose::compose(&images, settings, &output_path, options).await {
        Ok(report) => {
            let _ = update_tx.send(PdfUpdate::ComposeComplete {
                path: output_path,
                report,
            });
        }
        Err(e) => {
            let _ = update_tx.send(PdfUpdate::Error {
                message: format!("Failed to create PDF: {e}"),
            });
        }
    }
}

pub async fn handle_load_settings(
    settings_store: &SettingsStore,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) {
    let settings = settings_store.load().await;
    let _ = update_tx.send(PdfUpdate::SettingsLoaded { settings });
}

pub async fn handle_save_settings(
    settings: PdfSettings,
    settings_store: &SettingsStore,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) {
    match settings_store.save(&settings).await {
        Ok(()) => {
            let _ = update_tx.send(PdfUpdate::SettingsSaved { settings });
        }
        Err(e) => {
            let _ = update_tx.send(PdfUpdate::Error {
                message: format!("Failed to save settings: {e}"),
            });
        }
    }
}
