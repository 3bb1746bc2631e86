use crate::{PdfCommand, PdfUpdate, SettingsStore, WorkerHandle, handlers};
use tokio::sync::mpsc;

/// Start the worker on `runtime` and return the host's channel ends
pub fn spawn_worker(
    runtime: &tokio::runtime::Handle,
    settings_store: SettingsStore,
) -> WorkerHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();

    runtime.spawn(worker_task(command_rx, update_tx, settings_store));

    WorkerHandle {
        command_tx,
        update_rx,
    }
}

/// Async worker task that processes commands one at a time and sends updates
pub async fn worker_task(
    mut command_rx: mpsc::UnboundedReceiver<PdfCommand>,
    update_tx: mpsc::UnboundedSender<PdfUpdate>,
    settings_store: SettingsStore,
) {
    log::debug!("Worker started, settings at {}", settings_store.path().display());

    while let Some(cmd) = command_rx.recv().await {
        process_command(cmd, &settings_store, &mut command_rx, &update_tx).await;
    }

    log::debug!("Worker stopped");
}

async fn process_command(
    cmd: PdfCommand,
    settings_store: &SettingsStore,
    command_rx: &mut mpsc::UnboundedReceiver<PdfCommand>,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) {
    match cmd {
        PdfCommand::LoadImages { paths } => {
            handlers::handle_load_images(paths, update_tx).await;
        }
        PdfCommand::SortImages {
            mut images,
            mut key,
            mut order,
        } => {
            // Only the most recent of several back-to-back sort requests matters
            let mut pending = None;
            while let Ok(next_cmd) = command_rx.try_recv() {
                match next_cmd {
                    PdfCommand::SortImages {
                        images: new_images,
                        key: new_key,
                        order: new_order,
                    } => {
                        log::debug!("Discarding queued sort, using newer request");
                        images = new_images;
                        key = new_key;
                        order = new_order;
                    }
                    other => {
                        pending = Some(other);
                        break;
                    }
                }
            }

            handlers::handle_sort_images(images, key, order, update_tx).await;

            // Can't put it back in the channel, so run it right after the sort
            if let Some(next_cmd) = pending {
                Box::pin(process_command(next_cmd, settings_store, command_rx, update_tx)).await;
            }
        }
        PdfCommand::Compose {
            images,
            settings,
            output_path,
            cancel,
        } => {
            handlers::handle_compose(images, settings, output_path, cancel, update_tx).await;
        }
        PdfCommand::LoadSettings => {
            handlers::handle_load_settings(settings_store, update_tx).await;
        }
        PdfCommand::SaveSettings { settings } => {
            handlers::handle_save_settings(settings, settings_store, update_tx).await;
        }
    }
}
