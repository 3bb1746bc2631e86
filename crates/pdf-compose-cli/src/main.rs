use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use pdf_async_runtime::{
    CancelFlag, ComposeReport, ImageReference, PdfCommand, PdfUpdate, SharedSettings,
    WorkerHandle, spawn_worker,
};
use pdf_compose::{Orientation, PaperSize, PdfSettings, SettingsStore, SortKey, SortOrder};
use std::io::Write;
use std::path::PathBuf;

mod logger;

use logger::RollingFileLogger;

#[derive(Parser)]
#[command(name = "img2pdf", about = "Combine images into a single PDF", version)]
struct Cli {
    /// Directory for settings and logs (default: per-user data directory)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log debug messages and echo the log to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert images to a PDF, one page per image
    Convert(ConvertArgs),

    /// Show or change the saved PDF settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// List supported image file extensions
    Formats,
}

#[derive(Args)]
struct ConvertArgs {
    /// Image files or img2pdf: URIs, in page order
    #[arg(required = true, num_args = 1..)]
    inputs: Vec<String>,

    /// Output PDF file
    #[arg(short, long)]
    output: PathBuf,

    /// Paper size (default: saved setting)
    #[arg(long, value_enum)]
    paper: Option<PaperArg>,

    /// Page orientation for fixed paper sizes (default: saved setting)
    #[arg(long, value_enum)]
    orientation: Option<OrientationArg>,

    /// Reorder images before converting
    #[arg(long, value_enum)]
    sort: Option<SortArg>,

    /// Sort in descending order
    #[arg(long, requires = "sort")]
    descending: bool,

    /// Remember --paper and --orientation for later runs
    #[arg(long)]
    save_settings: bool,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the saved settings
    Show,
    /// Change the saved settings
    Set {
        #[arg(long, value_enum)]
        paper: Option<PaperArg>,

        #[arg(long, value_enum)]
        orientation: Option<OrientationArg>,
    },
    /// Restore the defaults
    Reset,
}

#[derive(Clone, Copy, ValueEnum)]
enum PaperArg {
    Auto,
    A4,
    Letter,
    Legal,
    A3,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrientationArg {
    Auto,
    Portrait,
    Landscape,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Name,
    Path,
    Date,
    Size,
}

impl From<PaperArg> for PaperSize {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::Auto => Self::Automatic,
            PaperArg::A4 => Self::A4,
            PaperArg::Letter => Self::Letter,
            PaperArg::Legal => Self::Legal,
            PaperArg::A3 => Self::A3,
        }
    }
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Auto => Self::Automatic,
            OrientationArg::Portrait => Self::Portrait,
            OrientationArg::Landscape => Self::Landscape,
        }
    }
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => Self::FileName,
            SortArg::Path => Self::FilePath,
            SortArg::Date => Self::Modified,
            SortArg::Size => Self::FileSize,
        }
    }
}

fn apply_overrides(
    mut settings: PdfSettings,
    paper: Option<PaperArg>,
    orientation: Option<OrientationArg>,
) -> PdfSettings {
    if let Some(paper) = paper {
        settings.paper_size = paper.into();
    }
    if let Some(orientation) = orientation {
        settings.orientation = orientation.into();
    }
    settings
}

fn print_settings(settings: &PdfSettings) {
    println!("Paper size:  {}", settings.paper_size);
    println!("Orientation: {}", settings.orientation);
}

/// Wait for the next update, turning worker errors into `Err`
async fn next_update(worker: &mut WorkerHandle) -> Result<PdfUpdate> {
    match worker.recv().await {
        Some(PdfUpdate::Error { message }) => Err(anyhow!(message)),
        Some(update) => Ok(update),
        None => bail!("Worker stopped unexpectedly"),
    }
}

async fn load_images(
    worker: &mut WorkerHandle,
    paths: Vec<PathBuf>,
) -> Result<Vec<ImageReference>> {
    worker.send(PdfCommand::LoadImages { paths })?;
    match next_update(worker).await? {
        PdfUpdate::ImagesLoaded { images } => Ok(images),
        other => bail!("Unexpected worker update: {other:?}"),
    }
}

async fn sort_images(
    worker: &mut WorkerHandle,
    images: Vec<ImageReference>,
    key: SortKey,
    order: SortOrder,
) -> Result<Vec<ImageReference>> {
    worker.send(PdfCommand::SortImages { images, key, order })?;
    match next_update(worker).await? {
        PdfUpdate::ImagesSorted { images } => Ok(images),
        other => bail!("Unexpected worker update: {other:?}"),
    }
}

async fn load_settings(worker: &mut WorkerHandle) -> Result<PdfSettings> {
    worker.send(PdfCommand::LoadSettings)?;
    match next_update(worker).await? {
        PdfUpdate::SettingsLoaded { settings } => Ok(settings),
        other => bail!("Unexpected worker update: {other:?}"),
    }
}

async fn compose_images(
    worker: &mut WorkerHandle,
    images: Vec<ImageReference>,
    settings: PdfSettings,
    output_path: PathBuf,
) -> Result<ComposeReport> {
    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling conversion");
            on_interrupt.cancel();
        }
    });

    worker.send(PdfCommand::Compose {
        images,
        settings,
        output_path,
        cancel,
    })?;

    loop {
        match next_update(worker).await {
            Ok(PdfUpdate::Progress {
                operation,
                current,
                total,
            }) => {
                eprint!("\r{operation}... {current}/{total}");
                let _ = std::io::stderr().flush();
            }
            Ok(PdfUpdate::ComposeComplete { report, .. }) => {
                eprintln!();
                return Ok(report);
            }
            Ok(other) => bail!("Unexpected worker update: {other:?}"),
            Err(e) => {
                eprintln!();
                return Err(e);
            }
        }
    }
}

async fn run_convert(store: SettingsStore, args: ConvertArgs) -> Result<()> {
    let ConvertArgs {
        inputs,
        output,
        paper,
        orientation,
        sort,
        descending,
        save_settings,
    } = args;

    let mut worker = spawn_worker(&tokio::runtime::Handle::current(), store);

    let shared = SharedSettings::new(load_settings(&mut worker).await?);
    shared.update(apply_overrides(shared.snapshot(), paper, orientation));

    if save_settings {
        worker.send(PdfCommand::SaveSettings {
            settings: shared.snapshot(),
        })?;
        match next_update(&mut worker).await {
            Ok(PdfUpdate::SettingsSaved { .. }) => log::info!("Settings saved"),
            Ok(other) => bail!("Unexpected worker update: {other:?}"),
            // The in-memory settings still apply to this run
            Err(e) => eprintln!("Warning: {e}"),
        }
    }

    let paths = pdf_compose::collect_input_paths(&inputs);
    let mut images = load_images(&mut worker, paths).await?;
    if images.is_empty() {
        bail!("None of the inputs is a readable image file");
    }

    if let Some(sort) = sort {
        let order = if descending {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        };
        images = sort_images(&mut worker, images, sort.into(), order).await?;
    }

    let settings = shared.snapshot();
    println!(
        "Converting {} image(s) to PDF ({}, {})...",
        images.len(),
        settings.paper_size,
        settings.orientation
    );

    let report = compose_images(&mut worker, images, settings, output.clone())
        .await
        .context("PDF creation failed")?;

    for (path, reason) in report.skipped() {
        eprintln!("Skipped {}: {}", path.display(), reason);
    }
    println!(
        "PDF creation completed: {} page(s) -> {}",
        report.page_count(),
        output.display()
    );
    if report.skipped_count() > 0 {
        println!("{} image(s) skipped", report.skipped_count());
    }
    Ok(())
}

async fn run_settings(store: SettingsStore, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Show => {
            print_settings(&store.load().await);
        }
        SettingsAction::Set { paper, orientation } => {
            let settings = apply_overrides(store.load().await, paper, orientation);
            store.save(&settings).await?;
            println!("Settings saved to {}", store.path().display());
            print_settings(&settings);
        }
        SettingsAction::Reset => {
            store.save(&PdfSettings::default()).await?;
            println!("Settings reset");
            print_settings(&PdfSettings::default());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = cli
        .data_dir
        .or_else(pdf_compose::default_data_dir)
        .context("Cannot determine a data directory; pass --data-dir")?;

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let file_logger = RollingFileLogger::new(data_dir.join("logs"), level)
        .context("Failed to create log directory")?
        .with_stderr(cli.verbose);
    let history = file_logger.history();
    file_logger.init()?;
    log::info!("Application started");

    // With --verbose the log is already on stderr
    let show_status = matches!(cli.command, Commands::Convert(_)) && !cli.verbose;

    let store = SettingsStore::in_dir(&data_dir);

    let result = match cli.command {
        Commands::Convert(args) => run_convert(store, args).await,
        Commands::Settings { action } => run_settings(store, action).await,
        Commands::Formats => {
            for ext in pdf_compose::SUPPORTED_EXTENSIONS {
                println!("{ext}");
            }
            Ok(())
        }
    };

    if let Err(e) = &result {
        log::error!("{e:#}");
    }
    if show_status {
        if let Some(entry) = history.latest() {
            eprintln!("Status: [{}] {}", logger::level_tag(entry.level), entry.message);
        }
    }
    log::info!("Application closed");
    log::Log::flush(log::logger());
    result
}
