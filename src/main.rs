use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use flipbook_hero::config::Configuration;
use flipbook_hero::events::FrameLoaded;
use flipbook_hero::flipbook::Flipbook;
use flipbook_hero::snapshot::{self, SnapshotRequest, SnapshotSize};
use flipbook_hero::tasks;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "flipbook-hero",
    version,
    about = "scroll-driven flip-book hero animation"
)]
struct Args {
    /// Path to YAML config; built-in defaults when omitted
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,
    /// Override the frame directory from the config
    #[arg(long = "frames-dir", value_name = "DIR")]
    frames_dir: Option<PathBuf>,
    /// Render a single scroll position (0..=1) headlessly and exit
    #[arg(long = "snapshot", value_name = "PROGRESS", requires = "output")]
    snapshot: Option<f32>,
    /// PNG path written by --snapshot
    #[arg(long = "output", value_name = "PNG")]
    output: Option<PathBuf>,
    /// Logical snapshot size
    #[arg(long = "size", value_name = "WxH", default_value = "1600x900")]
    size: SnapshotSize,
    /// Device pixel ratio used for the snapshot
    #[arg(long = "scale-factor", value_name = "F", default_value_t = 1.0)]
    scale_factor: f32,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) {
    let crate_level = match verbosity {
        0 => None,
        1 => Some("debug"),
        _ => Some("trace"),
    };
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    for directive in crate_level
        .map(|level| format!("flipbook_hero={level}"))
        .into_iter()
        .chain(["wgpu=warn".to_string(), "winit=warn".to_string()])
    {
        match directive.parse() {
            Ok(d) => filter = filter.add_directive(d),
            Err(err) => eprintln!("ignoring log directive {directive}: {err}"),
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn load_configuration(args: &Args) -> Result<Configuration> {
    let mut cfg = match args.config.as_ref() {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    };
    if let Some(dir) = args.frames_dir.as_ref() {
        cfg.frames.directory = dir.clone();
    }
    cfg.validated().context("invalid configuration values")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let cfg = load_configuration(&args)?;
    match args.config.as_ref() {
        Some(path) => tracing::info!("Loaded configuration from {}:\n{:#?}", path.display(), cfg),
        None => tracing::info!("Using built-in configuration:\n{:#?}", cfg),
    }

    if let Some(progress) = args.snapshot {
        let output = args
            .output
            .clone()
            .context("--snapshot requires --output")?;
        let request = SnapshotRequest {
            progress,
            size: args.size,
            scale_factor: args.scale_factor,
        };
        let image = snapshot::capture(&cfg, &request)
            .await
            .context("snapshot failed")?;
        let path = snapshot::write_png(&image, &output)?;
        tracing::info!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "snapshot written"
        );
        return Ok(());
    }

    let (loaded_tx, loaded_rx) = mpsc::channel::<FrameLoaded>(cfg.loader_max_concurrent_decodes); // Loader -> Viewer

    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let flipbook = Flipbook::new(&cfg, Instant::now()).context("failed to build flipbook")?;

    let mut tasks = JoinSet::new();

    // FrameLoader
    tasks.spawn({
        let sources = cfg.frame_sources();
        let cancel = cancel.clone();
        let max_in_flight = cfg.loader_max_concurrent_decodes;
        async move {
            tasks::loader::run(sources, loaded_tx, cancel, max_in_flight)
                .await
                .context("loader task failed")
        }
    });

    // Run the windowed viewer on the main thread; returns when the window
    // closes or cancellation occurs
    if let Err(e) = tasks::viewer::run_windowed(flipbook, loaded_rx, cancel.clone(), cfg.clone())
        .context("viewer failed")
    {
        tracing::error!("{e:?}");
    }
    cancel.cancel();

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    Ok(())
}
