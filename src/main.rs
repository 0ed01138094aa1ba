//! capture-rank - OCR quality ranking for two captures of the same subject
//!
//! Measures image quality and recognized text for two captures (typically a
//! custom camera pipeline and the native camera app) and reports which one is
//! better suited for OCR.

mod analysis;
mod app;
mod capture;
mod config;
mod shared;
mod storage;
mod vision;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::analysis::ReportFormat;
use crate::app::ComparisonSession;
use crate::config::AppConfig;
use crate::shared::SessionEvent;
use crate::vision::OcrBackend;

/// capture-rank - compare two captures for OCR suitability
#[derive(Parser, Debug)]
#[command(name = "capture-rank")]
#[command(about = "Ranks two captures of the same subject by OCR quality")]
struct Args {
    /// Image from the first capture path
    #[arg(required_unless_present = "init_config")]
    first: Option<PathBuf>,

    /// Image from the second capture path
    #[arg(required_unless_present = "init_config")]
    second: Option<PathBuf>,

    /// Label of the first capture (default from config)
    #[arg(long)]
    first_label: Option<String>,

    /// Label of the second capture (default from config)
    #[arg(long)]
    second_label: Option<String>,

    /// Configuration file (default: platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// OCR engine to use (overrides the config)
    #[arg(short, long, value_enum)]
    engine: Option<Engine>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Write the default configuration and exit
    #[arg(long)]
    init_config: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Engine {
    Tesseract,
    Replay,
}

impl From<Engine> for OcrBackend {
    fn from(engine: Engine) -> Self {
        match engine {
            Engine::Tesseract => OcrBackend::Tesseract,
            Engine::Replay => OcrBackend::Replay,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.init_config {
        return init_config(args.config.as_deref());
    }

    let (config, config_path) = load_or_default_config(args.config.as_deref())?;

    // Initialize logging
    let level = if args.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match &config_path {
        Some(path) => info!("Loaded configuration from {:?}", path),
        None => info!("Using default configuration"),
    }

    run(args, config).await
}

/// Load the configuration from an explicit path or the platform directory
fn load_or_default_config(explicit: Option<&Path>) -> Result<(AppConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        let config = config::load_config(path)?;
        return Ok((config, Some(path.to_path_buf())));
    }

    match storage::default_config_path() {
        Ok(path) if path.exists() => {
            let config = config::load_config(&path)?;
            Ok((config, Some(path)))
        }
        _ => Ok((AppConfig::default(), None)),
    }
}

fn init_config(explicit: Option<&Path>) -> Result<()> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => storage::default_config_path()?,
    };
    if path.exists() {
        bail!("Configuration already exists at {:?}", path);
    }
    config::save_config(&AppConfig::default(), &path)
        .with_context(|| format!("Failed to write config {:?}", path))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

async fn run(args: Args, mut config: AppConfig) -> Result<()> {
    let (Some(first_path), Some(second_path)) = (args.first, args.second) else {
        bail!("Two input images are required");
    };

    if let Some(engine) = args.engine {
        config.recognizer.backend = engine.into();
    }
    let first_label = args.first_label.unwrap_or(config.session.first_label);
    let second_label = args.second_label.unwrap_or(config.session.second_label);

    let first = Arc::new(capture::load_frame(&first_path, &first_label)?);
    let second = Arc::new(capture::load_frame(&second_path, &second_label)?);

    let recognizer = vision::create_recognizer(&config.recognizer);
    let (session, events) = ComparisonSession::new(recognizer);

    // Log session progress from a separate thread until every sender is gone
    let span = session.span().clone();
    let event_logger = std::thread::spawn(move || {
        let _enter = span.enter();
        for event in events {
            log_event(&event);
        }
    });

    let report = tokio::select! {
        report = session.run(first, second) => report,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted");
            session.cancel();
            None
        }
    };

    session.close().await;
    if event_logger.join().is_err() {
        error!("Event logger thread panicked");
    }

    let Some(report) = report else {
        bail!("Comparison cancelled before both analyses finished");
    };

    let format = if args.json {
        ReportFormat::Json
    } else {
        config.report.format
    };
    let rendered = analysis::render(&report, format).context("Failed to render report")?;

    match args.output {
        Some(path) => {
            storage::save_report(&path, &rendered)?;
            info!("Report written to {:?}", path);
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::Started { session_id } => debug!("Session {} started", session_id),
        SessionEvent::QualityMeasured {
            slot,
            source,
            metrics,
        } => debug!(
            "{:?} {}: sharpness {:.3}, contrast {:.3}, brightness {:.3}, noise {:.3}, {} px",
            slot,
            source,
            metrics.sharpness,
            metrics.contrast,
            metrics.brightness,
            metrics.noise_level,
            metrics.resolution
        ),
        SessionEvent::RecognitionFailed {
            slot,
            source,
            error,
        } => debug!("{:?} {} scored on image quality only: {}", slot, source, error),
        SessionEvent::AnalysisCompleted {
            slot,
            source,
            processing_time_ms,
        } => debug!("{:?} {} finished in {} ms", slot, source, processing_time_ms),
        SessionEvent::ComparisonReady { winner, score_gap } => {
            debug!("Comparison ready: {} wins by {:.3}", winner, score_gap)
        }
        other => debug!("Session event: {}", other.kind()),
    }
}
