//! Image classification CLI
//!
//! Host application for the classifier library: lists devices, or loads a
//! model and classifies a single image file.

mod cli;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use ov_classifier::config::{Config, CONFIG_ENV};
use ov_classifier::runtime::OpenVinoRuntime;
use ov_classifier::utils::frame_from_file;
use ov_classifier::{Classifier, LoadStatus, Resolution};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(Config::default_path()));
    let loaded = Config::load(&path.to_string_lossy());

    // Initialize logging
    let filter = match (&cli.log, &loaded) {
        (Some(log), _) => EnvFilter::new(log),
        (None, Ok(config)) => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        (None, Err(_)) => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = match loaded {
        Ok(config) => config,
        // An explicitly named config must exist
        Err(e) if cli.config.is_some() => {
            return Err(e.context(format!("failed to load config {}", path.display())))
        }
        Err(e) => {
            info!("Using default config ({})", e);
            Config::default()
        }
    };

    let runtime = OpenVinoRuntime::new().context("failed to initialize OpenVINO")?;
    let mut classifier = Classifier::new(runtime, &config);

    match cli.command {
        Command::Devices => {
            let devices = classifier.enumerate_devices()?;
            if devices.is_empty() {
                warn!("No usable devices found");
            }
            for (index, name) in devices.iter().enumerate() {
                println!("{}: {}", index, name);
            }
        }
        Command::Classify {
            model,
            device,
            width,
            height,
            image,
        } => {
            classifier.enumerate_devices()?;
            let device_name = classifier.device_name(device)?.to_string();

            let outcome = classifier.load_model(&model, device, Resolution::new(width, height))?;
            if outcome.status == LoadStatus::Degraded {
                warn!(
                    "Model kept its default input {}, requested {}x{}",
                    outcome.resolution, width, height
                );
            }

            let frame = frame_from_file(&image, outcome.resolution)?;
            let start = Instant::now();
            let prediction = classifier.classify(&frame)?;
            info!("Inference on {} took {:?}", device_name, start.elapsed());

            println!(
                "class {} of {} (confidence {:.4})",
                prediction.class_index, outcome.class_count, prediction.confidence
            );
        }
    }

    Ok(())
}
