use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ov-classify", version, about = "Classify images with an OpenVINO model")]
pub struct Cli {
    /// Config file (defaults to $OVC_CONFIG, then ov-classifier.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, overrides RUST_LOG and the config file
    #[arg(long, global = true)]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List usable inference devices
    Devices,

    /// Classify one image file
    Classify {
        /// Path to the model (.xml or .onnx)
        #[arg(long)]
        model: PathBuf,

        /// Index into the `devices` listing
        #[arg(long, default_value_t = 0)]
        device: usize,

        /// Requested input width
        #[arg(long, default_value_t = 224)]
        width: usize,

        /// Requested input height
        #[arg(long, default_value_t = 224)]
        height: usize,

        /// Image to classify
        image: PathBuf,
    },
}
