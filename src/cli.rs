//! Command-line arguments

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Menu bot driven by template matching
#[derive(Parser, Debug)]
#[command(name = "courtbot")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Debug-level logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a session against replayed screenshots with dry-run input
    Run {
        /// Bot configuration file
        #[arg(short, long, default_value = "config.json", env = "COURTBOT_CONFIG")]
        config: PathBuf,
        /// Screenshot file or directory of frames to replay
        #[arg(short, long)]
        frames: PathBuf,
        /// Stop after this many control-loop ticks
        #[arg(short, long)]
        ticks: Option<u64>,
        /// How long Ctrl-C waits for the session to exit
        #[arg(long, default_value_t = 1000)]
        stop_timeout_ms: u64,
    },

    /// Score references against one screenshot
    Probe {
        #[arg(short, long, default_value = "config.json", env = "COURTBOT_CONFIG")]
        config: PathBuf,
        /// Screenshot to score
        screenshot: PathBuf,
        /// Only score this label
        #[arg(short, long)]
        label: Option<String>,
        /// Threshold override for the verdict
        #[arg(long)]
        threshold: Option<f64>,
        /// Match references at their authored size on any frame height
        #[arg(long)]
        no_scale: bool,
    },

    /// Validate a configuration and load every reference image
    Check {
        #[arg(short, long, default_value = "config.json", env = "COURTBOT_CONFIG")]
        config: PathBuf,
    },
}
