//! Command-line interface for voxarch
//!
//! Provides argument parsing using clap derive macros.

use crate::app::RunChoices;
use crate::request::{DevicePreference, ModelSize, Platform};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Meeting recordings to transcripts, analyses and cloud solution proposals
#[derive(Parser, Debug)]
#[command(
    name = "voxarch",
    version,
    about = "Meeting recordings to transcripts, analyses and cloud solution proposals"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress progress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: segment previews, -vv: debug logs)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcribe a recording, optionally followed by analysis and solution
    Run(RunArgs),

    /// List Whisper model sizes and whether they are installed
    Models,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Arguments of `voxarch run`
#[derive(clap::Args, Debug, Clone, PartialEq)]
pub struct RunArgs {
    /// WAV recording to transcribe
    #[arg(value_name = "AUDIO")]
    pub audio: PathBuf,

    /// Transcript file (default: Transcricao-<audio name>.txt next to the audio)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Whisper model size (default: from config)
    #[arg(long, value_enum, value_name = "SIZE")]
    pub model: Option<ModelSize>,

    /// Inference device (default: from config)
    #[arg(long, value_enum, value_name = "DEVICE")]
    pub device: Option<DevicePreference>,

    /// Generate the business-problem analysis
    #[arg(long)]
    pub analysis: bool,

    /// Generate a solution proposal for this cloud platform
    #[arg(long, value_enum, value_name = "PLATFORM")]
    pub solution: Option<Platform>,
}

impl From<RunArgs> for RunChoices {
    fn from(args: RunArgs) -> Self {
        RunChoices {
            audio: args.audio,
            output: args.output,
            model: args.model,
            device: args.device,
            analysis: args.analysis,
            solution: args.solution,
        }
    }
}

/// Configuration actions
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the configuration file path
    Path,
    /// Print the effective configuration (file + environment)
    Show,
}
