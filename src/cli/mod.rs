//! CLI Module
//!
//! Command-line interface for offline replay of recorded hand tracks.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::engine::ControlMode;

/// fingerfx - hand-gesture controlled audio effects
#[derive(Parser, Debug)]
#[command(name = "fingerfx")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file (JSON); defaults are used when omitted
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Control mode as a command-line value
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Continuous,
    Toggle,
}

impl From<ModeArg> for ControlMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Continuous => ControlMode::Continuous,
            ModeArg::Toggle => ControlMode::Toggle,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a landmark track and audio through the full session
    #[command(name = "process")]
    Process {
        /// Landmark track (JSON array of hands or nulls, one per frame)
        track: PathBuf,

        /// Input WAV; a 440 Hz test tone is used when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Directory for the live mix and exported recordings
        #[arg(short, long, default_value = "fingerfx-out")]
        output: PathBuf,

        /// Control mode (overrides the settings file)
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,

        /// Only write the live mix, do not record
        #[arg(long)]
        no_record: bool,
    },

    /// Print finger states and accepted gestures for each frame
    #[command(name = "classify")]
    Classify {
        /// Landmark track (JSON)
        track: PathBuf,

        /// Print one JSON object per frame
        #[arg(long)]
        json: bool,
    },

    /// Print the effective settings, or write them to a file
    #[command(name = "settings")]
    Settings {
        /// Write to this path instead of printing
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
