//! Command-line interface for the `tictacdrone` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CalibrateCommand, CaptureInput, ColorArg, ConfigCommand, EncodeCommand, FramingArg, PlayCommand,
};

/// tictacdrone - tic-tac-toe against a quadcopter
///
/// The vehicle flies to the tile it plays while an LED board shows the
/// state of the game.
#[derive(Debug, Parser)]
#[command(name = "tictacdrone")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Play a game in the terminal
    Play(PlayCommand),

    /// Record where each tile is in the vehicle's frame
    Calibrate(CalibrateCommand),

    /// Print wire bytes for the indicator board
    #[command(subcommand)]
    Encode(EncodeCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
