//! Subcommand arguments.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Subcommand, ValueEnum};

use crate::calibration::Coordinate;
use crate::protocol::{Framing, LedColor};

/// Arguments for `play`.
#[derive(Debug, Args)]
pub struct PlayCommand {
    /// Seed for the machine's moves (overrides `game.seed`)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Serial device of the LED board (overrides `indicator.port`)
    #[arg(short, long, value_name = "DEVICE")]
    pub port: Option<PathBuf>,

    /// Wire framing for LED commands (overrides `indicator.framing`)
    #[arg(long, value_enum)]
    pub framing: Option<FramingArg>,

    /// Keep the vehicle on the ground; only the LEDs follow the game
    #[arg(long)]
    pub grounded: bool,
}

/// Arguments for `calibrate`.
#[derive(Debug, Args)]
pub struct CalibrateCommand {
    /// Where to write the calibration (overrides `calibration.path`)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Capture every tile without prompting
    #[arg(long)]
    pub all: bool,
}

/// Wire encoding helpers.
#[derive(Debug, Subcommand)]
pub enum EncodeCommand {
    /// Print the single-byte LED command
    Led {
        /// Tile 0-8, or 9 to clear every LED
        #[arg(value_parser = clap::value_parser!(u8).range(0..=9))]
        target: u8,

        /// Whose color to light
        #[arg(value_enum, default_value = "player")]
        color: ColorArg,
    },

    /// Print a legacy seven-byte frame
    Frame {
        /// Command byte
        command: u8,
        /// First data word (clamped to 65535)
        data1: u32,
        /// Second data word (clamped to 65535)
        data2: u32,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate a configuration file
    Validate {
        /// File to validate (defaults to the standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// LED color argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorArg {
    /// The human's color
    Player,
    /// The vehicle's color
    Machine,
}

impl From<ColorArg> for LedColor {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Player => Self::Player,
            ColorArg::Machine => Self::Machine,
        }
    }
}

/// Framing argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FramingArg {
    /// One byte per command
    Single,
    /// Seven-byte escaped frames
    Legacy,
}

impl From<FramingArg> for Framing {
    fn from(arg: FramingArg) -> Self {
        match arg {
            FramingArg::Single => Self::Single,
            FramingArg::Legacy => Self::Legacy,
        }
    }
}

/// One line typed during interactive calibration.
///
/// `<tile>` samples wherever the vehicle is now; `<tile> <x> <y>` first moves
/// the simulated vehicle to `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureInput {
    /// Tile being calibrated.
    pub tile: usize,
    /// Where to put the simulated vehicle before sampling.
    pub position: Option<Coordinate>,
}

impl FromStr for CaptureInput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        let number = |field: &str| {
            field
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("not a coordinate: {field}"))
        };

        let (tile, position) = match fields.as_slice() {
            [tile] => (*tile, None),
            [tile, x, y] => (*tile, Some(Coordinate::new(number(x)?, number(y)?))),
            _ => return Err("expected <tile> or <tile> <x> <y>".to_string()),
        };
        let tile = tile
            .parse::<usize>()
            .map_err(|_| format!("not a tile: {tile}"))?;
        Ok(Self { tile, position })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_arg_conversion() {
        assert_eq!(LedColor::from(ColorArg::Player), LedColor::Player);
        assert_eq!(LedColor::from(ColorArg::Machine), LedColor::Machine);
    }

    #[test]
    fn test_framing_arg_conversion() {
        assert_eq!(Framing::from(FramingArg::Single), Framing::Single);
        assert_eq!(Framing::from(FramingArg::Legacy), Framing::Legacy);
    }

    #[test]
    fn test_encode_command_debug() {
        let cmd = EncodeCommand::Frame {
            command: 1,
            data1: 255,
            data2: 0,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Frame"));
        assert!(debug_str.contains("255"));
    }

    #[test]
    fn test_capture_input_tile_only() {
        let input: CaptureInput = "4".parse().unwrap();
        assert_eq!(
            input,
            CaptureInput {
                tile: 4,
                position: None
            }
        );
    }

    #[test]
    fn test_capture_input_with_position() {
        let input: CaptureInput = " 7  0.25 -1.5 ".parse().unwrap();
        assert_eq!(input.tile, 7);
        assert_eq!(input.position, Some(Coordinate::new(0.25, -1.5)));
    }

    #[test]
    fn test_capture_input_rejects_malformed_lines() {
        for line in ["", "x", "3 1.0", "3 1.0 y", "3 nan 0", "-1", "3 1 2 4"] {
            assert!(line.parse::<CaptureInput>().is_err(), "{line:?} parsed");
        }
    }
}
