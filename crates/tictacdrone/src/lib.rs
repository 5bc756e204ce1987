//! `tictacdrone` - tic-tac-toe against a quadcopter.
//!
//! A human and the vehicle share a 3×3 floor board. The vehicle flies to and
//! hovers over the tile it plays while a serial LED board lights every taken
//! tile in its owner's color.
//!
//! The pieces:
//!
//! - [`board`]: game state and win/draw detection.
//! - [`calibration`]: where each tile sits in the vehicle's frame.
//! - [`protocol`]: byte encodings for the LED board.
//! - [`flight`] and [`waypoint`]: the vehicle seam and the background task
//!   that keeps it over the current target.
//! - [`indicator`]: the LED board transport.
//! - [`game`]: the turn loop tying them together.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod board;
pub mod calibration;
pub mod cli;
pub mod config;
pub mod error;
pub mod flight;
pub mod game;
pub mod indicator;
pub mod logging;
pub mod protocol;
pub mod waypoint;

pub use board::{Board, Occupant, Terminal};
pub use calibration::{CalibrationSession, CalibrationStore, Coordinate};
pub use config::Config;
pub use error::{Error, Result};
pub use flight::{FlightController, Position, SimulatedFlight};
pub use game::{GameSettings, GameView, Orchestrator, TurnReport};
pub use indicator::{IndicatorBoard, NullIndicator, SerialIndicator};
pub use logging::init_logging;
pub use waypoint::{WaypointController, WaypointHandle};
