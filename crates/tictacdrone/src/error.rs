//! Error types for tictacdrone.
//!
//! Every failure in the game core maps onto one of these variants. Most of
//! them are recoverable: the game loop logs them, surfaces them to the view
//! and carries on.

use std::path::PathBuf;
use thiserror::Error;

use crate::flight::FlightError;

/// The main error type for tictacdrone operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Game Errors ===
    /// A move targeted an occupied tile or a tile outside the board.
    #[error("invalid move on tile {tile}: {reason}")]
    InvalidMove {
        /// The requested tile index.
        tile: usize,
        /// Why the move was rejected.
        reason: &'static str,
    },

    /// The game has ended and no more moves are accepted until restart.
    #[error("game is over, restart to play again")]
    GameOver,

    // === Calibration Errors ===
    /// A tile index outside `0..=8` was given to the calibration store.
    #[error("tile index {index} is out of range (expected 0..=8)")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
    },

    /// The calibration session already captured this tile.
    #[error("tile {tile} was already captured in this calibration session")]
    TileAlreadyCaptured {
        /// The repeated tile.
        tile: usize,
    },

    /// The tile has no recorded world coordinate yet.
    #[error("tile {tile} has not been calibrated")]
    NotCalibrated {
        /// The tile that was looked up.
        tile: usize,
    },

    // === Actuator Errors ===
    /// The link to the vehicle failed or dropped.
    #[error("flight link failure: {0}")]
    ConnectionFailure(#[from] FlightError),

    /// Writing to the indicator board failed.
    #[error("indicator transport error: {0}")]
    Transport(#[source] std::io::Error),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for tictacdrone operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create an invalid move error.
    #[must_use]
    pub fn invalid_move(tile: usize, reason: &'static str) -> Self {
        Self::InvalidMove { tile, reason }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a rejected move.
    #[must_use]
    pub fn is_invalid_move(&self) -> bool {
        matches!(self, Self::InvalidMove { .. })
    }

    /// Check if the game loop can continue after this error.
    ///
    /// Configuration, filesystem and internal errors are not recoverable;
    /// everything raised while playing is.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidMove { .. }
                | Self::GameOver
                | Self::IndexOutOfRange { .. }
                | Self::TileAlreadyCaptured { .. }
                | Self::NotCalibrated { .. }
                | Self::ConnectionFailure(_)
                | Self::Transport(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_move_display() {
        let err = Error::invalid_move(4, "tile is occupied");
        assert_eq!(err.to_string(), "invalid move on tile 4: tile is occupied");
        assert!(err.is_invalid_move());
    }

    #[test]
    fn test_not_calibrated_display() {
        let err = Error::NotCalibrated { tile: 7 };
        assert_eq!(err.to_string(), "tile 7 has not been calibrated");
    }

    #[test]
    fn test_index_out_of_range_display() {
        let err = Error::IndexOutOfRange { index: 12 };
        assert!(err.to_string().contains("12"));
        assert!(err.to_string().contains("0..=8"));
    }

    #[test]
    fn test_from_flight_error() {
        let err: Error = FlightError::NotConnected.into();
        assert!(matches!(err, Error::ConnectionFailure(_)));
        assert!(err.to_string().contains("not connected"));
    }

    #[test]
    fn test_transport_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "cable pulled");
        let err = Error::Transport(io_err);
        assert!(err.to_string().contains("cable pulled"));
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::GameOver.is_recoverable());
        assert!(Error::NotCalibrated { tile: 0 }.is_recoverable());
        assert!(Error::invalid_move(9, "out of range").is_recoverable());
        assert!(!Error::internal("bug").is_recoverable());
        assert!(!Error::ConfigValidation {
            message: "bad".to_string()
        }
        .is_recoverable());
    }

    #[test]
    fn test_internal_error() {
        let err = Error::internal("something went wrong");
        assert_eq!(err.to_string(), "internal error: something went wrong");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
