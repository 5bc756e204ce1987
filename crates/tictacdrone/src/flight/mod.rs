//! The vehicle seam.
//!
//! The game only needs four things from a flight stack: open a link, fly to
//! a point, land, and report where the vehicle is. [`FlightController`]
//! captures exactly that so the waypoint loop never depends on a concrete
//! radio or SDK.

mod sim;

use thiserror::Error;

pub use sim::{FlightCommand, SimulatedFlight};

/// A position estimate or setpoint in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Position {
    /// X in metres.
    pub x: f64,
    /// Y in metres.
    pub y: f64,
    /// Height above the floor in metres.
    pub z: f64,
}

impl Position {
    /// Create a position.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Straight-line distance to `other`.
    #[must_use]
    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

/// Errors reported by a flight link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlightError {
    /// Opening the link failed.
    #[error("failed to connect to {uri}: {message}")]
    ConnectFailed {
        /// The link URI.
        uri: String,
        /// Description of what went wrong.
        message: String,
    },

    /// A command was issued without an open link.
    #[error("vehicle not connected")]
    NotConnected,

    /// The link dropped while in use.
    #[error("link lost: {0}")]
    LinkLost(String),
}

/// A vehicle that can be flown to waypoints.
///
/// Implementations must be safe to share between the game task and the
/// waypoint loop.
#[async_trait::async_trait]
pub trait FlightController: Send + Sync {
    /// Open the link to the vehicle at `uri`. Connecting twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`FlightError::ConnectFailed`] if the link cannot be opened.
    async fn connect(&self, uri: &str) -> Result<(), FlightError>;

    /// Fly to `target` with speed bounded by `velocity` (m/s).
    ///
    /// Returns once the command has been accepted, not once it is reached.
    ///
    /// # Errors
    ///
    /// Returns an error if the link is closed or drops.
    async fn go_to(&self, target: Position, velocity: f64) -> Result<(), FlightError>;

    /// Land at the current position.
    ///
    /// # Errors
    ///
    /// Returns an error if the link is closed or drops.
    async fn land(&self) -> Result<(), FlightError>;

    /// Read one position estimate.
    ///
    /// # Errors
    ///
    /// Returns an error if the link is closed or drops.
    async fn telemetry(&self) -> Result<Position, FlightError>;
}
