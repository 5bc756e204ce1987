//! Operator-driven calibration.

use std::collections::BTreeSet;

use tracing::{info, warn};

use super::{CalibrationStore, Coordinate};
use crate::board::TILE_COUNT;
use crate::error::{Error, Result};
use crate::flight::FlightController;

/// Tracks which tiles are still waiting to be calibrated.
///
/// The operator hovers (or carries) the vehicle over a tile, names that tile,
/// and the session samples one telemetry reading into the store. Tiles can be
/// visited in any order, each exactly once per session.
///
/// The session owns the link: it connects before the first sample and again
/// after any telemetry failure.
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    remaining: BTreeSet<usize>,
    uri: String,
    linked: bool,
}

impl CalibrationSession {
    /// Start a session covering all nine tiles, talking to the vehicle at `uri`.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            remaining: (0..TILE_COUNT).collect(),
            uri: uri.into(),
            linked: false,
        }
    }

    /// Tiles not yet captured in this session, ascending.
    #[must_use]
    pub fn remaining(&self) -> Vec<usize> {
        self.remaining.iter().copied().collect()
    }

    /// Whether every tile has been captured.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Sample the vehicle's position and record it for `tile`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] for an index off the board,
    /// [`Error::TileAlreadyCaptured`] if this session already captured the
    /// tile, or [`Error::ConnectionFailure`] if the link cannot be opened or
    /// telemetry cannot be read. The tile stays pending on failure and the
    /// next capture reconnects first.
    pub async fn capture(
        &mut self,
        tile: usize,
        flight: &dyn FlightController,
        store: &mut CalibrationStore,
    ) -> Result<Coordinate> {
        if tile >= TILE_COUNT {
            return Err(Error::IndexOutOfRange { index: tile });
        }
        if !self.remaining.contains(&tile) {
            return Err(Error::TileAlreadyCaptured { tile });
        }

        if !self.linked {
            flight.connect(&self.uri).await?;
            self.linked = true;
        }
        let position = match flight.telemetry().await {
            Ok(position) => position,
            Err(e) => {
                warn!(tile, "Telemetry failed, will reconnect on the next capture: {e}");
                self.linked = false;
                return Err(e.into());
            }
        };
        let coordinate = Coordinate::from(position);
        store.record(tile, coordinate)?;
        self.remaining.remove(&tile);
        info!(tile, %coordinate, remaining = self.remaining.len(), "Captured tile position");
        Ok(coordinate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::{FlightCommand, Position, SimulatedFlight};

    const URI: &str = "sim://test";

    fn connects(flight: &SimulatedFlight) -> usize {
        flight
            .commands()
            .iter()
            .filter(|c| matches!(c, FlightCommand::Connect(_)))
            .count()
    }

    #[tokio::test]
    async fn test_capture_records_current_position() {
        let flight = SimulatedFlight::new();
        let mut store = CalibrationStore::new();
        let mut session = CalibrationSession::new(URI);

        flight.place(Position::new(0.4, -0.2, 0.0));
        let coordinate = session.capture(2, &flight, &mut store).await.unwrap();

        assert_eq!(coordinate, Coordinate::new(0.4, -0.2));
        assert_eq!(store.get(2).unwrap(), coordinate);
        assert!(!session.remaining().contains(&2));
    }

    #[tokio::test]
    async fn test_capture_rejects_repeat_and_out_of_range() {
        let flight = SimulatedFlight::new();
        let mut store = CalibrationStore::new();
        let mut session = CalibrationSession::new(URI);

        session.capture(5, &flight, &mut store).await.unwrap();
        assert!(matches!(
            session.capture(5, &flight, &mut store).await,
            Err(Error::TileAlreadyCaptured { tile: 5 })
        ));
        assert!(matches!(
            session.capture(9, &flight, &mut store).await,
            Err(Error::IndexOutOfRange { index: 9 })
        ));
    }

    #[tokio::test]
    async fn test_session_completes_in_any_order() {
        let flight = SimulatedFlight::new();
        let mut store = CalibrationStore::new();
        let mut session = CalibrationSession::new(URI);

        for tile in [4, 8, 0, 2, 6, 1, 3, 5, 7] {
            assert!(!session.is_complete());
            session.capture(tile, &flight, &mut store).await.unwrap();
        }
        assert!(session.is_complete());
        assert!(store.is_complete());
    }

    #[tokio::test]
    async fn test_telemetry_failure_keeps_tile_pending() {
        let flight = SimulatedFlight::new();
        flight.fail_next_telemetry(1);
        let mut store = CalibrationStore::new();
        let mut session = CalibrationSession::new(URI);

        assert!(matches!(
            session.capture(0, &flight, &mut store).await,
            Err(Error::ConnectionFailure(_))
        ));
        assert!(session.remaining().contains(&0));
        assert!(store.get(0).is_err());

        session.capture(0, &flight, &mut store).await.unwrap();
        assert!(store.get(0).is_ok());
    }

    #[tokio::test]
    async fn test_first_capture_opens_link_once() {
        let flight = SimulatedFlight::new();
        let mut store = CalibrationStore::new();
        let mut session = CalibrationSession::new(URI);

        session.capture(0, &flight, &mut store).await.unwrap();
        session.capture(1, &flight, &mut store).await.unwrap();

        assert!(flight.is_connected());
        assert_eq!(connects(&flight), 1);
        assert_eq!(flight.commands()[0], FlightCommand::Connect(URI.to_string()));
    }

    #[tokio::test]
    async fn test_link_drop_recovers_for_remaining_tiles() {
        let flight = SimulatedFlight::new();
        let mut store = CalibrationStore::new();
        let mut session = CalibrationSession::new(URI);

        session.capture(0, &flight, &mut store).await.unwrap();
        flight.fail_next_telemetry(1);
        assert!(matches!(
            session.capture(1, &flight, &mut store).await,
            Err(Error::ConnectionFailure(_))
        ));

        for tile in 1..TILE_COUNT {
            flight.place(Position::new(tile as f64, 0.5, 0.0));
            let coordinate = session.capture(tile, &flight, &mut store).await.unwrap();
            assert_eq!(coordinate, Coordinate::new(tile as f64, 0.5));
        }
        assert!(session.is_complete());
        assert!(store.is_complete());
        assert_eq!(connects(&flight), 2);
    }

    #[tokio::test]
    async fn test_connect_failure_keeps_tile_pending() {
        let flight = SimulatedFlight::new();
        flight.fail_next_connects(1);
        let mut store = CalibrationStore::new();
        let mut session = CalibrationSession::new(URI);

        assert!(matches!(
            session.capture(3, &flight, &mut store).await,
            Err(Error::ConnectionFailure(_))
        ));
        assert!(session.remaining().contains(&3));

        session.capture(3, &flight, &mut store).await.unwrap();
        assert_eq!(connects(&flight), 2);
    }
}
