//! Tile calibration: where each board tile sits in the vehicle's world frame.
//!
//! The store holds nine independent slots. A slot is written by sampling the
//! vehicle's position while it hovers over the tile (see [`CalibrationSession`]);
//! writing again simply replaces the previous value. The whole map can be
//! saved as JSON so a calibration survives a restart.

mod session;

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::board::TILE_COUNT;
use crate::error::{Error, Result};
use crate::flight::Position;

pub use session::CalibrationSession;

/// A point on the floor plane. The flight altitude is fixed separately.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// X in metres.
    pub x: f64,
    /// Y in metres.
    pub y: f64,
}

impl Coordinate {
    /// Create a coordinate.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Centre of `tile` on a square grid with `spacing` metres between
    /// tiles, tile 0 at the origin and rows running along +y.
    #[must_use]
    pub fn grid(tile: usize, spacing: f64) -> Self {
        Self::new((tile % 3) as f64 * spacing, (tile / 3) as f64 * spacing)
    }

    /// Lift this coordinate to `altitude`.
    #[must_use]
    pub const fn at_altitude(self, altitude: f64) -> Position {
        Position::new(self.x, self.y, altitude)
    }
}

impl From<Position> for Coordinate {
    fn from(p: Position) -> Self {
        Self::new(p.x, p.y)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// One recorded slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEntry {
    /// The recorded coordinate.
    #[serde(flatten)]
    pub coordinate: Coordinate,
    /// When it was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Tile index to world coordinate map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationStore {
    tiles: [Option<CalibrationEntry>; TILE_COUNT],
}

impl CalibrationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the coordinate of `tile`, replacing any earlier value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `tile` is not in `0..=8`.
    pub fn record(&mut self, tile: usize, coordinate: Coordinate) -> Result<()> {
        let slot = self
            .tiles
            .get_mut(tile)
            .ok_or(Error::IndexOutOfRange { index: tile })?;
        *slot = Some(CalibrationEntry {
            coordinate,
            recorded_at: Utc::now(),
        });
        debug!(tile, %coordinate, "Tile calibrated");
        Ok(())
    }

    /// Look up the coordinate of `tile`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] for an index off the board and
    /// [`Error::NotCalibrated`] if the slot was never written.
    pub fn get(&self, tile: usize) -> Result<Coordinate> {
        self.entry(tile).map(|e| e.coordinate)
    }

    /// Look up the full entry for `tile`.
    ///
    /// # Errors
    ///
    /// Same as [`CalibrationStore::get`].
    pub fn entry(&self, tile: usize) -> Result<CalibrationEntry> {
        self.tiles
            .get(tile)
            .ok_or(Error::IndexOutOfRange { index: tile })?
            .ok_or(Error::NotCalibrated { tile })
    }

    /// Whether all nine tiles have a coordinate.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.tiles.iter().all(Option::is_some)
    }

    /// Tiles that still need a coordinate, ascending.
    #[must_use]
    pub fn missing(&self) -> Vec<usize> {
        (0..TILE_COUNT)
            .filter(|&t| self.tiles[t].is_none())
            .collect()
    }

    /// Load a store from `path`. A missing file yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No calibration at {}, starting empty", path.display());
            return Ok(Self::new());
        }

        let contents = std::fs::read_to_string(path)?;
        let store: Self = serde_json::from_str(&contents)?;
        info!(
            "Loaded calibration from {} ({} of {} tiles)",
            path.display(),
            TILE_COUNT - store.missing().len(),
            TILE_COUNT
        );
        Ok(store)
    }

    /// Save the store to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Saved calibration to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("tictacdrone-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_grid_layout() {
        assert_eq!(Coordinate::grid(0, 0.5), Coordinate::new(0.0, 0.0));
        assert_eq!(Coordinate::grid(2, 0.5), Coordinate::new(1.0, 0.0));
        assert_eq!(Coordinate::grid(4, 0.5), Coordinate::new(0.5, 0.5));
        assert_eq!(Coordinate::grid(7, 0.5), Coordinate::new(0.5, 1.0));
    }

    #[test]
    fn test_get_before_record_is_not_calibrated() {
        let store = CalibrationStore::new();
        for tile in 0..TILE_COUNT {
            assert!(matches!(
                store.get(tile),
                Err(Error::NotCalibrated { tile: t }) if t == tile
            ));
        }
    }

    #[test]
    fn test_record_then_get() {
        let mut store = CalibrationStore::new();
        store.record(3, Coordinate::new(0.5, -0.25)).unwrap();
        assert_eq!(store.get(3).unwrap(), Coordinate::new(0.5, -0.25));
        assert!(store.get(4).is_err());
    }

    #[test]
    fn test_last_write_wins() {
        let mut store = CalibrationStore::new();
        store.record(0, Coordinate::new(1.0, 1.0)).unwrap();
        store.record(0, Coordinate::new(2.0, 3.0)).unwrap();
        assert_eq!(store.get(0).unwrap(), Coordinate::new(2.0, 3.0));
    }

    #[test]
    fn test_record_out_of_range() {
        let mut store = CalibrationStore::new();
        let err = store.record(9, Coordinate::new(0.0, 0.0)).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 9 }));
        assert!(matches!(
            store.get(42),
            Err(Error::IndexOutOfRange { index: 42 })
        ));
        assert_eq!(store, CalibrationStore::new());
    }

    #[test]
    fn test_completion_in_any_order() {
        let mut store = CalibrationStore::new();
        for tile in [8, 0, 4, 2, 6, 1, 7, 3] {
            store.record(tile, Coordinate::new(0.0, 0.0)).unwrap();
            assert!(!store.is_complete());
        }
        assert_eq!(store.missing(), vec![5]);
        store.record(5, Coordinate::new(0.0, 0.0)).unwrap();
        assert!(store.is_complete());
        assert!(store.missing().is_empty());
    }

    #[test]
    fn test_coordinate_at_altitude() {
        let p = Coordinate::new(1.0, 2.0).at_altitude(0.15);
        assert_eq!(p, Position::new(1.0, 2.0, 0.15));
        assert_eq!(Coordinate::from(p), Coordinate::new(1.0, 2.0));
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("save_and_load/calibration.json");
        let mut store = CalibrationStore::new();
        store.record(1, Coordinate::new(0.3, 0.6)).unwrap();
        store.record(7, Coordinate::new(-0.3, 0.0)).unwrap();

        store.save(&path).unwrap();
        let loaded = CalibrationStore::load(&path).unwrap();
        assert_eq!(loaded, store);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let store = CalibrationStore::load("/nonexistent/calibration.json").unwrap();
        assert_eq!(store, CalibrationStore::new());
    }

    #[test]
    fn test_load_invalid_json() {
        let path = temp_path("invalid/calibration.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(CalibrationStore::load(&path), Err(Error::Json(_))));
        let _ = std::fs::remove_file(&path);
    }
}
