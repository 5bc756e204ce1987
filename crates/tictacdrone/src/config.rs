//! Configuration management for tictacdrone.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::board::TILE_COUNT;
use crate::error::{Error, Result};
use crate::protocol::Framing;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "tictacdrone";

/// Default calibration file name.
const CALIBRATION_FILE_NAME: &str = "calibration.json";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `TICTACDRONE_`, sections split on `__`)
/// 2. TOML config file at `~/.config/tictacdrone/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Vehicle link and waypoint loop configuration.
    pub flight: FlightConfig,
    /// Game pacing configuration.
    pub game: GameConfig,
    /// LED board configuration.
    pub indicator: IndicatorConfig,
    /// Calibration storage configuration.
    pub calibration: CalibrationConfig,
}

/// Flight-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    /// Link URI of the vehicle.
    pub uri: String,
    /// Altitude waypoints are flown at, in metres.
    pub hold_altitude: f64,
    /// Speed bound for move commands, in m/s.
    pub velocity: f64,
    /// Interval between waypoint loop iterations in milliseconds.
    pub poll_interval_ms: u64,
    /// Per-axis arrival tolerance, in metres.
    pub arrival_epsilon: f64,
}

/// Game-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Longest wait for the vehicle to reach its tile, in milliseconds.
    pub dwell_ms: u64,
    /// Tile the vehicle returns to on restart.
    pub home_tile: usize,
    /// Seed for the machine's move choice. Unset means a fresh seed per run.
    pub seed: Option<u64>,
}

/// Indicator-board configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Serial device the LED board is attached to. Unset disables the board.
    pub port: Option<PathBuf>,
    /// Line speed the device is expected to run at.
    pub baud_rate: u32,
    /// Wire framing.
    pub framing: Framing,
}

/// Calibration-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Path to the calibration file.
    /// Defaults to `~/.local/share/tictacdrone/calibration.json`
    pub path: Option<PathBuf>,
    /// Tile pitch used to lay out the simulated board, in metres.
    pub grid_spacing: f64,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            uri: "radio://0/80/2M/E7E7E7E7E7".to_string(),
            hold_altitude: 0.15,
            velocity: 0.10,
            poll_interval_ms: 1000,
            arrival_epsilon: 0.2,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            dwell_ms: 3000,
            home_tile: 4,
            seed: None,
        }
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 9600,
            framing: Framing::Single,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            path: None, // Will be resolved to default at runtime
            grid_spacing: 0.3,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("TICTACDRONE_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(Error::ConfigValidation { message });

        if self.flight.poll_interval_ms == 0 {
            return invalid("poll_interval_ms must be greater than 0".to_string());
        }
        for (name, value) in [
            ("hold_altitude", self.flight.hold_altitude),
            ("velocity", self.flight.velocity),
            ("arrival_epsilon", self.flight.arrival_epsilon),
            ("grid_spacing", self.calibration.grid_spacing),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return invalid(format!("{name} must be a positive number (got {value})"));
            }
        }
        if self.game.dwell_ms == 0 {
            return invalid("dwell_ms must be greater than 0".to_string());
        }
        if self.game.home_tile >= TILE_COUNT {
            return invalid(format!(
                "home_tile must be between 0 and 8 (got {})",
                self.game.home_tile
            ));
        }
        if self.indicator.baud_rate == 0 {
            return invalid("baud_rate must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the calibration file path, resolving defaults if not set.
    #[must_use]
    pub fn calibration_path(&self) -> PathBuf {
        self.calibration
            .path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(CALIBRATION_FILE_NAME))
    }

    /// Get the waypoint poll interval as a Duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.flight.poll_interval_ms)
    }

    /// Get the dwell timeout as a Duration.
    #[must_use]
    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.game.dwell_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.flight.uri, "radio://0/80/2M/E7E7E7E7E7");
        assert_eq!(config.game.home_tile, 4);
        assert!(config.indicator.port.is_none());
        assert_eq!(config.indicator.framing, Framing::Single);
    }

    #[test]
    fn test_default_flight_config() {
        let flight = FlightConfig::default();

        assert!((flight.hold_altitude - 0.15).abs() < f64::EPSILON);
        assert!((flight.velocity - 0.10).abs() < f64::EPSILON);
        assert_eq!(flight.poll_interval_ms, 1000);
        assert!((flight.arrival_epsilon - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_game_config() {
        let game = GameConfig::default();

        assert_eq!(game.dwell_ms, 3000);
        assert!(game.seed.is_none());
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_poll_interval() {
        let mut config = Config::default();
        config.flight.poll_interval_ms = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("poll_interval_ms"));
    }

    #[test]
    fn test_validate_non_positive_velocity() {
        let mut config = Config::default();
        config.flight.velocity = 0.0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("velocity"));
    }

    #[test]
    fn test_validate_nan_epsilon() {
        let mut config = Config::default();
        config.flight.arrival_epsilon = f64::NAN;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("arrival_epsilon"));
    }

    #[test]
    fn test_validate_home_tile_off_board() {
        let mut config = Config::default();
        config.game.home_tile = 9;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("home_tile"));
    }

    #[test]
    fn test_validate_zero_baud() {
        let mut config = Config::default();
        config.indicator.baud_rate = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_calibration_path_default() {
        let config = Config::default();
        let path = config.calibration_path();

        assert!(path.to_string_lossy().contains("tictacdrone"));
        assert!(path.to_string_lossy().ends_with("calibration.json"));
    }

    #[test]
    fn test_calibration_path_custom() {
        let mut config = Config::default();
        config.calibration.path = Some(PathBuf::from("/custom/tiles.json"));

        assert_eq!(config.calibration_path(), PathBuf::from("/custom/tiles.json"));
    }

    #[test]
    fn test_durations() {
        let config = Config::default();

        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.dwell(), Duration::from_secs(3));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("tictacdrone"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_toml_file() {
        let dir = std::env::temp_dir().join(format!("tictacdrone-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            "[game]\nhome_tile = 0\ndwell_ms = 500\n\n[indicator]\nframing = \"legacy\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        assert_eq!(config.game.home_tile, 0);
        assert_eq!(config.game.dwell_ms, 500);
        assert_eq!(config.indicator.framing, Framing::Legacy);
        assert_eq!(config.flight, FlightConfig::default());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = std::env::temp_dir().join(format!("tictacdrone-badcfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[game]\nhome_tile = 12\n").unwrap();

        assert!(matches!(
            Config::load_from(Some(path.clone())),
            Err(Error::ConfigValidation { .. })
        ));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_flight_config_deserialize() {
        let json = r#"{"velocity": 0.25, "poll_interval_ms": 500}"#;
        let flight: FlightConfig = serde_json::from_str(json).unwrap();
        assert!((flight.velocity - 0.25).abs() < f64::EPSILON);
        assert_eq!(flight.poll_interval_ms, 500);
        assert_eq!(flight.uri, FlightConfig::default().uri);
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("hold_altitude"));
        assert!(json.contains("\"framing\":\"single\""));
    }
}
