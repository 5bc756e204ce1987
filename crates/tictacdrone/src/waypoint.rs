//! Background waypoint control.
//!
//! One [`WaypointController`] owns one long-lived task that flies one vehicle.
//! The game side talks to it through a cloneable [`WaypointHandle`]: it
//! arms and disarms the task, overwrites the current target tile, and
//! waits for the arrival signal. All of that state crosses the task boundary
//! through `tokio::sync::watch` cells, so the loop always sees the latest
//! target and never a queue of stale ones.
//!
//! While armed the loop repeats, once per poll interval:
//!
//! 1. read the latest target tile,
//! 2. look up its calibrated coordinate (skip the iteration if there is none),
//! 3. read one telemetry sample,
//! 4. command a bounded-velocity move to the coordinate at the hold altitude.
//!
//! Link failures are logged and retried on the next iteration. Disarming is
//! observed at the next iteration boundary and is always followed by a
//! landing command.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::calibration::{CalibrationStore, Coordinate};
use crate::config::FlightConfig;
use crate::error::{Error, Result};
use crate::flight::{FlightController, Position};

/// Calibration shared between the game side and the waypoint loop.
pub type SharedCalibration = Arc<RwLock<CalibrationStore>>;

/// Operating state of the waypoint task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerState {
    /// Grounded, waiting to be armed.
    Idle,
    /// Flying toward the current target.
    Armed,
    /// The task has exited.
    Stopped,
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Armed => write!(f, "armed"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Tuning for the waypoint loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    /// Link URI handed to [`FlightController::connect`].
    pub uri: String,
    /// Altitude every waypoint is flown at, in metres.
    pub hold_altitude: f64,
    /// Speed bound for each move command, in m/s.
    pub velocity: f64,
    /// Delay between loop iterations.
    pub poll_interval: Duration,
    /// Per-axis tolerance used for the arrival signal, in metres.
    pub arrival_epsilon: f64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&FlightConfig::default())
    }
}

impl From<&FlightConfig> for ControllerSettings {
    fn from(config: &FlightConfig) -> Self {
        Self {
            uri: config.uri.clone(),
            hold_altitude: config.hold_altitude,
            velocity: config.velocity,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            arrival_epsilon: config.arrival_epsilon,
        }
    }
}

#[derive(Debug)]
struct Shared {
    target: watch::Sender<Option<usize>>,
    armed: watch::Sender<bool>,
    shutdown: watch::Sender<bool>,
    state: watch::Sender<ControllerState>,
    position: watch::Sender<Option<Position>>,
    arrival: watch::Sender<Option<usize>>,
    calibration: SharedCalibration,
}

impl Shared {
    fn new(calibration: SharedCalibration) -> Self {
        Self {
            target: watch::Sender::new(None),
            armed: watch::Sender::new(false),
            shutdown: watch::Sender::new(false),
            state: watch::Sender::new(ControllerState::Idle),
            position: watch::Sender::new(None),
            arrival: watch::Sender::new(None),
            calibration,
        }
    }

    fn lookup(&self, tile: usize) -> Result<Coordinate> {
        self.calibration
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tile)
    }

    fn set_state(&self, state: ControllerState) {
        if self.state.send_replace(state) != state {
            info!(%state, "Waypoint controller state changed");
        }
    }

    fn arrived(&self, tile: usize, epsilon: f64) -> bool {
        let Some(position) = *self.position.borrow() else {
            return false;
        };
        let Ok(coordinate) = self.lookup(tile) else {
            return false;
        };
        (position.x - coordinate.x).abs() < epsilon && (position.y - coordinate.y).abs() < epsilon
    }
}

/// Cloneable control surface for a running [`WaypointController`].
#[derive(Debug, Clone)]
pub struct WaypointHandle {
    shared: Arc<Shared>,
}

impl WaypointHandle {
    /// Point the vehicle at `tile`, replacing any earlier target.
    ///
    /// Never blocks and is never acknowledged; the loop picks the value up on
    /// its next iteration.
    pub fn set_target(&self, tile: usize) {
        self.shared.target.send_replace(Some(tile));
        self.shared.arrival.send_replace(None);
        debug!(tile, "Waypoint target set");
    }

    /// The current target tile.
    #[must_use]
    pub fn target(&self) -> Option<usize> {
        *self.shared.target.borrow()
    }

    /// Allow the loop to fly.
    pub fn arm(&self) {
        self.shared.armed.send_replace(true);
    }

    /// Stop flying; the loop lands the vehicle at its next iteration.
    pub fn disarm(&self) {
        self.shared.armed.send_replace(false);
    }

    /// Current operating state.
    #[must_use]
    pub fn state(&self) -> ControllerState {
        *self.shared.state.borrow()
    }

    /// Last position sample taken by the loop.
    #[must_use]
    pub fn position(&self) -> Option<Position> {
        *self.shared.position.borrow()
    }

    /// Whether the last known position is within `epsilon` of `tile` on both axes.
    ///
    /// Both deltas must be strictly smaller than `epsilon`. Returns `false`
    /// when no position has been sampled or the tile is not calibrated.
    #[must_use]
    pub fn arrived(&self, tile: usize, epsilon: f64) -> bool {
        self.shared.arrived(tile, epsilon)
    }

    /// Wait until the loop reports arrival at `tile`, for at most `timeout`.
    ///
    /// Returns `true` on arrival and `false` if the timeout elapsed first.
    pub async fn wait_for_arrival(&self, tile: usize, timeout: Duration) -> bool {
        let mut rx = self.shared.arrival.subscribe();
        let arrived = matches!(
            tokio::time::timeout(timeout, rx.wait_for(|a| *a == Some(tile))).await,
            Ok(Ok(_))
        );
        arrived
    }

    /// Wait until the task reaches `state`, for at most `timeout`.
    pub async fn wait_for_state(&self, state: ControllerState, timeout: Duration) -> bool {
        let mut rx = self.shared.state.subscribe();
        let reached = matches!(
            tokio::time::timeout(timeout, rx.wait_for(|s| *s == state)).await,
            Ok(Ok(_))
        );
        reached
    }
}

/// Owner of the background waypoint task.
#[derive(Debug)]
pub struct WaypointController {
    handle: WaypointHandle,
    task: JoinHandle<()>,
}

impl WaypointController {
    /// Spawn the waypoint task in the `Idle` state.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(
        flight: Arc<dyn FlightController>,
        calibration: SharedCalibration,
        settings: ControllerSettings,
    ) -> Self {
        let shared = Arc::new(Shared::new(calibration));
        let task = tokio::spawn(run(flight, Arc::clone(&shared), settings));
        Self {
            handle: WaypointHandle { shared },
            task,
        }
    }

    /// A handle for controlling the task.
    #[must_use]
    pub fn handle(&self) -> WaypointHandle {
        self.handle.clone()
    }

    /// See [`WaypointHandle::set_target`].
    pub fn set_target(&self, tile: usize) {
        self.handle.set_target(tile);
    }

    /// See [`WaypointHandle::arrived`].
    #[must_use]
    pub fn arrived(&self, tile: usize, epsilon: f64) -> bool {
        self.handle.arrived(tile, epsilon)
    }

    /// Shut the task down, landing first if it is armed.
    ///
    /// # Errors
    ///
    /// Returns an error if the task panicked.
    pub async fn stop(self) -> Result<()> {
        self.handle.shared.shutdown.send_replace(true);
        self.task
            .await
            .map_err(|e| Error::internal(format!("waypoint task failed: {e}")))
    }
}

async fn run(flight: Arc<dyn FlightController>, shared: Arc<Shared>, settings: ControllerSettings) {
    let mut armed_rx = shared.armed.subscribe();
    let mut shutdown_rx = shared.shutdown.subscribe();
    debug!(uri = %settings.uri, "Waypoint task started");

    loop {
        if *shutdown_rx.borrow_and_update() {
            break;
        }
        if !*armed_rx.borrow_and_update() {
            tokio::select! {
                _ = armed_rx.changed() => {}
                _ = shutdown_rx.changed() => {}
            }
            continue;
        }

        shared.set_state(ControllerState::Armed);
        fly(flight.as_ref(), &shared, &settings).await;

        if let Err(e) = flight.land().await {
            warn!("Landing command failed: {e}");
        }
        shared.set_state(ControllerState::Idle);
    }

    shared.set_state(ControllerState::Stopped);
    debug!("Waypoint task stopped");
}

async fn fly(flight: &dyn FlightController, shared: &Shared, settings: &ControllerSettings) {
    let mut linked = false;

    while *shared.armed.borrow() && !*shared.shutdown.borrow() {
        if !linked {
            match flight.connect(&settings.uri).await {
                Ok(()) => {
                    info!(uri = %settings.uri, "Flight link up");
                    linked = true;
                }
                Err(e) => warn!("Flight link unavailable, retrying: {e}"),
            }
        }

        if linked {
            match step(flight, shared, settings).await {
                Ok(()) => {}
                Err(Error::NotCalibrated { tile }) => {
                    warn!(tile, "Target tile is not calibrated, skipping");
                }
                Err(Error::ConnectionFailure(e)) => {
                    warn!("Flight link failed, reconnecting: {e}");
                    linked = false;
                }
                Err(e) => warn!("Waypoint iteration failed: {e}"),
            }
        }

        tokio::time::sleep(settings.poll_interval).await;
    }
}

async fn step(
    flight: &dyn FlightController,
    shared: &Shared,
    settings: &ControllerSettings,
) -> Result<()> {
    let target = *shared.target.borrow();
    let Some(tile) = target else {
        trace!("No target yet");
        return Ok(());
    };
    let coordinate = shared.lookup(tile)?;

    let position = flight.telemetry().await?;
    shared.position.send_replace(Some(position));
    if shared.arrived(tile, settings.arrival_epsilon) {
        shared.arrival.send_if_modified(|arrival| {
            let fresh = *arrival != Some(tile);
            *arrival = Some(tile);
            fresh
        });
    }

    let setpoint = coordinate.at_altitude(settings.hold_altitude);
    trace!(tile, %position, %setpoint, "Commanding waypoint");
    flight.go_to(setpoint, settings.velocity).await?;
    Ok(())
}
