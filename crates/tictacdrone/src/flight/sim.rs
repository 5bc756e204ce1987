//! In-process vehicle model used by the CLI and the tests.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, trace};

use super::{FlightController, FlightError, Position};

/// A command received by [`SimulatedFlight`].
#[derive(Debug, Clone, PartialEq)]
pub enum FlightCommand {
    /// `connect(uri)`.
    Connect(String),
    /// `go_to(target, velocity)`.
    GoTo {
        /// Commanded setpoint.
        target: Position,
        /// Commanded speed bound.
        velocity: f64,
    },
    /// `land()`.
    Land,
}

#[derive(Debug, Default)]
struct SimState {
    connected: bool,
    position: Position,
    setpoint: Option<(Position, f64)>,
    commands: Vec<FlightCommand>,
    connect_failures: u32,
    telemetry_failures: u32,
}

/// A point-mass vehicle that flies in straight lines.
///
/// Each telemetry read advances the model by one `step`: the vehicle moves
/// toward the last setpoint by at most `velocity × step`. Every command is
/// logged and failures can be injected.
#[derive(Debug)]
pub struct SimulatedFlight {
    state: Mutex<SimState>,
    step: Duration,
}

impl Default for SimulatedFlight {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedFlight {
    /// A grounded vehicle at the origin with a one second step.
    #[must_use]
    pub fn new() -> Self {
        Self::with_step(Duration::from_secs(1))
    }

    /// A vehicle whose model advances by `step` per telemetry read.
    #[must_use]
    pub fn with_step(step: Duration) -> Self {
        Self {
            state: Mutex::new(SimState::default()),
            step,
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the vehicle by hand, cancelling any setpoint.
    pub fn place(&self, position: Position) {
        let mut state = self.state();
        state.position = position;
        state.setpoint = None;
    }

    /// Current modelled position, without advancing the model.
    #[must_use]
    pub fn position(&self) -> Position {
        self.state().position
    }

    /// Whether the link is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    /// Every command received so far.
    #[must_use]
    pub fn commands(&self) -> Vec<FlightCommand> {
        self.state().commands.clone()
    }

    /// Make the next `n` connection attempts fail.
    pub fn fail_next_connects(&self, n: u32) {
        self.state().connect_failures = n;
    }

    /// Make the next `n` telemetry reads fail and drop the link.
    pub fn fail_next_telemetry(&self, n: u32) {
        self.state().telemetry_failures = n;
    }
}

#[async_trait::async_trait]
impl FlightController for SimulatedFlight {
    async fn connect(&self, uri: &str) -> Result<(), FlightError> {
        let mut state = self.state();
        state.commands.push(FlightCommand::Connect(uri.to_string()));
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(FlightError::ConnectFailed {
                uri: uri.to_string(),
                message: "simulated radio timeout".to_string(),
            });
        }
        state.connected = true;
        debug!(uri, "Simulated vehicle connected");
        Ok(())
    }

    async fn go_to(&self, target: Position, velocity: f64) -> Result<(), FlightError> {
        let mut state = self.state();
        if !state.connected {
            return Err(FlightError::NotConnected);
        }
        state.commands.push(FlightCommand::GoTo { target, velocity });
        state.setpoint = Some((target, velocity));
        Ok(())
    }

    async fn land(&self) -> Result<(), FlightError> {
        let mut state = self.state();
        if !state.connected {
            return Err(FlightError::NotConnected);
        }
        state.commands.push(FlightCommand::Land);
        state.setpoint = None;
        state.position.z = 0.0;
        Ok(())
    }

    async fn telemetry(&self) -> Result<Position, FlightError> {
        let mut state = self.state();
        if !state.connected {
            return Err(FlightError::NotConnected);
        }
        if state.telemetry_failures > 0 {
            state.telemetry_failures -= 1;
            state.connected = false;
            return Err(FlightError::LinkLost("simulated packet loss".to_string()));
        }

        if let Some((target, velocity)) = state.setpoint {
            let reach = velocity * self.step.as_secs_f64();
            let distance = state.position.distance_to(&target);
            state.position = if distance <= reach || distance == 0.0 {
                target
            } else {
                let k = reach / distance;
                Position::new(
                    state.position.x + (target.x - state.position.x) * k,
                    state.position.y + (target.y - state.position.y) * k,
                    state.position.z + (target.z - state.position.z) * k,
                )
            };
        }
        trace!(position = %state.position, "Simulated telemetry");
        Ok(state.position)
    }
}
