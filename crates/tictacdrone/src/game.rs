//! The game loop.
//!
//! [`Orchestrator`] owns the board and drives both actuators: it sends LED
//! commands to the indicator board and hands waypoint targets to the flight
//! task. It never touches a concrete transport or UI; those come in through
//! [`IndicatorBoard`], [`WaypointHandle`] and [`GameView`].
//!
//! Turns are strictly sequential. The human always moves first; the machine
//! answers in the same call.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::{debug, info, warn};

use crate::board::{Board, Occupant, Terminal, TILE_COUNT};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::indicator::IndicatorBoard;
use crate::protocol::{Framing, LedColor, LedCommand, WireCommand};
use crate::waypoint::WaypointHandle;

/// Receives game notifications.
pub trait GameView: Send {
    /// The board changed.
    fn on_board_changed(&mut self, board: &Board);

    /// The game ended.
    fn on_game_over(&mut self, result: Terminal);

    /// Something went wrong but the game carries on.
    fn on_error(&mut self, _error: &Error) {}
}

/// Pacing and wiring options for the game loop.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSettings {
    /// Longest wait for the vehicle to reach the machine's tile.
    pub dwell: Duration,
    /// Tile the vehicle returns to on restart.
    pub home_tile: usize,
    /// Framing used for LED commands.
    pub framing: Framing,
    /// Seed for the machine's move choice.
    pub seed: Option<u64>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for GameSettings {
    fn from(config: &Config) -> Self {
        Self {
            dwell: config.dwell(),
            home_tile: config.game.home_tile,
            framing: config.indicator.framing,
            seed: config.game.seed,
        }
    }
}

/// What happened during one call to [`Orchestrator::on_player_move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnReport {
    /// The tile the human took.
    pub player_tile: usize,
    /// The tile the machine took, if the game was still running.
    pub machine_tile: Option<usize>,
    /// Whether the vehicle reported arrival before the dwell ran out.
    pub arrived: bool,
    /// Board state after the turn.
    pub result: Terminal,
}

/// Drives one game between a human and the vehicle.
pub struct Orchestrator<V, I> {
    board: Board,
    waypoint: WaypointHandle,
    indicator: I,
    view: V,
    rng: Box<dyn RngCore + Send>,
    settings: GameSettings,
    result: Option<Terminal>,
}

impl<V: std::fmt::Debug, I: std::fmt::Debug> std::fmt::Debug for Orchestrator<V, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("board", &self.board)
            .field("indicator", &self.indicator)
            .field("view", &self.view)
            .field("settings", &self.settings)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

impl<V: GameView, I: IndicatorBoard> Orchestrator<V, I> {
    /// Create a game on an empty board.
    ///
    /// Nothing is sent until the first move or [`Orchestrator::restart`].
    pub fn new(waypoint: WaypointHandle, indicator: I, view: V, settings: GameSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            board: Board::new(),
            waypoint,
            indicator,
            view,
            rng: Box::new(rng),
            settings,
            result: None,
        }
    }

    /// Replace the random source used for the machine's moves.
    #[must_use]
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// The current board.
    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The final result, once the game has ended.
    #[must_use]
    pub fn result(&self) -> Option<Terminal> {
        self.result
    }

    /// The attached view.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// The attached indicator board.
    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    /// Play the human's move on `tile`, then the machine's reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GameOver`] once the game has ended and
    /// [`Error::InvalidMove`] for an occupied or off-board tile. The board is
    /// unchanged in both cases. LED write failures are reported to the view
    /// and do not fail the turn.
    pub async fn on_player_move(&mut self, tile: usize) -> Result<TurnReport> {
        if self.result.is_some() {
            return Err(self.reject(Error::GameOver));
        }
        debug_assert_eq!(
            self.board.count(Occupant::Player),
            self.board.count(Occupant::Machine),
            "turns must alternate"
        );

        if let Err(e) = self.board.apply_move(tile, Occupant::Player) {
            return Err(self.reject(e));
        }
        info!(tile, "Player moved");
        self.light(tile, LedColor::Player);
        self.view.on_board_changed(&self.board);

        let mut report = TurnReport {
            player_tile: tile,
            machine_tile: None,
            arrived: false,
            result: self.board.evaluate_terminal(Occupant::Player),
        };
        if report.result.is_over() {
            self.finish(report.result);
            return Ok(report);
        }

        let machine_tile = self
            .pick_machine_tile()
            .ok_or_else(|| Error::internal("no empty tile left for the machine"))?;
        self.board.apply_move(machine_tile, Occupant::Machine)?;
        info!(tile = machine_tile, "Machine moving");

        self.waypoint.set_target(machine_tile);
        report.arrived = self
            .waypoint
            .wait_for_arrival(machine_tile, self.settings.dwell)
            .await;
        if !report.arrived {
            debug!(
                tile = machine_tile,
                dwell = ?self.settings.dwell,
                "No arrival signal within dwell, assuming vehicle is in place"
            );
        }

        self.light(machine_tile, LedColor::Machine);
        self.view.on_board_changed(&self.board);

        report.machine_tile = Some(machine_tile);
        report.result = self.board.evaluate_terminal(Occupant::Machine);
        if report.result.is_over() {
            self.finish(report.result);
        }
        Ok(report)
    }

    /// Clear the board, reset the LEDs and send the vehicle home.
    pub fn restart(&mut self) {
        self.board.reset();
        self.result = None;
        self.send(LedCommand::reset_all());
        self.waypoint.set_target(self.settings.home_tile);
        info!(home = self.settings.home_tile, "Game restarted");
        self.view.on_board_changed(&self.board);
    }

    /// Uniform choice over the empty tiles by drawing from all nine and
    /// redrawing on a taken one.
    fn pick_machine_tile(&mut self) -> Option<usize> {
        if self.board.is_full() {
            return None;
        }
        loop {
            let tile = self.rng.gen_range(0..TILE_COUNT);
            if self.board.get(tile) == Some(Occupant::Empty) {
                return Some(tile);
            }
        }
    }

    fn light(&mut self, tile: usize, color: LedColor) {
        match u8::try_from(tile)
            .ok()
            .and_then(|t| LedCommand::tile(t, color).ok())
        {
            Some(command) => self.send(command),
            None => warn!(tile, "Tile has no LED"),
        }
    }

    fn send(&mut self, command: LedCommand) {
        let wire = WireCommand::led(command, self.settings.framing);
        debug!(bytes = ?wire.to_bytes(), "LED command");
        if let Err(e) = self.indicator.send(&wire) {
            warn!("Dropping LED command: {e}");
            self.view.on_error(&e);
        }
    }

    fn finish(&mut self, result: Terminal) {
        info!(?result, "Game over");
        self.result = Some(result);
        self.view.on_game_over(result);
    }

    fn reject(&mut self, error: Error) -> Error {
        warn!("Move rejected: {error}");
        self.view.on_error(&error);
        error
    }
}
