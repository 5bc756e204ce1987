//! `tictacdrone` - play tic-tac-toe against a quadcopter from the terminal.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;
use std::sync::{Arc, RwLock};

use anyhow::{bail, Context};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use tictacdrone::cli::{
    CalibrateCommand, CaptureInput, Cli, Command, ConfigCommand, EncodeCommand, PlayCommand,
};
use tictacdrone::indicator;
use tictacdrone::protocol::{encode_frame, LedCommand};
use tictacdrone::waypoint::ControllerSettings;
use tictacdrone::{
    init_logging, Board, CalibrationSession, CalibrationStore, Config, Coordinate, Error,
    FlightController, GameSettings, GameView, Occupant, Orchestrator, SimulatedFlight, Terminal,
    WaypointController,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Play(cmd) => play(config, cmd).await,
        Command::Calibrate(cmd) => calibrate(&config, cmd).await,
        Command::Encode(cmd) => encode(cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

/// Renders the game on stdout.
#[derive(Debug)]
struct ConsoleView;

impl GameView for ConsoleView {
    fn on_board_changed(&mut self, board: &Board) {
        println!();
        println!("{board}");
    }

    fn on_game_over(&mut self, result: Terminal) {
        match result {
            Terminal::Win {
                occupant: Occupant::Player,
                ..
            } => println!("You win! Enter r to play again."),
            Terminal::Win { .. } => println!("The drone wins. Enter r to play again."),
            Terminal::Draw => println!("Draw. Enter r to play again."),
            Terminal::Ongoing => {}
        }
    }

    fn on_error(&mut self, error: &Error) {
        eprintln!("{error}");
    }
}

async fn play(mut config: Config, cmd: PlayCommand) -> anyhow::Result<()> {
    if let Some(seed) = cmd.seed {
        config.game.seed = Some(seed);
    }
    if let Some(port) = cmd.port {
        config.indicator.port = Some(port);
    }
    if let Some(framing) = cmd.framing {
        config.indicator.framing = framing.into();
    }

    let calibration = calibration_for_sim(&config)?;
    let home = calibration.get(config.game.home_tile)?;

    let sim = Arc::new(SimulatedFlight::with_step(config.poll_interval()));
    sim.place(home.at_altitude(0.0));
    let flight: Arc<dyn FlightController> = sim;

    let controller = WaypointController::start(
        flight,
        Arc::new(RwLock::new(calibration)),
        ControllerSettings::from(&config.flight),
    );

    let leds = indicator::open_or_null(config.indicator.port.as_deref());

    let mut game = Orchestrator::new(
        controller.handle(),
        leds,
        ConsoleView,
        GameSettings::from(&config),
    );
    if !cmd.grounded {
        controller.handle().arm();
    }
    game.restart();
    println!("Enter a tile number (0-8), r to restart, q to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => {}
            "q" | "quit" => break,
            "r" | "restart" => game.restart(),
            input => match input.parse::<usize>() {
                // Rejected moves are already reported through the view.
                Ok(tile) => {
                    if let Err(e) = game.on_player_move(tile).await {
                        if !e.is_recoverable() {
                            controller.stop().await?;
                            return Err(e.into());
                        }
                    }
                }
                Err(_) => eprintln!("Not a tile: {input}"),
            },
        }
    }

    controller.stop().await?;
    Ok(())
}

/// Saved calibration, with any missing tiles filled from the simulator's
/// grid layout.
fn calibration_for_sim(config: &Config) -> anyhow::Result<CalibrationStore> {
    let path = config.calibration_path();
    let mut store = CalibrationStore::load(&path)
        .with_context(|| format!("loading calibration from {}", path.display()))?;

    let missing = store.missing();
    if !missing.is_empty() {
        warn!(
            ?missing,
            spacing = config.calibration.grid_spacing,
            "Calibration incomplete, using the simulated grid for missing tiles"
        );
        for tile in missing {
            store.record(tile, Coordinate::grid(tile, config.calibration.grid_spacing))?;
        }
    }
    Ok(store)
}

async fn calibrate(config: &Config, cmd: CalibrateCommand) -> anyhow::Result<()> {
    let path = cmd.output.unwrap_or_else(|| config.calibration_path());
    let mut store = CalibrationStore::load(&path)
        .with_context(|| format!("loading calibration from {}", path.display()))?;

    let sim = SimulatedFlight::new();
    let mut session = CalibrationSession::new(config.flight.uri.clone());

    if cmd.all {
        let spacing = config.calibration.grid_spacing;
        for tile in session.remaining() {
            sim.place(Coordinate::grid(tile, spacing).at_altitude(0.0));
            let coordinate = session.capture(tile, &sim, &mut store).await?;
            println!("Tile {tile}: {coordinate}");
        }
    } else {
        println!("Put the vehicle over a tile and enter its number to sample it.");
        println!("Enter <tile> <x> <y> to move the simulated vehicle there first, q to stop.");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while !session.is_complete() {
            println!("Remaining: {:?}", session.remaining());
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line == "q" {
                break;
            }
            let input = match line.parse::<CaptureInput>() {
                Ok(input) => input,
                Err(e) => {
                    eprintln!("{e}");
                    continue;
                }
            };
            if let Some(coordinate) = input.position {
                sim.place(coordinate.at_altitude(0.0));
            }
            match session.capture(input.tile, &sim, &mut store).await {
                Ok(coordinate) => println!("Tile {}: {coordinate}", input.tile),
                Err(e) if e.is_recoverable() => eprintln!("{e}"),
                Err(e) => return Err(e.into()),
            }
        }
    }

    save_calibration(&store, &path)?;
    if !store.is_complete() {
        println!("Still missing: {:?}", store.missing());
    }
    Ok(())
}

fn save_calibration(store: &CalibrationStore, path: &Path) -> anyhow::Result<()> {
    store
        .save(path)
        .with_context(|| format!("saving calibration to {}", path.display()))?;
    println!("Calibration saved to {}", path.display());
    Ok(())
}

fn encode(cmd: EncodeCommand) -> anyhow::Result<()> {
    match cmd {
        EncodeCommand::Led { target, color } => {
            let led = LedCommand::tile(target, color.into())?;
            let byte = led.encode();
            println!("0x{byte:02X} (0b{byte:08b})");
        }
        EncodeCommand::Frame {
            command,
            data1,
            data2,
        } => {
            let bytes = encode_frame(command, data1, data2);
            let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02X}")).collect();
            println!("{}", hex.join(" "));
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Flight]");
                println!("  URI:                {}", config.flight.uri);
                println!("  Hold altitude (m):  {}", config.flight.hold_altitude);
                println!("  Velocity (m/s):     {}", config.flight.velocity);
                println!("  Poll interval (ms): {}", config.flight.poll_interval_ms);
                println!("  Arrival epsilon:    {}", config.flight.arrival_epsilon);
                println!();
                println!("[Game]");
                println!("  Dwell (ms):         {}", config.game.dwell_ms);
                println!("  Home tile:          {}", config.game.home_tile);
                match config.game.seed {
                    Some(seed) => println!("  Seed:               {seed}"),
                    None => println!("  Seed:               random"),
                }
                println!();
                println!("[Indicator]");
                match &config.indicator.port {
                    Some(port) => println!("  Port:               {}", port.display()),
                    None => println!("  Port:               none"),
                }
                println!("  Baud rate:          {}", config.indicator.baud_rate);
                println!("  Framing:            {}", config.indicator.framing);
                println!();
                println!("[Calibration]");
                println!("  Path:               {}", config.calibration_path().display());
                println!("  Grid spacing (m):   {}", config.calibration.grid_spacing);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            if !path.exists() {
                bail!("no configuration file at {}", path.display());
            }
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
