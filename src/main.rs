/// Entry point and frame loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use domain::entity::FrameInput;
use sim::level::{builtin_level, load_level_file, LevelDef};
use sim::step;
use sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::{latch_edges, take_frame, InputState};
use ui::terminal::Terminal;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() -> Result<()> {
    let config = GameConfig::load();
    init_logging(&config)?;
    for w in &config.warnings {
        warn!("{w}");
    }
    info!(version = env!("CARGO_PKG_VERSION"), "tilehop starting");

    let level = load_level(&config)?;
    let mut world = WorldState::new(level, config.sim.clone());

    let mut term = Terminal::new();
    let enhanced = term.init().context("terminal init failed")?;

    let result = game_loop(&mut world, &mut term, &config, enhanced);

    if let Err(e) = term.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    result?;

    println!("Final Score: {}", world.score);
    info!(score = world.score, "tilehop shutdown");
    Ok(())
}

/// Logs go to a file; the terminal belongs to the game.
/// `RUST_LOG` overrides the configured filter.
fn init_logging(config: &GameConfig) -> Result<()> {
    let file = File::create(&config.general.log_file)
        .with_context(|| format!("cannot create log file {}", config.general.log_file.display()))?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn load_level(config: &GameConfig) -> Result<LevelDef> {
    match &config.general.level_path {
        Some(path) => load_level_file(path)
            .with_context(|| format!("failed to load level {}", path.display())),
        None => {
            info!("no level configured, using built-in level");
            builtin_level().context("built-in level is malformed")
        }
    }
}

fn game_loop(
    world: &mut WorldState,
    term: &mut Terminal,
    config: &GameConfig,
    enhanced: bool,
) -> Result<()> {
    let mut kb = InputState::new();
    kb.honor_release = enhanced;
    let mut gp = GamepadState::new(&config.gamepad);
    if gp.connected {
        info!("gamepad detected");
    }

    let frame = Duration::from_millis(config.general.frame_ms);
    let mut last_tick = Instant::now();
    let mut pending = FrameInput::default();

    loop {
        kb.drain_events();
        gp.update();

        if kb.quit_pressed() {
            break;
        }

        let sampled = kb.sample(&gp, world.phase == Phase::Won);
        latch_edges(&mut pending, &sampled);

        if last_tick.elapsed() >= frame {
            let input = take_frame(&mut pending, &sampled);
            let events = step::step(world, input, config.general.frame_ms);
            for event in &events {
                debug!(?event, clock_ms = world.clock_ms, "game event");
            }
            last_tick = Instant::now();
        }

        term.draw(world).context("terminal draw failed")?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}
