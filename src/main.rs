//! Headless demo driver
//!
//! Runs a scripted session at the fixed timestep and reports progression at
//! save points. Useful for profiling and for eyeballing event output with
//! `RUST_LOG=debug`.

use shardstorm::consts::SIM_DT;
use shardstorm::sim::{GameState, TickInput, tick};
use shardstorm::{GameEvent, Tunables};

fn scripted_input(tick_index: u64) -> TickInput {
    TickInput {
        turn: if tick_index % 180 < 90 { 0.8 } else { -0.6 },
        thrust: tick_index % 5 != 0,
        reverse: false,
        fire: tick_index % 4 == 0,
        dash: tick_index % 240 == 120,
        pause: false,
    }
}

fn main() {
    env_logger::init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0xC0FFEE);
    let ticks: u64 = std::env::args()
        .nth(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(60 * 60 * 2);

    log::info!("seed {seed}, running {ticks} ticks");
    let mut state = GameState::new(seed, Tunables::default());

    for i in 0..ticks {
        tick(&mut state, &scripted_input(i), SIM_DT);
        for event in state.drain_events() {
            match event {
                GameEvent::LevelTransition { level } => {
                    log::info!("level {level} incoming, snapshot: {:?}", state.progression_snapshot());
                }
                GameEvent::GameOver => {
                    log::info!("game over, snapshot: {:?}", state.progression_snapshot());
                }
                other => log::debug!("{other:?}"),
            }
        }
        if matches!(state.phase, shardstorm::sim::GamePhase::GameOver) {
            break;
        }
    }

    match serde_json::to_string_pretty(&state.progression_snapshot()) {
        Ok(json) => println!("{json}"),
        Err(err) => log::error!("snapshot serialization failed: {err}"),
    }
}
