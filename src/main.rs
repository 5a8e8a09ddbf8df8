//! Plinko Board headless runner
//!
//! Drops tokens one after another on the reference solver and prints the
//! per-bin statistics as JSON.
//!
//! Usage: `plinko-board [drops] [columns] [seed]`

use plinko_board::sim::{ColumnCount, PlinkoEngine};
use plinko_board::{ConfigError, Settings};

const DEFAULT_DROPS: u32 = 100;

/// Give up on a token after two simulated minutes
const MAX_TICKS_PER_DROP: u32 = 120 * 60;

struct Args {
    drops: u32,
    columns: Option<u32>,
    seed: Option<u64>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = std::env::args().skip(1);
    let drops = match args.next() {
        Some(s) => s.parse().map_err(|_| format!("invalid drop count: {s}"))?,
        None => DEFAULT_DROPS,
    };
    let columns = match args.next() {
        Some(s) => Some(s.parse().map_err(|_| format!("invalid column count: {s}"))?),
        None => None,
    };
    let seed = match args.next() {
        Some(s) => Some(s.parse().map_err(|_| format!("invalid seed: {s}"))?),
        None => None,
    };
    Ok(Args { drops, columns, seed })
}

fn run(args: Args) -> Result<(), ConfigError> {
    let mut settings = Settings {
        seed: args.seed,
        ..Settings::default()
    };
    if let Some(columns) = args.columns {
        settings.column_count = ColumnCount::try_from(columns)?;
    }

    let mut engine = PlinkoEngine::from_settings(&settings)?;
    engine.start();
    log::info!(
        "Dropping {} tokens on a {}-column board (seed {})",
        args.drops,
        engine.column_count(),
        engine.seed()
    );

    let mut stuck = 0;
    for _ in 0..args.drops {
        engine.drop_token(None);
        if !engine.run_until_idle(MAX_TICKS_PER_DROP) {
            // Clear the stuck token so the next drop is not blocked
            stuck += 1;
            let y = engine.layout().fallback_y + 1.0;
            let handle = engine.active_token().map(|t| t.handle);
            if let Some(body) = handle.and_then(|h| engine.world_mut().body_mut(h)) {
                body.position.y = y;
            }
            engine.sweep_landed_tokens();
        }
        engine.drain_events();
    }
    engine.stop();

    if stuck > 0 {
        log::warn!("{} token(s) never reached the bottom and were swept", stuck);
    }

    let stats = engine.statistics();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    log::info!(
        "Done: {} landings, most hit bin {:?}",
        stats.total(),
        stats.most_hit()
    );
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}");
            eprintln!("usage: plinko-board [drops] [columns] [seed]");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(args) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}
