//! colony-runner: headless runner for the colony economy engine.
//!
//! Usage:
//!   colony-runner --seed 12345 --ticks 600 --step-ms 100 --db colony.db
//!   colony-runner --config colony.json --export save.bin
//!   colony-runner --import save.bin --ipc-mode
//!
//! Without --realtime, time is stepped by hand from the current wall-clock
//! instant, so batch runs with the same seed replay identically.

use anyhow::{Context, Result};
use colony_core::{
    clock::{SimClock, TimeSource, WallClock},
    command::PlayerCommand,
    config::SimConfig,
    engine::SimEngine,
    store::SaveStore,
    types::Millis,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Tick {
        count:   u64,
        #[serde(default)]
        step_ms: Option<Millis>,
    },
    Command {
        command: PlayerCommand,
    },
    Save,
    ListSlots,
    DeleteSlot {
        slot: String,
    },
    Export {
        path: String,
    },
    Import {
        path: String,
    },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ticks = parse_arg(&args, "--ticks", 600u64);
    let step_ms = parse_arg(&args, "--step-ms", 100.0f64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let realtime = args.iter().any(|a| a == "--realtime");
    let db = string_arg(&args, "--db").unwrap_or(":memory:");
    let export = string_arg(&args, "--export");
    let import = string_arg(&args, "--import");

    let config = match string_arg(&args, "--config") {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };

    if !ipc_mode {
        println!("colony-runner");
        println!("  seed:      {seed}");
        println!("  ticks:     {ticks}");
        println!("  step_ms:   {step_ms}");
        println!("  db:        {db}");
        println!("  slot:      {}", config.save_slot);
        println!();
    }

    let store = SaveStore::open(db)?;
    let run_id = format!("run-{seed}-{}", chrono::Utc::now().timestamp());

    let mut engine = if realtime {
        SimEngine::build(run_id.clone(), seed, store, SimClock::wall(), config)?
    } else {
        SimEngine::build_manual(run_id.clone(), seed, store, config, WallClock.now_ms())?
    };

    match import {
        Some(path) => import_file(&mut engine, path)?,
        None => {
            if engine.restore_from_store()? {
                log::info!("Restored colony from slot '{}'", engine.config().save_slot);
            }
        }
    }

    if ipc_mode {
        run_ipc_loop(&mut engine, step_ms)?;
    } else {
        engine.run_ticks(ticks, step_ms)?;
        engine.save_to_store()?;
        if let Some(path) = export {
            export_file(&engine, path)?;
        }
        print_summary(&engine, &run_id, ticks)?;
    }

    Ok(())
}

fn run_ipc_loop(engine: &mut SimEngine, default_step_ms: Millis) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let reply = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => serde_json::json!({ "state": engine.snapshot() }),
            IpcCommand::Tick { count, step_ms } => {
                engine.run_ticks(count, step_ms.unwrap_or(default_step_ms))?;
                serde_json::json!({ "state": engine.snapshot() })
            }
            IpcCommand::Command { command } => match engine.apply(command) {
                Ok(outcome) => serde_json::json!({ "outcome": outcome, "state": engine.snapshot() }),
                Err(e) => serde_json::json!({ "error": e.to_string(), "state": engine.snapshot() }),
            },
            IpcCommand::Save => {
                let save_id = engine.save_to_store()?;
                serde_json::json!({ "saved": save_id })
            }
            IpcCommand::ListSlots => serde_json::json!({ "slots": engine.store.list_slots()? }),
            IpcCommand::DeleteSlot { slot } => {
                let deleted = engine.store.delete_slot(&slot)?;
                serde_json::json!({ "slot": slot, "deleted": deleted })
            }
            IpcCommand::Export { path } => match export_file(engine, &path) {
                Ok(()) => serde_json::json!({ "exported": path }),
                Err(e) => serde_json::json!({ "error": format!("{e:#}") }),
            },
            IpcCommand::Import { path } => match import_file(engine, &path) {
                Ok(()) => serde_json::json!({ "state": engine.snapshot() }),
                Err(e) => serde_json::json!({ "error": format!("{e:#}"), "state": engine.snapshot() }),
            },
        };
        writeln!(stdout, "{}", reply)?;
        stdout.flush()?;
    }
    engine.save_to_store()?;
    Ok(())
}

fn export_file(engine: &SimEngine, path: &str) -> Result<()> {
    let bytes = engine.export_bytes()?;
    std::fs::write(path, &bytes).with_context(|| format!("Cannot write {path}"))?;
    log::info!("Exported {} bytes ({}) to {path}", bytes.len(), engine.codec_name());
    Ok(())
}

/// Plain saves start with `{`; anything else is taken as LZ4.
fn import_file(engine: &mut SimEngine, path: &str) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("Cannot read {path}"))?;
    let codec = if bytes.first() == Some(&b'{') { "plain" } else { "lz4" };
    let shifted_by = engine
        .load_bytes(&bytes, codec)
        .with_context(|| format!("Cannot import {path}"))?;
    engine.save_to_store()?;
    log::info!("Imported {path}, timestamps shifted by {shifted_by:.0}ms");
    Ok(())
}

fn print_summary(engine: &SimEngine, run_id: &str, ticks: u64) -> Result<()> {
    let s = engine.snapshot();
    let count = |event_type: &str| engine.store.event_count(run_id, event_type);

    println!("=== RUN SUMMARY ===");
    println!("  run_id:         {run_id}");
    println!("  ticks run:      {ticks}");
    println!("  final tick:     {}", engine.clock.current_tick);
    println!("  planet:         {}", s.planet_name);
    match s.population_capacity {
        Some(cap) => println!("  settlers:       {} / {cap}", s.alive_settlers),
        None => println!("  settlers:       {} (unlimited)", s.alive_settlers),
    }
    println!("  houses:         {}", s.houses);
    println!("  farms:          {}", s.farms);
    println!("  crops:          {}", s.crops);
    println!("  grains:         {} / {} (+{} in flight)", s.grains, s.grain_capacity, s.grains_in_flight);
    println!("  coins:          {} / {} (+{} in flight)", s.coins, s.coin_capacity, s.coins_in_flight);

    println!();
    println!("=== EVENTS ===");
    for event_type in ["settler_spawned", "settler_removed", "crop_grown", "grain_deposited", "coin_deposited"] {
        println!("  {event_type:<16} {}", count(event_type)?);
    }

    println!();
    println!("=== RESEARCH ===");
    if s.completed_research.is_empty() {
        println!("  (No research completed yet)");
    } else {
        for node in &s.completed_research {
            println!("  {node}");
        }
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}
