#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! ** Reverie **
//! Retro adventure interpreter and terminal host.

use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use colored::Colorize;
use env_logger::Env;
use log::info;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use textwrap::{fill, termwidth};

use reverie_engine::audio::NullAudio;
use reverie_engine::bus::EngineEvent;
use reverie_engine::save::{active_save_dir, list_slots};
use reverie_engine::{Engine, OfflineOracle, REVERIE_VERSION, World};

/// Deterministic demo world shipped with the engine.
const DEMO_WORLD: &str = include_str!("../data/demo_world.json");

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();
    info!("Starting Reverie engine (version {REVERIE_VERSION})");

    let world = match std::env::args().nth(1) {
        Some(path) => {
            let path = PathBuf::from(path);
            World::from_file(&path).with_context(|| format!("loading world package {}", path.display()))?
        },
        None => World::from_json(DEMO_WORLD).context("loading embedded demo world")?,
    };

    let mut engine = Engine::new(world, Box::new(OfflineOracle));
    engine.attach_audio(Box::new(NullAudio));

    // clear the screen
    print!("\x1B[2J\x1B[H");
    std::io::stdout().flush().context("flushing stdout after clear")?;

    println!(
        "{:^width$}",
        engine.world().title.clone().bright_yellow().underline(),
        width = termwidth()
    );
    println!();
    println!("{}", fill(&engine.intro(), termwidth()));

    run_repl(&mut engine)
}

/// Read–eval–print loop until the player quits.
fn run_repl(engine: &mut Engine) -> Result<()> {
    let mut editor = DefaultEditor::new().context("initializing line editor")?;
    let history_path = active_save_dir().join("history.txt");
    let _ = editor.load_history(&history_path);

    loop {
        // advance the loop with real time between commands
        engine.frame(now_ms())?;
        print_bus_events(engine);

        let prompt = format!(
            "\n[Score: {} | Moves: {}]>> ",
            engine.state().score,
            engine.state().moves
        );
        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "Command canceled.".italic());
                continue;
            },
            Err(ReadlineError::Eof) => "quit".to_string(),
            Err(err) => {
                println!("{}", format!("Input error: {err}").red());
                continue;
            },
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line.as_str());

        let report = engine.submit(&line)?;
        if !report.text.is_empty() {
            println!("{}", fill(&report.text, termwidth()));
        }
        print_bus_events(engine);

        if report.should_restart && confirm(&mut editor, "Restart from the beginning? [y/N] ") {
            println!("{}", fill(&engine.new_game(), termwidth()));
            continue;
        }
        if report.should_quit && confirm(&mut editor, "Really quit? [y/N] ") {
            break;
        }
    }

    if std::fs::create_dir_all(active_save_dir()).is_ok() {
        let _ = editor.save_history(&history_path);
    }
    print_save_summary();
    Ok(())
}

fn confirm(editor: &mut DefaultEditor, prompt: &str) -> bool {
    match editor.readline(prompt) {
        Ok(answer) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

/// Surface the host events a terminal cares about.
fn print_bus_events(engine: &mut Engine) {
    for event in engine.drain_events() {
        match event {
            EngineEvent::GameEnded { ending, score, moves } => {
                println!(
                    "\n{}",
                    format!("*** The End ({ending}) -- score {score} in {moves} moves ***")
                        .bright_yellow()
                        .bold()
                );
            },
            EngineEvent::AchievementUnlocked { name, points, .. } => {
                println!("{}", format!("[achievement: {name} (+{points})]").cyan());
            },
            EngineEvent::GameFps { fps } => {
                log::debug!("fps: {fps:.1}");
            },
            _ => {},
        }
    }
}

fn print_save_summary() {
    let entries = list_slots(&active_save_dir());
    if entries.is_empty() {
        return;
    }
    println!("\nSaved games in {}:", active_save_dir().display());
    for entry in entries.iter().take(5) {
        let when = entry.timestamp.as_deref().unwrap_or("?");
        println!("  {} ({when})", entry.slot.clone().bold());
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(0))
        .unwrap_or(0)
}
