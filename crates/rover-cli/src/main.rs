//! `rover-cli` – Rover Perception Command Line Interface
//!
//! This binary drives the perception stack against a simulated camera or
//! image files.  It:
//!
//! 1. Loads `~/.rover/config.toml`, writing the defaults on first run.
//! 2. Optionally runs one perception step on `--frame <path>`.
//! 3. Drops the user into an **interactive REPL** with slash-commands
//!    (`/step`, `/pose`, `/map`, `/nav`, `/save`, `/help`).
//! 4. Intercepts **Ctrl-C** to stop any running step batch and exit.

mod config;
mod frame_io;
mod repl;

use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, warn};

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG selects the filter (default "info"); ROVER_LOG_FORMAT=json
    // switches to newline-delimited JSON.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("ROVER_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => first_run(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    let mut session = match repl::Session::new(cfg) {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "perception pipeline could not be built");
            println!("{}: {}", "Invalid perception settings".red(), e);
            std::process::exit(1);
        }
    };

    // ── One-shot frame ────────────────────────────────────────────────────
    if let Some(path) = frame_arg(std::env::args().skip(1)) {
        println!("\n  Processing {} …", path.display().to_string().bold());
        match session.step_file(&path) {
            Ok(report) => repl::print_report(&report),
            Err(e) => println!("{}: {}", "Frame error".red(), e),
        }
    }

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(&mut session, shutdown);
}

/// Write the defaults to `~/.rover/config.toml` and return them.
fn first_run() -> config::Config {
    let mut cfg = config::Config::default();
    println!("  No configuration found; writing defaults.");
    match config::save(&cfg) {
        Ok(()) => println!(
            "  {} Config saved to {}",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    config::apply_env_overrides(&mut cfg);
    cfg
}

/// Extract `--frame <path>` from the command-line arguments.
fn frame_arg(mut args: impl Iterator<Item = String>) -> Option<PathBuf> {
    while let Some(arg) = args.next() {
        if arg == "--frame" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--frame=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"    ____                        "#.bold().cyan());
    println!("{}", r#"   / __ \____ _   _____  _____  "#.bold().cyan());
    println!("{}", r#"  / /_/ / __ \ | / / _ \/ ___/  "#.bold().cyan());
    println!("{}", r#" / _, _/ /_/ / |/ /  __/ /      "#.bold().cyan());
    println!("{}", r#"/_/ |_|\____/|___/\___/_/       "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Rover".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Terrain perception and mapping");
    println!();
}
