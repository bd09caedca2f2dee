//! REPL – Read-Eval-Print Loop for the rover perception shell.
//!
//! Supported slash-commands:
//!   /help              – show this list
//!   /pose x y yaw      – set the rover pose
//!   /step [n]          – capture from the sim camera and run n perception steps
//!   /frame <path>      – run one step on a PNG/JPEG frame
//!   /map               – world map statistics
//!   /nav               – navigation angle and target summary
//!   /save <path>       – write a JSON snapshot of the map
//!   /reset             – clear the map and return to the start pose
//!   /config            – print the effective configuration
//!   /quit | /exit      – exit the CLI

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use rover_hal::{Camera, Scene, SimCamera};
use rover_hal::sim::SAMPLE_ROCK;
use rover_perception::world_map::{MapSnapshot, MapStats};
use rover_perception::{Channel, ColorThresholdClassifier, FrameReport, PerceptionPipeline, RoverState};
use rover_types::{Frame, GridCell, PerceptionError, Pose};

use crate::config::{self, Config};
use crate::frame_io;

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Pose(Pose),
    Step(usize),
    Frame(PathBuf),
    Map,
    Nav,
    Save(PathBuf),
    Reset,
    Config,
    Quit,
}

impl Command {
    /// Parse one input line. Errors are user-facing messages.
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let head = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        let path_arg = |name: &str| match args.as_slice() {
            [p] => Ok(PathBuf::from(p)),
            _ => Err(format!("usage: {name} <path>")),
        };

        match head {
            "/help" => Ok(Command::Help),
            "/pose" => {
                let joined = args.join(",");
                config::parse_list::<f64, 3>(&joined)
                    .map(|[x, y, yaw]| Command::Pose(Pose::new(x, y, yaw)))
                    .ok_or_else(|| "usage: /pose <x> <y> <yaw>".to_string())
            }
            "/step" => match args.as_slice() {
                [] => Ok(Command::Step(1)),
                [n] => n
                    .parse::<usize>()
                    .ok()
                    .filter(|&n| n > 0)
                    .map(Command::Step)
                    .ok_or_else(|| "usage: /step [n], n ≥ 1".to_string()),
                _ => Err("usage: /step [n]".to_string()),
            },
            "/frame" => path_arg("/frame").map(Command::Frame),
            "/save" => path_arg("/save").map(Command::Save),
            "/map" => Ok(Command::Map),
            "/nav" => Ok(Command::Nav),
            "/reset" => Ok(Command::Reset),
            "/config" => Ok(Command::Config),
            "/quit" | "/exit" => Ok(Command::Quit),
            other => Err(format!("Unknown command: '{other}'")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// JSON document written by `/save`.
#[derive(Debug, Serialize)]
pub struct Snapshot {
    pub captured_at: DateTime<Utc>,
    pub pose: Pose,
    pub stats: MapStats,
    pub target_location: Option<GridCell>,
    pub map: MapSnapshot,
}

/// Pipeline, simulated camera and rover state for one CLI run.
pub struct Session {
    config: Config,
    pipeline: PerceptionPipeline<ColorThresholdClassifier>,
    camera: SimCamera,
    state: RoverState,
    frames: u64,
}

impl Session {
    pub fn new(config: Config) -> Result<Self, PerceptionError> {
        let perception = &config.perception;
        let pipeline = PerceptionPipeline::new(
            perception,
            ColorThresholdClassifier::new(perception.thresholds),
        )?;

        let scene = config
            .sim
            .rocks
            .iter()
            .fold(
                Scene::clearing(perception.frame_width, perception.frame_height),
                |scene, rock| scene.disc(rock.col, rock.row, rock.radius, SAMPLE_ROCK),
            )
            .into_frame();
        let camera = SimCamera::new(
            config.sim.camera_id.clone(),
            pipeline.rectifier().clone(),
            scene,
        );
        let state = RoverState::for_config(perception, config.sim.pose);

        Ok(Self {
            config,
            pipeline,
            camera,
            state,
            frames: 0,
        })
    }

    pub fn state(&self) -> &RoverState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.state.pose = pose;
    }

    /// Capture from the simulated camera and run one perception step.
    pub fn step_sim(&mut self) -> Result<FrameReport, PerceptionError> {
        let frame = self.camera.capture()?;
        Ok(self.step(&frame))
    }

    /// Load an image file and run one perception step on it.
    pub fn step_file(&mut self, path: &Path) -> Result<FrameReport, PerceptionError> {
        let p = &self.config.perception;
        let frame = frame_io::load_frame(path, (p.frame_width, p.frame_height))?;
        Ok(self.step(&frame))
    }

    fn step(&mut self, frame: &Frame) -> FrameReport {
        self.frames += 1;
        self.pipeline.step(frame, &mut self.state)
    }

    /// Empty map, start pose.
    pub fn reset(&mut self) {
        self.state = RoverState::for_config(&self.config.perception, self.config.sim.pose);
        self.frames = 0;
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            captured_at: Utc::now(),
            pose: self.state.pose,
            stats: self.state.world_map.stats(),
            target_location: self.state.target_location,
            map: self.state.world_map.snapshot(),
        }
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<(), String> {
        let json = serde_json::to_string(&self.snapshot())
            .map_err(|e| format!("Failed to serialize snapshot: {}", e))?;
        std::fs::write(path, json)
            .map_err(|e| format!("Failed to write snapshot at {}: {}", path.display(), e))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loop
// ─────────────────────────────────────────────────────────────────────────────

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(session: &mut Session, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "rover>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let cmd = match Command::parse(line) {
            Ok(cmd) => cmd,
            Err(msg) => {
                println!("{}. Type {} for available commands.", msg.red(), "/help".bold());
                continue;
            }
        };

        match cmd {
            Command::Help => cmd_help(),
            Command::Pose(pose) => {
                session.set_pose(pose);
                println!("  Pose set to {}", fmt_pose(&pose).bold());
            }
            Command::Step(n) => cmd_step(session, n, &shutdown),
            Command::Frame(path) => match session.step_file(&path) {
                Ok(report) => print_report(&report),
                Err(e) => println!("{}: {}", "Frame error".red(), e),
            },
            Command::Map => cmd_map(session),
            Command::Nav => cmd_nav(session),
            Command::Save(path) => match session.save_snapshot(&path) {
                Ok(()) => println!("{} {}", "✓ Snapshot written to".green(), path.display().to_string().bold()),
                Err(e) => println!("{}", e.red()),
            },
            Command::Reset => {
                session.reset();
                println!("{}", "✓ Map cleared, rover returned to start pose.".green());
            }
            Command::Config => match toml::to_string_pretty(session.config()) {
                Ok(raw) => println!("{}", raw),
                Err(e) => println!("{}: {}", "Error rendering config".red(), e),
            },
            Command::Quit => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "Rover Commands".bold().underline());
    println!("  {}  – set the rover pose (cells, cells, degrees)", "/pose x y yaw".bold().cyan());
    println!("  {}      – run n steps on the simulated camera", "/step [n]".bold().cyan());
    println!("  {}  – run one step on a PNG/JPEG frame", "/frame <path>".bold().cyan());
    println!("  {}           – world map statistics", "/map".bold().cyan());
    println!("  {}           – navigation summary", "/nav".bold().cyan());
    println!("  {}   – write a JSON map snapshot", "/save <path>".bold().cyan());
    println!("  {}         – clear the map", "/reset".bold().cyan());
    println!("  {}        – print the effective configuration", "/config".bold().cyan());
    println!("  {}   – exit the CLI", "/quit  /exit".bold().cyan());
    println!();
}

fn cmd_step(session: &mut Session, n: usize, shutdown: &AtomicBool) {
    for i in 0..n {
        if shutdown.load(Ordering::SeqCst) {
            warn!(completed = i, requested = n, "step batch interrupted");
            break;
        }
        match session.step_sim() {
            Ok(report) if i + 1 == n => print_report(&report),
            Ok(_) => {}
            Err(e) => {
                println!("{}: {}", "Capture error".red(), e);
                return;
            }
        }
    }
    info!(frames = session.frames, "sim steps complete");
}

fn cmd_map(session: &Session) {
    let stats = session.state().world_map.stats();
    let size = session.state().world_map.size();
    println!("{}", "World Map".bold().underline());
    println!("  {:<10}: {}×{}", "size", size, size);
    for channel in Channel::ALL {
        let n = stats.count(channel).to_string();
        let n = match channel {
            Channel::Obstacle => n.red(),
            Channel::Target => n.yellow(),
            Channel::Navigable => n.green(),
        };
        println!("  {:<10}: {} cells", channel, n);
    }
}

fn cmd_nav(session: &Session) {
    let state = session.state();
    println!("{}", "Navigation".bold().underline());
    println!("  Pose         : {}", fmt_pose(&state.pose));
    match state.mean_nav_angle_deg() {
        Some(deg) => println!("  Mean angle   : {:+.1}° over {} pixels", deg, state.nav_angles.len()),
        None => println!("  Mean angle   : {}", "no navigable terrain in view".dimmed()),
    }
    match state.target_location {
        Some(cell) if state.target_visible => {
            println!("  Sample rock  : {} at cell ({}, {})", "visible".yellow().bold(), cell.x, cell.y)
        }
        _ => println!("  Sample rock  : {}", "not visible".dimmed()),
    }
}

pub fn print_report(report: &FrameReport) {
    println!(
        "  navigable {} px, obstacle {} px, target {} px; {} cells cleared",
        report.navigable_pixels.to_string().green(),
        report.obstacle_pixels.to_string().red(),
        report.target_pixels.to_string().yellow(),
        report.fusion.cleared_cells
    );
    if let Some(det) = &report.detection {
        println!(
            "  {} at cell ({}, {}), {:.1} px away",
            "◆ Sample rock".yellow().bold(),
            det.location.x,
            det.location.y,
            det.nearest.distance
        );
    }
    if let Some(deg) = report.mean_nav_angle_deg {
        println!("  steer {:+.1}°", deg);
    }
}

fn fmt_pose(pose: &Pose) -> String {
    format!("x={:.2} y={:.2} yaw={:.1}°", pose.x, pose.y, pose.yaw)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimSettings;

    #[test]
    fn parse_simple_commands() {
        assert_eq!(Command::parse("/help"), Ok(Command::Help));
        assert_eq!(Command::parse("/map"), Ok(Command::Map));
        assert_eq!(Command::parse("/exit"), Ok(Command::Quit));
        assert_eq!(Command::parse("/step"), Ok(Command::Step(1)));
        assert_eq!(Command::parse("/step 5"), Ok(Command::Step(5)));
    }

    #[test]
    fn parse_pose_takes_three_numbers() {
        assert_eq!(
            Command::parse("/pose 10 20.5 -90"),
            Ok(Command::Pose(Pose::new(10.0, 20.5, -90.0)))
        );
        assert!(Command::parse("/pose 10 20").is_err());
        assert!(Command::parse("/pose a b c").is_err());
    }

    #[test]
    fn parse_rejects_bad_arguments() {
        assert!(Command::parse("/step 0").is_err());
        assert!(Command::parse("/step two").is_err());
        assert!(Command::parse("/save").is_err());
        assert!(Command::parse("/fly").unwrap_err().contains("/fly"));
        assert_eq!(
            Command::parse("/frame shot.png"),
            Ok(Command::Frame(PathBuf::from("shot.png")))
        );
    }

    #[test]
    fn sim_steps_build_the_map() {
        let mut session = Session::new(Config::default()).unwrap();
        let report = session.step_sim().unwrap();
        assert!(report.navigable_pixels > 0);
        let stats = session.state().world_map.stats();
        assert!(stats.navigable_cells > 0);
        assert!(stats.obstacle_cells > 0);
    }

    #[test]
    fn reset_clears_map_and_restores_pose() {
        let mut session = Session::new(Config::default()).unwrap();
        session.set_pose(Pose::new(50.0, 50.0, 90.0));
        session.step_sim().unwrap();
        session.reset();
        assert_eq!(session.state().pose, SimSettings::default().pose);
        assert_eq!(session.state().world_map.stats(), MapStats::default());
    }

    #[test]
    fn invalid_config_fails_session() {
        let mut cfg = Config::default();
        cfg.perception.world_size = 0;
        assert!(matches!(Session::new(cfg), Err(PerceptionError::InvalidConfig(_))));
    }

    #[test]
    fn snapshot_is_written_as_json() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("map.json");
        let mut session = Session::new(Config::default()).unwrap();
        session.step_sim().unwrap();
        session.save_snapshot(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["captured_at"].is_string());
        assert_eq!(value["map"]["size"], 200);
        assert_eq!(value["map"]["navigable"].as_array().unwrap().len(), 200 * 200);
    }
}
