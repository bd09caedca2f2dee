//! Configuration Vault – reads/writes `~/.rover/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use rover_perception::PerceptionConfig;
use rover_types::Pose;

/// Persisted user configuration stored in `~/.rover/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub perception: PerceptionConfig,

    #[serde(default)]
    pub sim: SimSettings,
}

/// Where the simulated rover starts and what it looks at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimSettings {
    /// Identifier reported by the simulated camera.
    #[serde(default = "default_camera_id")]
    pub camera_id: String,

    /// Pose the rover starts in and returns to on `/reset`.
    #[serde(default = "default_pose")]
    pub pose: Pose,

    /// Sample rocks painted into the scene; empty for a bare clearing.
    #[serde(default = "default_rocks")]
    pub rocks: Vec<RockSettings>,
}

/// A disc in rectified-frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RockSettings {
    pub col: f64,
    pub row: f64,
    pub radius: f64,
}

fn default_camera_id() -> String {
    "front_rgb".to_string()
}
fn default_pose() -> Pose {
    Pose::new(100.0, 100.0, 0.0)
}
fn default_rocks() -> Vec<RockSettings> {
    vec![RockSettings {
        col: 135.0,
        row: 110.0,
        radius: 11.0,
    }]
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            camera_id: default_camera_id(),
            pose: default_pose(),
            rocks: default_rocks(),
        }
    }
}

/// Return the path to `~/.rover/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".rover").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `ROVER_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field | Format |
/// |---|---|---|
/// | `ROVER_WORLD_SIZE` | `perception.world_size` | `200` |
/// | `ROVER_POSE` | `sim.pose` | `x,y,yaw` |
/// | `ROVER_TARGET_WINDOW` | `perception.target_window` | `lower,upper` |
///
/// Malformed values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("ROVER_WORLD_SIZE")
        && let Ok(size) = v.trim().parse::<usize>()
    {
        cfg.perception.world_size = size;
    }
    if let Ok(v) = std::env::var("ROVER_POSE")
        && let Some([x, y, yaw]) = parse_list::<f64, 3>(&v)
    {
        cfg.sim.pose = Pose::new(x, y, yaw);
    }
    if let Ok(v) = std::env::var("ROVER_TARGET_WINDOW")
        && let Some([lower, upper]) = parse_list::<usize, 2>(&v)
    {
        cfg.perception.target_window.lower = lower;
        cfg.perception.target_window.upper = upper;
    }
}

/// Parse exactly `N` comma-separated values.
pub(crate) fn parse_list<T: std::str::FromStr + Copy + Default, const N: usize>(
    raw: &str,
) -> Option<[T; N]> {
    let mut out = [T::default(); N];
    let mut parts = raw.split(',');
    for slot in &mut out {
        *slot = parts.next()?.trim().parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

/// Save the config to disk, creating `~/.rover/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
