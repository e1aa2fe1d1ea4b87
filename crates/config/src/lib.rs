//! Configuration loading, validation, and management for Guardfleet.
//!
//! Loads configuration from `./guardfleet.toml` or
//! `~/.guardfleet/config.toml` with environment variable overrides, and the
//! two line-delimited identity lists (bosses and pre-seeded targets).
//! Validates all settings at startup.

use guardfleet_core::{ArmorStrategy, BossList, TargetList};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Game server the agents connect to
    #[serde(default)]
    pub server: ServerConfig,

    /// Supervisor settings
    #[serde(default)]
    pub fleet: FleetConfig,

    /// Per-agent decision engine tuning
    #[serde(default)]
    pub agent: AgentSettings,

    /// Identity list locations
    #[serde(default)]
    pub lists: ListsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    25565
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// How agents are hosted by the supervisor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LauncherKind {
    /// One OS process per agent (default)
    #[default]
    Process,
    /// One tokio task per agent inside the supervisor
    Task,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Agents spawned when the supervisor starts
    #[serde(default = "default_auto_spawn")]
    pub auto_spawn: u32,

    /// Pause between consecutive spawns, to avoid connection storms
    #[serde(default = "default_spawn_delay_ms")]
    pub spawn_delay_ms: u64,

    /// Liveness poll period
    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,

    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,

    #[serde(default)]
    pub launcher: LauncherKind,

    #[serde(default)]
    pub restart: RestartConfig,
}

fn default_auto_spawn() -> u32 {
    5
}
fn default_spawn_delay_ms() -> u64 {
    5000
}
fn default_monitor_interval_secs() -> u64 {
    10
}
fn default_name_prefix() -> String {
    "guard_".into()
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            auto_spawn: default_auto_spawn(),
            spawn_delay_ms: default_spawn_delay_ms(),
            monitor_interval_secs: default_monitor_interval_secs(),
            name_prefix: default_name_prefix(),
            launcher: LauncherKind::default(),
            restart: RestartConfig::default(),
        }
    }
}

/// Respawn backoff. The first restart of a stable agent is immediate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartConfig {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Restarts within this window count towards `max_restarts`; an agent
    /// that stays up this long has its backoff reset
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
}

fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    30_000
}
fn default_window_secs() -> u64 {
    60
}
fn default_max_restarts() -> u32 {
    5
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            window_secs: default_window_secs(),
            max_restarts: default_max_restarts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Eat when hunger drops to this level
    #[serde(default = "default_hunger_limit")]
    pub hunger_limit: u32,

    /// Threats closer than this to the agent are engaged
    #[serde(default = "default_agent_radius")]
    pub agent_radius: f64,

    /// Threats closer than this to the protected target are engaged
    #[serde(default = "default_guard_radius")]
    pub guard_radius: f64,

    /// Search radius when attributing damage
    #[serde(default = "default_attacker_radius")]
    pub attacker_radius: f64,

    /// Goal range around the agent used for arrival estimates
    #[serde(default = "default_approach_range")]
    pub approach_range: f64,

    #[serde(default = "default_melee_range")]
    pub melee_range: f64,

    /// Seconds needed to draw a bow
    #[serde(default = "default_draw_time")]
    pub draw_time: f64,

    /// Path cost units covered per second
    #[serde(default = "default_speed")]
    pub speed: f64,

    #[serde(default = "default_follow_min")]
    pub follow_min: u32,

    #[serde(default = "default_follow_max")]
    pub follow_max: u32,

    /// Ticks between boss searches during bootstrap
    #[serde(default = "default_search_interval_ticks")]
    pub search_interval_ticks: u32,

    #[serde(default)]
    pub armor_strategy: ArmorStrategy,

    /// Chat line sent once after spawning (empty = silent)
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_hunger_limit() -> u32 {
    5
}
fn default_agent_radius() -> f64 {
    8.0
}
fn default_guard_radius() -> f64 {
    16.0
}
fn default_attacker_radius() -> f64 {
    5.0
}
fn default_approach_range() -> f64 {
    4.0
}
fn default_melee_range() -> f64 {
    6.0
}
fn default_draw_time() -> f64 {
    4.0
}
fn default_speed() -> f64 {
    1.0
}
fn default_follow_min() -> u32 {
    4
}
fn default_follow_max() -> u32 {
    10
}
fn default_search_interval_ticks() -> u32 {
    5
}
fn default_greeting() -> String {
    "I'm a robot.".into()
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            hunger_limit: default_hunger_limit(),
            agent_radius: default_agent_radius(),
            guard_radius: default_guard_radius(),
            attacker_radius: default_attacker_radius(),
            approach_range: default_approach_range(),
            melee_range: default_melee_range(),
            draw_time: default_draw_time(),
            speed: default_speed(),
            follow_min: default_follow_min(),
            follow_max: default_follow_max(),
            search_interval_ticks: default_search_interval_ticks(),
            armor_strategy: ArmorStrategy::default(),
            greeting: default_greeting(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListsConfig {
    /// Authorized identities, one per line
    #[serde(default = "default_bosses_path")]
    pub bosses: PathBuf,

    /// Pre-seeded hostile identities, one per line
    #[serde(default = "default_targets_path")]
    pub targets: PathBuf,
}

fn default_bosses_path() -> PathBuf {
    PathBuf::from("boss-list.txt")
}
fn default_targets_path() -> PathBuf {
    PathBuf::from("target-list.txt")
}

impl Default for ListsConfig {
    fn default() -> Self {
        Self {
            bosses: default_bosses_path(),
            targets: default_targets_path(),
        }
    }
}

impl ListsConfig {
    pub fn load_bosses(&self) -> Result<BossList, ConfigError> {
        Ok(BossList::new(load_identity_list(&self.bosses)?))
    }

    pub fn load_targets(&self) -> Result<TargetList, ConfigError> {
        Ok(TargetList::seeded(load_identity_list(&self.targets)?))
    }
}

/// Read a line-delimited identity list.
///
/// Lines are trimmed and blank lines skipped. A missing file is an empty list.
pub fn load_identity_list(path: &Path) -> Result<Vec<String>, ConfigError> {
    if !path.exists() {
        tracing::warn!("No identity list at {}, treating as empty", path.display());
        return Ok(vec![]);
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

impl AppConfig {
    /// Load configuration from `./guardfleet.toml`, falling back to
    /// `~/.guardfleet/config.toml`.
    ///
    /// Environment overrides (highest priority):
    /// - `GUARDFLEET_HOST`
    /// - `GUARDFLEET_PORT`
    pub fn load() -> Result<Self, ConfigError> {
        let local = PathBuf::from("guardfleet.toml");
        let path = if local.exists() {
            local
        } else {
            Self::config_dir().join("config.toml")
        };
        let mut config = Self::load_from(&path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `GUARDFLEET_*` overrides looked up through `var`.
    fn apply_env<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("GUARDFLEET_HOST") {
            self.server.host = host;
        }

        if let Some(port) = var("GUARDFLEET_PORT") {
            self.server.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("GUARDFLEET_PORT is not a port: {port}"))
            })?;
        }

        Ok(())
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".guardfleet")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::ValidationError("server.host must not be empty".into()));
        }
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError("server.port must be > 0".into()));
        }

        let agent = &self.agent;
        for (name, value) in [
            ("agent_radius", agent.agent_radius),
            ("guard_radius", agent.guard_radius),
            ("attacker_radius", agent.attacker_radius),
            ("approach_range", agent.approach_range),
            ("melee_range", agent.melee_range),
            ("speed", agent.speed),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "agent.{name} must be > 0"
                )));
            }
        }

        if agent.draw_time < 0.0 {
            return Err(ConfigError::ValidationError(
                "agent.draw_time must be >= 0".into(),
            ));
        }

        if agent.follow_min > agent.follow_max {
            return Err(ConfigError::ValidationError(
                "agent.follow_min must not exceed agent.follow_max".into(),
            ));
        }

        let restart = &self.fleet.restart;
        if restart.base_delay_ms > restart.max_delay_ms {
            return Err(ConfigError::ValidationError(
                "fleet.restart.base_delay_ms must not exceed max_delay_ms".into(),
            ));
        }

        if self.fleet.monitor_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "fleet.monitor_interval_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 25565);
        assert_eq!(config.fleet.spawn_delay_ms, 5000);
        assert_eq!(config.fleet.monitor_interval_secs, 10);
        assert_eq!(config.agent.hunger_limit, 5);
        assert_eq!(config.agent.draw_time, 4.0);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.host, config.server.host);
        assert_eq!(parsed.agent.armor_strategy, ArmorStrategy::Sequential);
        assert_eq!(parsed.fleet.launcher, LauncherKind::Process);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let toml_str = r#"
[agent]
speed = 4.3
armor_strategy = "concurrent"

[fleet]
launcher = "task"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.agent.speed, 4.3);
        assert_eq!(config.agent.armor_strategy, ArmorStrategy::Concurrent);
        assert_eq!(config.agent.guard_radius, 16.0);
        assert_eq!(config.fleet.launcher, LauncherKind::Task);
        assert_eq!(config.fleet.auto_spawn, 5);
    }

    #[test]
    fn inverted_follow_range_rejected() {
        let mut config = AppConfig::default();
        config.agent.follow_min = 12;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_speed_rejected() {
        let mut config = AppConfig::default();
        config.agent.speed = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_draw_time_rejected() {
        let mut config = AppConfig::default();
        config.agent.draw_time = -1.0;
        assert!(config.validate().is_err());

        config.agent.draw_time = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_are_applied_then_validated() {
        let mut config = AppConfig::default();
        config
            .apply_env(|key| match key {
                "GUARDFLEET_HOST" => Some("10.0.0.7".into()),
                "GUARDFLEET_PORT" => Some("25570".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.server.host, "10.0.0.7");
        assert_eq!(config.server.port, 25570);
        assert!(config.validate().is_ok());

        let mut blank = AppConfig::default();
        blank
            .apply_env(|key| (key == "GUARDFLEET_HOST").then(String::new))
            .unwrap();
        assert!(blank.validate().is_err());

        let mut bad_port = AppConfig::default();
        assert!(
            bad_port
                .apply_env(|key| (key == "GUARDFLEET_PORT").then(|| "lots".to_string()))
                .is_err()
        );
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/guardfleet.toml")).unwrap();
        assert_eq!(config.fleet.name_prefix, "guard_");
    }

    #[test]
    fn identity_list_trims_and_skips_blanks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Alice\r\n\r\n  Bob  \nCarol").unwrap();

        let names = load_identity_list(file.path()).unwrap();
        assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
    }

    #[test]
    fn missing_identity_list_is_empty() {
        let lists = ListsConfig {
            bosses: PathBuf::from("/nonexistent/boss-list.txt"),
            targets: PathBuf::from("/nonexistent/target-list.txt"),
        };
        assert!(lists.load_bosses().unwrap().is_empty());
        assert!(lists.load_targets().unwrap().is_empty());
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("25565"));
        assert!(toml_str.contains("boss-list.txt"));
    }
}
