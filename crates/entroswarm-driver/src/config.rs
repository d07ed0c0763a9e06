//! Driver configuration
//!
//! Layered, lowest priority first: built-in defaults, an optional
//! `entroswarm.toml` (or the file named by `ENTROSWARM_CONFIG`), then
//! `ENTROSWARM__*` environment variables with `__` between sections, e.g.
//! `ENTROSWARM__SWARM__FITNESS_MODE=delta`.

use std::path::PathBuf;

use anyhow::Result;
use config::{Config, Environment, File};
use entroswarm_common::{ConfigurationError, GridLayout, BASE_STEPS, INCREMENT_STEPS};
use entroswarm_darwinian::SwarmConfig;
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "ENTROSWARM_CONFIG";

/// Config file looked up when `ENTROSWARM_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "entroswarm.toml";

const ENV_PREFIX: &str = "ENTROSWARM";
const ENV_SEPARATOR: &str = "__";

/// Entroswarm driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Cleared and recreated on every run; one folder per agent
    pub work_dir: PathBuf,
    /// Wall-clock period between rounds
    pub tick_interval_ms: u64,
    /// Stop after this many finalized rounds
    pub max_rounds: Option<u64>,
    /// Drive in-memory simulated environments instead of processes
    pub simulate: bool,
    /// Where to write the Prometheus text exposition at shutdown
    pub metrics_path: Option<PathBuf>,
    pub reference: ReferenceSettings,
    pub swarm: SwarmSettings,
    pub layout: LayoutSettings,
    pub process: ProcessSettings,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("agents"),
            tick_interval_ms: 2_000,
            max_rounds: None,
            simulate: false,
            metrics_path: None,
            reference: ReferenceSettings::default(),
            swarm: SwarmSettings::default(),
            layout: LayoutSettings::default(),
            process: ProcessSettings::default(),
        }
    }
}

impl DriverConfig {
    /// Load configuration from `.env`, the config file and the environment
    pub fn load() -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load from a specific file (missing is fine) plus the process environment
    pub fn load_from(path: &str) -> Result<Self> {
        Self::build(path, None)
    }

    /// Load from a file and an explicit set of environment variables
    pub fn load_with_env(path: &str, env: config::Map<String, String>) -> Result<Self> {
        Self::build(path, Some(env))
    }

    fn build(path: &str, env: Option<config::Map<String, String>>) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Core swarm configuration; mode strings are parsed here, once
    pub fn swarm_config(&self) -> Result<SwarmConfig, ConfigurationError> {
        let config = SwarmConfig {
            layout: self.layout.grid(),
            include_idle_agent: self.swarm.include_idle_agent,
            exploration_mode: self.swarm.exploration_mode.parse()?,
            fitness_mode: self.swarm.fitness_mode.parse()?,
            base_step_budget: self.swarm.base_step_budget,
            step_increment: self.swarm.step_increment,
            max_chunk_size: self.swarm.max_chunk_size,
            settle_delay_ms: self.swarm.settle_delay_ms,
            spawn_timeout_ms: self.swarm.spawn_timeout_ms,
            seed: self.swarm.seed,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Reference files copied into every agent folder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceSettings {
    /// Frontend executable
    pub binary: PathBuf,
    /// Ini template patched per agent
    pub ini: PathBuf,
    pub rom: PathBuf,
    /// Snapshot every agent starts from
    pub initial_snapshot: Option<PathBuf>,
    /// JSON array of `{ "value", "key" }` entries; built-in pool when unset
    pub key_pool: Option<PathBuf>,
}

impl Default for ReferenceSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("emulator/emulator"),
            ini: PathBuf::from("emulator/vba.ini"),
            rom: PathBuf::from("emulator/roms/rom.gba"),
            initial_snapshot: Some(PathBuf::from("emulator/roms/initial.sgm")),
            key_pool: None,
        }
    }
}

/// Search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmSettings {
    /// `ALL_RANDOM`, `ALL_RANDOM_NO_INNER_REPEAT` or `RANDOM_AND_ITS_REVERSE`
    pub exploration_mode: String,
    /// `max`, `min` or `delta`
    pub fitness_mode: String,
    pub include_idle_agent: bool,
    pub base_step_budget: usize,
    pub step_increment: usize,
    pub max_chunk_size: Option<usize>,
    pub settle_delay_ms: u64,
    pub spawn_timeout_ms: u64,
    pub seed: Option<u64>,
}

impl Default for SwarmSettings {
    fn default() -> Self {
        Self {
            exploration_mode: "ALL_RANDOM".to_string(),
            fitness_mode: "max".to_string(),
            include_idle_agent: false,
            base_step_budget: BASE_STEPS,
            step_increment: INCREMENT_STEPS,
            max_chunk_size: None,
            settle_delay_ms: 5_000,
            spawn_timeout_ms: 10_000,
            seed: None,
        }
    }
}

/// Window grid settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub screen_width: u32,
    pub screen_height: u32,
    pub spacing_x: u32,
    pub spacing_y: u32,
    /// Explicit grid size; derived from the screen when either is unset
    pub columns: Option<usize>,
    pub rows: Option<usize>,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            screen_width: 500,
            screen_height: 500,
            spacing_x: 245,
            spacing_y: 215,
            columns: None,
            rows: None,
        }
    }
}

impl LayoutSettings {
    pub fn grid(&self) -> GridLayout {
        match (self.columns, self.rows) {
            (Some(columns), Some(rows)) => {
                GridLayout::new(columns, rows, self.spacing_x, self.spacing_y)
            }
            _ => GridLayout::fit_screen(
                self.screen_width,
                self.screen_height,
                self.spacing_x,
                self.spacing_y,
            ),
        }
    }
}

/// Frontend process settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessSettings {
    /// Ini write-and-verify attempts before giving up
    pub configure_attempts: u32,
    pub configure_retry_delay_ms: u64,
    /// How long a save may take to land on disk
    pub persist_timeout_ms: u64,
    pub persist_poll_ms: u64,
    /// Grace period after `quit` before the child is killed
    pub shutdown_timeout_ms: u64,
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            configure_attempts: 5,
            configure_retry_delay_ms: 2_000,
            persist_timeout_ms: 5_000,
            persist_poll_ms: 50,
            shutdown_timeout_ms: 2_000,
        }
    }
}
