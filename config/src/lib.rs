//! Veilswap Configuration
//!
//! Shared configuration crate for all veilswap components.
//!
//! Handles loading configuration from:
//! 1. VS_CONFIG env var (explicit path)
//! 2. ./config.toml (current directory)
//! 3. ~/.veilswap/config.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::{env, fs};
use veilswap_account::Address;

/// Global config instance for convenience access
static GLOBAL_CONFIG: OnceLock<VeilConfig> = OnceLock::new();

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".veilswap";

// ============================================================================
// Default Constants
// ============================================================================

pub const DEFAULT_ROOT_HISTORY_SIZE: usize = 30;
pub const DEFAULT_MAX_RELAYER_FEE_BPS: u16 = 1000;
pub const DEFAULT_SCHEME_ID: u64 = 1;
const DEFAULT_DB_PATH: &str = "./veilswap-db";

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VeilConfig {
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub verifier: VerifierConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Accumulator and fee policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_root_history_size")]
    pub root_history_size: usize,
    #[serde(default = "default_max_relayer_fee_bps")]
    pub max_relayer_fee_bps: u16,
    /// Stealth announcement scheme id
    #[serde(default = "default_scheme_id")]
    pub scheme_id: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            root_history_size: DEFAULT_ROOT_HISTORY_SIZE,
            max_relayer_fee_bps: DEFAULT_MAX_RELAYER_FEE_BPS,
            scheme_id: DEFAULT_SCHEME_ID,
        }
    }
}

fn default_root_history_size() -> usize {
    DEFAULT_ROOT_HISTORY_SIZE
}
fn default_max_relayer_fee_bps() -> u16 {
    DEFAULT_MAX_RELAYER_FEE_BPS
}
fn default_scheme_id() -> u64 {
    DEFAULT_SCHEME_ID
}

/// Privileged identities and initial allowlists (hex addresses)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessConfig {
    #[serde(default)]
    pub admin: Option<String>,
    #[serde(default)]
    pub gate: Option<String>,
    #[serde(default)]
    pub relayers: Vec<String>,
    #[serde(default)]
    pub routers: Vec<String>,
}

impl AccessConfig {
    pub fn admin_address(&self) -> Result<Address> {
        parse_required("access.admin", self.admin.as_deref())
    }

    pub fn gate_address(&self) -> Result<Address> {
        parse_required("access.gate", self.gate.as_deref())
    }

    pub fn relayer_addresses(&self) -> Result<Vec<Address>> {
        parse_list("access.relayers", &self.relayers)
    }

    pub fn router_addresses(&self) -> Result<Vec<Address>> {
        parse_list("access.routers", &self.routers)
    }
}

fn parse_required(field: &str, value: Option<&str>) -> Result<Address> {
    let raw = value.with_context(|| format!("{field} is not set"))?;
    raw.parse::<Address>()
        .with_context(|| format!("invalid address in {field}: {raw}"))
}

fn parse_list(field: &str, values: &[String]) -> Result<Vec<Address>> {
    values
        .iter()
        .map(|raw| {
            raw.parse::<Address>()
                .with_context(|| format!("invalid address in {field}: {raw}"))
        })
        .collect()
}

/// Groth16 verifying key location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifierConfig {
    #[serde(default)]
    pub verifying_key_path: Option<String>,
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default)]
    pub persist: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DB_PATH.into(),
            persist: false,
        }
    }
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.into()
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set field from env var if present
fn env_string(key: &str, field: &mut String) {
    if let Ok(v) = env::var(key) {
        *field = v;
    }
}

/// Set Option<String> from env var if present
fn env_option_string(key: &str, field: &mut Option<String>) {
    if let Ok(v) = env::var(key) {
        *field = Some(v);
    }
}

/// Set field from env var if present and parseable
fn env_parse<T: std::str::FromStr>(key: &str, field: &mut T) {
    if let Ok(v) = env::var(key) {
        if let Ok(parsed) = v.parse() {
            *field = parsed;
        }
    }
}

// ============================================================================
// Implementation
// ============================================================================

impl VeilConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::read_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write this configuration as TOML
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check VS_CONFIG env var
        if let Ok(path) = env::var("VS_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check ./config.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.veilswap/config.toml
        Self::default_config_path().filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        env_option_string("VS_ADMIN", &mut self.access.admin);
        env_option_string("VS_GATE", &mut self.access.gate);
        env_string("VS_DB_PATH", &mut self.database.path);
        env_parse("VS_MAX_RELAYER_FEE_BPS", &mut self.pool.max_relayer_fee_bps);
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Render the default configuration with a header
    pub fn generate_default() -> String {
        let body = toml::to_string_pretty(&Self::default()).unwrap_or_default();
        format!(
            "# veilswap configuration\n\
             # [access] admin/gate are required hex addresses (0x...)\n\
             # env overrides: VS_ADMIN, VS_GATE, VS_DB_PATH, VS_MAX_RELAYER_FEE_BPS\n\n{body}"
        )
    }

    /// Get the global config instance, initializing it if necessary.
    ///
    /// Falls back to defaults if loading fails.
    pub fn global() -> &'static VeilConfig {
        GLOBAL_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                log::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            })
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
