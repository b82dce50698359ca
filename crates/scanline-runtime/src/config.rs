//! # Scanner Configuration
//!
//! Configuration for the scan runtime and terminal host.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Where a value comes from                             │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     SCANLINE_STORE_ID=store-001                                         │
//! │     SCANLINE_COOLDOWN_MS=750                                            │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/scanline-pos/scanner.toml (Linux)                         │
//! │     ~/Library/Application Support/com.scanline.pos/scanner.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! │     1000 ms cooldown, 8-char manual minimum, never-aging cache          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## scanner.toml
//! ```toml
//! [device]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//! name = "Register 1"
//!
//! [store]
//! id = "store-001"
//!
//! [scanner]
//! cooldown_ms = 1000
//! mount_point = "scanner-viewport"
//! default_mode = "camera"   # camera | manual
//!
//! [manual]
//! min_length = 8
//!
//! [cache]
//! max_age_secs = 0          # 0 = only refresh on demand
//!
//! [catalog]
//! database_path = "/var/lib/scanline/catalog.db"
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use scanline_core::{ScanMode, DEFAULT_COOLDOWN_MS, DEFAULT_MIN_MANUAL_LENGTH, MAX_BARCODE_LEN};

use crate::error::ConfigError;

// =============================================================================
// Device / Store
// =============================================================================

/// Configuration for this terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Random UUID unless set in the file or `SCANLINE_DEVICE_ID`.
    pub id: String,

    /// Label shown in logs, e.g. "Register 1".
    #[serde(default = "default_device_name")]
    pub name: String,
}

fn default_device_name() -> String {
    "Scan Terminal".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            id: Uuid::new_v4().to_string(),
            name: default_device_name(),
        }
    }
}

/// The store whose catalog this terminal sells from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub id: String,

    #[serde(default)]
    pub name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            id: "store-1".to_string(),
            name: String::new(),
        }
    }
}

// =============================================================================
// Scanner / Manual / Cache / Catalog
// =============================================================================

/// Camera path settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerSettings {
    /// Ignore window after each accepted decode (milliseconds).
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Where the decoder attaches its viewport / capture stream.
    #[serde(default = "default_mount_point")]
    pub mount_point: String,

    /// Mode the scanner view opens in.
    #[serde(default)]
    pub default_mode: ScanMode,
}

fn default_cooldown_ms() -> u64 {
    DEFAULT_COOLDOWN_MS
}

fn default_mount_point() -> String {
    "scanner-viewport".to_string()
}

impl Default for ScannerSettings {
    fn default() -> Self {
        ScannerSettings {
            cooldown_ms: default_cooldown_ms(),
            mount_point: default_mount_point(),
            default_mode: ScanMode::default(),
        }
    }
}

impl ScannerSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Keypad fallback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualSettings {
    #[serde(default = "default_min_length")]
    pub min_length: usize,
}

fn default_min_length() -> usize {
    DEFAULT_MIN_MANUAL_LENGTH
}

impl Default for ManualSettings {
    fn default() -> Self {
        ManualSettings {
            min_length: default_min_length(),
        }
    }
}

/// Inventory cache settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Age after which a non-forced refresh re-fetches. 0 = never ages.
    #[serde(default)]
    pub max_age_secs: u64,
}

impl CacheSettings {
    pub fn max_age(&self) -> Option<Duration> {
        (self.max_age_secs > 0).then(|| Duration::from_secs(self.max_age_secs))
    }
}

/// Catalog source settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// SQLite catalog file. Defaults to `catalog.db` in the data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

// =============================================================================
// ScannerConfig
// =============================================================================

/// Everything the terminal reads at startup. Every section is optional in
/// the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub scanner: ScannerSettings,

    #[serde(default)]
    pub manual: ManualSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub catalog: CatalogSettings,
}

impl ScannerConfig {
    /// Defaults, then `scanner.toml` if present, then `SCANLINE_*` variables.
    /// The merged result must pass [`validate`](Self::validate).
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = match config_path.or_else(Self::default_config_path) {
            Some(path) if path.exists() => {
                info!(?path, "Reading scanner config");
                toml::from_str(&std::fs::read_to_string(&path)?)?
            }
            Some(path) => {
                debug!(?path, "No scanner config file");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load), but a broken file or bad value falls back
    /// to built-in defaults with a warning.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!(error = %e, "Scanner config rejected, using defaults");
            Self::default()
        })
    }

    /// Writes the config as TOML, creating parent directories.
    pub fn save(&self, config_path: Option<PathBuf>) -> Result<(), ConfigError> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("no config directory on this platform".into()))?;

        let write = |path: &PathBuf, body: String| -> std::io::Result<()> {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(path, body)
        };
        write(&path, toml::to_string_pretty(self)?)
            .map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        info!(?path, "Scanner config written");
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("device.id", &self.device.id),
            ("store.id", &self.store.id),
            ("scanner.mount_point", &self.scanner.mount_point),
        ];
        if let Some((key, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ConfigError::invalid(*key, "must not be empty"));
        }

        if !(1..=MAX_BARCODE_LEN).contains(&self.manual.min_length) {
            return Err(ConfigError::invalid(
                "manual.min_length",
                format!("must be between 1 and {}", MAX_BARCODE_LEN),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("SCANLINE_DEVICE_ID") {
            self.device.id = id;
        }
        if let Ok(id) = std::env::var("SCANLINE_STORE_ID") {
            debug!(store_id = %id, "Store overridden by environment");
            self.store.id = id;
        }
        if let Some(ms) = env_parse("SCANLINE_COOLDOWN_MS") {
            self.scanner.cooldown_ms = ms;
        }
        if let Some(mode) = env_parse::<ScanMode>("SCANLINE_MODE") {
            self.scanner.default_mode = mode;
        }
        if let Some(len) = env_parse("SCANLINE_MIN_MANUAL_LENGTH") {
            self.manual.min_length = len;
        }
        if let Some(secs) = env_parse("SCANLINE_CACHE_MAX_AGE_SECS") {
            self.cache.max_age_secs = secs;
        }
        if let Ok(path) = std::env::var("SCANLINE_DB_PATH") {
            self.catalog.database_path = Some(PathBuf::from(path));
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "scanline", "pos")
    }

    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("scanner.toml"))
    }

    /// Resolves the catalog database path (configured or platform default).
    pub fn database_path(&self) -> PathBuf {
        self.catalog
            .database_path
            .clone()
            .or_else(|| Self::project_dirs().map(|dirs| dirs.data_dir().join("catalog.db")))
            .unwrap_or_else(|| PathBuf::from("catalog.db"))
    }

    pub fn device_id(&self) -> &str {
        &self.device.id
    }

    pub fn store_id(&self) -> &str {
        &self.store.id
    }

    pub fn cooldown(&self) -> Duration {
        self.scanner.cooldown()
    }

    pub fn max_cache_age(&self) -> Option<Duration> {
        self.cache.max_age()
    }
}

/// Parses `SCANLINE_*` values; an unparsable value is logged and ignored.
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparsable environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScannerConfig::default();
        assert!(!config.device.id.is_empty());
        assert_eq!(config.store_id(), "store-1");
        assert_eq!(config.scanner.cooldown_ms, 1000);
        assert_eq!(config.manual.min_length, 8);
        assert_eq!(config.scanner.default_mode, ScanMode::Camera);
        assert!(config.max_cache_age().is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ScannerConfig = toml::from_str(
            r#"
            [device]
            id = "dev-1"

            [store]
            id = "store-7"

            [scanner]
            cooldown_ms = 400
            default_mode = "manual"

            [cache]
            max_age_secs = 300
            "#,
        )
        .unwrap();

        assert_eq!(config.store_id(), "store-7");
        assert_eq!(config.cooldown(), Duration::from_millis(400));
        assert_eq!(config.scanner.default_mode, ScanMode::Manual);
        assert_eq!(config.scanner.mount_point, "scanner-viewport");
        assert_eq!(config.manual.min_length, 8);
        assert_eq!(config.max_cache_age(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_config_validation() {
        let mut config = ScannerConfig::default();
        assert!(config.validate().is_ok());

        config.manual.min_length = 0;
        assert!(config.validate().is_err());

        config.manual.min_length = 8;
        config.store.id = "  ".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join(format!("scanline-missing-{}.toml", Uuid::new_v4()));
        let config = ScannerConfig::load(Some(path)).unwrap();
        assert_eq!(config.manual.min_length, 8);
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("scanline-{}.toml", Uuid::new_v4()));
        let mut config = ScannerConfig::default();
        config.store.id = "store-42".into();
        config.save(Some(path.clone())).unwrap();

        let loaded = ScannerConfig::load(Some(path.clone())).unwrap();
        assert_eq!(loaded.device.id, config.device.id);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&ScannerConfig::default()).unwrap();
        assert!(toml_str.contains("[scanner]"));
        assert!(toml_str.contains("[manual]"));
    }
}
