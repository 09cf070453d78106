//! # PMOMusic Configuration Module
//!
//! This module provides configuration management for the PMOMusic playlist tools:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides
//! - Path-based getters and setters for configuration values
//! - Thread-safe singleton access pattern
//!
//! Crates that need their own settings extend [`Config`] with an extension
//! trait (`CapacityConfigExt` in `pmocapacity`, `SpotifyConfigExt` in
//! `pmospotify`) built on [`Config::get_value`].
//!
//! ## Usage
//!
//! ```no_run
//! use pmoconfig::get_config;
//!
//! let config = get_config();
//! let level = config.get_log_min_level()?;
//! config.set_value(&["playlists", "capacity"], serde_yaml::Value::from(500u64))?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Value};
use std::{
    env, fs,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{debug, info};

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("pmomusic.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load PMOMusic configuration"));
}

const ENV_CONFIG_DIR: &str = "PMOMUSIC_CONFIG";
const ENV_PREFIX: &str = "PMOMUSIC_CONFIG__";

const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";

/// Configuration manager for PMOMusic
///
/// Holds the merged YAML tree. A configuration loaded from a directory is
/// written back to `config.yaml` on every [`Config::set_value`]; one built
/// with [`Config::from_yaml_str`] lives in memory only.
///
/// # Examples
///
/// ```
/// use pmoconfig::Config;
///
/// let config = Config::from_yaml_str("playlists:\n  capacity: 50\n").unwrap();
/// assert_eq!(config.get_usize(&["playlists", "capacity"], 10_000).unwrap(), 50);
/// ```
#[derive(Debug)]
pub struct Config {
    config_dir: Option<String>,
    path: Option<String>,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        let data = match self.data.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(data),
        }
    }
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> String {
        // 1. Répertoire fourni
        if !directory.is_empty() {
            return directory.to_string();
        }

        // 2. Variable d'environnement
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return env_path;
        }

        // 3. Répertoire courant
        if Path::new(".pmomusic").exists() {
            return ".pmomusic".to_string();
        }

        // 4. Répertoire utilisateur
        if let Some(home) = home_dir() {
            let home_config = home.join(".pmomusic");
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        ".pmomusic".to_string()
    }

    /// Loads the configuration from the specified directory
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `PMOMUSIC_CONFIG` environment variable
    /// 3. `.pmomusic` in the current directory
    /// 4. `.pmomusic` in the user's home directory
    ///
    /// The embedded defaults are merged with `config.yaml` when present,
    /// keys are lower-cased, then `PMOMUSIC_CONFIG__SECTION__KEY=value`
    /// environment variables are applied on top.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::find_config_dir(directory);
        info!(config_dir = %config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let external = match fs::read(&path) {
            Ok(data) => {
                info!(config_file = %path, "Loaded config file");
                Some(serde_yaml::from_slice::<Value>(&data)?)
            }
            Err(_) => {
                info!(config_file = %path, "Config file not found, using default embedded config");
                None
            }
        };

        let data = Self::build(external.as_ref())?;

        Ok(Config {
            config_dir: Some(config_dir),
            path: Some(path),
            data: Mutex::new(data),
        })
    }

    /// Builds an in-memory configuration from a YAML document
    ///
    /// The document is merged over the embedded defaults and environment
    /// overrides are applied, exactly as [`Config::load_config`] does, but
    /// nothing is read from or written to disk.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let external: Value = serde_yaml::from_str(yaml)?;
        let data = Self::build(Some(&external))?;

        Ok(Config {
            config_dir: None,
            path: None,
            data: Mutex::new(data),
        })
    }

    fn build(external: Option<&Value>) -> Result<Value> {
        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        if let Some(external) = external {
            // un document vide se désérialise en Null
            if !external.is_null() {
                merge_yaml(&mut value, external);
            }
        }
        let mut value = Self::lower_keys_value(value);
        Self::apply_env_overrides(&mut value);
        Ok(value)
    }

    /// Directory the configuration was loaded from, if any
    pub fn config_dir(&self) -> Option<&str> {
        self.config_dir.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Value>> {
        self.data
            .lock()
            .map_err(|_| anyhow!("Configuration lock poisoned"))
    }

    /// Saves the current configuration to the config.yaml file
    ///
    /// In-memory configurations have no backing file and are left untouched.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(dir) = &self.config_dir {
            fs::create_dir_all(dir)?;
        }

        let yaml = {
            let data = self.lock()?;
            serde_yaml::to_string(&*data)?
        };
        fs::write(path, yaml)?;
        debug!(config_file = %path, "Saved configuration");
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["playlists", "capacity"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        {
            let mut data = self.lock()?;
            Self::set_value_internal(&mut data, path, value)?;
        }
        self.save()
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key_value = Value::String(path[0].to_lowercase());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    ///
    /// Returns an error if the path doesn't exist.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.lock()?;
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                if let Some(next) = map.get(&Value::String(key.to_lowercase())) {
                    current = next;
                } else {
                    return Err(anyhow!("Path {} does not exist", path[..=i].join(".")));
                }
            } else {
                return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    /// Reads a non-negative integer, falling back to `default` when the path
    /// is missing or holds something else
    ///
    /// Numbers given as strings (`"250"`) are accepted, which is what an
    /// environment override quoted by a shell script ends up as.
    pub fn get_usize(&self, path: &[&str], default: usize) -> Result<usize> {
        let value = match self.get_value(path) {
            Ok(value) => value,
            Err(_) => return Ok(default),
        };

        match value {
            Value::Number(n) => match n.as_u64() {
                Some(v) => usize::try_from(v).map_err(|_| {
                    anyhow!("{} is too large for this platform: {}", path.join("."), v)
                }),
                None => Err(anyhow!(
                    "{} must be a non-negative integer, got {}",
                    path.join("."),
                    n
                )),
            },
            Value::String(s) => s
                .trim()
                .parse::<usize>()
                .map_err(|e| anyhow!("{} is not a valid integer ({}): {}", path.join("."), s, e)),
            _ => Ok(default),
        }
    }

    /// Reads an optional string value
    ///
    /// Missing paths, `null` and empty strings all read as `None`.
    pub fn get_string(&self, path: &[&str]) -> Result<Option<String>> {
        match self.get_value(path) {
            Ok(Value::String(s)) if !s.is_empty() => Ok(Some(s)),
            Ok(Value::Number(n)) => Ok(Some(n.to_string())),
            Ok(_) | Err(_) => Ok(None),
        }
    }

    /// Minimum log level for the console subscriber
    pub fn get_log_min_level(&self) -> Result<String> {
        Ok(self
            .get_string(&["host", "logger", "min_level"])?
            .unwrap_or_else(|| DEFAULT_LOG_MIN_LEVEL.to_string()))
    }

    /// Sets the minimum log level
    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(&["host", "logger", "min_level"], Value::String(level))
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                if let Err(e) = Self::set_value_internal(config, &key_path, yaml_value) {
                    debug!(env_var = %key, error = %e, "Ignoring environment override");
                }
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        if let Ok(parsed) = serde_yaml::from_str::<Value>(value) {
            return parsed;
        }
        Value::String(value.to_string())
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    let key = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    new_map.insert(key, Self::lower_keys_value(v));
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }
}

/// Returns the global configuration instance
///
/// The configuration is loaded lazily on first access.
///
/// # Examples
///
/// ```no_run
/// use pmoconfig::get_config;
///
/// let config = get_config();
/// let level = config.get_log_min_level()?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Merges external YAML configuration into default configuration
///
/// Mappings are merged key by key; scalars and sequences from `external`
/// replace the default value.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_embedded() {
        let config = Config::from_yaml_str("{}").unwrap();
        assert_eq!(
            config.get_usize(&["playlists", "capacity"], 0).unwrap(),
            10_000
        );
        assert_eq!(config.get_log_min_level().unwrap(), "INFO");
    }

    #[test]
    fn test_external_overrides_default() {
        let config = Config::from_yaml_str("Playlists:\n  Capacity: 42\n").unwrap();
        assert_eq!(config.get_usize(&["playlists", "capacity"], 0).unwrap(), 42);
        // la section voisine reste celle par défaut
        assert_eq!(config.get_usize(&["spotify", "page_size"], 0).unwrap(), 100);
    }

    #[test]
    fn test_get_usize_fallback_and_strings() {
        let config = Config::from_yaml_str("a:\n  b: \"250\"\n  c: true\n").unwrap();
        assert_eq!(config.get_usize(&["a", "b"], 1).unwrap(), 250);
        assert_eq!(config.get_usize(&["a", "c"], 7).unwrap(), 7);
        assert_eq!(config.get_usize(&["a", "missing"], 9).unwrap(), 9);
    }

    #[test]
    fn test_large_number_is_checked() {
        let config = Config::from_yaml_str("a:\n  b: 4294967296\n").unwrap();
        let result = config.get_usize(&["a", "b"], 1);
        if usize::BITS >= 64 {
            assert_eq!(result.unwrap(), 4_294_967_296);
        } else {
            assert!(result.is_err());
        }
    }

    #[test]
    fn test_negative_number_is_rejected() {
        let config = Config::from_yaml_str("a:\n  b: -3\n").unwrap();
        assert!(config.get_usize(&["a", "b"], 1).is_err());
    }

    #[test]
    fn test_set_value_in_memory() {
        let config = Config::from_yaml_str("{}").unwrap();
        config
            .set_value(&["spotify", "access_token"], Value::String("tok".into()))
            .unwrap();
        assert_eq!(
            config.get_string(&["spotify", "access_token"]).unwrap(),
            Some("tok".to_string())
        );
    }

    #[test]
    fn test_missing_path_is_error() {
        let config = Config::from_yaml_str("{}").unwrap();
        assert!(config.get_value(&["nope", "nothing"]).is_err());
        assert_eq!(config.get_string(&["nope"]).unwrap(), None);
    }

    #[test]
    fn test_merge_yaml_replaces_scalars() {
        let mut base: Value = serde_yaml::from_str("a: 1\nb:\n  c: 2\n").unwrap();
        let ext: Value = serde_yaml::from_str("b:\n  c: 3\n  d: 4\n").unwrap();
        merge_yaml(&mut base, &ext);
        assert_eq!(Config::get_value_internal(&base, &["a"]).unwrap(), Value::from(1));
        assert_eq!(Config::get_value_internal(&base, &["b", "c"]).unwrap(), Value::from(3));
        assert_eq!(Config::get_value_internal(&base, &["b", "d"]).unwrap(), Value::from(4));
    }
}
