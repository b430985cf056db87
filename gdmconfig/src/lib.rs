//! # gdmconfig - configuration of GDMusic
//!
//! One YAML tree per installation, stored as `config.yaml` in the
//! configuration directory:
//! - the embedded `gdmusic.yaml` provides every default
//! - `config.yaml` overrides it key by key
//! - `GDMUSIC_CONFIG__SECTION__KEY=value` variables override both
//!
//! Keys are case-insensitive. Crates of the workspace read their own
//! settings through `*ConfigExt` traits implemented on [`Config`].
//!
//! ## Usage
//!
//! ```no_run
//! use gdmconfig::get_config;
//!
//! let config = get_config();
//! let level = config.get_log_min_level()?;
//! let data_dir = config.get_managed_dir(&["storage", "directory"], "data")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::{info, warn};

pub mod secrets;

const DEFAULT_CONFIG: &str = include_str!("gdmusic.yaml");

const ENV_CONFIG_DIR: &str = "GDMUSIC_CONFIG";
const ENV_PREFIX: &str = "GDMUSIC_CONFIG__";
const DEFAULT_CONFIG_DIR: &str = ".gdmusic";
const CONFIG_FILE: &str = "config.yaml";

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load GDMusic configuration"));
}

/// Configuration of a GDMusic installation
///
/// The merged YAML tree is kept behind a mutex; every setter writes the
/// whole tree back to `config.yaml`.
#[derive(Debug)]
pub struct Config {
    dir: String,
    file: PathBuf,
    data: Mutex<Value>,
}

impl Config {
    /// Loads the configuration stored in `directory`
    ///
    /// With an empty `directory`, the first of `$GDMUSIC_CONFIG`,
    /// `./.gdmusic` and `~/.gdmusic` that exists is used, `./.gdmusic` being
    /// created when none does. The merged result is saved immediately.
    pub fn load_config(directory: &str) -> Result<Self> {
        let dir = locate_dir(directory);
        fs::create_dir_all(&dir)?;
        if !Path::new(&dir).is_dir() {
            return Err(anyhow!("{} is not a directory", dir));
        }
        info!(config_dir = %dir, "Using config directory");

        let file = Path::new(&dir).join(CONFIG_FILE);
        let mut data = lowercase_keys(serde_yaml::from_str(DEFAULT_CONFIG)?);
        match fs::read(&file) {
            Ok(raw) => {
                info!(config_file = %file.display(), "Loaded config file");
                let external = lowercase_keys(serde_yaml::from_slice(&raw)?);
                merge_yaml(&mut data, &external);
            }
            Err(_) => info!(config_file = %file.display(), "No config file, using defaults"),
        }

        for (key, raw) in env::vars() {
            let Some(stripped) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let path: Vec<&str> = stripped.split("__").collect();
            let value = serde_yaml::from_str(&raw).unwrap_or(Value::String(raw.clone()));
            if let Err(e) = insert_at(&mut data, &path, value) {
                warn!(variable = %key, "Ignoring override: {}", e);
            }
        }

        let config = Config {
            dir,
            file,
            data: Mutex::new(data),
        };
        config.save()?;
        Ok(config)
    }

    /// Directory holding `config.yaml` and the managed sub-directories
    pub fn directory(&self) -> &str {
        &self.dir
    }

    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.data.lock().unwrap())?;
        fs::write(&self.file, yaml)?;
        Ok(())
    }

    /// Value at `path` (e.g. `&["drive", "page_size"]`), an error if missing
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data.lock().unwrap();
        let mut node = &*data;
        for (depth, key) in path.iter().enumerate() {
            node = node
                .as_mapping()
                .and_then(|map| map.get(Value::String(key.to_lowercase())))
                .ok_or_else(|| anyhow!("Path {} does not exist", path[..=depth].join(".")))?;
        }
        Ok(node.clone())
    }

    /// Stores `value` at `path`, creating intermediate mappings, and saves
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        insert_at(&mut self.data.lock().unwrap(), path, value)?;
        self.save()
    }

    /// String at `path`, or `default` when missing, empty or not a string
    pub fn get_string_or(&self, path: &[&str], default: &str) -> String {
        self.get_optional_string(path)
            .unwrap_or_else(|| default.to_string())
    }

    /// Non-blank string at `path`
    pub fn get_optional_string(&self, path: &[&str]) -> Option<String> {
        match self.get_value(path) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Some(s),
            _ => None,
        }
    }

    /// Unsigned integer at `path`; numeric strings are accepted
    pub fn get_u64_or(&self, path: &[&str], default: u64) -> u64 {
        match self.get_value(path) {
            Ok(Value::Number(n)) => n.as_u64().unwrap_or(default),
            Ok(Value::String(s)) => s.trim().parse().unwrap_or_else(|_| {
                warn!(path = %path.join("."), value = %s, "Invalid number, using default {}", default);
                default
            }),
            _ => default,
        }
    }

    pub fn set_u64(&self, path: &[&str], value: u64) -> Result<()> {
        self.set_value(path, Value::Number(Number::from(value)))
    }

    /// Strings of the sequence at `path`; other items are skipped
    pub fn get_string_list(&self, path: &[&str]) -> Option<Vec<String>> {
        match self.get_value(path) {
            Ok(Value::Sequence(seq)) => Some(
                seq.into_iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Directory named at `path`, relative to the configuration directory
    /// unless absolute
    ///
    /// A missing key is set to `default`. The directory is created if needed.
    ///
    /// ```no_run
    /// let config = gdmconfig::get_config();
    /// let dir = config.get_managed_dir(&["storage", "directory"], "data")?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn get_managed_dir(&self, path: &[&str], default: &str) -> Result<String> {
        let configured = match self.get_optional_string(path) {
            Some(dir) => dir,
            None => {
                self.set_value(path, Value::String(default.to_string()))?;
                default.to_string()
            }
        };

        let dir = Path::new(&self.dir).join(configured);
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            info!(directory = %dir.display(), "Created managed directory");
        }
        Ok(dir.to_string_lossy().to_string())
    }

    /// Minimum log level (`TRACE`, `DEBUG`, `INFO`, `WARN`, `ERROR`)
    pub fn get_log_min_level(&self) -> Result<String> {
        Ok(self.get_string_or(&["host", "logger", "min_level"], "INFO"))
    }

    pub fn get_log_enable_console(&self) -> Result<bool> {
        match self.get_value(&["host", "logger", "enable_console"]) {
            Ok(Value::Bool(enabled)) => Ok(enabled),
            _ => Ok(true),
        }
    }
}

/// Returns the process-wide configuration, loaded on first access
///
/// # Panics
///
/// Panics if the configuration directory cannot be created or the YAML is
/// invalid.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

fn locate_dir(directory: &str) -> String {
    if !directory.is_empty() {
        return directory.to_string();
    }
    if let Ok(dir) = env::var(ENV_CONFIG_DIR) {
        return dir;
    }
    if Path::new(DEFAULT_CONFIG_DIR).exists() {
        return DEFAULT_CONFIG_DIR.to_string();
    }
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_CONFIG_DIR))
        .filter(|dir| dir.exists())
        .map(|dir| dir.to_string_lossy().to_string())
        .unwrap_or_else(|| DEFAULT_CONFIG_DIR.to_string())
}

fn insert_at(node: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((first, rest)) = path.split_first() else {
        *node = value;
        return Ok(());
    };
    let Value::Mapping(map) = node else {
        return Err(anyhow!("{} is below a non-mapping value", path.join(".")));
    };
    let key = Value::String(first.to_lowercase());
    if rest.is_empty() {
        map.insert(key, value);
        return Ok(());
    }
    let child = map.entry(key).or_insert(Value::Mapping(Mapping::new()));
    insert_at(child, rest, value)
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let k = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (k, lowercase_keys(v))
                })
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

/// Merges `external` into `default`: mappings key by key, anything else
/// replaced
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
