use crate::error::AppError;
use crate::storage::json_store;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "TODOAPP_CONFIG_PATH";

pub const DATABASE_URL_ENV_VAR: &str = "DATABASE_URL";
pub const HOST_ENV_VAR: &str = "HOST";
pub const PORT_ENV_VAR: &str = "PORT";
pub const API_URL_ENV_VAR: &str = "TODO_API_URL";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub api_url: Option<String>,
}

impl Config {
    /// Falls back to the JSON document file in the user's config directory.
    pub fn database_url(&self) -> Result<String, AppError> {
        match self.database_url.as_deref() {
            Some(url) => Ok(url.to_string()),
            None => Ok(json_store::store_path()?.display().to_string()),
        }
    }

    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub api_url: Option<String>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("todoapp")
            .join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("todoapp")
            .join(CONFIG_FILE_NAME))
    }
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

/// Layers the config file, the environment and `KEY=VALUE` flags, in
/// increasing order of precedence.
///
/// A broken config file does not fail resolution; it is reported through
/// [`ConfigLoad::error`] and defaults are used instead.
pub fn resolve_config(flag_overrides: &[String]) -> Result<ConfigLoad, AppError> {
    let loaded = load_config_with_fallback();
    let env = env_overrides(|name| std::env::var(name).ok())?;
    let flags = parse_config_overrides(flag_overrides)?;

    Ok(ConfigLoad {
        config: merge_overrides(&merge_overrides(&loaded.config, &env), &flags),
        error: loaded.error,
    })
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })
}

/// Reads overrides from environment variables through `lookup`. Blank
/// values are ignored.
pub fn env_overrides(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ConfigOverrides, AppError> {
    let read = |name: &str| {
        lookup(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let port = match read(PORT_ENV_VAR) {
        Some(raw) => Some(parse_port(&raw)?),
        None => None,
    };

    Ok(ConfigOverrides {
        database_url: read(DATABASE_URL_ENV_VAR),
        host: read(HOST_ENV_VAR),
        port,
        api_url: read(API_URL_ENV_VAR),
    })
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(database_url) = overrides.database_url.as_ref() {
        merged.database_url = Some(database_url.clone());
    }
    if let Some(host) = overrides.host.as_ref() {
        merged.host = Some(host.clone());
    }
    if let Some(port) = overrides.port {
        merged.port = Some(port);
    }
    if let Some(api_url) = overrides.api_url.as_ref() {
        merged.api_url = Some(api_url.clone());
    }
    merged
}

pub fn parse_config_overrides(raw: &[String]) -> Result<ConfigOverrides, AppError> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        apply_config_override(&mut overrides, entry)?;
    }
    Ok(overrides)
}

/// Parses one `KEY=VALUE` flag into `overrides`.
pub fn apply_config_override(overrides: &mut ConfigOverrides, raw: &str) -> Result<(), AppError> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| AppError::invalid_input("override must be in KEY=VALUE format"))?;

    let value = value_raw.trim().to_string();
    if value.is_empty() {
        return Err(AppError::invalid_input("override value cannot be empty"));
    }

    let key = canonical_key_name(key_raw)
        .ok_or_else(|| AppError::invalid_input("override key cannot be empty"))?;

    match key.as_str() {
        "database_url" | "database" | "db" => overrides.database_url = Some(value),
        "host" => overrides.host = Some(value),
        "port" => overrides.port = Some(parse_port(&value)?),
        "api_url" | "api" => overrides.api_url = Some(value),
        other => {
            return Err(AppError::invalid_input(format!(
                "unknown config field '{other}'"
            )));
        }
    }

    Ok(())
}

fn parse_port(raw: &str) -> Result<u16, AppError> {
    raw.trim()
        .parse::<u16>()
        .map_err(|_| AppError::invalid_input(format!("port must be a number, got '{raw}'")))
}

pub fn canonical_key_name(raw: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
