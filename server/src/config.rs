//! Runtime settings read from the environment (and `.env`, loaded by `main`).
//!
//! | Variable        | Default     |
//! |-----------------|-------------|
//! | `HOST`          | `127.0.0.1` |
//! | `PORT`          | `5001`      |
//! | `DATABASE_PATH` | `todos.db`  |
//! | `RESET_DB`      | `false`     |
//! | `LOG_FORMAT`    | `text`      |

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    /// Drop and recreate the schema on startup.
    pub reset_db: bool,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5001,
            database_path: PathBuf::from("todos.db"),
            reset_db: false,
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value })?,
            None => defaults.port,
        };
        let reset_db = match lookup("RESET_DB") {
            Some(value) => {
                let flag = value.trim().to_ascii_lowercase();
                match flag.as_str() {
                    "1" | "true" | "yes" => true,
                    "0" | "false" | "no" | "" => false,
                    _ => return Err(ConfigError::Invalid { name: "RESET_DB", value }),
                }
            }
            None => defaults.reset_db,
        };
        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
            database_path: lookup("DATABASE_PATH").map(PathBuf::from).unwrap_or(defaults.database_path),
            reset_db,
            log_format,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = from(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.bind_addr(), "127.0.0.1:5001");
    }

    #[test]
    fn reads_overrides() {
        let config = from(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "8080"),
            ("DATABASE_PATH", "/tmp/x.db"),
            ("RESET_DB", "true"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.database_path, PathBuf::from("/tmp/x.db"));
        assert!(config.reset_db);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_bad_port() {
        let err = from(&[("PORT", "http")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid PORT: \"http\"");
    }

    #[test]
    fn rejects_bad_reset_flag() {
        assert!(from(&[("RESET_DB", "sometimes")]).is_err());
    }
}
