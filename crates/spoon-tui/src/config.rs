//! Client configuration.
//!
//! Sources, lowest precedence first: built-in defaults, the TOML file,
//! `SPOON_*` environment variables, command-line flags.
//!
//! ```toml
//! homeserver = "https://matrix.org"
//! user = "alice"
//! password = "correct horse battery staple"
//! state_file = "/home/alice/.cache/spoon/state.cbor"
//! log_file = "/home/alice/.cache/spoon/spoon.log"
//! log_level = "info"
//! cache = true
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use spoon_app::Credentials;
use thiserror::Error;

const APP_DIR: &str = "spoon";
const CONFIG_FILE: &str = "config.toml";
const STATE_FILE: &str = "state.cbor";
const LOG_FILE: &str = "spoon.log";

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("cannot read config file {path}: {reason}")]
    Read {
        /// File that was read.
        path: String,
        /// Underlying error.
        reason: String,
    },

    /// Config file is not valid TOML or has wrongly typed keys.
    #[error("invalid config file {path}: {reason}")]
    Parse {
        /// File that was parsed.
        path: String,
        /// Parser message.
        reason: String,
    },

    /// Environment variable has a value that cannot be used.
    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv {
        /// Variable name.
        name: String,
        /// Offending value.
        value: String,
    },

    /// Required setting absent from every source.
    #[error("missing required setting `{0}`")]
    Missing(String),
}

/// Merged client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Homeserver base URL.
    pub homeserver: String,
    /// Account localpart or user ID.
    pub user: Option<String>,
    /// Account password.
    pub password: Option<String>,
    /// Snapshot file. Defaults to the user cache directory.
    pub state_file: Option<PathBuf>,
    /// Log file. Defaults to the user cache directory.
    pub log_file: Option<PathBuf>,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Persist state across restarts.
    pub cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            homeserver: "https://matrix.org".into(),
            user: None,
            password: None,
            state_file: None,
            log_file: None,
            log_level: "info".into(),
            cache: true,
        }
    }
}

/// Values given on the command line. `None` leaves the setting alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// `--homeserver`
    pub homeserver: Option<String>,
    /// `--user`
    pub user: Option<String>,
    /// `--state-file`
    pub state_file: Option<PathBuf>,
    /// `--log-file`
    pub log_file: Option<PathBuf>,
    /// `--log-level`
    pub log_level: Option<String>,
    /// `--no-cache`
    pub no_cache: bool,
}

impl Config {
    /// Default config file location: `<config dir>/spoon/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load the config file.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// tried and a missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        match fs::read_to_string(&path) {
            Ok(contents) => Self::from_toml(&contents).map_err(|reason| ConfigError::Parse {
                path: path.display().to_string(),
                reason,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound && !required => Ok(Self::default()),
            Err(e) => Err(ConfigError::Read { path: path.display().to_string(), reason: e.to_string() }),
        }
    }

    /// Parse TOML config text. Absent keys keep their defaults.
    pub fn from_toml(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| e.to_string())
    }

    /// Apply `SPOON_*` variables, reading them through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = lookup("SPOON_HOMESERVER") {
            self.homeserver = v;
        }
        if let Some(v) = lookup("SPOON_USER") {
            self.user = Some(v);
        }
        if let Some(v) = lookup("SPOON_PASSWORD") {
            self.password = Some(v);
        }
        if let Some(v) = lookup("SPOON_STATE_FILE") {
            self.state_file = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("SPOON_LOG_FILE") {
            self.log_file = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("SPOON_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = lookup("SPOON_CACHE") {
            self.cache = parse_bool(&v)
                .ok_or_else(|| ConfigError::InvalidEnv { name: "SPOON_CACHE".into(), value: v.clone() })?;
        }
        Ok(())
    }

    /// Apply command-line flags.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(v) = &overrides.homeserver {
            self.homeserver.clone_from(v);
        }
        if let Some(v) = &overrides.user {
            self.user = Some(v.clone());
        }
        if let Some(v) = &overrides.state_file {
            self.state_file = Some(v.clone());
        }
        if let Some(v) = &overrides.log_file {
            self.log_file = Some(v.clone());
        }
        if let Some(v) = &overrides.log_level {
            self.log_level.clone_from(v);
        }
        if overrides.no_cache {
            self.cache = false;
        }
    }

    /// Login credentials. Fails if the user or password is missing or empty.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let username = non_empty(self.user.as_deref()).ok_or_else(|| ConfigError::Missing("user".into()))?;
        let password =
            non_empty(self.password.as_deref()).ok_or_else(|| ConfigError::Missing("password".into()))?;

        Ok(Credentials {
            homeserver: self.homeserver.trim_end_matches('/').to_owned(),
            username: username.to_owned(),
            password: password.to_owned(),
        })
    }

    /// Snapshot file location.
    pub fn state_path(&self) -> PathBuf {
        self.state_file.clone().unwrap_or_else(|| cache_file(STATE_FILE))
    }

    /// Log file location.
    pub fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| cache_file(LOG_FILE))
    }
}

fn cache_file(name: &str) -> PathBuf {
    dirs::cache_dir().map_or_else(|| PathBuf::from(format!("spoon-{name}")), |dir| dir.join(APP_DIR).join(name))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::tempdir;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::default();

        assert_eq!(config.homeserver, "https://matrix.org");
        assert!(config.cache);
        assert_eq!(config.log_level, "info");
        assert!(config.state_path().ends_with(STATE_FILE));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml("user = \"alice\"\ncache = false\n").unwrap();

        assert_eq!(config.user.as_deref(), Some("alice"));
        assert!(!config.cache);
        assert_eq!(config.homeserver, "https://matrix.org");
    }

    #[test]
    fn wrongly_typed_key_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "cache = \"sometimes\"").unwrap();

        assert!(matches!(Config::load(Some(path.as_path())), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn explicit_missing_file_is_read_error() {
        let dir = tempdir().unwrap();

        let result = Config::load(Some(dir.path().join("absent.toml").as_path()));

        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn precedence_file_then_env_then_flags() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "homeserver = \"https://file.example\"\nuser = \"file\"\npassword = \"pw\"\n").unwrap();

        let mut config = Config::load(Some(path.as_path())).unwrap();
        config
            .apply_env(env(&[("SPOON_USER", "env"), ("SPOON_HOMESERVER", "https://env.example")]))
            .unwrap();
        config.apply_overrides(&Overrides { user: Some("flag".into()), no_cache: true, ..Overrides::default() });

        assert_eq!(config.homeserver, "https://env.example");
        assert_eq!(config.user.as_deref(), Some("flag"));
        assert_eq!(config.password.as_deref(), Some("pw"));
        assert!(!config.cache);
    }

    #[test]
    fn invalid_cache_env_is_rejected() {
        let mut config = Config::default();

        let err = config.apply_env(env(&[("SPOON_CACHE", "maybe")])).unwrap_err();

        assert_eq!(err, ConfigError::InvalidEnv { name: "SPOON_CACHE".into(), value: "maybe".into() });
    }

    #[test]
    fn credentials_require_user_and_password() {
        let mut config = Config::default();
        assert_eq!(config.credentials(), Err(ConfigError::Missing("user".into())));

        config.user = Some("alice".into());
        config.password = Some("  ".into());
        assert_eq!(config.credentials(), Err(ConfigError::Missing("password".into())));

        config.password = Some("pw".into());
        config.homeserver = "https://matrix.example.org/".into();
        let credentials = config.credentials().unwrap();
        assert_eq!(credentials.homeserver, "https://matrix.example.org");
        assert_eq!(credentials.username, "alice");
    }
}
