//! Application configuration management.
//!
//! Configuration is layered with the `config` crate, later sources overriding earlier ones:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A TOML file, either given explicitly or found in the platform config directory
//! 3. Environment variables prefixed `BLUEBLUE_`, nested with `__`
//!    (e.g. `BLUEBLUE_SCAN__WINDOW_SECS=2.5`, `BLUEBLUE_SERVER__PORT=8080`)
//!
//! Command-line flags are applied on top by the server binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BlueblueError, Result};

/// Default scan window length in seconds.
pub const DEFAULT_WINDOW_SECS: f64 = 5.0;

/// Default HTTP listen port.
pub const DEFAULT_PORT: u16 = 23232;

/// Longest accepted scan window, in seconds.
pub const MAX_WINDOW_SECS: f64 = 3600.0;

const ENV_PREFIX: &str = "BLUEBLUE";

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scan loop settings.
    pub scan: ScanConfig,

    /// HTTP server settings.
    pub server: ServerConfig,

    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Scan loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Length of one scan window, in seconds.
    pub window_secs: f64,

    /// Remove stale devices from the registry on each query instead of only hiding them.
    pub evict_stale: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_WINDOW_SECS,
            evict_stale: false,
        }
    }
}

impl ScanConfig {
    /// The scan window as a [`Duration`].
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs_f64(self.window_secs)
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Directory holding templates and static assets. Defaults to `./public`.
    pub public_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            public_dir: None,
        }
    }
}

impl ServerConfig {
    /// The static-assets directory, resolving the default against the working directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the working directory cannot be determined.
    pub fn resolve_public_dir(&self) -> Result<PathBuf> {
        match &self.public_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?.join("public")),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log file that every log line is appended to (in addition to stdout).
    pub file: PathBuf,

    /// Default filter directive when `RUST_LOG` is not set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("blueblue.log"),
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// When `path` is `None`, `config.toml` in the platform config directory is used if
    /// it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly given file is missing, if any source cannot be
    /// parsed, or if the merged values fail validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            ::config::Config::builder().add_source(::config::Config::try_from(&Self::default())?);

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(BlueblueError::ConfigNotFound(path.to_path_buf()));
                }
                builder = builder.add_source(::config::File::from(path).required(true));
            }
            None => {
                if let Some(default_path) = Self::default_path() {
                    builder = builder.add_source(::config::File::from(default_path).required(false));
                }
            }
        }

        let config: Self = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`BlueblueError::ConfigValidationError`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let window = self.scan.window_secs;
        if !window.is_finite() || window <= 0.0 {
            return Err(BlueblueError::ConfigValidationError(format!(
                "scan.window_secs must be positive (got {window})"
            )));
        }
        if window > MAX_WINDOW_SECS {
            return Err(BlueblueError::ConfigValidationError(format!(
                "scan.window_secs must be at most {MAX_WINDOW_SECS} (got {window})"
            )));
        }
        if self.server.port == 0 {
            return Err(BlueblueError::ConfigValidationError(
                "server.port must be non-zero".into(),
            ));
        }
        if self.server.host.trim().is_empty() {
            return Err(BlueblueError::ConfigValidationError(
                "server.host must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Platform config file location, e.g. `~/.config/blueblue/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "blueblue")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!((config.scan.window_secs - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.scan.window(), Duration::from_secs(5));
        assert!(!config.scan.evict_stale);
        assert_eq!(config.server.port, 23232);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.logging.file, PathBuf::from("blueblue.log"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_public_dir_is_under_working_directory() {
        let dir = ServerConfig::default().resolve_public_dir().unwrap();
        assert_eq!(dir, std::env::current_dir().unwrap().join("public"));
    }

    #[test]
    fn test_explicit_public_dir_wins() {
        let server = ServerConfig {
            public_dir: Some(PathBuf::from("/srv/blueblue")),
            ..ServerConfig::default()
        };
        assert_eq!(
            server.resolve_public_dir().unwrap(),
            PathBuf::from("/srv/blueblue")
        );
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[scan]\nwindow_secs = 2.5\nevict_stale = true\n\n[server]\nport = 8088\n"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();

        assert!((config.scan.window_secs - 2.5).abs() < f64::EPSILON);
        assert!(config.scan.evict_stale);
        assert_eq!(config.server.port, 8088);
        // Untouched sections keep their defaults.
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/blueblue.toml"))).unwrap_err();
        assert!(matches!(err, BlueblueError::ConfigNotFound(_)));
    }

    #[test]
    fn test_invalid_file_is_a_parse_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[scan]\nwindow_secs = \"soon\"").unwrap();

        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, BlueblueError::ConfigParseError(_)));
    }

    #[test]
    fn test_validation_rejects_bad_window() {
        let mut config = Config::default();
        config.scan.window_secs = 0.0;
        assert!(matches!(
            config.validate(),
            Err(BlueblueError::ConfigValidationError(_))
        ));

        config.scan.window_secs = f64::NAN;
        assert!(config.validate().is_err());

        config.scan.window_secs = MAX_WINDOW_SECS + 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_port_zero() {
        let mut config = Config::default();
        config.server.port = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.port"));
    }
}
