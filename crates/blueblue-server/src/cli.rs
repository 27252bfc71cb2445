//! CLI argument definitions using clap.

use std::path::PathBuf;
use std::time::Duration;

use blueblue_core::Config;
use clap::Parser;

/// blueblue - live view of nearby Bluetooth LE devices over HTTP
#[derive(Parser, Debug, Default)]
#[command(name = "blueblue")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Scan window duration, e.g. `5s`, `500ms`, `1m` or plain seconds
    #[arg(short = 'd', long = "duration", value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Port the HTTP server listens on
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Directory holding the page templates and static assets
    #[arg(long = "dir")]
    pub dir: Option<PathBuf>,

    /// Interface to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Configuration file (TOML)
    #[arg(short = 'c', long, env = "BLUEBLUE_CONFIG")]
    pub config: Option<PathBuf>,

    /// File that log output is appended to
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Drop stale devices from memory instead of only hiding them
    #[arg(long)]
    pub evict_stale: bool,

    /// Use simulated advertisements instead of the Bluetooth adapter
    #[arg(long)]
    pub simulate: bool,

    /// Start scanning immediately instead of waiting for `/start`
    #[arg(long)]
    pub autostart: bool,
}

impl Cli {
    /// Apply command-line overrides on top of file/environment configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(duration) = self.duration {
            config.scan.window_secs = duration.as_secs_f64();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.dir {
            config.server.public_dir = Some(dir.clone());
        }
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(log_file) = &self.log_file {
            config.logging.file.clone_from(log_file);
        }
        if self.evict_stale {
            config.scan.evict_stale = true;
        }
    }
}

/// Parse `1500ms`, `5s`, `2m`, `1h` or a bare (possibly fractional) number of seconds.
fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    let split = input
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(input.len());
    let (number, unit) = input.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid duration '{input}'"))?;
    let seconds = match unit.trim() {
        "" | "s" => value,
        "ms" => value / 1000.0,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        other => return Err(format!("unknown duration unit '{other}' (use ms, s, m or h)")),
    };

    Duration::try_from_secs_f64(seconds).map_err(|e| format!("invalid duration '{input}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("5s"), Ok(Duration::from_secs(5)));
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_duration("10"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("2.5"), Ok(Duration::from_millis(2500)));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("5 fortnights").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn test_flags_parse_like_the_classic_cli() {
        let cli = Cli::try_parse_from(["blueblue", "-d", "2s", "-p", "8080", "--dir", "/srv/www"])
            .unwrap();
        assert_eq!(cli.duration, Some(Duration::from_secs(2)));
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.dir, Some(PathBuf::from("/srv/www")));
        assert!(!cli.simulate);
    }

    #[test]
    fn test_apply_overrides_config() {
        let cli = Cli {
            duration: Some(Duration::from_millis(1500)),
            port: Some(9000),
            dir: Some(PathBuf::from("assets")),
            evict_stale: true,
            ..Cli::default()
        };
        let mut config = Config::default();
        cli.apply(&mut config);

        assert!((config.scan.window_secs - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.public_dir, Some(PathBuf::from("assets")));
        assert!(config.scan.evict_stale);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_no_flags_leave_config_untouched() {
        let cli = Cli::try_parse_from(["blueblue"]).unwrap();
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config, Config::default());
    }
}
