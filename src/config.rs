// Configuration file handling
//
// The rc file lives at ~/.worktime/rc and holds `key=value` lines:
//
//   data.location=./work.sqlite
//   week.days=5

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Number of days shown by `thisweek` / `lastweek` unless configured
pub const DEFAULT_WEEK_DAYS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Database file, already resolved against the rc directory
    pub data_location: Option<PathBuf>,
    /// Length of a reporting week, starting Monday
    pub week_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_location: None,
            week_days: DEFAULT_WEEK_DAYS,
        }
    }
}

impl Config {
    /// Directory holding the rc file
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to determine home directory")?;
        Ok(home.join(".worktime"))
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("rc"))
    }

    /// Load the rc file, falling back to defaults when it does not exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            log::debug!("no config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&content, base).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse rc content; relative paths are resolved against `base_dir`
    pub fn parse(content: &str, base_dir: &Path) -> Result<Self> {
        let mut config = Self::default();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                anyhow::bail!("line {}: expected key=value, got '{}'", lineno + 1, line);
            };
            let value = value.trim();
            match key.trim() {
                "data.location" => {
                    let path = PathBuf::from(value);
                    config.data_location = Some(if path.is_relative() {
                        base_dir.join(path)
                    } else {
                        path
                    });
                }
                "week.days" => {
                    let days: u32 = value
                        .parse()
                        .with_context(|| format!("line {}: week.days must be a number", lineno + 1))?;
                    if !(1..=7).contains(&days) {
                        anyhow::bail!("line {}: week.days must be between 1 and 7", lineno + 1);
                    }
                    config.week_days = days;
                }
                other => log::warn!("ignoring unknown config key '{}'", other),
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let config = Config::parse("", Path::new("/tmp")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parse_relative_location() {
        let config = Config::parse("data.location=./custom.db\n", Path::new("/home/me/.worktime")).unwrap();
        assert_eq!(
            config.data_location,
            Some(PathBuf::from("/home/me/.worktime/./custom.db"))
        );
    }

    #[test]
    fn test_parse_week_days() {
        let config = Config::parse("# comment\nweek.days = 7\n", Path::new("/")).unwrap();
        assert_eq!(config.week_days, 7);
        assert!(Config::parse("week.days=9", Path::new("/")).is_err());
        assert!(Config::parse("week.days=five", Path::new("/")).is_err());
    }

    #[test]
    fn test_parse_rejects_garbage_line() {
        assert!(Config::parse("data.location", Path::new("/")).is_err());
    }
}
