use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use threadtally_core::{DEFAULT_TIMEZONE, DEFAULT_WINDOW_DAYS};

const DEFAULT_OUTPUT: &str = "result.json";
pub const ENV_TIMEZONE: &str = "THREADTALLY_TIMEZONE";
pub const ENV_WINDOW_DAYS: &str = "THREADTALLY_WINDOW_DAYS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Target group identifier (invite link, username or numeric id).
    pub group: Option<String>,
    pub timezone: String,
    pub window_days: u32,
    pub output: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            group: None,
            timezone: DEFAULT_TIMEZONE.to_string(),
            window_days: DEFAULT_WINDOW_DAYS,
            output: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

/// Values given on the command line; each one wins over every other layer.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub group: Option<String>,
    pub timezone: Option<String>,
    pub window_days: Option<u32>,
    pub output: Option<PathBuf>,
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("threadtally").join("config.toml"))
    }

    /// An explicit path must exist; the default location is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_file(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::load_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        Ok(settings)
    }

    /// Apply environment overrides. `lookup` is normally `std::env::var(..).ok()`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(tz) = lookup(ENV_TIMEZONE).filter(|v| !v.trim().is_empty()) {
            self.timezone = tz;
        }
        if let Some(raw) = lookup(ENV_WINDOW_DAYS) {
            self.window_days = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_WINDOW_DAYS}='{raw}' is not a whole number of days"))?;
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(group) = overrides.group {
            self.group = Some(group);
        }
        if let Some(timezone) = overrides.timezone {
            self.timezone = timezone;
        }
        if let Some(days) = overrides.window_days {
            self.window_days = days;
        }
        if let Some(output) = overrides.output {
            self.output = output;
        }
    }
}
