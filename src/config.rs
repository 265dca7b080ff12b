use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::{EngineOptions, SelectorSet};
use crate::error::{ConfigError, Result};
use crate::feed::Site;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub engine: EngineOptions,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sites: Vec<Site>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Offset attached to every parsed date, e.g. `+08:00`.
    #[serde(default = "default_timezone_offset")]
    pub timezone_offset: String,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Seconds; doubled after each failed attempt.
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay: u64,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Seconds between scheduled runs.
    #[serde(default = "default_interval")]
    pub interval: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub log_to_file: bool,

    #[serde(default = "default_log_file")]
    pub log_file: String,

    #[serde(default)]
    pub json_format: bool,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|_| ConfigError::NotFound(path.as_ref().display().to_string()))?;

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for site in &self.sites {
            if site.name.trim().is_empty() {
                return Err(ConfigError::Invalid("Site name cannot be empty".to_string()));
            }
            if !names.insert(site.name.as_str()) {
                return Err(ConfigError::AlreadyExists(format!("Site '{}'", site.name)));
            }
            crate::feed::fetcher::validate_page_url(&site.url)?;
            validate_selectors(&site.name, &site.selectors)?;
        }

        self.settings.offset()?;

        if self.settings.interval == 0 {
            return Err(ConfigError::Invalid("Interval must be greater than 0".to_string()));
        }

        if self.engine.sample_size == 0 {
            return Err(ConfigError::Invalid("Engine sample_size must be greater than 0".to_string()));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("RSS_SCOUT_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(interval) = std::env::var("RSS_SCOUT_INTERVAL") {
            if let Ok(val) = interval.parse() {
                self.settings.interval = val;
            }
        }

        if let Ok(offset) = std::env::var("RSS_SCOUT_TIMEZONE") {
            self.settings.timezone_offset = offset;
        }
    }

    pub fn site(&self, name: &str) -> Result<&Site> {
        self.sites
            .iter()
            .find(|site| site.name == name)
            .ok_or_else(|| ConfigError::NotFound(format!("Site '{}'", name)))
    }

    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("rss-scout"))
            .ok_or_else(|| ConfigError::Invalid("Could not determine config directory".to_string()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            engine: EngineOptions::default(),
            logging: LoggingConfig::default(),
            sites: Vec::new(),
        }
    }
}

impl Settings {
    pub fn offset(&self) -> Result<FixedOffset> {
        parse_offset(&self.timezone_offset)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_secs(self.retry_base_delay)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timezone_offset: default_timezone_offset(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay: default_retry_base_delay(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
            interval: default_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_to_file: false,
            log_file: default_log_file(),
            json_format: false,
        }
    }
}

/// Parse `+HH:MM`, `-HH:MM`, `+HHMM` or `Z`.
pub fn parse_offset(text: &str) -> Result<FixedOffset> {
    let invalid = || ConfigError::Invalid(format!("Invalid timezone offset: {:?}", text));
    let text = text.trim();
    if text.eq_ignore_ascii_case("z") || text.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match text.chars().next() {
        Some('+') => (1, &text[1..]),
        Some('-') => (-1, &text[1..]),
        _ => return Err(invalid()),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

fn validate_selectors(site: &str, selectors: &SelectorSet) -> Result<()> {
    let fields = [
        ("container", &selectors.container),
        ("item", &selectors.item),
        ("title", &selectors.title),
        ("link", &selectors.link),
        ("date", &selectors.date),
    ];
    for (field, selector) in fields {
        if selector.trim().is_empty() {
            return Err(ConfigError::InvalidSelector(format!(
                "Site '{}': {} selector is empty",
                site, field
            )));
        }
        if scraper::Selector::parse(selector).is_err() {
            return Err(ConfigError::InvalidSelector(format!(
                "Site '{}': {} selector {:?} does not parse",
                site, field, selector
            )));
        }
    }
    Ok(())
}

fn default_timezone_offset() -> String { "+08:00".to_string() }
fn default_retry_attempts() -> u32 { 3 }
fn default_retry_base_delay() -> u64 { 5 }
fn default_timeout() -> u64 { 60 }
fn default_user_agent() -> String {
    format!("rss-scout/{}", env!("CARGO_PKG_VERSION"))
}
fn default_interval() -> u64 { 3600 }

fn default_log_level() -> String { "info".to_string() }
fn default_log_file() -> String { "logs/rss-scout.log".to_string() }
