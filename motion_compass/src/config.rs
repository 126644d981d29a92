use crate::classifier::ClassifierConfig;
use crate::error::{CompassError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "COMPASS_CONFIG";
pub const DEVICE_ENV: &str = "COMPASS_DEVICE";
pub const MIN_AREA_ENV: &str = "COMPASS_MIN_AREA";
pub const DIFF_THRESHOLD_ENV: &str = "COMPASS_DIFF_THRESHOLD";

const DEFAULT_DEVICE_INDEX: u32 = 0;
const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 30;

#[derive(Debug, Deserialize, Default)]
struct MonitorConfigFile {
    device_index: Option<u32>,
    frame_interval_ms: Option<u64>,
    max_consecutive_failures: Option<u32>,
    classifier: Option<ClassifierConfig>,
}

/// Everything the capture loop needs to know before it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub device_index: u32,
    pub classifier: ClassifierConfig,
    /// Minimum time between loop iterations. `None` runs as fast as the
    /// device delivers.
    pub frame_interval: Option<Duration>,
    /// Read errors in a row before the loop gives up.
    pub max_consecutive_failures: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            device_index: DEFAULT_DEVICE_INDEX,
            classifier: ClassifierConfig::default(),
            frame_interval: None,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}

impl MonitorConfig {
    /// Defaults, then the TOML file at `path` (or `COMPASS_CONFIG`), then
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok();
        let path = path.or(env_path.as_deref().map(Path::new));
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => MonitorConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parses a TOML document on top of the defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: MonitorConfigFile = toml::from_str(raw)?;
        let cfg = Self::from_file(file);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: MonitorConfigFile) -> Self {
        Self {
            device_index: file.device_index.unwrap_or(DEFAULT_DEVICE_INDEX),
            classifier: file.classifier.unwrap_or_default(),
            frame_interval: file
                .frame_interval_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            max_consecutive_failures: file
                .max_consecutive_failures
                .unwrap_or(DEFAULT_MAX_CONSECUTIVE_FAILURES),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(device) = env_parse::<u32>(DEVICE_ENV)? {
            self.device_index = device;
        }
        if let Some(area) = env_parse::<u64>(MIN_AREA_ENV)? {
            self.classifier.min_region_area = area;
        }
        if let Some(level) = env_parse::<u8>(DIFF_THRESHOLD_ENV)? {
            self.classifier.diff_threshold = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.classifier.validate()?;
        if self.max_consecutive_failures == 0 {
            return Err(CompassError::invalid_config(
                "max_consecutive_failures must be at least 1",
            ));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<MonitorConfigFile> {
    let raw = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&raw)?)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| CompassError::invalid_config(format!("{key} has invalid value {raw:?}"))),
        _ => Ok(None),
    }
}
