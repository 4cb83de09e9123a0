//! TOML-based application configuration.
//!
//! Stores scheduling preferences:
//! - Suggestion count, buffers, minimum slot and default block length
//! - Slot preference and energy awareness
//! - Working hours and working days
//! - Energy blocks across the day
//!
//! Configuration is stored at `~/.config/timeblock/config.toml`.

use std::path::{Path, PathBuf};

use chrono::{Duration, Weekday};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::energy::EnergyBlock;
use crate::error::{ConfigError, CoreError};
use crate::scheduler::{SchedulingSettings, MAX_HORIZON_DAYS};
use crate::schedule::{parse_clock, EnergyLevel, SlotPreference};

/// Engine tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: u32,
    #[serde(default = "default_base_buffer")]
    pub base_buffer_minutes: u32,
    #[serde(default = "default_min_slot")]
    pub min_slot_minutes: u32,
    #[serde(default = "default_duration")]
    pub default_duration_minutes: u32,
    #[serde(default)]
    pub slot_preference: SlotPreference,
    #[serde(default = "default_true")]
    pub energy_aware: bool,
    #[serde(default)]
    pub all_day_events_block: bool,
    /// Days planned by `timeblock plan` when `--days` is not given.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
}

/// Working window applied to every working day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingHoursConfig {
    #[serde(default = "default_work_start")]
    pub start: String,
    #[serde(default = "default_work_end")]
    pub end: String,
    #[serde(default = "default_work_days")]
    pub days: Vec<String>,
}

/// One `[[energy_blocks]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyBlockConfig {
    pub start: String,
    pub end: String,
    pub level: EnergyLevel,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/timeblock/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default)]
    pub working_hours: WorkingHoursConfig,
    #[serde(default = "default_energy_blocks")]
    pub energy_blocks: Vec<EnergyBlockConfig>,
}

// Default functions
fn default_max_suggestions() -> u32 {
    5
}
fn default_base_buffer() -> u32 {
    10
}
fn default_min_slot() -> u32 {
    15
}
fn default_duration() -> u32 {
    30
}
fn default_true() -> bool {
    true
}
fn default_horizon_days() -> u32 {
    7
}
fn default_work_start() -> String {
    "09:00".into()
}
fn default_work_end() -> String {
    "17:00".into()
}
fn default_work_days() -> Vec<String> {
    ["mon", "tue", "wed", "thu", "fri"]
        .iter()
        .map(|d| d.to_string())
        .collect()
}
fn default_energy_blocks() -> Vec<EnergyBlockConfig> {
    let block = |start: &str, end: &str, level| EnergyBlockConfig {
        start: start.into(),
        end: end.into(),
        level,
    };
    vec![
        block("09:00", "12:00", EnergyLevel::HighFocus),
        block("12:00", "14:00", EnergyLevel::Low),
        block("14:00", "17:00", EnergyLevel::Medium),
    ]
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            max_suggestions: default_max_suggestions(),
            base_buffer_minutes: default_base_buffer(),
            min_slot_minutes: default_min_slot(),
            default_duration_minutes: default_duration(),
            slot_preference: SlotPreference::MorningFirst,
            energy_aware: true,
            all_day_events_block: false,
            horizon_days: default_horizon_days(),
        }
    }
}

impl Default for WorkingHoursConfig {
    fn default() -> Self {
        Self {
            start: default_work_start(),
            end: default_work_end(),
            days: default_work_days(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheduling: SchedulingConfig::default(),
            working_hours: WorkingHoursConfig::default(),
            energy_blocks: default_energy_blocks(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                ),
                serde_json::Value::Number(_) => serde_json::Value::Number(
                    value
                        .parse::<u64>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                        .into(),
                ),
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// Default location, `<data_dir>/config.toml`.
    pub fn path() -> Result<PathBuf, CoreError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, CoreError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is absent.
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), CoreError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), CoreError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key, type-checked against the current value.
    ///
    /// The change is in memory only; call [`save`](Self::save) to persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not parse
    /// into the field's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.scheduling_settings().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        *self = updated;
        Ok(())
    }

    /// Dot-path keys with their current values, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }
        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    /// Settings for the scheduling engine.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed clock times, unknown weekday names,
    /// invalid energy blocks, inverted working hours, or a horizon outside
    /// 1..=366 days.
    pub fn scheduling_settings(&self) -> Result<SchedulingSettings, CoreError> {
        let s = &self.scheduling;
        if !(1..=MAX_HORIZON_DAYS).contains(&i64::from(s.horizon_days)) {
            return Err(ConfigError::InvalidValue {
                key: "scheduling.horizon_days".into(),
                message: format!("must be between 1 and {MAX_HORIZON_DAYS}"),
            }
            .into());
        }
        let working_days = self
            .working_hours
            .days
            .iter()
            .map(|d| {
                d.parse::<Weekday>().map_err(|_| ConfigError::InvalidValue {
                    key: "working_hours.days".into(),
                    message: format!("unknown weekday '{d}'"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let energy_blocks = self
            .energy_blocks
            .iter()
            .map(|b| EnergyBlock::from_clock(&b.start, &b.end, b.level))
            .collect::<Result<Vec<_>, _>>()?;

        let settings = SchedulingSettings {
            max_suggestions: s.max_suggestions as usize,
            base_buffer: Duration::minutes(s.base_buffer_minutes.into()),
            min_slot: Duration::minutes(s.min_slot_minutes.into()),
            default_duration: Duration::minutes(s.default_duration_minutes.into()),
            slot_preference: s.slot_preference,
            energy_aware: s.energy_aware,
            all_day_events_block: s.all_day_events_block,
            working_start: parse_clock(&self.working_hours.start)?,
            working_end: parse_clock(&self.working_hours.end)?,
            working_days,
            energy_blocks,
        };
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert!(toml_str.contains("[[energy_blocks]]"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [scheduling]
            max_suggestions = 3
            slot_preference = "afternoon_first"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.scheduling.max_suggestions, 3);
        assert_eq!(parsed.scheduling.slot_preference, SlotPreference::AfternoonFirst);
        assert_eq!(parsed.scheduling.base_buffer_minutes, 10);
        assert_eq!(parsed.working_hours.start, "09:00");
        assert_eq!(parsed.energy_blocks.len(), 3);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("scheduling.energy_aware").as_deref(), Some("true"));
        assert_eq!(cfg.get("scheduling.base_buffer_minutes").as_deref(), Some("10"));
        assert_eq!(cfg.get("working_hours.end").as_deref(), Some("17:00"));
        assert_eq!(cfg.get("scheduling.slot_preference").as_deref(), Some("morning_first"));
        assert!(cfg.get("scheduling.missing_key").is_none());
    }

    #[test]
    fn set_updates_typed_values() {
        let mut cfg = Config::default();
        cfg.set("scheduling.max_suggestions", "8").unwrap();
        cfg.set("scheduling.energy_aware", "false").unwrap();
        cfg.set("scheduling.slot_preference", "spread_evenly").unwrap();
        cfg.set("working_hours.days", r#"["sat","sun"]"#).unwrap();
        assert_eq!(cfg.scheduling.max_suggestions, 8);
        assert!(!cfg.scheduling.energy_aware);
        assert_eq!(cfg.scheduling.slot_preference, SlotPreference::SpreadEvenly);
        assert_eq!(cfg.working_hours.days, vec!["sat", "sun"]);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.set("scheduling.nonexistent_key", "1").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));
        assert!(cfg.set("", "1").is_err());
    }

    #[test]
    fn set_rejects_invalid_values_and_keeps_old_state() {
        let mut cfg = Config::default();
        assert!(cfg.set("scheduling.energy_aware", "sometimes").is_err());
        assert!(cfg.set("scheduling.max_suggestions", "-1").is_err());
        assert!(cfg.set("scheduling.slot_preference", "whenever").is_err());
        assert!(cfg.set("working_hours.start", "9am").is_err());
        assert!(cfg.set("working_hours.start", "18:00").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn horizon_days_is_bounded() {
        let mut cfg = Config::default();
        assert!(cfg.set("scheduling.horizon_days", "0").is_err());
        assert!(cfg.set("scheduling.horizon_days", "200000000").is_err());
        cfg.set("scheduling.horizon_days", "366").unwrap();
        assert_eq!(cfg.scheduling.horizon_days, 366);

        cfg.scheduling.horizon_days = 367;
        let err = cfg.scheduling_settings().unwrap_err();
        assert!(err.to_string().contains("scheduling.horizon_days"));
    }

    #[test]
    fn settings_from_defaults() {
        let settings = Config::default().scheduling_settings().unwrap();
        assert_eq!(settings, SchedulingSettings::default());
    }

    #[test]
    fn bad_weekday_is_reported() {
        let mut cfg = Config::default();
        cfg.working_hours.days.push("funday".into());
        let err = cfg.scheduling_settings().unwrap_err();
        assert!(err.to_string().contains("funday"));
    }

    #[test]
    fn load_from_writes_defaults_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.set("scheduling.horizon_days", "14").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().scheduling.horizon_days, 14);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scheduling\nmax_suggestions = ").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::LoadFailed { .. })));
    }

    #[test]
    fn entries_list_every_leaf() {
        let entries = Config::default().entries();
        assert!(entries.iter().any(|(k, v)| k == "scheduling.max_suggestions" && v == "5"));
        assert!(entries.iter().any(|(k, _)| k == "energy_blocks"));
    }
}
