//! TOML-based application configuration.
//!
//! Holds the tunable rules of the engine:
//! - Focus timer lengths, cycle size and break recovery
//! - XP, leveling and burnout constants
//! - Quest escalation and completion bonuses
//!
//! Configuration is stored at `~/.config/devquest/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::focus::FocusPolicy;
use crate::progression::ProgressionPolicy;
use crate::quest::QuestPolicy;

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/devquest/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub focus: FocusPolicy,
    #[serde(default)]
    pub progression: ProgressionPolicy,
    #[serde(default)]
    pub quests: QuestPolicy,
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
    ) -> std::result::Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) => return Err(unknown()),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// validated, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Reject values that would stall the timer or break the formulas.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let positive = [
            ("focus.focus_minutes", self.focus.focus_minutes as u64),
            ("focus.short_break_minutes", self.focus.short_break_minutes as u64),
            ("focus.long_break_minutes", self.focus.long_break_minutes as u64),
            ("focus.sessions_per_cycle", self.focus.sessions_per_cycle as u64),
            ("progression.leveling_constant", self.progression.leveling_constant),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: "must be greater than zero".into(),
                });
            }
        }

        let fractions = [
            ("focus.short_break_recovery", self.focus.short_break_recovery),
            ("focus.long_break_recovery", self.focus.long_break_recovery),
            ("focus.overtime_penalty", self.focus.overtime_penalty),
            (
                "progression.burnout_penalty_threshold",
                self.progression.burnout_penalty_threshold,
            ),
            ("progression.burnout_base_increase", self.progression.burnout_base_increase),
            ("progression.burnout_per_difficulty", self.progression.burnout_per_difficulty),
            ("progression.decay_rate_per_hour", self.progression.decay_rate_per_hour),
            ("progression.level_up_recovery", self.progression.level_up_recovery),
        ];
        for (key, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: format!("{value} is outside 0.0..=1.0"),
                });
            }
        }
        Ok(())
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

    /// Set a config value by dot-separated key. The caller saves.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// or fails validation. On error `self` is unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
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
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let parsed: Config = toml::from_str("[focus]\nfocus_minutes = 50\n").unwrap();
        assert_eq!(parsed.focus.focus_minutes, 50);
        assert_eq!(parsed.focus.sessions_per_cycle, 4);
        assert_eq!(parsed.progression.leveling_constant, 120);
        assert_eq!(parsed.quests.escalation_days, 3);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("focus.focus_minutes").as_deref(), Some("25"));
        assert_eq!(cfg.get("focus.auto_start_breaks").as_deref(), Some("true"));
        assert_eq!(
            cfg.get("progression.burnout_penalty_threshold").as_deref(),
            Some("0.75")
        );
        assert!(cfg.get("focus.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("focus.focus_minutes", "50").unwrap();
        cfg.set("focus.auto_start_breaks", "false").unwrap();
        cfg.set("progression.burnout_penalty_threshold", "0.8").unwrap();
        cfg.set("progression.decay_rate_per_hour", "1").unwrap();
        assert_eq!(cfg.focus.focus_minutes, 50);
        assert!(!cfg.focus.auto_start_breaks);
        assert_eq!(cfg.progression.burnout_penalty_threshold, 0.8);
        assert_eq!(cfg.progression.decay_rate_per_hour, 1.0);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.set("focus.nonexistent_key", "1").unwrap_err();
        assert!(matches!(err, crate::CoreError::Config(ConfigError::UnknownKey(_))));
        assert!(cfg.set("focus", "1").is_err());
        assert!(cfg.set("", "1").is_err());
    }

    #[test]
    fn set_rejects_invalid_type_and_keeps_state() {
        let mut cfg = Config::default();
        assert!(cfg.set("focus.auto_start_breaks", "not_a_bool").is_err());
        assert!(cfg.set("focus.focus_minutes", "-3").is_err());
        assert!(cfg.set("focus.focus_minutes", "0").is_err());
        assert!(cfg.set("focus.overtime_penalty", "1.5").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.set("quests.escalation_days", "7").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().quests.escalation_days, 7);
    }

    #[test]
    fn load_from_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[focus]\nsessions_per_cycle = 0\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
