//! User settings: where the database lives and how early reminders fire.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dates::DatePolicy;
use crate::error::SettingsError;
use crate::reminder::ReminderPolicy;

pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const CONFIG_DIR_ENV: &str = "TENANCY_CONFIG_DIR";
pub const DB_DIR_ENV: &str = "TENANCY_DB_DIR";

const FALLBACK_DB_DIR: &str = "PropertyTenancyData";

/// Longest reminder lead accepted from the settings file.
pub const MAX_LEAD_DAYS: i64 = 365;

const DEFAULT_RENT_LEAD_DAYS: i64 = 3;
const DEFAULT_RENEWAL_LEAD_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_dir: PathBuf,
    pub date_policy: DatePolicy,
    pub rent_reminder_lead_days: i64,
    pub renewal_lead_days: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_dir: default_database_dir(),
            date_policy: DatePolicy::default(),
            rent_reminder_lead_days: DEFAULT_RENT_LEAD_DAYS,
            renewal_lead_days: DEFAULT_RENEWAL_LEAD_DAYS,
        }
    }
}

impl Settings {
    /// Reads settings from `path`, falling back to defaults when the file
    /// does not exist yet.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects reminder leads outside `0..=MAX_LEAD_DAYS`.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (field, days) in [
            ("rent_reminder_lead_days", self.rent_reminder_lead_days),
            ("renewal_lead_days", self.renewal_lead_days),
        ] {
            if !(0..=MAX_LEAD_DAYS).contains(&days) {
                return Err(SettingsError::LeadOutOfRange { field, days });
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "saved settings");
        Ok(())
    }

    pub fn reset_to_default(&mut self) {
        *self = Self::default();
    }

    /// Points the settings at a new database directory after checking it
    /// can be written to.
    pub fn set_database_dir(&mut self, dir: PathBuf) -> Result<(), SettingsError> {
        if !is_valid_path(&dir) {
            return Err(SettingsError::NotWritable(dir));
        }
        self.database_dir = dir;
        Ok(())
    }

    pub fn reminder_policy(&self) -> ReminderPolicy {
        ReminderPolicy {
            rent_lead: lead(self.rent_reminder_lead_days, DEFAULT_RENT_LEAD_DAYS),
            renewal_lead: lead(self.renewal_lead_days, DEFAULT_RENEWAL_LEAD_DAYS),
        }
    }
}

// Values that skipped `validate` fall back to the default lead.
fn lead(days: i64, default_days: i64) -> Duration {
    if (0..=MAX_LEAD_DAYS).contains(&days) {
        if let Some(lead) = Duration::try_days(days) {
            return lead;
        }
    }
    warn!(days, default_days, "reminder lead out of range, using default");
    Duration::days(default_days)
}

/// Location of the settings file.
pub fn settings_path() -> Result<PathBuf, SettingsError> {
    if let Ok(custom_dir) = std::env::var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(custom_dir).join(SETTINGS_FILE_NAME));
    }
    let dirs = project_dirs().ok_or(SettingsError::NoHomeDirectory)?;
    Ok(dirs.config_dir().join(SETTINGS_FILE_NAME))
}

pub fn default_database_dir() -> PathBuf {
    if let Ok(custom_dir) = std::env::var(DB_DIR_ENV) {
        return PathBuf::from(custom_dir);
    }
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(FALLBACK_DB_DIR))
}

/// True when `dir` exists (or can be created) and accepts a new file.
pub fn is_valid_path(dir: &Path) -> bool {
    if fs::create_dir_all(dir).is_err() {
        return false;
    }
    let marker = dir.join(".write-test");
    let writable = fs::write(&marker, b"").is_ok();
    let _ = fs::remove_file(&marker);
    writable
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "PropertyTenancy")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = Settings::load(&dir.path().join(SETTINGS_FILE_NAME)).expect("load");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.reminder_policy(), ReminderPolicy::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(SETTINGS_FILE_NAME);

        let mut settings = Settings::default();
        settings.set_database_dir(dir.path().join("db")).expect("writable");
        settings.date_policy = DatePolicy::Strict;
        settings.renewal_lead_days = 14;
        settings.save(&path).expect("save");

        assert_eq!(Settings::load(&path).expect("load"), settings);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, r#"{ "rent_reminder_lead_days": 5 }"#).expect("write");

        let settings = Settings::load(&path).expect("load");
        assert_eq!(settings.rent_reminder_lead_days, 5);
        assert_eq!(settings.renewal_lead_days, 7);
        assert_eq!(settings.date_policy, DatePolicy::Lenient);
    }

    #[test]
    fn oversized_lead_is_rejected_on_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, r#"{ "rent_reminder_lead_days": 9223372036854775807 }"#).expect("write");

        assert!(matches!(
            Settings::load(&path),
            Err(SettingsError::LeadOutOfRange {
                field: "rent_reminder_lead_days",
                ..
            })
        ));
    }

    #[test]
    fn out_of_range_lead_falls_back_to_default() {
        let settings = Settings {
            rent_reminder_lead_days: i64::MAX,
            renewal_lead_days: -4,
            ..Settings::default()
        };
        assert_eq!(settings.reminder_policy(), ReminderPolicy::default());
    }

    #[test]
    fn reset_restores_defaults() {
        let mut settings = Settings {
            rent_reminder_lead_days: 10,
            ..Settings::default()
        };
        settings.reset_to_default();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn file_is_not_a_valid_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("plain");
        fs::write(&file, b"x").expect("write");
        assert!(!is_valid_path(&file));
        assert!(is_valid_path(dir.path()));
    }
}
