//! Persisted client settings behind a small key-value store.
//!
//! Values are JSON blobs under fixed keys. The file store keeps one
//! `<key>.json` per key in the campusdesk config directory; tests use the
//! in-memory store.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::analytics::StagedFilters;
use crate::config::CampusConfig;
use crate::constants::DEFAULT_PAGE_SIZE;
use crate::date_range::WeekStart;
use crate::error::{CampusError, CampusResult};
use crate::event::{Category, Priority};
use crate::view::ViewMode;

pub const CALENDAR_SETTINGS_KEY: &str = "calendar-settings";
pub const ANALYTICS_FILTERS_KEY: &str = "analytics-filters";

pub trait SettingsStore {
    fn get(&self, key: &str) -> CampusResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> CampusResult<()>;
    fn remove(&self, key: &str) -> CampusResult<()>;
}

/// Load a typed value; a missing key yields the default.
pub fn load<T: DeserializeOwned + Default>(store: &dyn SettingsStore, key: &str) -> CampusResult<T> {
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| CampusError::Settings(format!("stored '{key}' is unreadable: {e}"))),
        None => Ok(T::default()),
    }
}

pub fn save<T: Serialize>(store: &dyn SettingsStore, key: &str, value: &T) -> CampusResult<()> {
    let raw = serde_json::to_string_pretty(value)?;
    store.set(key, &raw)
}

/// Calendar preferences that survive between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalendarSettings {
    pub default_view: ViewMode,
    pub week_start: WeekStart,
    pub show_weekends: bool,
    pub page_size: usize,
    pub default_category: Category,
    pub default_priority: Priority,
    pub use_24_hour_time: bool,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        CalendarSettings {
            default_view: ViewMode::Month,
            week_start: WeekStart::Sunday,
            show_weekends: true,
            page_size: DEFAULT_PAGE_SIZE,
            default_category: Category::Academic,
            default_priority: Priority::Medium,
            use_24_hour_time: true,
        }
    }
}

impl CalendarSettings {
    pub fn load(store: &dyn SettingsStore) -> CampusResult<Self> {
        load(store, CALENDAR_SETTINGS_KEY)
    }

    pub fn save(&self, store: &dyn SettingsStore) -> CampusResult<()> {
        save(store, CALENDAR_SETTINGS_KEY, self)
    }

    /// Set one setting from its camelCase or kebab-case name.
    pub fn set(&mut self, name: &str, value: &str) -> CampusResult<()> {
        let invalid = |e: String| CampusError::Settings(e);
        match name.replace('-', "").to_lowercase().as_str() {
            "defaultview" | "view" => self.default_view = value.parse().map_err(invalid)?,
            "weekstart" => self.week_start = value.parse().map_err(invalid)?,
            "showweekends" => self.show_weekends = parse_bool(value)?,
            "pagesize" => {
                self.page_size = value
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| CampusError::Settings(format!("page size must be a positive number, not '{value}'")))?
            }
            "defaultcategory" => self.default_category = value.parse().map_err(invalid)?,
            "defaultpriority" => self.default_priority = value.parse().map_err(invalid)?,
            "use24hourtime" | "24h" => self.use_24_hour_time = parse_bool(value)?,
            _ => return Err(CampusError::Settings(format!("unknown setting '{name}'"))),
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> CampusResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(CampusError::Settings(format!("expected true or false, not '{other}'"))),
    }
}

pub fn load_analytics_filters(store: &dyn SettingsStore) -> CampusResult<StagedFilters> {
    load(store, ANALYTICS_FILTERS_KEY)
}

pub fn save_analytics_filters(store: &dyn SettingsStore, filters: &StagedFilters) -> CampusResult<()> {
    save(store, ANALYTICS_FILTERS_KEY, filters)
}

// ============================================================================
// Stores
// ============================================================================

/// One JSON file per key in a directory.
pub struct FileSettingsStore {
    dir: PathBuf,
}

impl FileSettingsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileSettingsStore { dir: dir.into() }
    }

    /// Store in the campusdesk config directory.
    pub fn default_location() -> CampusResult<Self> {
        Ok(FileSettingsStore::new(CampusConfig::config_dir()?))
    }

    fn path(&self, key: &str) -> CampusResult<PathBuf> {
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(CampusError::Settings(format!("invalid settings key '{key}'")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, key: &str) -> CampusResult<Option<String>> {
        let path = self.path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?))
    }

    fn set(&self, key: &str, value: &str) -> CampusResult<()> {
        let path = self.path(key)?;
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| CampusError::Settings(format!("Could not create settings directory: {e}")))?;
        std::fs::write(&path, value)?;
        tracing::debug!(key, path = %path.display(), "saved settings");
        Ok(())
    }

    fn remove(&self, key: &str) -> CampusResult<()> {
        let path = self.path(key)?;
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySettingsStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySettingsStore {
    fn lock(&self) -> CampusResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| CampusError::Settings("settings store poisoned".into()))
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> CampusResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CampusResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CampusResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::TimeRange;

    #[test]
    fn missing_settings_load_as_default() {
        let store = MemorySettingsStore::default();
        assert_eq!(CalendarSettings::load(&store).unwrap(), CalendarSettings::default());
    }

    #[test]
    fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("campusdesk"));

        let mut settings = CalendarSettings::default();
        settings.set("week-start", "monday").unwrap();
        settings.set("defaultView", "week").unwrap();
        settings.save(&store).unwrap();

        assert!(dir.path().join("campusdesk/calendar-settings.json").exists());
        let loaded = CalendarSettings::load(&store).unwrap();
        assert_eq!(loaded.week_start, WeekStart::Monday);
        assert_eq!(loaded.default_view, ViewMode::Week);
    }

    #[test]
    fn partial_blob_fills_defaults() {
        let store = MemorySettingsStore::default();
        store.set(CALENDAR_SETTINGS_KEY, r#"{"pageSize": 50}"#).unwrap();
        let loaded = CalendarSettings::load(&store).unwrap();
        assert_eq!(loaded.page_size, 50);
        assert!(loaded.show_weekends);
    }

    #[test]
    fn corrupt_blob_is_an_error() {
        let store = MemorySettingsStore::default();
        store.set(CALENDAR_SETTINGS_KEY, "{not json").unwrap();
        assert!(matches!(CalendarSettings::load(&store), Err(CampusError::Settings(_))));
    }

    #[test]
    fn set_rejects_bad_values() {
        let mut settings = CalendarSettings::default();
        assert!(settings.set("pageSize", "0").is_err());
        assert!(settings.set("showWeekends", "maybe").is_err());
        assert!(settings.set("colour", "blue").is_err());
    }

    #[test]
    fn rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path());
        assert!(store.set("../escape", "{}").is_err());
    }

    #[test]
    fn analytics_filters_persist() {
        let store = MemorySettingsStore::default();
        let mut staged = load_analytics_filters(&store).unwrap();
        staged.pending_mut().time_range = TimeRange::Quarter;
        staged.apply();
        save_analytics_filters(&store, &staged).unwrap();
        assert_eq!(load_analytics_filters(&store).unwrap().applied().time_range, TimeRange::Quarter);
    }
}
