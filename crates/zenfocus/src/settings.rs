//! User settings and the settings store
//!
//! Settings are merged from partial updates, validated as a whole and
//! persisted under [`SETTINGS_KEY`]. An invalid update is rejected
//! atomically: nothing is applied and nothing is written.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::mode::Mode;
use crate::store::{KeyValueStore, PersistenceError, SharedStore, SETTINGS_KEY};

/// Longest interval accepted for any mode (one day)
pub const MAX_DURATION_MINUTES: u32 = 24 * 60;

/// Largest accepted number of focus cycles before a long break
pub const MAX_LONG_BREAK_INTERVAL: u32 = 100;

/// Rejected settings or rating input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be a positive number of minutes, got {value}")]
    NonPositiveDuration { field: &'static str, value: i64 },

    #[error("{field} must be at most {max} minutes, got {value}")]
    DurationTooLong {
        field: &'static str,
        value: i64,
        max: u32,
    },

    #[error("longBreakInterval must be at least 1, got {0}")]
    NonPositiveInterval(i64),

    #[error("longBreakInterval must be at most 100, got {0}")]
    IntervalTooLarge(i64),

    #[error("soundVolume must be between 0 and 1, got {0}")]
    VolumeOutOfRange(f32),

    #[error("focus rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(i64),
}

/// Colour theme of the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Forest,
    Ocean,
    Dusk,
}

impl Theme {
    pub const ALL: [Theme; 4] = [Theme::Default, Theme::Forest, Theme::Ocean, Theme::Dusk];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Default => "default",
            Theme::Forest => "forest",
            Theme::Ocean => "ocean",
            Theme::Dusk => "dusk",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
    }

    /// The theme after this one, wrapping around
    pub fn next(self) -> Self {
        match self {
            Theme::Default => Theme::Forest,
            Theme::Forest => Theme::Ocean,
            Theme::Ocean => Theme::Dusk,
            Theme::Dusk => Theme::Default,
        }
    }
}

/// Background audio track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmbientSound {
    #[default]
    None,
    Rain,
    Forest,
    WhiteNoise,
}

impl AmbientSound {
    pub const ALL: [AmbientSound; 4] = [
        AmbientSound::None,
        AmbientSound::Rain,
        AmbientSound::Forest,
        AmbientSound::WhiteNoise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AmbientSound::None => "none",
            AmbientSound::Rain => "rain",
            AmbientSound::Forest => "forest",
            AmbientSound::WhiteNoise => "whitenoise",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.replace(['-', '_', ' '], "");
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(&s))
    }

    /// The track to play, or `None` for silence
    pub fn track(self) -> Option<Self> {
        match self {
            AmbientSound::None => None,
            other => Some(other),
        }
    }

    pub fn next(self) -> Self {
        match self {
            AmbientSound::None => AmbientSound::Rain,
            AmbientSound::Rain => AmbientSound::Forest,
            AmbientSound::Forest => AmbientSound::WhiteNoise,
            AmbientSound::WhiteNoise => AmbientSound::None,
        }
    }
}

/// Deserialize a field, falling back to its default when the stored value
/// is not recognised (e.g. a theme written by a newer release)
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// User-configurable timer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Focus interval in minutes
    pub focus_duration: u32,
    /// Short break in minutes
    pub short_break_duration: u32,
    /// Long break in minutes
    pub long_break_duration: u32,
    /// Focus cycles before a long break
    pub long_break_interval: u32,
    #[serde(deserialize_with = "lenient")]
    pub selected_theme: Theme,
    #[serde(deserialize_with = "lenient")]
    pub ambient_sound: AmbientSound,
    /// Ambient volume, 0.0 to 1.0
    pub sound_volume: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            focus_duration: 25,
            short_break_duration: 5,
            long_break_duration: 15,
            long_break_interval: 4,
            selected_theme: Theme::Default,
            ambient_sound: AmbientSound::None,
            sound_volume: 0.5,
        }
    }
}

impl Settings {
    /// Configured length of `mode` in minutes
    pub fn duration_minutes(&self, mode: Mode) -> u32 {
        match mode {
            Mode::Focus => self.focus_duration,
            Mode::ShortBreak => self.short_break_duration,
            Mode::LongBreak => self.long_break_duration,
        }
    }

    /// Check every invariant (used on blobs loaded from storage)
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_duration("focusDuration", self.focus_duration as i64)?;
        check_duration("shortBreakDuration", self.short_break_duration as i64)?;
        check_duration("longBreakDuration", self.long_break_duration as i64)?;
        check_interval(self.long_break_interval as i64)?;
        check_volume(self.sound_volume)?;
        Ok(())
    }

    /// Apply `patch` over these settings, or fail without applying anything
    pub fn merged(&self, patch: &SettingsPatch) -> Result<Settings, ValidationError> {
        let mut next = self.clone();

        if let Some(v) = patch.focus_duration {
            next.focus_duration = check_duration("focusDuration", v)?;
        }
        if let Some(v) = patch.short_break_duration {
            next.short_break_duration = check_duration("shortBreakDuration", v)?;
        }
        if let Some(v) = patch.long_break_duration {
            next.long_break_duration = check_duration("longBreakDuration", v)?;
        }
        if let Some(v) = patch.long_break_interval {
            next.long_break_interval = check_interval(v)?;
        }
        if let Some(v) = patch.sound_volume {
            next.sound_volume = check_volume(v)?;
        }
        if let Some(theme) = patch.selected_theme {
            next.selected_theme = theme;
        }
        if let Some(sound) = patch.ambient_sound {
            next.ambient_sound = sound;
        }

        Ok(next)
    }
}

pub(crate) fn check_duration(field: &'static str, value: i64) -> Result<u32, ValidationError> {
    if value < 1 {
        return Err(ValidationError::NonPositiveDuration { field, value });
    }
    if value > MAX_DURATION_MINUTES as i64 {
        return Err(ValidationError::DurationTooLong {
            field,
            value,
            max: MAX_DURATION_MINUTES,
        });
    }
    Ok(value as u32)
}

fn check_interval(value: i64) -> Result<u32, ValidationError> {
    if value < 1 {
        return Err(ValidationError::NonPositiveInterval(value));
    }
    if value > MAX_LONG_BREAK_INTERVAL as i64 {
        return Err(ValidationError::IntervalTooLarge(value));
    }
    Ok(value as u32)
}

fn check_volume(value: f32) -> Result<f32, ValidationError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::VolumeOutOfRange(value));
    }
    Ok(value)
}

/// A partial settings update. Numeric fields are signed so that zero and
/// negative input reaches validation instead of failing to parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub focus_duration: Option<i64>,
    pub short_break_duration: Option<i64>,
    pub long_break_duration: Option<i64>,
    pub long_break_interval: Option<i64>,
    pub selected_theme: Option<Theme>,
    pub ambient_sound: Option<AmbientSound>,
    pub sound_volume: Option<f32>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn focus(mut self, minutes: i64) -> Self {
        self.focus_duration = Some(minutes);
        self
    }

    pub fn short_break(mut self, minutes: i64) -> Self {
        self.short_break_duration = Some(minutes);
        self
    }

    pub fn long_break(mut self, minutes: i64) -> Self {
        self.long_break_duration = Some(minutes);
        self
    }

    pub fn interval(mut self, cycles: i64) -> Self {
        self.long_break_interval = Some(cycles);
        self
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.selected_theme = Some(theme);
        self
    }

    pub fn sound(mut self, sound: AmbientSound) -> Self {
        self.ambient_sound = Some(sound);
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.sound_volume = Some(volume);
        self
    }
}

/// Owner of the current settings
pub struct SettingsStore {
    current: Settings,
    store: Option<SharedStore>,
}

impl SettingsStore {
    /// Settings that are never persisted
    pub fn in_memory(settings: Settings) -> Self {
        Self {
            current: settings,
            store: None,
        }
    }

    /// Load settings from `store`, falling back to defaults when the blob
    /// is absent, unreadable or invalid
    pub fn open(store: SharedStore) -> Self {
        let current = match load_settings(store.as_ref()) {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                debug!("No stored settings, using defaults");
                Settings::default()
            }
            Err(e) => {
                warn!("Ignoring stored settings: {}", e);
                Settings::default()
            }
        };

        Self {
            current,
            store: Some(store),
        }
    }

    pub fn get(&self) -> &Settings {
        &self.current
    }

    /// Merge `patch` into the current settings and persist the result
    pub fn update(&mut self, patch: &SettingsPatch) -> Result<Settings, ValidationError> {
        let next = self.current.merged(patch)?;
        self.current = next.clone();
        self.persist();
        Ok(next)
    }

    fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };

        let result = serde_json::to_value(&self.current)
            .map_err(PersistenceError::from)
            .and_then(|value| store.save(SETTINGS_KEY, &value));

        if let Err(e) = result {
            warn!("Failed to persist settings, keeping them in memory: {}", e);
        }
    }
}

fn load_settings(store: &dyn KeyValueStore) -> Result<Option<Settings>, PersistenceError> {
    let Some(value) = store.load(SETTINGS_KEY)? else {
        return Ok(None);
    };

    let settings: Settings = serde_json::from_value(value)?;
    settings
        .validate()
        .map_err(|e| PersistenceError::Corrupt {
            key: SETTINGS_KEY.to_string(),
            reason: e.to_string(),
        })?;

    Ok(Some(settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::{json, Value};
    use std::sync::Arc;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.duration_minutes(Mode::Focus), 25);
        assert_eq!(settings.duration_minutes(Mode::ShortBreak), 5);
        assert_eq!(settings.duration_minutes(Mode::LongBreak), 15);
    }

    #[test]
    fn test_update_then_get_reflects_merge() {
        let mut store = SettingsStore::in_memory(Settings::default());
        let patch = SettingsPatch::default().focus(50).interval(2).theme(Theme::Ocean);

        let updated = store.update(&patch).unwrap();
        assert_eq!(&updated, store.get());
        assert_eq!(store.get().focus_duration, 50);
        assert_eq!(store.get().long_break_interval, 2);
        assert_eq!(store.get().selected_theme, Theme::Ocean);
        // Untouched fields keep their values
        assert_eq!(store.get().short_break_duration, 5);
        assert_eq!(store.get().long_break_duration, 15);
    }

    #[test]
    fn test_zero_duration_rejects_whole_update() {
        let mut store = SettingsStore::in_memory(Settings::default());
        let patch = SettingsPatch::default().focus(40).short_break(0);

        let err = store.update(&patch).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NonPositiveDuration {
                field: "shortBreakDuration",
                value: 0
            }
        );
        assert_eq!(store.get(), &Settings::default());
    }

    #[test]
    fn test_negative_duration_rejected() {
        let mut store = SettingsStore::in_memory(Settings::default());
        let err = store.update(&SettingsPatch::default().long_break(-5)).unwrap_err();
        assert!(matches!(err, ValidationError::NonPositiveDuration { .. }));
        assert_eq!(store.get(), &Settings::default());
    }

    #[test]
    fn test_interval_and_volume_bounds() {
        let settings = Settings::default();
        assert_eq!(
            settings.merged(&SettingsPatch::default().interval(0)),
            Err(ValidationError::NonPositiveInterval(0))
        );
        assert!(settings.merged(&SettingsPatch::default().interval(1)).is_ok());
        assert!(matches!(
            settings.merged(&SettingsPatch::default().volume(1.5)),
            Err(ValidationError::VolumeOutOfRange(_))
        ));
        assert!(matches!(
            settings.merged(&SettingsPatch::default().focus(24 * 60 + 1)),
            Err(ValidationError::DurationTooLong { .. })
        ));
    }

    #[test]
    fn test_update_persists_camel_case_blob() {
        let backing = MemoryStore::shared();
        let mut store = SettingsStore::open(Arc::clone(&backing));
        store.update(&SettingsPatch::default().focus(30)).unwrap();

        let blob = backing.load(SETTINGS_KEY).unwrap().unwrap();
        assert_eq!(blob["focusDuration"], json!(30));
        assert_eq!(blob["ambientSound"], json!("none"));

        let reopened = SettingsStore::open(backing);
        assert_eq!(reopened.get().focus_duration, 30);
    }

    #[test]
    fn test_open_tolerates_missing_and_unknown_fields() {
        let backing = MemoryStore::shared();
        backing
            .save(
                SETTINGS_KEY,
                &json!({"focusDuration": 45, "selectedTheme": "aurora", "futureFlag": true}),
            )
            .unwrap();

        let store = SettingsStore::open(backing);
        assert_eq!(store.get().focus_duration, 45);
        assert_eq!(store.get().short_break_duration, 5);
        assert_eq!(store.get().selected_theme, Theme::Default);
    }

    #[test]
    fn test_open_discards_invalid_blob() {
        let backing = MemoryStore::shared();
        backing
            .save(SETTINGS_KEY, &json!({"focusDuration": 0}))
            .unwrap();
        let store = SettingsStore::open(backing);
        assert_eq!(store.get(), &Settings::default());
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn load(&self, _key: &str) -> Result<Option<Value>, PersistenceError> {
            Err(PersistenceError::Poisoned)
        }

        fn save(&self, _key: &str, _value: &Value) -> Result<(), PersistenceError> {
            Err(PersistenceError::Poisoned)
        }
    }

    #[test]
    fn test_unavailable_store_keeps_working_in_memory() {
        let mut store = SettingsStore::open(Arc::new(BrokenStore));
        assert_eq!(store.get(), &Settings::default());

        let updated = store.update(&SettingsPatch::default().focus(10)).unwrap();
        assert_eq!(updated.focus_duration, 10);
        assert_eq!(store.get().focus_duration, 10);
    }

    #[test]
    fn test_theme_and_sound_parsing() {
        assert_eq!(Theme::parse("Forest"), Some(Theme::Forest));
        assert_eq!(Theme::Dusk.next(), Theme::Default);
        assert_eq!(AmbientSound::parse("white-noise"), Some(AmbientSound::WhiteNoise));
        assert_eq!(AmbientSound::None.track(), None);
        assert_eq!(AmbientSound::Rain.track(), Some(AmbientSound::Rain));
    }
}
