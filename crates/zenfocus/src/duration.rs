//! Interval length resolution

use crate::mode::Mode;
use crate::settings::Settings;

/// Length of `mode` in seconds under `settings`
pub fn resolve(mode: Mode, settings: &Settings) -> u32 {
    settings.duration_minutes(mode) * 60
}
