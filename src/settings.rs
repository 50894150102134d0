//! Player configuration
//!
//! Settings are changed only by explicit player actions and are read by
//! the game when a round starts. Out-of-range values are clamped rather
//! than rejected.

use std::time::Duration;

use enum_map::Enum;
use serde::{Deserialize, Serialize};
use serde_with::DefaultOnError;

use crate::constants::{
    options::{DEFAULT_OPTION_COUNT, MIN_OPTION_COUNT},
    timer::{EASY_DURATION, HARD_DURATION, MEDIUM_DURATION},
};

/// Timed mode difficulty, selecting the countdown length
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// 45 seconds per round
    #[default]
    Easy,
    /// 30 seconds per round
    Medium,
    /// 15 seconds per round
    Hard,
}

impl Difficulty {
    /// All difficulties, easiest first
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Returns the countdown length for this difficulty
    pub fn duration(self) -> Duration {
        match self {
            Difficulty::Easy => EASY_DURATION,
            Difficulty::Medium => MEDIUM_DURATION,
            Difficulty::Hard => HARD_DURATION,
        }
    }
}

/// The player's game configuration
#[serde_with::serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Requested number of options per round
    #[serde_as(as = "DefaultOnError")]
    option_count: usize,
    /// Whether options are shown as a searchable list instead of a dropdown
    #[serde_as(as = "DefaultOnError")]
    search_mode: bool,
    /// Whether rounds run against a countdown
    #[serde_as(as = "DefaultOnError")]
    timer_enabled: bool,
    /// Countdown length used when the timer is enabled
    #[serde_as(as = "DefaultOnError")]
    timer_difficulty: Difficulty,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            option_count: DEFAULT_OPTION_COUNT,
            search_mode: false,
            timer_enabled: false,
            timer_difficulty: Difficulty::default(),
        }
    }
}

/// A partial change to [`Settings`]; `None` fields are left untouched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SettingsUpdate {
    /// New requested option count
    pub option_count: Option<usize>,
    /// New search mode
    pub search_mode: Option<bool>,
    /// Enable or disable the timer
    pub timer_enabled: Option<bool>,
    /// New timer difficulty
    pub timer_difficulty: Option<Difficulty>,
}

impl Settings {
    /// Returns the requested option count
    pub fn option_count(&self) -> usize {
        self.option_count
    }

    /// Returns whether search mode is on
    pub fn search_mode(&self) -> bool {
        self.search_mode
    }

    /// Returns whether the timer is on
    pub fn timer_enabled(&self) -> bool {
        self.timer_enabled
    }

    /// Returns the selected difficulty
    pub fn timer_difficulty(&self) -> Difficulty {
        self.timer_difficulty
    }

    /// Returns the difficulty of timed rounds, `None` when untimed
    pub fn active_difficulty(&self) -> Option<Difficulty> {
        self.timer_enabled.then_some(self.timer_difficulty)
    }

    /// Applies an update, clamping the option count
    ///
    /// # Arguments
    ///
    /// * `update` - The fields to change
    /// * `max_option_count` - Upper bound for the option count, usually the
    ///   catalog size; `None` when no catalog is loaded yet
    ///
    /// # Returns
    ///
    /// `true` if anything changed
    pub fn apply(&mut self, update: SettingsUpdate, max_option_count: Option<usize>) -> bool {
        let before = *self;

        if let Some(option_count) = update.option_count {
            self.option_count = option_count;
        }
        if let Some(search_mode) = update.search_mode {
            self.search_mode = search_mode;
        }
        if let Some(timer_enabled) = update.timer_enabled {
            self.timer_enabled = timer_enabled;
        }
        if let Some(timer_difficulty) = update.timer_difficulty {
            self.timer_difficulty = timer_difficulty;
        }
        self.clamp(max_option_count);

        *self != before
    }

    /// Clamps the option count into `[MIN_OPTION_COUNT, max_option_count]`
    ///
    /// The lower bound wins when the upper bound is smaller than it.
    pub fn clamp(&mut self, max_option_count: Option<usize>) {
        let requested = self.option_count;
        let mut clamped = requested;
        if let Some(max) = max_option_count {
            clamped = clamped.min(max);
        }
        clamped = clamped.max(MIN_OPTION_COUNT);

        if clamped != requested {
            log::debug!("option count {requested} clamped to {clamped}");
            self.option_count = clamped;
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_durations() {
        assert_eq!(Difficulty::Easy.duration(), Duration::from_secs(45));
        assert_eq!(Difficulty::Medium.duration(), Duration::from_secs(30));
        assert_eq!(Difficulty::Hard.duration(), Duration::from_secs(15));
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.option_count(), DEFAULT_OPTION_COUNT);
        assert!(!settings.search_mode());
        assert!(!settings.timer_enabled());
        assert_eq!(settings.active_difficulty(), None);
    }

    #[test]
    fn test_apply_partial_update() {
        let mut settings = Settings::default();
        let changed = settings.apply(
            SettingsUpdate {
                timer_enabled: Some(true),
                timer_difficulty: Some(Difficulty::Hard),
                ..Default::default()
            },
            Some(20),
        );

        assert!(changed);
        assert_eq!(settings.active_difficulty(), Some(Difficulty::Hard));
        assert!(!settings.search_mode());

        assert!(!settings.apply(SettingsUpdate::default(), Some(20)));
    }

    #[test]
    fn test_option_count_clamped() {
        let mut settings = Settings::default();

        settings.apply(
            SettingsUpdate {
                option_count: Some(2),
                ..Default::default()
            },
            Some(20),
        );
        assert_eq!(settings.option_count(), MIN_OPTION_COUNT);

        settings.apply(
            SettingsUpdate {
                option_count: Some(50),
                ..Default::default()
            },
            Some(20),
        );
        assert_eq!(settings.option_count(), 20);

        settings.apply(
            SettingsUpdate {
                option_count: Some(50),
                ..Default::default()
            },
            None,
        );
        assert_eq!(settings.option_count(), 50);
    }

    #[test]
    fn test_malformed_fields_default() {
        let settings: Settings = serde_json::from_str(
            r#"{"option_count": "many", "search_mode": true, "timer_difficulty": "nightmare"}"#,
        )
        .unwrap();

        assert_eq!(settings.option_count(), 0);
        assert!(settings.search_mode());
        assert_eq!(settings.timer_difficulty(), Difficulty::Easy);
    }

    #[test]
    fn test_difficulty_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Difficulty::Medium).unwrap(),
            "\"medium\""
        );
    }
}
