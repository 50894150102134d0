//! Versioned persistence of settings and stats
//!
//! Settings and stats are saved together as one JSON record under
//! [`PROFILE_KEY`]. Fields that are missing or malformed fall back to
//! their defaults one by one. When no record exists yet, the older
//! layout with one key per stat is read and migrated.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::DefaultOnError;

use crate::{
    constants::storage::{PROFILE_KEY, PROFILE_VERSION},
    settings::Settings,
    stats::Stats,
    storage::{self, Storage},
};

/// Everything the game keeps between sessions
#[serde_with::serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Schema version the record was written with
    #[serde_as(as = "DefaultOnError")]
    pub version: u32,
    /// Player configuration
    #[serde_as(as = "DefaultOnError")]
    pub settings: Settings,
    /// Lifetime statistics
    #[serde_as(as = "DefaultOnError")]
    pub stats: Stats,
}

/// Keys of the legacy one-value-per-key layout
mod legacy {
    pub const WINS: &str = "wins";
    pub const LOSSES: &str = "losses";
    pub const STREAK: &str = "streak";
    pub const BEST_STREAK: &str = "bestStreak";
    pub const TOTAL_TIME: &str = "totalTime";
    pub const TOTAL_TIMED_CORRECT: &str = "totalTimedCorrect";
    pub const FASTEST_TIME: &str = "fastestTime";

    pub const ALL: [&str; 7] = [
        WINS,
        LOSSES,
        STREAK,
        BEST_STREAK,
        TOTAL_TIME,
        TOTAL_TIMED_CORRECT,
        FASTEST_TIME,
    ];
}

impl Profile {
    /// Reads the profile from storage, defaulting whatever is unusable
    ///
    /// This never fails: an unreadable record yields the default profile.
    pub fn load<P: Storage>(storage: &P) -> Self {
        let mut profile = match storage.get(PROFILE_KEY) {
            Some(record) => serde_json::from_str(&record).unwrap_or_else(|e| {
                log::warn!("discarding unreadable profile record: {e}");
                Profile::default()
            }),
            None => Self::migrate_legacy(storage).unwrap_or_default(),
        };

        if profile.version > PROFILE_VERSION {
            log::warn!(
                "profile version {} is newer than {PROFILE_VERSION}, reading known fields only",
                profile.version
            );
        }
        profile.version = PROFILE_VERSION;
        profile.settings.clamp(None);
        profile
    }

    /// Writes the profile to storage
    ///
    /// # Errors
    ///
    /// Returns the storage error if the record could not be written.
    pub fn save<P: Storage>(&self, storage: &mut P) -> Result<(), storage::Error> {
        let record = serde_json::to_string(self).map_err(std::io::Error::from)?;
        storage.set(PROFILE_KEY, &record)
    }

    /// Builds a profile from the legacy per-key layout
    ///
    /// Returns `None` when none of the legacy keys are present.
    fn migrate_legacy<P: Storage>(storage: &P) -> Option<Self> {
        fn read<T: std::str::FromStr + Default, P: Storage>(storage: &P, key: &str) -> T {
            storage
                .get(key)
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or_default()
        }

        if legacy::ALL.iter().all(|key| storage.get(key).is_none()) {
            return None;
        }

        let seconds = |key: &str| {
            let value: f64 = read(storage, key);
            Duration::try_from_secs_f64(value).unwrap_or_default()
        };

        let fastest = seconds(legacy::FASTEST_TIME);
        let stats = Stats::from_legacy(
            read(storage, legacy::WINS),
            read(storage, legacy::LOSSES),
            read(storage, legacy::STREAK),
            read(storage, legacy::BEST_STREAK),
            seconds(legacy::TOTAL_TIME),
            read(storage, legacy::TOTAL_TIMED_CORRECT),
            (!fastest.is_zero()).then_some(fastest),
        );

        log::info!("migrated legacy stats: {} wins, {} losses", stats.wins(), stats.losses());

        Some(Self {
            version: 0,
            settings: Settings::default(),
            stats,
        })
    }
}
