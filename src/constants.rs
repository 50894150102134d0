//! Configuration constants for the sound quiz
//!
//! This module contains the limits, timings and storage keys used
//! throughout the game so that every component agrees on the same
//! boundaries.

/// Catalog loading constants
pub mod catalog {
    /// Conventional relative path of the clip manifest
    pub const MANIFEST_PATH: &str = "sounds/list.json";
    /// File extensions stripped when turning a clip identifier into a display name
    pub const AUDIO_EXTENSIONS: [&str; 7] = ["ogg", "wav", "mp3", "flac", "m4a", "opus", "webm"];
}

/// Option generation constants
pub mod options {
    /// Minimum number of options shown to the player
    pub const MIN_OPTION_COUNT: usize = 5;
    /// Option count used until the player picks another one
    pub const DEFAULT_OPTION_COUNT: usize = 5;
}

/// Round timer constants
pub mod timer {
    use std::time::Duration;

    /// Interval between two timer ticks
    pub const TICK_INTERVAL: Duration = Duration::from_millis(100);
    /// Countdown length in easy mode
    pub const EASY_DURATION: Duration = Duration::from_secs(45);
    /// Countdown length in medium mode
    pub const MEDIUM_DURATION: Duration = Duration::from_secs(30);
    /// Countdown length in hard mode
    pub const HARD_DURATION: Duration = Duration::from_secs(15);
}

/// Round flow constants
pub mod round {
    use std::time::Duration;

    /// Delay between an answer and the automatically started next round
    pub const NEXT_ROUND_DELAY: Duration = Duration::from_millis(1500);
}

/// Durable storage constants
pub mod storage {
    /// Key of the versioned profile record
    pub const PROFILE_KEY: &str = "profile";
    /// Current version of the profile record schema
    pub const PROFILE_VERSION: u32 = 1;
}

/// Leaderboard constants
pub mod leaderboard {
    /// Maximum length of a submitted username
    pub const MAX_USERNAME_LENGTH: usize = 50;
    /// Number of entries shown per leaderboard
    pub const MAX_ENTRIES: usize = 25;
    /// Prefix of every leaderboard collection name
    pub const COLLECTION_PREFIX: &str = "leaderboard_";
}
