//! Win/loss and timing statistics
//!
//! [`Stats`] is a plain accumulator. The game mutates it from its round
//! transition handlers and persists it after every change; everything
//! else only reads it.

use std::time::Duration;

use enum_map::EnumMap;
use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnError, DurationSecondsWithFrac};

use crate::settings::Difficulty;

/// Lifetime statistics of a player
#[serde_with::serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    /// Correct answers
    #[serde_as(as = "DefaultOnError")]
    wins: u64,
    /// Incorrect answers and timeouts
    #[serde_as(as = "DefaultOnError")]
    losses: u64,
    /// Consecutive correct answers since the last loss
    #[serde_as(as = "DefaultOnError")]
    current_streak: u64,
    /// Highest streak ever reached
    #[serde_as(as = "DefaultOnError")]
    best_streak: u64,
    /// Quickest timed correct answer
    #[serde_as(as = "DefaultOnError<Option<DurationSecondsWithFrac<f64>>>")]
    fastest_correct_time: Option<Duration>,
    /// Sum of every timed correct answer's duration
    #[serde_as(as = "DefaultOnError<DurationSecondsWithFrac<f64>>")]
    total_timed_correct_duration: Duration,
    /// Number of timed correct answers
    #[serde_as(as = "DefaultOnError")]
    timed_correct_count: u64,
    /// Rounds started
    #[serde_as(as = "DefaultOnError")]
    rounds_completed: u64,
    /// Timed correct answers per difficulty
    #[serde_as(as = "DefaultOnError")]
    difficulty_wins: EnumMap<Difficulty, u64>,
}

/// Read-only snapshot of [`Stats`] for display
#[serde_with::serde_as]
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsView {
    /// Correct answers
    pub wins: u64,
    /// Incorrect answers and timeouts
    pub losses: u64,
    /// Current streak
    pub current_streak: u64,
    /// Best streak
    pub best_streak: u64,
    /// Rounds started
    pub rounds_completed: u64,
    /// Wins divided by losses, see [`Stats::win_loss_ratio`]
    pub win_loss_ratio: f64,
    /// Mean duration of timed correct answers, in seconds
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub average_correct_time: Duration,
    /// Fastest timed correct answer, in seconds
    #[serde_as(as = "Option<DurationSecondsWithFrac<f64>>")]
    pub fastest_correct_time: Option<Duration>,
    /// Timed wins per difficulty
    pub difficulty_wins: EnumMap<Difficulty, u64>,
}

impl Stats {
    /// Builds stats from the legacy per-field values
    pub(crate) fn from_legacy(
        wins: u64,
        losses: u64,
        current_streak: u64,
        best_streak: u64,
        total_timed_correct_duration: Duration,
        timed_correct_count: u64,
        fastest_correct_time: Option<Duration>,
    ) -> Self {
        Self {
            wins,
            losses,
            current_streak,
            best_streak: best_streak.max(current_streak),
            fastest_correct_time,
            total_timed_correct_duration,
            timed_correct_count,
            ..Default::default()
        }
    }

    /// Records the start of a round
    pub fn record_round_started(&mut self) {
        self.rounds_completed += 1;
    }

    /// Records a correct answer
    ///
    /// # Arguments
    ///
    /// * `timed` - The elapsed time and difficulty when the round was timed
    pub fn record_win(&mut self, timed: Option<(Duration, Difficulty)>) {
        self.wins += 1;
        self.current_streak += 1;
        self.best_streak = self.best_streak.max(self.current_streak);

        if let Some((elapsed, difficulty)) = timed {
            self.total_timed_correct_duration += elapsed;
            self.timed_correct_count += 1;
            self.difficulty_wins[difficulty] += 1;
            if self
                .fastest_correct_time
                .is_none_or(|fastest| elapsed < fastest)
            {
                self.fastest_correct_time = Some(elapsed);
            }
        }
    }

    /// Records an incorrect answer or a timeout
    pub fn record_loss(&mut self) {
        self.losses += 1;
        self.current_streak = 0;
    }

    /// Returns the number of correct answers
    pub fn wins(&self) -> u64 {
        self.wins
    }

    /// Returns the number of losses
    pub fn losses(&self) -> u64 {
        self.losses
    }

    /// Returns the current streak
    pub fn current_streak(&self) -> u64 {
        self.current_streak
    }

    /// Returns the best streak
    pub fn best_streak(&self) -> u64 {
        self.best_streak
    }

    /// Returns the number of started rounds
    pub fn rounds_completed(&self) -> u64 {
        self.rounds_completed
    }

    /// Returns the fastest timed correct answer, if any
    pub fn fastest_correct_time(&self) -> Option<Duration> {
        self.fastest_correct_time
    }

    /// Returns the timed wins for a difficulty
    pub fn difficulty_wins(&self, difficulty: Difficulty) -> u64 {
        self.difficulty_wins[difficulty]
    }

    /// Returns wins divided by losses
    ///
    /// This is `f64::INFINITY` when there are wins but no losses, and `0`
    /// when there are neither.
    pub fn win_loss_ratio(&self) -> f64 {
        match (self.wins, self.losses) {
            (0, 0) => 0.,
            (_, 0) => f64::INFINITY,
            (wins, losses) => wins as f64 / losses as f64,
        }
    }

    /// Returns the mean duration of timed correct answers, zero if there are none
    pub fn average_correct_time(&self) -> Duration {
        match u32::try_from(self.timed_correct_count) {
            Ok(0) => Duration::ZERO,
            Ok(count) => self.total_timed_correct_duration / count,
            Err(_) => Duration::from_secs_f64(
                self.total_timed_correct_duration.as_secs_f64() / self.timed_correct_count as f64,
            ),
        }
    }

    /// Returns a display snapshot
    pub fn view(&self) -> StatsView {
        StatsView {
            wins: self.wins,
            losses: self.losses,
            current_streak: self.current_streak,
            best_streak: self.best_streak,
            rounds_completed: self.rounds_completed,
            win_loss_ratio: self.win_loss_ratio(),
            average_correct_time: self.average_correct_time(),
            fastest_correct_time: self.fastest_correct_time,
            difficulty_wins: self.difficulty_wins,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_zero() {
        let stats = Stats::default();
        assert_eq!(stats.wins(), 0);
        assert_eq!(stats.losses(), 0);
        assert_eq!(stats.fastest_correct_time(), None);
        assert_eq!(stats.win_loss_ratio(), 0.);
        assert_eq!(stats.average_correct_time(), Duration::ZERO);
    }

    #[test]
    fn test_streak_counts_consecutive_wins() {
        let mut stats = Stats::default();
        for n in 1..=7 {
            stats.record_win(None);
            assert_eq!(stats.current_streak(), n);
            assert!(stats.best_streak() >= n);
        }
    }

    #[test]
    fn test_loss_resets_streak_keeps_best() {
        let mut stats = Stats::default();
        stats.record_win(None);
        stats.record_win(None);
        stats.record_win(None);
        stats.record_loss();

        assert_eq!(stats.current_streak(), 0);
        assert_eq!(stats.best_streak(), 3);

        stats.record_win(None);
        assert_eq!(stats.current_streak(), 1);
        assert_eq!(stats.best_streak(), 3);
    }

    #[test]
    fn test_fastest_is_minimum_of_timed_wins() {
        let mut stats = Stats::default();
        stats.record_win(None);
        assert_eq!(stats.fastest_correct_time(), None);

        for millis in [4200, 1800, 9000, 2500] {
            stats.record_win(Some((Duration::from_millis(millis), Difficulty::Medium)));
        }

        assert_eq!(stats.fastest_correct_time(), Some(Duration::from_millis(1800)));
        assert_eq!(stats.difficulty_wins(Difficulty::Medium), 4);
        assert_eq!(stats.difficulty_wins(Difficulty::Hard), 0);
        assert_eq!(stats.average_correct_time(), Duration::from_millis(4375));
    }

    #[test]
    fn test_win_loss_ratio() {
        let mut stats = Stats::default();
        stats.record_win(None);
        assert_eq!(stats.win_loss_ratio(), f64::INFINITY);

        stats.record_win(None);
        stats.record_win(None);
        stats.record_loss();
        stats.record_loss();
        assert!((stats.win_loss_ratio() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_round_started() {
        let mut stats = Stats::default();
        stats.record_round_started();
        stats.record_round_started();
        assert_eq!(stats.rounds_completed(), 2);
    }

    #[test]
    fn test_malformed_fields_default_individually() {
        let stats: Stats = serde_json::from_str(
            r#"{"wins": 12, "losses": "lots", "best_streak": 4, "fastest_correct_time": "soon"}"#,
        )
        .unwrap();

        assert_eq!(stats.wins(), 12);
        assert_eq!(stats.losses(), 0);
        assert_eq!(stats.best_streak(), 4);
        assert_eq!(stats.fastest_correct_time(), None);
    }

    #[test]
    fn test_serialization_keeps_values() {
        let mut stats = Stats::default();
        stats.record_win(Some((Duration::from_millis(2500), Difficulty::Hard)));
        stats.record_loss();

        let json = serde_json::to_string(&stats).unwrap();
        let restored: Stats = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, stats);
    }

    #[test]
    fn test_view() {
        let mut stats = Stats::default();
        stats.record_win(Some((Duration::from_secs(3), Difficulty::Easy)));

        let view = stats.view();
        assert_eq!(view.wins, 1);
        assert_eq!(view.average_correct_time, Duration::from_secs(3));
        assert_eq!(view.fastest_correct_time, Some(Duration::from_secs(3)));
        assert_eq!(view.difficulty_wins[Difficulty::Easy], 1);
    }
}
