//! # Sound Quiz
//!
//! Core of a sound-guessing quiz. The player hears a clip from a catalog,
//! picks its name among shuffled options and builds up win, streak and
//! timing statistics that persist between sessions. Timed rounds run a
//! countdown driven by scheduled alarms, and stats can be published to an
//! online leaderboard.
//!
//! Rendering and audio playback are left to the caller, who implements
//! [`session::Tunnel`] to receive updates and provides a scheduler for
//! [`AlarmMessage`]s.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]
use derive_where::derive_where;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

pub mod constants;

pub mod catalog;
pub mod game;
pub mod leaderboard;
pub mod options;
pub mod profile;
pub mod session;
pub mod settings;
pub mod stats;
pub mod storage;
pub mod timer;

/// Messages describing the whole state to the presentation layer
///
/// Sent when the presentation layer (re)connects and needs to rebuild
/// its view.
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum SyncMessage {
    /// Round and stats state
    Game(game::SyncMessage),
}

impl SyncMessage {
    /// Converts the sync message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Messages describing a single change
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum UpdateMessage {
    /// Round lifecycle and stats updates
    Game(game::UpdateMessage),
    /// Countdown or stopwatch display updates
    Timer(timer::UpdateMessage),
}

/// Alarm messages for deferred transitions
///
/// The caller schedules them after the requested delay and hands them
/// back to [`game::Game::receive_alarm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::From, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Automatic round transitions
    Game(game::AlarmMessage),
    /// Timer ticks
    Timer(timer::AlarmMessage),
}

impl UpdateMessage {
    /// Converts the update message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// A truncated vector that maintains the exact count while limiting displayed items
///
/// Used for leaderboard listings, which show the top entries while still
/// reporting how many players were ranked.
#[derive(Debug, Clone, Serialize)]
#[derive_where(Default)]
pub struct TruncatedVec<T> {
    /// The exact total count of items
    exact_count: usize,
    /// The truncated list of items (up to the limit)
    items: Vec<T>,
}

impl<T: Clone> TruncatedVec<T> {
    /// Creates a new truncated vector from an iterator
    ///
    /// # Arguments
    ///
    /// * `list` - An iterator over items to include
    /// * `limit` - Maximum number of items to include in the truncated vector
    /// * `exact_count` - The exact total count of items (may be larger than limit)
    ///
    /// # Returns
    ///
    /// A new `TruncatedVec` containing up to `limit` items from the iterator
    pub fn new<I: Iterator<Item = T>>(list: I, limit: usize, exact_count: usize) -> Self {
        let items = list.take(limit).collect_vec();
        Self { exact_count, items }
    }

    /// Maps a function over the items in the truncated vector
    ///
    /// # Arguments
    ///
    /// * `f` - Function to apply to each item
    ///
    /// # Returns
    ///
    /// A new `TruncatedVec` with the function applied to each item
    pub fn map<F, U>(self, f: F) -> TruncatedVec<U>
    where
        F: Fn(T) -> U,
    {
        TruncatedVec {
            exact_count: self.exact_count,
            items: self.items.into_iter().map(f).collect_vec(),
        }
    }

    /// Returns the exact count of items
    pub fn exact_count(&self) -> usize {
        self.exact_count
    }

    /// Returns the truncated items
    pub fn items(&self) -> &[T] {
        &self.items
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_vec_new() {
        let data = vec![1, 2, 3, 4, 5];
        let truncated = TruncatedVec::new(data.into_iter(), 3, 5);

        assert_eq!(truncated.exact_count(), 5);
        assert_eq!(truncated.items(), &[1, 2, 3]);
    }

    #[test]
    fn test_truncated_vec_new_limit_larger_than_items() {
        let data = vec![1, 2, 3];
        let truncated = TruncatedVec::new(data.into_iter(), 5, 3);

        assert_eq!(truncated.exact_count(), 3);
        assert_eq!(truncated.items(), &[1, 2, 3]);
    }

    #[test]
    fn test_truncated_vec_new_empty() {
        let data: Vec<i32> = vec![];
        let truncated = TruncatedVec::new(data.into_iter(), 5, 0);

        assert_eq!(truncated.exact_count(), 0);
        let empty: &[i32] = &[];
        assert_eq!(truncated.items(), empty);
    }

    #[test]
    fn test_truncated_vec_map() {
        let data = vec![1, 2, 3];
        let truncated = TruncatedVec::new(data.into_iter(), 3, 5);
        let mapped = truncated.map(|x| x * 2);

        assert_eq!(mapped.exact_count(), 5);
        assert_eq!(mapped.items(), &[2, 4, 6]);
    }

    #[test]
    fn test_truncated_vec_map_string() {
        let data = vec![1, 2, 3];
        let truncated = TruncatedVec::new(data.into_iter(), 2, 3);
        let mapped = truncated.map(|x| format!("item_{x}"));

        assert_eq!(mapped.exact_count(), 3);
        assert_eq!(mapped.items(), &["item_1", "item_2"]);
    }

    #[test]
    fn test_sync_message_to_message() {
        let stats = crate::stats::Stats::default().view();
        let sync_msg = SyncMessage::Game(crate::game::SyncMessage::AwaitingStart { stats });
        let json_str = sync_msg.to_message();

        assert!(json_str.contains("Game"));
        assert!(json_str.contains("AwaitingStart"));
        assert!(json_str.contains("\"wins\":0"));
    }

    #[test]
    fn test_update_message_to_message() {
        let update_msg = UpdateMessage::Timer(crate::timer::UpdateMessage::Countdown {
            remaining: std::time::Duration::from_millis(1500),
        });
        let json_str = update_msg.to_message();

        assert_eq!(json_str, r#"{"Timer":{"Countdown":{"remaining":1.5}}}"#);
    }

    #[test]
    fn test_alarm_message_round_trip() {
        let alarm: AlarmMessage = crate::timer::AlarmMessage::Tick { generation: 3 }.into();
        let json = serde_json::to_string(&alarm).unwrap();
        let parsed: AlarmMessage = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, alarm);
        assert_eq!(json, r#"{"Timer":{"Tick":{"generation":3}}}"#);
    }
}
