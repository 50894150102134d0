//! Online leaderboard client
//!
//! Players can publish their stats to a shared document store with one
//! collection per ranking [`Category`]. Each player keeps a single
//! document per category, holding the best value they ever submitted.
//! The store itself is abstracted behind [`DocumentStore`], so the client
//! never depends on a particular backend.

use std::{cmp::Ordering, collections::HashMap};

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use web_time::SystemTime;

use crate::{
    TruncatedVec,
    constants::leaderboard::{COLLECTION_PREFIX, MAX_ENTRIES, MAX_USERNAME_LENGTH},
    settings::Difficulty,
    stats::Stats,
};

/// A ranking dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Total correct answers
    Wins,
    /// Fastest timed correct answer, in seconds
    Fastest,
    /// Best streak
    Streak,
    /// Timed wins on easy
    Easy,
    /// Timed wins on medium
    Medium,
    /// Timed wins on hard
    Hard,
}

/// Direction in which a category ranks its values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Lower is better
    Ascending,
    /// Higher is better
    Descending,
}

impl Category {
    /// Every category, in display order
    pub const ALL: [Category; 6] = [
        Category::Wins,
        Category::Fastest,
        Category::Streak,
        Category::Easy,
        Category::Medium,
        Category::Hard,
    ];

    /// Returns the category counting timed wins on `difficulty`
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Category::Easy,
            Difficulty::Medium => Category::Medium,
            Difficulty::Hard => Category::Hard,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Category::Wins => "wins",
            Category::Fastest => "fastest",
            Category::Streak => "streak",
            Category::Easy => "easy",
            Category::Medium => "medium",
            Category::Hard => "hard",
        }
    }

    /// Returns the name of the collection holding this category
    pub fn collection(self) -> String {
        format!("{COLLECTION_PREFIX}{}", self.name())
    }

    /// Returns the ranking direction; only `Fastest` ranks ascending
    pub fn order(self) -> Order {
        match self {
            Category::Fastest => Order::Ascending,
            _ => Order::Descending,
        }
    }

    /// Compares two values so that the better one sorts first
    pub fn compare(self, a: f64, b: f64) -> Ordering {
        match self.order() {
            Order::Ascending => a.total_cmp(&b),
            Order::Descending => b.total_cmp(&a),
        }
    }

    /// Returns whether `candidate` beats `current`
    pub fn is_better(self, candidate: f64, current: f64) -> bool {
        self.compare(candidate, current) == Ordering::Less
    }

    /// Formats a value for display: `3.40s` for times, `12` for counts
    pub fn format_value(self, value: f64) -> String {
        match self {
            Category::Fastest => format!("{value:.2}s"),
            _ => format!("{value:.0}"),
        }
    }

    fn accepts(self, value: f64) -> bool {
        match self {
            Category::Fastest => value.is_finite() && value > 0.,
            _ => value.is_finite() && value >= 0.,
        }
    }
}

/// One player's standing in a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Sanitized username, also the document key
    pub username: String,
    /// Best value submitted
    pub value: f64,
    /// When the value was submitted
    pub timestamp: SystemTime,
}

/// Failures reported by a document store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached
    #[error("network error: {0}")]
    Network(String),
    /// The store refused the operation
    #[error("permission denied")]
    PermissionDenied,
    /// Too many requests were made
    #[error("rate limited")]
    RateLimited,
}

/// Errors returned by the leaderboard client
///
/// All of them are transient from the player's point of view: local play
/// and stats are unaffected and the operation can be retried.
#[derive(Error, Debug)]
pub enum Error {
    /// Nothing usable remained after sanitizing the username
    #[error("invalid username: {0}")]
    InvalidUsername(garde::Report),
    /// The value cannot be ranked in this category
    #[error("{value} is not a valid {category:?} value")]
    InvalidValue {
        /// The category submitted to
        category: Category,
        /// The rejected value
        value: f64,
    },
    /// The document store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A document-oriented store with one collection per category
pub trait DocumentStore {
    /// Reads the document stored under `key`
    ///
    /// # Errors
    ///
    /// Returns the store failure, if any.
    fn get(&self, collection: &str, key: &str) -> Result<Option<LeaderboardEntry>, StoreError>;

    /// Writes `entry` under `key`, replacing any previous document
    ///
    /// # Errors
    ///
    /// Returns the store failure, if any.
    fn set(&mut self, collection: &str, key: &str, entry: LeaderboardEntry)
    -> Result<(), StoreError>;

    /// Returns documents ordered by value, at most `limit` of them when set
    ///
    /// # Errors
    ///
    /// Returns the store failure, if any.
    fn query(
        &self,
        collection: &str,
        order: Order,
        limit: Option<usize>,
    ) -> Result<Vec<LeaderboardEntry>, StoreError>;
}

/// A document store kept in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: HashMap<String, HashMap<String, LeaderboardEntry>>,
}

impl MemoryStore {
    /// Returns the number of documents in `collection`
    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, HashMap::len)
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: &str, key: &str) -> Result<Option<LeaderboardEntry>, StoreError> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|documents| documents.get(key))
            .cloned())
    }

    fn set(
        &mut self,
        collection: &str,
        key: &str,
        entry: LeaderboardEntry,
    ) -> Result<(), StoreError> {
        self.collections
            .entry(collection.to_owned())
            .or_default()
            .insert(key.to_owned(), entry);
        Ok(())
    }

    fn query(
        &self,
        collection: &str,
        order: Order,
        limit: Option<usize>,
    ) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let Some(documents) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(documents
            .values()
            .sorted_by(|a, b| {
                let by_value = match order {
                    Order::Ascending => a.value.total_cmp(&b.value),
                    Order::Descending => b.value.total_cmp(&a.value),
                };
                by_value.then(a.timestamp.cmp(&b.timestamp))
            })
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect_vec())
    }
}

/// A username as stored in the leaderboard
#[derive(Debug, Validate)]
#[garde(transparent)]
struct Username(
    #[garde(
        length(chars, min = 1, max = MAX_USERNAME_LENGTH),
        custom(|v, _| validate_username_charset(v))
    )]
    String,
);

fn validate_username_charset(val: &str) -> garde::Result {
    if val.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(garde::Error::new(
            "username may only contain letters, digits and underscores",
        ))
    }
}

/// Turns a display username into a document key
///
/// Whitespace becomes `_`, other characters outside `[A-Za-z0-9_]` are
/// dropped and the result is cut to [`MAX_USERNAME_LENGTH`] characters.
///
/// # Errors
///
/// Returns [`Error::InvalidUsername`] if nothing remains.
pub fn sanitize_username(raw: &str) -> Result<String, Error> {
    let username = Username(
        raw.trim()
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .take(MAX_USERNAME_LENGTH)
            .collect(),
    );
    username.validate().map_err(Error::InvalidUsername)?;
    Ok(username.0)
}

/// Submits and reads rankings through a [`DocumentStore`]
///
/// The client only ever reads local [`Stats`]; a failed call leaves them
/// exactly as they were.
#[derive(Debug, Default)]
pub struct LeaderboardClient<D: DocumentStore> {
    store: D,
}

impl<D: DocumentStore> LeaderboardClient<D> {
    /// Creates a client for `store`
    pub fn new(store: D) -> Self {
        Self { store }
    }

    /// Returns the underlying store
    pub fn store(&self) -> &D {
        &self.store
    }

    /// Submits a value, keeping the player's best ever value
    ///
    /// # Returns
    ///
    /// The entry now stored for the player, which is the previous one if
    /// it was at least as good.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidUsername`] - The username sanitizes to nothing
    /// * [`Error::InvalidValue`] - The value is negative, not finite, or
    ///   a non-positive time
    /// * [`Error::Store`] - The store failed
    pub fn submit(
        &mut self,
        category: Category,
        username: &str,
        value: f64,
    ) -> Result<LeaderboardEntry, Error> {
        if !category.accepts(value) {
            return Err(Error::InvalidValue { category, value });
        }
        let key = sanitize_username(username)?;
        let collection = category.collection();

        if let Some(existing) = self.store.get(&collection, &key)? {
            if !category.is_better(value, existing.value) {
                log::debug!(
                    "{key} keeps {} in {collection}",
                    category.format_value(existing.value)
                );
                return Ok(existing);
            }
        }

        let entry = LeaderboardEntry {
            username: key.clone(),
            value,
            timestamp: SystemTime::now(),
        };
        self.store.set(&collection, &key, entry.clone())?;
        log::info!(
            "{key} submitted {} to {collection}",
            category.format_value(value)
        );

        Ok(entry)
    }

    /// Submits every category the stats have a value for
    ///
    /// Counts of zero and an unset fastest time are skipped. Submission
    /// stops at the first failure.
    ///
    /// # Returns
    ///
    /// The categories submitted
    ///
    /// # Errors
    ///
    /// The first error returned by [`LeaderboardClient::submit`].
    pub fn submit_stats(&mut self, username: &str, stats: &Stats) -> Result<Vec<Category>, Error> {
        let values = [
            (Category::Wins, Some(stats.wins() as f64)),
            (
                Category::Fastest,
                stats.fastest_correct_time().map(|t| t.as_secs_f64()),
            ),
            (Category::Streak, Some(stats.best_streak() as f64)),
        ]
        .into_iter()
        .chain(Difficulty::ALL.into_iter().map(|difficulty| {
            (
                Category::for_difficulty(difficulty),
                Some(stats.difficulty_wins(difficulty) as f64),
            )
        }))
        .filter_map(|(category, value)| value.filter(|v| *v > 0.).map(|v| (category, v)));

        let mut submitted = Vec::new();
        for (category, value) in values {
            self.submit(category, username, value)?;
            submitted.push(category);
        }
        Ok(submitted)
    }

    /// Returns the best `limit` players of a category
    ///
    /// Entries are deduplicated by username, keeping each player's best
    /// value, and ranked best first. The exact count is the number of
    /// distinct players ranked in the category.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the store failed.
    pub fn fetch_top(
        &self,
        category: Category,
        limit: usize,
    ) -> Result<TruncatedVec<(String, f64)>, Error> {
        let ranked = self
            .store
            .query(&category.collection(), category.order(), None)?
            .into_iter()
            .sorted_by(|a, b| category.compare(a.value, b.value))
            .unique_by(|entry| entry.username.clone())
            .map(|entry| (entry.username, entry.value))
            .collect_vec();

        let count = ranked.len();
        Ok(TruncatedVec::new(ranked.into_iter(), limit, count))
    }

    /// Returns the default listing of a category
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the store failed.
    pub fn fetch_default(&self, category: Category) -> Result<TruncatedVec<(String, f64)>, Error> {
        self.fetch_top(category, MAX_ENTRIES)
    }

    /// Returns the default listing of a category with display values
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the store failed.
    pub fn fetch_formatted(
        &self,
        category: Category,
    ) -> Result<TruncatedVec<(String, String)>, Error> {
        Ok(self
            .fetch_default(category)?
            .map(|(username, value)| (username, category.format_value(value))))
    }

    /// Returns the leader of a category, if anyone submitted
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the store failed.
    pub fn top_user(&self, category: Category) -> Result<Option<(String, f64)>, Error> {
        Ok(self.fetch_top(category, 1)?.items().first().cloned())
    }

    /// Returns the categories `username` currently leads
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidUsername`] - The username sanitizes to nothing
    /// * [`Error::Store`] - The store failed
    pub fn trophies(&self, username: &str) -> Result<Vec<Category>, Error> {
        let key = sanitize_username(username)?;
        let mut trophies = Vec::new();
        for category in Category::ALL {
            if self
                .top_user(category)?
                .is_some_and(|(leader, _)| leader == key)
            {
                trophies.push(category);
            }
        }
        Ok(trophies)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::time::Duration;

    use super::*;

    struct FailingStore(StoreError);

    impl DocumentStore for FailingStore {
        fn get(&self, _: &str, _: &str) -> Result<Option<LeaderboardEntry>, StoreError> {
            Err(self.0.clone())
        }

        fn set(&mut self, _: &str, _: &str, _: LeaderboardEntry) -> Result<(), StoreError> {
            Err(self.0.clone())
        }

        fn query(
            &self,
            _: &str,
            _: Order,
            _: Option<usize>,
        ) -> Result<Vec<LeaderboardEntry>, StoreError> {
            Err(self.0.clone())
        }
    }

    fn client() -> LeaderboardClient<MemoryStore> {
        LeaderboardClient::new(MemoryStore::default())
    }

    fn entry(username: &str, value: f64) -> LeaderboardEntry {
        LeaderboardEntry {
            username: username.to_string(),
            value,
            timestamp: SystemTime::now(),
        }
    }

    #[test]
    fn test_category_collections() {
        assert_eq!(Category::Wins.collection(), "leaderboard_wins");
        assert_eq!(Category::Hard.collection(), "leaderboard_hard");
        assert_eq!(Category::Fastest.order(), Order::Ascending);
        assert_eq!(Category::Streak.order(), Order::Descending);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(Category::Fastest.format_value(3.4), "3.40s");
        assert_eq!(Category::Wins.format_value(12.), "12");
    }

    #[test]
    fn test_sanitize_username() {
        assert_eq!(sanitize_username("Pale Knight 42").unwrap(), "Pale_Knight_42");
        assert_eq!(sanitize_username("  grub!?  ").unwrap(), "grub");
        assert_eq!(
            sanitize_username(&"x".repeat(80)).unwrap().len(),
            MAX_USERNAME_LENGTH
        );
        assert!(matches!(
            sanitize_username("!!!"),
            Err(Error::InvalidUsername(_))
        ));
        assert!(matches!(sanitize_username(""), Err(Error::InvalidUsername(_))));
    }

    #[test]
    fn test_username_validation() {
        assert!(Username("ok_name_1".to_string()).validate().is_ok());
        assert!(Username("no spaces".to_string()).validate().is_err());
        assert!(Username(String::new()).validate().is_err());
        assert!(Username("a".repeat(51)).validate().is_err());
    }

    #[test]
    fn test_submit_keeps_best_ever() {
        let mut client = client();

        client.submit(Category::Wins, "hornet", 10.).unwrap();
        let kept = client.submit(Category::Wins, "hornet", 4.).unwrap();
        assert_eq!(kept.value, 10.);

        let improved = client.submit(Category::Wins, "hornet", 12.).unwrap();
        assert_eq!(improved.value, 12.);
        assert_eq!(client.store().len("leaderboard_wins"), 1);
    }

    #[test]
    fn test_fastest_keeps_lowest() {
        let mut client = client();

        client.submit(Category::Fastest, "hornet", 2.5).unwrap();
        client.submit(Category::Fastest, "hornet", 4.0).unwrap();
        client.submit(Category::Fastest, "hornet", 1.9).unwrap();

        let top = client.fetch_top(Category::Fastest, 10).unwrap();
        assert_eq!(top.items(), &[("hornet".to_string(), 1.9)]);
    }

    #[test]
    fn test_submit_rejects_invalid_values() {
        let mut client = client();
        assert!(matches!(
            client.submit(Category::Fastest, "hornet", 0.),
            Err(Error::InvalidValue { .. })
        ));
        assert!(matches!(
            client.submit(Category::Wins, "hornet", f64::NAN),
            Err(Error::InvalidValue { .. })
        ));
        assert!(matches!(
            client.submit(Category::Streak, "hornet", -1.),
            Err(Error::InvalidValue { .. })
        ));
        assert_eq!(client.store().len("leaderboard_wins"), 0);
    }

    #[test]
    fn test_fetch_top_ranks_by_category() {
        let mut client = client();
        for (name, wins, time) in [("a", 5., 3.0), ("b", 9., 1.5), ("c", 7., 2.0)] {
            client.submit(Category::Wins, name, wins).unwrap();
            client.submit(Category::Fastest, name, time).unwrap();
        }

        let wins = client.fetch_top(Category::Wins, 2).unwrap();
        assert_eq!(
            wins.items(),
            &[("b".to_string(), 9.), ("c".to_string(), 7.)]
        );

        let fastest = client.fetch_top(Category::Fastest, 10).unwrap();
        let names = fastest.items().iter().map(|(n, _)| n.as_str()).collect_vec();
        assert_eq!(names, ["b", "c", "a"]);
        assert_eq!(fastest.exact_count(), 3);

        let formatted = client.fetch_formatted(Category::Fastest).unwrap();
        assert_eq!(formatted.items()[0], ("b".to_string(), "1.50s".to_string()));
    }

    #[test]
    fn test_fetch_top_deduplicates_by_username() {
        let mut store = MemoryStore::default();
        let collection = Category::Streak.collection();
        store.set(&collection, "old_doc", entry("zote", 3.)).unwrap();
        store.set(&collection, "new_doc", entry("zote", 8.)).unwrap();
        store.set(&collection, "other", entry("quirrel", 5.)).unwrap();

        let client = LeaderboardClient::new(store);
        let top = client.fetch_top(Category::Streak, 10).unwrap();

        assert_eq!(
            top.items(),
            &[("zote".to_string(), 8.), ("quirrel".to_string(), 5.)]
        );
    }

    #[test]
    fn test_fetch_top_counts_every_ranked_player() {
        let mut client = client();
        for i in 0..40 {
            client
                .submit(Category::Wins, &format!("player_{i}"), f64::from(i))
                .unwrap();
        }

        let top = client.fetch_default(Category::Wins).unwrap();
        assert_eq!(top.items().len(), MAX_ENTRIES);
        assert_eq!(top.exact_count(), 40);
        assert_eq!(top.items()[0], ("player_39".to_string(), 39.));
        assert_eq!(top.items()[MAX_ENTRIES - 1].1, 15.);
    }

    #[test]
    fn test_fetch_top_fills_limit_despite_duplicates() {
        let mut store = MemoryStore::default();
        let collection = Category::Wins.collection();
        store.set(&collection, "zote_1", entry("zote", 9.)).unwrap();
        store.set(&collection, "zote_2", entry("zote", 8.)).unwrap();
        store.set(&collection, "zote_3", entry("zote", 7.)).unwrap();
        store.set(&collection, "myla", entry("myla", 6.)).unwrap();
        store.set(&collection, "elderbug", entry("elderbug", 5.)).unwrap();

        let client = LeaderboardClient::new(store);
        let top = client.fetch_top(Category::Wins, 2).unwrap();

        assert_eq!(
            top.items(),
            &[("zote".to_string(), 9.), ("myla".to_string(), 6.)]
        );
        assert_eq!(top.exact_count(), 3);
    }

    #[test]
    fn test_memory_store_query_limit() {
        let mut store = MemoryStore::default();
        for (name, value) in [("a", 3.), ("b", 1.), ("c", 2.)] {
            store.set("times", name, entry(name, value)).unwrap();
        }

        let limited = store.query("times", Order::Ascending, Some(2)).unwrap();
        let values = limited.iter().map(|e| e.value).collect_vec();
        assert_eq!(values, [1., 2.]);
        assert_eq!(store.query("times", Order::Descending, None).unwrap().len(), 3);
        assert!(store.query("missing", Order::Descending, None).unwrap().is_empty());
    }

    #[test]
    fn test_submit_stats_and_trophies() {
        let mut stats = Stats::default();
        stats.record_win(Some((Duration::from_millis(2500), Difficulty::Hard)));
        stats.record_win(None);

        let mut client = client();
        let submitted = client.submit_stats("The Knight", &stats).unwrap();
        assert_eq!(
            submitted,
            [
                Category::Wins,
                Category::Fastest,
                Category::Streak,
                Category::Hard
            ]
        );

        client.submit(Category::Wins, "grimm", 50.).unwrap();

        assert_eq!(
            client.top_user(Category::Fastest).unwrap(),
            Some(("The_Knight".to_string(), 2.5))
        );
        assert_eq!(
            client.trophies("The Knight").unwrap(),
            [Category::Fastest, Category::Streak, Category::Hard]
        );
        assert_eq!(client.trophies("grimm").unwrap(), [Category::Wins]);
        assert_eq!(client.top_user(Category::Easy).unwrap(), None);
    }

    #[test]
    fn test_store_failure_leaves_stats_untouched() {
        let mut stats = Stats::default();
        stats.record_win(Some((Duration::from_secs(4), Difficulty::Easy)));
        stats.record_loss();
        let before = stats.clone();

        let mut client = LeaderboardClient::new(FailingStore(StoreError::Network(
            "connection reset".to_string(),
        )));
        let result = client.submit_stats("hornet", &stats);

        assert!(matches!(result, Err(Error::Store(StoreError::Network(_)))));
        assert_eq!(stats, before);

        let client = LeaderboardClient::new(FailingStore(StoreError::RateLimited));
        assert!(matches!(
            client.fetch_top(Category::Wins, 5),
            Err(Error::Store(StoreError::RateLimited))
        ));
    }
}
