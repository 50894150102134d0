//! Round lifecycle and scoring
//!
//! This module contains the [`Game`] context that owns the catalog,
//! settings, stats, the current round and its timer. A presentation layer
//! drives it through explicit commands (`start_round`, `submit_guess`,
//! `update_settings`, `next_round`) and feeds scheduled alarms back
//! through [`Game::receive_alarm`]. Every change the player should see is
//! sent through a [`Tunnel`].

use std::{
    fmt::{Debug, Display},
    str::FromStr,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay, skip_serializing_none};
use thiserror::Error;
use uuid::Uuid;
use web_time::SystemTime;

use crate::{
    catalog::Catalog,
    constants::round::NEXT_ROUND_DELAY,
    options::{format_name, generate_options},
    profile::Profile,
    session::Tunnel,
    settings::{Difficulty, Settings, SettingsUpdate},
    stats::{Stats, StatsView},
    storage::Storage,
    timer::{self, RoundTimer, TickOutcome},
};

/// A unique identifier for a round
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct RoundId(Uuid);

impl RoundId {
    /// Creates a new random round ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RoundId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for RoundId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// How an answered round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The guess matched the clip
    Correct,
    /// The guess named another clip
    Incorrect,
}

/// Where the game is in the round lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// No round has been started yet
    #[default]
    AwaitingStart,
    /// A clip is available and a guess is expected
    SoundPresented,
    /// The player guessed
    Answered(Outcome),
    /// The countdown ran out before a guess
    TimedOut,
}

/// One question/answer cycle
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct Round {
    id: RoundId,
    /// Identifier of the clip to play
    clip: String,
    /// Display name of the clip
    correct_name: String,
    /// Shuffled candidate names, including `correct_name`
    options: Vec<String>,
    /// Whether options are offered as a searchable list
    search_mode: bool,
    started_at: SystemTime,
    /// Difficulty of the countdown, `None` for untimed rounds
    difficulty: Option<Difficulty>,
}

impl Round {
    /// Returns the round ID
    pub fn id(&self) -> RoundId {
        self.id
    }

    /// Returns the clip identifier to play
    pub fn clip(&self) -> &str {
        &self.clip
    }

    /// Returns the display name of the correct answer
    pub fn correct_name(&self) -> &str {
        &self.correct_name
    }

    /// Returns the options offered to the player
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Returns when the round started
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// Returns the countdown length, `None` for untimed rounds
    pub fn timer_duration(&self) -> Option<Duration> {
        self.difficulty.map(Difficulty::duration)
    }

    /// Returns the timed difficulty, `None` for untimed rounds
    pub fn difficulty(&self) -> Option<Difficulty> {
        self.difficulty
    }
}

/// Errors returned by game commands
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No catalog has been loaded, so no round can exist
    #[error("the sound catalog has not been loaded")]
    CatalogNotLoaded,
    /// `start_round` was called while a round exists
    #[error("a round has already been started")]
    RoundInProgress,
    /// A guess or timeout arrived outside of a presented round
    #[error("no round is waiting for an answer")]
    NotAcceptingGuesses,
    /// `next_round` was called before the current round ended
    #[error("the current round has not ended")]
    RoundNotFinished,
    /// A timeout was reported for an untimed round
    #[error("the current round is not timed")]
    NotTimed,
}

/// Result of a guess submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guess {
    /// Nothing was selected; the player must pick an option first
    InputRequired,
    /// The guess was right
    Correct {
        /// Time taken, for timed rounds
        elapsed: Option<Duration>,
    },
    /// The guess was wrong
    Incorrect {
        /// Display name of the clip that was playing
        correct_answer: String,
    },
}

/// Why a session summary is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SummaryReason {
    /// The countdown ran out
    TimeUp,
    /// A timed round was answered incorrectly
    IncorrectAnswer,
}

/// Summary shown when a timed run ends
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    /// What ended the run
    pub reason: SummaryReason,
    /// Difficulty of the run
    pub difficulty: Option<Difficulty>,
    /// Correct answers
    pub wins: u64,
    /// Streak after the run ended
    pub current_streak: u64,
    /// Rounds started
    pub rounds_completed: u64,
    /// Mean time of timed correct answers, in seconds
    #[serde_as(as = "serde_with::DurationSecondsWithFrac<f64>")]
    pub average_correct_time: Duration,
    /// Fastest timed correct answer, in seconds
    #[serde_as(as = "Option<serde_with::DurationSecondsWithFrac<f64>>")]
    pub fastest_correct_time: Option<Duration>,
}

/// Alarm messages for deferred round transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Start the next round once feedback for `round` has been shown
    NextRound {
        /// The round that was answered
        round: RoundId,
    },
}

/// Update messages sent to the presentation layer
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub enum UpdateMessage {
    /// A new round is ready to be played
    RoundStarted {
        /// ID of the round
        round: RoundId,
        /// Clip identifier to play
        clip: String,
        /// Options to choose from
        options: Vec<String>,
        /// Whether to offer a searchable list instead of a dropdown
        search_mode: bool,
        /// Initial timer display for timed rounds
        timer: Option<timer::UpdateMessage>,
    },
    /// The guess was empty; ask the player to pick an option
    InputRequired,
    /// The guess was evaluated
    AnswerResult {
        /// Whether it was right
        outcome: Outcome,
        /// Display name of the clip that was playing
        correct_answer: String,
    },
    /// The countdown ran out
    TimeUp {
        /// Display name of the clip that was playing
        correct_answer: String,
    },
    /// A timed run ended
    Summary(SessionSummary),
    /// Statistics changed
    Stats(StatsView),
}

/// Sync messages describing the whole game state
///
/// Sent to a presentation layer that (re)connects and needs to rebuild
/// its view from scratch.
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub enum SyncMessage {
    /// No round yet
    AwaitingStart {
        /// Current statistics
        stats: StatsView,
    },
    /// A round is waiting for a guess
    SoundPresented {
        /// ID of the round
        round: RoundId,
        /// Clip identifier to play
        clip: String,
        /// Options to choose from
        options: Vec<String>,
        /// Whether to offer a searchable list
        search_mode: bool,
        /// Current timer display for timed rounds
        timer: Option<timer::UpdateMessage>,
        /// Current statistics
        stats: StatsView,
    },
    /// The round was answered
    Answered {
        /// Whether the answer was right
        outcome: Outcome,
        /// Display name of the clip that was playing
        correct_answer: String,
        /// Summary, when a timed run ended
        summary: Option<SessionSummary>,
        /// Current statistics
        stats: StatsView,
    },
    /// The countdown ran out
    TimedOut {
        /// Display name of the clip that was playing
        correct_answer: String,
        /// Summary of the run
        summary: SessionSummary,
        /// Current statistics
        stats: StatsView,
    },
}

/// The game context
///
/// Owns everything a session needs. Settings and stats are loaded from
/// `storage` on creation and written back after every change.
pub struct Game<P: Storage> {
    /// Playable clips, `None` until loaded
    catalog: Option<Catalog>,
    /// Persisted settings and stats
    profile: Profile,
    /// Current phase of the round lifecycle
    phase: Phase,
    /// The active round, if any
    round: Option<Round>,
    /// Timer of the active round
    timer: RoundTimer,
    rng: fastrand::Rng,
    storage: P,
}

impl<P: Storage> Debug for Game<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("phase", &self.phase)
            .field("round", &self.round.as_ref().map(Round::id))
            .finish_non_exhaustive()
    }
}

// Construction and accessors
impl<P: Storage> Game<P> {
    /// Creates a game, restoring settings and stats from `storage`
    pub fn new(storage: P) -> Self {
        Self {
            catalog: None,
            profile: Profile::load(&storage),
            phase: Phase::AwaitingStart,
            round: None,
            timer: RoundTimer::default(),
            rng: fastrand::Rng::new(),
            storage,
        }
    }

    /// Replaces the random source, for reproducible games
    #[must_use]
    pub fn with_rng(mut self, rng: fastrand::Rng) -> Self {
        self.rng = rng;
        self
    }

    /// Installs the catalog rounds are drawn from
    ///
    /// The option count setting is clamped to the catalog size.
    pub fn load_catalog(&mut self, catalog: Catalog) {
        log::info!("catalog ready with {} clips", catalog.len());
        let max = catalog.len();
        self.catalog = Some(catalog);

        let before = self.profile.settings;
        self.profile.settings.clamp(Some(max));
        if self.profile.settings != before {
            self.persist();
        }
    }

    /// Returns the catalog, if loaded
    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    /// Returns the current settings
    pub fn settings(&self) -> &Settings {
        &self.profile.settings
    }

    /// Returns the lifetime statistics
    pub fn stats(&self) -> &Stats {
        &self.profile.stats
    }

    /// Returns the current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the active round, if any
    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    /// Returns the round timer
    pub fn timer(&self) -> &RoundTimer {
        &self.timer
    }

    /// Returns the storage backend
    pub fn storage(&self) -> &P {
        &self.storage
    }

    /// Writes settings and stats to storage
    ///
    /// A failed write is logged; play continues with the in-memory state.
    fn persist(&mut self) {
        if let Err(e) = self.profile.save(&mut self.storage) {
            log::warn!("failed to persist profile: {e}");
        }
    }

    /// Builds the summary shown when a timed run ends
    fn summary(&self, reason: SummaryReason) -> SessionSummary {
        let stats = &self.profile.stats;
        SessionSummary {
            reason,
            difficulty: self.round.as_ref().and_then(Round::difficulty),
            wins: stats.wins(),
            current_streak: stats.current_streak(),
            rounds_completed: stats.rounds_completed(),
            average_correct_time: stats.average_correct_time(),
            fastest_correct_time: stats.fastest_correct_time(),
        }
    }

    /// Moves from `before` to `after` if the game is in `before`
    fn change_phase(&mut self, before: Phase, after: Phase) -> bool {
        if self.phase == before {
            log::debug!("phase {before:?} -> {after:?}");
            self.phase = after;
            true
        } else {
            false
        }
    }
}

// Commands
impl<P: Storage> Game<P> {
    /// Starts the first round
    ///
    /// Picks a random clip, builds its options, starts the countdown when
    /// the timer is enabled and announces the round.
    ///
    /// # Errors
    ///
    /// * [`Error::CatalogNotLoaded`] - No catalog has been loaded
    /// * [`Error::RoundInProgress`] - A round was already started; use
    ///   [`Game::next_round`] to move on
    pub fn start_round<T: Tunnel, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        tunnel: &T,
        schedule: S,
    ) -> Result<(), Error> {
        if self.catalog.is_none() {
            return Err(Error::CatalogNotLoaded);
        }
        if self.phase != Phase::AwaitingStart {
            return Err(Error::RoundInProgress);
        }
        self.begin_round(tunnel, schedule)
    }

    /// Replaces the active round with a fresh one
    fn begin_round<T: Tunnel, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        tunnel: &T,
        mut schedule: S,
    ) -> Result<(), Error> {
        let catalog = self.catalog.as_ref().ok_or(Error::CatalogNotLoaded)?;
        let settings = self.profile.settings;

        let index = catalog.random_index(&mut self.rng);
        let clip = catalog.clips()[index].clone();
        let correct_name = catalog.display_names()[index].clone();
        let options = generate_options(catalog, &clip, settings.option_count(), &mut self.rng);

        let difficulty = settings.active_difficulty();
        let timer = match difficulty {
            Some(difficulty) => Some(self.timer.start(Some(difficulty.duration()), &mut schedule)),
            None => {
                self.timer.cancel();
                None
            }
        };

        let round = Round {
            id: RoundId::new(),
            clip,
            correct_name,
            options,
            search_mode: settings.search_mode(),
            started_at: SystemTime::now(),
            difficulty,
        };
        log::debug!(
            "round {} started with {} options, difficulty {:?}",
            round.id,
            round.options.len(),
            difficulty
        );

        tunnel.send_message(
            &UpdateMessage::RoundStarted {
                round: round.id,
                clip: round.clip.clone(),
                options: round.options.clone(),
                search_mode: round.search_mode,
                timer,
            }
            .into(),
        );

        self.round = Some(round);
        self.phase = Phase::SoundPresented;
        self.profile.stats.record_round_started();
        self.persist();

        Ok(())
    }

    /// Evaluates the player's guess
    ///
    /// An empty guess changes nothing and asks the player to pick an
    /// option. Otherwise the timer is stopped and the formatted guess is
    /// compared to the correct display name.
    ///
    /// After a correct answer, or an incorrect one in an untimed round,
    /// the next round is scheduled after a short delay. An incorrect answer
    /// in a timed round ends the run with a summary and waits for
    /// [`Game::next_round`].
    ///
    /// # Errors
    ///
    /// * [`Error::CatalogNotLoaded`] - No catalog has been loaded
    /// * [`Error::NotAcceptingGuesses`] - No round is waiting for a guess
    pub fn submit_guess<T: Tunnel, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        candidate: &str,
        tunnel: &T,
        mut schedule: S,
    ) -> Result<Guess, Error> {
        if self.catalog.is_none() {
            return Err(Error::CatalogNotLoaded);
        }
        let Some(round) = self.round.as_ref().filter(|_| self.phase == Phase::SoundPresented)
        else {
            return Err(Error::NotAcceptingGuesses);
        };

        let candidate = candidate.trim();
        if candidate.is_empty() {
            tunnel.send_message(&UpdateMessage::InputRequired.into());
            return Ok(Guess::InputRequired);
        }

        let round_id = round.id;
        let correct_answer = round.correct_name.clone();
        let timed = round
            .difficulty
            .map(|difficulty| (self.timer.stop(), difficulty));

        let outcome = if format_name(candidate) == correct_answer {
            Outcome::Correct
        } else {
            Outcome::Incorrect
        };
        self.change_phase(Phase::SoundPresented, Phase::Answered(outcome));

        match outcome {
            Outcome::Correct => self.profile.stats.record_win(timed),
            Outcome::Incorrect => self.profile.stats.record_loss(),
        }
        self.persist();
        log::info!("round {round_id} answered {outcome:?}");

        tunnel.send_message(
            &UpdateMessage::AnswerResult {
                outcome,
                correct_answer: correct_answer.clone(),
            }
            .into(),
        );
        tunnel.send_message(&UpdateMessage::Stats(self.profile.stats.view()).into());

        if outcome == Outcome::Incorrect && timed.is_some() {
            tunnel.send_message(
                &UpdateMessage::Summary(self.summary(SummaryReason::IncorrectAnswer)).into(),
            );
        } else {
            schedule(
                AlarmMessage::NextRound { round: round_id }.into(),
                NEXT_ROUND_DELAY,
            );
        }

        Ok(match outcome {
            Outcome::Correct => Guess::Correct {
                elapsed: timed.map(|(elapsed, _)| elapsed),
            },
            Outcome::Incorrect => Guess::Incorrect { correct_answer },
        })
    }

    /// Ends a timed round whose countdown ran out
    ///
    /// A timeout counts as a loss and resets the streak. The run ends with
    /// a summary and waits for [`Game::next_round`]. This is called
    /// automatically when the timer expires.
    ///
    /// # Errors
    ///
    /// * [`Error::NotAcceptingGuesses`] - No round is waiting for an answer
    /// * [`Error::NotTimed`] - The round has no countdown
    pub fn handle_timeout<T: Tunnel>(&mut self, tunnel: &T) -> Result<(), Error> {
        let Some(round) = self.round.as_ref().filter(|_| self.phase == Phase::SoundPresented)
        else {
            return Err(Error::NotAcceptingGuesses);
        };
        if round.difficulty.is_none() {
            return Err(Error::NotTimed);
        }
        let correct_answer = round.correct_name.clone();

        self.timer.stop();
        self.change_phase(Phase::SoundPresented, Phase::TimedOut);
        self.profile.stats.record_loss();
        self.persist();
        log::info!("round timed out");

        tunnel.send_message(&UpdateMessage::TimeUp { correct_answer }.into());
        tunnel.send_message(&UpdateMessage::Stats(self.profile.stats.view()).into());
        tunnel.send_message(&UpdateMessage::Summary(self.summary(SummaryReason::TimeUp)).into());

        Ok(())
    }

    /// Moves on to a new round after the current one ended
    ///
    /// In timed mode this is how the player dismisses the summary.
    ///
    /// # Errors
    ///
    /// * [`Error::CatalogNotLoaded`] - No catalog has been loaded
    /// * [`Error::RoundNotFinished`] - The current round still expects a guess
    pub fn next_round<T: Tunnel, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        tunnel: &T,
        schedule: S,
    ) -> Result<(), Error> {
        if self.phase == Phase::SoundPresented {
            return Err(Error::RoundNotFinished);
        }
        self.begin_round(tunnel, schedule)
    }

    /// Changes the player's settings
    ///
    /// The option count is clamped to `[5, catalog size]`. Changes take
    /// effect when the next round starts.
    ///
    /// # Returns
    ///
    /// The settings after the update
    pub fn update_settings(&mut self, update: SettingsUpdate) -> Settings {
        let max = self.catalog.as_ref().map(Catalog::len);
        if self.profile.settings.apply(update, max) {
            log::debug!("settings changed to {:?}", self.profile.settings);
            self.persist();
        }
        self.profile.settings
    }

    /// Handles a previously scheduled alarm
    ///
    /// Timer ticks update the countdown display and end the round when it
    /// expires. A next-round alarm starts a new round only if the game is
    /// still showing the answer for the round that scheduled it.
    pub fn receive_alarm<T: Tunnel, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        message: &crate::AlarmMessage,
        tunnel: &T,
        mut schedule: S,
    ) {
        match message {
            crate::AlarmMessage::Timer(timer::AlarmMessage::Tick { generation }) => {
                match self.timer.receive_tick(*generation, &mut schedule) {
                    TickOutcome::Ignored => (),
                    TickOutcome::Ticked(view) => tunnel.send_message(&view.into()),
                    TickOutcome::Expired(view) => {
                        tunnel.send_message(&view.into());
                        if let Err(e) = self.handle_timeout(tunnel) {
                            log::debug!("timer expired without a timed round: {e}");
                        }
                    }
                }
            }
            crate::AlarmMessage::Game(AlarmMessage::NextRound { round }) => {
                let current = matches!(self.phase, Phase::Answered(_))
                    && self.round.as_ref().is_some_and(|r| r.id == *round);
                if !current {
                    log::debug!("ignoring stale next-round alarm for {round}");
                    return;
                }
                if let Err(e) = self.next_round(tunnel, schedule) {
                    log::warn!("could not start the next round: {e}");
                }
            }
        }
    }

    /// Describes the whole game state for a (re)connecting presentation layer
    pub fn state_message(&self) -> SyncMessage {
        let stats = self.profile.stats.view();
        match (self.phase, &self.round) {
            (Phase::SoundPresented, Some(round)) => SyncMessage::SoundPresented {
                round: round.id,
                clip: round.clip.clone(),
                options: round.options.clone(),
                search_mode: round.search_mode,
                timer: round.difficulty.map(|_| self.timer.view()),
                stats,
            },
            (Phase::Answered(outcome), Some(round)) => SyncMessage::Answered {
                outcome,
                correct_answer: round.correct_name.clone(),
                summary: (outcome == Outcome::Incorrect && round.difficulty.is_some())
                    .then(|| self.summary(SummaryReason::IncorrectAnswer)),
                stats,
            },
            (Phase::TimedOut, Some(round)) => SyncMessage::TimedOut {
                correct_answer: round.correct_name.clone(),
                summary: self.summary(SummaryReason::TimeUp),
                stats,
            },
            _ => SyncMessage::AwaitingStart { stats },
        }
    }

    /// Sends the full state through `tunnel`
    pub fn sync<T: Tunnel>(&self, tunnel: &T) {
        tunnel.send_state(&self.state_message().into());
    }
}
