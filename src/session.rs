//! Presentation seam
//!
//! The game never renders anything itself. Whatever shows the round to
//! the player (a terminal, a web page, a test harness) implements
//! [`Tunnel`] and receives every change as a message.

use super::{SyncMessage, UpdateMessage};

/// Trait for sending messages to the presentation layer
///
/// Implementations decide how messages are delivered: drawn to a screen,
/// pushed over a socket or simply recorded.
pub trait Tunnel {
    /// Sends an update message
    ///
    /// Update messages describe a single change, such as a new round, an
    /// evaluated guess or a timer tick.
    ///
    /// # Arguments
    ///
    /// * `message` - The update message to send
    fn send_message(&self, message: &UpdateMessage);

    /// Sends a full state message
    ///
    /// Used when the presentation layer (re)connects and has to rebuild
    /// its view from scratch.
    ///
    /// # Arguments
    ///
    /// * `state` - The synchronization message to send
    fn send_state(&self, state: &SyncMessage);
}
