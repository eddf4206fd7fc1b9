/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Reconnection policy.
//!
//! Fixed-delay retries bounded by a maximum number of consecutive attempts.
//! The attempt counter is incremented when the retry timer fires, not when
//! it is scheduled, and reset once a handshake completes.

use crate::timer::{Scheduler, TimerId};
use std::time::Duration;

/// Outcome of reporting a transport failure to the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// A retry timer was scheduled.
    Scheduled {
        /// Number the next attempt will carry, starting at 1.
        attempt: u32,
        /// Delay before the attempt.
        delay: Duration,
    },
    /// No attempts remain.
    Exhausted {
        /// Attempts made since the last successful handshake.
        attempts: u32,
    },
}

/// Tracks reconnection attempts for a session.
#[derive(Debug)]
pub struct ReconnectPolicy {
    max_attempts: u32,
    delay: Duration,
    attempts: u32,
    timer: Option<TimerId>,
}

impl ReconnectPolicy {
    /// Creates a policy.
    ///
    /// # Arguments
    /// * `max_attempts` - Maximum consecutive attempts; zero disables reconnection
    /// * `delay` - Fixed delay before each attempt
    #[must_use]
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            attempts: 0,
            timer: None,
        }
    }

    /// Handles a transport failure, scheduling a retry if attempts remain.
    pub fn on_failure<S: Scheduler>(&mut self, scheduler: &mut S) -> ReconnectDecision {
        if self.attempts >= self.max_attempts {
            return ReconnectDecision::Exhausted {
                attempts: self.attempts,
            };
        }
        self.cancel(scheduler);
        self.timer = Some(scheduler.schedule_once(self.delay));
        ReconnectDecision::Scheduled {
            attempt: self.attempts + 1,
            delay: self.delay,
        }
    }

    /// Handles a fired timer.
    ///
    /// Returns true if `id` was the retry timer; the attempt counter is then
    /// incremented and a new connection should be opened.
    pub fn on_timer(&mut self, id: TimerId) -> bool {
        if self.timer != Some(id) {
            return false;
        }
        self.timer = None;
        self.attempts += 1;
        true
    }

    /// Handles a completed handshake.
    ///
    /// Returns true if the session got here through reconnection. The
    /// attempt counter is reset either way.
    pub fn on_open(&mut self) -> bool {
        let reconnected = self.attempts > 0;
        self.attempts = 0;
        reconnected
    }

    /// Cancels a scheduled retry.
    pub fn cancel<S: Scheduler>(&mut self, scheduler: &mut S) {
        if let Some(timer) = self.timer.take() {
            scheduler.cancel(timer);
        }
    }

    /// Returns the attempts made since the last successful handshake.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns the maximum consecutive attempts.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the delay before each attempt.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns true while a retry is scheduled.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.timer.is_some()
    }
}
