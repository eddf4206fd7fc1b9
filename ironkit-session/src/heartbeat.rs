/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Heartbeat management.
//!
//! This module handles session heartbeat logic:
//! - Tracking the interval advertised by the server in its handshake
//! - Keeping exactly one repeating timer while heartbeats are enabled
//! - Recognizing when a fired timer is the heartbeat timer

use crate::timer::{Scheduler, TimerId};
use bytes::Bytes;
use std::time::Duration;

/// Encoded heartbeat packet: type 3 with an empty body.
const HEARTBEAT_PACKET: [u8; 4] = [0x03, 0x00, 0x00, 0x00];

/// Manages heartbeat timing for a session.
#[derive(Debug, Default)]
pub struct HeartbeatManager {
    /// Heartbeat interval in seconds. Zero means disabled.
    interval_secs: u64,
    /// Active repeating timer, if any.
    timer: Option<TimerId>,
}

impl HeartbeatManager {
    /// Creates a heartbeat manager with heartbeats disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restarts heartbeats with the interval advertised by the server.
    ///
    /// Any previous timer is cancelled first. An interval of zero leaves
    /// heartbeats disabled.
    ///
    /// # Arguments
    /// * `interval_secs` - Interval in seconds
    /// * `scheduler` - Scheduler owning the timer
    ///
    /// Returns true if a heartbeat timer is now running.
    pub fn restart<S: Scheduler>(&mut self, interval_secs: u64, scheduler: &mut S) -> bool {
        self.stop(scheduler);
        self.interval_secs = interval_secs;
        if interval_secs == 0 {
            return false;
        }
        self.timer = Some(scheduler.schedule_repeating(Duration::from_secs(interval_secs)));
        true
    }

    /// Cancels the heartbeat timer. The advertised interval is kept.
    pub fn stop<S: Scheduler>(&mut self, scheduler: &mut S) {
        if let Some(timer) = self.timer.take() {
            scheduler.cancel(timer);
        }
    }

    /// Returns true if `id` is the running heartbeat timer.
    #[inline]
    #[must_use]
    pub fn is_timer(&self, id: TimerId) -> bool {
        self.timer == Some(id)
    }

    /// Returns true if a heartbeat timer is running.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.timer.is_some()
    }

    /// Returns the heartbeat interval in seconds.
    #[must_use]
    pub const fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    /// Returns the heartbeat interval, `None` when disabled.
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs))
    }

    /// Returns the encoded heartbeat packet.
    #[must_use]
    pub fn packet() -> Bytes {
        Bytes::from_static(&HEARTBEAT_PACKET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualScheduler;
    use ironkit_core::packet::{Packet, PacketType};

    #[test]
    fn test_heartbeat_manager_new() {
        let mgr = HeartbeatManager::new();
        assert_eq!(mgr.interval_secs(), 0);
        assert!(mgr.interval().is_none());
        assert!(!mgr.is_active());
    }

    #[test]
    fn test_heartbeat_restart_replaces_timer() {
        let mut scheduler = ManualScheduler::new();
        let mut mgr = HeartbeatManager::new();

        assert!(mgr.restart(5, &mut scheduler));
        assert_eq!(mgr.interval(), Some(Duration::from_secs(5)));
        let fired = scheduler.advance(Duration::from_secs(5));
        assert_eq!(fired.len(), 1);
        assert!(mgr.is_timer(fired[0]));

        assert!(mgr.restart(3, &mut scheduler));
        assert_eq!(scheduler.pending_timers(), 1);
        assert!(!mgr.is_timer(fired[0]));
    }

    #[test]
    fn test_heartbeat_zero_disables() {
        let mut scheduler = ManualScheduler::new();
        let mut mgr = HeartbeatManager::new();

        mgr.restart(5, &mut scheduler);
        assert!(!mgr.restart(0, &mut scheduler));
        assert!(!mgr.is_active());
        assert_eq!(mgr.interval_secs(), 0);
        assert_eq!(scheduler.pending_timers(), 0);
    }

    #[test]
    fn test_heartbeat_stop_keeps_interval() {
        let mut scheduler = ManualScheduler::new();
        let mut mgr = HeartbeatManager::new();

        mgr.restart(10, &mut scheduler);
        mgr.stop(&mut scheduler);
        assert!(!mgr.is_active());
        assert_eq!(mgr.interval_secs(), 10);
        assert!(scheduler.advance(Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn test_heartbeat_packet() {
        let expected = Packet::empty(PacketType::Heartbeat).encode().unwrap();
        assert_eq!(HeartbeatManager::packet(), expected);
    }
}
