//! Link liveness supervision
//!
//! Tracks when a unit last produced a valid frame, independent of what the
//! sequencer is doing.

use crate::time::Millis;

/// Result of a liveness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkStatus {
    /// Connected and within the window
    Up,
    /// Not connected; nothing to report
    Down,
    /// Window exceeded on this check; the link is now down
    Lost,
}

/// Liveness monitor for one serial link
#[derive(Debug, Clone)]
pub struct LinkMonitor {
    connected: bool,
    last_valid_frame_at: Millis,
}

impl LinkMonitor {
    /// Create a monitor for a link that has not produced a frame yet
    pub fn new(now: Millis) -> Self {
        Self {
            connected: false,
            last_valid_frame_at: now,
        }
    }

    /// Record a valid frame
    pub fn frame_received(&mut self, now: Millis) {
        self.connected = true;
        self.last_valid_frame_at = now;
    }

    /// Mark the link down without waiting for the window
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Check the window
    ///
    /// Reports [`LinkStatus::Lost`] once, on the check that finds the window
    /// exceeded.
    pub fn check(&mut self, now: Millis, window_ms: u32) -> LinkStatus {
        if !self.connected {
            return LinkStatus::Down;
        }
        if now.since(self.last_valid_frame_at) > window_ms {
            self.connected = false;
            return LinkStatus::Lost;
        }
        LinkStatus::Up
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}
