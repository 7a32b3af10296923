//! Per-turn countdown clocks
//!
//! Two variants share one event type:
//!
//! - [`HostClock`] is authoritative. Something outside (the host timer task)
//!   calls [`HostClock::on_period`] once per second.
//! - [`MirroredClock`] owns no clock at all. It only reflects values received
//!   from the host.
//!
//! Neither variant advances the turn. The owner reacts to
//! [`TimerEvent::Expired`] by asking the arbiter to pass the turn.

use std::time::Duration;

/// Something a clock wants the rest of the session to know
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Remaining time changed
    Tick(Duration),
    /// The turn budget ran out; the clock has already restarted
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostClock {
    move_time: u32,
    time_left: u32,
    running: bool,
}

impl HostClock {
    pub fn new(move_time_secs: u32) -> Self {
        let move_time = move_time_secs.max(1);
        Self {
            move_time,
            time_left: move_time,
            running: false,
        }
    }

    pub fn move_time(&self) -> Duration {
        Duration::from_secs(self.move_time as u64)
    }

    pub fn time_left(&self) -> Duration {
        Duration::from_secs(self.time_left as u64)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        self.running = true;
        self.time_left = self.move_time;
    }

    pub fn restart(&mut self) {
        self.stop();
        self.start();
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Advance by one period.
    ///
    /// Returns `None` while stopped.
    pub fn on_period(&mut self) -> Option<TimerEvent> {
        if !self.running {
            return None;
        }
        if self.time_left > 1 {
            self.time_left -= 1;
            Some(TimerEvent::Tick(self.time_left()))
        } else {
            self.restart();
            Some(TimerEvent::Expired)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirroredClock {
    move_time: u32,
    time_left: u32,
}

impl MirroredClock {
    pub fn new(move_time_secs: u32) -> Self {
        let move_time = move_time_secs.max(1);
        Self {
            move_time,
            time_left: move_time,
        }
    }

    pub fn move_time(&self) -> Duration {
        Duration::from_secs(self.move_time as u64)
    }

    pub fn time_left(&self) -> Duration {
        Duration::from_secs(self.time_left as u64)
    }

    /// Reset to the full budget (the client-side "start" and "restart")
    pub fn restart(&mut self) {
        self.time_left = self.move_time;
    }

    /// Host reported the remaining time. Sub-second parts are dropped.
    pub fn apply_sync(&mut self, remaining: Duration) -> TimerEvent {
        self.time_left = u32::try_from(remaining.as_secs()).unwrap_or(u32::MAX);
        TimerEvent::Tick(self.time_left())
    }

    /// Host reported expiry.
    pub fn apply_time_passed(&mut self) -> TimerEvent {
        self.restart();
        TimerEvent::Expired
    }
}
