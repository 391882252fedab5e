// Match clock: a one-second-resolution countdown, or a count-up when no
// duration is set.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchClock {
    /// 0 means count up without a limit.
    duration_secs: u32,
    /// Remaining seconds when counting down, elapsed seconds when counting up.
    seconds: u32,
    running: bool,
}

impl Default for MatchClock {
    fn default() -> Self {
        MatchClock::new(0)
    }
}

impl MatchClock {
    pub fn new(duration_minutes: u32) -> Self {
        let duration_secs = duration_minutes.saturating_mul(60);
        MatchClock {
            duration_secs,
            seconds: duration_secs,
            running: false,
        }
    }

    pub fn counts_down(&self) -> bool {
        self.duration_secs > 0
    }

    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_expired(&self) -> bool {
        self.counts_down() && self.seconds == 0
    }

    pub fn start(&mut self) {
        self.resume();
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Continue from the current time. Has no effect once a countdown has
    /// reached zero.
    pub fn resume(&mut self) {
        if !self.is_expired() {
            self.running = true;
        }
    }

    /// Advance one second. Returns true when the displayed time changed.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }
        if self.counts_down() {
            self.seconds = self.seconds.saturating_sub(1);
            if self.seconds == 0 {
                self.running = false;
            }
        } else {
            self.seconds = self.seconds.saturating_add(1);
        }
        true
    }

    /// `MM:SS`.
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.seconds / 60, self.seconds % 60)
    }
}
