//! Deferred refresh timing

use std::time::{Duration, Instant};

/// Holds at most one pending refresh deadline.
///
/// Repeated requests keep the earliest deadline. The refresh reads current
/// scene state, so one run covers every request made before it.
#[derive(Clone, Debug, Default)]
pub struct RefreshScheduler {
    deadline: Option<Instant>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a refresh `delay` after `now`
    pub fn request(&mut self, now: Instant, delay: Duration) {
        let at = now + delay;
        self.deadline = Some(self.deadline.map_or(at, |d| d.min(at)));
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consume the pending refresh if its deadline has passed
    pub fn due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(at) if now >= at => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Drop any pending refresh, once a refresh has run anyway
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
