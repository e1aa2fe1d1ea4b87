//! Restart pacing for agents that keep dying.
//!
//! The first restart is immediate. Each further restart without a stable run
//! in between waits `base_delay * 2^(n-1)`, capped at `max_delay`. More than
//! `max_restarts` restarts inside `window` always wait `max_delay`. A run
//! that stays up for a full `window` resets the count.

use std::collections::VecDeque;
use std::time::Duration;

use guardfleet_config::RestartConfig;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub window: Duration,
    pub max_restarts: u32,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self::from_config(&RestartConfig::default())
    }
}

impl RestartPolicy {
    pub fn from_config(config: &RestartConfig) -> Self {
        Self {
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            window: Duration::from_secs(config.window_secs),
            max_restarts: config.max_restarts,
        }
    }

    /// Delay before the `consecutive`-th restart in a row (1-based).
    pub fn backoff(&self, consecutive: u32) -> Duration {
        if consecutive <= 1 {
            return Duration::ZERO;
        }
        let exponent = (consecutive - 2).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

/// Restart bookkeeping for one agent name.
#[derive(Debug, Clone)]
pub struct RestartTracker {
    started_at: Instant,
    consecutive: u32,
    recent: VecDeque<Instant>,
}

impl RestartTracker {
    pub fn new(now: Instant) -> Self {
        Self {
            started_at: now,
            consecutive: 0,
            recent: VecDeque::new(),
        }
    }

    /// A new instance came up.
    pub fn started(&mut self, now: Instant) {
        self.started_at = now;
    }

    /// The running instance died; returns how long to wait before the next
    /// launch.
    pub fn next_delay(&mut self, policy: &RestartPolicy, now: Instant) -> Duration {
        if now.duration_since(self.started_at) >= policy.window {
            self.consecutive = 0;
        }
        while self
            .recent
            .front()
            .is_some_and(|t| now.duration_since(*t) > policy.window)
        {
            self.recent.pop_front();
        }

        self.consecutive += 1;
        self.recent.push_back(now);

        if self.recent.len() > policy.max_restarts as usize {
            policy.max_delay
        } else {
            policy.backoff(self.consecutive)
        }
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RestartPolicy {
        RestartPolicy {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            window: Duration::from_secs(60),
            max_restarts: 5,
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = policy();
        assert_eq!(p.backoff(1), Duration::ZERO);
        assert_eq!(p.backoff(2), Duration::from_secs(1));
        assert_eq!(p.backoff(3), Duration::from_secs(2));
        assert_eq!(p.backoff(5), Duration::from_secs(8));
        assert_eq!(p.backoff(7), Duration::from_secs(30));
        assert_eq!(p.backoff(200), Duration::from_secs(30));
    }

    #[test]
    fn crash_loop_hits_max_delay() {
        let p = policy();
        let t0 = Instant::now();
        let mut tracker = RestartTracker::new(t0);

        let delays: Vec<_> = (0..6)
            .map(|i| {
                let now = t0 + Duration::from_millis(100 * i);
                tracker.started(now);
                tracker.next_delay(&p, now)
            })
            .collect();

        assert_eq!(delays[0], Duration::ZERO);
        assert_eq!(delays[1], Duration::from_secs(1));
        assert_eq!(delays[4], Duration::from_secs(8));
        // Sixth restart inside the window
        assert_eq!(delays[5], Duration::from_secs(30));
    }

    #[test]
    fn stable_run_resets_count() {
        let p = policy();
        let t0 = Instant::now();
        let mut tracker = RestartTracker::new(t0);
        tracker.next_delay(&p, t0);
        tracker.next_delay(&p, t0);
        assert_eq!(tracker.consecutive(), 2);

        let later = t0 + Duration::from_secs(120);
        tracker.started(t0 + Duration::from_secs(50));
        assert_eq!(tracker.next_delay(&p, later), Duration::ZERO);
        assert_eq!(tracker.consecutive(), 1);
    }
}
