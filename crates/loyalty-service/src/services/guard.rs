//! Per-channel trigger cooldown
//!
//! A pull writes the cache, which announces a local change, which can trigger
//! another pull. The guard lets one trigger per channel through per cooldown.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct SyncGuard {
    cooldown: Duration,
    last_fired: DashMap<String, Instant>,
}

impl SyncGuard {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_fired: DashMap::new(),
        }
    }

    /// Record a trigger on `channel`; `false` when one fired within the cooldown
    pub fn try_acquire(&self, channel: &str) -> bool {
        let now = Instant::now();
        match self.last_fired.entry(channel.to_string()) {
            Entry::Occupied(mut last) => {
                let elapsed = now.saturating_duration_since(*last.get());
                if elapsed < self.cooldown {
                    tracing::debug!(channel, ?elapsed, "Trigger suppressed by cooldown");
                    return false;
                }
                last.insert(now);
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
            }
        }
        true
    }

    /// Time left before `channel` lets a trigger through; `None` when open
    pub fn remaining(&self, channel: &str) -> Option<Duration> {
        let last = *self.last_fired.get(channel)?;
        let elapsed = Instant::now().saturating_duration_since(last);
        self.cooldown.checked_sub(elapsed).filter(|left| !left.is_zero())
    }

    /// Forget a channel so its next trigger always passes
    pub fn reset(&self, channel: &str) {
        self.last_fired.remove(channel);
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suppresses_within_cooldown() {
        let guard = SyncGuard::new(Duration::from_secs(60));
        assert!(guard.try_acquire("remote:accounts"));
        assert!(!guard.try_acquire("remote:accounts"));
        // Channels are independent
        assert!(guard.try_acquire("local"));
    }

    #[test]
    fn test_reset_reopens_channel() {
        let guard = SyncGuard::new(Duration::from_secs(60));
        assert!(guard.try_acquire("local"));
        guard.reset("local");
        assert!(guard.try_acquire("local"));
    }

    #[test]
    fn test_remaining_counts_down_to_open() {
        let guard = SyncGuard::new(Duration::from_secs(60));
        assert_eq!(guard.remaining("local"), None);
        assert!(guard.try_acquire("local"));
        let left = guard.remaining("local").unwrap();
        assert!(left > Duration::from_secs(59) && left <= Duration::from_secs(60));

        let open = SyncGuard::new(Duration::ZERO);
        assert!(open.try_acquire("local"));
        assert_eq!(open.remaining("local"), None);
    }

    #[test]
    fn test_zero_cooldown_never_suppresses() {
        let guard = SyncGuard::new(Duration::ZERO);
        assert!(guard.try_acquire("local"));
        assert!(guard.try_acquire("local"));
    }
}
