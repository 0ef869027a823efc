//! Fixed-window per-client rate limiter.
//!
//! Injected through `AppState` instead of living as an ambient map, so the
//! upload handler stays testable and the limiter swappable. The store is
//! bounded: stale windows are pruned whenever the map grows past a
//! threshold.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;

const PRUNE_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    max_per_window: u32,
    window: Duration,
    hits: DashMap<IpAddr, Window>,
}

impl RateLimiter {
    pub fn new(max_per_window: u32, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            hits: DashMap::new(),
        }
    }

    /// Count a hit from `ip`. Returns the seconds to wait when the window
    /// budget is exhausted.
    pub fn check(&self, ip: IpAddr) -> Result<(), u64> {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> Result<(), u64> {
        let mut entry = self.hits.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max_per_window {
            let elapsed = now.duration_since(entry.started);
            let retry_after = self.window.saturating_sub(elapsed).as_secs().max(1);
            return Err(retry_after);
        }

        entry.count += 1;
        drop(entry);

        if self.hits.len() > PRUNE_THRESHOLD {
            self.prune(now);
        }
        Ok(())
    }

    fn prune(&self, now: Instant) {
        let window = self.window;
        self.hits
            .retain(|_, w| now.duration_since(w.started) < window);
    }
}
