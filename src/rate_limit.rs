use std::time::{Duration, Instant};

use dashmap::DashMap;

const MAX_FAILURES: u32 = 5;
const WINDOW: Duration = Duration::from_secs(15 * 60);

/// Per-user login brute force limiter.
pub struct LoginRateLimiter {
    /// user -> (failed_count, window_start)
    entries: DashMap<String, (u32, Instant)>,
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Check if a login attempt is allowed. Returns the seconds left in the window otherwise.
    /// Does NOT increment the counter — call `record_failure()` on invalid credentials.
    pub fn check(&self, user: &str) -> Result<(), u64> {
        let now = Instant::now();

        let Some(entry) = self.entries.get(&user.to_lowercase()) else {
            return Ok(());
        };
        let (count, start) = entry.value();

        if now.duration_since(*start) > WINDOW {
            return Ok(());
        }

        if *count >= MAX_FAILURES {
            let elapsed = now.duration_since(*start).as_secs();
            return Err(WINDOW.as_secs().saturating_sub(elapsed));
        }

        Ok(())
    }

    pub fn record_failure(&self, user: &str) {
        let now = Instant::now();

        let mut entry = self.entries.entry(user.to_lowercase()).or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) > WINDOW {
            *count = 1;
            *start = now;
        } else {
            *count += 1;
        }
    }

    pub fn record_success(&self, user: &str) {
        self.entries.remove(&user.to_lowercase());
    }

    /// Drop entries whose window has expired.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.entries
            .retain(|_, (_, start)| now.duration_since(*start) < WINDOW);
    }
}
