//! Per-host request spacing for the fetcher.
//!
//! A `governor`-backed limiter would quantize to whole requests per second;
//! what the fetcher actually wants is "no two requests to the same host closer than
//! N apart", so this tracks last-request instants per host under a mutex.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Tracks the last request time per host and sleeps callers to enforce a
/// minimum gap before letting them proceed.
pub struct HostGate {
    last_seen: Mutex<HashMap<String, Instant>>,
}

impl HostGate {
    pub fn new() -> Self {
        Self {
            last_seen: Mutex::new(HashMap::new()),
        }
    }

    /// Block until at least `min_gap` has elapsed since the last request to
    /// `host`, then record this request's start time.
    pub async fn wait(&self, host: &str, min_gap: Duration) {
        let sleep_for = {
            let mut guard = self.last_seen.lock().await;
            let now = Instant::now();
            let wait = match guard.get(host) {
                Some(prev) => min_gap.checked_sub(now.duration_since(*prev)),
                None => None,
            };
            guard.insert(host.to_string(), now + wait.unwrap_or_default());
            wait
        };
        if let Some(d) = sleep_for {
            tokio::time::sleep(d).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_call_waits_out_the_gap() {
        let gate = HostGate::new();
        let gap = Duration::from_millis(50);

        let start = Instant::now();
        gate.wait("dealer.test", gap).await;
        gate.wait("dealer.test", gap).await;
        assert!(start.elapsed() >= gap);
    }

    #[tokio::test]
    async fn distinct_hosts_do_not_block_each_other() {
        let gate = HostGate::new();
        let gap = Duration::from_millis(200);

        let start = Instant::now();
        gate.wait("a.test", gap).await;
        gate.wait("b.test", gap).await;
        assert!(start.elapsed() < gap);
    }
}
