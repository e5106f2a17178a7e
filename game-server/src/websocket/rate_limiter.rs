use std::time::{Duration, Instant};

/// Token bucket guarding one websocket connection.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tokens: u32,
    max_tokens: u32,
    refill_interval: Duration,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        // bursts of 20, then one message every 100ms
        Self::new_with_limits(20, Duration::from_millis(100))
    }

    pub fn new_with_limits(max_tokens: u32, refill_interval: Duration) -> Self {
        Self {
            tokens: max_tokens,
            max_tokens,
            refill_interval,
            last_refill: Instant::now(),
        }
    }

    pub fn check_rate_limit(&mut self) -> bool {
        self.refill_tokens(Instant::now());

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill_tokens(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill);
        let interval_ms = self.refill_interval.as_millis().max(1);
        let earned = elapsed.as_millis() / interval_ms;
        if earned == 0 {
            return;
        }

        let earned = u32::try_from(earned).unwrap_or(u32::MAX);
        self.tokens = self.tokens.saturating_add(earned).min(self.max_tokens);
        // keep the partial interval so slow trickles still earn tokens
        self.last_refill += self.refill_interval * earned.min(self.max_tokens);
        if self.tokens == self.max_tokens {
            self.last_refill = now;
        }
    }

    pub fn remaining_tokens(&mut self) -> u32 {
        self.refill_tokens(Instant::now());
        self.tokens
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
