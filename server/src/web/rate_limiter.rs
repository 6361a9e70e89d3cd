use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Token-bucket rate limiter keyed by string (client IP).
pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
    max_tokens: u32,
    refill_rate: f64, // tokens per second
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// - `max_tokens`: burst capacity
    /// - `per_seconds`: refill one token every N seconds
    pub fn new(max_tokens: u32, per_seconds: f64) -> Self {
        Self {
            buckets: DashMap::new(),
            max_tokens,
            refill_rate: 1.0 / per_seconds,
        }
    }

    /// Take one token for `key`. Returns false when the bucket is empty.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut bucket = self.buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: self.max_tokens as f64,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_rate).min(self.max_tokens as f64);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Forget keys not seen for `older_than`.
    pub fn cleanup(&self, older_than: Duration) {
        let Some(cutoff) = Instant::now().checked_sub(older_than) else {
            return;
        };
        self.buckets.retain(|_, b| b.last_refill > cutoff);
    }

    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn age_bucket(limiter: &RateLimiter, key: &str, by: Duration) {
        let mut bucket = limiter.buckets.get_mut(key).unwrap();
        bucket.last_refill = Instant::now() - by;
    }

    #[test]
    fn test_allows_burst_then_denies() {
        let limiter = RateLimiter::new(5, 1.0);
        for _ in 0..5 {
            assert!(limiter.check("10.0.0.1"));
        }
        assert!(!limiter.check("10.0.0.1"));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(1, 1.0);
        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
        assert!(limiter.check("b"));
    }

    #[test]
    fn test_refill_over_time_is_capped() {
        let limiter = RateLimiter::new(2, 1.0);
        assert!(limiter.check("ip"));
        assert!(limiter.check("ip"));
        assert!(!limiter.check("ip"));

        age_bucket(&limiter, "ip", Duration::from_secs(100));

        assert!(limiter.check("ip"));
        assert!(limiter.check("ip"));
        assert!(!limiter.check("ip"));
    }

    #[test]
    fn test_slow_refill_rate() {
        // One token every 12 seconds.
        let limiter = RateLimiter::new(1, 12.0);
        assert!(limiter.check("ip"));
        age_bucket(&limiter, "ip", Duration::from_secs(6));
        assert!(!limiter.check("ip"));
    }

    #[test]
    fn test_cleanup_drops_only_stale_keys() {
        let limiter = RateLimiter::new(5, 1.0);
        limiter.check("stale");
        limiter.check("fresh");
        age_bucket(&limiter, "stale", Duration::from_secs(600));

        limiter.cleanup(Duration::from_secs(60));
        assert_eq!(limiter.tracked_keys(), 1);
        assert!(limiter.buckets.contains_key("fresh"));
    }
}
