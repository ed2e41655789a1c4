//! Rate Limiting Infrastructure
//!
//! Sliding-window policy and the persisted per-client record.

use serde::{Deserialize, Serialize};

/// Submission throttling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Minimum spacing between two submissions
    pub min_interval_secs: i64,
    /// Trailing window the quota is counted over
    pub window_secs: i64,
    /// Maximum submissions inside the window
    pub max_requests: usize,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            min_interval_secs: 30,
            window_secs: 3600,
            max_requests: 5,
        }
    }
}

/// Why a client was throttled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitReason {
    TooSoon,
    QuotaExceeded,
}

impl RateLimitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitReason::TooSoon => "too_soon",
            RateLimitReason::QuotaExceeded => "quota_exceeded",
        }
    }
}

impl std::fmt::Display for RateLimitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted submission history of one client key (unix seconds)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    #[serde(default)]
    pub requests: Vec<i64>,
    #[serde(default)]
    pub last_request: i64,
}

impl RateLimitRecord {
    /// Drop timestamps that fell out of the trailing window
    pub fn prune(&mut self, now: i64, policy: &RateLimitPolicy) {
        self.requests.retain(|t| now - t < policy.window_secs);
    }

    /// Evaluate the policy against a pruned copy; `None` = admit
    pub fn evaluate(&self, now: i64, policy: &RateLimitPolicy) -> Option<RateLimitReason> {
        if self.last_request > 0 && now - self.last_request < policy.min_interval_secs {
            return Some(RateLimitReason::TooSoon);
        }

        let in_window = self
            .requests
            .iter()
            .filter(|t| now - **t < policy.window_secs)
            .count();
        if in_window >= policy.max_requests {
            return Some(RateLimitReason::QuotaExceeded);
        }

        None
    }

    /// Record a submission at `now`; `last_request` never moves backwards
    pub fn push(&mut self, now: i64, policy: &RateLimitPolicy) {
        self.prune(now, policy);
        self.requests.push(now);
        self.requests.sort_unstable();
        self.last_request = self.last_request.max(now);
    }

    /// Evaluate and, when admitted, record in one step
    pub fn admit(&mut self, now: i64, policy: &RateLimitPolicy) -> Option<RateLimitReason> {
        self.prune(now, policy);
        let verdict = self.evaluate(now, policy);
        if verdict.is_none() {
            self.push(now, policy);
        }
        verdict
    }
}
