use std::time::Duration;

use serde::Deserialize;

/// Staleness thresholds for [`TenantRuleCache`](crate::TenantRuleCache).
///
/// An entry older than `soft_ttl` is still served but triggers a background
/// refresh; an entry older than `hard_ttl` is never served and is recompiled
/// before `get` returns. The soft threshold never exceeds the hard one.
///
/// Deserializes from millisecond fields, either of which may be omitted:
///
/// ```
/// # use circ_rules::CacheConfig;
/// # use std::time::Duration;
/// let config: CacheConfig = serde_json::from_str(r#"{ "soft_ttl_ms": 1000 }"#).unwrap();
/// assert_eq!(config.soft_ttl(), Duration::from_secs(1));
/// assert_eq!(config.hard_ttl(), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "CacheConfigMillis")]
pub struct CacheConfig {
    soft_ttl: Duration,
    hard_ttl: Duration,
}

impl CacheConfig {
    pub const DEFAULT_SOFT_TTL: Duration = Duration::from_secs(4);
    pub const DEFAULT_HARD_TTL: Duration = Duration::from_secs(5);

    #[must_use]
    pub fn new(soft_ttl: Duration, hard_ttl: Duration) -> Self {
        Self { soft_ttl, hard_ttl }
    }

    #[must_use]
    pub fn with_soft_ttl(mut self, ttl: Duration) -> Self {
        self.soft_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_hard_ttl(mut self, ttl: Duration) -> Self {
        self.hard_ttl = ttl;
        self
    }

    /// Age after which an entry is refreshed in the background, clamped to
    /// [`hard_ttl`](Self::hard_ttl).
    #[must_use]
    pub fn soft_ttl(&self) -> Duration {
        self.soft_ttl.min(self.hard_ttl)
    }

    /// Age after which an entry is no longer served.
    #[must_use]
    pub fn hard_ttl(&self) -> Duration {
        self.hard_ttl
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SOFT_TTL, Self::DEFAULT_HARD_TTL)
    }
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CacheConfigMillis {
    soft_ttl_ms: u64,
    hard_ttl_ms: u64,
}

impl Default for CacheConfigMillis {
    fn default() -> Self {
        Self {
            soft_ttl_ms: duration_millis(CacheConfig::DEFAULT_SOFT_TTL),
            hard_ttl_ms: duration_millis(CacheConfig::DEFAULT_HARD_TTL),
        }
    }
}

fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl From<CacheConfigMillis> for CacheConfig {
    fn from(raw: CacheConfigMillis) -> Self {
        Self::new(
            Duration::from_millis(raw.soft_ttl_ms),
            Duration::from_millis(raw.hard_ttl_ms),
        )
    }
}
