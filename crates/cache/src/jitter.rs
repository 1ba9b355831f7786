//! TTL 随机抖动
//!
//! 大量键以相同 TTL 写入时会在同一时刻集中失效，写入时叠加一段随机时长把过期时间打散

use rand::Rng;
use std::time::Duration;

/// 在基础 TTL 上追加 `[0, range]` 的随机时长
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlJitter {
    range: Duration,
}

impl TtlJitter {
    pub fn new(range: Duration) -> Self {
        Self { range }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn range(&self) -> Duration {
        self.range
    }

    pub fn apply(&self, ttl: Duration) -> Duration {
        let range_ms = self.range.as_millis() as u64;
        if range_ms == 0 {
            return ttl;
        }

        let extra_ms = rand::thread_rng().gen_range(0..=range_ms);
        ttl + Duration::from_millis(extra_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_zero_range_keeps_ttl() {
        let jitter = TtlJitter::none();
        assert_eq!(jitter.apply(Duration::from_secs(300)), Duration::from_secs(300));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let jitter = TtlJitter::new(Duration::from_secs(30));
        let base = Duration::from_secs(300);

        let ttls: Vec<Duration> = (0..50).map(|_| jitter.apply(base)).collect();

        for ttl in &ttls {
            assert!(*ttl >= base && *ttl <= base + Duration::from_secs(30));
        }
        let unique = ttls.iter().collect::<HashSet<_>>().len();
        assert!(unique > 1);
    }
}
