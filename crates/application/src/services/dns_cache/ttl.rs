use bgp_dns_domain::config::CacheConfig;

/// Turns upstream TTLs into refresh intervals.
#[derive(Debug, Clone, Copy)]
pub struct TtlPolicy {
    /// Smallest TTL kept as-is, in seconds.
    pub floor: u32,
    /// Exclusive upper bound of the random reduction applied to clamped TTLs.
    pub jitter: u32,
    /// TTL for empty answers and names never resolved.
    pub default_ttl: u32,
}

impl TtlPolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            floor: config.ttl_floor,
            jitter: config.ttl_jitter.min(config.ttl_floor),
            default_ttl: config.default_ttl,
        }
    }

    /// TTLs at or above the floor pass through. Shorter ones become
    /// `floor - j` with `j` drawn uniformly from `[0, jitter)`, which spreads
    /// the refresh of many short-lived names across the window.
    pub fn effective(&self, response_ttl: u32) -> u32 {
        let sample = if self.jitter == 0 {
            0
        } else {
            fastrand::u32(0..self.jitter)
        };
        self.effective_with(response_ttl, sample)
    }

    pub fn effective_with(&self, response_ttl: u32, jitter_sample: u32) -> u32 {
        if response_ttl >= self.floor {
            return response_ttl;
        }
        let reduction = if self.jitter == 0 {
            0
        } else {
            jitter_sample % self.jitter
        };
        self.floor.saturating_sub(reduction).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> TtlPolicy {
        TtlPolicy {
            floor: 60,
            jitter: 10,
            default_ttl: 30,
        }
    }

    #[test]
    fn long_ttl_is_kept() {
        assert_eq!(policy().effective(300), 300);
        assert_eq!(policy().effective(60), 60);
    }

    #[test]
    fn zero_ttl_is_clamped_within_jitter_window() {
        let p = policy();
        for _ in 0..1000 {
            let ttl = p.effective(0);
            assert!(ttl > 0);
            assert!(ttl <= p.floor);
            assert!(p.floor - ttl < p.jitter);
        }
    }

    #[test]
    fn sample_is_reduced_modulo_jitter() {
        assert_eq!(policy().effective_with(5, 3), 57);
        assert_eq!(policy().effective_with(5, 13), 57);
    }

    #[test]
    fn no_jitter_clamps_exactly_to_floor() {
        let p = TtlPolicy {
            jitter: 0,
            ..policy()
        };
        assert_eq!(p.effective(1), 60);
    }
}
