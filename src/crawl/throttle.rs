// src/crawl/throttle.rs
// =============================================================================
// Adaptive politeness delay.
//
// The delay between requests to one site is a feedback loop, not a
// constant: each response's latency pulls the delay toward
// latency / target_concurrency (averaged with the current value so one
// outlier can't yank it around), clamped to [base_delay, max_delay].
// Failures double the delay; they never relax it. The actual sleep is
// the current delay times a uniform draw from the jitter band
// [1 - jitter, 1 + jitter].
// =============================================================================

use rand::Rng;
use std::sync::Mutex;
use std::time::Duration;

pub struct AutoThrottle {
    delay_secs: Mutex<f64>,
    base_delay: f64,
    max_delay: f64,
    target_concurrency: f64,
    jitter: f64,
}

impl AutoThrottle {
    pub fn new(base_delay: f64, max_delay: f64, target_concurrency: f64, jitter: f64) -> Self {
        AutoThrottle {
            delay_secs: Mutex::new(base_delay),
            base_delay,
            max_delay,
            target_concurrency: target_concurrency.max(0.1),
            jitter: jitter.clamp(0.0, 1.0),
        }
    }

    /// Feeds one successful response's latency into the controller.
    pub fn record_response(&self, latency: Duration) {
        let target = latency.as_secs_f64() / self.target_concurrency;
        let mut delay = self.delay_secs.lock().unwrap();
        let next = (*delay + target) / 2.0;
        *delay = next.clamp(self.base_delay, self.max_delay);
    }

    /// A failed fetch backs the delay off; it never shortens it.
    pub fn record_failure(&self) {
        let mut delay = self.delay_secs.lock().unwrap();
        *delay = (*delay * 2.0).min(self.max_delay);
    }

    /// Current delay without jitter, mostly for inspection.
    pub fn current_delay(&self) -> Duration {
        Duration::from_secs_f64(*self.delay_secs.lock().unwrap())
    }

    /// The sleep to take before the next request: current delay
    /// randomized within the jitter band.
    pub fn next_delay(&self) -> Duration {
        let delay = *self.delay_secs.lock().unwrap();
        let factor = if self.jitter > 0.0 {
            rand::thread_rng().gen_range(1.0 - self.jitter..=1.0 + self.jitter)
        } else {
            1.0
        };
        Duration::from_secs_f64((delay * factor).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slow_responses_raise_the_delay() {
        let throttle = AutoThrottle::new(1.0, 60.0, 2.0, 0.0);
        // 10s latency at target concurrency 2 pulls toward 5s
        throttle.record_response(Duration::from_secs(10));
        let delay = throttle.current_delay().as_secs_f64();
        assert!(delay > 1.0 && delay <= 5.0, "got {}", delay);
    }

    #[test]
    fn test_fast_responses_relax_back_to_base() {
        let throttle = AutoThrottle::new(1.0, 60.0, 2.0, 0.0);
        throttle.record_response(Duration::from_secs(20));
        let raised = throttle.current_delay();
        for _ in 0..20 {
            throttle.record_response(Duration::from_millis(100));
        }
        let relaxed = throttle.current_delay();
        assert!(relaxed < raised);
        // Never below the configured base
        assert!(relaxed.as_secs_f64() >= 1.0);
    }

    #[test]
    fn test_failures_double_up_to_the_ceiling() {
        let throttle = AutoThrottle::new(1.0, 8.0, 2.0, 0.0);
        for _ in 0..10 {
            throttle.record_failure();
        }
        assert_eq!(throttle.current_delay(), Duration::from_secs_f64(8.0));
    }

    #[test]
    fn test_jitter_band_bounds_the_sleep() {
        let throttle = AutoThrottle::new(2.0, 60.0, 2.0, 0.5);
        for _ in 0..100 {
            let d = throttle.next_delay().as_secs_f64();
            assert!((1.0..=3.0).contains(&d), "jittered delay {} out of band", d);
        }
    }

    #[test]
    fn test_zero_jitter_is_deterministic() {
        let throttle = AutoThrottle::new(2.0, 60.0, 2.0, 0.0);
        assert_eq!(throttle.next_delay(), Duration::from_secs_f64(2.0));
    }
}
