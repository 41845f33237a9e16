//! Continuous adaptive frame sizing

use netopt_common::TunnelBounds;
use std::collections::VecDeque;
use tracing::debug;

/// Samples kept in the rolling measurement window
const WINDOW_SIZE: usize = 20;

/// Samples required before the sizer starts adjusting
const MIN_SAMPLES: usize = 5;

/// Error rate below which the link counts as clean
const LOW_ERROR_RATE: f64 = 0.01;

/// Error rate above which the frame size backs off
const HIGH_ERROR_RATE: f64 = 0.05;

/// One per-cycle link measurement
#[derive(Debug, Clone, Copy)]
pub struct FrameSample {
    /// Frame error rate observed over the cycle (0.0 - 1.0)
    pub error_rate: f64,
    /// Observed throughput in Mbps
    pub throughput_mbps: f64,
}

/// Rolling-window frame-size controller
///
/// Grows the frame when the recent window is clean and fast, shrinks it
/// when errors rise or throughput collapses. Never leaves the configured
/// [min, max] range.
#[derive(Debug)]
pub struct AdaptiveFrameSizer {
    bounds: TunnelBounds,
    window: VecDeque<FrameSample>,
    current: u32,
}

impl AdaptiveFrameSizer {
    /// Create a sizer starting from a conservative mid-range frame size
    pub fn new(bounds: TunnelBounds) -> Self {
        let current = 1500u32.clamp(bounds.min_frame_size, bounds.max_frame_size);
        Self {
            bounds,
            window: VecDeque::with_capacity(WINDOW_SIZE),
            current,
        }
    }

    /// Record a link measurement
    pub fn record(&mut self, sample: FrameSample) {
        if !sample.error_rate.is_finite() || !sample.throughput_mbps.is_finite() {
            return;
        }
        if self.window.len() >= WINDOW_SIZE {
            self.window.pop_front();
        }
        self.window.push_back(sample);
    }

    /// Nudge the frame size from the recent window and return it
    ///
    /// `target_throughput_mbps` is the throughput above which the link
    /// counts as fast.
    pub fn adjust(&mut self, target_throughput_mbps: f64) -> u32 {
        if self.window.len() < MIN_SAMPLES {
            return self.current;
        }

        let n = self.window.len() as f64;
        let avg_error = self.window.iter().map(|s| s.error_rate).sum::<f64>() / n;
        let avg_throughput = self.window.iter().map(|s| s.throughput_mbps).sum::<f64>() / n;

        let step = self.bounds.frame_step;
        let before = self.current;
        if avg_error < LOW_ERROR_RATE && avg_throughput >= target_throughput_mbps {
            self.current = self
                .current
                .saturating_add(step)
                .min(self.bounds.max_frame_size);
        } else if avg_error > HIGH_ERROR_RATE || avg_throughput < 0.5 * target_throughput_mbps {
            self.current = self
                .current
                .saturating_sub(step)
                .max(self.bounds.min_frame_size);
        }

        if self.current != before {
            debug!(
                from = before,
                to = self.current,
                avg_error,
                avg_throughput,
                "adaptive frame size changed"
            );
        }
        self.current
    }

    /// Current frame size without adjusting
    pub fn current_frame_size(&self) -> u32 {
        self.current
    }

    /// Whether enough samples have accumulated to adjust
    pub fn warmed_up(&self) -> bool {
        self.window.len() >= MIN_SAMPLES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> TunnelBounds {
        TunnelBounds {
            min_frame_size: 576,
            max_frame_size: 9_000,
            frame_step: 64,
            ..TunnelBounds::default()
        }
    }

    fn clean(throughput: f64) -> FrameSample {
        FrameSample {
            error_rate: 0.0,
            throughput_mbps: throughput,
        }
    }

    fn lossy() -> FrameSample {
        FrameSample {
            error_rate: 0.10,
            throughput_mbps: 10.0,
        }
    }

    #[test]
    fn clean_fast_window_grows_frame_by_step() {
        let mut sizer = AdaptiveFrameSizer::new(bounds());
        let before = sizer.current_frame_size();
        for _ in 0..5 {
            sizer.record(clean(80.0));
        }
        let after = sizer.adjust(50.0);
        assert_eq!(after, before + 64);
    }

    #[test]
    fn growth_caps_at_max() {
        let mut sizer = AdaptiveFrameSizer::new(bounds());
        for _ in 0..10 {
            sizer.record(clean(80.0));
        }
        for _ in 0..500 {
            sizer.adjust(50.0);
        }
        assert_eq!(sizer.current_frame_size(), 9_000);
    }

    #[test]
    fn errors_shrink_frame_to_floor() {
        let mut sizer = AdaptiveFrameSizer::new(bounds());
        for _ in 0..10 {
            sizer.record(lossy());
        }
        for _ in 0..500 {
            sizer.adjust(50.0);
        }
        assert_eq!(sizer.current_frame_size(), 576);
    }

    #[test]
    fn no_adjustment_before_warmup() {
        let mut sizer = AdaptiveFrameSizer::new(bounds());
        let before = sizer.current_frame_size();
        for _ in 0..MIN_SAMPLES - 1 {
            sizer.record(clean(80.0));
        }
        assert!(!sizer.warmed_up());
        assert_eq!(sizer.adjust(50.0), before);
    }

    #[test]
    fn slow_but_clean_window_holds() {
        let mut sizer = AdaptiveFrameSizer::new(bounds());
        let before = sizer.current_frame_size();
        for _ in 0..5 {
            sizer.record(clean(30.0)); // above half target, below target
        }
        assert_eq!(sizer.adjust(50.0), before);
    }

    #[test]
    fn stays_in_bounds_under_mixed_traffic() {
        let mut sizer = AdaptiveFrameSizer::new(bounds());
        for i in 0..200 {
            let sample = if i % 3 == 0 { lossy() } else { clean(70.0) };
            sizer.record(sample);
            let frame = sizer.adjust(50.0);
            assert!((576..=9_000).contains(&frame));
        }
    }
}
