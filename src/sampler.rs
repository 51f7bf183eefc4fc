//! Frame sampling: bounds the decode rate by dropping frames, never queueing them.

use std::time::Duration;

use log::{debug, info};

use crate::models::Frame;

/// Consecutive slow (or fast) decodes before the interval is adjusted.
const ADAPT_AFTER: u32 = 3;

/// Rate limiter between the frame source and the decode engine.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    base_interval: Duration,
    max_interval: Duration,
    interval: Duration,
    last_accepted: Option<Duration>,
    slow_streak: u32,
    fast_streak: u32,
}

impl FrameSampler {
    /// Sampler with a fixed minimum interval and an adaptive ceiling.
    pub fn new(min_interval: Duration, max_interval: Duration) -> Self {
        Self {
            base_interval: min_interval,
            max_interval: max_interval.max(min_interval),
            interval: min_interval,
            last_accepted: None,
            slow_streak: 0,
            fast_streak: 0,
        }
    }

    /// Returns the frame if it should be decoded now, `None` if it is dropped.
    pub fn offer(&mut self, frame: Frame) -> Option<Frame> {
        let ts = frame.timestamp();
        if let Some(last) = self.last_accepted {
            // saturating: equal timestamps count as zero elapsed
            if ts.saturating_sub(last) < self.interval {
                debug!(
                    "sampler dropped frame {} ({:?} since last accepted)",
                    frame.sequence(),
                    ts.saturating_sub(last)
                );
                return None;
            }
        }
        self.last_accepted = Some(ts);
        Some(frame)
    }

    /// Feed back how long a decode took.
    ///
    /// Sustained decodes slower than the interval widen it to 5/4 of the
    /// observed time (capped); sustained fast decodes relax it back toward the
    /// base interval.
    pub fn record_decode_time(&mut self, elapsed: Duration) {
        if elapsed > self.interval {
            self.fast_streak = 0;
            self.slow_streak += 1;
            if self.slow_streak >= ADAPT_AFTER && self.interval < self.max_interval {
                let widened = (elapsed * 5 / 4).min(self.max_interval);
                if widened > self.interval {
                    info!("decode falling behind, widening sampler interval to {widened:?}");
                    self.interval = widened;
                }
                self.slow_streak = 0;
            }
        } else {
            self.slow_streak = 0;
            self.fast_streak += 1;
            if self.fast_streak >= ADAPT_AFTER && self.interval > self.base_interval {
                let relaxed = (self.interval * 3 / 4).max(self.base_interval).max(elapsed);
                if relaxed < self.interval {
                    debug!("relaxing sampler interval to {relaxed:?}");
                    self.interval = relaxed;
                }
                self.fast_streak = 0;
            }
        }
    }

    /// Current minimum inter-decode interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Forget the last accepted frame and any adaptation.
    pub fn reset(&mut self) {
        self.interval = self.base_interval;
        self.last_accepted = None;
        self.slow_streak = 0;
        self.fast_streak = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PixelFormat;

    fn frame_at(ms: u64, seq: u64) -> Frame {
        Frame::new(vec![0u8; 1], 1, 1, PixelFormat::Luma8, Duration::from_millis(ms), seq)
    }

    fn sampler() -> FrameSampler {
        FrameSampler::new(Duration::from_millis(100), Duration::from_millis(400))
    }

    #[test]
    fn test_first_frame_accepted() {
        let mut s = sampler();
        assert!(s.offer(frame_at(0, 0)).is_some());
    }

    #[test]
    fn test_drops_frames_inside_interval() {
        let mut s = sampler();
        let accepted: Vec<u64> = (0..10)
            .filter_map(|i| s.offer(frame_at(i * 33, i)))
            .map(|f| f.sequence())
            .collect();
        // 0ms, 132ms, 264ms
        assert_eq!(accepted, vec![0, 4, 8]);
    }

    #[test]
    fn test_gaps_are_not_errors() {
        let mut s = sampler();
        assert!(s.offer(frame_at(0, 0)).is_some());
        assert!(s.offer(frame_at(5_000, 90)).is_some());
    }

    #[test]
    fn test_widens_after_sustained_slow_decodes() {
        let mut s = sampler();
        s.record_decode_time(Duration::from_millis(200));
        s.record_decode_time(Duration::from_millis(200));
        assert_eq!(s.interval(), Duration::from_millis(100));
        s.record_decode_time(Duration::from_millis(200));
        assert_eq!(s.interval(), Duration::from_millis(250));

        // Capped
        for _ in 0..6 {
            s.record_decode_time(Duration::from_secs(2));
        }
        assert_eq!(s.interval(), Duration::from_millis(400));
    }

    #[test]
    fn test_relaxes_after_fast_decodes() {
        let mut s = sampler();
        for _ in 0..3 {
            s.record_decode_time(Duration::from_millis(300));
        }
        let widened = s.interval();
        assert!(widened > Duration::from_millis(100));
        for _ in 0..30 {
            s.record_decode_time(Duration::from_millis(10));
        }
        assert_eq!(s.interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_reset() {
        let mut s = sampler();
        assert!(s.offer(frame_at(0, 0)).is_some());
        assert!(s.offer(frame_at(10, 1)).is_none());
        s.reset();
        assert!(s.offer(frame_at(10, 1)).is_some());
    }
}
