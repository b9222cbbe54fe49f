use std::time::Duration;

/// Ring buffer of recent tick durations.
#[derive(Debug)]
pub struct TickTimer {
    history: Vec<Duration>,
    capacity: usize,
    index: usize,
    filled: bool,
}

impl TickTimer {
    /// A timer remembering the last `capacity` ticks. A capacity of zero is
    /// bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: vec![Duration::ZERO; capacity],
            capacity,
            index: 0,
            filled: false,
        }
    }

    pub fn record(&mut self, dt: Duration) {
        self.history[self.index] = dt;
        self.index = (self.index + 1) % self.capacity;
        if self.index == 0 {
            self.filled = true;
        }
    }

    fn samples(&self) -> &[Duration] {
        &self.history[..self.count()]
    }

    pub fn average(&self) -> Duration {
        let samples = self.samples();
        if samples.is_empty() {
            return Duration::ZERO;
        }
        samples.iter().sum::<Duration>() / samples.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.samples().iter().copied().max().unwrap_or(Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.samples().iter().copied().min().unwrap_or(Duration::ZERO)
    }

    /// Nearest-rank percentile of the recorded ticks, `p` in `0.0..=1.0`.
    pub fn percentile(&self, p: f64) -> Duration {
        let mut sorted = self.samples().to_vec();
        if sorted.is_empty() {
            return Duration::ZERO;
        }
        sorted.sort_unstable();
        let rank = (p.clamp(0.0, 1.0) * sorted.len() as f64).ceil() as usize;
        sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
    }

    /// Most recent tick, if any.
    pub fn last(&self) -> Option<Duration> {
        if self.count() == 0 {
            return None;
        }
        let i = (self.index + self.capacity - 1) % self.capacity;
        Some(self.history[i])
    }

    pub fn count(&self) -> usize {
        if self.filled {
            self.capacity
        } else {
            self.index
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_timer_tracks_history() {
        let mut timer = TickTimer::new(3);
        timer.record(Duration::from_millis(10));
        timer.record(Duration::from_millis(20));
        timer.record(Duration::from_millis(30));

        assert_eq!(timer.count(), 3);
        assert_eq!(timer.average(), Duration::from_millis(20));
        assert_eq!(timer.max(), Duration::from_millis(30));
        assert_eq!(timer.min(), Duration::from_millis(10));
    }

    #[test]
    fn tick_timer_wraps_around() {
        let mut timer = TickTimer::new(2);
        timer.record(Duration::from_millis(10));
        timer.record(Duration::from_millis(20));
        timer.record(Duration::from_millis(30)); // overwrites first

        assert_eq!(timer.count(), 2);
        assert_eq!(timer.average(), Duration::from_millis(25));
        assert_eq!(timer.last(), Some(Duration::from_millis(30)));
    }

    #[test]
    fn percentile_uses_nearest_rank() {
        let mut timer = TickTimer::new(10);
        for ms in [5, 1, 4, 2, 3] {
            timer.record(Duration::from_millis(ms));
        }
        assert_eq!(timer.percentile(0.5), Duration::from_millis(3));
        assert_eq!(timer.percentile(0.95), Duration::from_millis(5));
        assert_eq!(timer.percentile(0.0), Duration::from_millis(1));
    }

    #[test]
    fn empty_timer_reports_zero() {
        let timer = TickTimer::new(0);
        assert_eq!(timer.count(), 0);
        assert_eq!(timer.average(), Duration::ZERO);
        assert_eq!(timer.max(), Duration::ZERO);
        assert_eq!(timer.percentile(0.9), Duration::ZERO);
        assert_eq!(timer.last(), None);
    }
}
