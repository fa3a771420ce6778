//! Rolling uptime window.

use std::collections::VecDeque;
use std::time::Duration;

/// Bounded history of check outcomes used to compute uptime.
#[derive(Debug, Clone)]
pub struct UptimeWindow {
    window_secs: u64,
    /// (unix timestamp, was up), oldest first.
    samples: VecDeque<(u64, bool)>,
}

impl UptimeWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window_secs: window.as_secs(),
            samples: VecDeque::new(),
        }
    }

    /// Add a sample taken at `now` and drop samples that fell out of the window.
    pub fn record(&mut self, now: u64, up: bool) {
        self.samples.push_back((now, up));
        let cutoff = now.saturating_sub(self.window_secs);
        while let Some(&(ts, _)) = self.samples.front() {
            if ts >= cutoff {
                break;
            }
            self.samples.pop_front();
        }
    }

    /// Percentage of samples in the window that were up; 100 when empty.
    pub fn percentage(&self) -> f64 {
        if self.samples.is_empty() {
            return 100.0;
        }
        let up = self.samples.iter().filter(|(_, up)| *up).count();
        up as f64 / self.samples.len() as f64 * 100.0
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
