//! Raw-sample averaging.
//!
//! Two policies feed the conversion stage:
//!
//! - **Epoch**: sum and count every sample until the report period
//!   expires, then average and start over.  Exact over the interval.
//! - **Window(N)**: keep the last `N` samples in a ring buffer with a
//!   running sum.  The average is always over the most recent samples,
//!   so sampling and reporting cadences are independent.

/// Largest supported sliding window.
pub const MAX_WINDOW: usize = 64;

/// Averaging strategy for one analog channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AveragingPolicy {
    Epoch,
    /// Sliding window over the last `n` samples (1..=[`MAX_WINDOW`]).
    Window(usize),
}

/// Result of averaging: the mean raw value and how many samples made it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Average {
    pub raw: f64,
    pub samples: u32,
}

impl Average {
    pub const EMPTY: Self = Self { raw: 0.0, samples: 0 };
}

/// Accumulates raw ADC counts under a chosen [`AveragingPolicy`].
#[derive(Debug, Clone)]
pub struct SampleAverager {
    policy: AveragingPolicy,
    // Epoch state
    sum: u64,
    count: u32,
    // Window state
    ring: [u16; MAX_WINDOW],
    head: usize,
    filled: usize,
    window_sum: u32,
}

impl SampleAverager {
    pub fn new(policy: AveragingPolicy) -> Self {
        let policy = match policy {
            AveragingPolicy::Window(n) => AveragingPolicy::Window(n.clamp(1, MAX_WINDOW)),
            p => p,
        };
        Self {
            policy,
            sum: 0,
            count: 0,
            ring: [0; MAX_WINDOW],
            head: 0,
            filled: 0,
            window_sum: 0,
        }
    }

    pub fn policy(&self) -> AveragingPolicy {
        self.policy
    }

    /// Record one raw sample.
    pub fn push(&mut self, raw: u16) {
        match self.policy {
            AveragingPolicy::Epoch => {
                self.sum += u64::from(raw);
                self.count = self.count.saturating_add(1);
            }
            AveragingPolicy::Window(n) => {
                if self.filled == n {
                    self.window_sum -= u32::from(self.ring[self.head]);
                } else {
                    self.filled += 1;
                }
                self.ring[self.head] = raw;
                self.window_sum += u32::from(raw);
                self.head = (self.head + 1) % n;
            }
        }
    }

    /// Current average without closing the period.
    pub fn average(&self) -> Average {
        match self.policy {
            AveragingPolicy::Epoch if self.count > 0 => Average {
                raw: self.sum as f64 / f64::from(self.count),
                samples: self.count,
            },
            AveragingPolicy::Window(_) if self.filled > 0 => Average {
                raw: f64::from(self.window_sum) / self.filled as f64,
                samples: self.filled as u32,
            },
            _ => Average::EMPTY,
        }
    }

    /// Close the report period: return the average, and reset the epoch
    /// accumulator.  A sliding window keeps its samples.
    pub fn finish_period(&mut self) -> Average {
        let avg = self.average();
        if self.policy == AveragingPolicy::Epoch {
            self.sum = 0;
            self.count = 0;
        }
        avg
    }
}
