//! Cadence scheduler.
//!
//! Two independent timers on a monotonic millisecond clock: raw-sample
//! acquisition (fixed by the build profile) and report period (from
//! settings, may change at runtime).  The scheduler notifies a
//! [`SchedulerDelegate`] when one comes due; the main loop implements the
//! delegate by pushing into the [`EventQueue`](crate::events::EventQueue).
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   MonotonicClock (ms)                        │
//! │                          │                                   │
//! │          ┌───────────────┴───────────────┐                   │
//! │          ▼                               ▼                   │
//! │   ┌─────────────┐                 ┌─────────────┐            │
//! │   │ Sample timer│                 │ Report timer│            │
//! │   │  (10 ms)    │                 │ (period ms) │            │
//! │   └──────┬──────┘                 └──────┬──────┘            │
//! │          ▼                               ▼                   │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │              SchedulerDelegate::on_due                 │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Timers never burst to catch up: if the loop stalled (e.g. on a slow
//! feed push) a timer fires once and re-anchors on the current time.

use log::info;

use crate::app::ports::{Cadence, SchedulerDelegate};

/// One periodic timer.
#[derive(Debug, Clone, Copy)]
struct Timer {
    interval_ms: u32,
    last_fire_ms: u64,
    next_due_ms: u64,
}

impl Timer {
    fn new(now_ms: u64, interval_ms: u32) -> Self {
        let interval_ms = interval_ms.max(1);
        Self {
            interval_ms,
            last_fire_ms: now_ms,
            next_due_ms: now_ms + u64::from(interval_ms),
        }
    }

    fn poll(&mut self, now_ms: u64) -> bool {
        if now_ms < self.next_due_ms {
            return false;
        }
        self.last_fire_ms = now_ms;
        self.next_due_ms += u64::from(self.interval_ms);
        if self.next_due_ms <= now_ms {
            self.next_due_ms = now_ms + u64::from(self.interval_ms);
        }
        true
    }

    fn set_interval(&mut self, interval_ms: u32) {
        self.interval_ms = interval_ms.max(1);
        self.next_due_ms = self.last_fire_ms + u64::from(self.interval_ms);
    }
}

/// Sample + report timers.
#[derive(Debug, Clone)]
pub struct CadenceScheduler {
    sample: Timer,
    report: Timer,
}

impl CadenceScheduler {
    pub fn new(now_ms: u64, sample_interval_ms: u32, report_period_ms: u32) -> Self {
        Self {
            sample: Timer::new(now_ms, sample_interval_ms),
            report: Timer::new(now_ms, report_period_ms),
        }
    }

    /// Apply a new report period.  The next report is re-anchored on the
    /// previous one, so shortening the period may fire immediately.
    pub fn set_report_period(&mut self, period_ms: u32) {
        if period_ms.max(1) != self.report.interval_ms {
            info!(
                "Scheduler: report period {} -> {} ms",
                self.report.interval_ms, period_ms
            );
            self.report.set_interval(period_ms);
        }
    }

    pub fn report_period(&self) -> u32 {
        self.report.interval_ms
    }

    /// Check both timers against `now_ms`.  Sample fires before report,
    /// so a period's last sample lands in that period.
    pub fn tick(&mut self, now_ms: u64, delegate: &mut dyn SchedulerDelegate) {
        if self.sample.poll(now_ms) {
            delegate.on_due(Cadence::Sample);
        }
        if self.report.poll(now_ms) {
            delegate.on_due(Cadence::Report);
        }
    }

    /// Earliest time (ms) anything comes due; the loop may sleep until then.
    pub fn next_deadline(&self) -> u64 {
        self.sample.next_due_ms.min(self.report.next_due_ms)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
