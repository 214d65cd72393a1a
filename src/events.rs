//! Main-loop event queue.
//!
//! Events are produced by:
//! - the cadence scheduler (sample tick, report tick)
//! - the main loop itself (serial poll, HTTP poll every iteration)
//!
//! They are consumed one iteration at a time in **priority order**, which
//! is also the per-period processing order: sample → parse → report.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Scheduler   │────▶│  EventQueue  │────▶│  Main Loop   │
//! │ Main loop   │────▶│ (pending set)│     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! The queue is a set, not a FIFO: an event already pending is not queued
//! twice.  A report that came due twice before the loop ran is one report.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::app::ports::{Cadence, SchedulerDelegate};

/// Loop events, lower discriminant = handled first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    /// Take one raw sample per channel.
    SampleTick = 0,
    /// Drain the serial port into the command parser.
    SerialPoll = 1,
    /// Report period expired.
    ReportTick = 2,
    /// Accept and serve pending HTTP requests.
    HttpPoll = 3,
}

const ALL_EVENTS: [Event; 4] = [
    Event::SampleTick,
    Event::SerialPoll,
    Event::ReportTick,
    Event::HttpPoll,
];

impl Event {
    const fn mask(self) -> u8 {
        1 << self as u8
    }
}

/// Lock-free pending-event set.  Pushing only needs `&self`, so a timer
/// callback may hold a shared reference while the main loop drains.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: AtomicU8,
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            pending: AtomicU8::new(0),
        }
    }

    /// Mark `event` pending.  Returns `false` if it already was.
    pub fn push(&self, event: Event) -> bool {
        let prev = self.pending.fetch_or(event.mask(), Ordering::AcqRel);
        prev & event.mask() == 0
    }

    /// Take the highest-priority pending event.
    pub fn pop(&self) -> Option<Event> {
        loop {
            let current = self.pending.load(Ordering::Acquire);
            let event = ALL_EVENTS.into_iter().find(|e| current & e.mask() != 0)?;
            if self
                .pending
                .compare_exchange(
                    current,
                    current & !event.mask(),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                return Some(event);
            }
        }
    }

    /// Drain all pending events into a callback, in priority order.
    /// Events pushed by the handler are picked up in the same drain.
    pub fn drain(&self, mut handler: impl FnMut(Event)) {
        while let Some(event) = self.pop() {
            handler(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.load(Ordering::Acquire) == 0
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::Acquire).count_ones() as usize
    }
}

impl SchedulerDelegate for EventQueue {
    fn on_due(&mut self, cadence: Cadence) {
        let event = match cadence {
            Cadence::Sample => Event::SampleTick,
            Cadence::Report => Event::ReportTick,
        };
        self.push(event);
    }
}
