//! Cooperative scheduling primitives: the frame loop, single-slot debounce
//! timers and transient visual cues.

use crate::host::{ParagraphClass, ParagraphId, UnitClass, UnitId};
use std::time::{Duration, Instant};

/// A cancellable per-frame task. The host keeps calling back while it runs.
#[derive(Debug, Default)]
pub struct PollingLoop {
    running: bool,
    generation: u64,
    frames: u64,
}

impl PollingLoop {
    /// Returns `true` when the loop was not already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.generation = self.generation.wrapping_add(1);
        self.frames = 0;
        true
    }

    pub fn stop(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Bumped on every start; frames scheduled under an older generation are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn record_frame(&mut self) {
        self.frames = self.frames.saturating_add(1);
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Single pending action; queueing again replaces the value and restarts the delay.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn queue(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    pub fn take_ready(&mut self, now: Instant) -> Option<T> {
        let (_, queued_at) = self.pending.as_ref()?;
        if now.saturating_duration_since(*queued_at) >= self.delay {
            self.pending.take().map(|(value, _)| value)
        } else {
            None
        }
    }

    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending
            .as_ref()
            .map(|(_, queued_at)| *queued_at + self.delay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Unit(UnitId, UnitClass),
    Paragraph(ParagraphId, ParagraphClass),
}

/// Classes that are applied for a short while and then removed.
#[derive(Debug, Default)]
pub struct TransientCues {
    active: Vec<(Cue, Instant)>,
}

impl TransientCues {
    /// Returns `true` if the cue was not already showing; an existing cue is extended.
    pub fn add(&mut self, cue: Cue, until: Instant) -> bool {
        if let Some(entry) = self.active.iter_mut().find(|(existing, _)| *existing == cue) {
            entry.1 = entry.1.max(until);
            return false;
        }
        self.active.push((cue, until));
        true
    }

    pub fn take_expired(&mut self, now: Instant) -> Vec<Cue> {
        let mut expired = Vec::new();
        self.active.retain(|(cue, until)| {
            if *until <= now {
                expired.push(*cue);
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn drain(&mut self) -> Vec<Cue> {
        self.active.drain(..).map(|(cue, _)| cue).collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.active.iter().map(|(_, until)| *until).min()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
