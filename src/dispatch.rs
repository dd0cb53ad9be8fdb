//! Debounce gate in front of command dispatch.
//!
//! One clock per watch session: a burst of changes across many files
//! collapses to at most one dispatch per window. The first qualifying event
//! fires and the rest of the window is dropped; nothing fires at the end of
//! a burst.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    Cooling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceDecision {
    Fire,
    Suppressed { remaining: Duration },
}

impl DebounceDecision {
    pub fn fired(&self) -> bool {
        matches!(self, DebounceDecision::Fire)
    }
}

#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_trigger: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_trigger: None,
        }
    }

    pub fn state_at(&self, now: Instant) -> DebounceState {
        match self.last_trigger {
            Some(last) if now.saturating_duration_since(last) < self.window => DebounceState::Cooling,
            _ => DebounceState::Idle,
        }
    }

    /// Decide whether a qualifying event at `now` may dispatch. A `Fire`
    /// decision records `now` as the new trigger time.
    pub fn try_fire_at(&mut self, now: Instant) -> DebounceDecision {
        if let Some(last) = self.last_trigger {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.window {
                return DebounceDecision::Suppressed {
                    remaining: self.window - elapsed,
                };
            }
        }

        self.last_trigger = Some(now);
        DebounceDecision::Fire
    }

    pub fn try_fire(&mut self) -> DebounceDecision {
        self.try_fire_at(Instant::now())
    }
}
