#![forbid(unsafe_code)]

//! Refresh requests and coordinator phases.
//!
//! A [`RefreshTrigger`] is the clonable handle through which model sources,
//! event handlers, and reactive subscriptions ask for a refresh. Clones share
//! one pending flag and one [`Phase`] cell, so anyone holding a trigger can see
//! whether a cycle is in flight.
//!
//! # Invariants
//!
//! 1. Requests are idempotent until taken: any number of requests between two
//!    cycles count as one pending refresh.
//! 2. The phase is written only by the coordinator; triggers read it.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Where the coordinator is in its refresh cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No cycle in flight.
    #[default]
    Idle,
    /// Pulling models from bound sources and building the snapshot.
    Refreshing,
    /// Running the diff engine.
    Diffing,
    /// Handing the change-set to the view surface.
    Applying,
}

impl Phase {
    /// Whether a cycle is in flight.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        !matches!(self, Self::Idle)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Refreshing => "refreshing",
            Self::Diffing => "diffing",
            Self::Applying => "applying",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared pending-refresh flag plus the coordinator's current phase.
#[derive(Clone, Default)]
pub struct RefreshTrigger {
    pending: Rc<Cell<bool>>,
    requests: Rc<Cell<u64>>,
    phase: Rc<Cell<Phase>>,
}

impl RefreshTrigger {
    /// A trigger with nothing pending, in [`Phase::Idle`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a refresh as pending.
    pub fn request(&self) {
        self.pending.set(true);
        self.requests.set(self.requests.get() + 1);
    }

    /// Whether a refresh is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.get()
    }

    /// Clear the pending flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.pending.replace(false)
    }

    /// Total requests ever made, coalesced ones included.
    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.requests.get()
    }

    /// The coordinator's current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        self.phase.set(phase);
    }
}

impl fmt::Debug for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshTrigger")
            .field("pending", &self.pending.get())
            .field("requests", &self.requests.get())
            .field("phase", &self.phase.get())
            .finish()
    }
}
