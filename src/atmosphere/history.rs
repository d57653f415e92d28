//! Per-propagation diagnostic history of sampled atmosphere state.
//!
//! `spec.md` 4.B: "a bounded append-only history ... used for diagnostic
//! plotting and for the 3-D 'last-valid' fallback. The history is per-
//! propagation; it is not part of the dynamical state." Unlike the
//! original implementation's module-global `WRF_history` list, this is an
//! explicit collector passed into the sampler (design note in `spec.md` §9),
//! so ensembles can opt out of the memory growth by not constructing one.

use crate::frames::Enu;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy)]
pub struct HistoryEntry {
    pub height_m: f64,
    pub wind_enu: Enu,
    pub density_kg_m3: f64,
    pub temperature_k: f64,
}

/// A bounded ring buffer of sample history. Default capacity is generous
/// enough for a single trajectory (tens of thousands of accepted steps)
/// without growing unbounded across a long propagation.
#[derive(Debug, Clone)]
pub struct AtmosphereHistory {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
}

impl AtmosphereHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AtmosphereHistory {
    /// A default capacity of 50,000 samples comfortably covers a single
    /// dark-flight trajectory at the `dt_max` step sizes in `spec.md` 4.E.
    fn default() -> Self {
        Self::with_capacity(50_000)
    }
}

/// A collector that discards every sample; used for ensemble runs where
/// `spec.md` 4.B/§9 call for disabling the diagnostic history to avoid
/// memory growth across many particles.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHistory;

impl NullHistory {
    pub fn push(&mut self, _entry: HistoryEntry) {}
}
