//! Runtime counters shared by all peer tasks

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters updated by peer tasks
#[derive(Debug, Default)]
pub struct RuntimeStats {
    deliveries: AtomicU64,
    duplicates_absorbed: AtomicU64,
    hand_offs: AtomicU64,
    hops: AtomicU64,
    replacements: AtomicU64,
    absorptions: AtomicU64,
    exhausted: AtomicU64,
}

/// Point-in-time copy of [`RuntimeStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub deliveries: u64,
    pub duplicates_absorbed: u64,
    pub hand_offs: u64,
    pub hops: u64,
    pub replacements: u64,
    pub absorptions: u64,
    pub exhausted: u64,
}

impl RuntimeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_delivery(&self) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates_absorbed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hand_off(&self) {
        self.hand_offs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hop(&self) {
        self.hops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_replacement(&self) {
        self.replacements.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_absorption(&self) {
        self.absorptions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_exhausted(&self) {
        self.exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            deliveries: self.deliveries.load(Ordering::Relaxed),
            duplicates_absorbed: self.duplicates_absorbed.load(Ordering::Relaxed),
            hand_offs: self.hand_offs.load(Ordering::Relaxed),
            hops: self.hops.load(Ordering::Relaxed),
            replacements: self.replacements.load(Ordering::Relaxed),
            absorptions: self.absorptions.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
        }
    }
}
