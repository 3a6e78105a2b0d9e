//! Notification recorders
//!
//! Recorders are cheap handles over shared storage: hand one clone to an
//! engine or network and keep another to inspect what happened.

use std::collections::HashMap;
use std::sync::Arc;

use concord_core::PeerId;
use concord_diffusion::DeliverySink;
use concord_ring::AbsorptionSink;
use parking_lot::Mutex;

/// Records every delivery notification
#[derive(Debug)]
pub struct DeliveryRecorder<P> {
    log: Arc<Mutex<Vec<(PeerId, P)>>>,
}

impl<P> Clone for DeliveryRecorder<P> {
    fn clone(&self) -> Self {
        Self {
            log: Arc::clone(&self.log),
        }
    }
}

impl<P> Default for DeliveryRecorder<P> {
    fn default() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<P: Clone> DeliveryRecorder<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliveries in the order they were recorded
    pub fn deliveries(&self) -> Vec<(PeerId, P)> {
        self.log.lock().clone()
    }

    /// Peers in the order they were delivered to
    pub fn peers(&self) -> Vec<PeerId> {
        self.log.lock().iter().map(|(p, _)| *p).collect()
    }

    /// Number of deliveries per peer
    pub fn counts(&self) -> HashMap<PeerId, usize> {
        let mut counts = HashMap::new();
        for (peer, _) in self.log.lock().iter() {
            *counts.entry(*peer).or_insert(0) += 1;
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

impl<P: Clone> DeliverySink<P> for DeliveryRecorder<P> {
    fn deliver(&self, peer: PeerId, payload: &P) {
        self.log.lock().push((peer, payload.clone()));
    }
}

/// Records every absorption notification
#[derive(Debug)]
pub struct AbsorptionRecorder<V> {
    log: Arc<Mutex<Vec<(PeerId, V)>>>,
}

impl<V> Clone for AbsorptionRecorder<V> {
    fn clone(&self) -> Self {
        Self {
            log: Arc::clone(&self.log),
        }
    }
}

impl<V> Default for AbsorptionRecorder<V> {
    fn default() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<V: Clone> AbsorptionRecorder<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorptions(&self) -> Vec<(PeerId, V)> {
        self.log.lock().clone()
    }

    /// Distinct values declared across all absorptions
    pub fn declared_values(&self) -> Vec<V>
    where
        V: PartialEq,
    {
        let mut values: Vec<V> = Vec::new();
        for (_, v) in self.log.lock().iter() {
            if !values.contains(v) {
                values.push(v.clone());
            }
        }
        values
    }

    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }
}

impl<V: Clone> AbsorptionSink<V> for AbsorptionRecorder<V> {
    fn absorbed(&self, peer: PeerId, value: &V) {
        self.log.lock().push((peer, value.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_storage() {
        let recorder = DeliveryRecorder::<String>::new();
        let handle = recorder.clone();

        recorder.deliver(PeerId::new(1), &"a".to_string());
        recorder.deliver(PeerId::new(1), &"b".to_string());

        assert_eq!(handle.len(), 2);
        assert_eq!(handle.counts()[&PeerId::new(1)], 2);
    }

    #[test]
    fn test_declared_values_dedup() {
        let recorder = AbsorptionRecorder::<u64>::new();
        recorder.absorbed(PeerId::new(1), &4);
        recorder.absorbed(PeerId::new(2), &4);
        recorder.absorbed(PeerId::new(3), &2);

        assert_eq!(recorder.declared_values(), vec![4, 2]);
    }
}
