//! Delivery notifications and flood statistics

use concord_core::PeerId;

/// Receives one notification per peer per message.
///
/// Implemented for any `Fn(PeerId, &P)`, so drivers can pass a closure.
pub trait DeliverySink<P: ?Sized> {
    fn deliver(&self, peer: PeerId, payload: &P);
}

impl<P: ?Sized, F> DeliverySink<P> for F
where
    F: Fn(PeerId, &P),
{
    fn deliver(&self, peer: PeerId, payload: &P) {
        self(peer, payload)
    }
}

/// Sink that drops every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl<P: ?Sized> DeliverySink<P> for Discard {
    fn deliver(&self, _peer: PeerId, _payload: &P) {}
}

/// Propagation statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationStats {
    /// Messages originated through this engine
    pub messages_originated: u64,
    /// Delivery notifications fired
    pub deliveries: u64,
    /// Hand-offs absorbed because the receiver had already seen the message
    pub duplicates_absorbed: u64,
    /// Hand-offs scheduled (one per neighbor per first receipt)
    pub hand_offs: u64,
}

impl PropagationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_delivery(&mut self, fan_out: usize) {
        self.deliveries += 1;
        self.hand_offs += fan_out as u64;
    }

    pub fn record_duplicate(&mut self) {
        self.duplicates_absorbed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_closure_sink() {
        let seen = RefCell::new(Vec::new());
        let sink = |peer: PeerId, payload: &str| seen.borrow_mut().push((peer, payload.to_string()));

        sink.deliver(PeerId::new(1), "hi");
        assert_eq!(seen.borrow().as_slice(), &[(PeerId::new(1), "hi".to_string())]);
    }

    #[test]
    fn test_propagation_stats() {
        let mut stats = PropagationStats::new();

        stats.record_delivery(3);
        stats.record_delivery(1);
        stats.record_duplicate();

        assert_eq!(stats.deliveries, 2);
        assert_eq!(stats.hand_offs, 4);
        assert_eq!(stats.duplicates_absorbed, 1);
    }
}
