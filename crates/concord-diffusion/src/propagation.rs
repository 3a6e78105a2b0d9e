//! Propagation - How a message floods through the topology
//!
//! The flood is driven by a single controller consuming a worklist of
//! pending hand-offs, so deep or large graphs never grow the call stack.

use std::collections::{HashSet, VecDeque};
use std::marker::PhantomData;
use std::sync::Arc;

use concord_core::{ConcordResult, MessageId, MessageIdAllocator, PeerId, PeerIndex};
use tracing::{debug, info, trace};

use crate::{DeliverySink, PropagationStats, Topology};

/// Per-peer record of processed message ids. Never shrinks.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    ids: HashSet<MessageId>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id`. Returns `false` if it was already present.
    #[inline]
    pub fn insert(&mut self, id: MessageId) -> bool {
        self.ids.insert(id)
    }

    #[inline]
    pub fn contains(&self, id: MessageId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// A message being disseminated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message<P> {
    pub id: MessageId,
    pub payload: P,
}

impl<P> Message<P> {
    pub fn new(id: MessageId, payload: P) -> Self {
        Self { id, payload }
    }
}

/// Flood dissemination engine.
///
/// Owns the topology and every peer's seen-set. Delivery notifications go
/// to the sink `S` in the order peers are reached (breadth-first from the
/// originator), though callers must not rely on any particular order.
pub struct DisseminationEngine<P, S> {
    topology: Topology,
    /// Seen-set of each peer, indexed by `PeerIndex`
    seen: Vec<SeenSet>,
    ids: Arc<MessageIdAllocator>,
    sink: S,
    stats: PropagationStats,
    _payload: PhantomData<fn(&P)>,
}

impl<P, S> DisseminationEngine<P, S>
where
    S: DeliverySink<P>,
{
    /// Create an engine with its own message id allocator
    pub fn new(topology: Topology, sink: S) -> Self {
        Self::with_allocator(topology, sink, Arc::new(MessageIdAllocator::new()))
    }

    /// Create an engine drawing ids from a shared allocator
    pub fn with_allocator(topology: Topology, sink: S, ids: Arc<MessageIdAllocator>) -> Self {
        let seen = vec![SeenSet::new(); topology.peer_count()];
        Self {
            topology,
            seen,
            ids,
            sink,
            stats: PropagationStats::new(),
            _payload: PhantomData,
        }
    }

    /// Originate `payload` at `peer` and flood it to every reachable peer.
    ///
    /// The originator itself is delivered the message first.
    pub fn originate(&mut self, peer: PeerId, payload: P) -> ConcordResult<MessageId> {
        let origin = self.topology.resolve(peer)?;
        let id = self.ids.next();
        self.stats.messages_originated += 1;

        let delivered = self.flood(origin, id, &payload, None);
        info!(message = %id, origin = %peer, delivered, "message disseminated");

        Ok(id)
    }

    /// Hand message `id` to `peer` as if it arrived from `sender`.
    ///
    /// If `peer` has already seen `id` this is a no-op. Otherwise `peer`
    /// is delivered the message and it floods onward from there, skipping
    /// `sender`. Returns the number of deliveries this call caused.
    pub fn propagate(
        &mut self,
        peer: PeerId,
        id: MessageId,
        payload: &P,
        sender: Option<PeerId>,
    ) -> ConcordResult<usize> {
        let target = self.topology.resolve(peer)?;
        let sender = sender.map(|s| self.topology.resolve(s)).transpose()?;

        Ok(self.flood(target, id, payload, sender))
    }

    fn flood(
        &mut self,
        start: PeerIndex,
        id: MessageId,
        payload: &P,
        sender: Option<PeerIndex>,
    ) -> usize {
        let mut worklist = VecDeque::from([(start, sender)]);
        let mut delivered = 0;

        while let Some((idx, from)) = worklist.pop_front() {
            if !self.seen[idx.as_usize()].insert(id) {
                self.stats.record_duplicate();
                trace!(peer = %self.topology.id(idx), message = %id, "duplicate absorbed");
                continue;
            }

            let peer = self.topology.id(idx);
            debug!(peer = %peer, message = %id, "delivered");
            self.sink.deliver(peer, payload);
            delivered += 1;

            let queued = worklist.len();
            worklist.extend(
                self.topology
                    .neighbors(idx)
                    .iter()
                    .copied()
                    .filter(|&n| Some(n) != from)
                    .map(|n| (n, Some(idx))),
            );
            self.stats.record_delivery(worklist.len() - queued);
        }

        delivered
    }

    /// Whether `peer` has processed message `id`
    pub fn has_seen(&self, peer: PeerId, id: MessageId) -> ConcordResult<bool> {
        let idx = self.topology.resolve(peer)?;
        Ok(self.seen[idx.as_usize()].contains(id))
    }

    /// Number of distinct messages `peer` has processed
    pub fn seen_count(&self, peer: PeerId) -> ConcordResult<usize> {
        let idx = self.topology.resolve(peer)?;
        Ok(self.seen[idx.as_usize()].len())
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn stats(&self) -> &PropagationStats {
        &self.stats
    }
}
