//! Concurrent flood dissemination
//!
//! One task per peer. A task owns its peer's seen-set outright and is the
//! only reader or writer of it.

use std::sync::Arc;

use concord_core::{ConcordError, ConcordResult, MessageId, MessageIdAllocator, PeerId, PeerIndex, PeerRegistry};
use concord_diffusion::{DeliverySink, SeenSet, Topology};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::{Pending, RuntimeConfig, RuntimeStats, StatsSnapshot};

/// Hand-off between neighboring peers
#[derive(Debug)]
struct Envelope<P> {
    id: MessageId,
    payload: Arc<P>,
    sender: Option<PeerIndex>,
}

type Inbox<P> = mpsc::UnboundedSender<Envelope<P>>;
type SharedSink<P> = Arc<dyn DeliverySink<P> + Send + Sync>;

/// A running flood network
pub struct FloodNetwork<P> {
    peers: PeerRegistry,
    inboxes: Vec<Inbox<P>>,
    ids: Arc<MessageIdAllocator>,
    pending: Arc<Pending>,
    stats: Arc<RuntimeStats>,
    config: RuntimeConfig,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<P> FloodNetwork<P>
where
    P: Send + Sync + 'static,
{
    /// Spawn one task per peer of `topology`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S>(topology: &Topology, sink: S, config: RuntimeConfig) -> Self
    where
        S: DeliverySink<P> + Send + Sync + 'static,
    {
        Self::spawn_with_allocator(topology, sink, config, Arc::new(MessageIdAllocator::new()))
    }

    /// Spawn drawing message ids from a shared allocator
    pub fn spawn_with_allocator<S>(
        topology: &Topology,
        sink: S,
        config: RuntimeConfig,
        ids: Arc<MessageIdAllocator>,
    ) -> Self
    where
        S: DeliverySink<P> + Send + Sync + 'static,
    {
        let sink: SharedSink<P> = Arc::new(sink);
        let pending = Arc::new(Pending::new());
        let stats = Arc::new(RuntimeStats::new());
        let (shutdown, shutdown_rx) = watch::channel(false);

        let (inboxes, receivers): (Vec<_>, Vec<_>) = (0..topology.peer_count())
            .map(|_| mpsc::unbounded_channel())
            .unzip();

        let mut tasks = Vec::with_capacity(receivers.len());
        for ((index, id), inbox) in topology.registry().iter().zip(receivers) {
            let neighbors = topology
                .neighbors(index)
                .iter()
                .map(|&n| (n, inboxes[n.as_usize()].clone()))
                .collect();

            let peer = FloodPeer {
                index,
                id,
                neighbors,
                seen: SeenSet::new(),
                sink: Arc::clone(&sink),
                pending: Arc::clone(&pending),
                stats: Arc::clone(&stats),
                log_hand_offs: config.log_hand_offs,
            };
            tasks.push(tokio::spawn(peer.run(inbox, shutdown_rx.clone())));
        }

        info!(peers = topology.peer_count(), edges = topology.edge_count(), "flood network started");

        Self {
            peers: topology.registry().clone(),
            inboxes,
            ids,
            pending,
            stats,
            config,
            shutdown,
            tasks: Mutex::new(tasks),
        }
    }

    /// Originate `payload` at `peer`.
    ///
    /// Returns as soon as the originator has been handed the message; use
    /// [`wait_idle`](Self::wait_idle) to wait for the flood to finish.
    pub fn originate(&self, peer: PeerId, payload: P) -> ConcordResult<MessageId> {
        let idx = self.peers.resolve(peer)?;
        let id = self.ids.next();

        self.pending.begin();
        let envelope = Envelope {
            id,
            payload: Arc::new(payload),
            sender: None,
        };
        if self.inboxes[idx.as_usize()].send(envelope).is_err() {
            self.pending.end();
            return Err(ConcordError::ChannelClosed(peer));
        }

        debug!(message = %id, origin = %peer, "message originated");
        Ok(id)
    }

    /// Wait until every hand-off has been processed
    pub async fn wait_idle(&self) -> ConcordResult<()> {
        self.pending.wait_idle(self.config.idle_timeout).await
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Let every accepted message finish flooding, then stop every peer
    /// task and wait for them to exit.
    ///
    /// If the network does not drain within the idle timeout the tasks are
    /// stopped regardless and whatever is still queued is dropped.
    pub async fn shutdown(&self) {
        if let Err(e) = self.pending.wait_idle(self.config.idle_timeout).await {
            warn!(in_flight = self.pending.in_flight(), "flood did not drain before shutdown: {}", e);
        }

        // Err only means every task already exited
        let _ = self.shutdown.send(true);

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!("flood peer task failed: {}", e);
            }
        }
    }
}

/// State owned by one peer task
struct FloodPeer<P> {
    index: PeerIndex,
    id: PeerId,
    neighbors: Vec<(PeerIndex, Inbox<P>)>,
    seen: SeenSet,
    sink: SharedSink<P>,
    pending: Arc<Pending>,
    stats: Arc<RuntimeStats>,
    log_hand_offs: bool,
}

impl<P> FloodPeer<P>
where
    P: Send + Sync + 'static,
{
    async fn run(
        mut self,
        mut inbox: mpsc::UnboundedReceiver<Envelope<P>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                envelope = inbox.recv() => match envelope {
                    Some(envelope) => self.receive(envelope),
                    None => break,
                },
            }
        }
        trace!(peer = %self.id, seen = self.seen.len(), "flood peer stopped");
    }

    fn receive(&mut self, envelope: Envelope<P>) {
        // Released on every exit, a panicking sink included
        let _slot = self.pending.release_on_drop();

        if !self.seen.insert(envelope.id) {
            self.stats.record_duplicate();
            trace!(peer = %self.id, message = %envelope.id, "duplicate absorbed");
            return;
        }

        self.stats.record_delivery();
        debug!(peer = %self.id, message = %envelope.id, "delivered");
        self.sink.deliver(self.id, envelope.payload.as_ref());

        for (neighbor, inbox) in &self.neighbors {
            if Some(*neighbor) == envelope.sender {
                continue;
            }

            self.pending.begin();
            let hand_off = Envelope {
                id: envelope.id,
                payload: Arc::clone(&envelope.payload),
                sender: Some(self.index),
            };
            if inbox.send(hand_off).is_err() {
                self.pending.end();
                warn!(from = %self.id, to = ?neighbor, message = %envelope.id, "neighbor stopped, hand-off dropped");
                continue;
            }

            self.stats.record_hand_off();
            if self.log_hand_offs {
                debug!(from = %self.id, to = ?neighbor, message = %envelope.id, "hand-off");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn peers(n: u64) -> Vec<PeerId> {
        (1..=n).map(PeerId::new).collect()
    }

    type Log = Arc<Mutex<Vec<(PeerId, String)>>>;

    fn recorder(log: &Log) -> impl Fn(PeerId, &String) + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |peer: PeerId, payload: &String| log.lock().push((peer, payload.clone()))
    }

    #[tokio::test]
    async fn test_path_of_four() {
        let ids = peers(4);
        let log = Log::default();
        let net = FloodNetwork::spawn(&Topology::path(&ids).unwrap(), recorder(&log), RuntimeConfig::testing());

        net.originate(ids[0], "Hello, P2P Network!".to_string()).unwrap();
        net.wait_idle().await.unwrap();

        let mut delivered: Vec<PeerId> = log.lock().iter().map(|(p, _)| *p).collect();
        delivered.sort();
        assert_eq!(delivered, ids);
        net.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_mesh_many_messages_once_each() {
        let ids = peers(8);
        let log = Log::default();
        let net = FloodNetwork::spawn(&Topology::mesh(&ids).unwrap(), recorder(&log), RuntimeConfig::testing());

        for (i, &origin) in ids.iter().enumerate() {
            net.originate(origin, format!("m{}", i)).unwrap();
        }
        net.wait_idle().await.unwrap();

        let mut counts: HashMap<(PeerId, String), usize> = HashMap::new();
        for entry in log.lock().iter().cloned() {
            *counts.entry(entry).or_default() += 1;
        }
        assert_eq!(counts.len(), 64);
        assert!(counts.values().all(|&c| c == 1));

        let stats = net.stats();
        assert_eq!(stats.deliveries, 64);
        assert!(stats.duplicates_absorbed > 0);
        net.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shutdown_completes_accepted_floods() {
        let ids = peers(500);
        let log = Log::default();
        let net = FloodNetwork::spawn(&Topology::path(&ids).unwrap(), recorder(&log), RuntimeConfig::testing());

        net.originate(ids[0], "x".to_string()).unwrap();
        net.shutdown().await;

        assert_eq!(log.lock().len(), 500);
        assert_eq!(net.stats().deliveries, 500);
        net.wait_idle().await.unwrap();
    }

    #[tokio::test]
    async fn test_panicking_sink_does_not_stall() {
        let ids = peers(3);
        let log = Log::default();
        let record = recorder(&log);
        let failing = ids[1];
        let sink = move |peer: PeerId, payload: &String| {
            if peer == failing {
                panic!("sink failed at {}", peer);
            }
            record(peer, payload)
        };
        let net = FloodNetwork::spawn(&Topology::path(&ids).unwrap(), sink, RuntimeConfig::testing());

        net.originate(ids[0], "x".to_string()).unwrap();
        net.wait_idle().await.unwrap();

        assert_eq!(log.lock().as_slice(), &[(ids[0], "x".to_string())]);
        net.shutdown().await;
    }

    #[tokio::test]
    async fn test_originate_unknown_peer() {
        let net = FloodNetwork::<String>::spawn(
            &Topology::path(&peers(2)).unwrap(),
            concord_diffusion::Discard,
            RuntimeConfig::testing(),
        );

        assert_eq!(
            net.originate(PeerId::new(42), "x".to_string()),
            Err(ConcordError::InvalidPeerReference(PeerId::new(42)))
        );
        net.shutdown().await;
    }

    #[tokio::test]
    async fn test_originate_after_shutdown() {
        let ids = peers(2);
        let net = FloodNetwork::<String>::spawn(
            &Topology::path(&ids).unwrap(),
            concord_diffusion::Discard,
            RuntimeConfig::testing(),
        );
        net.shutdown().await;

        assert_eq!(
            net.originate(ids[0], "x".to_string()),
            Err(ConcordError::ChannelClosed(ids[0]))
        );
    }
}
