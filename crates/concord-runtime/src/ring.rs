//! Concurrent token circulation
//!
//! One task per ring position; each task only knows its successor's inbox.
//! Tokens from different origins share the inboxes but never each other's
//! state, so concurrently initiated tokens circulate independently.

use std::sync::Arc;

use concord_core::{ConcordError, ConcordResult, PeerId};
use concord_ring::{AbsorptionSink, Decision, DecisionRule, Ring, Token};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::{Pending, RuntimeConfig, RuntimeStats, StatsSnapshot};

type Inbox<V> = mpsc::UnboundedSender<Token<V>>;

/// A running ring
pub struct RingNetwork<V> {
    ring: Ring,
    inboxes: Vec<Inbox<V>>,
    pending: Arc<Pending>,
    stats: Arc<RuntimeStats>,
    config: RuntimeConfig,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<V> RingNetwork<V>
where
    V: Send + 'static,
{
    /// Spawn one task per ring position, all applying `rule`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<R, S>(ring: Ring, rule: R, sink: S, config: RuntimeConfig) -> Self
    where
        R: DecisionRule<V> + Send + Sync + 'static,
        S: AbsorptionSink<V> + Send + Sync + 'static,
    {
        let rule = Arc::new(rule);
        let sink = Arc::new(sink);
        let pending = Arc::new(Pending::new());
        let stats = Arc::new(RuntimeStats::new());
        let (shutdown, shutdown_rx) = watch::channel(false);

        let (inboxes, receivers): (Vec<Inbox<V>>, Vec<_>) =
            (0..ring.len()).map(|_| mpsc::unbounded_channel()).unzip();

        let mut tasks = Vec::with_capacity(ring.len());
        for (pos, inbox) in receivers.into_iter().enumerate() {
            let id = ring.peers()[pos];
            // Position and registry index coincide for a ring
            let succ = (pos + 1) % ring.len();

            let peer = RingPeer {
                id,
                ring_len: ring.len(),
                successor: inboxes[succ].clone(),
                rule: Arc::clone(&rule),
                sink: Arc::clone(&sink),
                pending: Arc::clone(&pending),
                stats: Arc::clone(&stats),
                log_hand_offs: config.log_hand_offs,
            };
            tasks.push(tokio::spawn(peer.run(inbox, shutdown_rx.clone())));
        }

        info!(peers = ring.len(), "ring started");

        Self {
            ring,
            inboxes,
            pending,
            stats,
            config,
            shutdown,
            tasks: Mutex::new(tasks),
        }
    }

    /// Introduce a token carrying `value` at `peer`; its first hop is the
    /// successor of `peer`.
    pub fn initiate(&self, peer: PeerId, value: V) -> ConcordResult<()> {
        let succ = self.ring.successor_of(peer)?;
        let slot = self.ring.resolve(succ)?;

        self.pending.begin();
        if self.inboxes[slot.as_usize()].send(Token::new(peer, value)).is_err() {
            self.pending.end();
            return Err(ConcordError::ChannelClosed(succ));
        }

        debug!(origin = %peer, "token initiated");
        Ok(())
    }

    /// Wait until every token has stopped
    pub async fn wait_idle(&self) -> ConcordResult<()> {
        self.pending.wait_idle(self.config.idle_timeout).await
    }

    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Let every accepted token stop, then stop every peer task and wait
    /// for them to exit.
    ///
    /// If the ring does not drain within the idle timeout the tasks are
    /// stopped regardless and tokens still queued are dropped.
    pub async fn shutdown(&self) {
        if let Err(e) = self.pending.wait_idle(self.config.idle_timeout).await {
            warn!(in_flight = self.pending.in_flight(), "ring did not drain before shutdown: {}", e);
        }

        let _ = self.shutdown.send(true);

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!("ring peer task failed: {}", e);
            }
        }
    }
}

/// State owned by one ring position
struct RingPeer<V, R, S> {
    id: PeerId,
    ring_len: usize,
    successor: Inbox<V>,
    rule: Arc<R>,
    sink: Arc<S>,
    pending: Arc<Pending>,
    stats: Arc<RuntimeStats>,
    log_hand_offs: bool,
}

impl<V, R, S> RingPeer<V, R, S>
where
    V: Send + 'static,
    R: DecisionRule<V>,
    S: AbsorptionSink<V>,
{
    async fn run(self, mut inbox: mpsc::UnboundedReceiver<Token<V>>, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                token = inbox.recv() => match token {
                    Some(token) => self.relay(token),
                    None => break,
                },
            }
        }
        trace!(peer = %self.id, "ring peer stopped");
    }

    fn relay(&self, mut token: Token<V>) {
        // Released on every exit, a panicking rule or sink included
        let _slot = self.pending.release_on_drop();

        token.hops += 1;
        self.stats.record_hop();

        match self.rule.decide(self.id, &token) {
            Decision::Absorb => {
                self.stats.record_absorption();
                info!(peer = %self.id, origin = %token.origin, hops = token.hops, "token absorbed");
                self.sink.absorbed(self.id, &token.value);
                return;
            }
            Decision::Forward => {}
            Decision::Replace(value) => {
                self.stats.record_replacement();
                token.value = value;
            }
        }

        if token.hops >= self.ring_len {
            self.stats.record_exhausted();
            warn!(origin = %token.origin, hops = token.hops, "token completed a lap without absorption");
            return;
        }

        if self.log_hand_offs {
            debug!(peer = %self.id, origin = %token.origin, hops = token.hops, "token relayed");
        }

        self.pending.begin();
        if let Err(e) = self.successor.send(token) {
            self.pending.end();
            warn!(peer = %self.id, origin = %e.0.origin, "successor stopped, token dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_ring::{AbsorbAtOrigin, HighestCandidate, IgnoreAbsorptions};

    fn p(id: u64) -> PeerId {
        PeerId::new(id)
    }

    fn ring(k: u64) -> Ring {
        Ring::new((0..k).map(p).collect()).unwrap()
    }

    type Log = Arc<Mutex<Vec<(PeerId, u64)>>>;

    fn recorder(log: &Log) -> impl Fn(PeerId, &u64) + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |peer: PeerId, value: &u64| log.lock().push((peer, *value))
    }

    #[tokio::test]
    async fn test_single_token_visits_whole_ring() {
        let log = Log::default();
        let net = RingNetwork::spawn(ring(5), AbsorbAtOrigin, recorder(&log), RuntimeConfig::testing());

        net.initiate(p(2), 2).unwrap();
        net.wait_idle().await.unwrap();

        assert_eq!(log.lock().as_slice(), &[(p(2), 2)]);
        assert_eq!(net.stats().hops, 5);
        net.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_peer_declares_itself() {
        let log = Log::default();
        let net = RingNetwork::spawn(ring(5), AbsorbAtOrigin, recorder(&log), RuntimeConfig::testing());

        for i in 0..5 {
            net.initiate(p(i), i).unwrap();
        }
        net.wait_idle().await.unwrap();

        let mut absorbed = log.lock().clone();
        absorbed.sort();
        assert_eq!(absorbed, (0..5).map(|i| (p(i), i)).collect::<Vec<_>>());
        assert_eq!(net.stats().hops, 25);
        net.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_highest_candidate_agrees() {
        let log = Log::default();
        let rule = HighestCandidate::new(|peer: PeerId| peer.0);
        let net = RingNetwork::spawn(ring(6), rule, recorder(&log), RuntimeConfig::testing());

        for i in 0..6 {
            net.initiate(p(i), i).unwrap();
        }
        net.wait_idle().await.unwrap();

        let absorbed = log.lock().clone();
        assert_eq!(absorbed.len(), 6);
        assert!(absorbed.iter().all(|&(_, v)| v == 5));
        net.shutdown().await;
    }

    #[tokio::test]
    async fn test_exhausted_token_dropped() {
        let rule = |_: PeerId, _: &Token<u64>| -> Decision<u64> { Decision::Forward };
        let net = RingNetwork::spawn(ring(4), rule, IgnoreAbsorptions, RuntimeConfig::testing());

        net.initiate(p(0), 0).unwrap();
        net.wait_idle().await.unwrap();

        let stats = net.stats();
        assert_eq!(stats.hops, 4);
        assert_eq!(stats.exhausted, 1);
        assert_eq!(stats.absorptions, 0);
        net.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shutdown_completes_accepted_tokens() {
        let log = Log::default();
        let net = RingNetwork::spawn(ring(50), AbsorbAtOrigin, recorder(&log), RuntimeConfig::testing());

        for i in 0..50 {
            net.initiate(p(i), i).unwrap();
        }
        net.shutdown().await;

        assert_eq!(log.lock().len(), 50);
        assert_eq!(net.stats().hops, 2500);
        net.wait_idle().await.unwrap();
    }

    #[tokio::test]
    async fn test_panicking_rule_does_not_stall() {
        let rule = |peer: PeerId, token: &Token<u64>| -> Decision<u64> {
            if peer == p(1) {
                panic!("rule failed at {}", peer);
            }
            AbsorbAtOrigin.decide(peer, token)
        };
        let log = Log::default();
        let net = RingNetwork::spawn(ring(3), rule, recorder(&log), RuntimeConfig::testing());

        net.initiate(p(0), 0).unwrap();
        net.wait_idle().await.unwrap();

        assert!(log.lock().is_empty());
        assert_eq!(net.stats().hops, 1);
        net.shutdown().await;
    }

    #[tokio::test]
    async fn test_initiate_unknown_peer() {
        let net = RingNetwork::spawn(ring(3), AbsorbAtOrigin, IgnoreAbsorptions, RuntimeConfig::testing());

        assert_eq!(
            net.initiate(p(7), 0u64),
            Err(ConcordError::InvalidPeerReference(p(7)))
        );
        net.shutdown().await;
    }
}
