//! Coordinator - drives tokens around a ring one hop at a time
//!
//! Relaying is a loop over hops rather than a chain of calls. A token that
//! finishes a full lap without being absorbed is stopped and reported.

use std::marker::PhantomData;

use concord_core::{ConcordError, ConcordResult, PeerId, PeerIndex};
use tracing::{debug, info, warn};

use crate::{AbsorptionSink, Decision, DecisionRule, Ring, Token};

/// Record of one completed circulation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Circulation<V> {
    /// Peer that initiated the token
    pub origin: PeerId,
    /// Peers visited, in order, ending with the absorbing peer
    pub visited: Vec<PeerId>,
    /// Peer that absorbed the token
    pub absorbed_by: PeerId,
    /// Value carried at absorption
    pub value: V,
}

impl<V> Circulation<V> {
    pub fn hops(&self) -> usize {
        self.visited.len()
    }
}

/// Ring statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RingStats {
    pub tokens_initiated: u64,
    pub hops: u64,
    pub replacements: u64,
    pub absorptions: u64,
    pub exhausted: u64,
}

/// Token in flight
struct InFlight<V> {
    token: Token<V>,
    at: PeerIndex,
    visited: Vec<PeerId>,
}

/// Result of relaying a token at one peer
enum Hop {
    Absorbed,
    Next,
}

/// Synchronous ring coordinator
pub struct RingCoordinator<V, R, S> {
    ring: Ring,
    rule: R,
    sink: S,
    stats: RingStats,
    _value: PhantomData<fn(V)>,
}

impl<V, R, S> RingCoordinator<V, R, S>
where
    R: DecisionRule<V>,
    S: AbsorptionSink<V>,
{
    pub fn new(ring: Ring, rule: R, sink: S) -> Self {
        Self {
            ring,
            rule,
            sink,
            stats: RingStats::default(),
            _value: PhantomData,
        }
    }

    /// Start a token carrying `value` at `peer` and run it to absorption.
    ///
    /// The first hop is the successor of `peer`.
    pub fn initiate(&mut self, peer: PeerId, value: V) -> ConcordResult<Circulation<V>> {
        let mut flight = self.launch(peer, value)?;
        loop {
            if let Hop::Absorbed = relay(&self.ring, &self.rule, &self.sink, &mut self.stats, &mut flight)? {
                return Ok(Self::finish(flight));
            }
        }
    }

    /// Like [`initiate`](Self::initiate), but this token is judged by `rule`
    /// instead of the coordinator's own rule.
    pub fn initiate_with<Q>(&mut self, peer: PeerId, value: V, rule: &Q) -> ConcordResult<Circulation<V>>
    where
        Q: DecisionRule<V> + ?Sized,
    {
        let mut flight = self.launch(peer, value)?;
        loop {
            if let Hop::Absorbed = relay(&self.ring, rule, &self.sink, &mut self.stats, &mut flight)? {
                return Ok(Self::finish(flight));
            }
        }
    }

    /// Start one token per `(peer, value)` and advance them together, one
    /// hop each per round, until every token has stopped.
    ///
    /// Every peer is resolved before any token moves, so an unknown peer
    /// fails the whole call. Results are returned in initiation order; a
    /// token that exhausts its lap yields an error in its own slot only.
    pub fn initiate_all<I>(&mut self, starts: I) -> ConcordResult<Vec<ConcordResult<Circulation<V>>>>
    where
        I: IntoIterator<Item = (PeerId, V)>,
    {
        let starts: Vec<(PeerId, V)> = starts.into_iter().collect();
        for (peer, _) in &starts {
            self.ring.resolve(*peer)?;
        }

        let mut flights = Vec::with_capacity(starts.len());
        for (peer, value) in starts {
            flights.push(Some(self.launch(peer, value)?));
        }

        let mut results: Vec<Option<ConcordResult<Circulation<V>>>> =
            (0..flights.len()).map(|_| None).collect();
        let mut active = flights.len();

        while active > 0 {
            for (slot, result) in flights.iter_mut().zip(results.iter_mut()) {
                let Some(flight) = slot.as_mut() else {
                    continue;
                };

                let outcome = match relay(&self.ring, &self.rule, &self.sink, &mut self.stats, flight) {
                    Ok(Hop::Next) => continue,
                    Ok(Hop::Absorbed) => slot.take().map(|f| Ok(Self::finish(f))),
                    Err(e) => {
                        slot.take();
                        Some(Err(e))
                    }
                };
                *result = outcome;
                active -= 1;
            }
        }

        Ok(results.into_iter().flatten().collect())
    }

    fn launch(&mut self, peer: PeerId, value: V) -> ConcordResult<InFlight<V>> {
        let origin = self.ring.resolve(peer)?;
        self.stats.tokens_initiated += 1;
        debug!(origin = %peer, "token initiated");

        Ok(InFlight {
            token: Token::new(peer, value),
            at: self.ring.successor(origin),
            visited: Vec::with_capacity(self.ring.len()),
        })
    }

    fn finish(flight: InFlight<V>) -> Circulation<V> {
        let absorbed_by = flight.visited.last().copied().unwrap_or(flight.token.origin);
        Circulation {
            origin: flight.token.origin,
            visited: flight.visited,
            absorbed_by,
            value: flight.token.value,
        }
    }

    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn stats(&self) -> &RingStats {
        &self.stats
    }
}

/// Apply `rule` at the token's current peer and advance it one hop
fn relay<V, Q, S>(
    ring: &Ring,
    rule: &Q,
    sink: &S,
    stats: &mut RingStats,
    flight: &mut InFlight<V>,
) -> ConcordResult<Hop>
where
    Q: DecisionRule<V> + ?Sized,
    S: AbsorptionSink<V>,
{
    let peer = ring.id(flight.at);
    flight.token.hops += 1;
    flight.visited.push(peer);
    stats.hops += 1;

    match rule.decide(peer, &flight.token) {
        Decision::Absorb => {
            stats.absorptions += 1;
            info!(peer = %peer, origin = %flight.token.origin, hops = flight.token.hops, "token absorbed");
            sink.absorbed(peer, &flight.token.value);
            return Ok(Hop::Absorbed);
        }
        Decision::Forward => {}
        Decision::Replace(value) => {
            stats.replacements += 1;
            flight.token.value = value;
        }
    }

    if flight.token.hops >= ring.len() {
        stats.exhausted += 1;
        warn!(origin = %flight.token.origin, hops = flight.token.hops, "token completed a lap without absorption");
        return Err(ConcordError::CirculationExhausted {
            origin: flight.token.origin,
            hops: flight.token.hops,
        });
    }

    flight.at = ring.successor(flight.at);
    Ok(Hop::Next)
}
