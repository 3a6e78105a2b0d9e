//! Tokens and per-hop decision rules

use concord_core::PeerId;

/// Token circulating around the ring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<V> {
    /// Candidate value carried
    pub value: V,
    /// Peer that introduced the token
    pub origin: PeerId,
    /// Peers visited so far
    pub hops: usize,
}

impl<V> Token<V> {
    pub fn new(origin: PeerId, value: V) -> Self {
        Self {
            value,
            origin,
            hops: 0,
        }
    }
}

/// Outcome of applying a decision rule at one hop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision<V> {
    /// Stop circulation here; the peer declares the carried value
    Absorb,
    /// Relay the token unchanged to the successor
    Forward,
    /// Relay the token to the successor carrying this value instead
    Replace(V),
}

/// Per-hop rule applied uniformly at every peer.
///
/// Implemented for any `Fn(PeerId, &Token<V>) -> Decision<V>`.
pub trait DecisionRule<V> {
    fn decide(&self, peer: PeerId, token: &Token<V>) -> Decision<V>;
}

impl<V, F> DecisionRule<V> for F
where
    F: Fn(PeerId, &Token<V>) -> Decision<V>,
{
    fn decide(&self, peer: PeerId, token: &Token<V>) -> Decision<V> {
        self(peer, token)
    }
}

/// Absorb a token when it comes back to the peer that introduced it.
///
/// When every peer initiates, every peer absorbs its own token and declares
/// itself; nothing converges. Use [`HighestCandidate`] for a single result.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsorbAtOrigin;

impl<V> DecisionRule<V> for AbsorbAtOrigin {
    fn decide(&self, peer: PeerId, token: &Token<V>) -> Decision<V> {
        if token.origin == peer {
            Decision::Absorb
        } else {
            Decision::Forward
        }
    }
}

/// Carry the strongest candidate seen so far.
///
/// A peer whose own candidate beats the carried value swaps it in; the
/// origin absorbs after one lap. Every completed lap therefore ends with
/// the highest candidate in the ring, whichever peer initiated it.
#[derive(Debug, Clone, Copy)]
pub struct HighestCandidate<F> {
    candidate: F,
}

impl<F> HighestCandidate<F> {
    /// `candidate` yields the local candidate value of a peer
    pub fn new(candidate: F) -> Self {
        Self { candidate }
    }
}

impl<V, F> DecisionRule<V> for HighestCandidate<F>
where
    V: PartialOrd,
    F: Fn(PeerId) -> V,
{
    fn decide(&self, peer: PeerId, token: &Token<V>) -> Decision<V> {
        if token.origin == peer {
            return Decision::Absorb;
        }

        let own = (self.candidate)(peer);
        if own > token.value {
            Decision::Replace(own)
        } else {
            Decision::Forward
        }
    }
}

/// Receives one notification per absorbed token.
///
/// Implemented for any `Fn(PeerId, &V)`.
pub trait AbsorptionSink<V> {
    fn absorbed(&self, peer: PeerId, value: &V);
}

impl<V, F> AbsorptionSink<V> for F
where
    F: Fn(PeerId, &V),
{
    fn absorbed(&self, peer: PeerId, value: &V) {
        self(peer, value)
    }
}

/// Sink that ignores absorptions
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreAbsorptions;

impl<V> AbsorptionSink<V> for IgnoreAbsorptions {
    fn absorbed(&self, _peer: PeerId, _value: &V) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_at_origin() {
        let token = Token::new(PeerId::new(2), 2u64);

        assert_eq!(AbsorbAtOrigin.decide(PeerId::new(2), &token), Decision::Absorb);
        assert_eq!(AbsorbAtOrigin.decide(PeerId::new(3), &token), Decision::Forward);
    }

    #[test]
    fn test_highest_candidate() {
        let rule = HighestCandidate::new(|peer: PeerId| peer.0 * 10);
        let token = Token::new(PeerId::new(1), 30u64);

        assert_eq!(rule.decide(PeerId::new(5), &token), Decision::Replace(50));
        assert_eq!(rule.decide(PeerId::new(2), &token), Decision::Forward);
        assert_eq!(rule.decide(PeerId::new(3), &token), Decision::Forward);
        assert_eq!(rule.decide(PeerId::new(1), &token), Decision::Absorb);
    }

    #[test]
    fn test_closure_rule() {
        let rule = |_peer: PeerId, token: &Token<u64>| {
            if token.value > 100 {
                Decision::Absorb
            } else {
                Decision::Replace(token.value * 2)
            }
        };

        let token = Token::new(PeerId::new(0), 64u64);
        assert_eq!(rule.decide(PeerId::new(1), &token), Decision::Replace(128));
    }
}
