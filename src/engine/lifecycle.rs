use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ROUND LIFECYCLE PHASE
// ============================================================================

/// Round lifecycle phase
///
/// Flow: Open → AwaitingDraw → AwaitingRandomness → Resolved
///
/// The first transition is derived purely from the clock: a round is Open
/// strictly before its bet deadline and AwaitingDraw from the deadline on,
/// without any explicit call. The later transitions are driven by the draw
/// request and the oracle callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Betting window is live
    /// - placeBet is legal
    /// - No draw may be requested yet
    Open,

    /// Deadline passed, nobody has asked for a draw yet
    /// - Betting is frozen
    /// - requestDraw is legal (exactly once)
    AwaitingDraw,

    /// Draw requested, waiting on the external randomness oracle
    /// - Nothing is legal except the oracle fulfillment
    /// - There is no timeout or retry; the round stays here until the
    ///   oracle answers
    AwaitingRandomness,

    /// Winning number known, terminal
    /// - Winners claim, creator withdraws the residual
    Resolved,
}

impl RoundPhase {
    /// Check if new bets are admissible in this phase
    pub fn is_betting_open(&self) -> bool {
        matches!(self, RoundPhase::Open)
    }

    /// Check if a draw may be requested in this phase
    pub fn can_request_draw(&self) -> bool {
        matches!(self, RoundPhase::AwaitingDraw)
    }

    /// Check if claims and collateral withdrawal are legal
    pub fn is_settled(&self) -> bool {
        matches!(self, RoundPhase::Resolved)
    }

    /// Check if the round has reached its terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, RoundPhase::Resolved)
    }
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase_str = match self {
            RoundPhase::Open => "open",
            RoundPhase::AwaitingDraw => "awaiting_draw",
            RoundPhase::AwaitingRandomness => "awaiting_randomness",
            RoundPhase::Resolved => "resolved",
        };
        write!(f, "{}", phase_str)
    }
}

/// Compute the phase from raw round state
///
/// Keeping this a free function keeps the derivation in one place: the
/// round stores only `bet_deadline`, `draw_requested_at` and `is_resolved`,
/// never the phase itself.
pub fn derive_phase(
    now: u64,
    bet_deadline: u64,
    draw_requested_at: Option<u64>,
    is_resolved: bool,
) -> RoundPhase {
    if is_resolved {
        RoundPhase::Resolved
    } else if draw_requested_at.is_some() {
        RoundPhase::AwaitingRandomness
    } else if now >= bet_deadline {
        RoundPhase::AwaitingDraw
    } else {
        RoundPhase::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_derivation() {
        assert_eq!(derive_phase(99, 100, None, false), RoundPhase::Open);
        assert_eq!(derive_phase(100, 100, None, false), RoundPhase::AwaitingDraw);
        assert_eq!(derive_phase(500, 100, Some(200), false), RoundPhase::AwaitingRandomness);
        assert_eq!(derive_phase(500, 100, Some(200), true), RoundPhase::Resolved);
    }

    #[test]
    fn test_resolved_wins_over_clock() {
        // A resolved flag dominates everything else
        assert_eq!(derive_phase(0, 100, None, true), RoundPhase::Resolved);
    }

    #[test]
    fn test_legality_helpers() {
        assert!(RoundPhase::Open.is_betting_open());
        assert!(!RoundPhase::AwaitingDraw.is_betting_open());
        assert!(RoundPhase::AwaitingDraw.can_request_draw());
        assert!(!RoundPhase::AwaitingRandomness.can_request_draw());
        assert!(RoundPhase::Resolved.is_settled());
        assert!(!RoundPhase::AwaitingRandomness.is_settled());
    }
}
