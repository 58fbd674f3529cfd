use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::lifecycle::{derive_phase, RoundPhase};
use super::odds::{self, Wei};

// ============================================================================
// ERRORS
// ============================================================================

/// Typed failure kinds for every round operation
///
/// Each operation validates all of its preconditions before touching any
/// field, so a returned error guarantees no partial mutation survived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LotteryError {
    /// Bet attempted after the deadline
    RoundEnded,
    /// Admission would breach the solvency invariant
    ExceedsLimit,
    /// Claim or withdrawal attempted before resolution
    RoundNotEnded,
    /// No eligible unclaimed winning bet for the caller
    NothingToClaim,
    /// Residual collateral already withdrawn (or nothing ever withdrawable)
    NothingToWithdraw,
    /// Number outside 0..=max_number
    InvalidNumber(u32),
    /// Zero-value bet
    InvalidAmount,
    /// Draw requested while betting is still open
    BettingStillOpen,
    /// Draw requested a second time
    DrawAlreadyRequested,
    /// Oracle fulfillment without a pending draw request
    DrawNotRequested,
    /// Operation on a round that already resolved
    AlreadyResolved,
    /// Unknown round id
    RoundNotFound(u64),
    /// Round creation rejected (bad digits, odds bounds or fees)
    InvalidParameters(String),
    /// Player's ledger balance cannot cover the gross bet
    InsufficientFunds { available: Wei, requested: Wei },
}

impl std::fmt::Display for LotteryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LotteryError::RoundEnded => write!(f, "Betting period has ended"),
            LotteryError::ExceedsLimit => write!(f, "Bet would exceed the liability limit"),
            LotteryError::RoundNotEnded => write!(f, "Round is not resolved yet"),
            LotteryError::NothingToClaim => write!(f, "No unclaimed winning bets"),
            LotteryError::NothingToWithdraw => write!(f, "No residual collateral to withdraw"),
            LotteryError::InvalidNumber(n) => write!(f, "Number {} is out of range", n),
            LotteryError::InvalidAmount => write!(f, "Bet amount must be positive"),
            LotteryError::BettingStillOpen => write!(f, "Betting period is still open"),
            LotteryError::DrawAlreadyRequested => write!(f, "Draw already requested"),
            LotteryError::DrawNotRequested => write!(f, "No draw has been requested"),
            LotteryError::AlreadyResolved => write!(f, "Round already resolved"),
            LotteryError::RoundNotFound(id) => write!(f, "Round {} not found", id),
            LotteryError::InvalidParameters(msg) => write!(f, "Invalid round parameters: {}", msg),
            LotteryError::InsufficientFunds { available, requested } => {
                write!(f, "Insufficient funds: have {}, need {}", available, requested)
            }
        }
    }
}

impl std::error::Error for LotteryError {}

// ============================================================================
// BETS
// ============================================================================

/// A single bet, immutable once placed except for the claimed flag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    /// Unique bet ID
    pub id: String,

    /// Account that placed the bet
    pub player: String,

    /// Number the bet rides on
    pub number: u32,

    /// Gross amount paid in (fees included)
    pub amount: Wei,

    /// Odds captured at placement time, scaled x100; never re-priced
    pub locked_odds: u64,

    /// Payout owed if the number wins
    pub potential_payout: Wei,

    /// Set once the payout has been collected
    pub claimed: bool,

    /// Placement timestamp (unix seconds)
    pub placed_at: u64,
}

/// Receipt for an admitted bet, consumed by the registry to route fees
#[derive(Debug, Clone, Serialize)]
pub struct BetReceipt {
    pub bet_id: String,
    pub round_id: u64,
    pub number: u32,
    pub amount: Wei,
    pub creator_fee: Wei,
    pub protocol_fee: Wei,
    pub net_amount: Wei,
    pub locked_odds: u64,
    pub potential_payout: Wei,
}

/// Receipt for a successful claim
#[derive(Debug, Clone, Serialize)]
pub struct ClaimReceipt {
    pub round_id: u64,
    pub player: String,
    pub bets_claimed: usize,
    pub total_paid: Wei,
}

// ============================================================================
// ROUND
// ============================================================================

/// One complete lottery pool, from collateral deposit to resolution
///
/// The round owns its exposure ledger and bet book outright; nothing outside
/// mutates those maps. All cash movement is mirrored in `balance` so the
/// registry's ledger and the pool reconcile to the wei.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    /// Round identifier assigned by the registry
    pub round_id: u64,

    /// Digits in the bettable number space (2 digits -> 00..99)
    pub digits: u8,

    /// Largest bettable number, 10^digits - 1
    pub max_number: u32,

    /// No bets at or after this unix timestamp
    pub bet_deadline: u64,

    /// Collateral deposited at creation; immutable
    pub collateral: Wei,

    /// Maximum payout the pool may ever owe on any single number
    pub liability_limit: Wei,

    /// Odds quoted on an untouched number, scaled x100
    pub initial_odds: u64,

    /// Odds floor, scaled x100
    pub min_odds: u64,

    /// Creator fee in basis points, taken from every bet
    pub creator_fee_bps: u32,

    /// Protocol fee in basis points, taken from every bet
    pub protocol_fee_bps: u32,

    /// Fee recipient: the round creator
    pub creator: String,

    /// Fee recipient: the protocol treasury
    pub protocol_treasury: String,

    /// Liability owed per number if it wins
    pub exposure: HashMap<u32, Wei>,

    /// Net stakes accumulated per number
    pub total_stakes: HashMap<u32, Wei>,

    /// All bets in placement order
    pub bets: Vec<Bet>,

    pub is_resolved: bool,
    pub winning_number: Option<u32>,
    pub draw_requested_at: Option<u64>,

    /// Winning payouts not yet collected (meaningful once resolved)
    pub total_unclaimed_payouts: Wei,

    /// Cash currently held by the pool
    pub balance: Wei,

    /// Creation timestamp
    pub created_at: u64,
}

impl Round {
    /// Create a round with the collateral already locked in
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        round_id: u64,
        digits: u8,
        bet_deadline: u64,
        collateral: Wei,
        initial_odds: u64,
        min_odds: u64,
        creator_fee_bps: u32,
        protocol_fee_bps: u32,
        creator: String,
        protocol_treasury: String,
        now: u64,
    ) -> Self {
        let max_number = 10u32.pow(digits as u32) - 1;
        // The protocol's cut of future fees is carved out of the limit up
        // front so the pool can always cover it
        let liability_limit =
            collateral * (odds::BPS_SCALE - protocol_fee_bps as u128) / odds::BPS_SCALE;

        Self {
            round_id,
            digits,
            max_number,
            bet_deadline,
            collateral,
            liability_limit,
            initial_odds,
            min_odds,
            creator_fee_bps,
            protocol_fee_bps,
            creator,
            protocol_treasury,
            exposure: HashMap::new(),
            total_stakes: HashMap::new(),
            bets: Vec::new(),
            is_resolved: false,
            winning_number: None,
            draw_requested_at: None,
            total_unclaimed_payouts: 0,
            balance: collateral,
            created_at: now,
        }
    }

    /// Current lifecycle phase, derived from the clock and stored flags
    pub fn phase(&self, now: u64) -> RoundPhase {
        derive_phase(now, self.bet_deadline, self.draw_requested_at, self.is_resolved)
    }

    /// Liability currently riding on a number
    pub fn exposure_on(&self, number: u32) -> Wei {
        self.exposure.get(&number).copied().unwrap_or(0)
    }

    /// Net stakes accumulated on a number
    pub fn stakes_on(&self, number: u32) -> Wei {
        self.total_stakes.get(&number).copied().unwrap_or(0)
    }

    /// Read-only odds quote for a number at its current exposure
    pub fn get_odds(&self, number: u32) -> Result<u64, LotteryError> {
        if number > self.max_number {
            return Err(LotteryError::InvalidNumber(number));
        }
        Ok(odds::quote_odds(
            self.initial_odds,
            self.min_odds,
            self.liability_limit,
            self.exposure_on(number),
        ))
    }

    /// Largest gross bet the pool can still admit on a number
    pub fn max_bet(&self, number: u32) -> Result<Wei, LotteryError> {
        if number > self.max_number {
            return Err(LotteryError::InvalidNumber(number));
        }
        Ok(odds::max_bet(
            self.initial_odds,
            self.min_odds,
            self.liability_limit,
            self.exposure_on(number),
            self.creator_fee_bps,
            self.protocol_fee_bps,
        ))
    }

    /// Admit a bet
    ///
    /// Validates every precondition before mutating, then appends the bet,
    /// bumps exposure and stakes and banks the net amount. Fee routing is
    /// the caller's job, strictly after this returns.
    pub fn place_bet(
        &mut self,
        player: &str,
        number: u32,
        amount: Wei,
        now: u64,
    ) -> Result<BetReceipt, LotteryError> {
        if !self.phase(now).is_betting_open() {
            return Err(LotteryError::RoundEnded);
        }
        if number > self.max_number {
            return Err(LotteryError::InvalidNumber(number));
        }
        if amount == 0 {
            return Err(LotteryError::InvalidAmount);
        }

        let split = odds::split_fees(amount, self.creator_fee_bps, self.protocol_fee_bps);
        let current_exposure = self.exposure_on(number);
        let locked_odds = odds::quote_odds(
            self.initial_odds,
            self.min_odds,
            self.liability_limit,
            current_exposure,
        );
        let potential_payout = odds::payout(split.net_amount, locked_odds);

        // Solvency gate: the pool must be able to pay this number in full
        if current_exposure + potential_payout > self.liability_limit {
            return Err(LotteryError::ExceedsLimit);
        }

        let bet = Bet {
            id: format!("bet_{}_{}", self.round_id, Uuid::new_v4().simple()),
            player: player.to_string(),
            number,
            amount,
            locked_odds,
            potential_payout,
            claimed: false,
            placed_at: now,
        };
        let bet_id = bet.id.clone();
        self.bets.push(bet);
        *self.exposure.entry(number).or_insert(0) += potential_payout;
        *self.total_stakes.entry(number).or_insert(0) += split.net_amount;
        self.balance += split.net_amount;

        Ok(BetReceipt {
            bet_id,
            round_id: self.round_id,
            number,
            amount,
            creator_fee: split.creator_fee,
            protocol_fee: split.protocol_fee,
            net_amount: split.net_amount,
            locked_odds,
            potential_payout,
        })
    }

    /// Ask for a draw, exactly once, after the deadline
    pub fn request_draw(&mut self, now: u64) -> Result<(), LotteryError> {
        if self.is_resolved {
            return Err(LotteryError::AlreadyResolved);
        }
        if now < self.bet_deadline {
            return Err(LotteryError::BettingStillOpen);
        }
        if self.draw_requested_at.is_some() {
            return Err(LotteryError::DrawAlreadyRequested);
        }
        self.draw_requested_at = Some(now);
        Ok(())
    }

    /// Oracle callback: lock in the winning number and freeze the payouts
    /// owed to its backers
    pub fn fulfill_draw(&mut self, winning_number: u32) -> Result<(), LotteryError> {
        if self.is_resolved {
            return Err(LotteryError::AlreadyResolved);
        }
        if self.draw_requested_at.is_none() {
            return Err(LotteryError::DrawNotRequested);
        }
        if winning_number > self.max_number {
            return Err(LotteryError::InvalidNumber(winning_number));
        }
        self.is_resolved = true;
        self.winning_number = Some(winning_number);
        self.total_unclaimed_payouts = self.exposure_on(winning_number);
        Ok(())
    }

    /// Collect every unclaimed winning bet for a player
    ///
    /// Marks bets claimed and shrinks the unclaimed total before any cash
    /// leaves the pool, so a re-entered call finds nothing left to pay.
    pub fn claim_winnings(&mut self, player: &str) -> Result<ClaimReceipt, LotteryError> {
        let winning = match self.winning_number {
            Some(n) if self.is_resolved => n,
            _ => return Err(LotteryError::RoundNotEnded),
        };

        let mut total_paid: Wei = 0;
        let mut bets_claimed = 0usize;
        for bet in self
            .bets
            .iter_mut()
            .filter(|b| b.player == player && b.number == winning && !b.claimed)
        {
            bet.claimed = true;
            total_paid += bet.potential_payout;
            bets_claimed += 1;
        }

        if bets_claimed == 0 {
            return Err(LotteryError::NothingToClaim);
        }

        self.total_unclaimed_payouts -= total_paid;
        self.balance -= total_paid;

        Ok(ClaimReceipt {
            round_id: self.round_id,
            player: player.to_string(),
            bets_claimed,
            total_paid,
        })
    }

    /// Release the residual collateral to the creator
    ///
    /// Only the uncommitted residual is withdrawable; cash reserved for
    /// winners who have not claimed yet stays in the pool indefinitely. A
    /// zero residual is an error rather than a silent no-op, so a repeated
    /// withdrawal is visibly rejected.
    pub fn withdraw_collateral(&mut self) -> Result<Wei, LotteryError> {
        if !self.is_resolved {
            return Err(LotteryError::RoundNotEnded);
        }
        let residual = self.balance - self.total_unclaimed_payouts;
        if residual == 0 {
            return Err(LotteryError::NothingToWithdraw);
        }
        self.balance -= residual;
        Ok(residual)
    }

    /// All bets a player has in this round
    pub fn bets_for(&self, player: &str) -> Vec<Bet> {
        self.bets.iter().filter(|b| b.player == player).cloned().collect()
    }

    pub fn bet_count(&self) -> usize {
        self.bets.len()
    }

    /// Debug check of the ledger invariants; used by the test suites
    pub fn check_invariants(&self) {
        for (number, exposure) in &self.exposure {
            assert!(
                *exposure <= self.liability_limit,
                "exposure {} on {} exceeds limit {}",
                exposure,
                number,
                self.liability_limit
            );
            let booked: Wei = self
                .bets
                .iter()
                .filter(|b| b.number == *number)
                .map(|b| b.potential_payout)
                .sum();
            assert_eq!(*exposure, booked, "exposure desynced on number {}", number);
        }
        if let Some(winning) = self.winning_number.filter(|_| self.is_resolved) {
            let owed: Wei = self
                .bets
                .iter()
                .filter(|b| b.number == winning && !b.claimed)
                .map(|b| b.potential_payout)
                .sum();
            assert_eq!(self.total_unclaimed_payouts, owed, "unclaimed total desynced");
        }
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ETH: Wei = 1_000_000_000_000_000_000;

    fn test_round() -> Round {
        Round::new(
            1,
            2,      // 00..99
            3_600,  // deadline
            ETH,    // collateral
            10_000, // 100x
            110,    // 1.1x
            500,    // 5%
            25,     // 0.25%
            "CREATOR".to_string(),
            "TREASURY".to_string(),
            0,
        )
    }

    #[test]
    fn test_new_round_parameters() {
        let round = test_round();
        assert_eq!(round.max_number, 99);
        assert_eq!(round.balance, ETH);
        // 0.25% protocol cut carved out of the limit
        assert_eq!(round.liability_limit, ETH / 10_000 * 9_975);
        assert_eq!(round.phase(0), RoundPhase::Open);
    }

    #[test]
    fn test_place_bet_updates_ledger() {
        let mut round = test_round();
        let receipt = round.place_bet("alice", 42, ETH / 100, 10).unwrap();

        assert_eq!(
            receipt.creator_fee + receipt.protocol_fee + receipt.net_amount,
            receipt.amount
        );
        assert_eq!(receipt.locked_odds, 10_000);
        assert_eq!(round.exposure_on(42), receipt.potential_payout);
        assert_eq!(round.stakes_on(42), receipt.net_amount);
        assert_eq!(round.balance, ETH + receipt.net_amount);
        assert_eq!(round.bet_count(), 1);
        round.check_invariants();
    }

    #[test]
    fn test_odds_decrease_between_bets() {
        let mut round = test_round();
        let odds_before = round.get_odds(77).unwrap();
        round.place_bet("alice", 77, ETH / 1000, 10).unwrap();
        let odds_after = round.get_odds(77).unwrap();
        assert!(odds_after < odds_before);
        round.check_invariants();
    }

    #[test]
    fn test_solvency_rejects_oversized_bet() {
        let mut round = test_round();
        // Even at the 1.1x floor, a 1 ETH bet owes ~1.04 ETH > limit
        let err = round.place_bet("alice", 99, ETH, 10).unwrap_err();
        assert_eq!(err, LotteryError::ExceedsLimit);
        // All-or-nothing: nothing may have been recorded
        assert_eq!(round.exposure_on(99), 0);
        assert_eq!(round.stakes_on(99), 0);
        assert_eq!(round.bet_count(), 0);
        assert_eq!(round.balance, ETH);
    }

    #[test]
    fn test_max_bet_is_admissible_and_tight() {
        let mut round = test_round();
        round.place_bet("alice", 7, ETH / 500, 10).unwrap();

        let max = round.max_bet(7).unwrap();
        assert!(max > 0);
        let mut probe = round.clone();
        probe.place_bet("bob", 7, max, 10).unwrap();
        probe.check_invariants();

        let mut over = round.clone();
        assert_eq!(over.place_bet("bob", 7, max + 1, 10).unwrap_err(), LotteryError::ExceedsLimit);
    }

    #[test]
    fn test_bet_after_deadline_rejected() {
        let mut round = test_round();
        let err = round.place_bet("alice", 42, ETH / 100, 3_600).unwrap_err();
        assert_eq!(err, LotteryError::RoundEnded);
    }

    #[test]
    fn test_invalid_number_and_amount() {
        let mut round = test_round();
        assert_eq!(
            round.place_bet("alice", 100, ETH / 100, 10).unwrap_err(),
            LotteryError::InvalidNumber(100)
        );
        assert_eq!(round.place_bet("alice", 5, 0, 10).unwrap_err(), LotteryError::InvalidAmount);
    }

    #[test]
    fn test_draw_request_gating_and_idempotency() {
        let mut round = test_round();
        assert_eq!(round.request_draw(100).unwrap_err(), LotteryError::BettingStillOpen);

        round.request_draw(3_700).unwrap();
        assert_eq!(round.phase(3_700), RoundPhase::AwaitingRandomness);
        assert_eq!(round.request_draw(3_800).unwrap_err(), LotteryError::DrawAlreadyRequested);
    }

    #[test]
    fn test_fulfill_requires_pending_request() {
        let mut round = test_round();
        assert_eq!(round.fulfill_draw(42).unwrap_err(), LotteryError::DrawNotRequested);

        round.request_draw(3_700).unwrap();
        round.fulfill_draw(42).unwrap();
        assert!(round.is_resolved);
        assert_eq!(round.winning_number, Some(42));
        assert_eq!(round.phase(9_999), RoundPhase::Resolved);
        assert_eq!(round.fulfill_draw(43).unwrap_err(), LotteryError::AlreadyResolved);
    }

    #[test]
    fn test_resolution_freezes_unclaimed_total() {
        let mut round = test_round();
        let receipt = round.place_bet("alice", 42, ETH / 100, 10).unwrap();
        round.place_bet("bob", 13, ETH / 100, 11).unwrap();

        round.request_draw(3_700).unwrap();
        round.fulfill_draw(42).unwrap();
        assert_eq!(round.total_unclaimed_payouts, receipt.potential_payout);
        round.check_invariants();
    }

    #[test]
    fn test_claim_pays_once_then_rejects() {
        let mut round = test_round();
        let receipt = round.place_bet("alice", 42, ETH / 100, 10).unwrap();
        round.request_draw(3_700).unwrap();
        round.fulfill_draw(42).unwrap();

        let claim = round.claim_winnings("alice").unwrap();
        assert_eq!(claim.total_paid, receipt.potential_payout);
        assert_eq!(claim.bets_claimed, 1);
        assert_eq!(round.total_unclaimed_payouts, 0);

        assert_eq!(round.claim_winnings("alice").unwrap_err(), LotteryError::NothingToClaim);
        round.check_invariants();
    }

    #[test]
    fn test_loser_cannot_claim() {
        let mut round = test_round();
        round.place_bet("bob", 13, ETH / 100, 10).unwrap();
        round.request_draw(3_700).unwrap();
        round.fulfill_draw(42).unwrap();
        assert_eq!(round.claim_winnings("bob").unwrap_err(), LotteryError::NothingToClaim);
    }

    #[test]
    fn test_claim_before_resolution_rejected() {
        let mut round = test_round();
        round.place_bet("alice", 42, ETH / 100, 10).unwrap();
        assert_eq!(round.claim_winnings("alice").unwrap_err(), LotteryError::RoundNotEnded);
    }

    #[test]
    fn test_withdraw_gating_and_residual() {
        let mut round = test_round();
        let receipt = round.place_bet("alice", 42, ETH / 100, 10).unwrap();

        assert_eq!(round.withdraw_collateral().unwrap_err(), LotteryError::RoundNotEnded);

        round.request_draw(3_700).unwrap();
        round.fulfill_draw(42).unwrap();

        let residual = round.withdraw_collateral().unwrap();
        assert_eq!(residual, ETH + receipt.net_amount - receipt.potential_payout);
        // Exactly the unclaimed payouts stay behind for stragglers
        assert_eq!(round.balance, round.total_unclaimed_payouts);

        assert_eq!(round.withdraw_collateral().unwrap_err(), LotteryError::NothingToWithdraw);
    }

    #[test]
    fn test_exposure_matches_booked_payouts_across_many_bets() {
        let mut round = test_round();
        for i in 0..10u32 {
            round.place_bet("alice", 42, ETH / 1000 * (i as u128 + 1), 10 + i as u64).unwrap();
            round.place_bet("bob", i, ETH / 2000, 10 + i as u64).unwrap();
            round.check_invariants();
        }
        assert!(round.exposure_on(42) <= round.liability_limit);
    }
}
