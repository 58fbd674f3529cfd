// ============================================================================
// Round Registry - Factory and Settlement Orchestration
// ============================================================================
//
// The registry owns every Round outright and is the only writer to the cash
// ledger. Each public operation is one complete transaction: validate, apply
// the round's ledger mutations, and only then move cash and append records.
// Failures return before anything is touched, so no rollback machinery
// exists anywhere in the engine.
//
// Rounds never see each other or the ledger; the registry holds the seams.
// The randomness oracle is an injected RandomnessProvider, so production
// and test oracles swap without the settlement logic noticing.
// ============================================================================

use std::collections::HashMap;
use tracing::info;

use crate::engine::{Bet, BetReceipt, ClaimReceipt, LotteryError, Round, Wei, BPS_SCALE};
use crate::ledger::{pool_account, CashLedger, Transaction};
use crate::randomness::{DrawOutcome, RandomnessProvider};

/// Largest supported number space (6 digits -> 000000..999999)
pub const MAX_DIGITS: u8 = 6;

/// Result of a draw request: either already resolved or parked on the oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawStatus {
    Resolved(u32),
    PendingOracle,
}

pub struct RoundRegistry {
    pub rounds: HashMap<u64, Round>,
    pub next_round_id: u64,
    pub ledger: CashLedger,
    provider: Box<dyn RandomnessProvider>,
    pub protocol_fee_bps: u32,
    pub protocol_treasury: String,
}

impl RoundRegistry {
    pub fn new(
        provider: Box<dyn RandomnessProvider>,
        protocol_fee_bps: u32,
        protocol_treasury: String,
    ) -> Self {
        info!(
            oracle = provider.name(),
            protocol_fee_bps, %protocol_treasury,
            "round registry initialized"
        );
        Self {
            rounds: HashMap::new(),
            next_round_id: 1,
            ledger: CashLedger::new(),
            provider,
            protocol_fee_bps,
            protocol_treasury,
        }
    }

    pub fn round(&self, round_id: u64) -> Result<&Round, LotteryError> {
        self.rounds.get(&round_id).ok_or(LotteryError::RoundNotFound(round_id))
    }

    fn round_mut(&mut self, round_id: u64) -> Result<&mut Round, LotteryError> {
        self.rounds.get_mut(&round_id).ok_or(LotteryError::RoundNotFound(round_id))
    }

    /// Fund an account (dev faucet / deposit path)
    pub fn deposit(&mut self, account: &str, amount: Wei, now: u64) {
        self.ledger.credit(account, amount);
        self.ledger.record(Transaction::deposit(account, amount, now));
    }

    /// Create a round, locking the creator's collateral into its pool
    #[allow(clippy::too_many_arguments)]
    pub fn create_round(
        &mut self,
        creator: &str,
        digits: u8,
        bet_period_secs: u64,
        initial_odds: u64,
        min_odds: u64,
        creator_fee_bps: u32,
        collateral: Wei,
        now: u64,
    ) -> Result<u64, LotteryError> {
        if digits == 0 || digits > MAX_DIGITS {
            return Err(LotteryError::InvalidParameters(format!(
                "digits must be 1..={}, got {}",
                MAX_DIGITS, digits
            )));
        }
        if collateral == 0 {
            return Err(LotteryError::InvalidParameters("collateral must be positive".into()));
        }
        if bet_period_secs == 0 {
            return Err(LotteryError::InvalidParameters("bet period must be positive".into()));
        }
        if min_odds == 0 || min_odds > initial_odds {
            return Err(LotteryError::InvalidParameters(format!(
                "odds bounds invalid: min {} initial {}",
                min_odds, initial_odds
            )));
        }
        if creator_fee_bps as u128 + self.protocol_fee_bps as u128 >= BPS_SCALE {
            return Err(LotteryError::InvalidParameters("fees consume the entire stake".into()));
        }

        self.ledger.debit(creator, collateral)?;

        let round_id = self.next_round_id;
        self.next_round_id += 1;

        let round = Round::new(
            round_id,
            digits,
            now + bet_period_secs,
            collateral,
            initial_odds,
            min_odds,
            creator_fee_bps,
            self.protocol_fee_bps,
            creator.to_string(),
            self.protocol_treasury.clone(),
            now,
        );
        self.ledger.credit(&pool_account(round_id), collateral);
        self.ledger.record(Transaction::round_created(creator, round_id, collateral, now));

        info!(
            round_id,
            creator,
            digits,
            collateral,
            liability_limit = round.liability_limit,
            bet_deadline = round.bet_deadline,
            "round created"
        );
        self.rounds.insert(round_id, round);
        Ok(round_id)
    }

    /// Place a bet: round admission first, cash movement strictly after
    pub fn place_bet(
        &mut self,
        round_id: u64,
        player: &str,
        number: u32,
        amount: Wei,
        now: u64,
    ) -> Result<BetReceipt, LotteryError> {
        // Funds check up front keeps the round untouched on a short balance
        let available = self.ledger.balance(player);
        if available < amount {
            return Err(LotteryError::InsufficientFunds { available, requested: amount });
        }

        let receipt = self.round_mut(round_id)?.place_bet(player, number, amount, now)?;

        // Ledger mutations are final; route the cash
        let pool = pool_account(round_id);
        self.ledger.debit(player, amount)?;
        self.ledger.credit(&pool, receipt.net_amount);
        let (creator, treasury) = {
            let round = self.round(round_id)?;
            (round.creator.clone(), round.protocol_treasury.clone())
        };
        self.ledger.credit(&creator, receipt.creator_fee);
        self.ledger.credit(&treasury, receipt.protocol_fee);

        self.ledger.record(Transaction::bet_placed(player, round_id, number, amount, now));
        if receipt.creator_fee > 0 {
            self.ledger.record(Transaction::fee_transfer(round_id, &creator, receipt.creator_fee, now));
        }
        if receipt.protocol_fee > 0 {
            self.ledger.record(Transaction::fee_transfer(round_id, &treasury, receipt.protocol_fee, now));
        }

        info!(
            round_id,
            player,
            number,
            amount,
            locked_odds = receipt.locked_odds,
            potential_payout = receipt.potential_payout,
            "bet placed"
        );
        Ok(receipt)
    }

    /// Request the draw and hand it to the oracle
    pub fn request_draw(
        &mut self,
        round_id: u64,
        caller: &str,
        now: u64,
    ) -> Result<DrawStatus, LotteryError> {
        let max_number = {
            let round = self.round_mut(round_id)?;
            round.request_draw(now)?;
            round.max_number
        };
        self.ledger.record(Transaction::draw_requested(caller, round_id, now));
        info!(round_id, caller, "draw requested");

        match self.provider.request_draw(round_id, max_number, now) {
            DrawOutcome::Immediate(winning) => {
                self.apply_resolution(round_id, winning, now)?;
                Ok(DrawStatus::Resolved(winning))
            }
            DrawOutcome::Pending => Ok(DrawStatus::PendingOracle),
        }
    }

    /// Oracle callback path for providers that answer out of band
    pub fn fulfill_draw(
        &mut self,
        round_id: u64,
        winning_number: u32,
        now: u64,
    ) -> Result<(), LotteryError> {
        self.apply_resolution(round_id, winning_number, now)
    }

    fn apply_resolution(
        &mut self,
        round_id: u64,
        winning_number: u32,
        now: u64,
    ) -> Result<(), LotteryError> {
        let unclaimed = {
            let round = self.round_mut(round_id)?;
            round.fulfill_draw(winning_number)?;
            round.total_unclaimed_payouts
        };
        self.ledger.record(Transaction::round_resolved(round_id, winning_number, unclaimed, now));
        info!(round_id, winning_number, unclaimed, "round resolved");
        Ok(())
    }

    /// Pay out every unclaimed winning bet for a player
    pub fn claim_winnings(
        &mut self,
        round_id: u64,
        player: &str,
        now: u64,
    ) -> Result<ClaimReceipt, LotteryError> {
        let receipt = self.round_mut(round_id)?.claim_winnings(player)?;
        self.ledger.transfer(&pool_account(round_id), player, receipt.total_paid)?;
        self.ledger.record(Transaction::winnings_claimed(player, round_id, receipt.total_paid, now));
        info!(round_id, player, paid = receipt.total_paid, "winnings claimed");
        Ok(receipt)
    }

    /// Return the uncommitted residual collateral to the creator
    pub fn withdraw_collateral(&mut self, round_id: u64, now: u64) -> Result<Wei, LotteryError> {
        let (residual, creator) = {
            let round = self.round_mut(round_id)?;
            let residual = round.withdraw_collateral()?;
            (residual, round.creator.clone())
        };
        self.ledger.transfer(&pool_account(round_id), &creator, residual)?;
        self.ledger.record(Transaction::collateral_withdrawn(round_id, &creator, residual, now));
        info!(round_id, %creator, residual, "collateral withdrawn");
        Ok(residual)
    }

    // ===== READ-ONLY QUERIES =====

    pub fn get_odds(&self, round_id: u64, number: u32) -> Result<u64, LotteryError> {
        self.round(round_id)?.get_odds(number)
    }

    pub fn max_bet(&self, round_id: u64, number: u32) -> Result<Wei, LotteryError> {
        self.round(round_id)?.max_bet(number)
    }

    pub fn exposure(&self, round_id: u64, number: u32) -> Result<Wei, LotteryError> {
        let round = self.round(round_id)?;
        if number > round.max_number {
            return Err(LotteryError::InvalidNumber(number));
        }
        Ok(round.exposure_on(number))
    }

    pub fn total_stakes(&self, round_id: u64, number: u32) -> Result<Wei, LotteryError> {
        let round = self.round(round_id)?;
        if number > round.max_number {
            return Err(LotteryError::InvalidNumber(number));
        }
        Ok(round.stakes_on(number))
    }

    pub fn user_bets(&self, round_id: u64, player: &str) -> Result<Vec<Bet>, LotteryError> {
        Ok(self.round(round_id)?.bets_for(player))
    }

    pub fn oracle_name(&self) -> &'static str {
        self.provider.name()
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::randomness::{ExternalOracle, FixedDrawProvider};

    const ETH: Wei = 1_000_000_000_000_000_000;

    fn registry_with(winning: u32) -> RoundRegistry {
        RoundRegistry::new(Box::new(FixedDrawProvider::new(winning)), 25, "TREASURY".to_string())
    }

    fn funded_round(registry: &mut RoundRegistry) -> u64 {
        registry.deposit("creator", 2 * ETH, 0);
        registry.deposit("alice", ETH, 0);
        registry.deposit("bob", ETH, 0);
        registry
            .create_round("creator", 2, 3_600, 10_000, 110, 500, ETH, 0)
            .unwrap()
    }

    #[test]
    fn test_create_round_locks_collateral() {
        let mut registry = registry_with(42);
        let id = funded_round(&mut registry);

        assert_eq!(registry.ledger.balance("creator"), ETH);
        assert_eq!(registry.ledger.balance(&pool_account(id)), ETH);
        assert_eq!(registry.round(id).unwrap().balance, ETH);
    }

    #[test]
    fn test_create_round_validation() {
        let mut registry = registry_with(42);
        registry.deposit("creator", ETH, 0);

        assert!(matches!(
            registry.create_round("creator", 0, 3_600, 10_000, 110, 500, ETH, 0),
            Err(LotteryError::InvalidParameters(_))
        ));
        assert!(matches!(
            registry.create_round("creator", 2, 3_600, 100, 110, 500, ETH, 0),
            Err(LotteryError::InvalidParameters(_))
        ));
        assert!(matches!(
            registry.create_round("creator", 2, 3_600, 10_000, 110, 500, 2 * ETH, 0),
            Err(LotteryError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn test_bet_moves_cash_and_reconciles() {
        let mut registry = registry_with(42);
        let id = funded_round(&mut registry);

        let receipt = registry.place_bet(id, "alice", 42, ETH / 100, 10).unwrap();

        assert_eq!(registry.ledger.balance("alice"), ETH - ETH / 100);
        // Creator got exactly the fee on top of the unspent deposit
        assert_eq!(registry.ledger.balance("creator"), ETH + receipt.creator_fee);
        assert_eq!(registry.ledger.balance("TREASURY"), receipt.protocol_fee);
        // Pool account mirrors the round's internal balance to the wei
        assert_eq!(
            registry.ledger.balance(&pool_account(id)),
            registry.round(id).unwrap().balance
        );
    }

    #[test]
    fn test_short_balance_leaves_round_untouched() {
        let mut registry = registry_with(42);
        let id = funded_round(&mut registry);

        let err = registry.place_bet(id, "alice", 42, 2 * ETH, 10).unwrap_err();
        assert!(matches!(err, LotteryError::InsufficientFunds { .. }));
        assert_eq!(registry.round(id).unwrap().bet_count(), 0);
        assert_eq!(registry.ledger.balance("alice"), ETH);
    }

    #[test]
    fn test_immediate_oracle_resolves_on_request() {
        let mut registry = registry_with(42);
        let id = funded_round(&mut registry);
        registry.place_bet(id, "alice", 42, ETH / 100, 10).unwrap();

        let status = registry.request_draw(id, "creator", 4_000).unwrap();
        assert_eq!(status, DrawStatus::Resolved(42));
        assert!(registry.round(id).unwrap().is_resolved);
    }

    #[test]
    fn test_external_oracle_defers_to_fulfill() {
        let mut registry =
            RoundRegistry::new(Box::new(ExternalOracle), 25, "TREASURY".to_string());
        registry.deposit("creator", ETH, 0);
        let id = registry
            .create_round("creator", 2, 3_600, 10_000, 110, 500, ETH, 0)
            .unwrap();

        let status = registry.request_draw(id, "creator", 4_000).unwrap();
        assert_eq!(status, DrawStatus::PendingOracle);
        assert!(!registry.round(id).unwrap().is_resolved);

        registry.fulfill_draw(id, 7, 4_100).unwrap();
        assert_eq!(registry.round(id).unwrap().winning_number, Some(7));
    }

    #[test]
    fn test_full_cycle_pays_winner_and_creator() {
        let mut registry = registry_with(42);
        let id = funded_round(&mut registry);

        let receipt = registry.place_bet(id, "alice", 42, ETH / 100, 10).unwrap();
        registry.place_bet(id, "bob", 99, ETH / 100, 11).unwrap();

        registry.request_draw(id, "creator", 4_000).unwrap();

        let alice_before = registry.ledger.balance("alice");
        let claim = registry.claim_winnings(id, "alice", 4_100).unwrap();
        assert_eq!(claim.total_paid, receipt.potential_payout);
        assert_eq!(registry.ledger.balance("alice"), alice_before + claim.total_paid);

        // Loser has nothing
        assert_eq!(
            registry.claim_winnings(id, "bob", 4_200).unwrap_err(),
            LotteryError::NothingToClaim
        );

        let creator_before = registry.ledger.balance("creator");
        let residual = registry.withdraw_collateral(id, 4_300).unwrap();
        assert_eq!(registry.ledger.balance("creator"), creator_before + residual);
        // Pool retains exactly what unclaimed winners are still owed (zero here)
        assert_eq!(
            registry.ledger.balance(&pool_account(id)),
            registry.round(id).unwrap().total_unclaimed_payouts
        );
    }

    #[test]
    fn test_unknown_round_is_reported() {
        let registry = registry_with(42);
        assert_eq!(registry.get_odds(99, 1).unwrap_err(), LotteryError::RoundNotFound(99));
    }
}
