/// Cash ledger for the lottery service
///
/// Tracks every account balance in wei and keeps an append-only transaction
/// log. The log doubles as the emitted-records stream: bet placed, draw
/// requested, round resolved, winnings claimed, collateral withdrawn and
/// round created all land here as typed entries.
///
/// Rounds hold their cash in synthetic pool accounts (`pool:<round_id>`),
/// so `ledger.balance(pool_account(id)) == round.balance` is a checkable
/// reconciliation at any time.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::engine::{LotteryError, Wei};

/// Ledger account name for a round's pool
pub fn pool_account(round_id: u64) -> String {
    format!("pool:{}", round_id)
}

// ============================================================================
// TRANSACTION RECORDS
// ============================================================================

/// Record types emitted by the engine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    Deposit,
    RoundCreated,
    BetPlaced,
    FeeTransfer,
    DrawRequested,
    RoundResolved,
    WinningsClaimed,
    CollateralWithdrawn,
}

/// One emitted record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub tx_type: TxType,
    pub from: String,
    pub to: Option<String>,
    pub amount: Wei,
    pub round_id: Option<u64>,
    pub number: Option<u32>,
    pub timestamp: u64,
    pub description: Option<String>,
}

impl Transaction {
    pub fn new(tx_type: TxType, from: &str, amount: Wei, timestamp: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tx_type,
            from: from.to_string(),
            to: None,
            amount,
            round_id: None,
            number: None,
            timestamp,
            description: None,
        }
    }

    pub fn round_created(creator: &str, round_id: u64, collateral: Wei, ts: u64) -> Self {
        let mut tx = Self::new(TxType::RoundCreated, creator, collateral, ts);
        tx.round_id = Some(round_id);
        tx.to = Some(pool_account(round_id));
        tx.description = Some(format!(
            "Round {} created with {} wei collateral",
            round_id, collateral
        ));
        tx
    }

    pub fn bet_placed(player: &str, round_id: u64, number: u32, gross: Wei, ts: u64) -> Self {
        let mut tx = Self::new(TxType::BetPlaced, player, gross, ts);
        tx.round_id = Some(round_id);
        tx.number = Some(number);
        tx.to = Some(pool_account(round_id));
        tx.description = Some(format!("Bet {} wei on number {}", gross, number));
        tx
    }

    pub fn fee_transfer(round_id: u64, recipient: &str, amount: Wei, ts: u64) -> Self {
        let mut tx = Self::new(TxType::FeeTransfer, &pool_account(round_id), amount, ts);
        tx.round_id = Some(round_id);
        tx.to = Some(recipient.to_string());
        tx.description = Some(format!("Fee {} wei to {}", amount, recipient));
        tx
    }

    pub fn draw_requested(caller: &str, round_id: u64, ts: u64) -> Self {
        let mut tx = Self::new(TxType::DrawRequested, caller, 0, ts);
        tx.round_id = Some(round_id);
        tx.description = Some(format!("Draw requested for round {}", round_id));
        tx
    }

    pub fn round_resolved(round_id: u64, winning_number: u32, unclaimed: Wei, ts: u64) -> Self {
        let mut tx = Self::new(TxType::RoundResolved, "oracle", unclaimed, ts);
        tx.round_id = Some(round_id);
        tx.number = Some(winning_number);
        tx.description = Some(format!(
            "Round {} resolved: number {} wins, {} wei owed",
            round_id, winning_number, unclaimed
        ));
        tx
    }

    pub fn winnings_claimed(player: &str, round_id: u64, paid: Wei, ts: u64) -> Self {
        let mut tx = Self::new(TxType::WinningsClaimed, &pool_account(round_id), paid, ts);
        tx.round_id = Some(round_id);
        tx.to = Some(player.to_string());
        tx.description = Some(format!("Winnings {} wei claimed", paid));
        tx
    }

    pub fn collateral_withdrawn(round_id: u64, creator: &str, residual: Wei, ts: u64) -> Self {
        let mut tx = Self::new(TxType::CollateralWithdrawn, &pool_account(round_id), residual, ts);
        tx.round_id = Some(round_id);
        tx.to = Some(creator.to_string());
        tx.description = Some(format!("Residual collateral {} wei withdrawn", residual));
        tx
    }

    pub fn deposit(account: &str, amount: Wei, ts: u64) -> Self {
        let mut tx = Self::new(TxType::Deposit, "faucet", amount, ts);
        tx.to = Some(account.to_string());
        tx.description = Some(format!("Deposit {} wei", amount));
        tx
    }
}

// ============================================================================
// LEDGER
// ============================================================================

/// Account balances plus the emitted-record log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CashLedger {
    pub balances: HashMap<String, Wei>,
    pub transactions: Vec<Transaction>,
}

impl CashLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spendable balance; unknown accounts read as zero
    pub fn balance(&self, account: &str) -> Wei {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Add funds, creating the account on first touch
    pub fn credit(&mut self, account: &str, amount: Wei) {
        *self.balances.entry(account.to_string()).or_insert(0) += amount;
    }

    /// Remove funds; fails without mutating when the balance is short
    pub fn debit(&mut self, account: &str, amount: Wei) -> Result<(), LotteryError> {
        let balance = self.balances.entry(account.to_string()).or_insert(0);
        if *balance < amount {
            return Err(LotteryError::InsufficientFunds {
                available: *balance,
                requested: amount,
            });
        }
        *balance -= amount;
        Ok(())
    }

    /// Move funds between accounts as one failure-atomic step
    pub fn transfer(&mut self, from: &str, to: &str, amount: Wei) -> Result<(), LotteryError> {
        self.debit(from, amount)?;
        self.credit(to, amount);
        Ok(())
    }

    /// Append an emitted record
    pub fn record(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    /// Records touching an account, oldest first
    pub fn transactions_for(&self, account: &str) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|tx| tx.from == account || tx.to.as_deref() == Some(account))
            .collect()
    }

    /// Most recent records first
    pub fn recent_transactions(&self, limit: usize) -> Vec<&Transaction> {
        self.transactions.iter().rev().take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_debit_roundtrip() {
        let mut ledger = CashLedger::new();
        ledger.credit("alice", 1_000);
        assert_eq!(ledger.balance("alice"), 1_000);
        ledger.debit("alice", 400).unwrap();
        assert_eq!(ledger.balance("alice"), 600);
    }

    #[test]
    fn test_debit_insufficient_is_atomic() {
        let mut ledger = CashLedger::new();
        ledger.credit("alice", 100);
        let err = ledger.debit("alice", 101).unwrap_err();
        assert_eq!(err, LotteryError::InsufficientFunds { available: 100, requested: 101 });
        assert_eq!(ledger.balance("alice"), 100);
    }

    #[test]
    fn test_transfer_moves_funds() {
        let mut ledger = CashLedger::new();
        ledger.credit("alice", 500);
        ledger.transfer("alice", "bob", 200).unwrap();
        assert_eq!(ledger.balance("alice"), 300);
        assert_eq!(ledger.balance("bob"), 200);
    }

    #[test]
    fn test_transaction_filtering() {
        let mut ledger = CashLedger::new();
        ledger.record(Transaction::deposit("alice", 500, 10));
        ledger.record(Transaction::bet_placed("alice", 1, 42, 100, 20));
        ledger.record(Transaction::deposit("bob", 500, 30));

        assert_eq!(ledger.transactions_for("alice").len(), 2);
        assert_eq!(ledger.transactions_for("bob").len(), 1);
        let recent = ledger.recent_transactions(2);
        assert_eq!(recent[0].tx_type, TxType::Deposit);
        assert_eq!(recent[1].tx_type, TxType::BetPlaced);
    }
}
