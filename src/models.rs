// Wire models for the lottery API

use serde::{Deserialize, Serialize};

use crate::engine::{Bet, Round, RoundPhase, Wei};
use crate::ledger::Transaction;

// ===== REQUESTS =====

#[derive(Debug, Deserialize)]
pub struct CreateRoundRequest {
    pub creator: String,
    pub digits: u8,
    pub bet_period_secs: u64,
    /// Odds scaled x100 (10000 = 100.00x)
    pub initial_odds: u64,
    /// Odds floor, scaled x100
    pub min_odds: u64,
    pub creator_fee_bps: u32,
    /// Collateral in wei, debited from the creator's account
    pub collateral: Wei,
}

#[derive(Debug, Deserialize)]
pub struct PlaceBetRequest {
    pub player: String,
    pub number: u32,
    /// Gross amount in wei, fees included
    pub amount: Wei,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub account: String,
    pub amount: Wei,
}

#[derive(Debug, Deserialize)]
pub struct FulfillDrawRequest {
    pub winning_number: u32,
}

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub player: String,
}

#[derive(Debug, Deserialize)]
pub struct DrawRequest {
    pub caller: String,
}

/// Query string for the odds quote endpoint.
///
/// `amount` is accepted for interface parity with the on-chain read
/// (`getOdds(number, amount)`) but does not change the quote: odds are the
/// pre-trade spot value for the number, whatever the trade size.
#[derive(Debug, Deserialize)]
pub struct OddsQuery {
    pub number: u32,
    #[serde(default)]
    pub amount: Option<Wei>,
}

// ===== RESPONSES =====

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateRoundResponse {
    pub round_id: u64,
    pub bet_deadline: u64,
    pub liability_limit: Wei,
}

#[derive(Debug, Serialize)]
pub struct OddsResponse {
    pub round_id: u64,
    pub number: u32,
    /// Quoted odds scaled x100
    pub odds: u64,
}

#[derive(Debug, Serialize)]
pub struct MaxBetResponse {
    pub round_id: u64,
    pub number: u32,
    pub max_bet: Wei,
}

#[derive(Debug, Serialize)]
pub struct ExposureResponse {
    pub round_id: u64,
    pub number: u32,
    pub exposure: Wei,
    pub total_stakes: Wei,
}

#[derive(Debug, Serialize)]
pub struct DrawResponse {
    pub round_id: u64,
    pub resolved: bool,
    pub winning_number: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct WithdrawResponse {
    pub round_id: u64,
    pub residual_withdrawn: Wei,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub account: String,
    pub balance: Wei,
}

#[derive(Debug, Serialize)]
pub struct UserBetsResponse {
    pub round_id: u64,
    pub player: String,
    pub bets: Vec<Bet>,
}

/// Full read surface of a round, mirroring the on-chain getters
#[derive(Debug, Serialize)]
pub struct RoundSummary {
    pub round_id: u64,
    pub digits: u8,
    pub max_number: u32,
    pub bet_deadline: u64,
    pub collateral: Wei,
    pub liability_limit: Wei,
    pub initial_odds: u64,
    pub min_odds: u64,
    pub creator_fee_bps: u32,
    pub protocol_fee_bps: u32,
    pub creator: String,
    pub phase: RoundPhase,
    pub is_resolved: bool,
    pub winning_number: Option<u32>,
    pub draw_requested_at: Option<u64>,
    pub total_unclaimed_payouts: Wei,
    pub pool_balance: Wei,
    pub bet_count: usize,
}

impl RoundSummary {
    pub fn from_round(round: &Round, now: u64) -> Self {
        Self {
            round_id: round.round_id,
            digits: round.digits,
            max_number: round.max_number,
            bet_deadline: round.bet_deadline,
            collateral: round.collateral,
            liability_limit: round.liability_limit,
            initial_odds: round.initial_odds,
            min_odds: round.min_odds,
            creator_fee_bps: round.creator_fee_bps,
            protocol_fee_bps: round.protocol_fee_bps,
            creator: round.creator.clone(),
            phase: round.phase(now),
            is_resolved: round.is_resolved,
            winning_number: round.winning_number,
            draw_requested_at: round.draw_requested_at,
            total_unclaimed_payouts: round.total_unclaimed_payouts,
            pool_balance: round.balance,
            bet_count: round.bet_count(),
        }
    }
}

/// Emitted record with a human-readable timestamp for the activity feed
#[derive(Debug, Serialize)]
pub struct TransactionView {
    pub id: String,
    pub tx_type: crate::ledger::TxType,
    pub from: String,
    pub to: Option<String>,
    pub amount: Wei,
    pub round_id: Option<u64>,
    pub number: Option<u32>,
    pub timestamp: u64,
    pub time: String,
    pub description: Option<String>,
}

impl From<&Transaction> for TransactionView {
    fn from(tx: &Transaction) -> Self {
        let time = chrono::DateTime::from_timestamp(tx.timestamp as i64, 0)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();
        Self {
            id: tx.id.clone(),
            tx_type: tx.tx_type,
            from: tx.from.clone(),
            to: tx.to.clone(),
            amount: tx.amount,
            round_id: tx.round_id,
            number: tx.number,
            timestamp: tx.timestamp,
            time,
            description: tx.description.clone(),
        }
    }
}
