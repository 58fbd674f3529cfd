/// Number-Pool Lottery settlement engine
/// Exports all modules for use as a library crate

pub mod app_state;
pub mod engine;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod randomness;
pub mod registry;

pub use engine::{
    derive_phase, max_bet, payout, quote_odds, split_fees, Bet, BetReceipt, ClaimReceipt,
    FeeSplit, LotteryError, Round, RoundPhase, Wei, BPS_SCALE, ODDS_SCALE,
};
pub use ledger::{pool_account, CashLedger, Transaction, TxType};
pub use randomness::{
    DrawOutcome, ExternalOracle, FixedDrawProvider, HashDrawProvider, RandomnessProvider,
};
pub use registry::{DrawStatus, RoundRegistry, MAX_DIGITS};
