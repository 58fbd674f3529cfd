pub mod lifecycle;
pub mod odds;
pub mod round;

pub use lifecycle::{derive_phase, RoundPhase};
pub use odds::{max_bet, payout, quote_odds, split_fees, FeeSplit, Wei, BPS_SCALE, ODDS_SCALE};
pub use round::{Bet, BetReceipt, ClaimReceipt, LotteryError, Round};
