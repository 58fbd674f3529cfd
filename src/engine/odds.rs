// ============================================================================
// Odds Engine - Capped AMM Pricing for the Number Pool
// ============================================================================
//
// The pool quotes odds as a linear function of how much liability is already
// concentrated on a number:
//
//   raw  = initial_odds * (liability_limit - exposure) / liability_limit
//   odds = max(min_odds, raw)
//
// As exposure on a number grows, its odds sink toward the floor. This is the
// slippage behavior that bounds the pool's liability: the admission check in
// the round refuses any bet whose payout would push exposure past the limit.
//
// Odds are integers scaled x100 (10_000 = 100.00x, 110 = 1.10x). Fees are
// basis points (1/100 of a percent). All money is u128 wei; every division
// floors, so payouts and fees reconcile exactly.
//
// Quotes read the PRE-TRADE exposure only. A large bet therefore gets the
// spot odds for its full size rather than integrating along the curve; the
// solvency cap still holds because admission checks the post-trade exposure.
// ============================================================================

/// Amounts are wei throughout the engine.
pub type Wei = u128;

/// Odds denominator: odds of 100 mean 1.00x
pub const ODDS_SCALE: u128 = 100;

/// Basis point denominator for fees
pub const BPS_SCALE: u128 = 10_000;

/// Fee split of a gross bet amount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    pub creator_fee: Wei,
    pub protocol_fee: Wei,
    pub net_amount: Wei,
}

/// Split a gross amount into creator fee, protocol fee and net stake.
///
/// Both fees floor, so `creator_fee + protocol_fee + net_amount == gross`
/// holds exactly for every input.
pub fn split_fees(gross: Wei, creator_fee_bps: u32, protocol_fee_bps: u32) -> FeeSplit {
    let creator_fee = gross * creator_fee_bps as u128 / BPS_SCALE;
    let protocol_fee = gross * protocol_fee_bps as u128 / BPS_SCALE;
    FeeSplit {
        creator_fee,
        protocol_fee,
        net_amount: gross - creator_fee - protocol_fee,
    }
}

/// Quote the current odds for a number given its pre-trade exposure.
///
/// Monotonically non-increasing in `exposure`: more liability on a number
/// can only lower its quote, never raise it. Saturates at `min_odds` once
/// the raw curve drops below the floor (or exposure meets the limit).
pub fn quote_odds(initial_odds: u64, min_odds: u64, liability_limit: Wei, exposure: Wei) -> u64 {
    if liability_limit == 0 || exposure >= liability_limit {
        return min_odds;
    }
    let raw = initial_odds as u128 * (liability_limit - exposure) / liability_limit;
    (raw as u64).max(min_odds)
}

/// Potential payout for a net stake at locked odds.
pub fn payout(net_amount: Wei, odds: u64) -> Wei {
    net_amount * odds as u128 / ODDS_SCALE
}

/// Largest gross bet on a number whose payout still fits under the
/// liability limit.
///
/// Solved in closed form from the quote (the quote only depends on the
/// post-trade exposure through the admission check, so the spot odds are
/// the odds the bet would lock):
///
///   headroom  = liability_limit - exposure
///   net_max   = headroom * 100 / odds
///   gross_max = net_max * 10_000 / (10_000 - total fee bps)
///
/// The final scans absorb flooring slack in the fee and payout divisions,
/// which can put the closed-form candidate a few wei off the exact
/// boundary in either direction. Both scans are bounded by that slack (at
/// most a couple hundred wei at 100x odds).
pub fn max_bet(
    initial_odds: u64,
    min_odds: u64,
    liability_limit: Wei,
    exposure: Wei,
    creator_fee_bps: u32,
    protocol_fee_bps: u32,
) -> Wei {
    if exposure >= liability_limit {
        return 0;
    }
    let headroom = liability_limit - exposure;
    let odds = quote_odds(initial_odds, min_odds, liability_limit, exposure);
    if odds == 0 {
        return 0;
    }
    let total_fee_bps = creator_fee_bps as u128 + protocol_fee_bps as u128;
    if total_fee_bps >= BPS_SCALE {
        return 0;
    }
    let net_max = headroom * ODDS_SCALE / odds as u128;
    let mut gross = net_max * BPS_SCALE / (BPS_SCALE - total_fee_bps);
    while gross > 0 {
        let split = split_fees(gross, creator_fee_bps, protocol_fee_bps);
        if payout(split.net_amount, odds) <= headroom {
            break;
        }
        gross -= 1;
    }
    // Flooring in the payout can leave a wei or two of slack above the
    // closed-form candidate; walk up so the returned bound is exact
    loop {
        let split = split_fees(gross + 1, creator_fee_bps, protocol_fee_bps);
        if payout(split.net_amount, odds) <= headroom {
            gross += 1;
        } else {
            break;
        }
    }
    gross
}

#[cfg(test)]
mod tests {
    use super::*;

    const ETH: Wei = 1_000_000_000_000_000_000;

    #[test]
    fn test_fresh_number_quotes_initial_odds() {
        assert_eq!(quote_odds(10_000, 110, ETH, 0), 10_000);
    }

    #[test]
    fn test_odds_sink_linearly_with_exposure() {
        // Half the limit consumed -> half the initial odds
        assert_eq!(quote_odds(10_000, 110, ETH, ETH / 2), 5_000);
        // 95% consumed -> 5x, still above the 1.1x floor
        assert_eq!(quote_odds(10_000, 110, ETH, ETH / 100 * 95), 500);
    }

    #[test]
    fn test_odds_floor_at_min() {
        // 99.5% consumed would quote 0.5x raw; floor wins
        assert_eq!(quote_odds(10_000, 110, ETH, ETH / 1000 * 995), 110);
        assert_eq!(quote_odds(10_000, 110, ETH, ETH), 110);
        assert_eq!(quote_odds(10_000, 110, ETH, 2 * ETH), 110);
    }

    #[test]
    fn test_odds_monotone_nonincreasing() {
        let mut last = u64::MAX;
        for step in 0..=20u128 {
            let odds = quote_odds(10_000, 110, ETH, ETH / 20 * step);
            assert!(odds <= last, "odds rose from {} to {} at step {}", last, odds, step);
            last = odds;
        }
    }

    #[test]
    fn test_fee_split_conserves_gross() {
        for gross in [1u128, 3, 10_000_000_000_000_000, ETH, ETH + 7] {
            let split = split_fees(gross, 500, 25);
            assert_eq!(split.creator_fee + split.protocol_fee + split.net_amount, gross);
        }
    }

    #[test]
    fn test_fee_split_exact_amounts() {
        // 0.01 ETH at 5% / 0.25%
        let split = split_fees(ETH / 100, 500, 25);
        assert_eq!(split.creator_fee, ETH / 2000); // 0.0005 ETH
        assert_eq!(split.protocol_fee, ETH / 40_000); // 0.000025 ETH
    }

    #[test]
    fn test_payout_scaling() {
        // 1.10x on 1 ETH net
        assert_eq!(payout(ETH, 110), ETH / 100 * 110);
        // 100x on 0.001 ETH net
        assert_eq!(payout(ETH / 1000, 10_000), ETH / 10);
    }

    #[test]
    fn test_max_bet_fits_and_boundary_is_tight() {
        let limit = ETH;
        let gross = max_bet(10_000, 110, limit, 0, 500, 25);
        assert!(gross > 0);

        let odds = quote_odds(10_000, 110, limit, 0);
        let split = split_fees(gross, 500, 25);
        assert!(payout(split.net_amount, odds) <= limit);

        // One wei more must overshoot the headroom
        let split_over = split_fees(gross + 1, 500, 25);
        assert!(payout(split_over.net_amount, odds) > limit);
    }

    #[test]
    fn test_max_bet_zero_when_limit_consumed() {
        assert_eq!(max_bet(10_000, 110, ETH, ETH, 500, 25), 0);
    }
}
