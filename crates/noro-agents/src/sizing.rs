//! Stake sizing: direction from probability, magnitude from one of two policies,
//! then a policy-independent cap.

use noro_models::{SizingPolicy, TradeAction, TradeProposal};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Share of full Kelly actually staked.
pub const KELLY_FRACTION: f64 = 0.25;

/// Hard cap on any stake as a share of bankroll.
pub const MAX_STAKE_FRACTION: Decimal = Decimal::from_parts(10, 0, 0, false, 2);
const MAX_STAKE_FRACTION_F64: f64 = 0.10;

fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Largest stake allowed for `bankroll`, rounded down to the cent so it never
/// exceeds the exact fraction.
pub fn max_stake(bankroll: Decimal) -> Decimal {
    (bankroll.max(Decimal::ZERO) * MAX_STAKE_FRACTION)
        .round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

/// Clamp `amount` into `[0, max_stake(bankroll)]`.
pub fn cap_stake(amount: Decimal, bankroll: Decimal) -> Decimal {
    amount.max(Decimal::ZERO).min(max_stake(bankroll))
}

/// Quarter-Kelly stake on a binary outcome at `decimal_odds`.
///
/// Returns zero outside the valid domain: `probability` not strictly inside
/// `(0, 1)`, or odds at or below 1.0.
pub fn kelly_stake(probability: f64, decimal_odds: f64, bankroll: Decimal) -> Decimal {
    if probability.is_nan()
        || probability <= 0.0
        || probability >= 1.0
        || !decimal_odds.is_finite()
        || decimal_odds <= 1.0
    {
        return Decimal::ZERO;
    }

    let b = decimal_odds - 1.0;
    let q = 1.0 - probability;
    let full_kelly = (probability * b - q) / b;
    // Odds barely above 1.0 blow the raw fraction up; bound it before it
    // meets the bankroll.
    let fraction = (full_kelly * KELLY_FRACTION).clamp(0.0, MAX_STAKE_FRACTION_F64);

    let Some(fraction) = Decimal::from_f64(fraction) else {
        return Decimal::ZERO;
    };
    cap_stake(round_currency(fraction * bankroll), bankroll)
}

/// Stake proportional to how decisive the estimate is.
///
/// `|p - 0.5| * 2` and `confidence` are averaged and scale `base_stake`.
pub fn confidence_stake(probability: f64, confidence: f64, base_stake: Decimal) -> Decimal {
    let probability_signal = (probability - 0.5).abs() * 2.0;
    let combined = (probability_signal + confidence) / 2.0;
    match Decimal::from_f64(combined) {
        Some(combined) => round_currency(base_stake * combined),
        None => Decimal::ZERO,
    }
}

/// Build a capped, directional proposal.
///
/// Kelly is used only when requested and `decimal_odds` is known; otherwise
/// the confidence policy sizes against a base stake of the capped maximum.
pub fn propose(
    probability: f64,
    confidence: f64,
    bankroll: Decimal,
    policy: SizingPolicy,
    decimal_odds: Option<f64>,
) -> TradeProposal {
    let action = TradeAction::from_probability(probability);

    let (policy, raw_amount) = match (policy, decimal_odds) {
        (SizingPolicy::Kelly, Some(odds)) => {
            // Kelly sizes the side we are buying.
            let win_probability = match action {
                TradeAction::BuyYes => probability,
                TradeAction::BuyNo => 1.0 - probability,
            };
            (SizingPolicy::Kelly, kelly_stake(win_probability, odds, bankroll))
        }
        _ => (
            SizingPolicy::Confidence,
            confidence_stake(probability, confidence, max_stake(bankroll)),
        ),
    };
    let amount = cap_stake(raw_amount, bankroll);

    let reasoning = format!(
        "{} sized by {} policy: probability {:.2}%, confidence {:.2}%, stake {amount} of bankroll {bankroll}.",
        match action {
            TradeAction::BuyYes => "BUY_YES",
            TradeAction::BuyNo => "BUY_NO",
        },
        match policy {
            SizingPolicy::Kelly => "quarter-Kelly",
            SizingPolicy::Confidence => "confidence",
        },
        probability * 100.0,
        confidence * 100.0,
    );

    TradeProposal {
        action,
        amount,
        confidence,
        reasoning,
        policy,
    }
}
