//! Constant-fee swap estimates and slippage bounds.
//!
//! Every pool is assumed to charge a flat 0.3% fee. Results are floor-rounded,
//! except the exact-out input which is bumped by one unit so rounding always
//! favours the pool. Because of that bump, quoting exact-in and then feeding the
//! output back through exact-out lands one unit above the original input.

use alloy_primitives::U256;
use rust_decimal::Decimal;

use crate::address::is_contract_id;
use crate::error::{DexErrorCode, DefiError, Result};
use crate::types::{Quote, QuoteRequest, TradeType};

pub const FEE_NUMERATOR: u128 = 997;
pub const FEE_DENOMINATOR: u128 = 1000;
pub const BPS_DENOMINATOR: u32 = 10_000;
pub const DEFAULT_SLIPPAGE_BPS: u32 = 100;
pub const MAX_SLIPPAGE_BPS: u32 = BPS_DENOMINATOR;

/// Trade size at which the estimated price impact reaches 1%
/// (10,000 whole tokens at 7 decimals).
const PRICE_IMPACT_REFERENCE: u128 = 100_000_000_000;
/// 100% expressed with four decimal places.
const PRICE_IMPACT_CAP: u128 = 1_000_000;

/// `floor(a * num / den)` for `num <= den`, without overflow.
fn scale_down(a: u128, num: u128, den: u128) -> u128 {
    (a / den) * num + (a % den) * num / den
}

/// `floor(a * num / den)` in 256-bit space, `None` when it exceeds `u128`.
pub(crate) fn mul_div(a: u128, num: u128, den: u128) -> Option<u128> {
    let wide = U256::from(a) * U256::from(num) / U256::from(den);
    u128::try_from(wide).ok()
}

/// Exact-in estimate: `floor(amount_in * 997 / 1000)`.
pub fn estimate_amount_out(amount_in: u128) -> u128 {
    scale_down(amount_in, FEE_NUMERATOR, FEE_DENOMINATOR)
}

/// Exact-out estimate: `floor(amount_out * 1000 / 997) + 1`.
pub fn estimate_amount_in(amount_out: u128) -> Option<u128> {
    mul_div(amount_out, FEE_DENOMINATOR, FEE_NUMERATOR)?.checked_add(1)
}

/// Guaranteed output for an exact-in trade: `floor(amount_out * (10000 - bps) / 10000)`.
pub fn minimum_received(amount_out: u128, slippage_bps: u32) -> u128 {
    let bps = slippage_bps.min(MAX_SLIPPAGE_BPS);
    scale_down(
        amount_out,
        u128::from(BPS_DENOMINATOR - bps),
        u128::from(BPS_DENOMINATOR),
    )
}

/// Spend ceiling for an exact-out trade: `floor(amount_in * (10000 + bps) / 10000)`.
pub fn maximum_sent(amount_in: u128, slippage_bps: u32) -> Option<u128> {
    mul_div(
        amount_in,
        u128::from(BPS_DENOMINATOR + slippage_bps.min(MAX_SLIPPAGE_BPS)),
        u128::from(BPS_DENOMINATOR),
    )
}

/// Placeholder price impact in percent: linear in the trade size against a
/// fixed reference liquidity, capped at 100.
pub fn price_impact_pct(amount: u128) -> Decimal {
    let basis = (amount.saturating_mul(PRICE_IMPACT_CAP) / PRICE_IMPACT_REFERENCE).min(PRICE_IMPACT_CAP);
    Decimal::new(basis as i64, 4)
}

/// Resolve the requested tolerance, falling back to the default.
pub fn resolve_slippage(slippage_bps: Option<u32>) -> Result<u32> {
    let bps = slippage_bps.unwrap_or(DEFAULT_SLIPPAGE_BPS);
    if bps > MAX_SLIPPAGE_BPS {
        return Err(DefiError::dex(
            DexErrorCode::InvalidSlippage,
            format!("Slippage {bps} bps exceeds maximum of {MAX_SLIPPAGE_BPS} bps"),
        ));
    }
    Ok(bps)
}

/// Reject anything that is not a contract identifier, before any I/O.
pub fn validate_token_pair(token_in: &str, token_out: &str) -> Result<()> {
    for token in [token_in, token_out] {
        if !is_contract_id(token) {
            return Err(DefiError::dex(
                DexErrorCode::InvalidToken,
                format!("Invalid token address '{token}'"),
            ));
        }
    }
    if token_in == token_out {
        return Err(DefiError::dex(
            DexErrorCode::InvalidToken,
            format!("Cannot swap {token_in} for itself"),
        ));
    }
    Ok(())
}

/// Build a quote for `request` under the constant-fee assumption.
pub fn estimate(request: &QuoteRequest) -> Result<Quote> {
    validate_token_pair(&request.token_in, &request.token_out)?;
    let slippage_bps = resolve_slippage(request.slippage_bps)?;
    if request.amount == 0 {
        return Err(DefiError::dex(DexErrorCode::InvalidAmount, "Amount must be positive"));
    }

    let (amount_in, amount_out, minimum, maximum) = match request.trade_type {
        TradeType::ExactIn => {
            let out = estimate_amount_out(request.amount);
            (request.amount, out, Some(minimum_received(out, slippage_bps)), None)
        }
        TradeType::ExactOut => {
            let overflow = || {
                DefiError::dex(
                    DexErrorCode::AmountOverflow,
                    format!("Amount {} too large to quote", request.amount),
                )
            };
            let amount_in = estimate_amount_in(request.amount).ok_or_else(overflow)?;
            let max = maximum_sent(amount_in, slippage_bps).ok_or_else(overflow)?;
            (amount_in, request.amount, None, Some(max))
        }
    };

    Ok(Quote {
        token_in: request.token_in.clone(),
        token_out: request.token_out.clone(),
        amount_in,
        amount_out,
        price_impact_pct: price_impact_pct(amount_in),
        route: vec![request.token_in.clone(), request.token_out.clone()],
        trade_type: request.trade_type,
        slippage_bps,
        minimum_received: minimum,
        maximum_sent: maximum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::fixtures::{USDC, USER, XLM};

    fn request(amount: u128, trade_type: TradeType) -> QuoteRequest {
        QuoteRequest {
            token_in: XLM.into(),
            token_out: USDC.into(),
            amount,
            trade_type,
            slippage_bps: None,
        }
    }

    const SAMPLE_AMOUNTS: &[u128] = &[
        0,
        1,
        2,
        999,
        1_000,
        1_001,
        123_456_789,
        1_000_000_000,
        u64::MAX as u128,
        u128::MAX / 3,
        u128::MAX,
    ];

    #[test]
    fn test_exact_in_default_slippage() {
        let quote = estimate(&request(1_000_000_000, TradeType::ExactIn)).unwrap();
        assert_eq!(quote.amount_in, 1_000_000_000);
        assert_eq!(quote.amount_out, 997_000_000);
        assert_eq!(quote.minimum_received, Some(987_030_000));
        assert_eq!(quote.maximum_sent, None);
        assert_eq!(quote.slippage_bps, 100);
        assert_eq!(quote.route, vec![XLM.to_string(), USDC.to_string()]);
    }

    #[test]
    fn test_exact_out_default_slippage() {
        let quote = estimate(&request(997_000_000, TradeType::ExactOut)).unwrap();
        assert_eq!(quote.amount_out, 997_000_000);
        assert_eq!(quote.amount_in, 1_000_000_001);
        assert_eq!(quote.maximum_sent, Some(1_010_000_001));
        assert_eq!(quote.minimum_received, None);
    }

    #[test]
    fn test_estimates_match_formulas() {
        assert_eq!(estimate_amount_out(1_000), 997);
        assert_eq!(estimate_amount_out(1), 0);
        assert_eq!(estimate_amount_out(1_001), 997);
        assert_eq!(estimate_amount_in(997), Some(1_001));
        assert_eq!(estimate_amount_in(0), Some(1));
        assert_eq!(estimate_amount_in(u128::MAX), None);
    }

    #[test]
    fn test_slippage_bounds_hold_for_all_bps() {
        for bps in (0..=MAX_SLIPPAGE_BPS).step_by(7).chain([MAX_SLIPPAGE_BPS]) {
            for &amount in SAMPLE_AMOUNTS {
                assert!(minimum_received(amount, bps) <= amount, "min {amount} @ {bps}");
                if let Some(max) = maximum_sent(amount, bps) {
                    assert!(max >= amount, "max {amount} @ {bps}");
                }
            }
        }
    }

    #[test]
    fn test_slippage_edges() {
        assert_eq!(minimum_received(997_000_000, 0), 997_000_000);
        assert_eq!(minimum_received(997_000_000, 10_000), 0);
        assert_eq!(maximum_sent(1_000, 0), Some(1_000));
        assert_eq!(maximum_sent(1_000, 10_000), Some(2_000));
        assert_eq!(maximum_sent(u128::MAX, 1), None);
    }

    #[test]
    fn test_exact_in_then_exact_out_drifts_one_unit() {
        for amount_in in [1_000u128, 10_000, 1_000_000_000, 5_000_000_000_000] {
            let out = estimate_amount_out(amount_in);
            let back = estimate_amount_in(out).unwrap();
            assert_eq!(back, amount_in + 1, "drift for {amount_in}");
        }
    }

    #[test]
    fn test_price_impact_monotonic_and_capped() {
        let mut last = Decimal::ZERO;
        for &amount in SAMPLE_AMOUNTS {
            let impact = price_impact_pct(amount);
            assert!(impact >= last);
            assert!(impact <= Decimal::new(100, 0));
            last = impact;
        }
        assert_eq!(price_impact_pct(1_000_000_000), Decimal::new(1, 0));
        assert_eq!(price_impact_pct(u128::MAX), Decimal::new(100, 0));
    }

    #[test]
    fn test_invalid_token_rejected() {
        let mut req = request(1_000, TradeType::ExactIn);
        req.token_in = "XLM".into();
        assert_eq!(estimate(&req).unwrap_err().code(), "INVALID_TOKEN");

        let mut req = request(1_000, TradeType::ExactIn);
        req.token_out = USER.into();
        assert_eq!(estimate(&req).unwrap_err().code(), "INVALID_TOKEN");

        let mut req = request(1_000, TradeType::ExactIn);
        req.token_out = XLM.into();
        assert_eq!(estimate(&req).unwrap_err().code(), "INVALID_TOKEN");
    }

    #[test]
    fn test_rejects_zero_amount_and_excess_slippage() {
        assert_eq!(
            estimate(&request(0, TradeType::ExactIn)).unwrap_err().code(),
            "INVALID_AMOUNT"
        );
        let mut req = request(1_000, TradeType::ExactIn);
        req.slippage_bps = Some(10_001);
        assert_eq!(estimate(&req).unwrap_err().code(), "INVALID_SLIPPAGE");
    }

    #[test]
    fn test_exact_out_overflow() {
        let err = estimate(&request(u128::MAX, TradeType::ExactOut)).unwrap_err();
        assert_eq!(err.code(), "AMOUNT_OVERFLOW");
    }
}
