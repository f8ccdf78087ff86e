use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::SroiError;
use crate::types::{Money, Rate};
use crate::SroiResult;

const MAX_BISECTION_ITERATIONS: u32 = 100;

/// Compounded discount factor `(1 + rate)^year`.
///
/// Saturates at `Decimal::MAX` instead of overflowing; anything divided by a
/// saturated factor is indistinguishable from zero at 28 digits anyway.
pub fn discount_factor(rate: Rate, year: u32) -> Decimal {
    let mut factor = Decimal::ONE;
    if rate.is_zero() {
        return factor;
    }
    for _ in 0..year {
        factor = compound(factor, rate);
        if factor.is_zero() || factor == Decimal::MAX {
            break;
        }
    }
    factor
}

/// One more year of compounding: `factor * (1 + rate)`, saturating.
pub fn compound(factor: Decimal, rate: Rate) -> Decimal {
    Decimal::ONE
        .checked_add(rate)
        .and_then(|growth| growth.checked_mul(factor))
        .unwrap_or(Decimal::MAX)
}

/// Net Present Value of a series of cash flows (index 0 = time zero)
pub fn npv(rate: Rate, cash_flows: &[Money]) -> SroiResult<Money> {
    if rate <= dec!(-1) {
        return Err(SroiError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    Ok(npv_saturating(rate, cash_flows))
}

/// Internal Rate of Return by bisection over `[lower, upper]`.
///
/// Assumes NPV is monotonic in the rate over the interval, which holds for a
/// single sign change (one outflow followed by non-negative inflows). Stops
/// once the bracket is narrower than `tolerance` and returns its midpoint.
pub fn irr_bisection(
    cash_flows: &[Money],
    lower: Rate,
    upper: Rate,
    tolerance: Rate,
) -> SroiResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(SroiError::InvalidInput {
            field: "cash_flows".into(),
            reason: "IRR requires at least 2 cash flows".into(),
        });
    }
    if lower <= dec!(-1) || lower >= upper {
        return Err(SroiError::InvalidInput {
            field: "bracket".into(),
            reason: format!("IRR bracket [{lower}, {upper}] must be ordered and above -100%"),
        });
    }
    if tolerance <= Decimal::ZERO {
        return Err(SroiError::InvalidInput {
            field: "tolerance".into(),
            reason: "Tolerance must be positive".into(),
        });
    }

    let mut lo = lower;
    let mut hi = upper;
    let mut npv_lo = npv_saturating(lo, cash_flows);
    let npv_hi = npv_saturating(hi, cash_flows);

    if npv_lo.is_zero() {
        return Ok(lo);
    }
    if npv_hi.is_zero() {
        return Ok(hi);
    }
    if npv_lo.is_sign_negative() == npv_hi.is_sign_negative() {
        return Err(SroiError::ConvergenceFailure {
            function: "IRR (bisection)".into(),
            iterations: 0,
            last_delta: npv_lo.abs().min(npv_hi.abs()),
        });
    }

    for _ in 0..MAX_BISECTION_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        if hi - lo < tolerance {
            return Ok(mid);
        }

        let npv_mid = npv_saturating(mid, cash_flows);
        if npv_mid.is_zero() {
            return Ok(mid);
        }

        if npv_mid.is_sign_negative() == npv_lo.is_sign_negative() {
            lo = mid;
            npv_lo = npv_mid;
        } else {
            hi = mid;
        }
    }

    Err(SroiError::ConvergenceFailure {
        function: "IRR (bisection)".into(),
        iterations: MAX_BISECTION_ITERATIONS,
        last_delta: hi - lo,
    })
}

/// NPV that never panics: overflowing terms saturate at `Decimal::MAX`/`MIN`.
fn npv_saturating(rate: Rate, cash_flows: &[Money]) -> Money {
    let mut discount = Decimal::ONE;
    let mut result = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = compound(discount, rate);
        }
        let pv = if cf.is_zero() {
            Decimal::ZERO
        } else if discount.is_zero() {
            saturate(*cf)
        } else {
            cf.checked_div(discount).unwrap_or_else(|| saturate(*cf))
        };
        result = result.checked_add(pv).unwrap_or_else(|| saturate(pv));
    }

    result
}

/// `Decimal::MAX` or `Decimal::MIN` with the sign of `value`.
pub(crate) fn saturate(value: Decimal) -> Decimal {
    if value.is_zero() {
        Decimal::ZERO
    } else if value.is_sign_negative() {
        Decimal::MIN
    } else {
        Decimal::MAX
    }
}
