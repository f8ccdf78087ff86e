//! Outcome valuation model.
//!
//! Turns one outcome (quantity, unit value and the deadweight / attribution /
//! displacement / drop-off percentages) into a year-by-year stream of
//! adjusted, discounted values. All math in `rust_decimal::Decimal`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::SroiError;
use crate::time_value::{compound, saturate};
use crate::types::{
    checked_total, clamp_percent, out_of_range, percent_to_rate, with_metadata,
    ComputationOutput, Money, Percent, Rate, MAX_PROJECTION_YEARS,
};
use crate::SroiResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

fn default_duration() -> u32 {
    1
}

/// One unit of measurable change attributed to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Display name of the outcome
    #[serde(default)]
    pub name: String,
    /// Stakeholder group experiencing the outcome
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stakeholder: Option<String>,
    /// How the outcome is measured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator: Option<String>,
    /// Number of affected units
    #[serde(default)]
    pub quantity: Decimal,
    /// Monetary value per unit before adjustment (financial proxy)
    #[serde(default)]
    pub unit_value: Money,
    /// Share that would have happened anyway
    #[serde(default)]
    pub deadweight: Percent,
    /// Share caused by other actors
    #[serde(default)]
    pub attribution: Percent,
    /// Share that merely displaces another outcome
    #[serde(default)]
    pub displacement: Percent,
    /// Year-over-year decay of the benefit
    #[serde(default)]
    pub dropoff: Percent,
    /// Years the outcome persists
    #[serde(default = "default_duration")]
    pub duration: u32,
}

impl Default for Outcome {
    fn default() -> Self {
        Outcome {
            name: String::new(),
            stakeholder: None,
            indicator: None,
            quantity: Decimal::ZERO,
            unit_value: Decimal::ZERO,
            deadweight: Decimal::ZERO,
            attribution: Decimal::ZERO,
            displacement: Decimal::ZERO,
            dropoff: Decimal::ZERO,
            duration: default_duration(),
        }
    }
}

impl Outcome {
    /// `quantity * unit_value`, saturating at the `Decimal` bounds.
    pub fn initial_value(&self) -> Money {
        self.checked_initial_value().unwrap_or_else(|| {
            let negative = self.quantity.is_sign_negative() != self.unit_value.is_sign_negative();
            saturate(if negative { -Decimal::ONE } else { Decimal::ONE })
        })
    }

    /// `quantity * unit_value`, or `None` when the product overflows.
    pub fn checked_initial_value(&self) -> Option<Money> {
        self.quantity.checked_mul(self.unit_value)
    }

    /// Share of value retained after deadweight, attribution and displacement.
    pub fn adjustment_factor(&self) -> Rate {
        retained(self.deadweight) * retained(self.attribution) * retained(self.displacement)
    }

    /// Initial value after the three adjustment factors, before drop-off.
    pub fn net_value(&self) -> Money {
        self.initial_value() * self.adjustment_factor()
    }

    /// Share of the benefit carried from one year to the next.
    pub fn retention(&self) -> Rate {
        retained(self.dropoff)
    }

    /// Drop-off decay for `year` (1-based): `(1 - dropoff)^(year - 1)`.
    pub fn dropoff_factor(&self, year: u32) -> Rate {
        let retention = self.retention();
        (1..year.max(1)).fold(Decimal::ONE, |acc, _| acc * retention)
    }

    /// Years the outcome is valued over; a zero duration counts as one year.
    pub fn effective_duration(&self) -> u32 {
        self.duration.max(1)
    }

    /// Names of percentage fields that fall outside [0, 100] and get clamped.
    pub fn out_of_range_percentages(&self) -> Vec<&'static str> {
        [
            ("deadweight", self.deadweight),
            ("attribution", self.attribution),
            ("displacement", self.displacement),
            ("dropoff", self.dropoff),
        ]
        .into_iter()
        .filter(|(_, pct)| clamp_percent(*pct) != *pct)
        .map(|(name, _)| name)
        .collect()
    }
}

fn retained(pct: Percent) -> Rate {
    Decimal::ONE - percent_to_rate(clamp_percent(pct))
}

/// One year of an outcome's value stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearValue {
    /// Projection year (1-based)
    pub year: u32,
    /// `(1 - dropoff)^(year - 1)`
    pub dropoff_factor: Rate,
    /// Undiscounted value after adjustments and drop-off
    pub adjusted_value: Money,
    /// `(1 + discount_rate)^year`
    pub discount_factor: Decimal,
    /// `adjusted_value / discount_factor`
    pub present_value: Money,
}

/// Valuation of a single outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stakeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicator: Option<String>,
    /// `quantity * unit_value`
    pub initial_value: Money,
    /// Initial value after deadweight, attribution and displacement
    pub net_value: Money,
    /// Sum of the discounted stream
    pub present_value: Money,
    /// Year-by-year breakdown
    pub stream: Vec<YearValue>,
}

/// Lazily evaluated present-value stream of one outcome.
///
/// Cloning yields an independent stream positioned at the same year, so a
/// fresh call to [`present_value_stream`] (or a clone taken before iterating)
/// always replays identical values.
#[derive(Debug, Clone)]
pub struct PresentValueStream {
    net_value: Money,
    retention: Rate,
    rate: Rate,
    duration: u32,
    year: u32,
    dropoff_factor: Rate,
    discount_factor: Decimal,
}

impl Iterator for PresentValueStream {
    type Item = YearValue;

    fn next(&mut self) -> Option<YearValue> {
        if self.year >= self.duration {
            return None;
        }
        self.year += 1;
        if self.year > 1 {
            self.dropoff_factor *= self.retention;
        }
        self.discount_factor = compound(self.discount_factor, self.rate);

        let adjusted_value = self.net_value * self.dropoff_factor;
        let present_value = if adjusted_value.is_zero() {
            Decimal::ZERO
        } else {
            adjusted_value
                .checked_div(self.discount_factor)
                .unwrap_or_else(|| saturate(adjusted_value))
        };

        Some(YearValue {
            year: self.year,
            dropoff_factor: self.dropoff_factor,
            adjusted_value,
            discount_factor: self.discount_factor,
            present_value,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.duration - self.year) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PresentValueStream {}

/// One outcome plus the discount rate to value it at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeValuationInput {
    pub outcome: Outcome,
    /// Annual discount rate as a percentage
    #[serde(default)]
    pub discount_rate: Percent,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Stream of `(year, present value)` for years `1..=duration`.
///
/// `discount_rate` is a percentage (3 = 3%) and must exceed -100. The
/// duration may not exceed [`MAX_PROJECTION_YEARS`] and `quantity *
/// unit_value` must fit in a `Decimal`. A year whose discounted value does
/// not fit saturates.
pub fn present_value_stream(
    outcome: &Outcome,
    discount_rate: Percent,
) -> SroiResult<PresentValueStream> {
    if discount_rate <= dec!(-100) {
        return Err(SroiError::InvalidInput {
            field: "discount_rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    if outcome.duration > MAX_PROJECTION_YEARS {
        return Err(SroiError::InvalidInput {
            field: "duration".into(),
            reason: format!("Duration may not exceed {MAX_PROJECTION_YEARS} years"),
        });
    }
    if outcome.checked_initial_value().is_none() {
        return Err(out_of_range("quantity * unit_value"));
    }

    Ok(PresentValueStream {
        net_value: outcome.net_value(),
        retention: outcome.retention(),
        rate: percent_to_rate(discount_rate),
        duration: outcome.effective_duration(),
        year: 0,
        dropoff_factor: Decimal::ONE,
        discount_factor: Decimal::ONE,
    })
}

/// Value one outcome: initial, net and present value plus the full stream.
pub fn value_outcome(outcome: &Outcome, discount_rate: Percent) -> SroiResult<ValuationResult> {
    let stream: Vec<YearValue> = present_value_stream(outcome, discount_rate)?.collect();
    let present_value = checked_total(stream.iter().map(|y| y.present_value), "present_value")?;

    Ok(ValuationResult {
        name: outcome.name.clone(),
        stakeholder: outcome.stakeholder.clone(),
        indicator: outcome.indicator.clone(),
        initial_value: outcome.initial_value(),
        net_value: outcome.net_value(),
        present_value,
        stream,
    })
}

/// [`value_outcome`] wrapped in the standard output envelope.
pub fn calculate_outcome_value(
    input: &OutcomeValuationInput,
) -> SroiResult<ComputationOutput<ValuationResult>> {
    let start = Instant::now();
    let warnings: Vec<String> = input
        .outcome
        .out_of_range_percentages()
        .into_iter()
        .map(|field| format!("{field} outside [0, 100] was clamped"))
        .collect();

    let result = value_outcome(&input.outcome, input.discount_rate)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Outcome present value (adjusted, drop-off decayed, discounted)",
        input,
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
