//! Cash ↔ land unit conversion.

use super::{ConversionError, LandTypeRate, RateTable};
use crate::domain::{Decimal, LandType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// How cash conversions treat partial units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Units are floored; the leftover value stays as cash.
    #[default]
    WholeUnitsOnly,
    /// The whole amount converts, producing fractional units.
    FractionalUnitsAllowed,
}

impl FromStr for RoundingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whole" | "whole_units_only" => Ok(RoundingPolicy::WholeUnitsOnly),
            "fractional" | "fractional_units_allowed" => {
                Ok(RoundingPolicy::FractionalUnitsAllowed)
            }
            other => Err(format!("must be whole or fractional, got {}", other)),
        }
    }
}

/// Outcome of a single conversion. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub land_type: LandType,
    /// Cash consumed by the conversion.
    pub investment_required: Decimal,
    pub land_value: Decimal,
    pub units: Decimal,
    pub whole_units: Decimal,
    pub fractional_units: Decimal,
    /// Land value that did not make up a whole unit.
    pub remaining_value: Decimal,
    /// `remaining_value` expressed back in cash.
    pub remaining_cash: Decimal,
}

/// Per-land-type line of an [`AllocationSummary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationLine {
    pub land_type: LandType,
    pub units: Decimal,
    pub investment_required: Decimal,
    pub land_value: Decimal,
    pub whole_units: Decimal,
    pub fractional_units: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationSummary {
    pub breakdown: BTreeMap<LandType, AllocationLine>,
    pub total_invested: Decimal,
    pub total_land_value: Decimal,
    pub total_units: Decimal,
}

impl AllocationSummary {
    pub fn is_empty(&self) -> bool {
        self.breakdown.is_empty()
    }
}

/// Stateless calculator; the rounding policy only affects cash-driven
/// conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConversionCalculator {
    policy: RoundingPolicy,
}

impl ConversionCalculator {
    pub fn new(policy: RoundingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RoundingPolicy {
        self.policy
    }

    /// Convert a cash amount into land units.
    ///
    /// # Errors
    /// `InvalidAmount` for negative amounts or amounts too large to convert,
    /// `UnknownLandType` if the table does not price `land_type`.
    pub fn calculate_from_cash(
        &self,
        amount: Decimal,
        land_type: LandType,
        rates: &RateTable,
    ) -> Result<ConversionResult, ConversionError> {
        if amount.is_negative() {
            return Err(ConversionError::InvalidAmount(format!(
                "cash amount must not be negative, got {}",
                amount
            )));
        }
        let rate = rates.lookup(land_type)?;
        let too_large = || {
            ConversionError::InvalidAmount(format!("{} is too large to convert", amount))
        };
        let land_value = amount.checked_mul(rate.multiplier()).ok_or_else(too_large)?;
        let exact_units = land_value
            .checked_div(rate.unit_value())
            .ok_or_else(too_large)?;

        let result = match self.policy {
            RoundingPolicy::WholeUnitsOnly => {
                let units = exact_units.floor();
                let remaining_value = land_value
                    .checked_rem(rate.unit_value())
                    .ok_or_else(too_large)?;
                let remaining_cash = remaining_value
                    .checked_div(rate.multiplier())
                    .ok_or_else(too_large)?;
                ConversionResult {
                    land_type,
                    investment_required: rate.investment_for_units(units)?,
                    land_value,
                    units,
                    whole_units: units,
                    fractional_units: Decimal::zero(),
                    remaining_value,
                    remaining_cash,
                }
            }
            RoundingPolicy::FractionalUnitsAllowed => ConversionResult {
                land_type,
                investment_required: amount,
                land_value,
                units: exact_units,
                whole_units: exact_units.floor(),
                fractional_units: exact_units.fract(),
                remaining_value: Decimal::zero(),
                remaining_cash: Decimal::zero(),
            },
        };
        Ok(result)
    }

    /// Reject a cash conversion that would not credit anything.
    ///
    /// Under `WholeUnitsOnly` at least one whole unit is required, under
    /// `FractionalUnitsAllowed` any positive amount of units. Both quote the
    /// price of one unit, `unit_value / multiplier`.
    pub fn ensure_convertible(
        &self,
        result: &ConversionResult,
        rate: &LandTypeRate,
    ) -> Result<(), ConversionError> {
        let credited = match self.policy {
            RoundingPolicy::WholeUnitsOnly => result.whole_units >= Decimal::one(),
            RoundingPolicy::FractionalUnitsAllowed => result.units.is_positive(),
        };
        if credited {
            return Ok(());
        }
        Err(ConversionError::BelowMinimum {
            land_type: result.land_type,
            min_units: 1,
            min_amount: rate.unit_price(),
        })
    }

    /// Price a unit count. Cost is floored to whole currency and
    /// `land_value` follows from the floored cost.
    pub fn calculate_from_units(
        &self,
        units: Decimal,
        land_type: LandType,
        rates: &RateTable,
    ) -> Result<ConversionResult, ConversionError> {
        if units.is_negative() {
            return Err(ConversionError::InvalidAmount(format!(
                "units must not be negative, got {}",
                units
            )));
        }
        let rate = rates.lookup(land_type)?;
        let investment_required = rate.investment_for_units(units)?;
        let land_value = investment_required
            .checked_mul(rate.multiplier())
            .ok_or_else(|| {
                ConversionError::InvalidAmount(format!("{} units is too large to price", units))
            })?;
        Ok(ConversionResult {
            land_type,
            investment_required,
            land_value,
            units,
            whole_units: units.floor(),
            fractional_units: units.fract(),
            remaining_value: Decimal::zero(),
            remaining_cash: Decimal::zero(),
        })
    }

    /// Aggregate unit allocations across land types.
    ///
    /// Zero entries are skipped and repeated land types fold into one line,
    /// so the totals do not depend on iteration order.
    pub fn summarize<I>(
        &self,
        entries: I,
        rates: &RateTable,
    ) -> Result<AllocationSummary, ConversionError>
    where
        I: IntoIterator<Item = (LandType, Decimal)>,
    {
        let mut summary = AllocationSummary::default();
        for (land_type, units) in entries {
            if units.is_zero() {
                continue;
            }
            let calc = self.calculate_from_units(units, land_type, rates)?;

            let line = summary
                .breakdown
                .entry(land_type)
                .or_insert(AllocationLine {
                    land_type,
                    units: Decimal::zero(),
                    investment_required: Decimal::zero(),
                    land_value: Decimal::zero(),
                    whole_units: Decimal::zero(),
                    fractional_units: Decimal::zero(),
                });
            line.units = add(line.units, calc.units)?;
            line.investment_required = add(line.investment_required, calc.investment_required)?;
            line.land_value = add(line.land_value, calc.land_value)?;
            line.whole_units = line.units.floor();
            line.fractional_units = line.units.fract();

            summary.total_invested = add(summary.total_invested, calc.investment_required)?;
            summary.total_land_value = add(summary.total_land_value, calc.land_value)?;
            summary.total_units = add(summary.total_units, calc.units)?;
        }
        Ok(summary)
    }
}

fn add(a: Decimal, b: Decimal) -> Result<Decimal, ConversionError> {
    a.checked_add(b)
        .ok_or_else(|| ConversionError::InvalidAmount("allocation total is too large".to_string()))
}
