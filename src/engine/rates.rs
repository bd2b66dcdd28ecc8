//! Land-type rate schedules.
//!
//! Employees and investors price the same land label differently, so each
//! audience gets its own named `RateTable` and the two are never merged.

use super::ConversionError;
use crate::domain::{Decimal, LandType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// The named rate schedules the service knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSchedule {
    /// Bonus and payment conversion for employees.
    Employee,
    /// Multi-type investment allocation.
    Investor,
}

impl std::fmt::Display for RateSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateSchedule::Employee => write!(f, "employee"),
            RateSchedule::Investor => write!(f, "investor"),
        }
    }
}

impl FromStr for RateSchedule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "employee" => Ok(RateSchedule::Employee),
            "investor" => Ok(RateSchedule::Investor),
            other => Err(format!("must be employee or investor, got {}", other)),
        }
    }
}

/// Conversion rate for one land type.
///
/// `unit_price` and `min_ticket` are derived once on construction, so a rate
/// that exists can always quote them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LandTypeRate {
    land_type: LandType,
    multiplier: Decimal,
    unit_value: Decimal,
    min_units: u32,
    unit_price: Decimal,
    min_ticket: Decimal,
}

impl LandTypeRate {
    /// # Errors
    /// `InvalidRate` unless `multiplier >= 1` and `unit_value > 0`, or when
    /// the minimum ticket does not fit in a decimal.
    pub fn new(
        land_type: LandType,
        multiplier: Decimal,
        unit_value: Decimal,
        min_units: u32,
    ) -> Result<Self, ConversionError> {
        if multiplier < Decimal::one() {
            return Err(ConversionError::InvalidRate(format!(
                "{} multiplier must be at least 1, got {}",
                land_type, multiplier
            )));
        }
        if !unit_value.is_positive() {
            return Err(ConversionError::InvalidRate(format!(
                "{} unit value must be positive, got {}",
                land_type, unit_value
            )));
        }
        let out_of_range =
            || ConversionError::InvalidRate(format!("{} rate is out of range", land_type));
        let unit_price = unit_value.checked_div(multiplier).ok_or_else(out_of_range)?;
        let min_ticket = Decimal::from(min_units)
            .checked_mul(unit_value)
            .and_then(|v| v.checked_div(multiplier))
            .ok_or_else(out_of_range)?;
        Ok(Self {
            land_type,
            multiplier,
            unit_value,
            min_units,
            unit_price,
            min_ticket,
        })
    }

    /// Built-in rows. Each `unit_value` is a multiple of its `multiplier`.
    fn fixed(land_type: LandType, multiplier: i64, unit_value: i64, min_units: u32) -> Self {
        let unit_price = unit_value / multiplier;
        Self {
            land_type,
            multiplier: Decimal::from_i64(multiplier),
            unit_value: Decimal::from_i64(unit_value),
            min_units,
            unit_price: Decimal::from_i64(unit_price),
            min_ticket: Decimal::from_i64(i64::from(min_units) * unit_price),
        }
    }

    pub fn land_type(&self) -> LandType {
        self.land_type
    }

    pub fn multiplier(&self) -> Decimal {
        self.multiplier
    }

    pub fn unit_value(&self) -> Decimal {
        self.unit_value
    }

    pub fn min_units(&self) -> u32 {
        self.min_units
    }

    /// Cash that buys exactly `min_units` units.
    pub fn min_ticket(&self) -> Decimal {
        self.min_ticket
    }

    /// Cash that buys one whole unit.
    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    /// Whole-currency cost of `units`, rounded down.
    ///
    /// # Errors
    /// `InvalidAmount` when the cost does not fit in a decimal.
    pub fn investment_for_units(&self, units: Decimal) -> Result<Decimal, ConversionError> {
        units
            .checked_mul(self.unit_value)
            .and_then(|v| v.checked_div(self.multiplier))
            .map(|v| v.floor())
            .ok_or_else(|| {
                ConversionError::InvalidAmount(format!(
                    "{} units of {} is too large to price",
                    units, self.land_type
                ))
            })
    }

    /// True when `units` is a positive request smaller than the minimum.
    pub fn is_below_minimum(&self, units: Decimal) -> bool {
        units.is_positive() && units < Decimal::from(self.min_units)
    }
}

/// A named, immutable set of land-type rates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateTable {
    name: String,
    rates: BTreeMap<LandType, LandTypeRate>,
}

impl RateTable {
    /// Employee bonus/payment schedule: 2x multiplier, 2000 land value per square.
    pub fn employee() -> Self {
        Self::from_rates(
            RateSchedule::Employee.to_string(),
            [
                LandTypeRate::fixed(LandType::JunglePlot, 2, 2000, 1),
                LandTypeRate::fixed(LandType::Forest, 2, 2000, 1),
                LandTypeRate::fixed(LandType::Tree, 2, 2000, 1),
            ],
        )
    }

    /// Investor schedule. Jungle plots cost 1000 cash per unit with a
    /// 25-unit minimum ticket; flathouses are priced per whole unit.
    pub fn investor() -> Self {
        Self::from_rates(
            RateSchedule::Investor.to_string(),
            [
                LandTypeRate::fixed(LandType::JunglePlot, 2, 2000, 25),
                LandTypeRate::fixed(LandType::Flathouse, 1, 150_000, 1),
                LandTypeRate::fixed(LandType::FlathouseMini, 1, 100_000, 1),
            ],
        )
    }

    /// Build a table from validated rates. A later rate for the same land
    /// type replaces an earlier one.
    pub fn from_rates(
        name: impl Into<String>,
        rates: impl IntoIterator<Item = LandTypeRate>,
    ) -> Self {
        Self {
            name: name.into(),
            rates: rates.into_iter().map(|r| (r.land_type, r)).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// # Errors
    /// `UnknownLandType` if this schedule does not price `land_type`.
    pub fn lookup(&self, land_type: LandType) -> Result<LandTypeRate, ConversionError> {
        self.rates.get(&land_type).copied().ok_or_else(|| {
            ConversionError::UnknownLandType(format!(
                "{} is not priced by the {} schedule",
                land_type, self.name
            ))
        })
    }

    pub fn land_types(&self) -> impl Iterator<Item = LandType> + '_ {
        self.rates.keys().copied()
    }

    pub fn rates(&self) -> impl Iterator<Item = &LandTypeRate> {
        self.rates.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_employee_jungle_plot_rate() {
        let rate = RateTable::employee().lookup(LandType::JunglePlot).unwrap();
        assert_eq!(rate.multiplier(), d("2"));
        assert_eq!(rate.unit_value(), d("2000"));
        assert_eq!(rate.min_units(), 1);
        assert_eq!(rate.min_ticket(), d("1000"));
    }

    #[test]
    fn test_investor_jungle_plot_rate_differs_from_employee() {
        let employee = RateTable::employee().lookup(LandType::JunglePlot).unwrap();
        let investor = RateTable::investor().lookup(LandType::JunglePlot).unwrap();
        assert_ne!(employee, investor);
        assert_eq!(investor.min_units(), 25);
        assert_eq!(investor.unit_price(), d("1000"));
        assert_eq!(investor.min_ticket(), d("25000"));
    }

    #[test]
    fn test_flathouse_rates() {
        let table = RateTable::investor();
        let flathouse = table.lookup(LandType::Flathouse).unwrap();
        let mini = table.lookup(LandType::FlathouseMini).unwrap();
        assert_eq!(flathouse.min_ticket(), d("150000"));
        assert_eq!(mini.min_ticket(), d("100000"));
        assert_eq!(flathouse.multiplier(), d("1"));
    }

    #[test]
    fn test_lookup_unknown_land_type() {
        let err = RateTable::investor().lookup(LandType::Forest).unwrap_err();
        assert!(matches!(err, ConversionError::UnknownLandType(_)));

        let err = RateTable::employee().lookup(LandType::House).unwrap_err();
        assert!(matches!(err, ConversionError::UnknownLandType(_)));
    }

    #[test]
    fn test_rate_validation() {
        assert!(LandTypeRate::new(LandType::Tree, d("0.5"), d("2000"), 1).is_err());
        assert!(LandTypeRate::new(LandType::Tree, d("2"), d("0"), 1).is_err());
        assert!(LandTypeRate::new(LandType::Tree, d("1"), d("1"), 0).is_ok());
        assert!(matches!(
            LandTypeRate::new(
                LandType::Tree,
                d("1"),
                d("79228162514264337593543950335"),
                2
            ),
            Err(ConversionError::InvalidRate(_))
        ));
    }

    #[test]
    fn test_built_in_rows_match_validated_rates() {
        for table in [RateTable::employee(), RateTable::investor()] {
            for rate in table.rates() {
                let checked = LandTypeRate::new(
                    rate.land_type(),
                    rate.multiplier(),
                    rate.unit_value(),
                    rate.min_units(),
                )
                .unwrap();
                assert_eq!(*rate, checked);
            }
        }
    }

    #[test]
    fn test_investment_for_units_floors() {
        let rate = LandTypeRate::new(LandType::Tree, d("3"), d("1000"), 1).unwrap();
        // 1000 / 3 = 333.33...
        assert_eq!(rate.investment_for_units(d("1")).unwrap(), d("333"));
    }

    #[test]
    fn test_investment_for_huge_units_is_an_error() {
        let rate = RateTable::investor().lookup(LandType::Flathouse).unwrap();
        let err = rate
            .investment_for_units(d("1000000000000000000000000"))
            .unwrap_err();
        assert!(matches!(err, ConversionError::InvalidAmount(_)));
    }

    #[test]
    fn test_is_below_minimum() {
        let rate = RateTable::investor().lookup(LandType::JunglePlot).unwrap();
        assert!(rate.is_below_minimum(d("24")));
        assert!(rate.is_below_minimum(d("24.9")));
        assert!(!rate.is_below_minimum(d("25")));
        assert!(!rate.is_below_minimum(d("0")));
    }

    #[test]
    fn test_schedule_parse() {
        assert_eq!("Investor".parse::<RateSchedule>(), Ok(RateSchedule::Investor));
        assert!("partner".parse::<RateSchedule>().is_err());
    }
}
