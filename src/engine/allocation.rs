use super::{AllocationSummary, ConversionCalculator, ConversionError, RateTable};
use crate::domain::{Decimal, LandType};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Lifecycle of one allocation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationState {
    Empty,
    PartiallyAllocated,
    FullyAllocated,
    /// Terminal; entered after the ledger accepted the allocation.
    Committed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AllocationEntry {
    units: Decimal,
    /// Priced when the entry was accepted.
    cost: Decimal,
}

/// Splits an investment budget across land types.
///
/// Every mutation is validated against the budget and the land type's
/// minimum ticket before it is applied; a rejected call leaves the tracker
/// exactly as it was. One tracker serves one session and is discarded after
/// commit.
#[derive(Debug, Clone)]
pub struct AllocationTracker {
    rates: RateTable,
    calculator: ConversionCalculator,
    budget: Decimal,
    entries: BTreeMap<LandType, AllocationEntry>,
    committed: bool,
}

impl AllocationTracker {
    /// # Errors
    /// `InvalidAmount` if `budget` is negative.
    pub fn new(rates: RateTable, budget: Decimal) -> Result<Self, ConversionError> {
        check_budget(budget)?;
        Ok(Self {
            rates,
            calculator: ConversionCalculator::default(),
            budget,
            entries: BTreeMap::new(),
            committed: false,
        })
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    pub fn budget(&self) -> Decimal {
        self.budget
    }

    /// Units currently allocated to `land_type` (zero when absent).
    pub fn units(&self, land_type: LandType) -> Decimal {
        self.entries
            .get(&land_type)
            .map(|e| e.units)
            .unwrap_or_default()
    }

    /// Non-zero allocations in land-type order.
    pub fn allocations(&self) -> impl Iterator<Item = (LandType, Decimal)> + '_ {
        self.entries.iter().map(|(t, e)| (*t, e.units))
    }

    pub fn total_allocated(&self) -> Decimal {
        self.entries.values().map(|e| e.cost).sum()
    }

    /// May be negative after the budget was lowered; see [`Self::validate`].
    pub fn remaining(&self) -> Decimal {
        self.budget - self.total_allocated()
    }

    pub fn is_fully_allocated(&self) -> bool {
        self.remaining().is_zero()
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn state(&self) -> AllocationState {
        if self.committed {
            AllocationState::Committed
        } else if self.entries.is_empty() {
            AllocationState::Empty
        } else if self.is_fully_allocated() {
            AllocationState::FullyAllocated
        } else {
            AllocationState::PartiallyAllocated
        }
    }

    /// Replace the budget. Existing entries are kept as they are.
    pub fn set_budget(&mut self, amount: Decimal) -> Result<(), ConversionError> {
        self.ensure_open()?;
        check_budget(amount)?;
        self.budget = amount;
        Ok(())
    }

    /// Check the budget invariant against the current entries.
    pub fn validate(&self) -> Result<(), ConversionError> {
        let required = self.total_allocated();
        if required > self.budget {
            return Err(ConversionError::BudgetExceeded {
                required,
                budget: self.budget,
            });
        }
        Ok(())
    }

    /// Set the unit count for `land_type`; zero removes the entry.
    ///
    /// # Errors
    /// - `BelowMinimum` if `0 < units < min_units`
    /// - `BudgetExceeded` if the new total cost would exceed the budget
    pub fn set_units(&mut self, land_type: LandType, units: Decimal) -> Result<(), ConversionError> {
        self.ensure_open()?;
        if units.is_negative() {
            return Err(ConversionError::InvalidAmount(format!(
                "units must not be negative, got {}",
                units
            )));
        }
        let rate = self.rates.lookup(land_type)?;
        if rate.is_below_minimum(units) {
            return Err(ConversionError::BelowMinimum {
                land_type,
                min_units: rate.min_units(),
                min_amount: rate.min_ticket(),
            });
        }

        let others: Decimal = self
            .entries
            .iter()
            .filter(|(t, _)| **t != land_type)
            .map(|(_, e)| e.cost)
            .sum();
        let cost = rate.investment_for_units(units)?;
        let required = others.checked_add(cost).ok_or_else(|| {
            ConversionError::InvalidAmount(format!("{} units of {} is too large", units, land_type))
        })?;
        if required > self.budget {
            return Err(ConversionError::BudgetExceeded {
                required,
                budget: self.budget,
            });
        }

        if units.is_zero() {
            self.entries.remove(&land_type);
        } else {
            self.entries.insert(land_type, AllocationEntry { units, cost });
        }
        debug!(%land_type, %units, remaining = %self.remaining(), "allocation updated");
        Ok(())
    }

    /// Spend as much of the remaining budget as possible on `land_type`.
    ///
    /// # Errors
    /// `InsufficientRemaining` if the remaining budget is below the land
    /// type's minimum ticket or cannot buy a single additional unit.
    pub fn quick_fill_remaining(&mut self, land_type: LandType) -> Result<(), ConversionError> {
        self.ensure_open()?;
        let rate = self.rates.lookup(land_type)?;
        let remaining = self.remaining();
        let max_additional = if remaining < rate.min_ticket() {
            Decimal::zero()
        } else {
            remaining
                .checked_mul(rate.multiplier())
                .and_then(|v| v.checked_div(rate.unit_value()))
                .map(|v| v.floor())
                .ok_or_else(|| {
                    ConversionError::InvalidAmount(format!(
                        "remaining budget {} is too large to fill",
                        remaining
                    ))
                })?
        };
        if max_additional.is_zero() {
            return Err(ConversionError::InsufficientRemaining {
                land_type,
                required: rate.min_ticket().max(rate.unit_price()),
                available: remaining,
            });
        }
        let units = self
            .units(land_type)
            .checked_add(max_additional)
            .ok_or_else(|| {
                ConversionError::InvalidAmount(format!("{} units is too large", max_additional))
            })?;
        self.set_units(land_type, units)
    }

    /// Clear every entry; the budget is kept.
    pub fn reset(&mut self) -> Result<(), ConversionError> {
        self.ensure_open()?;
        self.entries.clear();
        Ok(())
    }

    pub fn summary(&self) -> Result<AllocationSummary, ConversionError> {
        self.calculator.summarize(self.allocations(), &self.rates)
    }

    /// Check that the allocation can be handed to the ledger.
    ///
    /// # Errors
    /// `NothingAllocated`, `BudgetExceeded` or `UnallocatedFunds`.
    pub fn prepare_commit(&self) -> Result<AllocationSummary, ConversionError> {
        self.ensure_open()?;
        if self.entries.is_empty() {
            return Err(ConversionError::NothingAllocated);
        }
        self.validate()?;
        let remaining = self.remaining();
        if remaining.is_positive() {
            return Err(ConversionError::UnallocatedFunds { remaining });
        }
        self.summary()
    }

    /// Enter the terminal `Committed` state. Call only after the ledger
    /// accepted every line of the summary.
    pub fn mark_committed(&mut self) -> Result<AllocationSummary, ConversionError> {
        let summary = self.prepare_commit()?;
        self.committed = true;
        Ok(summary)
    }

    fn ensure_open(&self) -> Result<(), ConversionError> {
        if self.committed {
            return Err(ConversionError::AlreadyCommitted);
        }
        Ok(())
    }
}

fn check_budget(amount: Decimal) -> Result<(), ConversionError> {
    if amount.is_negative() {
        return Err(ConversionError::InvalidAmount(format!(
            "budget must not be negative, got {}",
            amount
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn tracker(budget: &str) -> AllocationTracker {
        AllocationTracker::new(RateTable::investor(), d(budget)).unwrap()
    }

    #[test]
    fn test_new_rejects_negative_budget() {
        let err = AllocationTracker::new(RateTable::investor(), d("-1")).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidAmount(_)));
    }

    #[test]
    fn test_below_minimum_rejected_without_mutation() {
        let mut t = tracker("200000");
        let err = t.set_units(LandType::JunglePlot, d("24")).unwrap_err();
        assert_eq!(
            err,
            ConversionError::BelowMinimum {
                land_type: LandType::JunglePlot,
                min_units: 25,
                min_amount: d("25000"),
            }
        );
        assert_eq!(t.units(LandType::JunglePlot), d("0"));
        assert_eq!(t.state(), AllocationState::Empty);
    }

    #[test]
    fn test_budget_exceeded_keeps_first_allocation() {
        let mut t = tracker("200000");
        t.set_units(LandType::Flathouse, d("1")).unwrap();
        assert_eq!(t.remaining(), d("50000"));

        let err = t.set_units(LandType::FlathouseMini, d("1")).unwrap_err();
        assert_eq!(
            err,
            ConversionError::BudgetExceeded {
                required: d("250000"),
                budget: d("200000"),
            }
        );
        assert_eq!(t.units(LandType::Flathouse), d("1"));
        assert_eq!(t.units(LandType::FlathouseMini), d("0"));
        assert_eq!(t.total_allocated(), d("150000"));
    }

    #[test]
    fn test_replacing_entry_uses_new_cost() {
        let mut t = tracker("100000");
        t.set_units(LandType::JunglePlot, d("100")).unwrap();
        assert!(t.is_fully_allocated());
        // Lowering the same entry frees budget rather than adding to it.
        t.set_units(LandType::JunglePlot, d("30")).unwrap();
        assert_eq!(t.remaining(), d("70000"));
    }

    #[test]
    fn test_zero_units_removes_entry() {
        let mut t = tracker("200000");
        t.set_units(LandType::Flathouse, d("1")).unwrap();
        t.set_units(LandType::Flathouse, d("0")).unwrap();
        assert_eq!(t.allocations().count(), 0);
        assert_eq!(t.state(), AllocationState::Empty);
    }

    #[test]
    fn test_negative_units_rejected() {
        let mut t = tracker("200000");
        let err = t.set_units(LandType::Flathouse, d("-1")).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidAmount(_)));
    }

    #[test]
    fn test_unknown_land_type_rejected() {
        let mut t = tracker("200000");
        let err = t.set_units(LandType::Tree, d("1")).unwrap_err();
        assert!(matches!(err, ConversionError::UnknownLandType(_)));
    }

    #[test]
    fn test_quick_fill_uses_remaining_budget() {
        let mut t = tracker("210000");
        t.set_units(LandType::Flathouse, d("1")).unwrap();
        t.quick_fill_remaining(LandType::JunglePlot).unwrap();
        assert_eq!(t.units(LandType::JunglePlot), d("60"));
        assert!(t.is_fully_allocated());
        assert_eq!(t.state(), AllocationState::FullyAllocated);
    }

    #[test]
    fn test_quick_fill_adds_to_existing_units() {
        let mut t = tracker("100000");
        t.set_units(LandType::JunglePlot, d("25")).unwrap();
        t.quick_fill_remaining(LandType::JunglePlot).unwrap();
        assert_eq!(t.units(LandType::JunglePlot), d("100"));
    }

    #[test]
    fn test_huge_requests_are_errors() {
        let max = d("79228162514264337593543950335");
        let mut t = AllocationTracker::new(RateTable::investor(), max).unwrap();
        let err = t
            .set_units(LandType::Flathouse, d("1000000000000000000000000"))
            .unwrap_err();
        assert!(matches!(err, ConversionError::InvalidAmount(_)));
        assert_eq!(t.state(), AllocationState::Empty);

        // remaining * 2 overflows before the division brings it back down.
        let err = t.quick_fill_remaining(LandType::JunglePlot).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidAmount(_)));
        assert_eq!(t.units(LandType::JunglePlot), d("0"));
    }

    #[test]
    fn test_quick_fill_insufficient_remaining() {
        let mut t = tracker("200000");
        t.set_units(LandType::Flathouse, d("1")).unwrap();
        let err = t.quick_fill_remaining(LandType::FlathouseMini).unwrap_err();
        assert_eq!(
            err,
            ConversionError::InsufficientRemaining {
                land_type: LandType::FlathouseMini,
                required: d("100000"),
                available: d("50000"),
            }
        );
        assert_eq!(t.units(LandType::FlathouseMini), d("0"));
    }

    #[test]
    fn test_budget_lowered_below_allocation() {
        let mut t = tracker("200000");
        t.set_units(LandType::Flathouse, d("1")).unwrap();
        t.set_budget(d("100000")).unwrap();
        assert_eq!(t.remaining(), d("-50000"));
        assert_eq!(
            t.validate(),
            Err(ConversionError::BudgetExceeded {
                required: d("150000"),
                budget: d("100000"),
            })
        );
        // Entries are not rebalanced.
        assert_eq!(t.units(LandType::Flathouse), d("1"));
        assert!(t.prepare_commit().is_err());
    }

    #[test]
    fn test_reset_keeps_budget() {
        let mut t = tracker("200000");
        t.set_units(LandType::Flathouse, d("1")).unwrap();
        t.reset().unwrap();
        assert_eq!(t.budget(), d("200000"));
        assert_eq!(t.remaining(), d("200000"));
        assert_eq!(t.state(), AllocationState::Empty);
    }

    #[test]
    fn test_prepare_commit_requirements() {
        let mut t = tracker("200000");
        assert_eq!(t.prepare_commit(), Err(ConversionError::NothingAllocated));

        t.set_units(LandType::Flathouse, d("1")).unwrap();
        assert_eq!(
            t.prepare_commit(),
            Err(ConversionError::UnallocatedFunds {
                remaining: d("50000")
            })
        );

        t.set_units(LandType::JunglePlot, d("50")).unwrap();
        let summary = t.prepare_commit().unwrap();
        assert_eq!(summary.total_invested, d("200000"));
        assert_eq!(summary.total_units, d("51"));
    }

    #[test]
    fn test_committed_tracker_is_frozen() {
        let mut t = tracker("150000");
        t.set_units(LandType::Flathouse, d("1")).unwrap();
        t.mark_committed().unwrap();
        assert_eq!(t.state(), AllocationState::Committed);

        assert_eq!(
            t.set_units(LandType::Flathouse, d("0")),
            Err(ConversionError::AlreadyCommitted)
        );
        assert_eq!(t.reset(), Err(ConversionError::AlreadyCommitted));
        assert_eq!(t.set_budget(d("1")), Err(ConversionError::AlreadyCommitted));
        assert_eq!(
            t.quick_fill_remaining(LandType::JunglePlot),
            Err(ConversionError::AlreadyCommitted)
        );
        assert_eq!(t.mark_committed(), Err(ConversionError::AlreadyCommitted));
        assert_eq!(t.units(LandType::Flathouse), d("1"));
    }
}
