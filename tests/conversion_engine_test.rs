use land_options::engine::{LandTypeRate, RateTable};
use land_options::{
    AllocationTracker, ConversionCalculator, ConversionError, Decimal, LandType, RoundingPolicy,
};

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn whole() -> ConversionCalculator {
    ConversionCalculator::new(RoundingPolicy::WholeUnitsOnly)
}

/// Small deterministic generator so sequences are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

#[test]
fn test_employee_converts_exact_unit() {
    let result = whole()
        .calculate_from_cash(d("1000"), LandType::JunglePlot, &RateTable::employee())
        .unwrap();
    assert_eq!(result.land_value, d("2000"));
    assert_eq!(result.units, d("1"));
    assert_eq!(result.remaining_cash, d("0"));
}

#[test]
fn test_employee_conversion_floors_units() {
    let result = whole()
        .calculate_from_cash(d("1500"), LandType::JunglePlot, &RateTable::employee())
        .unwrap();
    assert_eq!(result.land_value, d("3000"));
    assert_eq!(result.units, d("1"));
    assert_eq!(result.remaining_value, d("1000"));
    assert_eq!(result.remaining_cash, d("500"));
}

#[test]
fn test_whole_unit_conversion_conserves_cash() {
    let calc = whole();
    for table in [RateTable::employee(), RateTable::investor()] {
        for land_type in table.land_types().collect::<Vec<_>>() {
            for amount in (0..=400_000).step_by(7_919) {
                let amount = Decimal::from_i64(amount);
                let result = calc.calculate_from_cash(amount, land_type, &table).unwrap();
                assert_eq!(
                    result.investment_required + result.remaining_cash,
                    amount,
                    "{} {} {}",
                    table.name(),
                    land_type,
                    amount
                );
            }
        }
    }
}

#[test]
fn test_units_monotonic_in_amount() {
    let table = RateTable::employee();
    for calc in [
        whole(),
        ConversionCalculator::new(RoundingPolicy::FractionalUnitsAllowed),
    ] {
        let mut previous = Decimal::zero();
        for amount in (0..20_000).step_by(137) {
            let units = calc
                .calculate_from_cash(Decimal::from_i64(amount), LandType::Tree, &table)
                .unwrap()
                .units;
            assert!(units >= previous);
            previous = units;
        }
    }
}

#[test]
fn test_summarize_independent_of_order() {
    let table = RateTable::investor();
    let entries = vec![
        (LandType::JunglePlot, d("30")),
        (LandType::Flathouse, d("2")),
        (LandType::FlathouseMini, d("1")),
        (LandType::JunglePlot, d("5")),
    ];
    let forward = whole().summarize(entries.clone(), &table).unwrap();
    let reversed = whole()
        .summarize(entries.into_iter().rev(), &table)
        .unwrap();

    assert_eq!(forward, reversed);
    assert_eq!(forward.total_invested, d("435000"));
    assert_eq!(forward.total_units, d("38"));
    assert_eq!(forward.breakdown[&LandType::JunglePlot].units, d("35"));
}

#[test]
fn test_investor_jungle_plot_below_minimum() {
    let mut tracker = AllocationTracker::new(RateTable::investor(), d("100000")).unwrap();
    let err = tracker
        .set_units(LandType::JunglePlot, d("24"))
        .unwrap_err();
    assert!(matches!(
        err,
        ConversionError::BelowMinimum { min_units: 25, .. }
    ));
    assert_eq!(tracker.units(LandType::JunglePlot), Decimal::zero());
}

#[test]
fn test_minimum_enforcement_never_mutates() {
    let mut tracker = AllocationTracker::new(RateTable::investor(), d("100000")).unwrap();
    tracker.set_units(LandType::JunglePlot, d("30")).unwrap();
    for units in 1..25 {
        let err = tracker
            .set_units(LandType::JunglePlot, Decimal::from_i64(units))
            .unwrap_err();
        assert!(matches!(err, ConversionError::BelowMinimum { .. }));
        assert_eq!(tracker.units(LandType::JunglePlot), d("30"));
    }
}

#[test]
fn test_second_allocation_exceeding_budget_is_rejected() {
    let mut tracker = AllocationTracker::new(RateTable::investor(), d("200000")).unwrap();
    tracker.set_units(LandType::Flathouse, d("1")).unwrap();

    let err = tracker
        .set_units(LandType::FlathouseMini, d("1"))
        .unwrap_err();
    match err {
        ConversionError::BudgetExceeded { required, budget } => {
            assert_eq!(required, d("250000"));
            assert_eq!(budget, d("200000"));
        }
        other => panic!("Expected BudgetExceeded, got {:?}", other),
    }

    let allocations: Vec<_> = tracker.allocations().collect();
    assert_eq!(allocations, vec![(LandType::Flathouse, d("1"))]);
    assert_eq!(tracker.remaining(), d("50000"));
}

#[test]
fn test_quick_fill_with_thousand_unit_value() {
    let table = RateTable::from_rates(
        "investor",
        [LandTypeRate::new(LandType::JunglePlot, d("2"), d("1000"), 50).unwrap()],
    );
    let mut tracker = AllocationTracker::new(table.clone(), d("60000")).unwrap();
    assert_eq!(table.lookup(LandType::JunglePlot).unwrap().min_ticket(), d("25000"));

    tracker.quick_fill_remaining(LandType::JunglePlot).unwrap();
    assert_eq!(tracker.units(LandType::JunglePlot), d("120"));
    assert!(tracker.is_fully_allocated());
}

#[test]
fn test_quick_fill_with_standard_investor_rates() {
    let mut tracker = AllocationTracker::new(RateTable::investor(), d("60000")).unwrap();
    tracker.quick_fill_remaining(LandType::JunglePlot).unwrap();
    assert_eq!(tracker.units(LandType::JunglePlot), d("60"));
    assert_eq!(tracker.remaining(), Decimal::zero());
}

#[test]
fn test_budget_invariant_under_random_sequences() {
    let kinds = [
        LandType::JunglePlot,
        LandType::Flathouse,
        LandType::FlathouseMini,
    ];
    for seed in 1..=20u64 {
        let mut rng = Lcg(seed);
        let budget = Decimal::from_i64(100_000 + rng.next(400_000) as i64);
        let mut tracker = AllocationTracker::new(RateTable::investor(), budget).unwrap();

        for _ in 0..200 {
            let land_type = kinds[rng.next(kinds.len() as u64) as usize];
            let units = Decimal::from_i64(rng.next(120) as i64);
            let before: Vec<_> = tracker.allocations().collect();

            match tracker.set_units(land_type, units) {
                Ok(()) => assert!(tracker.total_allocated() <= tracker.budget()),
                Err(_) => {
                    let after: Vec<_> = tracker.allocations().collect();
                    assert_eq!(before, after);
                }
            }
            assert!(tracker.validate().is_ok());
        }
    }
}

#[test]
fn test_commit_lifecycle() {
    let mut tracker = AllocationTracker::new(RateTable::investor(), d("175000")).unwrap();
    assert!(matches!(
        tracker.prepare_commit(),
        Err(ConversionError::NothingAllocated)
    ));

    tracker.set_units(LandType::Flathouse, d("1")).unwrap();
    assert!(matches!(
        tracker.prepare_commit(),
        Err(ConversionError::UnallocatedFunds { .. })
    ));

    tracker.set_units(LandType::JunglePlot, d("25")).unwrap();
    let summary = tracker.mark_committed().unwrap();
    assert_eq!(summary.total_invested, d("175000"));
    assert!(matches!(
        tracker.set_units(LandType::JunglePlot, d("30")),
        Err(ConversionError::AlreadyCommitted)
    ));
}
