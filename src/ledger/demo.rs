//! Demo fixtures shared by both ledger backends.

use crate::domain::{
    Decimal, GridPosition, LandType, PaymentId, PendingPayment, SquareRecord, UserId, UserProfile,
};
use chrono::NaiveDate;

/// Everything a fresh demo ledger starts with.
#[derive(Debug, Clone)]
pub struct DemoData {
    pub users: Vec<UserProfile>,
    pub rewards: Vec<(UserId, LandType, Decimal)>,
    pub squares: Vec<(UserId, SquareRecord)>,
    pub payments: Vec<PendingPayment>,
}

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap_or_default()
}

impl DemoData {
    /// Two employees; the first owns six squares and a few rewards.
    pub fn standard() -> Self {
        let alex = UserId::new("employee_001");
        let sarah = UserId::new("employee_002");

        let users = vec![
            UserProfile {
                user_id: alex.clone(),
                name: "Alex Johnson".to_string(),
                email: "alex@company.com".to_string(),
                streak_days: 12,
                total_earnings: Decimal::from_i64(847),
            },
            UserProfile {
                user_id: sarah.clone(),
                name: "Sarah Davis".to_string(),
                email: "sarah@company.com".to_string(),
                streak_days: 8,
                total_earnings: Decimal::from_i64(1234),
            },
        ];

        let held = |user: &UserId, land_type: LandType| -> Decimal {
            if user != &alex {
                return Decimal::zero();
            }
            match land_type {
                LandType::Forest => Decimal::from_i64(2),
                LandType::House | LandType::Tree => Decimal::one(),
                _ => Decimal::zero(),
            }
        };
        let rewards = [&alex, &sarah]
            .into_iter()
            .flat_map(|user| {
                LandType::ALL
                    .into_iter()
                    .map(move |land_type| (user.clone(), land_type))
            })
            .map(|(user, land_type)| {
                let count = held(&user, land_type);
                (user, land_type, count)
            })
            .collect();

        let layout = [
            (1, 1, LandType::Forest, date(1, 15)),
            (2, 1, LandType::House, date(1, 20)),
            (0, 2, LandType::Forest, date(1, 22)),
            (1, 2, LandType::Tree, date(2, 1)),
            (3, 3, LandType::House, date(2, 5)),
            (4, 4, LandType::Forest, date(2, 10)),
        ];
        let squares = layout
            .into_iter()
            .filter_map(|(x, y, land_type, earned_date)| {
                let position = GridPosition::new(x, y).ok()?;
                Some((
                    alex.clone(),
                    SquareRecord {
                        id: SquareRecord::square_id(&alex, position),
                        position,
                        land_type,
                        earned_date,
                    },
                ))
            })
            .collect();

        let payments = vec![
            PendingPayment {
                id: PaymentId::new("pay_001"),
                user_id: alex.clone(),
                amount: Decimal::from_i64(1500),
                description: "Q4 performance bonus".to_string(),
                payment_type: "bonus".to_string(),
                payment_date: date(3, 1),
            },
            PendingPayment {
                id: PaymentId::new("pay_002"),
                user_id: alex.clone(),
                amount: Decimal::from_i64(500),
                description: "Spot award".to_string(),
                payment_type: "award".to_string(),
                payment_date: date(3, 8),
            },
            PendingPayment {
                id: PaymentId::new("pay_003"),
                user_id: sarah,
                amount: Decimal::from_i64(4000),
                description: "Referral bonus".to_string(),
                payment_type: "bonus".to_string(),
                payment_date: date(3, 3),
            },
        ];

        DemoData {
            users,
            rewards,
            squares,
            payments,
        }
    }
}
