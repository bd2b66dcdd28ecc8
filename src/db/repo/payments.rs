//! Pending payment and conversion audit operations for the repository.

use crate::domain::{
    Decimal, InvestmentConversion, LandType, PaymentId, PendingPayment, UserId,
};
use chrono::{TimeZone, Utc};
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;

use super::{format_date, parse_date, parse_decimal, parse_land_type, Repository};

impl Repository {
    /// Unconverted payments for a user, oldest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_pending_payments(
        &self,
        user: &UserId,
    ) -> Result<Vec<PendingPayment>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, amount, description, payment_type, payment_date
            FROM pending_payments
            WHERE user_id = ? AND is_converted = 0
            ORDER BY payment_date ASC, id ASC
            "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let id: String = row.get("id");
                let amount: String = row.get("amount");
                let payment_date: String = row.get("payment_date");
                PendingPayment {
                    amount: parse_decimal(&id, "amount", &amount),
                    payment_date: parse_date(&id, "payment_date", &payment_date),
                    id: PaymentId::new(id),
                    user_id: user.clone(),
                    description: row.get("description"),
                    payment_type: row.get("payment_type"),
                }
            })
            .collect())
    }

    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_payment(&self, payment: &PendingPayment) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO pending_payments (id, user_id, amount, description, payment_type, payment_date)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(payment.id.as_str())
        .bind(payment.user_id.as_str())
        .bind(payment.amount.to_canonical_string())
        .bind(&payment.description)
        .bind(&payment.payment_type)
        .bind(format_date(payment.payment_date))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flag a pending payment of `user` as converted on `conn`. Returns false
    /// if there is no such payment or it was already converted.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn mark_payment_converted(
        conn: &mut SqliteConnection,
        payment_id: &PaymentId,
        user: &UserId,
        land_type: LandType,
        units: Decimal,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE pending_payments SET
                is_converted = 1,
                converted_land_type = ?,
                converted_units = ?,
                converted_at = ?
            WHERE id = ? AND user_id = ? AND is_converted = 0
            "#,
        )
        .bind(land_type.key())
        .bind(units.to_canonical_string())
        .bind(Utc::now().timestamp_millis())
        .bind(payment_id.as_str())
        .bind(user.as_str())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    /// Returns an error if the insert fails, including when the table is missing.
    pub async fn insert_investment_conversion(
        &self,
        user: &UserId,
        land_type: LandType,
        amount: Decimal,
        units: Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO investment_conversions (user_id, land_type, amount, units, recorded_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.as_str())
        .bind(land_type.key())
        .bind(amount.to_canonical_string())
        .bind(units.to_canonical_string())
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Investment audit rows for a user in insertion order.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_investment_conversions(
        &self,
        user: &UserId,
    ) -> Result<Vec<InvestmentConversion>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, land_type, amount, units, recorded_at
            FROM investment_conversions
            WHERE user_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id: i64 = row.get("id");
                let key = id.to_string();
                let land_type: String = row.get("land_type");
                let amount: String = row.get("amount");
                let units: String = row.get("units");
                let recorded_at: i64 = row.get("recorded_at");
                parse_land_type(&key, &land_type).map(|land_type| InvestmentConversion {
                    user_id: user.clone(),
                    land_type,
                    amount: parse_decimal(&key, "amount", &amount),
                    units: parse_decimal(&key, "units", &units),
                    recorded_at: Utc
                        .timestamp_millis_opt(recorded_at)
                        .single()
                        .unwrap_or_default(),
                })
            })
            .collect())
    }
}
