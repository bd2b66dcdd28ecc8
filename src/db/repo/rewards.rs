//! Reward balance operations for the repository.

use crate::domain::{Decimal, LandType, RewardBalance, UserId};
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;

use super::{parse_decimal, parse_land_type, Repository};

impl Repository {
    /// Reward rows for a user in land type order.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_rewards(&self, user: &UserId) -> Result<Vec<RewardBalance>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT land_type, count
            FROM rewards
            WHERE user_id = ?
            "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut balances: Vec<RewardBalance> = rows
            .iter()
            .filter_map(|row| {
                let land_type: String = row.get("land_type");
                let count: String = row.get("count");
                parse_land_type(user.as_str(), &land_type).map(|land_type| RewardBalance {
                    land_type,
                    count: parse_decimal(user.as_str(), "count", &count),
                })
            })
            .collect();
        balances.sort_by_key(|b| b.land_type);
        Ok(balances)
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_reward(
        &self,
        user: &UserId,
        land_type: LandType,
    ) -> Result<Option<Decimal>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_reward(&mut conn, user, land_type).await
    }

    /// Read one balance on `conn`, typically inside a transaction.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn fetch_reward(
        conn: &mut SqliteConnection,
        user: &UserId,
        land_type: LandType,
    ) -> Result<Option<Decimal>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT count FROM rewards
            WHERE user_id = ? AND land_type = ?
            "#,
        )
        .bind(user.as_str())
        .bind(land_type.key())
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(|row| {
            let count: String = row.get("count");
            parse_decimal(user.as_str(), "count", &count)
        }))
    }

    /// Overwrite an existing row. Returns false when no row matched.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn update_reward(
        &self,
        user: &UserId,
        land_type: LandType,
        count: Decimal,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE rewards SET count = ?, updated_at = ?
            WHERE user_id = ? AND land_type = ?
            "#,
        )
        .bind(count.to_canonical_string())
        .bind(chrono::Utc::now().timestamp_millis())
        .bind(user.as_str())
        .bind(land_type.key())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert or overwrite a row.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn upsert_reward(
        &self,
        user: &UserId,
        land_type: LandType,
        count: Decimal,
    ) -> Result<(), sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        Self::write_reward(&mut conn, user, land_type, count).await
    }

    /// Insert or overwrite a row on `conn`.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn write_reward(
        conn: &mut SqliteConnection,
        user: &UserId,
        land_type: LandType,
        count: Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO rewards (user_id, land_type, count, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, land_type) DO UPDATE SET
                count = excluded.count,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user.as_str())
        .bind(land_type.key())
        .bind(count.to_canonical_string())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
