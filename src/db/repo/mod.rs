//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by table:
//! - `rewards.rs` - Reward balance rows
//! - `squares.rs` - Claimed grid squares
//! - `payments.rs` - Pending payments and conversion audit rows

mod payments;
mod rewards;
mod squares;

use crate::domain::{Decimal, LandType, NewUser, UserId, UserProfile};
use chrono::NaiveDate;
use sqlx::sqlite::{Sqlite, SqlitePool, SqliteRow};
use sqlx::{Row, Transaction};
use std::str::FromStr;
use tracing::warn;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open a write transaction on behalf of `user`.
    ///
    /// The first statement writes the user's row, so SQLite hands out the
    /// write lock before any balance is read and concurrent writers wait on
    /// `busy_timeout`. Returns `None`, holding nothing, when the user does
    /// not exist.
    ///
    /// # Errors
    /// Returns an error if the transaction cannot be started.
    pub async fn begin_for_user(
        &self,
        user: &UserId,
    ) -> Result<Option<Transaction<'static, Sqlite>>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("UPDATE users SET streak_days = streak_days WHERE id = ?")
            .bind(user.as_str())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }
        Ok(Some(tx))
    }

    // =========================================================================
    // User operations
    // =========================================================================

    /// All users ordered by name.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_users(&self) -> Result<Vec<UserProfile>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, email, streak_days, total_earnings
            FROM users
            ORDER BY name ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_user(&self, user: &UserId) -> Result<Option<UserProfile>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, streak_days, total_earnings
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Insert a user together with a zero reward row per land type.
    ///
    /// Returns `None` when the id is already taken; nothing is written then.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn insert_user(&self, user: &NewUser) -> Result<Option<UserProfile>, sqlx::Error> {
        let now = chrono::Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, streak_days, total_earnings, created_at)
            VALUES (?, ?, ?, 0, '0', ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(user.user_id.as_str())
        .bind(&user.name)
        .bind(&user.email)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        for land_type in LandType::ALL {
            sqlx::query(
                r#"
                INSERT INTO rewards (user_id, land_type, count, updated_at)
                VALUES (?, ?, '0', ?)
                ON CONFLICT(user_id, land_type) DO NOTHING
                "#,
            )
            .bind(user.user_id.as_str())
            .bind(land_type.key())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Some(UserProfile {
            user_id: user.user_id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            streak_days: 0,
            total_earnings: Decimal::zero(),
        }))
    }

    /// Insert or replace a full profile. Used to seed demo data.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn upsert_user(&self, profile: &UserProfile) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, streak_days, total_earnings, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                streak_days = excluded.streak_days,
                total_earnings = excluded.total_earnings
            "#,
        )
        .bind(profile.user_id.as_str())
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(i64::from(profile.streak_days))
        .bind(profile.total_earnings.to_canonical_string())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn user_from_row(row: &SqliteRow) -> UserProfile {
    let id: String = row.get("id");
    let streak: i64 = row.get("streak_days");
    let earnings: String = row.get("total_earnings");
    UserProfile {
        total_earnings: parse_decimal(&id, "total_earnings", &earnings),
        streak_days: u32::try_from(streak).unwrap_or_default(),
        user_id: UserId::new(id),
        name: row.get("name"),
        email: row.get("email"),
    }
}

/// Parse a stored decimal, warning and falling back to zero on corruption.
pub(crate) fn parse_decimal(key: &str, column: &str, value: &str) -> Decimal {
    Decimal::from_str(value).unwrap_or_else(|e| {
        warn!(key = %key, column = column, value = %value, error = %e, "Failed to parse decimal, using zero");
        Decimal::default()
    })
}

pub(crate) fn parse_date(key: &str, column: &str, value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, DATE_FORMAT).unwrap_or_else(|e| {
        warn!(key = %key, column = column, value = %value, error = %e, "Failed to parse date, using default");
        NaiveDate::default()
    })
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Stored land types outside the known set are logged and skipped.
pub(crate) fn parse_land_type(key: &str, value: &str) -> Option<LandType> {
    LandType::from_str(value)
        .map_err(|e| {
            warn!(key = %key, land_type = %value, error = %e, "Unknown land type in database, skipping row");
            e
        })
        .ok()
}
