//! Grid square operations for the repository.

use crate::domain::{GridPosition, SquareRecord, UserId};
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;
use tracing::warn;

use super::{format_date, parse_date, parse_land_type, Repository};

impl Repository {
    /// Active squares for a user, most recently earned first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_squares(&self, user: &UserId) -> Result<Vec<SquareRecord>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, x, y, land_type, earned_date
            FROM land_squares
            WHERE user_id = ? AND is_active = 1
            ORDER BY earned_date DESC, created_at DESC, id DESC
            "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut squares = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let x: i64 = row.get("x");
            let y: i64 = row.get("y");
            let land_type: String = row.get("land_type");
            let earned_date: String = row.get("earned_date");

            let position = match GridPosition::new(x, y) {
                Ok(position) => position,
                Err(e) => {
                    warn!(square_id = %id, error = %e, "Stored square outside grid, skipping");
                    continue;
                }
            };
            let Some(land_type) = parse_land_type(&id, &land_type) else {
                continue;
            };
            squares.push(SquareRecord {
                earned_date: parse_date(&id, "earned_date", &earned_date),
                id,
                position,
                land_type,
            });
        }
        Ok(squares)
    }

    /// Insert a square. Returns false if the user already holds that position.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_square(
        &self,
        user: &UserId,
        square: &SquareRecord,
    ) -> Result<bool, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        Self::write_square(&mut conn, user, square).await
    }

    /// [`Self::insert_square`] on `conn`.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn write_square(
        conn: &mut SqliteConnection,
        user: &UserId,
        square: &SquareRecord,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO land_squares (id, user_id, x, y, land_type, earned_date, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, 1, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&square.id)
        .bind(user.as_str())
        .bind(i64::from(square.position.x()))
        .bind(i64::from(square.position.y()))
        .bind(square.land_type.key())
        .bind(format_date(square.earned_date))
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{init_db, Repository};
    use crate::domain::{GridPosition, LandType, NewUser, SquareRecord, UserId};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    async fn setup_with_user() -> (Repository, TempDir, UserId) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let pool = init_db(db_path.to_str().unwrap()).await.unwrap();
        let repo = Repository::new(pool);
        let user = UserId::new("employee_001");
        repo.insert_user(&NewUser {
            user_id: user.clone(),
            name: "Alex Johnson".to_string(),
            email: "alex@company.com".to_string(),
        })
        .await
        .unwrap();
        (repo, temp_dir, user)
    }

    fn square(user: &UserId, x: i64, y: i64, day: u32) -> SquareRecord {
        let position = GridPosition::new(x, y).unwrap();
        SquareRecord {
            id: SquareRecord::square_id(user, position),
            position,
            land_type: LandType::Forest,
            earned_date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_insert_square_rejects_same_position() {
        let (repo, _temp, user) = setup_with_user().await;
        assert!(repo.insert_square(&user, &square(&user, 1, 1, 15)).await.unwrap());
        assert!(!repo.insert_square(&user, &square(&user, 1, 1, 16)).await.unwrap());
        assert_eq!(repo.query_squares(&user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_squares_newest_first() {
        let (repo, _temp, user) = setup_with_user().await;
        repo.insert_square(&user, &square(&user, 0, 0, 10)).await.unwrap();
        repo.insert_square(&user, &square(&user, 4, 4, 20)).await.unwrap();
        repo.insert_square(&user, &square(&user, 2, 3, 15)).await.unwrap();

        let positions: Vec<_> = repo
            .query_squares(&user)
            .await
            .unwrap()
            .into_iter()
            .map(|s| (s.position.x(), s.position.y()))
            .collect();
        assert_eq!(positions, vec![(4, 4), (2, 3), (0, 0)]);
    }
}
