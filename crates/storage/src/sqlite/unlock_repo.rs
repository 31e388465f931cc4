use std::collections::BTreeSet;

use chrono::Utc;
use prep_core::model::UserId;
use sqlx::Row;

use super::{SqliteRepository, mapping};
use crate::repository::{StorageError, UnlockRepository};

#[async_trait::async_trait]
impl UnlockRepository for SqliteRepository {
    async fn get_unlocked_ids(&self, user_id: UserId) -> Result<BTreeSet<String>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT unlocked_ids
            FROM achievement_unlocks
            WHERE user_id = ?1
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => {
                let json: String = row
                    .try_get("unlocked_ids")
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                mapping::from_json(&json)
            }
            None => Ok(BTreeSet::new()),
        }
    }

    async fn set_unlocked_ids(
        &self,
        user_id: UserId,
        ids: &BTreeSet<String>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO achievement_unlocks (user_id, unlocked_ids, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET
                unlocked_ids = excluded.unlocked_ids,
                updated_at = excluded.updated_at
            ",
        )
        .bind(user_id.to_string())
        .bind(mapping::to_json(ids)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
