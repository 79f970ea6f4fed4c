// Vote store - the only shared mutable resource the reconciler touches
use async_trait::async_trait;
use rusqlite::params;
use std::sync::Arc;
use thiserror::Error;

use crate::state::DbPool;
use crate::voting::domain::{DealId, UserId, VoteType};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Invalid vote row: {0}")]
    InvalidRow(String),

    #[error("Vote store unavailable: {0}")]
    Unavailable(String),
}

/// Single-row operations on the (deal, user) vote table.
#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Current vote for the pair. A missing row is `Ok(None)`.
    async fn fetch(&self, deal: &DealId, user: &UserId) -> Result<Option<VoteType>, StoreError>;

    /// Create the pair's row. Fails if one already exists.
    async fn insert(&self, deal: &DealId, user: &UserId, vote: VoteType)
        -> Result<(), StoreError>;

    /// Replace the pair's vote type.
    async fn upsert(&self, deal: &DealId, user: &UserId, vote: VoteType)
        -> Result<(), StoreError>;

    /// Remove the pair's row. Returns whether a row was removed.
    async fn delete(&self, deal: &DealId, user: &UserId) -> Result<bool, StoreError>;
}

pub type DynVoteStore = Arc<dyn VoteStore>;

#[async_trait]
impl<S: VoteStore + ?Sized> VoteStore for Arc<S> {
    async fn fetch(&self, deal: &DealId, user: &UserId) -> Result<Option<VoteType>, StoreError> {
        (**self).fetch(deal, user).await
    }

    async fn insert(
        &self,
        deal: &DealId,
        user: &UserId,
        vote: VoteType,
    ) -> Result<(), StoreError> {
        (**self).insert(deal, user, vote).await
    }

    async fn upsert(
        &self,
        deal: &DealId,
        user: &UserId,
        vote: VoteType,
    ) -> Result<(), StoreError> {
        (**self).upsert(deal, user, vote).await
    }

    async fn delete(&self, deal: &DealId, user: &UserId) -> Result<bool, StoreError> {
        (**self).delete(deal, user).await
    }
}

/// SQLite implementation
pub struct SqliteVoteStore {
    pool: DbPool,
}

impl SqliteVoteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VoteStore for SqliteVoteStore {
    async fn fetch(&self, deal: &DealId, user: &UserId) -> Result<Option<VoteType>, StoreError> {
        let conn = self.pool.get()?;

        let result: Result<String, rusqlite::Error> = conn.query_row(
            "SELECT vote_type FROM votes WHERE deal_id = ?1 AND user_id = ?2",
            params![deal.as_str(), user.as_str()],
            |row| row.get(0),
        );

        match result {
            Ok(raw) => raw
                .parse::<VoteType>()
                .map(Some)
                .map_err(|e| StoreError::InvalidRow(e.to_string())),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn insert(
        &self,
        deal: &DealId,
        user: &UserId,
        vote: VoteType,
    ) -> Result<(), StoreError> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO votes (deal_id, user_id, vote_type) VALUES (?1, ?2, ?3)",
            params![deal.as_str(), user.as_str(), vote.as_str()],
        )?;

        Ok(())
    }

    async fn upsert(
        &self,
        deal: &DealId,
        user: &UserId,
        vote: VoteType,
    ) -> Result<(), StoreError> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO votes (deal_id, user_id, vote_type)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(deal_id, user_id) DO UPDATE SET
               vote_type = excluded.vote_type,
               updated_at = datetime('now')",
            params![deal.as_str(), user.as_str(), vote.as_str()],
        )?;

        Ok(())
    }

    async fn delete(&self, deal: &DealId, user: &UserId) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;

        let rows = conn.execute(
            "DELETE FROM votes WHERE deal_id = ?1 AND user_id = ?2",
            params![deal.as_str(), user.as_str()],
        )?;

        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteVoteStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = db::create_pool(&temp_dir.path().join("test.db")).unwrap();
        db::run_migrations(&pool).unwrap();

        let conn = pool.get().unwrap();
        conn.execute_batch(
            "INSERT INTO users (id, username, password_hash) VALUES ('u1', 'alice', 'x');
             INSERT INTO deals (id, user_id, title, url, price_cents, status)
                VALUES ('d1', 'u1', 'Deal', 'https://example.com', 100, 'approved');",
        )
        .unwrap();
        drop(conn);

        (SqliteVoteStore::new(pool), temp_dir)
    }

    fn ids() -> (DealId, UserId) {
        (DealId::new("d1"), UserId::new("u1"))
    }

    #[tokio::test]
    async fn fetch_missing_row_is_none() {
        let (store, _tmp) = create_test_store();
        let (deal, user) = ids();
        assert_eq!(store.fetch(&deal, &user).await.unwrap(), None);
    }

    #[tokio::test]
    async fn insert_then_fetch() {
        let (store, _tmp) = create_test_store();
        let (deal, user) = ids();

        store.insert(&deal, &user, VoteType::Down).await.unwrap();
        assert_eq!(
            store.fetch(&deal, &user).await.unwrap(),
            Some(VoteType::Down)
        );
    }

    #[tokio::test]
    async fn second_insert_for_pair_fails() {
        let (store, _tmp) = create_test_store();
        let (deal, user) = ids();

        store.insert(&deal, &user, VoteType::Up).await.unwrap();
        let result = store.insert(&deal, &user, VoteType::Up).await;
        assert!(matches!(result, Err(StoreError::Sql(_))));
    }

    #[tokio::test]
    async fn upsert_replaces_vote_type() {
        let (store, _tmp) = create_test_store();
        let (deal, user) = ids();

        store.insert(&deal, &user, VoteType::Up).await.unwrap();
        store.upsert(&deal, &user, VoteType::Down).await.unwrap();
        assert_eq!(
            store.fetch(&deal, &user).await.unwrap(),
            Some(VoteType::Down)
        );

        let conn = store.pool.get().unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM votes", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn delete_reports_whether_row_existed() {
        let (store, _tmp) = create_test_store();
        let (deal, user) = ids();

        store.insert(&deal, &user, VoteType::Up).await.unwrap();
        assert!(store.delete(&deal, &user).await.unwrap());
        assert!(!store.delete(&deal, &user).await.unwrap());
        assert_eq!(store.fetch(&deal, &user).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_vote_type_is_invalid_row() {
        let (store, _tmp) = create_test_store();
        let (deal, user) = ids();

        // Bypass the CHECK constraint to simulate a corrupt row
        let conn = store.pool.get().unwrap();
        conn.execute_batch(
            "PRAGMA ignore_check_constraints = ON;
             INSERT INTO votes (deal_id, user_id, vote_type) VALUES ('d1', 'u1', 'meh');
             PRAGMA ignore_check_constraints = OFF;",
        )
        .unwrap();
        drop(conn);

        let result = store.fetch(&deal, &user).await;
        assert!(matches!(result, Err(StoreError::InvalidRow(_))));
    }
}
