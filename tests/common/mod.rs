#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dealhub::auth::accounts;
use dealhub::db::{self, models::DealStatus};
use dealhub::deals::{DealRepository, NewDealForm};
use dealhub::state::DbPool;
use dealhub::voting::{DealId, SqliteVoteStore, StoreError, UserId, VoteStore, VoteType};
use rusqlite::params;
use tempfile::TempDir;

// Helper to create a migrated test database
pub fn create_test_pool() -> (TempDir, DbPool) {
    let temp_dir = TempDir::new().unwrap();
    let pool = db::create_pool(&temp_dir.path().join("test.db")).unwrap();
    db::run_migrations(&pool).unwrap();
    (temp_dir, pool)
}

pub fn register(pool: &DbPool, username: &str) -> String {
    accounts::register(pool, username, "password123", None, true)
        .unwrap()
        .id
}

/// Post and approve a deal, returning its id.
pub fn approved_deal(pool: &DbPool, poster: &str, title: &str) -> String {
    let form = NewDealForm {
        title: title.to_string(),
        url: "https://shop.example/item".to_string(),
        price: "19.99".to_string(),
        original_price: Some("39.99".to_string()),
        ..Default::default()
    };
    let repo = DealRepository::new(pool.clone());
    let id = repo.create(poster, &form.validate().unwrap()).unwrap();
    repo.set_status(&id, DealStatus::Approved).unwrap();
    id
}

/// Give a deal votes from throwaway users so it starts with known counters.
pub fn seed_votes(pool: &DbPool, deal_id: &str, ups: usize, downs: usize) {
    let conn = pool.get().unwrap();
    for i in 0..ups + downs {
        let user_id = format!("seed-{}-{}", deal_id, i);
        conn.execute(
            "INSERT INTO users (id, username, password_hash) VALUES (?1, ?1, 'x')",
            params![user_id],
        )
        .unwrap();
        let vote = if i < ups { "up" } else { "down" };
        conn.execute(
            "INSERT INTO votes (deal_id, user_id, vote_type) VALUES (?1, ?2, ?3)",
            params![deal_id, user_id, vote],
        )
        .unwrap();
    }
}

pub fn vote_rows(pool: &DbPool, deal_id: &str, user_id: &str) -> Vec<String> {
    let conn = pool.get().unwrap();
    let mut stmt = conn
        .prepare("SELECT vote_type FROM votes WHERE deal_id = ?1 AND user_id = ?2")
        .unwrap();
    stmt.query_map(params![deal_id, user_id], |r| r.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

/// Reads from SQLite, refuses every write.
pub struct OfflineStore {
    inner: SqliteVoteStore,
    attempts: AtomicUsize,
}

impl OfflineStore {
    pub fn new(pool: &DbPool) -> Self {
        Self {
            inner: SqliteVoteStore::new(pool.clone()),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Number of writes that were refused.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn refuse(&self) -> StoreError {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        StoreError::Unavailable("network unreachable".into())
    }
}

#[async_trait]
impl VoteStore for OfflineStore {
    async fn fetch(&self, deal: &DealId, user: &UserId) -> Result<Option<VoteType>, StoreError> {
        self.inner.fetch(deal, user).await
    }

    async fn insert(
        &self,
        _deal: &DealId,
        _user: &UserId,
        _vote: VoteType,
    ) -> Result<(), StoreError> {
        Err(self.refuse())
    }

    async fn upsert(
        &self,
        _deal: &DealId,
        _user: &UserId,
        _vote: VoteType,
    ) -> Result<(), StoreError> {
        Err(self.refuse())
    }

    async fn delete(&self, _deal: &DealId, _user: &UserId) -> Result<bool, StoreError> {
        Err(self.refuse())
    }
}
