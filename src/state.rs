use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::graphql::DealSchema;
use crate::voting::{DynVoteStore, SqliteVoteStore, VoteReconciler};

pub type DbPool = Pool<SqliteConnectionManager>;

pub type SharedReconciler = Arc<VoteReconciler<DynVoteStore>>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub votes: SharedReconciler,
    pub graphql_schema: DealSchema,
}

impl AppState {
    /// Wire the SQLite-backed vote store into a fresh reconciler.
    pub fn new(db: DbPool, config: Config) -> Self {
        let store: DynVoteStore = Arc::new(SqliteVoteStore::new(db.clone()));
        Self::with_vote_store(db, config, store)
    }

    pub fn with_vote_store(db: DbPool, config: Config, store: DynVoteStore) -> Self {
        let graphql_schema = crate::graphql::build_schema(config.listing.clone());
        Self {
            db,
            config,
            votes: Arc::new(VoteReconciler::new(store)),
            graphql_schema,
        }
    }
}
