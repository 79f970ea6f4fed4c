pub mod domain;
pub mod heat;
pub mod reconciler;
pub mod store;

pub use domain::{DealId, UserId, VoteAction, VoteCounters, VoteState, VoteType, VoteWrite};
pub use heat::HeatTier;
pub use reconciler::{
    AuthContext, DealAggregate, Notification, NotificationLevel, VoteError, VoteOutcome,
    VoteReconciler, VoteView,
};
pub use store::{DynVoteStore, SqliteVoteStore, StoreError, VoteStore};
