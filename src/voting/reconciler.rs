use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::voting::domain::{
    DealId, Transition, UserId, VoteAction, VoteCounters, VoteState, VoteWrite,
};
use crate::voting::heat::HeatTier;
use crate::voting::store::{StoreError, VoteStore};

/// Who is voting. Passed in on every call; the reconciler holds no session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthContext {
    Anonymous,
    SignedIn(UserId),
}

impl AuthContext {
    pub fn user(&self) -> Option<&UserId> {
        match self {
            Self::Anonymous => None,
            Self::SignedIn(user) => Some(user),
        }
    }
}

impl From<Option<UserId>> for AuthContext {
    fn from(user: Option<UserId>) -> Self {
        user.map_or(Self::Anonymous, Self::SignedIn)
    }
}

/// Denormalised counters as last read from the deal record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DealAggregate {
    pub upvotes: i64,
    pub downvotes: i64,
    pub heat_score: i64,
}

/// What one viewer sees for one deal: their own vote plus displayed counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteView {
    pub deal_id: DealId,
    pub state: VoteState,
    /// False when the viewer's row could not be read; `state` is then a placeholder.
    pub state_known: bool,
    pub counters: VoteCounters,
    pub heat_score: i64,
}

impl VoteView {
    pub fn new(deal_id: DealId, state: VoteState, aggregate: DealAggregate) -> Self {
        Self {
            deal_id,
            state,
            state_known: true,
            counters: VoteCounters::new(aggregate.upvotes, aggregate.downvotes),
            heat_score: aggregate.heat_score,
        }
    }

    /// Counts only, for when the viewer's own vote is unavailable.
    pub fn unknown_state(deal_id: DealId, aggregate: DealAggregate) -> Self {
        Self {
            state_known: false,
            ..Self::new(deal_id, VoteState::NoVote, aggregate)
        }
    }

    /// The viewer's vote, if it was read successfully.
    pub fn known_state(&self) -> Option<VoteState> {
        self.state_known.then_some(self.state)
    }

    pub fn heat_tier(&self) -> HeatTier {
        HeatTier::from_score(self.heat_score)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
}

/// Transient, non-fatal message for the voting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum VoteError {
    #[error("Sign in to vote")]
    Unauthenticated,

    #[error("Vote could not be saved: {0}")]
    Persistence(#[from] StoreError),
}

impl VoteError {
    pub fn notification(&self) -> Notification {
        match self {
            Self::Unauthenticated => Notification {
                level: NotificationLevel::Info,
                message: "Sign in to vote on deals.".to_string(),
            },
            Self::Persistence(_) => Notification {
                level: NotificationLevel::Warning,
                message: "Your vote could not be saved. Please try again.".to_string(),
            },
        }
    }
}

/// Result of a confirmed vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteOutcome {
    pub transition: Transition,
    pub view: VoteView,
}

type PairKey = (DealId, UserId);

/// Per-(deal, user) locks so two clicks on the same pair never race.
#[derive(Default)]
struct PairLocks {
    inner: StdMutex<HashMap<PairKey, Arc<Mutex<()>>>>,
}

impl PairLocks {
    fn handle(&self, key: &PairKey) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn acquire(&self, key: &PairKey) -> PairGuard<'_> {
        let guard = self.handle(key).lock_owned().await;
        PairGuard {
            locks: self,
            key: key.clone(),
            guard: Some(guard),
        }
    }

    fn release(&self, key: &PairKey) {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        // Only the map itself still holds the handle: nobody is waiting
        if map.get(key).is_some_and(|h| Arc::strong_count(h) == 1) {
            map.remove(key);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

struct PairGuard<'a> {
    locks: &'a PairLocks,
    key: PairKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PairGuard<'_> {
    fn drop(&mut self) {
        // Drop the owned guard first so its Arc no longer counts
        self.guard.take();
        self.locks.release(&self.key);
    }
}

/// Decides and executes the single vote-store write for each click.
///
/// Counters are updated optimistically before the write and rolled back if
/// the write fails, for every transition alike.
pub struct VoteReconciler<S> {
    store: S,
    locks: PairLocks,
}

impl<S: VoteStore> VoteReconciler<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: PairLocks::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Build the viewer's vote view. Anonymous viewers always see `NoVote`.
    pub async fn load_view(
        &self,
        auth: &AuthContext,
        deal_id: DealId,
        aggregate: DealAggregate,
    ) -> Result<VoteView, VoteError> {
        let state = match auth.user() {
            Some(user) => VoteState::from_row(self.store.fetch(&deal_id, user).await?),
            None => VoteState::NoVote,
        };
        Ok(VoteView::new(deal_id, state, aggregate))
    }

    /// Like `load_view`, but a store failure degrades to the counts alone
    /// plus a notice instead of failing the page.
    pub async fn load_view_or_notice(
        &self,
        auth: &AuthContext,
        deal_id: DealId,
        aggregate: DealAggregate,
    ) -> (VoteView, Option<Notification>) {
        match self.load_view(auth, deal_id.clone(), aggregate).await {
            Ok(view) => (view, None),
            Err(e) => {
                tracing::warn!("Failed to load vote for deal {}: {}", deal_id, e);
                let notice = Notification {
                    level: NotificationLevel::Warning,
                    message: "Your vote could not be loaded.".to_string(),
                };
                (VoteView::unknown_state(deal_id, aggregate), Some(notice))
            }
        }
    }

    /// Apply a click to a view the caller already holds.
    ///
    /// On failure the view is left exactly as it was.
    pub async fn cast(
        &self,
        auth: &AuthContext,
        view: &mut VoteView,
        action: VoteAction,
    ) -> Result<VoteOutcome, VoteError> {
        let user = auth.user().ok_or(VoteError::Unauthenticated)?;
        let key = (view.deal_id.clone(), user.clone());
        let _guard = self.locks.acquire(&key).await;

        self.apply(user, view, action).await
    }

    /// Read the current row and apply a click, all under the pair lock.
    ///
    /// A second click always sees the first click's confirmed result.
    pub async fn vote(
        &self,
        auth: &AuthContext,
        deal_id: DealId,
        aggregate: DealAggregate,
        action: VoteAction,
    ) -> Result<VoteOutcome, (VoteError, VoteView)> {
        let user = match auth.user() {
            Some(user) => user,
            None => {
                let view = VoteView::new(deal_id, VoteState::NoVote, aggregate);
                return Err((VoteError::Unauthenticated, view));
            }
        };
        let key = (deal_id.clone(), user.clone());
        let _guard = self.locks.acquire(&key).await;

        let current = match self.store.fetch(&deal_id, user).await {
            Ok(row) => VoteState::from_row(row),
            Err(e) => {
                tracing::warn!("Failed to read vote for deal {}: {}", deal_id, e);
                let view = VoteView::unknown_state(deal_id, aggregate);
                return Err((e.into(), view));
            }
        };

        let mut view = VoteView::new(deal_id, current, aggregate);
        match self.apply(user, &mut view, action).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => Err((e, view)),
        }
    }

    async fn apply(
        &self,
        user: &UserId,
        view: &mut VoteView,
        action: VoteAction,
    ) -> Result<VoteOutcome, VoteError> {
        let transition = view.state.transition(action);
        view.counters.apply(transition.delta);

        let deal = &view.deal_id;
        let written = match transition.write {
            VoteWrite::Insert(vote) => self.store.insert(deal, user, vote).await,
            VoteWrite::Update(vote) => self.store.upsert(deal, user, vote).await,
            VoteWrite::Delete => self.store.delete(deal, user).await.map(|_| ()),
        };

        if let Err(e) = written {
            view.counters.revert(transition.delta);
            tracing::warn!(
                "Vote write failed for deal {} ({} -> {}): {}",
                deal,
                transition.from.state_name(),
                transition.to.state_name(),
                e
            );
            return Err(e.into());
        }

        view.state = transition.to;
        tracing::debug!(
            "Vote on deal {}: {} -> {}",
            deal,
            transition.from.state_name(),
            transition.to.state_name()
        );

        Ok(VoteOutcome {
            transition,
            view: view.clone(),
        })
    }
}
