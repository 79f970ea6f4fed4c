use async_graphql::*;

use crate::db::models::DealStatus;
use crate::deals::{aggregate_of, DealError, DealRepository};
use crate::graphql::types::{VoteDirection, VotePayload};
use crate::state::{DbPool, SharedReconciler};
use crate::voting::{AuthContext, DealId, VoteError};

/// GraphQL Mutation root
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Toggle the caller's vote on a deal. Same direction twice clears the vote.
    async fn cast_vote(
        &self,
        ctx: &Context<'_>,
        deal_id: String,
        direction: VoteDirection,
    ) -> Result<VotePayload> {
        let pool = ctx.data::<DbPool>()?;
        let votes = ctx.data::<SharedReconciler>()?;
        let auth = ctx.data::<AuthContext>()?;

        let repo = DealRepository::new(pool.clone());
        let deal = match repo.get(&deal_id) {
            Ok(deal) if deal.status == DealStatus::Approved => deal,
            Ok(_) | Err(DealError::NotFound) => return Err(Error::new("Deal not found")),
            Err(e) => return Err(e.into()),
        };

        let outcome = votes
            .vote(
                auth,
                DealId::new(deal_id.clone()),
                aggregate_of(&deal),
                direction.into(),
            )
            .await;

        match outcome {
            Ok(outcome) => {
                let fresh = repo.aggregate(&deal_id)?;
                Ok(VotePayload::confirmed(deal_id, outcome.view.state, fresh))
            }
            Err((VoteError::Unauthenticated, _)) => Err(Error::new("Sign in to vote")
                .extend_with(|_, e| e.set("code", "UNAUTHENTICATED"))),
            Err((err, view)) => Ok(VotePayload::failed(view, err.notification().message)),
        }
    }
}
