use async_graphql::*;

use crate::config::ListingConfig;
use crate::db::models::DealStatus;
use crate::deals::{assemble, assemble_one, DealError, DealFilter, DealRepository, DealSort};
use crate::graphql::types::{DealObject, MyVote};
use crate::state::{DbPool, SharedReconciler};
use crate::voting::{AuthContext, DealId, VoteState, VoteStore};

const MAX_PAGE: i32 = 100;

/// GraphQL Query root
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Approved deals, hottest first unless `sort` is "new".
    /// `first` defaults to the configured listing page size.
    async fn deals(
        &self,
        ctx: &Context<'_>,
        sort: Option<String>,
        category: Option<String>,
        search: Option<String>,
        first: Option<i32>,
        #[graphql(default = 0)] offset: i32,
    ) -> Result<Vec<DealObject>> {
        let pool = ctx.data::<DbPool>()?;
        let page_size = ctx.data::<ListingConfig>()?.page_size;
        let first = first.map_or(page_size, |n| n.clamp(1, MAX_PAGE) as u32);
        let filter = DealFilter {
            category_slug: category,
            shop_slug: None,
            search,
            sort: DealSort::parse(sort.as_deref()),
            limit: first,
            offset: offset.max(0) as u32,
        };

        let deals = DealRepository::new(pool.clone()).list(&filter)?;
        let cards = assemble(pool, deals)?;
        Ok(cards.into_iter().map(DealObject::from).collect())
    }

    /// A single approved deal
    async fn deal(&self, ctx: &Context<'_>, id: String) -> Result<Option<DealObject>> {
        let pool = ctx.data::<DbPool>()?;
        let deal = match DealRepository::new(pool.clone()).get(&id) {
            Ok(deal) if deal.status == DealStatus::Approved => deal,
            Ok(_) | Err(DealError::NotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(assemble_one(pool, deal)?.into()))
    }

    /// The caller's vote on a deal; always NO_VOTE for anonymous callers
    async fn my_vote(&self, ctx: &Context<'_>, deal_id: String) -> Result<MyVote> {
        let auth = ctx.data::<AuthContext>()?;
        let votes = ctx.data::<SharedReconciler>()?;
        let state = match auth.user() {
            Some(user) => {
                let row = votes.store().fetch(&DealId::new(deal_id), user).await?;
                VoteState::from_row(row)
            }
            None => VoteState::NoVote,
        };
        Ok(state.into())
    }
}
