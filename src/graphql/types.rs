use async_graphql::*;

use crate::deals::{format_cents, DealCard};
use crate::voting::{DealAggregate, HeatTier, VoteAction, VoteState, VoteView};

/// An approved deal as exposed over the API
#[derive(Clone, Debug, SimpleObject)]
#[graphql(complex)]
pub struct DealObject {
    pub id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub image_url: Option<String>,
    pub coupon_code: Option<String>,

    /// Price in minor units (cents)
    pub price_cents: i64,
    pub original_price_cents: Option<i64>,
    pub discount_percent: Option<i64>,

    pub upvotes: i64,
    pub downvotes: i64,

    /// Maintained by the database; never computed client-side
    pub heat_score: i64,

    pub category: Option<String>,
    pub shop: Option<String>,
    pub posted_by: String,
    pub expires_at: Option<String>,
    pub created_at: String,
}

#[ComplexObject]
impl DealObject {
    async fn heat_tier(&self) -> HeatTier {
        HeatTier::from_score(self.heat_score)
    }

    /// Formatted price, e.g. "19.99"
    async fn price(&self) -> String {
        format_cents(self.price_cents)
    }
}

impl From<DealCard> for DealObject {
    fn from(card: DealCard) -> Self {
        let posted_by = card.poster_name().to_string();
        let deal = card.deal;
        Self {
            id: deal.id,
            title: deal.title,
            description: deal.description,
            url: deal.url,
            image_url: deal.image_url,
            coupon_code: deal.coupon_code,
            price_cents: deal.price_cents,
            original_price_cents: deal.original_price_cents,
            discount_percent: deal.discount_percent,
            upvotes: deal.upvotes,
            downvotes: deal.downvotes,
            heat_score: deal.heat_score,
            category: card.category.map(|c| c.name),
            shop: card.shop.map(|s| s.name),
            posted_by,
            expires_at: deal.expires_at,
            created_at: deal.created_at,
        }
    }
}

#[derive(Clone, Copy, Debug, Enum, Eq, PartialEq)]
pub enum VoteDirection {
    Up,
    Down,
}

impl From<VoteDirection> for VoteAction {
    fn from(direction: VoteDirection) -> Self {
        match direction {
            VoteDirection::Up => VoteAction::CastUp,
            VoteDirection::Down => VoteAction::CastDown,
        }
    }
}

/// The caller's own vote on a deal
#[derive(Clone, Copy, Debug, Enum, Eq, PartialEq)]
pub enum MyVote {
    NoVote,
    Up,
    Down,
}

impl From<VoteState> for MyVote {
    fn from(state: VoteState) -> Self {
        match state {
            VoteState::NoVote => MyVote::NoVote,
            VoteState::VotedUp => MyVote::Up,
            VoteState::VotedDown => MyVote::Down,
        }
    }
}

/// Result of castVote. A failed write still returns the unchanged counters.
#[derive(Clone, Debug, SimpleObject)]
pub struct VotePayload {
    pub success: bool,
    pub deal_id: String,
    /// Null when the caller's vote could not be read.
    pub my_vote: Option<MyVote>,
    pub upvotes: i64,
    pub downvotes: i64,
    pub heat_score: i64,
    pub heat_tier: HeatTier,
    pub message: Option<String>,
}

impl VotePayload {
    pub fn confirmed(deal_id: String, state: VoteState, fresh: DealAggregate) -> Self {
        Self {
            success: true,
            deal_id,
            my_vote: Some(state.into()),
            upvotes: fresh.upvotes,
            downvotes: fresh.downvotes,
            heat_score: fresh.heat_score,
            heat_tier: HeatTier::from_score(fresh.heat_score),
            message: None,
        }
    }

    pub fn failed(view: VoteView, message: String) -> Self {
        Self {
            success: false,
            deal_id: view.deal_id.to_string(),
            my_vote: view.known_state().map(MyVote::from),
            upvotes: view.counters.upvotes,
            downvotes: view.counters.downvotes,
            heat_score: view.heat_score,
            heat_tier: view.heat_tier(),
            message: Some(message),
        }
    }
}
