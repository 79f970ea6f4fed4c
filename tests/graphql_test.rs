mod common;

use std::sync::Arc;

use async_graphql::{Request, Variables};
use common::{approved_deal, create_test_pool, register, seed_votes, OfflineStore};
use dealhub::config::ListingConfig;
use dealhub::graphql::{build_schema, DealSchema};
use dealhub::state::{DbPool, SharedReconciler};
use dealhub::voting::{AuthContext, DynVoteStore, SqliteVoteStore, UserId, VoteReconciler};
use serde_json::json;

fn reconciler(pool: &DbPool) -> SharedReconciler {
    let store: DynVoteStore = Arc::new(SqliteVoteStore::new(pool.clone()));
    Arc::new(VoteReconciler::new(store))
}

fn offline_reconciler(pool: &DbPool) -> SharedReconciler {
    let store: DynVoteStore = Arc::new(OfflineStore::new(pool));
    Arc::new(VoteReconciler::new(store))
}

async fn execute_with(
    schema: &DealSchema,
    pool: &DbPool,
    votes: &SharedReconciler,
    auth: AuthContext,
    request: impl Into<Request>,
) -> async_graphql::Response {
    let request = request
        .into()
        .data(pool.clone())
        .data(votes.clone())
        .data(auth);
    schema.execute(request).await
}

async fn execute(
    pool: &DbPool,
    votes: &SharedReconciler,
    auth: AuthContext,
    request: impl Into<Request>,
) -> async_graphql::Response {
    let schema = build_schema(ListingConfig::default());
    execute_with(&schema, pool, votes, auth, request).await
}

const CAST_VOTE: &str = r#"
    mutation Cast($dealId: String!, $direction: VoteDirection!) {
        castVote(dealId: $dealId, direction: $direction) {
            success myVote upvotes downvotes heatScore heatTier message
        }
    }
"#;

fn cast_vote(deal_id: &str, direction: &str) -> Request {
    Request::new(CAST_VOTE).variables(Variables::from_json(json!({
        "dealId": deal_id,
        "direction": direction,
    })))
}

#[tokio::test]
async fn deals_query_lists_hottest_first() {
    let (_tmp, pool) = create_test_pool();
    let poster = register(&pool, "poster");
    let cold = approved_deal(&pool, &poster, "Cold deal");
    let hot = approved_deal(&pool, &poster, "Hot deal");
    seed_votes(&pool, &hot, 3, 0);
    seed_votes(&pool, &cold, 0, 1);
    let votes = reconciler(&pool);

    let result = execute(
        &pool,
        &votes,
        AuthContext::Anonymous,
        "{ deals { id title heatScore heatTier price postedBy } }",
    )
    .await;
    assert!(result.errors.is_empty(), "{:?}", result.errors);

    let data = result.data.into_json().unwrap();
    let deals = data["deals"].as_array().unwrap();
    assert_eq!(deals.len(), 2);
    assert_eq!(deals[0]["title"], "Hot deal");
    assert_eq!(deals[0]["heatScore"], 3);
    assert_eq!(deals[0]["heatTier"], "NEUTRAL");
    assert_eq!(deals[0]["price"], "19.99");
    assert_eq!(deals[1]["heatTier"], "COLD");
    assert_eq!(deals[1]["postedBy"], "poster");
}

#[tokio::test]
async fn deal_query_hides_unknown_ids() {
    let (_tmp, pool) = create_test_pool();
    let votes = reconciler(&pool);

    let result = execute(
        &pool,
        &votes,
        AuthContext::Anonymous,
        r#"{ deal(id: "missing") { id } }"#,
    )
    .await;
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert!(result.data.into_json().unwrap()["deal"].is_null());
}

#[tokio::test]
async fn cast_vote_toggles_and_reports_fresh_counters() {
    let (_tmp, pool) = create_test_pool();
    let poster = register(&pool, "poster");
    let voter = register(&pool, "voter");
    let deal = approved_deal(&pool, &poster, "Speaker");
    seed_votes(&pool, &deal, 5, 2);
    let votes = reconciler(&pool);
    let auth = AuthContext::SignedIn(UserId::new(&voter));

    let result = execute(&pool, &votes, auth.clone(), cast_vote(&deal, "UP")).await;
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    let data = result.data.into_json().unwrap();
    assert_eq!(
        data["castVote"],
        json!({
            "success": true,
            "myVote": "UP",
            "upvotes": 6,
            "downvotes": 2,
            "heatScore": 4,
            "heatTier": "NEUTRAL",
            "message": null,
        })
    );

    let result = execute(&pool, &votes, auth.clone(), cast_vote(&deal, "UP")).await;
    let data = result.data.into_json().unwrap();
    assert_eq!(data["castVote"]["myVote"], "NO_VOTE");
    assert_eq!(data["castVote"]["upvotes"], 5);

    let result = execute(
        &pool,
        &votes,
        auth,
        format!(r#"{{ myVote(dealId: "{}") }}"#, deal),
    )
    .await;
    assert_eq!(result.data.into_json().unwrap()["myVote"], "NO_VOTE");
}

#[tokio::test]
async fn cast_vote_requires_sign_in() {
    let (_tmp, pool) = create_test_pool();
    let poster = register(&pool, "poster");
    let deal = approved_deal(&pool, &poster, "Blender");
    let votes = reconciler(&pool);

    let result = execute(&pool, &votes, AuthContext::Anonymous, cast_vote(&deal, "DOWN")).await;
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].message, "Sign in to vote");

    let count: i64 = pool
        .get()
        .unwrap()
        .query_row("SELECT COUNT(*) FROM votes", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn deals_query_defaults_to_configured_page_size() {
    let (_tmp, pool) = create_test_pool();
    let poster = register(&pool, "poster");
    for i in 0..3 {
        approved_deal(&pool, &poster, &format!("Deal {}", i));
    }
    let votes = reconciler(&pool);
    let schema = build_schema(ListingConfig { page_size: 2 });

    let result = execute_with(
        &schema,
        &pool,
        &votes,
        AuthContext::Anonymous,
        "{ deals { id } }",
    )
    .await;
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    let data = result.data.into_json().unwrap();
    assert_eq!(data["deals"].as_array().unwrap().len(), 2);

    let result = execute_with(
        &schema,
        &pool,
        &votes,
        AuthContext::Anonymous,
        "{ deals(first: 3) { id } }",
    )
    .await;
    let data = result.data.into_json().unwrap();
    assert_eq!(data["deals"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn failed_write_reports_unchanged_counters() {
    let (_tmp, pool) = create_test_pool();
    let poster = register(&pool, "poster");
    let voter = register(&pool, "voter");
    let deal = approved_deal(&pool, &poster, "Vacuum");
    seed_votes(&pool, &deal, 5, 2);
    let votes = offline_reconciler(&pool);
    let auth = AuthContext::SignedIn(UserId::new(&voter));

    let result = execute(&pool, &votes, auth.clone(), cast_vote(&deal, "UP")).await;
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    let data = result.data.into_json().unwrap();
    assert_eq!(
        data["castVote"],
        json!({
            "success": false,
            "myVote": "NO_VOTE",
            "upvotes": 5,
            "downvotes": 2,
            "heatScore": 3,
            "heatTier": "NEUTRAL",
            "message": "Your vote could not be saved. Please try again.",
        })
    );

    let result = execute(
        &pool,
        &votes,
        auth,
        format!(r#"{{ myVote(dealId: "{}") }}"#, deal),
    )
    .await;
    assert_eq!(result.data.into_json().unwrap()["myVote"], "NO_VOTE");
}
