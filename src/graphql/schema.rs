use async_graphql::{EmptySubscription, Schema};

use crate::config::ListingConfig;

use super::mutations::MutationRoot;
use super::queries::QueryRoot;

/// GraphQL Schema type
pub type DealSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the GraphQL schema. Listing settings are schema-wide; per-request
/// data (pool, reconciler, auth) is attached by the HTTP handler.
pub fn build_schema(listing: ListingConfig) -> DealSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(listing)
        .finish()
}
