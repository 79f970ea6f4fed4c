// Library exports for DealHub
// This allows integration tests and external code to use DealHub modules

pub mod auth;
pub mod config;
pub mod db;
pub mod deals;
pub mod error;
pub mod extractors;
pub mod graphql;
pub mod routes;
pub mod state;
pub mod voting;
