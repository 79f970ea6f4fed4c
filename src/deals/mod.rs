pub mod assemble;
pub mod catalog;
pub mod new_deal;
pub mod repository;

use thiserror::Error;

pub use assemble::{assemble, assemble_one, DealCard};
pub use catalog::{slugify, Catalog};
pub use new_deal::{discount_percent, format_cents, parse_price, NewDeal, NewDealForm};
pub use repository::{aggregate_of, DealFilter, DealRepository, DealSort};

#[derive(Debug, Error)]
pub enum DealError {
    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Invalid(String),

    #[error("Database error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),
}
