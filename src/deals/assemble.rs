// Deal -> category -> shop -> poster profile, stitched together in Rust
use rusqlite::{params_from_iter, Connection};
use std::collections::{HashMap, HashSet};

use crate::db::models::{column_error, Category, Deal, Profile, Role, Shop};
use crate::deals::new_deal::format_cents;
use crate::deals::DealError;
use crate::state::DbPool;
use crate::voting::HeatTier;

/// A deal with everything a card or detail page shows about it.
#[derive(Debug, Clone)]
pub struct DealCard {
    pub deal: Deal,
    pub category: Option<Category>,
    pub shop: Option<Shop>,
    pub poster: Option<Profile>,
}

impl DealCard {
    pub fn heat_tier(&self) -> HeatTier {
        HeatTier::from_score(self.deal.heat_score)
    }

    pub fn price(&self) -> String {
        format_cents(self.deal.price_cents)
    }

    pub fn original_price(&self) -> Option<String> {
        self.deal.original_price_cents.map(format_cents)
    }

    pub fn poster_name(&self) -> &str {
        self.poster
            .as_ref()
            .map(|p| p.shown_name())
            .unwrap_or("deleted user")
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn distinct<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    let set: HashSet<&str> = ids.collect();
    let mut ids: Vec<String> = set.into_iter().map(str::to_string).collect();
    ids.sort();
    ids
}

fn load_categories(
    conn: &Connection,
    ids: &[String],
) -> rusqlite::Result<HashMap<String, Category>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let mut stmt = conn.prepare(&format!(
        "SELECT id, name, slug FROM categories WHERE id IN ({})",
        placeholders(ids.len())
    ))?;
    let rows = stmt.query_map(params_from_iter(ids), |row| {
        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
            slug: row.get(2)?,
        })
    })?;
    rows.map(|r| r.map(|c| (c.id.clone(), c))).collect()
}

fn load_shops(conn: &Connection, ids: &[String]) -> rusqlite::Result<HashMap<String, Shop>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let mut stmt = conn.prepare(&format!(
        "SELECT id, name, slug, website FROM shops WHERE id IN ({})",
        placeholders(ids.len())
    ))?;
    let rows = stmt.query_map(params_from_iter(ids), |row| {
        Ok(Shop {
            id: row.get(0)?,
            name: row.get(1)?,
            slug: row.get(2)?,
            website: row.get(3)?,
        })
    })?;
    rows.map(|r| r.map(|s| (s.id.clone(), s))).collect()
}

pub(crate) fn load_profiles(
    conn: &Connection,
    ids: &[String],
) -> rusqlite::Result<HashMap<String, Profile>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let mut stmt = conn.prepare(&format!(
        "SELECT id, username, display_name, avatar_url, role, created_at
         FROM users WHERE id IN ({})",
        placeholders(ids.len())
    ))?;
    let rows = stmt.query_map(params_from_iter(ids), |row| {
        let role: String = row.get(4)?;
        Ok(Profile {
            id: row.get(0)?,
            username: row.get(1)?,
            display_name: row.get(2)?,
            avatar_url: row.get(3)?,
            role: role.parse::<Role>().map_err(|e| column_error(4, e))?,
            created_at: row.get(5)?,
        })
    })?;
    rows.map(|r| r.map(|p| (p.id.clone(), p))).collect()
}

/// Batch-load the related rows for `deals` and compose cards, preserving order.
pub fn assemble(pool: &DbPool, deals: Vec<Deal>) -> Result<Vec<DealCard>, DealError> {
    if deals.is_empty() {
        return Ok(Vec::new());
    }
    let conn = pool.get()?;

    let category_ids = distinct(deals.iter().filter_map(|d| d.category_id.as_deref()));
    let shop_ids = distinct(deals.iter().filter_map(|d| d.shop_id.as_deref()));
    let user_ids = distinct(deals.iter().map(|d| d.user_id.as_str()));

    let categories = load_categories(&conn, &category_ids)?;
    let shops = load_shops(&conn, &shop_ids)?;
    let profiles = load_profiles(&conn, &user_ids)?;

    let cards = deals
        .into_iter()
        .map(|deal| DealCard {
            category: deal
                .category_id
                .as_ref()
                .and_then(|id| categories.get(id).cloned()),
            shop: deal.shop_id.as_ref().and_then(|id| shops.get(id).cloned()),
            poster: profiles.get(&deal.user_id).cloned(),
            deal,
        })
        .collect();

    Ok(cards)
}

pub fn assemble_one(pool: &DbPool, deal: Deal) -> Result<DealCard, DealError> {
    assemble(pool, vec![deal])?
        .pop()
        .ok_or(DealError::NotFound)
}
