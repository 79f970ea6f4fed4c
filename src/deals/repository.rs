use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{column_error, Comment, Deal, DealStatus};
use crate::deals::new_deal::NewDeal;
use crate::deals::DealError;
use crate::state::DbPool;
use crate::voting::DealAggregate;

const DEAL_COLUMNS: &str = "id, user_id, category_id, shop_id, title, description, url, \
     image_url, coupon_code, price_cents, original_price_cents, discount_percent, status, \
     upvotes, downvotes, heat_score, expires_at, created_at";

const MAX_COMMENT_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DealSort {
    #[default]
    Hot,
    New,
}

impl DealSort {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("new") => DealSort::New,
            _ => DealSort::Hot,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DealSort::Hot => "hot",
            DealSort::New => "new",
        }
    }

    fn order_by(&self) -> &'static str {
        match self {
            DealSort::Hot => "d.heat_score DESC, d.created_at DESC",
            DealSort::New => "d.created_at DESC, d.id DESC",
        }
    }
}

/// Listing criteria. Only approved deals are ever listed publicly.
#[derive(Debug, Clone, Default)]
pub struct DealFilter {
    pub category_slug: Option<String>,
    pub shop_slug: Option<String>,
    pub search: Option<String>,
    pub sort: DealSort,
    pub limit: u32,
    pub offset: u32,
}

pub(crate) fn deal_from_row(row: &Row<'_>) -> rusqlite::Result<Deal> {
    let status: String = row.get(12)?;
    Ok(Deal {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category_id: row.get(2)?,
        shop_id: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        url: row.get(6)?,
        image_url: row.get(7)?,
        coupon_code: row.get(8)?,
        price_cents: row.get(9)?,
        original_price_cents: row.get(10)?,
        discount_percent: row.get(11)?,
        status: status.parse::<DealStatus>().map_err(|e| column_error(12, e))?,
        upvotes: row.get(13)?,
        downvotes: row.get(14)?,
        heat_score: row.get(15)?,
        expires_at: row.get(16)?,
        created_at: row.get(17)?,
    })
}

/// The vote counters as stored on the deal row.
pub fn aggregate_of(deal: &Deal) -> DealAggregate {
    DealAggregate {
        upvotes: deal.upvotes,
        downvotes: deal.downvotes,
        heat_score: deal.heat_score,
    }
}

fn prefixed_columns() -> String {
    DEAL_COLUMNS
        .split(", ")
        .map(|c| format!("d.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Deals, their moderation status and their comments.
#[derive(Clone)]
pub struct DealRepository {
    pool: DbPool,
}

impl DealRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn list(&self, filter: &DealFilter) -> Result<Vec<Deal>, DealError> {
        let conn = self.pool.get()?;
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.replace('%', "").replace('_', "")));

        let sql = format!(
            "SELECT {} FROM deals d
             LEFT JOIN categories c ON c.id = d.category_id
             LEFT JOIN shops s ON s.id = d.shop_id
             WHERE d.status = 'approved'
               AND (?1 IS NULL OR c.slug = ?1)
               AND (?2 IS NULL OR s.slug = ?2)
               AND (?3 IS NULL OR d.title LIKE ?3 OR d.description LIKE ?3)
             ORDER BY {}
             LIMIT ?4 OFFSET ?5",
            prefixed_columns(),
            filter.sort.order_by()
        );

        let mut stmt = conn.prepare(&sql)?;
        let deals = stmt
            .query_map(
                params![
                    filter.category_slug,
                    filter.shop_slug,
                    search,
                    filter.limit,
                    filter.offset
                ],
                deal_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(deals)
    }

    /// Deals awaiting moderation, oldest first.
    pub fn pending(&self) -> Result<Vec<Deal>, DealError> {
        self.by_status(DealStatus::Pending, "created_at ASC")
    }

    pub fn by_user(&self, user_id: &str) -> Result<Vec<Deal>, DealError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM deals WHERE user_id = ?1 ORDER BY created_at DESC",
            DEAL_COLUMNS
        ))?;
        let deals = stmt
            .query_map(params![user_id], deal_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(deals)
    }

    fn by_status(&self, status: DealStatus, order: &str) -> Result<Vec<Deal>, DealError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM deals WHERE status = ?1 ORDER BY {}",
            DEAL_COLUMNS, order
        ))?;
        let deals = stmt
            .query_map(params![status.as_str()], deal_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(deals)
    }

    pub fn get(&self, id: &str) -> Result<Deal, DealError> {
        let conn = self.pool.get()?;
        conn.query_row(
            &format!("SELECT {} FROM deals WHERE id = ?1", DEAL_COLUMNS),
            params![id],
            deal_from_row,
        )
        .optional()?
        .ok_or(DealError::NotFound)
    }

    /// Fresh counters from the deal record.
    pub fn aggregate(&self, id: &str) -> Result<DealAggregate, DealError> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT upvotes, downvotes, heat_score FROM deals WHERE id = ?1",
            params![id],
            |row| {
                Ok(DealAggregate {
                    upvotes: row.get(0)?,
                    downvotes: row.get(1)?,
                    heat_score: row.get(2)?,
                })
            },
        )
        .optional()?
        .ok_or(DealError::NotFound)
    }

    pub fn create(&self, user_id: &str, deal: &NewDeal) -> Result<String, DealError> {
        let conn = self.pool.get()?;
        ensure_exists(&conn, "categories", deal.category_id.as_deref(), "Unknown category")?;
        ensure_exists(&conn, "shops", deal.shop_id.as_deref(), "Unknown shop")?;

        let id = uuid::Uuid::now_v7().to_string();
        conn.execute(
            "INSERT INTO deals (id, user_id, category_id, shop_id, title, description, url,
                                image_url, coupon_code, price_cents, original_price_cents,
                                discount_percent, expires_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 'pending')",
            params![
                id,
                user_id,
                deal.category_id,
                deal.shop_id,
                deal.title,
                deal.description,
                deal.url,
                deal.image_url,
                deal.coupon_code,
                deal.price_cents,
                deal.original_price_cents,
                deal.discount_percent,
                deal.expires_at,
            ],
        )?;

        tracing::info!("Deal {} posted by {}", id, user_id);
        Ok(id)
    }

    pub fn set_status(&self, id: &str, status: DealStatus) -> Result<(), DealError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE deals SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        if rows == 0 {
            return Err(DealError::NotFound);
        }
        tracing::info!("Deal {} marked {}", id, status);
        Ok(())
    }

    /// Approved deals whose expiry date has passed become `expired`.
    pub fn expire_past_due(&self) -> Result<usize, DealError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE deals SET status = 'expired'
             WHERE status = 'approved' AND expires_at IS NOT NULL
               AND expires_at < date('now')",
            [],
        )?;
        Ok(rows)
    }

    pub fn delete(&self, id: &str) -> Result<(), DealError> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM deals WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(DealError::NotFound);
        }
        Ok(())
    }

    pub fn comments(&self, deal_id: &str) -> Result<Vec<Comment>, DealError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, deal_id, user_id, body, created_at FROM comments
             WHERE deal_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let comments = stmt
            .query_map(params![deal_id], |row| {
                Ok(Comment {
                    id: row.get(0)?,
                    deal_id: row.get(1)?,
                    user_id: row.get(2)?,
                    body: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    pub fn add_comment(
        &self,
        deal_id: &str,
        user_id: &str,
        body: &str,
    ) -> Result<Comment, DealError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(DealError::Invalid("Comment cannot be empty".into()));
        }
        if body.chars().count() > MAX_COMMENT_CHARS {
            return Err(DealError::Invalid(format!(
                "Comment must be {} characters or less",
                MAX_COMMENT_CHARS
            )));
        }

        let conn = self.pool.get()?;
        match ensure_exists(&conn, "deals", Some(deal_id), "Unknown deal") {
            Err(DealError::Invalid(_)) => return Err(DealError::NotFound),
            other => other?,
        }

        let id = uuid::Uuid::now_v7().to_string();
        conn.execute(
            "INSERT INTO comments (id, deal_id, user_id, body) VALUES (?1, ?2, ?3, ?4)",
            params![id, deal_id, user_id, body],
        )?;

        let comment = conn.query_row(
            "SELECT id, deal_id, user_id, body, created_at FROM comments WHERE id = ?1",
            params![id],
            |row| {
                Ok(Comment {
                    id: row.get(0)?,
                    deal_id: row.get(1)?,
                    user_id: row.get(2)?,
                    body: row.get(3)?,
                    created_at: row.get(4)?,
                })
            },
        )?;
        Ok(comment)
    }

    /// Owner of a comment, for permission checks.
    pub fn comment_owner(&self, comment_id: &str) -> Result<String, DealError> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT user_id FROM comments WHERE id = ?1",
            params![comment_id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or(DealError::NotFound)
    }

    pub fn delete_comment(&self, comment_id: &str) -> Result<(), DealError> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM comments WHERE id = ?1", params![comment_id])?;
        if rows == 0 {
            return Err(DealError::NotFound);
        }
        Ok(())
    }
}

fn ensure_exists(
    conn: &Connection,
    table: &str,
    id: Option<&str>,
    message: &str,
) -> Result<(), DealError> {
    let Some(id) = id else {
        return Ok(());
    };
    let exists: bool = conn.query_row(
        &format!("SELECT COUNT(*) > 0 FROM {} WHERE id = ?1", table),
        params![id],
        |r| r.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(DealError::Invalid(message.to_string()))
    }
}
