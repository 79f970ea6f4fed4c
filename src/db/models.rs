use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raised when a stored column holds a value outside its domain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {column} value: {value}")]
pub struct InvalidColumn {
    pub column: &'static str,
    pub value: String,
}

impl InvalidColumn {
    pub fn new(column: &'static str, value: impl Into<String>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

/// Converts a parse failure inside a rusqlite row mapper into a row error.
pub fn column_error(idx: usize, err: InvalidColumn) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Root,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Root => "root",
        }
    }

    /// Admins and root admins can both moderate.
    pub fn can_moderate(&self) -> bool {
        matches!(self, Role::Admin | Role::Root)
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Role::Root)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = InvalidColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "root" => Ok(Role::Root),
            other => Err(InvalidColumn::new("role", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealStatus::Pending => "pending",
            DealStatus::Approved => "approved",
            DealStatus::Rejected => "rejected",
            DealStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DealStatus {
    type Err = InvalidColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DealStatus::Pending),
            "approved" => Ok(DealStatus::Approved),
            "rejected" => Ok(DealStatus::Rejected),
            "expired" => Ok(DealStatus::Expired),
            other => Err(InvalidColumn::new("status", other)),
        }
    }
}

/// Public part of a user row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub created_at: String,
}

impl Profile {
    pub fn shown_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shop {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: String,
    pub user_id: String,
    pub category_id: Option<String>,
    pub shop_id: Option<String>,
    pub title: String,
    pub description: String,
    pub url: String,
    pub image_url: Option<String>,
    pub coupon_code: Option<String>,
    pub price_cents: i64,
    pub original_price_cents: Option<i64>,
    pub discount_percent: Option<i64>,
    pub status: DealStatus,
    pub upvotes: i64,
    pub downvotes: i64,
    pub heat_score: i64,
    pub expires_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub deal_id: String,
    pub user_id: String,
    pub body: String,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_column_text() {
        for role in [Role::User, Role::Admin, Role::Root] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = "superuser".parse::<Role>().unwrap_err();
        assert_eq!(err.column, "role");
        assert_eq!(err.value, "superuser");
    }

    #[test]
    fn only_admins_and_root_moderate() {
        assert!(!Role::User.can_moderate());
        assert!(Role::Admin.can_moderate());
        assert!(Role::Root.can_moderate());
        assert!(!Role::Admin.is_root());
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("live".parse::<DealStatus>().is_err());
        assert_eq!("expired".parse::<DealStatus>().unwrap(), DealStatus::Expired);
    }

    #[test]
    fn shown_name_prefers_display_name() {
        let mut profile = Profile {
            id: "u1".into(),
            username: "alice".into(),
            display_name: None,
            avatar_url: None,
            role: Role::User,
            created_at: "2025-01-01 00:00:00".into(),
        };
        assert_eq!(profile.shown_name(), "alice");
        profile.display_name = Some("Alice A.".into());
        assert_eq!(profile.shown_name(), "Alice A.");
    }
}
