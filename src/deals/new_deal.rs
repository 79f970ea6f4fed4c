use serde::Deserialize;

use crate::deals::DealError;

const MAX_TITLE_CHARS: usize = 200;
const MAX_DESCRIPTION_CHARS: usize = 5000;
/// Upper bound for any price field: 10 million in the listing currency.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

/// Raw form input for posting a deal.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewDealForm {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    pub price: String,
    #[serde(default)]
    pub original_price: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub shop_id: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// A deal that passed validation and is ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDeal {
    pub title: String,
    pub description: String,
    pub url: String,
    pub image_url: Option<String>,
    pub coupon_code: Option<String>,
    pub price_cents: i64,
    pub original_price_cents: Option<i64>,
    pub discount_percent: Option<i64>,
    pub category_id: Option<String>,
    pub shop_id: Option<String>,
    pub expires_at: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn is_web_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

impl NewDealForm {
    pub fn validate(self) -> Result<NewDeal, DealError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(DealError::Invalid("Title is required".into()));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(DealError::Invalid(format!(
                "Title must be {} characters or less",
                MAX_TITLE_CHARS
            )));
        }

        let description = self.description.trim().to_string();
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(DealError::Invalid(format!(
                "Description must be {} characters or less",
                MAX_DESCRIPTION_CHARS
            )));
        }

        let url = self.url.trim().to_string();
        if !is_web_url(&url) {
            return Err(DealError::Invalid(
                "Deal link must start with http:// or https://".into(),
            ));
        }

        let image_url = non_empty(self.image_url);
        if image_url.as_deref().is_some_and(|u| !is_web_url(u)) {
            return Err(DealError::Invalid(
                "Image link must start with http:// or https://".into(),
            ));
        }

        let price_cents = parse_price(&self.price)?;
        let original_price_cents = non_empty(self.original_price)
            .map(|p| parse_price(&p))
            .transpose()?;
        if let Some(original) = original_price_cents {
            if original < price_cents {
                return Err(DealError::Invalid(
                    "Original price cannot be lower than the deal price".into(),
                ));
            }
        }

        let expires_at = non_empty(self.expires_at);
        if let Some(ref date) = expires_at {
            chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                DealError::Invalid("Expiry date must look like 2025-12-31".into())
            })?;
        }

        Ok(NewDeal {
            title,
            description,
            url,
            image_url,
            coupon_code: non_empty(self.coupon_code),
            price_cents,
            original_price_cents,
            discount_percent: discount_percent(price_cents, original_price_cents),
            category_id: non_empty(self.category_id),
            shop_id: non_empty(self.shop_id),
            expires_at,
        })
    }
}

/// Parse "12", "12.5" or "12.99" into cents.
pub fn parse_price(raw: &str) -> Result<i64, DealError> {
    let invalid = || DealError::Invalid(format!("Invalid price: {}", raw.trim()));
    let cleaned = raw.trim().trim_start_matches(['$', '€', '£']).trim();

    let (whole, frac) = match cleaned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (cleaned, ""),
    };
    if whole.is_empty() || frac.len() > 2 {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole: i64 = whole.parse().map_err(|_| invalid())?;
    let frac: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
        _ => frac.parse().map_err(|_| invalid())?,
    };

    let cents = whole
        .checked_mul(100)
        .and_then(|c| c.checked_add(frac))
        .ok_or_else(invalid)?;
    if cents > MAX_PRICE_CENTS {
        return Err(DealError::Invalid(format!(
            "Price must be at most {}",
            format_cents(MAX_PRICE_CENTS)
        )));
    }
    Ok(cents)
}

/// Percent saved, rounded to the nearest whole percent.
pub fn discount_percent(price_cents: i64, original_cents: Option<i64>) -> Option<i64> {
    let original = i128::from(original_cents.filter(|o| *o > 0)?);
    let saved = original - i128::from(price_cents);
    i64::try_from((saved * 100 + original / 2) / original).ok()
}

/// "12.50" style rendering of a cent amount.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
