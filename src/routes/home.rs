use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::config::Config;
use crate::db::models::Category;
use crate::deals::{assemble, Catalog, DealFilter, DealRepository, DealSort};
use crate::error::AppResult;
use crate::extractors::{CurrentUser, MaybeUser};
use crate::routes::deals::{vote_bars, ListedDeal};
use crate::state::AppState;

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// SEO metadata rendered into every page head.
#[derive(Debug, Clone)]
pub struct PageMeta {
    pub site_name: String,
    pub title: String,
    pub description: String,
    pub canonical: String,
}

impl PageMeta {
    pub fn new(config: &Config, title: impl Into<String>, path: &str) -> Self {
        Self {
            site_name: config.site.name.clone(),
            title: title.into(),
            description: config.site.description.clone(),
            canonical: config.absolute_url(path),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        let description: String = description.into();
        if !description.trim().is_empty() {
            self.description = truncate(description.trim(), 160);
        }
        self
    }

    pub fn full_title(&self) -> String {
        if self.title.is_empty() || self.title == self.site_name {
            self.site_name.clone()
        } else {
            format!("{} · {}", self.title, self.site_name)
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars - 1).collect();
    format!("{}…", cut.trim_end())
}

/// Deepest listing page served. Requests beyond it get an empty page.
pub const MAX_PAGE: u32 = 10_000;

#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub sort: Option<String>,
    pub category: Option<String>,
    pub shop: Option<String>,
    pub q: Option<String>,
    pub page: Option<u32>,
}

impl ListingQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }
}

/// Row window for a page, fetching one extra row to detect a next page.
fn page_window(page: u32, page_size: u32) -> (u32, u32) {
    let limit = page_size.saturating_add(1);
    let offset = page.saturating_sub(1).saturating_mul(page_size);
    (limit, offset)
}

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub meta: PageMeta,
    pub viewer: Option<CurrentUser>,
    pub deals: Vec<ListedDeal>,
    pub categories: Vec<Category>,
    pub sort: &'static str,
    pub category: String,
    pub search: String,
    pub page: u32,
    pub has_more: bool,
}

impl HomeTemplate {
    fn page_link(&self, page: u32) -> String {
        let mut link = format!("/?sort={}&page={}", self.sort, page);
        if !self.category.is_empty() {
            link.push_str(&format!("&category={}", self.category));
        }
        link
    }

    pub fn next_link(&self) -> String {
        self.page_link(self.page.saturating_add(1).min(MAX_PAGE))
    }

    pub fn prev_link(&self) -> String {
        self.page_link(self.page.saturating_sub(1).max(1))
    }
}

pub async fn index(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Query(query): Query<ListingQuery>,
) -> AppResult<Response> {
    let page_size = state.config.listing.page_size;
    let page = query.page();
    let (limit, offset) = page_window(page, page_size);
    let sort = DealSort::parse(query.sort.as_deref());
    let category = query.category.filter(|c| !c.is_empty());

    let repo = DealRepository::new(state.db.clone());
    let mut deals = repo.list(&DealFilter {
        category_slug: category.clone(),
        shop_slug: query.shop.filter(|s| !s.is_empty()),
        search: query.q.clone(),
        sort,
        limit,
        offset,
    })?;
    let has_more = page < MAX_PAGE && deals.len() > page_size as usize;
    deals.truncate(page_size as usize);

    let cards = assemble(&state.db, deals)?;
    let deals = vote_bars(&state, &maybe_user.auth_context(), cards).await;
    let categories = Catalog::new(state.db.clone()).categories()?;

    let (title, path) = match category
        .as_deref()
        .and_then(|slug| categories.iter().find(|c| c.slug == slug))
    {
        Some(c) => (format!("{} deals", c.name), format!("/?category={}", c.slug)),
        None => (state.config.site.name.clone(), "/".to_string()),
    };

    Ok(Html(HomeTemplate {
        meta: PageMeta::new(&state.config, title, &path),
        viewer: maybe_user.0,
        deals,
        categories,
        sort: sort.as_str(),
        category: category.unwrap_or_default(),
        search: query.q.unwrap_or_default(),
        page,
        has_more,
    })
    .into_response())
}
