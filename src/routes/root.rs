use askama::Template;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::{Deserialize, Serialize};

use crate::auth::accounts;
use crate::db::models::{Profile, Role};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, RootUser};
use crate::routes::home::{Html, PageMeta};
use crate::state::{AppState, DbPool};

/// Site-wide counts for the root dashboard.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SiteStats {
    pub users: i64,
    pub approved_deals: i64,
    pub pending_deals: i64,
    pub votes: i64,
    pub comments: i64,
}

pub fn site_stats(pool: &DbPool) -> AppResult<SiteStats> {
    let conn = pool.get()?;
    let stats = conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM users),
            (SELECT COUNT(*) FROM deals WHERE status = 'approved'),
            (SELECT COUNT(*) FROM deals WHERE status = 'pending'),
            (SELECT COUNT(*) FROM votes),
            (SELECT COUNT(*) FROM comments)",
        [],
        |row| {
            Ok(SiteStats {
                users: row.get(0)?,
                approved_deals: row.get(1)?,
                pending_deals: row.get(2)?,
                votes: row.get(3)?,
                comments: row.get(4)?,
            })
        },
    )?;
    Ok(stats)
}

#[derive(Template)]
#[template(path = "pages/root.html")]
pub struct RootTemplate {
    pub meta: PageMeta,
    pub viewer: Option<CurrentUser>,
    pub me: String,
    pub users: Vec<Profile>,
    pub stats: SiteStats,
}

#[derive(Deserialize)]
pub struct RoleForm {
    pub role: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/root", get(dashboard))
        .route("/root/users/{id}/role", post(set_role))
}

async fn dashboard(State(state): State<AppState>, RootUser(user): RootUser) -> AppResult<Response> {
    Ok(Html(RootTemplate {
        meta: PageMeta::new(&state.config, "Site administration", "/root"),
        me: user.id.clone(),
        viewer: Some(user),
        users: accounts::list_users(&state.db)?,
        stats: site_stats(&state.db)?,
    })
    .into_response())
}

async fn set_role(
    State(state): State<AppState>,
    RootUser(user): RootUser,
    Path(id): Path<String>,
    Form(form): Form<RoleForm>,
) -> AppResult<Response> {
    let role: Role = form
        .role
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Unknown role '{}'", form.role)))?;
    accounts::set_role(&state.db, &user.id, &id, role)?;
    Ok(Redirect::to("/root").into_response())
}
