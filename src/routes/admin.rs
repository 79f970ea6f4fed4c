use askama::Template;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::db::models::{Category, DealStatus, Shop};
use crate::deals::{assemble, Catalog, DealCard, DealRepository};
use crate::error::{AppError, AppResult};
use crate::extractors::{AdminUser, CurrentUser};
use crate::routes::home::{Html, PageMeta};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/admin.html")]
pub struct AdminTemplate {
    pub meta: PageMeta,
    pub viewer: Option<CurrentUser>,
    pub pending: Vec<DealCard>,
    pub categories: Vec<Category>,
    pub shops: Vec<Shop>,
}

#[derive(Deserialize)]
pub struct StatusForm {
    pub status: String,
}

#[derive(Deserialize)]
pub struct CategoryForm {
    pub name: String,
}

#[derive(Deserialize)]
pub struct ShopForm {
    pub name: String,
    #[serde(default)]
    pub website: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/deals/{id}/status", post(set_status))
        .route("/admin/deals/{id}/delete", post(delete_deal))
        .route("/admin/categories", post(create_category))
        .route("/admin/categories/{id}/delete", post(delete_category))
        .route("/admin/shops", post(create_shop))
        .route("/admin/shops/{id}/delete", post(delete_shop))
}

fn back() -> Response {
    Redirect::to("/admin").into_response()
}

async fn dashboard(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
) -> AppResult<Response> {
    let repo = DealRepository::new(state.db.clone());
    let catalog = Catalog::new(state.db.clone());

    Ok(Html(AdminTemplate {
        meta: PageMeta::new(&state.config, "Moderation", "/admin"),
        viewer: Some(user),
        pending: assemble(&state.db, repo.pending()?)?,
        categories: catalog.categories()?,
        shops: catalog.shops()?,
    })
    .into_response())
}

async fn set_status(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> AppResult<Response> {
    let status: DealStatus = form
        .status
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Unknown status '{}'", form.status)))?;

    DealRepository::new(state.db.clone()).set_status(&id, status)?;
    tracing::info!("{} set deal {} to {}", user.username, id, status);
    Ok(back())
}

async fn delete_deal(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    DealRepository::new(state.db.clone()).delete(&id)?;
    tracing::info!("{} deleted deal {}", user.username, id);
    Ok(back())
}

async fn create_category(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Form(form): Form<CategoryForm>,
) -> AppResult<Response> {
    Catalog::new(state.db.clone()).create_category(&form.name)?;
    Ok(back())
}

async fn delete_category(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    Catalog::new(state.db.clone()).delete_category(&id)?;
    Ok(back())
}

async fn create_shop(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Form(form): Form<ShopForm>,
) -> AppResult<Response> {
    Catalog::new(state.db.clone()).create_shop(&form.name, form.website.as_deref())?;
    Ok(back())
}

async fn delete_shop(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    Catalog::new(state.db.clone()).delete_shop(&id)?;
    Ok(back())
}
