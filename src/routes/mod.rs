pub mod admin;
pub mod assets;
pub mod auth;
pub mod deals;
pub mod graphql;
pub mod home;
pub mod root;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The whole HTTP surface.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::index))
        .route("/assets/{*path}", get(assets::serve))
        .route("/deals", post(deals::create))
        .route("/deals/new", get(deals::new_page))
        .route("/deals/{id}", get(deals::show))
        .route("/deals/{id}/vote", post(deals::vote))
        .route("/deals/{id}/comments", post(deals::add_comment))
        .route("/comments/{id}", delete(deals::delete_comment))
        .route("/users/{username}", get(deals::user_page))
        .merge(auth::router())
        .merge(admin::router())
        .merge(root::router())
        .merge(graphql::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
