use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::deals::DealError;
use crate::voting::{StoreError, VoteError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Vote store error: {0}")]
    VoteStore(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DealError> for AppError {
    fn from(err: DealError) -> Self {
        match err {
            DealError::NotFound => AppError::NotFound,
            DealError::Invalid(msg) => AppError::BadRequest(msg),
            DealError::Pool(e) => AppError::Pool(e),
            DealError::Sql(e) => AppError::Database(e),
        }
    }
}

impl From<VoteError> for AppError {
    fn from(err: VoteError) -> Self {
        match err {
            VoteError::Unauthenticated => AppError::Unauthorized,
            VoteError::Persistence(e) => AppError::VoteStore(e),
        }
    }
}

fn internal(kind: &str, err: &dyn std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("{} error: {}", kind, err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Database(e) => internal("Database", e),
            AppError::Pool(e) => internal("Pool", e),
            AppError::Internal(msg) => internal("Internal", msg),
            AppError::VoteStore(e) => {
                tracing::warn!("Vote store error: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Please try again".to_string(),
                )
            }
        };

        let mut response = (status, message).into_response();
        // htmx follows this header, sending signed-out users to the login page
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert("HX-Redirect", HeaderValue::from_static("/auth/login"));
        }
        if matches!(self, AppError::VoteStore(_)) {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn response_status(err: AppError) -> StatusCode {
        let response = err.into_response();
        response.status()
    }

    #[test]
    fn not_found_returns_404() {
        assert_eq!(response_status(AppError::NotFound), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unauthorized_returns_401_with_login_redirect() {
        let response = AppError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["HX-Redirect"], "/auth/login");
    }

    #[test]
    fn forbidden_returns_403() {
        assert_eq!(response_status(AppError::Forbidden), StatusCode::FORBIDDEN);
    }

    #[test]
    fn bad_request_returns_400() {
        assert_eq!(
            response_status(AppError::BadRequest("oops".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn internal_returns_500() {
        assert_eq!(
            response_status(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn vote_errors_map_to_transient_statuses() {
        assert_eq!(
            response_status(VoteError::Unauthenticated.into()),
            StatusCode::UNAUTHORIZED
        );
        let response =
            AppError::from(VoteError::Persistence(StoreError::Unavailable("down".into())))
                .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
    }

    #[test]
    fn deal_errors_map_to_http() {
        assert_eq!(
            response_status(DealError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            response_status(DealError::Invalid("bad".into()).into()),
            StatusCode::BAD_REQUEST
        );
    }
}
