use askama::Template;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use crate::auth::{accounts, session};
use crate::error::{AppError, AppResult};
use crate::extractors::{extract_session_token, MaybeUser};
use crate::routes::home::{Html, PageMeta};
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/signup.html")]
pub struct SignupTemplate {
    pub meta: PageMeta,
    pub viewer: Option<crate::extractors::CurrentUser>,
    pub username: String,
    pub display_name: String,
    pub first_account: bool,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub meta: PageMeta,
    pub viewer: Option<crate::extractors::CurrentUser>,
    pub username: String,
    pub allow_signup: bool,
    pub error: Option<String>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Set the session cookie and send the browser home.
fn signed_in(state: &AppState, user_id: &str) -> AppResult<Response> {
    let hours = state.config.auth.session_hours;
    let token = session::create_session(&state.db, user_id, hours)?;
    let cookie = session::session_cookie(&state.config.auth.cookie_name, &token, hours);
    Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), Redirect::to("/")).into_response())
}

// -- Sign up --

pub async fn signup_page(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
) -> AppResult<Response> {
    if maybe_user.0.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    let first_account = accounts::user_count(&state.db)? == 0;
    if !first_account && !state.config.auth.allow_signup {
        return Err(AppError::Forbidden);
    }

    Ok(Html(SignupTemplate {
        meta: PageMeta::new(&state.config, "Sign up", "/auth/signup"),
        viewer: None,
        username: String::new(),
        display_name: String::new(),
        first_account,
        error: None,
    })
    .into_response())
}

pub async fn signup(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> AppResult<Response> {
    let registered = accounts::register(
        &state.db,
        &form.username,
        &form.password,
        form.display_name.as_deref(),
        state.config.auth.allow_signup,
    );

    match registered {
        Ok(profile) => signed_in(&state, &profile.id),
        Err(AppError::BadRequest(msg)) => {
            let page = SignupTemplate {
                meta: PageMeta::new(&state.config, "Sign up", "/auth/signup"),
                viewer: None,
                username: form.username,
                display_name: form.display_name.unwrap_or_default(),
                first_account: accounts::user_count(&state.db)? == 0,
                error: Some(msg),
            };
            Ok((StatusCode::BAD_REQUEST, Html(page)).into_response())
        }
        Err(e) => Err(e),
    }
}

// -- Login --

pub async fn login_page(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
) -> AppResult<Response> {
    if maybe_user.0.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    // Nobody to log in as yet
    if accounts::user_count(&state.db)? == 0 {
        return Ok(Redirect::to("/auth/signup").into_response());
    }

    Ok(Html(LoginTemplate {
        meta: PageMeta::new(&state.config, "Log in", "/auth/login"),
        viewer: None,
        username: String::new(),
        allow_signup: state.config.auth.allow_signup,
        error: None,
    })
    .into_response())
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    match accounts::authenticate(&state.db, &form.username, &form.password)? {
        Some(profile) => {
            tracing::info!("User {} logged in", profile.username);
            signed_in(&state, &profile.id)
        }
        None => {
            tracing::debug!("Failed login for {}", form.username);
            let page = LoginTemplate {
                meta: PageMeta::new(&state.config, "Log in", "/auth/login"),
                viewer: None,
                username: form.username,
                allow_signup: state.config.auth.allow_signup,
                error: Some("Wrong username or password".into()),
            };
            Ok((StatusCode::UNAUTHORIZED, Html(page)).into_response())
        }
    }
}

// -- Logout --

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let cookie_name = &state.config.auth.cookie_name;
    if let Some(token) = extract_session_token(&headers, cookie_name) {
        session::delete_session(&state.db, token)?;
    }

    Ok((
        AppendHeaders([(header::SET_COOKIE, session::clear_session_cookie(cookie_name))]),
        Redirect::to("/"),
    )
        .into_response())
}
