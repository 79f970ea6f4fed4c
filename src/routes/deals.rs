use askama::Template;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use crate::db::models::{Category, Comment, Deal, DealStatus, Shop};
use crate::deals::assemble::load_profiles;
use crate::deals::{
    aggregate_of, assemble, assemble_one, Catalog, DealCard, DealError, DealRepository, NewDealForm,
};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::routes::home::{Html, PageMeta};
use crate::state::AppState;
use crate::voting::{
    AuthContext, DealId, Notification, VoteAction, VoteError, VoteState, VoteType, VoteView,
};

// -- Templates --

/// The up/down control for one deal, also served alone as an htmx fragment.
#[derive(Template)]
#[template(path = "components/vote_bar.html")]
pub struct VoteBarTemplate {
    pub view: VoteView,
    pub notice: Option<Notification>,
    pub signed_in: bool,
}

impl VoteBarTemplate {
    pub fn up_pressed(&self) -> bool {
        self.view.state == VoteState::VotedUp
    }

    pub fn down_pressed(&self) -> bool {
        self.view.state == VoteState::VotedDown
    }
}

/// A listed deal with the viewer's vote bar.
pub struct ListedDeal {
    pub card: DealCard,
    pub vote: VoteBarTemplate,
}

pub struct CommentView {
    pub comment: Comment,
    pub author: String,
    pub can_delete: bool,
}

#[derive(Template)]
#[template(path = "components/comment.html")]
pub struct CommentTemplate {
    pub item: CommentView,
}

#[derive(Template)]
#[template(path = "pages/deal.html")]
pub struct DealTemplate {
    pub meta: PageMeta,
    pub viewer: Option<CurrentUser>,
    pub card: DealCard,
    pub vote: VoteBarTemplate,
    pub comments: Vec<CommentView>,
}

impl DealTemplate {
    pub fn is_pending(&self) -> bool {
        self.card.deal.status != DealStatus::Approved
    }
}

#[derive(Template)]
#[template(path = "pages/new_deal.html")]
pub struct NewDealTemplate {
    pub meta: PageMeta,
    pub viewer: Option<CurrentUser>,
    pub categories: Vec<Category>,
    pub shops: Vec<Shop>,
    pub form: NewDealForm,
    pub error: Option<String>,
}

impl NewDealTemplate {
    pub fn selected_category(&self, id: &str) -> bool {
        self.form.category_id.as_deref() == Some(id)
    }

    pub fn selected_shop(&self, id: &str) -> bool {
        self.form.shop_id.as_deref() == Some(id)
    }
}

#[derive(Template)]
#[template(path = "pages/user.html")]
pub struct UserTemplate {
    pub meta: PageMeta,
    pub viewer: Option<CurrentUser>,
    pub username: String,
    pub shown_name: String,
    pub deals: Vec<DealCard>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct VoteForm {
    pub direction: String,
}

#[derive(Deserialize)]
pub struct CommentForm {
    pub body: String,
}

// -- Helpers --

/// Only approved deals are public; posters and moderators also see the rest.
fn visible_to(deal: &Deal, viewer: Option<&CurrentUser>) -> bool {
    deal.status == DealStatus::Approved
        || viewer.is_some_and(|u| u.id == deal.user_id || u.can_moderate())
}

/// Load the viewer's vote bar for each card.
///
/// A vote store that cannot be read leaves the counts in place and puts a
/// notice on the affected bar.
pub async fn vote_bars(
    state: &AppState,
    auth: &AuthContext,
    cards: Vec<DealCard>,
) -> Vec<ListedDeal> {
    let mut listed = Vec::with_capacity(cards.len());
    for card in cards {
        let deal_id = DealId::new(card.deal.id.clone());
        let (view, notice) = state
            .votes
            .load_view_or_notice(auth, deal_id, aggregate_of(&card.deal))
            .await;
        listed.push(ListedDeal {
            card,
            vote: VoteBarTemplate {
                view,
                notice,
                signed_in: auth.user().is_some(),
            },
        });
    }
    listed
}

fn comment_views(
    state: &AppState,
    comments: Vec<Comment>,
    viewer: Option<&CurrentUser>,
) -> AppResult<Vec<CommentView>> {
    let mut author_ids: Vec<String> = comments.iter().map(|c| c.user_id.clone()).collect();
    author_ids.sort();
    author_ids.dedup();

    let conn = state.db.get()?;
    let profiles = load_profiles(&conn, &author_ids)?;

    Ok(comments
        .into_iter()
        .map(|comment| CommentView {
            author: profiles
                .get(&comment.user_id)
                .map(|p| p.shown_name().to_string())
                .unwrap_or_else(|| "deleted user".to_string()),
            can_delete: viewer.is_some_and(|u| u.id == comment.user_id || u.can_moderate()),
            comment,
        })
        .collect())
}

// -- Handlers --

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
    maybe_user: MaybeUser,
) -> AppResult<Response> {
    let repo = DealRepository::new(state.db.clone());
    let deal = repo.get(&id)?;
    if !visible_to(&deal, maybe_user.0.as_ref()) {
        return Err(AppError::NotFound);
    }

    let auth = maybe_user.auth_context();
    let (view, notice) = state
        .votes
        .load_view_or_notice(&auth, DealId::new(id.clone()), aggregate_of(&deal))
        .await;
    let card = assemble_one(&state.db, deal)?;
    let comments = comment_views(&state, repo.comments(&id)?, maybe_user.0.as_ref())?;

    let meta = PageMeta::new(&state.config, card.deal.title.clone(), &format!("/deals/{}", id))
        .describe(card.deal.description.clone());

    Ok(Html(DealTemplate {
        meta,
        vote: VoteBarTemplate {
            view,
            notice,
            signed_in: maybe_user.0.is_some(),
        },
        viewer: maybe_user.0,
        card,
        comments,
    })
    .into_response())
}

pub async fn new_page(State(state): State<AppState>, maybe_user: MaybeUser) -> AppResult<Response> {
    let Some(user) = maybe_user.0 else {
        return Ok(Redirect::to("/auth/login").into_response());
    };
    render_new_deal(&state, user, NewDealForm::default(), None)
}

fn render_new_deal(
    state: &AppState,
    user: CurrentUser,
    form: NewDealForm,
    error: Option<String>,
) -> AppResult<Response> {
    let catalog = Catalog::new(state.db.clone());
    let status = if error.is_some() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    let page = NewDealTemplate {
        meta: PageMeta::new(&state.config, "Post a deal", "/deals/new"),
        viewer: Some(user),
        categories: catalog.categories()?,
        shops: catalog.shops()?,
        form,
        error,
    };
    Ok((status, Html(page)).into_response())
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<NewDealForm>,
) -> AppResult<Response> {
    let new_deal = match form.clone().validate() {
        Ok(deal) => deal,
        Err(e) => return render_new_deal(&state, user, form, Some(e.to_string())),
    };

    let repo = DealRepository::new(state.db.clone());
    match repo.create(&user.id, &new_deal) {
        Ok(id) => Ok(Redirect::to(&format!("/deals/{}", id)).into_response()),
        Err(DealError::Invalid(msg)) => render_new_deal(&state, user, form, Some(msg)),
        Err(e) => Err(e.into()),
    }
}

/// Toggle the viewer's vote and return the refreshed vote bar.
pub async fn vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    maybe_user: MaybeUser,
    Form(form): Form<VoteForm>,
) -> AppResult<Response> {
    let direction: VoteType = form
        .direction
        .parse()
        .map_err(|_| AppError::BadRequest("direction must be up or down".into()))?;

    let repo = DealRepository::new(state.db.clone());
    let deal = repo.get(&id)?;
    if deal.status != DealStatus::Approved {
        return Err(AppError::NotFound);
    }

    let auth = maybe_user.auth_context();
    let outcome = state
        .votes
        .vote(
            &auth,
            DealId::new(id.clone()),
            aggregate_of(&deal),
            VoteAction::from(direction),
        )
        .await;

    let fragment = match outcome {
        Ok(outcome) => {
            // Triggers have already moved the deal's counters
            let fresh = repo.aggregate(&id)?;
            VoteBarTemplate {
                view: VoteView::new(outcome.view.deal_id, outcome.view.state, fresh),
                notice: None,
                signed_in: true,
            }
        }
        Err((VoteError::Unauthenticated, _)) => return Err(AppError::Unauthorized),
        Err((err, view)) => VoteBarTemplate {
            view,
            notice: Some(err.notification()),
            signed_in: true,
        },
    };

    Ok(Html(fragment).into_response())
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: CurrentUser,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    let repo = DealRepository::new(state.db.clone());
    let deal = repo.get(&id)?;
    if !visible_to(&deal, Some(&user)) {
        return Err(AppError::NotFound);
    }

    let comment = repo.add_comment(&id, &user.id, &form.body)?;
    let item = CommentView {
        comment,
        author: user.username.clone(),
        can_delete: true,
    };
    Ok(Html(CommentTemplate { item }).into_response())
}

/// Owners and moderators may remove a comment. Returns an empty body for htmx.
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: CurrentUser,
) -> AppResult<Response> {
    let repo = DealRepository::new(state.db.clone());
    let owner = repo.comment_owner(&id)?;
    if owner != user.id && !user.can_moderate() {
        return Err(AppError::Forbidden);
    }
    repo.delete_comment(&id)?;
    tracing::info!("Comment {} deleted by {}", id, user.username);
    Ok(StatusCode::OK.into_response())
}

pub async fn user_page(
    State(state): State<AppState>,
    Path(username): Path<String>,
    maybe_user: MaybeUser,
) -> AppResult<Response> {
    let profile =
        crate::auth::accounts::find_by_username(&state.db, &username)?.ok_or(AppError::NotFound)?;

    let repo = DealRepository::new(state.db.clone());
    let deals: Vec<Deal> = repo
        .by_user(&profile.id)?
        .into_iter()
        .filter(|d| visible_to(d, maybe_user.0.as_ref()))
        .collect();
    let deals = assemble(&state.db, deals)?;

    let meta = PageMeta::new(
        &state.config,
        format!("Deals posted by {}", profile.shown_name()),
        &format!("/users/{}", profile.username),
    );

    Ok(Html(UserTemplate {
        meta,
        viewer: maybe_user.0,
        shown_name: profile.shown_name().to_string(),
        username: profile.username,
        deals,
    })
    .into_response())
}
