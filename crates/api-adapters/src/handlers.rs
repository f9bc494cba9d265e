//! Route handlers. Each one composes services, resolves the view
//! model, and renders; all policy (ownership, validation, clamping)
//! lives below in `services`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{MatchedPath, Multipart, Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use askama::Template as _;
use bytes::Bytes;
use mime::Mime;
use serde::Deserialize;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use uuid::Uuid;

use domains::{
    AppError, BlogRepo, FieldError, Group, MediaStore, PageCache, Post, Sessions, User,
    Viewer,
};
use services::{EngageService, FeedService, ImageUpload, PostDraft, PublishService};

use crate::extract::{login_redirect, MaybeViewer, RequireViewer};
use crate::metrics::Metrics;
use crate::templates::{
    CommentView, DetailTemplate, FieldErrorView, FollowTemplate, GroupOption, GroupRef,
    GroupTemplate, IndexTemplate, NotFoundTemplate, Pager, PostCard, PostFormTemplate,
    ProfileTemplate,
};

/// The one cached page. Only `GET /` without an explicit `page`
/// parameter consults it.
pub const INDEX_CACHE_KEY: &str = "index_page";

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn BlogRepo>,
    pub feed: Arc<FeedService>,
    pub publish: Arc<PublishService>,
    pub engage: Arc<EngageService>,
    pub cache: Arc<dyn PageCache>,
    pub media: Arc<dyn MediaStore>,
    pub sessions: Arc<dyn Sessions>,
    pub metrics: Arc<Metrics>,
    pub cache_ttl: Duration,
}

pub fn router(state: AppState, media_root: Option<PathBuf>) -> Router {
    let mut router = Router::new()
        .route("/", get(home))
        .route("/group/{slug}/", get(group_feed))
        .route("/profile/{username}/", get(profile_feed))
        .route("/profile/{username}/follow/", post(follow_author))
        .route("/profile/{username}/unfollow/", post(unfollow_author))
        .route("/posts/{id}/", get(post_detail))
        .route("/posts/{id}/edit/", get(edit_form).post(submit_edit))
        .route("/posts/{id}/add_comment/", post(add_comment))
        .route("/create/", get(create_form).post(submit_create))
        .route("/follow/", get(follow_feed))
        .route("/metrics", get(metrics_page))
        .fallback(not_found_page);
    if let Some(root) = media_root {
        router = router.nest_service("/media", ServeDir::new(root));
    }
    router
        .layer(middleware::from_fn_with_state(state.clone(), track_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn track_metrics(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let response = next.run(req).await;
    state
        .metrics
        .observe(method.as_str(), &route, response.status().as_u16());
    response
}

// ── Shared helpers ──────────────────────────────────────────────────────────

/// 302 Found, the original framework's redirect convention.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

fn render<T: askama::Template>(status: StatusCode, template: &T) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(err) => {
            error!(%err, "template rendering failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn not_found() -> Response {
    render(StatusCode::NOT_FOUND, &NotFoundTemplate {})
}

/// Terminal error mapping for errors no handler treats specially.
fn error_response(err: AppError) -> Response {
    match err {
        AppError::NotFound { .. } => not_found(),
        AppError::Unauthorized => login_redirect("/"),
        AppError::Forbidden => StatusCode::FORBIDDEN.into_response(),
        AppError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY.into_response(),
        AppError::Internal(msg) => {
            error!(%msg, "internal error");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Deserialize, Default)]
struct PageQuery {
    page: Option<String>,
}

/// `?page=abc`, a missing parameter, or anything unparsable means the
/// first page; out-of-range numbers are clamped by the feed service.
fn requested_page(query: &PageQuery) -> u64 {
    query
        .page
        .as_deref()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(1)
}

fn pager(page: &domains::Page<Post>) -> Pager {
    Pager {
        number: page.number,
        total_pages: page.total_pages,
        has_previous: page.has_previous(),
        has_next: page.has_next(),
    }
}

fn display_name(user: &User) -> String {
    user.display_name.clone().unwrap_or_else(|| user.username.clone())
}

fn published(post_created: chrono::DateTime<chrono::Utc>) -> String {
    post_created.format("%Y-%m-%d %H:%M").to_string()
}

/// Resolves authors, groups and image URLs for a page of posts.
/// Lookups are memoized per request; a feed page touches at most ten
/// distinct authors.
async fn post_cards(state: &AppState, posts: &[Post]) -> domains::Result<Vec<PostCard>> {
    let mut users: HashMap<Uuid, User> = HashMap::new();
    let mut groups: HashMap<Uuid, Option<Group>> = HashMap::new();
    let mut cards = Vec::with_capacity(posts.len());
    for post in posts {
        if !users.contains_key(&post.author_id) {
            let user = state.repo.get_user(post.author_id).await?.ok_or_else(|| {
                AppError::Internal(format!("post {} has no author row", post.id))
            })?;
            users.insert(post.author_id, user);
        }
        let author = &users[&post.author_id];
        let group = match post.group_id {
            Some(id) => {
                if !groups.contains_key(&id) {
                    let resolved = state.repo.get_group(id).await?;
                    groups.insert(id, resolved);
                }
                groups[&id].as_ref().map(|g| GroupRef {
                    slug: g.slug.clone(),
                    title: g.title.clone(),
                })
            }
            None => None,
        };
        cards.push(PostCard {
            id: post.id.to_string(),
            text: post.text.clone(),
            author_username: author.username.clone(),
            author_name: display_name(author),
            group,
            image_url: post.image_id.as_deref().map(|id| state.media.url(id)),
            published: published(post.created_at),
        });
    }
    Ok(cards)
}

fn group_options(groups: &[Group], selected: Option<Uuid>) -> Vec<GroupOption> {
    groups
        .iter()
        .map(|g| GroupOption {
            id: g.id.to_string(),
            title: g.title.clone(),
            selected: selected == Some(g.id),
        })
        .collect()
}

fn field_error_views(errors: &[FieldError]) -> Vec<FieldErrorView> {
    errors
        .iter()
        .map(|e| FieldErrorView { field: e.field.to_string(), message: e.message.clone() })
        .collect()
}

fn parse_post_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

// ── Feed views ──────────────────────────────────────────────────────────────

async fn home(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Response {
    // only the default first-page render goes through the cache
    let cacheable = query.page.is_none();
    if cacheable {
        match state.cache.get(INDEX_CACHE_KEY).await {
            Ok(Some(body)) => {
                return ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], body)
                    .into_response()
            }
            Ok(None) => {}
            Err(err) => warn!(%err, "page cache read failed, treating as miss"),
        }
    }

    let page = match state.feed.home(requested_page(&query)).await {
        Ok(page) => page,
        Err(err) => return error_response(err),
    };
    let cards = match post_cards(&state, &page.items).await {
        Ok(cards) => cards,
        Err(err) => return error_response(err),
    };
    let template = IndexTemplate { cards, pager: pager(&page) };
    let html = match template.render() {
        Ok(html) => html,
        Err(err) => {
            error!(%err, "template rendering failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if cacheable {
        let body = Bytes::from(html.clone());
        if let Err(err) = state.cache.set(INDEX_CACHE_KEY, body, state.cache_ttl).await {
            warn!(%err, "page cache write failed");
        }
    }
    Html(html).into_response()
}

async fn group_feed(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let feed = match state.feed.group(&slug, requested_page(&query)).await {
        Ok(feed) => feed,
        Err(err) => return error_response(err),
    };
    let cards = match post_cards(&state, &feed.page.items).await {
        Ok(cards) => cards,
        Err(err) => return error_response(err),
    };
    render(
        StatusCode::OK,
        &GroupTemplate {
            title: feed.group.title,
            slug: feed.group.slug,
            description: feed.group.description,
            cards,
            pager: pager(&feed.page),
        },
    )
}

async fn profile_feed(
    State(state): State<AppState>,
    Path(username): Path<String>,
    MaybeViewer(viewer): MaybeViewer,
    Query(query): Query<PageQuery>,
) -> Response {
    let viewer_id = viewer.as_ref().map(|v| v.id);
    let profile = match state
        .feed
        .profile(&username, viewer_id, requested_page(&query))
        .await
    {
        Ok(profile) => profile,
        Err(err) => return error_response(err),
    };
    let cards = match post_cards(&state, &profile.page.items).await {
        Ok(cards) => cards,
        Err(err) => return error_response(err),
    };
    render(
        StatusCode::OK,
        &ProfileTemplate {
            username: profile.author.username.clone(),
            display_name: display_name(&profile.author),
            posts_count: profile.posts_count,
            following: profile.following,
            viewer_is_author: viewer_id == Some(profile.author.id),
            authenticated: viewer.is_some(),
            cards,
            pager: pager(&profile.page),
        },
    )
}

async fn follow_feed(
    State(state): State<AppState>,
    RequireViewer(viewer): RequireViewer,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = match state.feed.following(viewer.id, requested_page(&query)).await {
        Ok(page) => page,
        Err(err) => return error_response(err),
    };
    let cards = match post_cards(&state, &page.items).await {
        Ok(cards) => cards,
        Err(err) => return error_response(err),
    };
    render(StatusCode::OK, &FollowTemplate { cards, pager: pager(&page) })
}

// ── Post detail and comments ────────────────────────────────────────────────

async fn render_detail(
    state: &AppState,
    post_id: Uuid,
    viewer: Option<&Viewer>,
    comment_text: String,
    comment_error: Option<String>,
) -> Response {
    let detail = match state.feed.post_detail(post_id).await {
        Ok(detail) => detail,
        Err(err) => return error_response(err),
    };
    let cards = match post_cards(state, std::slice::from_ref(&detail.post)).await {
        Ok(cards) => cards,
        Err(err) => return error_response(err),
    };
    let Some(card) = cards.into_iter().next() else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    let mut commenters: HashMap<Uuid, String> = HashMap::new();
    let mut comments = Vec::with_capacity(detail.comments.len());
    for c in &detail.comments {
        // an orphaned author reference renders as a tombstone
        let author = match c.author_id {
            Some(id) => {
                if !commenters.contains_key(&id) {
                    let name = match state.repo.get_user(id).await {
                        Ok(Some(user)) => display_name(&user),
                        Ok(None) => "deleted user".to_string(),
                        Err(err) => return error_response(err),
                    };
                    commenters.insert(id, name);
                }
                commenters[&id].clone()
            }
            None => "deleted user".to_string(),
        };
        comments.push(CommentView {
            author,
            text: c.text.clone(),
            published: published(c.created_at),
        });
    }
    render(
        StatusCode::OK,
        &DetailTemplate {
            card,
            posts_count: detail.author_posts_count,
            comments,
            can_edit: viewer.map(|v| v.id) == Some(detail.author.id),
            comment_text,
            comment_error,
        },
    )
}

async fn post_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    MaybeViewer(viewer): MaybeViewer,
) -> Response {
    let Some(post_id) = parse_post_id(&id) else {
        return not_found();
    };
    render_detail(&state, post_id, viewer.as_ref(), String::new(), None).await
}

#[derive(Deserialize)]
struct CommentForm {
    #[serde(default)]
    text: String,
}

async fn add_comment(
    State(state): State<AppState>,
    RequireViewer(viewer): RequireViewer,
    Path(id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let Some(post_id) = parse_post_id(&id) else {
        return not_found();
    };
    match state.engage.add_comment(post_id, viewer.id, &form.text).await {
        Ok(_) => found(&format!("/posts/{post_id}/")),
        Err(AppError::Invalid(errors)) => {
            let message = errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "invalid comment".to_string());
            render_detail(&state, post_id, Some(&viewer), form.text, Some(message)).await
        }
        Err(err) => error_response(err),
    }
}

// ── Publishing ──────────────────────────────────────────────────────────────

/// Pulls a PostDraft out of the multipart form. Field parse problems
/// (an unresolvable group id) come back as field errors so the form
/// re-renders instead of failing the request.
async fn read_draft(
    mut multipart: Multipart,
) -> Result<(PostDraft, Vec<FieldError>), Response> {
    let mut draft = PostDraft::default();
    let mut errors = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                warn!(%err, "malformed multipart body");
                return Err(StatusCode::BAD_REQUEST.into_response());
            }
        };
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "text" => match field.text().await {
                Ok(text) => draft.text = text,
                Err(_) => return Err(StatusCode::BAD_REQUEST.into_response()),
            },
            "group" => match field.text().await {
                Ok(raw) if raw.is_empty() => draft.group_id = None,
                Ok(raw) => match Uuid::parse_str(&raw) {
                    Ok(id) => draft.group_id = Some(id),
                    Err(_) => errors.push(FieldError::new("group", "unknown group")),
                },
                Err(_) => return Err(StatusCode::BAD_REQUEST.into_response()),
            },
            "image" => {
                let content_type = field
                    .content_type()
                    .and_then(|ct| ct.parse::<Mime>().ok())
                    .unwrap_or(mime::IMAGE_STAR);
                let has_filename =
                    field.file_name().map(|f| !f.is_empty()).unwrap_or(false);
                let bytes = match field.bytes().await {
                    Ok(bytes) => bytes,
                    Err(_) => return Err(StatusCode::BAD_REQUEST.into_response()),
                };
                // an untouched file input submits a nameless empty part
                if has_filename || !bytes.is_empty() {
                    draft.image = Some(ImageUpload { bytes, content_type });
                }
            }
            _ => {}
        }
    }
    Ok((draft, errors))
}

async fn post_form(
    state: &AppState,
    heading: &str,
    action: String,
    draft: &PostDraft,
    errors: &[FieldError],
) -> Response {
    let groups = match state.publish.groups().await {
        Ok(groups) => groups,
        Err(err) => return error_response(err),
    };
    render(
        StatusCode::OK,
        &PostFormTemplate {
            heading: heading.to_string(),
            action,
            text: draft.text.clone(),
            groups: group_options(&groups, draft.group_id),
            errors: field_error_views(errors),
        },
    )
}

async fn create_form(
    State(state): State<AppState>,
    RequireViewer(_viewer): RequireViewer,
) -> Response {
    post_form(&state, "New post", "/create/".to_string(), &PostDraft::default(), &[]).await
}

async fn submit_create(
    State(state): State<AppState>,
    RequireViewer(viewer): RequireViewer,
    multipart: Multipart,
) -> Response {
    let (draft, form_errors) = match read_draft(multipart).await {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };
    if !form_errors.is_empty() {
        return post_form(&state, "New post", "/create/".to_string(), &draft, &form_errors)
            .await;
    }
    match state.publish.create_post(viewer.id, draft.clone()).await {
        Ok(_) => found(&format!("/profile/{}/", viewer.username)),
        Err(AppError::Invalid(errors)) => {
            post_form(&state, "New post", "/create/".to_string(), &draft, &errors).await
        }
        Err(err) => error_response(err),
    }
}

async fn edit_form(
    State(state): State<AppState>,
    RequireViewer(viewer): RequireViewer,
    Path(id): Path<String>,
) -> Response {
    let Some(post_id) = parse_post_id(&id) else {
        return not_found();
    };
    let post = match state.repo.get_post(post_id).await {
        Ok(Some(post)) => post,
        Ok(None) => return not_found(),
        Err(err) => return error_response(err),
    };
    // non-owners bounce to the read view, silently
    if post.author_id != viewer.id {
        return found(&format!("/posts/{post_id}/"));
    }
    let draft = PostDraft { text: post.text, group_id: post.group_id, image: None };
    post_form(&state, "Edit post", format!("/posts/{post_id}/edit/"), &draft, &[]).await
}

async fn submit_edit(
    State(state): State<AppState>,
    RequireViewer(viewer): RequireViewer,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    let Some(post_id) = parse_post_id(&id) else {
        return not_found();
    };
    let action = format!("/posts/{post_id}/edit/");
    let (draft, form_errors) = match read_draft(multipart).await {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };
    if !form_errors.is_empty() {
        return post_form(&state, "Edit post", action, &draft, &form_errors).await;
    }
    match state.publish.edit_post(post_id, viewer.id, draft.clone()).await {
        Ok(_) => found(&format!("/posts/{post_id}/")),
        // owner-only: redirect with no mutation and no surfaced error
        Err(AppError::Forbidden) => found(&format!("/posts/{post_id}/")),
        Err(AppError::Invalid(errors)) => {
            post_form(&state, "Edit post", action, &draft, &errors).await
        }
        Err(err) => error_response(err),
    }
}

// ── Follow edges ────────────────────────────────────────────────────────────

async fn follow_author(
    State(state): State<AppState>,
    RequireViewer(viewer): RequireViewer,
    Path(username): Path<String>,
) -> Response {
    match state.engage.follow(viewer.id, &username).await {
        Ok(()) => found("/follow/"),
        Err(err) => error_response(err),
    }
}

async fn unfollow_author(
    State(state): State<AppState>,
    RequireViewer(viewer): RequireViewer,
    Path(username): Path<String>,
) -> Response {
    match state.engage.unfollow(viewer.id, &username).await {
        Ok(()) => found(&format!("/profile/{username}/")),
        Err(err) => error_response(err),
    }
}

// ── Operational endpoints ───────────────────────────────────────────────────

async fn metrics_page(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.metrics.render(),
    )
        .into_response()
}

async fn not_found_page() -> Response {
    not_found()
}
