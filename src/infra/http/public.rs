use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tracing::debug;
use uuid::Uuid;

use crate::{
    application::{
        error::HttpError,
        feed::FeedError,
        follow::FollowError,
        pagination::PageNumber,
        posts::PostError,
    },
    cache::{ServedPage, home_cache_layer},
    presentation::views::{
        GroupTemplate, GroupView, LayoutChrome, LayoutContext, ListingTemplate, ListingView,
        PostDetailTemplate, PostDetailView, PostFormTemplate, PostFormView, ProfileTemplate,
        ProfileView, render_error_response, render_not_found_response, render_template_response,
    },
};

use super::{
    HttpState, db_health_response,
    forms::{CommentForm, PageQuery, PostForm},
    middleware::{log_responses, set_request_context},
    viewer::{CurrentViewer, RequiredViewer},
};

const SOURCE: &str = "yatube::http::public";

pub fn build_router(state: HttpState) -> Router {
    // Only the home timeline is cached. It renders anonymous chrome so a
    // cached page never leaks one viewer's navigation to another.
    let home = Router::new().route("/", get(index));
    let home = match state.cache.clone() {
        Some(cache) => home.layer(middleware::from_fn_with_state(cache, home_cache_layer)),
        None => home,
    };

    Router::new()
        .route("/group/{slug}", get(group_posts))
        .route("/profile/{username}", get(profile))
        .route("/profile/{username}/follow", post(profile_follow))
        .route("/profile/{username}/unfollow", post(profile_unfollow))
        .route("/follow", get(follow_index))
        .route("/create", get(create_form).post(create_post))
        .route("/posts/{id}", get(post_detail))
        .route("/posts/{id}/edit", get(edit_form).post(edit_post))
        .route("/posts/{id}/delete", post(delete_post))
        .route("/posts/{id}/comment", post(add_comment))
        .route("/comments/{id}/edit", post(edit_comment))
        .route("/comments/{id}/delete", post(delete_comment))
        .route("/_health/db", get(public_health))
        .merge(home)
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn index(State(state): State<HttpState>, Query(query): Query<PageQuery>) -> Response {
    let chrome = LayoutChrome::anonymous();
    match state.feed.home_timeline(query.page_number()).await {
        Ok(page) => {
            let served = ServedPage(PageNumber::new(page.number));
            let view = LayoutContext::new(chrome, ListingView::home(&page));
            let mut response = render_template_response(ListingTemplate { view }, StatusCode::OK);
            response.extensions_mut().insert(served);
            response
        }
        Err(err) => feed_error_response(err, chrome),
    }
}

async fn group_posts(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(viewer.as_ref());
    match state.feed.group_page(&slug, query.page_number()).await {
        Ok(page) => {
            let view = LayoutContext::new(chrome, GroupView::from(&page));
            render_template_response(GroupTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_response(err, chrome),
    }
}

async fn profile(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(viewer.as_ref());
    match state
        .feed
        .profile_page(&username, query.page_number(), viewer.as_ref())
        .await
    {
        Ok(page) => {
            let view = LayoutContext::new(chrome, ProfileView::new(&page, viewer.as_ref()));
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_response(err, chrome),
    }
}

async fn profile_follow(
    State(state): State<HttpState>,
    RequiredViewer(viewer): RequiredViewer,
    Path(username): Path<String>,
) -> Response {
    match state.follows.follow(&viewer, &username).await {
        Ok(_) => Redirect::to(&profile_path(&username)).into_response(),
        Err(err) => follow_error_response(err, LayoutChrome::for_viewer(Some(&viewer))),
    }
}

async fn profile_unfollow(
    State(state): State<HttpState>,
    RequiredViewer(viewer): RequiredViewer,
    Path(username): Path<String>,
) -> Response {
    match state.follows.unfollow(&viewer, &username).await {
        Ok(()) => Redirect::to(&profile_path(&username)).into_response(),
        Err(err) => follow_error_response(err, LayoutChrome::for_viewer(Some(&viewer))),
    }
}

async fn follow_index(
    State(state): State<HttpState>,
    RequiredViewer(viewer): RequiredViewer,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(Some(&viewer));
    match state.feed.get_feed(&viewer, query.page_number()).await {
        Ok(page) => {
            let view = LayoutContext::new(chrome, ListingView::feed(&page));
            render_template_response(ListingTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_response(err, chrome),
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(id): Path<String>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(viewer.as_ref());
    let Some(id) = parse_id(&id) else {
        return render_not_found_response(chrome);
    };
    match state.posts.post_detail(id).await {
        Ok(detail) => {
            let view = LayoutContext::new(chrome, PostDetailView::new(&detail, viewer.as_ref()));
            render_template_response(PostDetailTemplate { view }, StatusCode::OK)
        }
        Err(err) => post_error_response(err, chrome),
    }
}

async fn create_form(
    State(state): State<HttpState>,
    RequiredViewer(viewer): RequiredViewer,
) -> Response {
    let chrome = LayoutChrome::for_viewer(Some(&viewer));
    match state.posts.list_groups().await {
        Ok(groups) => render_post_form(chrome, PostFormView::create(&groups), StatusCode::OK),
        Err(err) => post_error_response(err, chrome),
    }
}

async fn create_post(
    State(state): State<HttpState>,
    RequiredViewer(viewer): RequiredViewer,
    Form(form): Form<PostForm>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(Some(&viewer));
    let result = match form.to_draft() {
        Ok(draft) => state.posts.create_post(&viewer, draft).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(_) => Redirect::to(&profile_path(&viewer.username)).into_response(),
        Err(err @ (PostError::Validation(_) | PostError::UnknownGroup)) => {
            let groups = match state.posts.list_groups().await {
                Ok(groups) => groups,
                Err(err) => return post_error_response(err, chrome),
            };
            let selected = form.group_id().ok().flatten();
            let view = PostFormView::create(&groups).with_submission(
                form.text,
                form.image,
                selected,
                err.to_string(),
            );
            render_post_form(chrome, view, StatusCode::UNPROCESSABLE_ENTITY)
        }
        Err(err) => post_error_response(err, chrome),
    }
}

async fn edit_form(
    State(state): State<HttpState>,
    RequiredViewer(viewer): RequiredViewer,
    Path(id): Path<String>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(Some(&viewer));
    let Some(id) = parse_id(&id) else {
        return render_not_found_response(chrome);
    };
    let post = match state.posts.load_for_edit(&viewer, id).await {
        Ok(post) => post,
        Err(err) => return post_error_response(err, chrome),
    };
    match state.posts.list_groups().await {
        Ok(groups) => render_post_form(chrome, PostFormView::edit(&post, &groups), StatusCode::OK),
        Err(err) => post_error_response(err, chrome),
    }
}

async fn edit_post(
    State(state): State<HttpState>,
    RequiredViewer(viewer): RequiredViewer,
    Path(id): Path<String>,
    Form(form): Form<PostForm>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(Some(&viewer));
    let Some(id) = parse_id(&id) else {
        return render_not_found_response(chrome);
    };
    let result = match form.to_draft() {
        Ok(draft) => state.posts.edit_post(&viewer, id, draft).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(post) => Redirect::to(&post_path(post.id)).into_response(),
        Err(err @ (PostError::Validation(_) | PostError::UnknownGroup)) => {
            // Ownership is checked again so strangers are still redirected.
            let post = match state.posts.load_for_edit(&viewer, id).await {
                Ok(post) => post,
                Err(err) => return post_error_response(err, chrome),
            };
            let groups = match state.posts.list_groups().await {
                Ok(groups) => groups,
                Err(err) => return post_error_response(err, chrome),
            };
            let selected = form.group_id().ok().flatten();
            let view = PostFormView::edit(&post, &groups).with_submission(
                form.text,
                form.image,
                selected,
                err.to_string(),
            );
            render_post_form(chrome, view, StatusCode::UNPROCESSABLE_ENTITY)
        }
        Err(err) => post_error_response(err, chrome),
    }
}

async fn delete_post(
    State(state): State<HttpState>,
    RequiredViewer(viewer): RequiredViewer,
    Path(id): Path<String>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(Some(&viewer));
    let Some(id) = parse_id(&id) else {
        return render_not_found_response(chrome);
    };
    match state.posts.delete_post(&viewer, id).await {
        Ok(()) => Redirect::to(&profile_path(&viewer.username)).into_response(),
        Err(err) => post_error_response(err, chrome),
    }
}

async fn add_comment(
    State(state): State<HttpState>,
    RequiredViewer(viewer): RequiredViewer,
    Path(id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(Some(&viewer));
    let Some(id) = parse_id(&id) else {
        return render_not_found_response(chrome);
    };
    match state.posts.add_comment(&viewer, id, &form.text).await {
        Ok(comment) => Redirect::to(&post_path(comment.post_id)).into_response(),
        Err(PostError::Validation(message)) => {
            let detail = match state.posts.post_detail(id).await {
                Ok(detail) => detail,
                Err(err) => return post_error_response(err, chrome),
            };
            let content =
                PostDetailView::new(&detail, Some(&viewer)).with_comment_error(form.text, message);
            let view = LayoutContext::new(chrome, content);
            render_template_response(PostDetailTemplate { view }, StatusCode::UNPROCESSABLE_ENTITY)
        }
        Err(err) => post_error_response(err, chrome),
    }
}

async fn edit_comment(
    State(state): State<HttpState>,
    RequiredViewer(viewer): RequiredViewer,
    Path(id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(Some(&viewer));
    let Some(id) = parse_id(&id) else {
        return render_not_found_response(chrome);
    };
    match state.posts.edit_comment(&viewer, id, &form.text).await {
        Ok(comment) => Redirect::to(&post_path(comment.post_id)).into_response(),
        Err(err) => post_error_response(err, chrome),
    }
}

async fn delete_comment(
    State(state): State<HttpState>,
    RequiredViewer(viewer): RequiredViewer,
    Path(id): Path<String>,
) -> Response {
    let chrome = LayoutChrome::for_viewer(Some(&viewer));
    let Some(id) = parse_id(&id) else {
        return render_not_found_response(chrome);
    };
    match state.posts.delete_comment(&viewer, id).await {
        Ok(post_id) => Redirect::to(&post_path(post_id)).into_response(),
        Err(err) => post_error_response(err, chrome),
    }
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

async fn fallback(CurrentViewer(viewer): CurrentViewer) -> Response {
    render_not_found_response(LayoutChrome::for_viewer(viewer.as_ref()))
}

fn render_post_form(chrome: LayoutChrome, content: PostFormView, status: StatusCode) -> Response {
    let view = LayoutContext::new(chrome, content);
    render_template_response(PostFormTemplate { view }, status)
}

fn feed_error_response(err: FeedError, chrome: LayoutChrome) -> Response {
    match err {
        FeedError::UnknownGroup(_) | FeedError::UnknownAuthor(_) => {
            render_not_found_response(chrome)
        }
        other => render_error_response(chrome, HttpError::from(other)),
    }
}

fn follow_error_response(err: FollowError, chrome: LayoutChrome) -> Response {
    match err {
        FollowError::UnknownAuthor(_) => render_not_found_response(chrome),
        other => render_error_response(chrome, HttpError::from(other)),
    }
}

fn post_error_response(err: PostError, chrome: LayoutChrome) -> Response {
    match err {
        PostError::NotFound { .. } => render_not_found_response(chrome),
        PostError::NotOwner { entity, post_id } => {
            debug!(
                target = SOURCE,
                entity,
                post_id = %post_id,
                viewer = %chrome.viewer_name,
                "rejected change by non-author"
            );
            Redirect::to(&post_path(post_id)).into_response()
        }
        other => render_error_response(chrome, HttpError::from(other)),
    }
}

fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

fn profile_path(username: &str) -> String {
    format!("/profile/{username}")
}

fn post_path(id: Uuid) -> String {
    format!("/posts/{id}")
}
