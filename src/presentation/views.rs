use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, macros::format_description};
use uuid::Uuid;

use crate::application::error::{ErrorReport, HttpError};
use crate::application::feed::{GroupPage, ProfilePage};
use crate::application::pagination::Page;
use crate::application::posts::PostDetail;
use crate::domain::entities::{AuthorRecord, CommentRecord, GroupRecord, PostRecord};

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let view = LayoutContext::new(chrome, ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Render an [`HttpError`] as a full page, keeping its report attached.
pub fn render_error_response(chrome: LayoutChrome, error: HttpError) -> Response {
    let status = error.status();
    let content = ErrorPageView {
        title: status
            .canonical_reason()
            .unwrap_or("Error")
            .to_string(),
        message: error.public_message().to_string(),
    };
    let view = LayoutContext::new(chrome, content);
    let mut response = render_template_response(ErrorTemplate { view }, status);
    error.into_report().attach(&mut response);
    response
}

/// Site chrome shared by every page.
#[derive(Clone, Debug, Default)]
pub struct LayoutChrome {
    pub is_authenticated: bool,
    pub viewer_name: String,
}

impl LayoutChrome {
    /// Chrome without any viewer-specific parts, safe to cache across viewers.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_viewer(viewer: Option<&AuthorRecord>) -> Self {
        match viewer {
            Some(author) => Self {
                is_authenticated: true,
                viewer_name: author.username.clone(),
            },
            None => Self::anonymous(),
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub chrome: LayoutChrome,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self { chrome, content }
    }
}

pub fn format_timestamp(value: OffsetDateTime) -> String {
    let format = format_description!("[day].[month].[year] [hour]:[minute]");
    value.format(&format).unwrap_or_else(|_| value.to_string())
}

#[derive(Clone, Debug)]
pub struct PostCard {
    pub id: Uuid,
    pub author_username: String,
    pub text: String,
    pub has_image: bool,
    pub image: String,
    pub has_group: bool,
    pub group_slug: String,
    pub group_title: String,
    pub created_at: String,
}

impl From<&PostRecord> for PostCard {
    fn from(post: &PostRecord) -> Self {
        Self {
            id: post.id,
            author_username: post.author_username.clone(),
            text: post.text.clone(),
            has_image: post.image.is_some(),
            image: post.image.clone().unwrap_or_default(),
            has_group: post.group_slug.is_some(),
            group_slug: post.group_slug.clone().unwrap_or_default(),
            group_title: post.group_title.clone().unwrap_or_default(),
            created_at: format_timestamp(post.created_at),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PaginationView {
    pub number: u32,
    pub num_pages: u32,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous: u32,
    pub next: u32,
    pub base_path: String,
}

impl PaginationView {
    pub fn from_page<T>(page: &Page<T>, base_path: impl Into<String>) -> Self {
        Self {
            number: page.number,
            num_pages: page.num_pages,
            has_previous: page.has_previous(),
            has_next: page.has_next(),
            previous: page.number.saturating_sub(1).max(1),
            next: (page.number + 1).min(page.num_pages),
            base_path: base_path.into(),
        }
    }

    pub fn is_paginated(&self) -> bool {
        self.num_pages > 1
    }
}

fn cards(page: &Page<PostRecord>) -> Vec<PostCard> {
    page.items.iter().map(PostCard::from).collect()
}

#[derive(Clone, Debug)]
pub struct ListingView {
    pub heading: String,
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
    pub empty_message: String,
}

impl ListingView {
    pub fn home(page: &Page<PostRecord>) -> Self {
        Self {
            heading: "Latest posts".to_string(),
            posts: cards(page),
            pagination: PaginationView::from_page(page, "/"),
            empty_message: "Nobody has written anything yet.".to_string(),
        }
    }

    pub fn feed(page: &Page<PostRecord>) -> Self {
        Self {
            heading: "Posts by authors you follow".to_string(),
            posts: cards(page),
            pagination: PaginationView::from_page(page, "/follow"),
            empty_message: "Follow some authors to see their posts here.".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GroupView {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

impl From<&GroupPage> for GroupView {
    fn from(page: &GroupPage) -> Self {
        Self {
            title: page.group.title.clone(),
            slug: page.group.slug.clone(),
            description: page.group.description.clone(),
            posts: cards(&page.posts),
            pagination: PaginationView::from_page(
                &page.posts,
                format!("/group/{}", page.group.slug),
            ),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ProfileView {
    pub username: String,
    pub post_count: u64,
    pub followers: u64,
    pub following_count: u64,
    /// Whether the viewer already follows this author.
    pub following: bool,
    /// Whether follow controls are shown at all.
    pub can_follow: bool,
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

impl ProfileView {
    pub fn new(page: &ProfilePage, viewer: Option<&AuthorRecord>) -> Self {
        let can_follow = viewer.is_some_and(|viewer| viewer.id != page.author.id);
        Self {
            username: page.author.username.clone(),
            post_count: page.posts.total,
            followers: page.counts.followers,
            following_count: page.counts.following,
            following: page.following,
            can_follow,
            posts: cards(&page.posts),
            pagination: PaginationView::from_page(
                &page.posts,
                format!("/profile/{}", page.author.username),
            ),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CommentView {
    pub id: Uuid,
    pub author_username: String,
    pub text: String,
    pub created_at: String,
    pub is_owner: bool,
}

impl CommentView {
    fn new(comment: &CommentRecord, viewer: Option<&AuthorRecord>) -> Self {
        Self {
            id: comment.id,
            author_username: comment.author_username.clone(),
            text: comment.text.clone(),
            created_at: format_timestamp(comment.created_at),
            is_owner: viewer.is_some_and(|viewer| viewer.id == comment.author_id),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PostDetailView {
    pub post: PostCard,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
    pub is_owner: bool,
    pub can_comment: bool,
    pub comment_text: String,
    pub comment_error: String,
}

impl PostDetailView {
    pub fn new(detail: &PostDetail, viewer: Option<&AuthorRecord>) -> Self {
        Self {
            post: PostCard::from(&detail.post),
            author_post_count: detail.author_post_count,
            comments: detail
                .comments
                .iter()
                .map(|comment| CommentView::new(comment, viewer))
                .collect(),
            is_owner: viewer.is_some_and(|viewer| viewer.id == detail.post.author_id),
            can_comment: viewer.is_some(),
            comment_text: String::new(),
            comment_error: String::new(),
        }
    }

    pub fn with_comment_error(self, text: String, error: String) -> Self {
        Self {
            comment_text: text,
            comment_error: error,
            ..self
        }
    }
}

#[derive(Clone, Debug)]
pub struct GroupOption {
    pub id: Uuid,
    pub title: String,
    pub selected: bool,
}

#[derive(Clone, Debug)]
pub struct PostFormView {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub image: String,
    pub groups: Vec<GroupOption>,
    pub error: String,
}

impl PostFormView {
    pub fn create(groups: &[GroupRecord]) -> Self {
        Self {
            is_edit: false,
            action: "/create".to_string(),
            text: String::new(),
            image: String::new(),
            groups: group_options(groups, None),
            error: String::new(),
        }
    }

    pub fn edit(post: &PostRecord, groups: &[GroupRecord]) -> Self {
        Self {
            is_edit: true,
            action: format!("/posts/{}/edit", post.id),
            text: post.text.clone(),
            image: post.image.clone().unwrap_or_default(),
            groups: group_options(groups, post.group_id),
            error: String::new(),
        }
    }

    /// Re-populate the form with what the user submitted.
    pub fn with_submission(
        self,
        text: String,
        image: String,
        group_id: Option<Uuid>,
        error: String,
    ) -> Self {
        let groups = self
            .groups
            .into_iter()
            .map(|option| GroupOption {
                selected: Some(option.id) == group_id,
                ..option
            })
            .collect();
        Self {
            text,
            image,
            groups,
            error,
            ..self
        }
    }
}

fn group_options(groups: &[GroupRecord], selected: Option<Uuid>) -> Vec<GroupOption> {
    groups
        .iter()
        .map(|group| GroupOption {
            id: group.id,
            title: group.title.clone(),
            selected: Some(group.id) == selected,
        })
        .collect()
}

#[derive(Clone, Debug)]
pub struct ErrorPageView {
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page not found".to_string(),
            message: "The page you requested does not exist.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "listing.html")]
pub struct ListingTemplate {
    pub view: LayoutContext<ListingView>,
}

#[derive(Template)]
#[template(path = "group.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupView>,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileView>,
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailView>,
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::application::pagination::{PageNumber, Paginator};

    fn post(text: &str) -> PostRecord {
        PostRecord {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            author_username: "leo".into(),
            group_id: None,
            group_slug: None,
            group_title: None,
            text: text.into(),
            image: None,
            created_at: datetime!(2024-03-05 14:07 UTC),
        }
    }

    #[test]
    fn timestamps_use_day_month_year() {
        assert_eq!(
            format_timestamp(datetime!(2024-03-05 14:07 UTC)),
            "05.03.2024 14:07"
        );
    }

    #[test]
    fn pagination_links_stay_in_range() {
        let window = Paginator::default().window(25, PageNumber::new(3));
        let page = Page::new(vec![post("x")], window);
        let view = PaginationView::from_page(&page, "/");
        assert_eq!(view.previous, 2);
        assert_eq!(view.next, 3);
        assert!(!view.has_next);
        assert!(view.is_paginated());
    }

    #[test]
    fn listing_escapes_post_text() {
        let window = Paginator::default().window(1, PageNumber::FIRST);
        let page = Page::new(vec![post("<script>alert(1)</script>")], window);
        let html = ListingTemplate {
            view: LayoutContext::new(LayoutChrome::anonymous(), ListingView::home(&page)),
        }
        .render()
        .expect("rendered");

        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("/profile/leo"));
    }

    #[test]
    fn anonymous_chrome_offers_login() {
        let html = ErrorTemplate {
            view: LayoutContext::new(LayoutChrome::anonymous(), ErrorPageView::not_found()),
        }
        .render()
        .expect("rendered");
        assert!(html.contains("Page not found"));
        assert!(!html.contains("Signed in as"));
    }
}
