//! Askama templates and the flat view models they render. Handlers
//! pre-resolve every username, group title and image URL so the
//! templates stay lookup-free.

use askama::Template;

/// One post as the feed pages show it.
pub struct PostCard {
    pub id: String,
    pub text: String,
    pub author_username: String,
    pub author_name: String,
    pub group: Option<GroupRef>,
    pub image_url: Option<String>,
    pub published: String,
}

pub struct GroupRef {
    pub slug: String,
    pub title: String,
}

pub struct CommentView {
    pub author: String,
    pub text: String,
    pub published: String,
}

pub struct Pager {
    pub number: u64,
    pub total_pages: u64,
    pub has_previous: bool,
    pub has_next: bool,
}

pub struct GroupOption {
    pub id: String,
    pub title: String,
    pub selected: bool,
}

pub struct FieldErrorView {
    pub field: String,
    pub message: String,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub cards: Vec<PostCard>,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "group.html")]
pub struct GroupTemplate {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub cards: Vec<PostCard>,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub username: String,
    pub display_name: String,
    pub posts_count: u64,
    pub following: bool,
    pub viewer_is_author: bool,
    pub authenticated: bool,
    pub cards: Vec<PostCard>,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub cards: Vec<PostCard>,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct DetailTemplate {
    pub card: PostCard,
    pub posts_count: u64,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    pub comment_text: String,
    pub comment_error: Option<String>,
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub heading: String,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOption>,
    pub errors: Vec<FieldErrorView>,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {}
