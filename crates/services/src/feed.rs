//! # Query Composer
//!
//! Produces the ordered, paginated slice of posts for each view. The
//! ordering itself (created_at desc, id desc) is part of the
//! [`BlogRepo`] contract; this layer owns page clamping and view
//! assembly.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use domains::{
    AppError, BlogRepo, Comment, Group, Page, Post, PostFilter, Result, User, PAGE_SIZE,
};

/// A group feed: the resolved group plus one page of its posts.
#[derive(Debug, Clone)]
pub struct GroupFeed {
    pub group: Group,
    pub page: Page<Post>,
}

/// An author's profile: their posts, total count, and whether the
/// requesting viewer follows them (false when unauthenticated).
#[derive(Debug, Clone)]
pub struct ProfileFeed {
    pub author: User,
    pub page: Page<Post>,
    pub posts_count: u64,
    pub following: bool,
}

/// Everything the detail view renders for one post.
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: Post,
    pub author: User,
    pub group: Option<Group>,
    /// Oldest first.
    pub comments: Vec<Comment>,
    pub author_posts_count: u64,
}

pub struct FeedService {
    repo: Arc<dyn BlogRepo>,
}

impl FeedService {
    pub fn new(repo: Arc<dyn BlogRepo>) -> Self {
        Self { repo }
    }

    /// The global stream.
    pub async fn home(&self, page: u64) -> Result<Page<Post>> {
        self.paginate(&PostFilter::All, page).await
    }

    /// Posts assigned to the group behind `slug`.
    pub async fn group(&self, slug: &str, page: u64) -> Result<GroupFeed> {
        let group = self
            .repo
            .get_group_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::not_found("group", slug))?;
        let page = self.paginate(&PostFilter::Group(group.id), page).await?;
        Ok(GroupFeed { group, page })
    }

    /// One author's posts, plus the viewer's follow state.
    pub async fn profile(
        &self,
        username: &str,
        viewer_id: Option<Uuid>,
        page: u64,
    ) -> Result<ProfileFeed> {
        let author = self
            .repo
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("user", username))?;
        let page = self.paginate(&PostFilter::Author(author.id), page).await?;
        let following = match viewer_id {
            Some(viewer) => self.repo.is_following(viewer, author.id).await?,
            None => false,
        };
        let posts_count = page.total_items;
        Ok(ProfileFeed { author, page, posts_count, following })
    }

    /// Posts by every author the viewer follows, paginated like any
    /// other feed.
    pub async fn following(&self, viewer_id: Uuid, page: u64) -> Result<Page<Post>> {
        self.paginate(&PostFilter::FollowedBy(viewer_id), page).await
    }

    /// One post with its comments (oldest first) and author context.
    pub async fn post_detail(&self, post_id: Uuid) -> Result<PostDetail> {
        let post = self
            .repo
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::not_found("post", post_id.to_string()))?;
        let author = self
            .repo
            .get_user(post.author_id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("post {post_id} has no author row")))?;
        let group = match post.group_id {
            Some(id) => self.repo.get_group(id).await?,
            None => None,
        };
        let comments = self.repo.list_comments(post_id).await?;
        let author_posts_count =
            self.repo.count_posts(&PostFilter::Author(author.id)).await?;
        Ok(PostDetail { post, author, group, comments, author_posts_count })
    }

    /// Clamps the requested page into the valid range and fetches it.
    /// Page 0 (or any underflow from the query layer) means the first
    /// page; anything past the end means the last. An empty feed still
    /// has one valid, empty first page.
    async fn paginate(&self, filter: &PostFilter, requested: u64) -> Result<Page<Post>> {
        let total_items = self.repo.count_posts(filter).await?;
        let total_pages = total_items.div_ceil(PAGE_SIZE).max(1);
        let number = requested.clamp(1, total_pages);
        if number != requested {
            debug!(requested, clamped = number, "page number out of range");
        }
        let items = self
            .repo
            .list_posts(filter, PAGE_SIZE, (number - 1) * PAGE_SIZE)
            .await?;
        Ok(Page { items, number, total_pages, total_items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::MockBlogRepo;

    fn post(author_id: Uuid) -> Post {
        Post {
            id: Uuid::now_v7(),
            text: "hello".into(),
            group_id: None,
            author_id,
            image_id: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn home_clamps_overrun_to_last_page() {
        let mut repo = MockBlogRepo::new();
        repo.expect_count_posts().returning(|_| Ok(13));
        repo.expect_list_posts()
            .withf(|f, limit, offset| *f == PostFilter::All && *limit == 10 && *offset == 10)
            .returning(|_, _, _| Ok(vec![post(Uuid::now_v7()); 3]));

        let feed = FeedService::new(Arc::new(repo));
        let page = feed.home(999).await.unwrap();
        assert_eq!(page.number, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 3);
        assert!(!page.has_next());
    }

    #[tokio::test]
    async fn home_clamps_zero_to_first_page() {
        let mut repo = MockBlogRepo::new();
        repo.expect_count_posts().returning(|_| Ok(3));
        repo.expect_list_posts()
            .withf(|_, _, offset| *offset == 0)
            .returning(|_, _, _| Ok(vec![post(Uuid::now_v7()); 3]));

        let feed = FeedService::new(Arc::new(repo));
        let page = feed.home(0).await.unwrap();
        assert_eq!(page.number, 1);
    }

    #[tokio::test]
    async fn empty_feed_has_one_empty_page() {
        let mut repo = MockBlogRepo::new();
        repo.expect_count_posts().returning(|_| Ok(0));
        repo.expect_list_posts().returning(|_, _, _| Ok(vec![]));

        let feed = FeedService::new(Arc::new(repo));
        let page = feed.home(1).await.unwrap();
        assert_eq!(page.number, 1);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn unknown_group_slug_is_not_found() {
        let mut repo = MockBlogRepo::new();
        repo.expect_get_group_by_slug().returning(|_| Ok(None));

        let feed = FeedService::new(Arc::new(repo));
        let err = feed.group("nope", 1).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { kind: "group", .. }));
    }

    #[tokio::test]
    async fn profile_follow_flag_is_false_for_anonymous() {
        let author_id = Uuid::now_v7();
        let mut repo = MockBlogRepo::new();
        repo.expect_get_user_by_username().returning(move |name| {
            Ok(Some(User {
                id: author_id,
                username: name.to_string(),
                display_name: None,
                created_at: Utc::now(),
            }))
        });
        repo.expect_count_posts().returning(|_| Ok(1));
        repo.expect_list_posts()
            .returning(move |_, _, _| Ok(vec![post(author_id)]));
        // is_following must never be consulted without a viewer
        repo.expect_is_following().never();

        let feed = FeedService::new(Arc::new(repo));
        let profile = feed.profile("ada", None, 1).await.unwrap();
        assert!(!profile.following);
        assert_eq!(profile.posts_count, 1);
    }
}
