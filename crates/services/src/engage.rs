//! # Engagement
//!
//! Comments and follow edges. Follow creation is idempotent at the
//! write path; the store additionally declares a unique constraint so
//! racing duplicates cannot slip through.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use domains::{AppError, BlogRepo, Comment, Result};

/// Hard cap on comment length, in characters.
pub const MAX_COMMENT_CHARS: usize = 400;

pub struct EngageService {
    repo: Arc<dyn BlogRepo>,
}

impl EngageService {
    pub fn new(repo: Arc<dyn BlogRepo>) -> Self {
        Self { repo }
    }

    pub async fn add_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        text: &str,
    ) -> Result<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::invalid("text", "comment text is required"));
        }
        if text.chars().count() > MAX_COMMENT_CHARS {
            return Err(AppError::invalid(
                "text",
                format!("comment exceeds {MAX_COMMENT_CHARS} characters"),
            ));
        }
        if self.repo.get_post(post_id).await?.is_none() {
            return Err(AppError::not_found("post", post_id.to_string()));
        }
        let comment = Comment {
            id: Uuid::now_v7(),
            post_id: Some(post_id),
            author_id: Some(author_id),
            text: text.to_string(),
            created_at: Utc::now(),
        };
        self.repo.insert_comment(comment.clone()).await?;
        Ok(comment)
    }

    /// Get-or-create. Self-follow is a silent no-op; a duplicate call
    /// never creates a second edge.
    pub async fn follow(&self, viewer_id: Uuid, username: &str) -> Result<()> {
        let author = self
            .repo
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("user", username))?;
        if author.id == viewer_id {
            debug!(viewer = %viewer_id, "self-follow ignored");
            return Ok(());
        }
        if self.repo.put_follow(viewer_id, author.id).await? {
            info!(follower = %viewer_id, author = %author.id, "follow edge created");
        }
        Ok(())
    }

    /// `NotFound` when the username does not resolve or no edge exists.
    pub async fn unfollow(&self, viewer_id: Uuid, username: &str) -> Result<()> {
        let author = self
            .repo
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("user", username))?;
        if !self.repo.delete_follow(viewer_id, author.id).await? {
            return Err(AppError::not_found("follow", username));
        }
        Ok(())
    }

    pub async fn is_following(&self, viewer_id: Uuid, author_id: Uuid) -> Result<bool> {
        self.repo.is_following(viewer_id, author_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{MockBlogRepo, User};

    fn user(id: Uuid, name: &str) -> User {
        User {
            id,
            username: name.to_string(),
            display_name: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn comment_of_401_chars_is_rejected() {
        let mut repo = MockBlogRepo::new();
        repo.expect_insert_comment().never();
        let svc = EngageService::new(Arc::new(repo));

        let long = "x".repeat(MAX_COMMENT_CHARS + 1);
        let err = svc
            .add_comment(Uuid::now_v7(), Uuid::now_v7(), &long)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Invalid(_)));
    }

    #[tokio::test]
    async fn comment_on_unknown_post_is_not_found() {
        let mut repo = MockBlogRepo::new();
        repo.expect_get_post().returning(|_| Ok(None));
        repo.expect_insert_comment().never();
        let svc = EngageService::new(Arc::new(repo));

        let err = svc
            .add_comment(Uuid::now_v7(), Uuid::now_v7(), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { kind: "post", .. }));
    }

    #[tokio::test]
    async fn self_follow_is_a_silent_noop() {
        let me = Uuid::now_v7();
        let mut repo = MockBlogRepo::new();
        repo.expect_get_user_by_username()
            .returning(move |name| Ok(Some(user(me, name))));
        repo.expect_put_follow().never();
        let svc = EngageService::new(Arc::new(repo));

        svc.follow(me, "myself").await.unwrap();
    }

    #[tokio::test]
    async fn unfollow_without_edge_is_not_found() {
        let author = Uuid::now_v7();
        let mut repo = MockBlogRepo::new();
        repo.expect_get_user_by_username()
            .returning(move |name| Ok(Some(user(author, name))));
        repo.expect_delete_follow().returning(|_, _| Ok(false));
        let svc = EngageService::new(Arc::new(repo));

        let err = svc.unfollow(Uuid::now_v7(), "ada").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { kind: "follow", .. }));
    }
}
