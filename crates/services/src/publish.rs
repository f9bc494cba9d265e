//! # Publishing
//!
//! Post creation and owner-only edits. Authorization comes back as a
//! typed [`AppError::Forbidden`]; turning that into a silent redirect
//! is the HTTP layer's business.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use mime::Mime;
use tracing::info;
use uuid::Uuid;

use domains::{AppError, BlogRepo, FieldError, MediaStore, Post, Result};

/// A raw image upload as it came off the form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Bytes,
    pub content_type: Mime,
}

/// What the create/edit form submits.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub text: String,
    pub group_id: Option<Uuid>,
    /// None keeps the stored image on edit; Some replaces it.
    pub image: Option<ImageUpload>,
}

pub struct PublishService {
    repo: Arc<dyn BlogRepo>,
    media: Arc<dyn MediaStore>,
}

impl PublishService {
    pub fn new(repo: Arc<dyn BlogRepo>, media: Arc<dyn MediaStore>) -> Self {
        Self { repo, media }
    }

    pub async fn create_post(&self, author_id: Uuid, draft: PostDraft) -> Result<Post> {
        self.check(&draft).await?;
        let image_id = self.store_image(&draft).await?;
        let post = Post {
            id: Uuid::now_v7(),
            text: draft.text.trim().to_string(),
            group_id: draft.group_id,
            author_id,
            image_id,
            created_at: Utc::now(),
        };
        self.repo.insert_post(post.clone()).await?;
        info!(post_id = %post.id, author = %author_id, "post created");
        Ok(post)
    }

    /// Owner-only. `Forbidden` when the editor is not the author; the
    /// stored row is untouched in that case. `created_at` never changes.
    pub async fn edit_post(
        &self,
        post_id: Uuid,
        editor_id: Uuid,
        draft: PostDraft,
    ) -> Result<Post> {
        let stored = self
            .repo
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::not_found("post", post_id.to_string()))?;
        if stored.author_id != editor_id {
            return Err(AppError::Forbidden);
        }
        self.check(&draft).await?;
        let image_id = match self.store_image(&draft).await? {
            Some(id) => Some(id),
            None => stored.image_id,
        };
        let post = Post {
            id: stored.id,
            text: draft.text.trim().to_string(),
            group_id: draft.group_id,
            author_id: stored.author_id,
            image_id,
            created_at: stored.created_at,
        };
        self.repo.update_post(post.clone()).await?;
        info!(post_id = %post.id, "post edited");
        Ok(post)
    }

    /// Group list for the create/edit form dropdown.
    pub async fn groups(&self) -> Result<Vec<domains::Group>> {
        self.repo.list_groups().await
    }

    /// Ops/test path; no public route reaches this.
    pub async fn remove_post(&self, post_id: Uuid) -> Result<()> {
        if !self.repo.remove_post(post_id).await? {
            return Err(AppError::not_found("post", post_id.to_string()));
        }
        Ok(())
    }

    /// Field checks shared by create and edit. Text must be non-empty
    /// after trimming; an attached image must be non-empty; a group
    /// reference must resolve.
    async fn check(&self, draft: &PostDraft) -> Result<()> {
        let mut errors = Vec::new();
        if draft.text.trim().is_empty() {
            errors.push(FieldError::new("text", "post text is required"));
        }
        if let Some(image) = &draft.image {
            if image.bytes.is_empty() {
                errors.push(FieldError::new("image", "uploaded image is empty"));
            }
        }
        if let Some(group_id) = draft.group_id {
            if self.repo.get_group(group_id).await?.is_none() {
                errors.push(FieldError::new("group", "unknown group"));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Invalid(errors))
        }
    }

    async fn store_image(&self, draft: &PostDraft) -> Result<Option<String>> {
        match &draft.image {
            Some(image) => {
                let id = self
                    .media
                    .save(image.bytes.clone(), &image.content_type)
                    .await?;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }
}
