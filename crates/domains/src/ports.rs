//! # Ports
//!
//! Contracts the adapter crates implement. The services only ever see
//! these traits; swapping Postgres for the in-memory store (or Redis
//! for the dashmap cache) is a wiring decision in `cmd/rusty-blog`.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use mime::Mime;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Comment, Group, Post, PostFilter, User};

/// Fixed page size shared by every feed view.
pub const PAGE_SIZE: u64 = 10;

/// Data persistence contract for users, groups, posts, comments and
/// follow edges.
///
/// Listing order is part of the contract: `list_posts` returns posts by
/// `created_at` descending, id descending as the tie-break. Comments
/// come back oldest first.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BlogRepo: Send + Sync {
    // User operations (read-mostly; identity lives elsewhere)
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn insert_user(&self, user: User) -> Result<()>;

    // Group operations
    async fn get_group(&self, id: Uuid) -> Result<Option<Group>>;
    async fn get_group_by_slug(&self, slug: &str) -> Result<Option<Group>>;
    async fn list_groups(&self) -> Result<Vec<Group>>;
    async fn insert_group(&self, group: Group) -> Result<()>;

    // Post operations
    async fn insert_post(&self, post: Post) -> Result<()>;
    async fn update_post(&self, post: Post) -> Result<()>;
    async fn get_post(&self, id: Uuid) -> Result<Option<Post>>;
    /// Removal is an ops/test path only; no public route deletes posts.
    async fn remove_post(&self, id: Uuid) -> Result<bool>;
    async fn count_posts(&self, filter: &PostFilter) -> Result<u64>;
    async fn list_posts(&self, filter: &PostFilter, limit: u64, offset: u64)
        -> Result<Vec<Post>>;

    // Comment operations
    async fn insert_comment(&self, comment: Comment) -> Result<()>;
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>>;

    // Follow operations
    /// Idempotent get-or-create. Returns false when the edge already
    /// existed (the duplicate is swallowed, never doubled).
    async fn put_follow(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool>;
    /// Returns false when no such edge existed.
    async fn delete_follow(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool>;
    async fn is_following(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool>;
}

/// Whole-page cache with a fixed expiry. One key, bounded staleness;
/// a hit returns the stored bytes verbatim no matter what the store
/// did in the meantime.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PageCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;
    async fn set(&self, key: &str, body: Bytes, ttl: Duration) -> Result<()>;
    async fn invalidate(&self, key: &str) -> Result<()>;
}

/// Media persistence contract for post images.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Saves raw bytes, returns an image id for the Post model.
    async fn save(&self, data: Bytes, content_type: &Mime) -> Result<String>;
    /// Public URL for a stored image id.
    fn url(&self, image_id: &str) -> String;
}

/// The authenticated identity resolved from a session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub id: Uuid,
    pub username: String,
}

/// Session token contract. Issuing tokens is an external identity
/// system's job; the seed tool uses `issue` to mint local ones.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Sessions: Send + Sync {
    fn issue(&self, user: &User) -> Result<String>;
    /// None for an expired, malformed or forged token.
    fn verify(&self, token: &str) -> Option<Viewer>;
}
