//! # Domain Models
//!
//! Core entities of the blog. UUID v7 gives time-ordered, globally
//! unique ids, so the id-descending tie-break in feeds follows
//! creation order even when timestamps collide.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An author/reader. Identity management is external; this core only
/// reads user rows (the seed tool inserts demo ones).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Unique handle used in profile URLs.
    pub username: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A topic posts may be assigned to (e.g., "rust", "cooking").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub title: String,
    /// The URL slug, unique across groups.
    pub slug: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// The fundamental publishing unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub text: String,
    /// Cleared (not cascaded) if the group is deleted.
    pub group_id: Option<Uuid>,
    pub author_id: Uuid,
    /// Id of the media handled by MediaStore.
    pub image_id: Option<String>,
    /// Server-assigned, immutable after creation.
    pub created_at: DateTime<Utc>,
}

/// A reader's comment under a post. Immutable after creation; post and
/// author references are cleared on deletion, the row persists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A directed follower → author edge. The store declares
/// UNIQUE (follower_id, author_id) and forbids self-follow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follow {
    pub id: Uuid,
    pub follower_id: Uuid,
    pub author_id: Uuid,
}

/// Which posts a listing query selects. Every feed view is one variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    /// The global stream.
    All,
    /// Posts assigned to one group.
    Group(Uuid),
    /// Posts by one author.
    Author(Uuid),
    /// Posts by every author the given viewer follows.
    FollowedBy(Uuid),
}

/// One page of a feed, with enough numbers for the pager widget.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based, already clamped into the valid range.
    pub number: u64,
    pub total_pages: u64,
    pub total_items: u64,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_navigation_flags() {
        let first = Page { items: vec![1, 2], number: 1, total_pages: 3, total_items: 25 };
        assert!(!first.has_previous());
        assert!(first.has_next());

        let last = Page { items: vec![5], number: 3, total_pages: 3, total_items: 25 };
        assert!(last.has_previous());
        assert!(!last.has_next());
    }

    #[test]
    fn post_ids_are_time_ordered() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        assert!(b >= a);
    }
}
