//! In-memory twins of the storage ports, built on dashmap. They honor
//! the same contracts as the Postgres/Redis adapters, including the
//! follow-edge constraints and comment orphaning on post removal.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use uuid::Uuid;

use domains::{
    AppError, BlogRepo, Comment, Follow, Group, PageCache, Post, PostFilter, Result, User,
};

#[derive(Default)]
pub struct MemoryRepo {
    users: DashMap<Uuid, User>,
    groups: DashMap<Uuid, Group>,
    posts: DashMap<Uuid, Post>,
    comments: DashMap<Uuid, Comment>,
    /// Keyed by (follower, author): pair uniqueness for free.
    follows: DashMap<(Uuid, Uuid), Follow>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn followed_authors(&self, viewer_id: Uuid) -> Vec<Uuid> {
        self.follows
            .iter()
            .filter(|entry| entry.key().0 == viewer_id)
            .map(|entry| entry.key().1)
            .collect()
    }

    fn matching_posts(&self, filter: &PostFilter) -> Vec<Post> {
        let followed = match filter {
            PostFilter::FollowedBy(viewer) => Some(self.followed_authors(*viewer)),
            _ => None,
        };
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|entry| match filter {
                PostFilter::All => true,
                PostFilter::Group(id) => entry.group_id == Some(*id),
                PostFilter::Author(id) => entry.author_id == *id,
                PostFilter::FollowedBy(_) => followed
                    .as_ref()
                    .is_some_and(|authors| authors.contains(&entry.author_id)),
            })
            .map(|entry| entry.value().clone())
            .collect();
        // created_at desc, id desc — the listing contract
        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        posts
    }
}

#[async_trait]
impl BlogRepo for MemoryRepo {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.clone()))
    }

    async fn insert_user(&self, user: User) -> Result<()> {
        self.users.insert(user.id, user);
        Ok(())
    }

    async fn get_group(&self, id: Uuid) -> Result<Option<Group>> {
        Ok(self.groups.get(&id).map(|g| g.clone()))
    }

    async fn get_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        Ok(self
            .groups
            .iter()
            .find(|g| g.slug == slug)
            .map(|g| g.clone()))
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let mut groups: Vec<Group> = self.groups.iter().map(|g| g.clone()).collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn insert_group(&self, group: Group) -> Result<()> {
        self.groups.insert(group.id, group);
        Ok(())
    }

    async fn insert_post(&self, post: Post) -> Result<()> {
        self.posts.insert(post.id, post);
        Ok(())
    }

    async fn update_post(&self, post: Post) -> Result<()> {
        self.posts.insert(post.id, post);
        Ok(())
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>> {
        Ok(self.posts.get(&id).map(|p| p.clone()))
    }

    async fn remove_post(&self, id: Uuid) -> Result<bool> {
        let removed = self.posts.remove(&id).is_some();
        if removed {
            // mirror ON DELETE SET NULL on comments.post_id
            for mut comment in self.comments.iter_mut() {
                if comment.post_id == Some(id) {
                    comment.post_id = None;
                }
            }
        }
        Ok(removed)
    }

    async fn count_posts(&self, filter: &PostFilter) -> Result<u64> {
        Ok(self.matching_posts(filter).len() as u64)
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Post>> {
        Ok(self
            .matching_posts(filter)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn insert_comment(&self, comment: Comment) -> Result<()> {
        self.comments.insert(comment.id, comment);
        Ok(())
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .comments
            .iter()
            .filter(|c| c.post_id == Some(post_id))
            .map(|c| c.clone())
            .collect();
        comments.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(comments)
    }

    async fn put_follow(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool> {
        if follower_id == author_id {
            // mirror the CHECK (follower_id <> author_id) constraint
            return Err(AppError::Internal("self-follow rejected by store".into()));
        }
        let key = (follower_id, author_id);
        if self.follows.contains_key(&key) {
            return Ok(false);
        }
        self.follows
            .insert(key, Follow { id: Uuid::now_v7(), follower_id, author_id });
        Ok(true)
    }

    async fn delete_follow(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool> {
        Ok(self.follows.remove(&(follower_id, author_id)).is_some())
    }

    async fn is_following(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool> {
        Ok(self.follows.contains_key(&(follower_id, author_id)))
    }
}

/// In-memory media store for tests and development. Content-addressed
/// like the local-disk adapter, minus the filesystem.
#[derive(Default)]
pub struct MemoryMediaStore {
    blobs: DashMap<String, Bytes>,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl domains::MediaStore for MemoryMediaStore {
    async fn save(&self, data: Bytes, content_type: &mime::Mime) -> Result<String> {
        if content_type.type_() != mime::IMAGE {
            return Err(AppError::invalid("image", "not an image upload"));
        }
        let id = format!("mem-{:x}", content_key(&data));
        self.blobs.insert(id.clone(), data);
        Ok(id)
    }

    fn url(&self, image_id: &str) -> String {
        format!("/media/{image_id}")
    }
}

// cheap stand-in for a content hash; collisions are irrelevant here
fn content_key(data: &[u8]) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    data.hash(&mut hasher);
    hasher.finish()
}

/// Page cache on a dashmap with per-entry deadlines. Expired entries
/// are dropped lazily on read.
#[derive(Default)]
pub struct MemoryPageCache {
    entries: DashMap<String, (Bytes, Instant)>,
}

impl MemoryPageCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PageCache for MemoryPageCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        if let Some(entry) = self.entries.get(key) {
            let (body, deadline) = entry.value();
            if Instant::now() < *deadline {
                return Ok(Some(body.clone()));
            }
        }
        self.entries.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, body: Bytes, ttl: Duration) -> Result<()> {
        self.entries
            .insert(key.to_string(), (body, Instant::now() + ttl));
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
