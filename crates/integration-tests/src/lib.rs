//! Shared fixtures for the integration tests: a fully wired service
//! stack on the in-memory adapters, plus entity builders.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use domains::{BlogRepo, Group, Post, User};
use services::{EngageService, FeedService, PublishService};
use storage_adapters::{MemoryMediaStore, MemoryRepo};

pub struct Stack {
    pub repo: Arc<MemoryRepo>,
    pub feed: FeedService,
    pub publish: PublishService,
    pub engage: EngageService,
}

pub fn stack() -> Stack {
    let repo = Arc::new(MemoryRepo::new());
    let repo_dyn: Arc<dyn BlogRepo> = repo.clone();
    Stack {
        repo,
        feed: FeedService::new(repo_dyn.clone()),
        publish: PublishService::new(repo_dyn.clone(), Arc::new(MemoryMediaStore::new())),
        engage: EngageService::new(repo_dyn),
    }
}

pub async fn seed_user(repo: &MemoryRepo, username: &str) -> User {
    let user = User {
        id: Uuid::now_v7(),
        username: username.to_string(),
        display_name: None,
        created_at: Utc::now(),
    };
    repo.insert_user(user.clone()).await.expect("insert user");
    user
}

pub async fn seed_group(repo: &MemoryRepo, slug: &str) -> Group {
    let group = Group {
        id: Uuid::now_v7(),
        title: slug.to_string(),
        slug: slug.to_string(),
        description: String::new(),
        created_at: Utc::now(),
    };
    repo.insert_group(group.clone()).await.expect("insert group");
    group
}

/// `minutes_ago` spaces posts out so ordering assertions are stable.
pub async fn seed_post(
    repo: &MemoryRepo,
    author_id: Uuid,
    group_id: Option<Uuid>,
    text: &str,
    minutes_ago: i64,
) -> Post {
    let post = Post {
        id: Uuid::now_v7(),
        text: text.to_string(),
        group_id,
        author_id,
        image_id: None,
        created_at: Utc::now() - Duration::minutes(minutes_ago),
    };
    repo.insert_post(post.clone()).await.expect("insert post");
    post
}
