//! Feed composition and pagination against the in-memory store.

use integration_tests::{seed_group, seed_post, seed_user, stack};

#[tokio::test]
async fn thirteen_posts_split_ten_then_three() {
    let s = stack();
    let author = seed_user(&s.repo, "ada").await;
    for i in 0..13 {
        seed_post(&s.repo, author.id, None, &format!("post {i}"), i).await;
    }

    let first = s.feed.home(1).await.unwrap();
    assert_eq!(first.items.len(), 10);
    assert_eq!(first.total_pages, 2);
    assert_eq!(first.total_items, 13);
    // newest first
    assert_eq!(first.items[0].text, "post 0");

    let second = s.feed.home(2).await.unwrap();
    assert_eq!(second.items.len(), 3);
    assert!(!second.has_next());
}

#[tokio::test]
async fn group_feed_pages_and_never_leaks_other_groups() {
    let s = stack();
    let author = seed_user(&s.repo, "ada").await;
    let group = seed_group(&s.repo, "test-slug").await;
    let other = seed_group(&s.repo, "other-slug").await;
    for i in 0..13 {
        seed_post(&s.repo, author.id, Some(group.id), &format!("grouped {i}"), i).await;
    }
    seed_post(&s.repo, author.id, Some(other.id), "elsewhere", 99).await;

    let first = s.feed.group("test-slug", 1).await.unwrap();
    assert_eq!(first.page.items.len(), 10);

    let second = s.feed.group("test-slug", 2).await.unwrap();
    assert_eq!(second.page.items.len(), 3);
    for post in &second.page.items {
        assert_eq!(post.group_id, Some(group.id));
    }

    let other_feed = s.feed.group("other-slug", 1).await.unwrap();
    assert_eq!(other_feed.page.items.len(), 1);
    assert_eq!(other_feed.page.items[0].text, "elsewhere");
}

#[tokio::test]
async fn profile_reports_count_and_follow_state() {
    let s = stack();
    let author = seed_user(&s.repo, "writer").await;
    let reader = seed_user(&s.repo, "reader").await;
    for i in 0..3 {
        seed_post(&s.repo, author.id, None, &format!("post {i}"), i).await;
    }

    let before = s.feed.profile("writer", Some(reader.id), 1).await.unwrap();
    assert_eq!(before.posts_count, 3);
    assert!(!before.following);

    s.engage.follow(reader.id, "writer").await.unwrap();
    let after = s.feed.profile("writer", Some(reader.id), 1).await.unwrap();
    assert!(after.following);
}

#[tokio::test]
async fn following_feed_is_paginated_and_scoped() {
    let s = stack();
    let reader = seed_user(&s.repo, "reader").await;
    let followed = seed_user(&s.repo, "followed").await;
    let stranger = seed_user(&s.repo, "stranger").await;
    for i in 0..12 {
        seed_post(&s.repo, followed.id, None, &format!("followed {i}"), i).await;
    }
    seed_post(&s.repo, stranger.id, None, "stranger post", 0).await;

    s.engage.follow(reader.id, "followed").await.unwrap();

    let first = s.feed.following(reader.id, 1).await.unwrap();
    assert_eq!(first.items.len(), 10);
    assert_eq!(first.total_items, 12);
    assert!(first.items.iter().all(|p| p.author_id == followed.id));

    let second = s.feed.following(reader.id, 2).await.unwrap();
    assert_eq!(second.items.len(), 2);
}

#[tokio::test]
async fn detail_view_orders_comments_oldest_first() {
    let s = stack();
    let author = seed_user(&s.repo, "ada").await;
    let reader = seed_user(&s.repo, "reader").await;
    let post = seed_post(&s.repo, author.id, None, "discuss", 10).await;

    s.engage.add_comment(post.id, reader.id, "first").await.unwrap();
    s.engage.add_comment(post.id, reader.id, "second").await.unwrap();

    let detail = s.feed.post_detail(post.id).await.unwrap();
    assert_eq!(detail.comments.len(), 2);
    assert_eq!(detail.comments[0].text, "first");
    assert_eq!(detail.comments[1].text, "second");
    assert_eq!(detail.author_posts_count, 1);
}
