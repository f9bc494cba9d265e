//! Postgres implementation of [`BlogRepo`] via sqlx. Queries are
//! runtime-checked; row structs map SQL columns back onto the domain
//! models.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use uuid::Uuid;

use domains::{
    AppError, BlogRepo, Comment, Group, Post, PostFilter, Result, User,
};

pub struct PgRepo {
    pool: PgPool,
}

impl PgRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled migrations. Called once at startup.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn internal(err: sqlx::Error) -> AppError {
    AppError::Internal(format!("postgres: {err}"))
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    display_name: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            username: r.username,
            display_name: r.display_name,
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
struct GroupRow {
    id: Uuid,
    title: String,
    slug: String,
    description: String,
    created_at: DateTime<Utc>,
}

impl From<GroupRow> for Group {
    fn from(r: GroupRow) -> Self {
        Group {
            id: r.id,
            title: r.title,
            slug: r.slug,
            description: r.description,
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
struct PostRow {
    id: Uuid,
    text: String,
    group_id: Option<Uuid>,
    author_id: Uuid,
    image_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(r: PostRow) -> Self {
        Post {
            id: r.id,
            text: r.text,
            group_id: r.group_id,
            author_id: r.author_id,
            image_id: r.image_id,
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
struct CommentRow {
    id: Uuid,
    post_id: Option<Uuid>,
    author_id: Option<Uuid>,
    text: String,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(r: CommentRow) -> Self {
        Comment {
            id: r.id,
            post_id: r.post_id,
            author_id: r.author_id,
            text: r.text,
            created_at: r.created_at,
        }
    }
}

const POST_COLS: &str = "id, text, group_id, author_id, image_id, created_at";

#[async_trait]
impl BlogRepo for PgRepo {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, display_name, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?;
        Ok(row.map(Into::into))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, display_name, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?;
        Ok(row.map(Into::into))
    }

    async fn insert_user(&self, user: User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, username, display_name, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn get_group(&self, id: Uuid) -> Result<Option<Group>> {
        let row = sqlx::query_as::<_, GroupRow>(
            "SELECT id, title, slug, description, created_at FROM groups WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?;
        Ok(row.map(Into::into))
    }

    async fn get_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let row = sqlx::query_as::<_, GroupRow>(
            "SELECT id, title, slug, description, created_at FROM groups WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?;
        Ok(row.map(Into::into))
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT id, title, slug, description, created_at FROM groups ORDER BY title",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_group(&self, group: Group) -> Result<()> {
        sqlx::query(
            "INSERT INTO groups (id, title, slug, description, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(group.id)
        .bind(&group.title)
        .bind(&group.slug)
        .bind(&group.description)
        .bind(group.created_at)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn insert_post(&self, post: Post) -> Result<()> {
        sqlx::query(
            "INSERT INTO posts (id, text, group_id, author_id, image_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(post.id)
        .bind(&post.text)
        .bind(post.group_id)
        .bind(post.author_id)
        .bind(&post.image_id)
        .bind(post.created_at)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn update_post(&self, post: Post) -> Result<()> {
        sqlx::query(
            "UPDATE posts SET text = $2, group_id = $3, image_id = $4 WHERE id = $1",
        )
        .bind(post.id)
        .bind(&post.text)
        .bind(post.group_id)
        .bind(&post.image_id)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?;
        Ok(row.map(Into::into))
    }

    async fn remove_post(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_posts(&self, filter: &PostFilter) -> Result<u64> {
        let count: i64 = match filter {
            PostFilter::All => {
                sqlx::query_scalar("SELECT COUNT(*) FROM posts")
                    .fetch_one(&self.pool)
                    .await
            }
            PostFilter::Group(id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE group_id = $1")
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await
            }
            PostFilter::Author(id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = $1")
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await
            }
            PostFilter::FollowedBy(viewer) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM posts p \
                     JOIN follows f ON f.author_id = p.author_id \
                     WHERE f.follower_id = $1",
                )
                .bind(viewer)
                .fetch_one(&self.pool)
                .await
            }
        }
        .map_err(internal)?;
        Ok(count as u64)
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Post>> {
        let (limit, offset) = (limit as i64, offset as i64);
        let rows = match filter {
            PostFilter::All => {
                sqlx::query_as::<_, PostRow>(&format!(
                    "SELECT {POST_COLS} FROM posts \
                     ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
            PostFilter::Group(id) => {
                sqlx::query_as::<_, PostRow>(&format!(
                    "SELECT {POST_COLS} FROM posts WHERE group_id = $1 \
                     ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
                ))
                .bind(id)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
            PostFilter::Author(id) => {
                sqlx::query_as::<_, PostRow>(&format!(
                    "SELECT {POST_COLS} FROM posts WHERE author_id = $1 \
                     ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
                ))
                .bind(id)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
            PostFilter::FollowedBy(viewer) => {
                sqlx::query_as::<_, PostRow>(
                    "SELECT p.id, p.text, p.group_id, p.author_id, p.image_id, p.created_at \
                     FROM posts p \
                     JOIN follows f ON f.author_id = p.author_id \
                     WHERE f.follower_id = $1 \
                     ORDER BY p.created_at DESC, p.id DESC LIMIT $2 OFFSET $3",
                )
                .bind(viewer)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(internal)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_comment(&self, comment: Comment) -> Result<()> {
        sqlx::query(
            "INSERT INTO comments (id, post_id, author_id, text, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(comment.id)
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            "SELECT id, post_id, author_id, text, created_at FROM comments \
             WHERE post_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn put_follow(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool> {
        // ON CONFLICT swallows the racing duplicate; the unique
        // constraint is the real guarantee.
        let result = sqlx::query(
            "INSERT INTO follows (id, follower_id, author_id) VALUES ($1, $2, $3) \
             ON CONFLICT (follower_id, author_id) DO NOTHING",
        )
        .bind(Uuid::now_v7())
        .bind(follower_id)
        .bind(author_id)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_follow(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM follows WHERE follower_id = $1 AND author_id = $2",
        )
        .bind(follower_id)
        .bind(author_id)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_following(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM follows \
             WHERE follower_id = $1 AND author_id = $2)",
        )
        .bind(follower_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await
        .map_err(internal)?;
        Ok(exists)
    }
}
