//! Development seeder. Inserts two demo users, a demo group and a
//! handful of posts through the Postgres adapter, then prints
//! ready-to-paste session cookies for both users.

use anyhow::Context;
use chrono::{Duration, Utc};
use secrecy::ExposeSecret;
use uuid::Uuid;

use domains::{BlogRepo, Group, Post, Sessions, User};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = configs::Settings::load().context("loading configuration")?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(settings.database.url.expose_secret())
        .await
        .context("connecting to postgres")?;
    let repo = storage_adapters::PgRepo::new(pool);
    repo.migrate().await.context("running migrations")?;

    let sessions = auth_adapters::JwtSessions::new(
        settings.auth.jwt_secret.expose_secret().as_bytes(),
        settings.auth.session_ttl_hours,
    );

    let ada = demo_user("ada", Some("Ada Lovelace"));
    let grace = demo_user("grace", Some("Grace Hopper"));
    repo.insert_user(ada.clone()).await?;
    repo.insert_user(grace.clone()).await?;

    let group = Group {
        id: Uuid::now_v7(),
        title: "Rust".to_string(),
        slug: "rust".to_string(),
        description: "Posts about the Rust language".to_string(),
        created_at: Utc::now(),
    };
    repo.insert_group(group.clone()).await?;

    for (i, text) in [
        "Hello from the seed tool.",
        "Borrow checking is an acquired taste.",
        "Lifetime annotations considered helpful.",
    ]
    .iter()
    .enumerate()
    {
        repo.insert_post(Post {
            id: Uuid::now_v7(),
            text: text.to_string(),
            group_id: Some(group.id),
            author_id: ada.id,
            image_id: None,
            created_at: Utc::now() - Duration::minutes(i as i64),
        })
        .await?;
    }

    println!("seeded users, group '{}' and posts", group.slug);
    println!("ada cookie:   session={}", sessions.issue(&ada)?);
    println!("grace cookie: session={}", sessions.issue(&grace)?);
    Ok(())
}

fn demo_user(username: &str, display_name: Option<&str>) -> User {
    User {
        id: Uuid::now_v7(),
        username: username.to_string(),
        display_name: display_name.map(str::to_string),
        created_at: Utc::now(),
    }
}
