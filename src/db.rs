use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;

use crate::config::BootstrapConfig;
use crate::models::Role;

/// Opens the pool with foreign keys enforced on every connection.
pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(10));
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    if let Err(e) = sqlx::query("PRAGMA journal_mode=WAL;").execute(pool).await {
        tracing::warn!("Failed to set WAL journal mode: {}", e);
    }
    if let Err(e) = sqlx::query("PRAGMA synchronous=NORMAL;").execute(pool).await {
        tracing::warn!("Failed to set synchronous mode: {}", e);
    }
    // Cascades depend on this
    sqlx::query("PRAGMA foreign_keys=ON;").execute(pool).await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'moderator', 'admin')),
            bio TEXT NOT NULL DEFAULT '',
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            confirmation_code TEXT NULL UNIQUE,
            confirmation_code_issued_at INTEGER NULL,
            date_joined TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now'))
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            slug TEXT NOT NULL UNIQUE
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS genres (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            slug TEXT NOT NULL UNIQUE
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS titles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            year INTEGER NOT NULL,
            description TEXT NULL,
            category_id INTEGER NULL,
            FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE SET NULL
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS title_genres (
            title_id INTEGER NOT NULL,
            genre_id INTEGER NOT NULL,
            PRIMARY KEY (title_id, genre_id),
            FOREIGN KEY(title_id) REFERENCES titles(id) ON DELETE CASCADE,
            FOREIGN KEY(genre_id) REFERENCES genres(id) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    // UNIQUE(author_id, title_id) backs the duplicate-review check against concurrent writers
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS reviews (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT NOT NULL,
            score INTEGER NOT NULL CHECK (score BETWEEN 1 AND 10),
            pub_date TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            author_id INTEGER NOT NULL,
            title_id INTEGER NOT NULL,
            UNIQUE (author_id, title_id),
            FOREIGN KEY(author_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY(title_id) REFERENCES titles(id) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT NOT NULL,
            pub_date TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            author_id INTEGER NOT NULL,
            review_id INTEGER NOT NULL,
            FOREIGN KEY(author_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY(review_id) REFERENCES reviews(id) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    let indexes = [
        ("idx_titles_year", "CREATE INDEX IF NOT EXISTS idx_titles_year ON titles(year DESC)"),
        ("idx_titles_name", "CREATE INDEX IF NOT EXISTS idx_titles_name ON titles(name)"),
        ("idx_titles_category", "CREATE INDEX IF NOT EXISTS idx_titles_category ON titles(category_id)"),
        ("idx_title_genres_genre", "CREATE INDEX IF NOT EXISTS idx_title_genres_genre ON title_genres(genre_id)"),
        ("idx_reviews_title_pub", "CREATE INDEX IF NOT EXISTS idx_reviews_title_pub ON reviews(title_id, pub_date DESC)"),
        ("idx_comments_review_pub", "CREATE INDEX IF NOT EXISTS idx_comments_review_pub ON comments(review_id, pub_date DESC)"),
    ];

    for (name, query) in indexes {
        if let Err(e) = sqlx::query(query).execute(pool).await {
            tracing::warn!("Failed to create index {}: {}", name, e);
        }
    }

    Ok(())
}

/// Creates the configured admin account, or promotes it if it already exists.
pub async fn ensure_bootstrap_admin(pool: &SqlitePool, cfg: &BootstrapConfig) -> anyhow::Result<()> {
    let (Some(username), Some(email)) = (cfg.admin_username.as_deref(), cfg.admin_email.as_deref()) else {
        return Ok(());
    };
    if username.trim().is_empty() || email.trim().is_empty() {
        return Ok(());
    }

    let result = sqlx::query(
        r#"INSERT INTO users (username, email, role) VALUES (?1, ?2, ?3)
           ON CONFLICT(username) DO UPDATE SET role = excluded.role"#,
    )
    .bind(username)
    .bind(email)
    .bind(Role::Admin.as_str())
    .execute(pool)
    .await?;

    tracing::info!(username, rows = result.rows_affected(), "Bootstrap admin ensured");
    Ok(())
}
