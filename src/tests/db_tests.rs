#[cfg(test)]
mod tests {
    use crate::config::BootstrapConfig;
    use crate::db;
    use crate::error::AppError;
    use crate::models::Role;
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    async fn setup_test_db() -> (SqlitePool, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("db.sqlite").display());
        let pool = db::connect(&url, 2).await.unwrap();
        db::init_db(&pool).await.unwrap();
        (pool, dir)
    }

    async fn insert_user(pool: &SqlitePool, name: &str) -> i64 {
        sqlx::query("INSERT INTO users (username, email) VALUES (?1, ?2)")
            .bind(name)
            .bind(format!("{}@example.com", name))
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    async fn insert_title(pool: &SqlitePool) -> i64 {
        sqlx::query("INSERT INTO titles (name, year) VALUES ('Solaris', 1972)")
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_init_db_creates_tables() {
        let (pool, _dir) = setup_test_db().await;

        let tables: Vec<String> = sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .fetch_all(&pool)
            .await
            .unwrap();

        for table in ["users", "categories", "genres", "titles", "title_genres", "reviews", "comments"] {
            assert!(tables.contains(&table.to_string()), "missing table {}", table);
        }

        // Idempotent
        db::init_db(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_review_uniqueness_and_score_check() {
        let (pool, _dir) = setup_test_db().await;
        let user = insert_user(&pool, "critic").await;
        let title = insert_title(&pool).await;

        let insert = "INSERT INTO reviews (text, score, author_id, title_id) VALUES ('t', ?1, ?2, ?3)";
        sqlx::query(insert).bind(5).bind(user).bind(title).execute(&pool).await.unwrap();

        let err = sqlx::query(insert).bind(6).bind(user).bind(title).execute(&pool).await.unwrap_err();
        assert!(err.as_database_error().map(|e| e.is_unique_violation()).unwrap_or(false));

        let other = insert_user(&pool, "other").await;
        assert!(sqlx::query(insert).bind(11).bind(other).bind(title).execute(&pool).await.is_err());
    }

    #[tokio::test]
    async fn test_deleting_user_cascades() {
        let (pool, _dir) = setup_test_db().await;
        let author = insert_user(&pool, "author").await;
        let title = insert_title(&pool).await;

        let review = sqlx::query("INSERT INTO reviews (text, score, author_id, title_id) VALUES ('t', 7, ?1, ?2)")
            .bind(author)
            .bind(title)
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        sqlx::query("INSERT INTO comments (text, author_id, review_id) VALUES ('c', ?1, ?2)")
            .bind(author)
            .bind(review)
            .execute(&pool)
            .await
            .unwrap();

        sqlx::query("DELETE FROM users WHERE id = ?1").bind(author).execute(&pool).await.unwrap();

        let reviews: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews").fetch_one(&pool).await.unwrap();
        let comments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments").fetch_one(&pool).await.unwrap();
        assert_eq!((reviews, comments), (0, 0));
    }

    #[tokio::test]
    async fn test_unique_violation_maps_to_generic_validation_error() {
        let (pool, _dir) = setup_test_db().await;
        insert_user(&pool, "alice").await;

        let err = sqlx::query("INSERT INTO users (username, email) VALUES ('alice', 'other@example.com')")
            .execute(&pool)
            .await
            .unwrap_err();
        match AppError::from(err) {
            AppError::ValidationError { field, message } => {
                assert_eq!(field, "non_field_errors");
                assert!(!message.contains("users.username"));
                assert!(!message.contains("UNIQUE"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_deleting_genre_removes_links_only() {
        let (pool, _dir) = setup_test_db().await;
        let title = insert_title(&pool).await;
        let genre = sqlx::query("INSERT INTO genres (name, slug) VALUES ('Drama', 'drama')")
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        sqlx::query("INSERT INTO title_genres (title_id, genre_id) VALUES (?1, ?2)")
            .bind(title)
            .bind(genre)
            .execute(&pool)
            .await
            .unwrap();

        sqlx::query("DELETE FROM genres WHERE id = ?1").bind(genre).execute(&pool).await.unwrap();

        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM title_genres").fetch_one(&pool).await.unwrap();
        let titles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM titles").fetch_one(&pool).await.unwrap();
        assert_eq!((links, titles), (0, 1));
    }

    #[tokio::test]
    async fn test_bootstrap_admin_creates_and_promotes() {
        let (pool, _dir) = setup_test_db().await;

        db::ensure_bootstrap_admin(&pool, &BootstrapConfig::default()).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users").fetch_one(&pool).await.unwrap();
        assert_eq!(count, 0);

        insert_user(&pool, "root").await;
        let cfg = BootstrapConfig {
            admin_username: Some("root".to_string()),
            admin_email: Some("root@example.com".to_string()),
        };
        db::ensure_bootstrap_admin(&pool, &cfg).await.unwrap();

        let role: Role = sqlx::query_scalar("SELECT role FROM users WHERE username = 'root'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(role, Role::Admin);
    }
}
