//! Titles: the reviewable works.
//!
//! Every read computes `rating` as the mean review score in the same query that
//! loads the title, so there is no cached aggregate to keep in sync. Writes that
//! touch genre links run inside one transaction.

use std::collections::HashMap;

use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::{
    error::{validation, AppError, AppResult, OptionExt},
    extract::{ApiJson, ApiPath, ApiQuery},
    middleware::permissions::RequireAdmin,
    models::TitleRow,
    pagination::{Page, PageRequest},
    routes::helpers::{like_contains, non_blank},
    state::AppState,
    types::{CatalogItem, CreateTitleRequest, TitleDto, UpdateTitleRequest},
};

const TITLE_SELECT: &str = r#"
    SELECT t.id, t.name, t.year, t.description,
           c.name AS category_name, c.slug AS category_slug,
           (SELECT AVG(r.score) FROM reviews r WHERE r.title_id = t.id) AS rating
    FROM titles t
    LEFT JOIN categories c ON c.id = t.category_id"#;

#[derive(Debug, Default, Deserialize)]
pub struct TitleListQuery {
    pub genre: Option<String>,
    pub category: Option<String>,
    pub year: Option<i64>,
    pub name: Option<String>,
    pub page: Option<i64>,
}

/// Appends the `WHERE` clause for the list filters. Shared by the count and page queries.
fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, q: &TitleListQuery) {
    let mut sep = " WHERE ";
    if let Some(genre) = non_blank(&q.genre) {
        qb.push(sep)
            .push("EXISTS (SELECT 1 FROM title_genres tg JOIN genres g ON g.id = tg.genre_id WHERE tg.title_id = t.id AND g.slug = ")
            .push_bind(genre.to_string())
            .push(")");
        sep = " AND ";
    }
    if let Some(category) = non_blank(&q.category) {
        qb.push(sep).push("c.slug = ").push_bind(category.to_string());
        sep = " AND ";
    }
    if let Some(year) = q.year {
        qb.push(sep).push("t.year = ").push_bind(year);
        sep = " AND ";
    }
    if let Some(name) = non_blank(&q.name) {
        // SQLite LIKE is case-insensitive for ASCII.
        qb.push(sep).push("t.name LIKE ").push_bind(like_contains(name)).push(" ESCAPE '!'");
    }
}

/// Genre links for a batch of titles, keyed by title id.
async fn load_genres(db: &SqlitePool, title_ids: &[i64]) -> AppResult<HashMap<i64, Vec<CatalogItem>>> {
    let mut map: HashMap<i64, Vec<CatalogItem>> = HashMap::new();
    if title_ids.is_empty() {
        return Ok(map);
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT tg.title_id, g.name, g.slug FROM title_genres tg \
         JOIN genres g ON g.id = tg.genre_id WHERE tg.title_id IN (",
    );
    let mut separated = qb.separated(", ");
    for id in title_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY g.id");

    let rows: Vec<(i64, String, String)> = qb.build_query_as::<(i64, String, String)>().fetch_all(db).await?;
    for (title_id, name, slug) in rows {
        map.entry(title_id).or_default().push(CatalogItem { name, slug });
    }
    Ok(map)
}

fn to_dto(row: TitleRow, genre: Vec<CatalogItem>) -> TitleDto {
    let category = match (row.category_name, row.category_slug) {
        (Some(name), Some(slug)) => Some(CatalogItem { name, slug }),
        _ => None,
    };
    TitleDto {
        id: row.id,
        name: row.name,
        year: row.year,
        rating: row.rating,
        description: row.description,
        genre,
        category,
    }
}

pub(crate) async fn title_exists(db: &SqlitePool, title_id: i64) -> AppResult<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM titles WHERE id = ?1)")
        .bind(title_id)
        .fetch_one(db)
        .await?;
    if exists {
        Ok(())
    } else {
        Err(AppError::NotFound("Title not found".into()))
    }
}

async fn fetch_title(db: &SqlitePool, title_id: i64) -> AppResult<TitleDto> {
    let row: Option<TitleRow> = sqlx::query_as(&format!("{} WHERE t.id = ?1", TITLE_SELECT))
        .bind(title_id)
        .fetch_optional(db)
        .await?;
    let row = row.ok_or_not_found("Title")?;
    let mut genres = load_genres(db, &[row.id]).await?;
    let genre = genres.remove(&row.id).unwrap_or_default();
    Ok(to_dto(row, genre))
}

async fn resolve_category(conn: &mut SqliteConnection, slug: &str) -> AppResult<i64> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE slug = ?1")
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await?;
    id.ok_or_else(|| AppError::validation("category", format!("Category with slug '{}' does not exist.", slug)))
}

async fn resolve_genres(conn: &mut SqliteConnection, slugs: &[String]) -> AppResult<Vec<i64>> {
    let mut ids = Vec::with_capacity(slugs.len());
    for slug in slugs {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM genres WHERE slug = ?1")
            .bind(slug)
            .fetch_optional(&mut *conn)
            .await?;
        let id = id.ok_or_else(|| AppError::validation("genre", format!("Genre with slug '{}' does not exist.", slug)))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

async fn replace_genres(conn: &mut SqliteConnection, title_id: i64, genre_ids: &[i64]) -> AppResult<()> {
    sqlx::query("DELETE FROM title_genres WHERE title_id = ?1")
        .bind(title_id)
        .execute(&mut *conn)
        .await?;
    for genre_id in genre_ids {
        sqlx::query("INSERT INTO title_genres (title_id, genre_id) VALUES (?1, ?2)")
            .bind(title_id)
            .bind(genre_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

fn validate_title(name: &str, year: i64, description: Option<&str>) -> AppResult<()> {
    validation::validate_required_text(name, "name", Some(200))?;
    validation::validate_year(year)?;
    if let Some(description) = description {
        validation::validate_max_chars(description, "description", 200)?;
    }
    Ok(())
}

pub async fn list_titles(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(q): ApiQuery<TitleListQuery>,
) -> AppResult<Json<Page<TitleDto>>> {
    let page = PageRequest::new(q.page, state.config.pagination.page_size)?;

    let mut count_qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT COUNT(*) FROM titles t LEFT JOIN categories c ON c.id = t.category_id");
    push_filters(&mut count_qb, &q);

    let mut list_qb: QueryBuilder<Sqlite> = QueryBuilder::new(TITLE_SELECT);
    push_filters(&mut list_qb, &q);
    list_qb
        .push(" ORDER BY t.year DESC, t.id DESC LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());

    let count: i64 = count_qb.build_query_scalar::<i64>().fetch_one(&state.db).await?;
    let rows: Vec<TitleRow> = list_qb.build_query_as::<TitleRow>().fetch_all(&state.db).await?;

    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut genres = load_genres(&state.db, &ids).await?;
    let results = rows
        .into_iter()
        .map(|row| {
            let genre = genres.remove(&row.id).unwrap_or_default();
            to_dto(row, genre)
        })
        .collect();

    Ok(Json(page.into_page(count, results, &uri)?))
}

pub async fn create_title(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateTitleRequest>,
) -> AppResult<impl IntoResponse> {
    let name = req.name.trim().to_string();
    validate_title(&name, req.year, req.description.as_deref())?;

    let mut tx = state.db.begin().await?;
    let category_id = match non_blank(&req.category) {
        Some(slug) => Some(resolve_category(&mut tx, slug).await?),
        None => None,
    };
    let genre_ids = resolve_genres(&mut tx, &req.genre).await?;

    let id = sqlx::query("INSERT INTO titles (name, year, description, category_id) VALUES (?1, ?2, ?3, ?4)")
        .bind(&name)
        .bind(req.year)
        .bind(&req.description)
        .bind(category_id)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
    replace_genres(&mut tx, id, &genre_ids).await?;
    tx.commit().await?;

    state.metrics.inc_titles_created();
    tracing::info!(admin_id = admin.id, title_id = id, "Title created");

    let title = fetch_title(&state.db, id).await?;
    Ok((StatusCode::CREATED, Json(title)))
}

pub async fn get_title(State(state): State<AppState>, ApiPath(title_id): ApiPath<i64>) -> AppResult<Json<TitleDto>> {
    Ok(Json(fetch_title(&state.db, title_id).await?))
}

pub async fn update_title(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(title_id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateTitleRequest>,
) -> AppResult<Json<TitleDto>> {
    let mut tx = state.db.begin().await?;

    let current: Option<(String, i64, Option<String>, Option<i64>)> =
        sqlx::query_as("SELECT name, year, description, category_id FROM titles WHERE id = ?1")
            .bind(title_id)
            .fetch_optional(&mut *tx)
            .await?;
    let (mut name, mut year, mut description, mut category_id) = current.ok_or_not_found("Title")?;

    if let Some(new_name) = req.name {
        name = new_name.trim().to_string();
    }
    if let Some(new_year) = req.year {
        year = new_year;
    }
    if let Some(new_description) = req.description {
        description = new_description;
    }
    validate_title(&name, year, description.as_deref())?;

    if let Some(category) = req.category {
        category_id = match non_blank(&category) {
            Some(slug) => Some(resolve_category(&mut tx, slug).await?),
            None => None,
        };
    }

    sqlx::query("UPDATE titles SET name = ?1, year = ?2, description = ?3, category_id = ?4 WHERE id = ?5")
        .bind(&name)
        .bind(year)
        .bind(&description)
        .bind(category_id)
        .bind(title_id)
        .execute(&mut *tx)
        .await?;

    if let Some(genre) = req.genre {
        let genre_ids = resolve_genres(&mut tx, &genre).await?;
        replace_genres(&mut tx, title_id, &genre_ids).await?;
    }
    tx.commit().await?;

    tracing::info!(admin_id = admin.id, title_id, "Title updated");
    Ok(Json(fetch_title(&state.db, title_id).await?))
}

pub async fn delete_title(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(title_id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    let result = sqlx::query("DELETE FROM titles WHERE id = ?1").bind(title_id).execute(&state.db).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Title not found".into()));
    }
    tracing::info!(admin_id = admin.id, title_id, "Title deleted");
    Ok(StatusCode::NO_CONTENT)
}
