//! Categories and genres: named, slug-addressed groupings of titles.
//!
//! Both resources have the same shape and the same operations (list with `?search=`,
//! create, delete by slug), so the handlers share one implementation keyed by [`Catalog`].

use axum::{
    extract::{OriginalUri, State},
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};

use crate::{
    error::{validation, AppError, AppResult},
    extract::{ApiJson, ApiPath, ApiQuery},
    middleware::permissions::RequireAdmin,
    pagination::{Page, PageRequest},
    routes::helpers::{like_contains, non_blank, value_taken},
    state::AppState,
    types::CatalogItem,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Catalog {
    Categories,
    Genres,
}

impl Catalog {
    pub fn table(&self) -> &'static str {
        match self {
            Catalog::Categories => "categories",
            Catalog::Genres => "genres",
        }
    }

    fn entity(&self) -> &'static str {
        match self {
            Catalog::Categories => "Category",
            Catalog::Genres => "Genre",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub page: Option<i64>,
}

async fn list(catalog: Catalog, state: &AppState, uri: &Uri, q: CatalogQuery) -> AppResult<Page<CatalogItem>> {
    let page = PageRequest::new(q.page, state.config.pagination.page_size)?;
    let search = non_blank(&q.search).map(like_contains);

    let mut count_qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", catalog.table()));
    let mut list_qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!("SELECT name, slug FROM {}", catalog.table()));
    if let Some(pattern) = &search {
        count_qb.push(" WHERE name LIKE ").push_bind(pattern.clone()).push(" ESCAPE '!'");
        list_qb.push(" WHERE name LIKE ").push_bind(pattern.clone()).push(" ESCAPE '!'");
    }
    list_qb
        .push(" ORDER BY id LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());

    let count: i64 = count_qb.build_query_scalar::<i64>().fetch_one(&state.db).await?;
    let rows: Vec<(String, String)> = list_qb.build_query_as::<(String, String)>().fetch_all(&state.db).await?;
    let results = rows.into_iter().map(|(name, slug)| CatalogItem { name, slug }).collect();

    page.into_page(count, results, uri)
}

async fn create(catalog: Catalog, state: &AppState, item: CatalogItem) -> AppResult<CatalogItem> {
    let item = CatalogItem { name: item.name.trim().to_string(), slug: item.slug.trim().to_string() };
    validation::validate_required_text(&item.name, "name", Some(50))?;
    validation::validate_slug(&item.slug, "slug")?;

    if value_taken(&state.db, catalog.table(), "name", &item.name, None).await? {
        return Err(AppError::validation("name", format!("{} with this name already exists.", catalog.entity())));
    }
    if value_taken(&state.db, catalog.table(), "slug", &item.slug, None).await? {
        return Err(AppError::validation("slug", format!("{} with this slug already exists.", catalog.entity())));
    }

    sqlx::query(&format!("INSERT INTO {} (name, slug) VALUES (?1, ?2)", catalog.table()))
        .bind(&item.name)
        .bind(&item.slug)
        .execute(&state.db)
        .await?;
    Ok(item)
}

async fn delete(catalog: Catalog, state: &AppState, slug: &str) -> AppResult<()> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE slug = ?1", catalog.table()))
        .bind(slug)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("{} not found", catalog.entity())));
    }
    Ok(())
}

pub async fn list_categories(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(q): ApiQuery<CatalogQuery>,
) -> AppResult<Json<Page<CatalogItem>>> {
    Ok(Json(list(Catalog::Categories, &state, &uri, q).await?))
}

pub async fn create_category(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(item): ApiJson<CatalogItem>,
) -> AppResult<impl IntoResponse> {
    let item = create(Catalog::Categories, &state, item).await?;
    tracing::info!(admin_id = admin.id, slug = %item.slug, "Category created");
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn delete_category(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> AppResult<StatusCode> {
    delete(Catalog::Categories, &state, &slug).await?;
    tracing::info!(admin_id = admin.id, %slug, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_genres(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(q): ApiQuery<CatalogQuery>,
) -> AppResult<Json<Page<CatalogItem>>> {
    Ok(Json(list(Catalog::Genres, &state, &uri, q).await?))
}

pub async fn create_genre(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(item): ApiJson<CatalogItem>,
) -> AppResult<impl IntoResponse> {
    let item = create(Catalog::Genres, &state, item).await?;
    tracing::info!(admin_id = admin.id, slug = %item.slug, "Genre created");
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn delete_genre(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> AppResult<StatusCode> {
    delete(Catalog::Genres, &state, &slug).await?;
    tracing::info!(admin_id = admin.id, %slug, "Genre deleted");
    Ok(StatusCode::NO_CONTENT)
}
