use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::{
    error::{validation, AppError, AppResult, OptionExt},
    extract::{ApiJson, ApiPath, ApiQuery},
    middleware::{auth::AuthUser, permissions::ensure_author_or_staff},
    models::Review,
    pagination::{Page, PageRequest},
    routes::titles::title_exists,
    state::AppState,
    types::{CreateReviewRequest, ReviewDto, UpdateReviewRequest},
};

const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.text, r.score, r.pub_date, r.author_id, u.username AS author, r.title_id
    FROM reviews r
    JOIN users u ON u.id = r.author_id"#;

const DUPLICATE_REVIEW: &str = "You have already reviewed this title.";

#[derive(Debug, Default, Deserialize)]
pub struct ReviewListQuery {
    pub page: Option<i64>,
}

/// Loads a review that belongs to `title_id`. A review under another title is a 404.
pub(crate) async fn fetch_review(state: &AppState, title_id: i64, review_id: i64) -> AppResult<Review> {
    let review: Option<Review> = sqlx::query_as(&format!("{} WHERE r.id = ?1 AND r.title_id = ?2", REVIEW_SELECT))
        .bind(review_id)
        .bind(title_id)
        .fetch_optional(&state.db)
        .await?;
    review.ok_or_not_found("Review")
}

pub async fn list_reviews(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ApiPath(title_id): ApiPath<i64>,
    ApiQuery(q): ApiQuery<ReviewListQuery>,
) -> AppResult<Json<Page<ReviewDto>>> {
    title_exists(&state.db, title_id).await?;
    let page = PageRequest::new(q.page, state.config.pagination.page_size)?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE title_id = ?1")
        .bind(title_id)
        .fetch_one(&state.db)
        .await?;
    let reviews: Vec<Review> = sqlx::query_as(&format!(
        "{} WHERE r.title_id = ?1 ORDER BY r.pub_date DESC, r.id DESC LIMIT ?2 OFFSET ?3",
        REVIEW_SELECT
    ))
    .bind(title_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(&state.db)
    .await?;

    let results = reviews.into_iter().map(ReviewDto::from).collect();
    Ok(Json(page.into_page(count, results, &uri)?))
}

pub async fn create_review(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(title_id): ApiPath<i64>,
    ApiJson(req): ApiJson<CreateReviewRequest>,
) -> AppResult<impl IntoResponse> {
    title_exists(&state.db, title_id).await?;
    validation::validate_required_text(&req.text, "text", None)?;
    validation::validate_score(req.score)?;

    let already: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM reviews WHERE author_id = ?1 AND title_id = ?2)")
            .bind(user.id)
            .bind(title_id)
            .fetch_one(&state.db)
            .await?;
    if already {
        return Err(AppError::validation("non_field_errors", DUPLICATE_REVIEW));
    }

    // Two concurrent posts can both pass the check above; the UNIQUE(author_id, title_id)
    // constraint decides, and the loser gets the same answer.
    let inserted = sqlx::query("INSERT INTO reviews (text, score, author_id, title_id) VALUES (?1, ?2, ?3, ?4)")
        .bind(&req.text)
        .bind(req.score)
        .bind(user.id)
        .bind(title_id)
        .execute(&state.db)
        .await;
    let id = match inserted {
        Ok(done) => done.last_insert_rowid(),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            return Err(AppError::validation("non_field_errors", DUPLICATE_REVIEW));
        }
        Err(e) => return Err(e.into()),
    };

    state.metrics.inc_reviews_created();
    tracing::info!(user_id = user.id, title_id, review_id = id, "Review created");

    let review = fetch_review(&state, title_id, id).await?;
    Ok((StatusCode::CREATED, Json(ReviewDto::from(review))))
}

pub async fn get_review(
    State(state): State<AppState>,
    ApiPath((title_id, review_id)): ApiPath<(i64, i64)>,
) -> AppResult<Json<ReviewDto>> {
    let review = fetch_review(&state, title_id, review_id).await?;
    Ok(Json(ReviewDto::from(review)))
}

pub async fn update_review(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath((title_id, review_id)): ApiPath<(i64, i64)>,
    ApiJson(req): ApiJson<UpdateReviewRequest>,
) -> AppResult<Json<ReviewDto>> {
    let mut review = fetch_review(&state, title_id, review_id).await?;
    ensure_author_or_staff(&user, review.author_id)?;

    if let Some(text) = req.text {
        validation::validate_required_text(&text, "text", None)?;
        review.text = text;
    }
    if let Some(score) = req.score {
        validation::validate_score(score)?;
        review.score = score;
    }

    sqlx::query("UPDATE reviews SET text = ?1, score = ?2 WHERE id = ?3")
        .bind(&review.text)
        .bind(review.score)
        .bind(review.id)
        .execute(&state.db)
        .await?;

    tracing::info!(user_id = user.id, review_id, "Review updated");
    Ok(Json(ReviewDto::from(review)))
}

pub async fn delete_review(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath((title_id, review_id)): ApiPath<(i64, i64)>,
) -> AppResult<StatusCode> {
    let review = fetch_review(&state, title_id, review_id).await?;
    ensure_author_or_staff(&user, review.author_id)?;

    sqlx::query("DELETE FROM reviews WHERE id = ?1").bind(review.id).execute(&state.db).await?;
    tracing::info!(user_id = user.id, review_id, "Review deleted");
    Ok(StatusCode::NO_CONTENT)
}
