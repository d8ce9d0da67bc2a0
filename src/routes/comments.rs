//! Comments on a review. Every handler first resolves the `(title, review)` pair
//! so a comment is only reachable under the review it belongs to.

use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::{
    error::{validation, AppResult, OptionExt},
    extract::{ApiJson, ApiPath, ApiQuery},
    middleware::{auth::AuthUser, permissions::ensure_author_or_staff},
    models::Comment,
    pagination::{Page, PageRequest},
    routes::reviews::fetch_review,
    state::AppState,
    types::{CommentDto, CreateCommentRequest, UpdateCommentRequest},
};

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.text, c.pub_date, c.author_id, u.username AS author, c.review_id
    FROM comments c
    JOIN users u ON u.id = c.author_id"#;

#[derive(Debug, Default, Deserialize)]
pub struct CommentListQuery {
    pub page: Option<i64>,
}

async fn fetch_comment(state: &AppState, review_id: i64, comment_id: i64) -> AppResult<Comment> {
    let comment: Option<Comment> =
        sqlx::query_as(&format!("{} WHERE c.id = ?1 AND c.review_id = ?2", COMMENT_SELECT))
            .bind(comment_id)
            .bind(review_id)
            .fetch_optional(&state.db)
            .await?;
    comment.ok_or_not_found("Comment")
}

pub async fn list_comments(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ApiPath((title_id, review_id)): ApiPath<(i64, i64)>,
    ApiQuery(q): ApiQuery<CommentListQuery>,
) -> AppResult<Json<Page<CommentDto>>> {
    let review = fetch_review(&state, title_id, review_id).await?;
    let page = PageRequest::new(q.page, state.config.pagination.page_size)?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE review_id = ?1")
        .bind(review.id)
        .fetch_one(&state.db)
        .await?;
    let comments: Vec<Comment> = sqlx::query_as(&format!(
        "{} WHERE c.review_id = ?1 ORDER BY c.pub_date DESC, c.id DESC LIMIT ?2 OFFSET ?3",
        COMMENT_SELECT
    ))
    .bind(review.id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(&state.db)
    .await?;

    let results = comments.into_iter().map(CommentDto::from).collect();
    Ok(Json(page.into_page(count, results, &uri)?))
}

pub async fn create_comment(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath((title_id, review_id)): ApiPath<(i64, i64)>,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> AppResult<impl IntoResponse> {
    let review = fetch_review(&state, title_id, review_id).await?;
    validation::validate_required_text(&req.text, "text", None)?;

    let id = sqlx::query("INSERT INTO comments (text, author_id, review_id) VALUES (?1, ?2, ?3)")
        .bind(&req.text)
        .bind(user.id)
        .bind(review.id)
        .execute(&state.db)
        .await?
        .last_insert_rowid();

    state.metrics.inc_comments_created();
    tracing::info!(user_id = user.id, review_id, comment_id = id, "Comment created");

    let comment = fetch_comment(&state, review.id, id).await?;
    Ok((StatusCode::CREATED, Json(CommentDto::from(comment))))
}

pub async fn get_comment(
    State(state): State<AppState>,
    ApiPath((title_id, review_id, comment_id)): ApiPath<(i64, i64, i64)>,
) -> AppResult<Json<CommentDto>> {
    let review = fetch_review(&state, title_id, review_id).await?;
    let comment = fetch_comment(&state, review.id, comment_id).await?;
    Ok(Json(CommentDto::from(comment)))
}

pub async fn update_comment(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath((title_id, review_id, comment_id)): ApiPath<(i64, i64, i64)>,
    ApiJson(req): ApiJson<UpdateCommentRequest>,
) -> AppResult<Json<CommentDto>> {
    let review = fetch_review(&state, title_id, review_id).await?;
    let mut comment = fetch_comment(&state, review.id, comment_id).await?;
    ensure_author_or_staff(&user, comment.author_id)?;

    if let Some(text) = req.text {
        validation::validate_required_text(&text, "text", None)?;
        comment.text = text;
    }
    sqlx::query("UPDATE comments SET text = ?1 WHERE id = ?2")
        .bind(&comment.text)
        .bind(comment.id)
        .execute(&state.db)
        .await?;

    tracing::info!(user_id = user.id, comment_id, "Comment updated");
    Ok(Json(CommentDto::from(comment)))
}

pub async fn delete_comment(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath((title_id, review_id, comment_id)): ApiPath<(i64, i64, i64)>,
) -> AppResult<StatusCode> {
    let review = fetch_review(&state, title_id, review_id).await?;
    let comment = fetch_comment(&state, review.id, comment_id).await?;
    ensure_author_or_staff(&user, comment.author_id)?;

    sqlx::query("DELETE FROM comments WHERE id = ?1").bind(comment.id).execute(&state.db).await?;
    tracing::info!(user_id = user.id, comment_id, "Comment deleted");
    Ok(StatusCode::NO_CONTENT)
}
