use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};

use crate::{
    error::{validation, AppError, AppResult, OptionExt},
    extract::{ApiJson, ApiPath, ApiQuery},
    middleware::{auth::AuthUser, permissions::RequireAdmin},
    models::{User, USER_COLUMNS},
    pagination::{Page, PageRequest},
    routes::helpers::{like_contains, non_blank, value_taken},
    state::AppState,
    types::{CreateUserRequest, UpdateUserRequest, UserDto},
};

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub search: Option<String>,
    pub page: Option<i64>,
}

async fn fetch_by_username(state: &AppState, username: &str) -> AppResult<User> {
    let user: Option<User> = sqlx::query_as(&format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS))
        .bind(username)
        .fetch_optional(&state.db)
        .await?;
    user.ok_or_not_found("User")
}

async fn fetch_by_id(state: &AppState, id: i64) -> AppResult<User> {
    let user: Option<User> = sqlx::query_as(&format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS))
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    user.ok_or_not_found("User")
}

fn validate_profile(bio: &str, first_name: &str, last_name: &str) -> AppResult<()> {
    validation::validate_max_chars(bio, "bio", 2000)?;
    validation::validate_max_chars(first_name, "first_name", 150)?;
    validation::validate_max_chars(last_name, "last_name", 150)?;
    Ok(())
}

async fn ensure_unique(state: &AppState, username: &str, email: &str, except_id: Option<i64>) -> AppResult<()> {
    if value_taken(&state.db, "users", "username", username, except_id).await? {
        return Err(AppError::validation("username", "A user with that username already exists."));
    }
    if value_taken(&state.db, "users", "email", email, except_id).await? {
        return Err(AppError::validation("email", "A user with that email already exists."));
    }
    Ok(())
}

/// Merges a partial update into `user` and persists it. `allow_role` is false for `/users/me/`.
async fn apply_update(state: &AppState, mut user: User, req: UpdateUserRequest, allow_role: bool) -> AppResult<User> {
    if let Some(username) = req.username {
        user.username = username.trim().to_string();
    }
    if let Some(email) = req.email {
        user.email = email.trim().to_string();
    }
    if allow_role {
        if let Some(role) = req.role {
            user.role = role;
        }
    }
    if let Some(bio) = req.bio {
        user.bio = bio;
    }
    if let Some(first_name) = req.first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = req.last_name {
        user.last_name = last_name;
    }

    validation::validate_username(&user.username)?;
    validation::validate_email(&user.email)?;
    validate_profile(&user.bio, &user.first_name, &user.last_name)?;
    ensure_unique(state, &user.username, &user.email, Some(user.id)).await?;

    sqlx::query(
        r#"UPDATE users SET username = ?1, email = ?2, role = ?3, bio = ?4, first_name = ?5, last_name = ?6
           WHERE id = ?7"#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(user.role)
    .bind(&user.bio)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(user.id)
    .execute(&state.db)
    .await?;

    Ok(user)
}

pub async fn list_users(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(q): ApiQuery<UserListQuery>,
) -> AppResult<Json<Page<UserDto>>> {
    let page = PageRequest::new(q.page, state.config.pagination.page_size)?;
    let search = non_blank(&q.search).map(like_contains);

    let mut count_qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM users");
    let mut list_qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!("SELECT {} FROM users", USER_COLUMNS));
    if let Some(pattern) = &search {
        count_qb.push(" WHERE username LIKE ").push_bind(pattern.clone()).push(" ESCAPE '!'");
        list_qb.push(" WHERE username LIKE ").push_bind(pattern.clone()).push(" ESCAPE '!'");
    }
    list_qb
        .push(" ORDER BY id LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());

    let count: i64 = count_qb.build_query_scalar::<i64>().fetch_one(&state.db).await?;
    let users: Vec<User> = list_qb.build_query_as::<User>().fetch_all(&state.db).await?;
    let results = users.into_iter().map(UserDto::from).collect();

    Ok(Json(page.into_page(count, results, &uri)?))
}

pub async fn create_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> AppResult<impl IntoResponse> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();
    let role = req.role.unwrap_or_default();
    let bio = req.bio.unwrap_or_default();
    let first_name = req.first_name.unwrap_or_default();
    let last_name = req.last_name.unwrap_or_default();

    validation::validate_username(&username)?;
    validation::validate_email(&email)?;
    validate_profile(&bio, &first_name, &last_name)?;
    ensure_unique(&state, &username, &email, None).await?;

    let id = sqlx::query(
        r#"INSERT INTO users (username, email, role, bio, first_name, last_name)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
    )
    .bind(&username)
    .bind(&email)
    .bind(role)
    .bind(&bio)
    .bind(&first_name)
    .bind(&last_name)
    .execute(&state.db)
    .await?
    .last_insert_rowid();

    tracing::info!(admin_id = admin.id, user_id = id, %role, "User created");
    let user = fetch_by_id(&state, id).await?;
    Ok((StatusCode::CREATED, Json(UserDto::from(user))))
}

pub async fn get_user(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(username): ApiPath<String>,
) -> AppResult<Json<UserDto>> {
    let user = fetch_by_username(&state, &username).await?;
    Ok(Json(UserDto::from(user)))
}

pub async fn update_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(username): ApiPath<String>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> AppResult<Json<UserDto>> {
    let user = fetch_by_username(&state, &username).await?;
    let user = apply_update(&state, user, req, true).await?;
    tracing::info!(admin_id = admin.id, user_id = user.id, "User updated");
    Ok(Json(UserDto::from(user)))
}

pub async fn delete_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(username): ApiPath<String>,
) -> AppResult<StatusCode> {
    let user = fetch_by_username(&state, &username).await?;
    sqlx::query("DELETE FROM users WHERE id = ?1").bind(user.id).execute(&state.db).await?;
    tracing::info!(admin_id = admin.id, user_id = user.id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_me(user: AuthUser, State(state): State<AppState>) -> AppResult<Json<UserDto>> {
    let me = fetch_by_id(&state, user.id).await?;
    Ok(Json(UserDto::from(me)))
}

/// Updates the caller's own profile. `role` in the body is ignored.
pub async fn update_me(
    user: AuthUser,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> AppResult<Json<UserDto>> {
    let me = fetch_by_id(&state, user.id).await?;
    let me = apply_update(&state, me, req, false).await?;
    Ok(Json(UserDto::from(me)))
}
