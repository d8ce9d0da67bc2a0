use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{Comment, Review, Role, User};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

// Auth

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendCodeRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendCodeResponse {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    pub email: String,
    pub confirmation_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

// Users

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDto {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub bio: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            username: u.username,
            email: u.email,
            role: u.role,
            bio: u.bio,
            first_name: u.first_name,
            last_name: u.last_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub role: Option<Role>,
    pub bio: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub bio: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

// Categories and genres

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    pub slug: String,
}

// Titles

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleDto {
    pub id: i64,
    pub name: String,
    pub year: i64,
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub genre: Vec<CatalogItem>,
    pub category: Option<CatalogItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTitleRequest {
    pub name: String,
    pub year: i64,
    pub description: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    /// Genre slugs.
    #[serde(default)]
    pub genre: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTitleRequest {
    pub name: Option<String>,
    pub year: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    pub genre: Option<Vec<String>>,
}

// Reviews and comments

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewDto {
    pub id: i64,
    pub text: String,
    pub author: String,
    pub score: i64,
    pub pub_date: String,
}

impl From<Review> for ReviewDto {
    fn from(r: Review) -> Self {
        Self { id: r.id, text: r.text, author: r.author, score: r.score, pub_date: r.pub_date }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewRequest {
    pub text: String,
    pub score: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateReviewRequest {
    pub text: Option<String>,
    pub score: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentDto {
    pub id: i64,
    pub text: String,
    pub author: String,
    pub pub_date: String,
}

impl From<Comment> for CommentDto {
    fn from(c: Comment) -> Self {
        Self { id: c.id, text: c.text, author: c.author, pub_date: c.pub_date }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCommentRequest {
    pub text: Option<String>,
}
