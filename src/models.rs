//! Row types read from SQLite and the role model.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn is_moderator(&self) -> bool {
        matches!(self, Role::Moderator)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub bio: String,
    pub first_name: String,
    pub last_name: String,
    pub confirmation_code: Option<String>,
    pub confirmation_code_issued_at: Option<i64>,
}

pub const USER_COLUMNS: &str = "id, username, email, role, bio, first_name, last_name, \
     confirmation_code, confirmation_code_issued_at";

/// A title joined with its category and the aggregated review score.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TitleRow {
    pub id: i64,
    pub name: String,
    pub year: i64,
    pub description: Option<String>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub rating: Option<f64>,
}

/// Reviews and comments are read together with the author's username.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    pub text: String,
    pub score: i64,
    pub pub_date: String,
    pub author_id: i64,
    pub author: String,
    pub title_id: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub pub_date: String,
    pub author_id: i64,
    pub author: String,
    pub review_id: i64,
}
