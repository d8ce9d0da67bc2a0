//! Small helpers shared by the route modules.

use sqlx::SqlitePool;

pub const LIKE_ESCAPE: char = '!';

pub fn escape_like_pattern(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(ch);
    }
    out
}

/// `%term%` for `LIKE ? ESCAPE '!'`.
pub fn like_contains(term: &str) -> String {
    format!("%{}%", escape_like_pattern(term.trim()))
}

/// Treats a blank query parameter like an absent one.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Whether `column = value` matches a row other than `except_id`.
pub async fn value_taken(
    db: &SqlitePool,
    table: &str,
    column: &str,
    value: &str,
    except_id: Option<i64>,
) -> Result<bool, sqlx::Error> {
    let query = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1 AND id != ?2)", table, column);
    sqlx::query_scalar::<_, bool>(&query)
        .bind(value)
        .bind(except_id.unwrap_or(-1))
        .fetch_one(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(escape_like_pattern("50%_off!"), "50!%!_off!!");
        assert_eq!(like_contains(" ring "), "%ring%");
    }

    #[test]
    fn blank_parameters_are_ignored() {
        assert_eq!(non_blank(&Some("  ".to_string())), None);
        assert_eq!(non_blank(&Some(" drama ".to_string())), Some("drama"));
        assert_eq!(non_blank(&None), None);
    }
}
