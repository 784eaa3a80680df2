use anyhow::anyhow;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::error::{AppError, AppResult};
use crate::models::profiles::Relation;
use crate::models::users::User;
use crate::queries::pagination::{Page, PageRequest};

const USER_COLUMNS: &str = "u.id, u.username, u.email, u.password_hash, u.date_joined";

#[derive(Debug, Clone, Default)]
pub struct UserListFilter {
    pub username: Option<String>,
    pub username_icontains: Option<String>,
    /// Restrict to the members of one of a profile's user sets.
    pub member_of: Option<(Relation, i64)>,
}

pub async fn insert_user(
    conn: &mut SqliteConnection,
    username: &str,
    email: &str,
    password_hash: &str,
) -> AppResult<User> {
    let result = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, password_hash, date_joined)
        VALUES (?, ?, ?, ?)
        RETURNING id, username, email, password_hash, date_joined
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(chrono::Utc::now())
    .fetch_one(&mut *conn)
    .await;

    match result {
        Ok(user) => Ok(user),
        Err(e) => {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return Err(AppError::Validation(anyhow!(
                        "A user with that username already exists."
                    )));
                }
            }
            Err(AppError::InternalServerError(anyhow!(
                "Failed to create user account: {}",
                e
            )))
        }
    }
}

pub async fn find_user_by_id(conn: &mut SqliteConnection, id: i64) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, date_joined FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(user)
}

pub async fn find_user_by_username(
    conn: &mut SqliteConnection,
    username: &str,
) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, date_joined FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(user)
}

/// Loads every user in `ids`; unknown ids are simply absent from the result.
pub async fn find_users_by_ids(conn: &mut SqliteConnection, ids: &[i64]) -> AppResult<Vec<User>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id IN ("));
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let users = qb.build_query_as::<User>().fetch_all(&mut *conn).await?;
    Ok(users)
}

/// Resolves every id or fails with NotFound naming the first missing one.
pub async fn resolve_users(conn: &mut SqliteConnection, ids: &[i64]) -> AppResult<Vec<User>> {
    let found = find_users_by_ids(conn, ids).await?;
    if let Some(missing) = ids.iter().find(|id| !found.iter().any(|u| u.id == **id)) {
        return Err(AppError::NotFound(anyhow!("User {} does not exist", missing)));
    }
    Ok(found)
}

pub async fn list_users(
    conn: &mut SqliteConnection,
    filter: &UserListFilter,
    page: &PageRequest,
) -> AppResult<Page<User>> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users u WHERE 1 = 1"));

    if let Some(username) = &filter.username {
        qb.push(" AND u.username = ").push_bind(username.clone());
    }
    if let Some(fragment) = &filter.username_icontains {
        qb.push(" AND u.username LIKE ")
            .push_bind(like_pattern(fragment))
            .push(" ESCAPE '\\'");
    }
    if let Some((relation, profile_id)) = filter.member_of {
        qb.push(" AND u.id IN (SELECT user_id FROM ")
            .push(relation.table())
            .push(" WHERE profile_id = ")
            .push_bind(profile_id)
            .push(")");
    }

    page.push_bounds(&mut qb, "u.id");
    page.push_order(&mut qb, "u.id");

    let rows = qb.build_query_as::<User>().fetch_all(&mut *conn).await?;
    Ok(page.finish(rows))
}

/// Substring pattern with LIKE wildcards escaped. The text keeps its case:
/// SQLite `LIKE` folds ASCII letters itself and compares the rest as is.
pub(crate) fn like_pattern(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    escaped.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_patterns_escape_wildcards() {
        assert_eq!(like_pattern("Al"), "%Al%");
        assert_eq!(like_pattern("Él"), "%Él%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
