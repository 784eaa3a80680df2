use anyhow::anyhow;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::error::{AppError, AppResult};
use crate::models::profiles::{Profile, Relation};
use crate::queries::pagination::{Page, PageRequest};
use crate::queries::users::like_pattern;

#[derive(Debug, Clone, Default)]
pub struct ProfileListFilter {
    pub user_prof_username_icontains: Option<String>,
    /// Restrict to profiles whose given user set contains this user.
    pub has_member: Option<(Relation, i64)>,
}

pub async fn insert_profile(conn: &mut SqliteConnection, user_id: i64) -> AppResult<Profile> {
    let result = sqlx::query_as::<_, Profile>(
        "INSERT INTO profiles (user_prof_id, created_on) VALUES (?, ?) RETURNING id, user_prof_id, created_on",
    )
    .bind(user_id)
    .bind(chrono::Utc::now())
    .fetch_one(&mut *conn)
    .await;

    match result {
        Ok(profile) => Ok(profile),
        Err(e) => {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return Err(AppError::Validation(anyhow!(
                        "Profile already exists for this user"
                    )));
                }
                if db_err.is_foreign_key_violation() {
                    return Err(AppError::NotFound(anyhow!("User {} does not exist", user_id)));
                }
            }
            Err(AppError::InternalServerError(anyhow!(
                "Failed to create profile: {}",
                e
            )))
        }
    }
}

pub async fn find_profile_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> AppResult<Option<Profile>> {
    let profile = sqlx::query_as::<_, Profile>(
        "SELECT id, user_prof_id, created_on FROM profiles WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(profile)
}

pub async fn find_profile_by_user_id(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> AppResult<Option<Profile>> {
    let profile = sqlx::query_as::<_, Profile>(
        "SELECT id, user_prof_id, created_on FROM profiles WHERE user_prof_id = ?",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(profile)
}

/// Overwrites one of the profile's user sets. Callers run this inside a
/// transaction so the delete and inserts land together.
pub async fn replace_relation(
    conn: &mut SqliteConnection,
    profile_id: i64,
    relation: Relation,
    user_ids: &[i64],
) -> AppResult<()> {
    sqlx::query(&format!("DELETE FROM {} WHERE profile_id = ?", relation.table()))
        .bind(profile_id)
        .execute(&mut *conn)
        .await?;

    if user_ids.is_empty() {
        return Ok(());
    }

    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "INSERT OR IGNORE INTO {} (profile_id, user_id) ",
        relation.table()
    ));
    qb.push_values(user_ids, |mut row, user_id| {
        row.push_bind(profile_id).push_bind(*user_id);
    });
    qb.build().execute(&mut *conn).await?;

    Ok(())
}

pub async fn list_profiles(
    conn: &mut SqliteConnection,
    filter: &ProfileListFilter,
    page: &PageRequest,
) -> AppResult<Page<Profile>> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT p.id, p.user_prof_id, p.created_on FROM profiles p JOIN users u ON u.id = p.user_prof_id WHERE 1 = 1",
    );

    if let Some(fragment) = &filter.user_prof_username_icontains {
        qb.push(" AND u.username LIKE ")
            .push_bind(like_pattern(fragment))
            .push(" ESCAPE '\\'");
    }
    if let Some((relation, user_id)) = filter.has_member {
        qb.push(" AND p.id IN (SELECT profile_id FROM ")
            .push(relation.table())
            .push(" WHERE user_id = ")
            .push_bind(user_id)
            .push(")");
    }

    page.push_bounds(&mut qb, "p.id");
    page.push_order(&mut qb, "p.id");

    let rows = qb.build_query_as::<Profile>().fetch_all(&mut *conn).await?;
    Ok(page.finish(rows))
}
