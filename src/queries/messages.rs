use anyhow::anyhow;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::error::{AppError, AppResult};
use crate::models::messages::Message;
use crate::queries::pagination::{Page, PageRequest};

#[derive(Debug, Clone, Default)]
pub struct MessageListFilter {
    pub sender_id: Option<i64>,
    pub receiver_id: Option<i64>,
}

pub async fn insert_message(
    conn: &mut SqliteConnection,
    message: &str,
    sender_id: i64,
    receiver_id: i64,
) -> AppResult<Message> {
    let message = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (message, sender_id, receiver_id)
        VALUES (?, ?, ?)
        RETURNING id, message, sender_id, receiver_id
        "#,
    )
    .bind(message)
    .bind(sender_id)
    .bind(receiver_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match e.as_database_error() {
        Some(db_err) if db_err.is_foreign_key_violation() => {
            AppError::NotFound(anyhow!("Receiver does not exist"))
        }
        Some(db_err) if db_err.is_check_violation() => {
            AppError::Validation(anyhow!("message: Ensure this value has at most 140 characters"))
        }
        _ => AppError::InternalServerError(anyhow!("Failed to create message: {}", e)),
    })?;

    Ok(message)
}

pub async fn find_message_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> AppResult<Option<Message>> {
    let message = sqlx::query_as::<_, Message>(
        "SELECT id, message, sender_id, receiver_id FROM messages WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(message)
}

pub async fn list_messages(
    conn: &mut SqliteConnection,
    filter: &MessageListFilter,
    page: &PageRequest,
) -> AppResult<Page<Message>> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT m.id, m.message, m.sender_id, m.receiver_id FROM messages m WHERE 1 = 1",
    );

    if let Some(sender_id) = filter.sender_id {
        qb.push(" AND m.sender_id = ").push_bind(sender_id);
    }
    if let Some(receiver_id) = filter.receiver_id {
        qb.push(" AND m.receiver_id = ").push_bind(receiver_id);
    }

    page.push_bounds(&mut qb, "m.id");
    page.push_order(&mut qb, "m.id");

    let rows = qb.build_query_as::<Message>().fetch_all(&mut *conn).await?;
    Ok(page.finish(rows))
}
