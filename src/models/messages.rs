#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub message: String,
    pub sender_id: i64,
    pub receiver_id: i64,
}
