use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Profile {
    pub id: i64,
    pub user_prof_id: i64,
    pub created_on: DateTime<Utc>,
}

/// The two user sets a profile carries. Both are replaced wholesale on update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Friends,
    FriendRequests,
}

impl Relation {
    pub fn table(self) -> &'static str {
        match self {
            Relation::Friends => "profile_friends",
            Relation::FriendRequests => "profile_friend_requests",
        }
    }
}
