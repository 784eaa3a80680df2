use std::collections::HashMap;

use anyhow::anyhow;
use async_graphql::dataloader::{DataLoader, Loader};
use async_graphql::{Context, ErrorExtensions};
use sqlx::SqlitePool;

use super::users::UserNode;
use crate::error::AppError;
use crate::models::users::User;
use crate::queries::users::find_users_by_ids;

/// Batches user lookups made while resolving senders, receivers and
/// profile owners within one request.
pub struct UserLoader {
    pool: SqlitePool,
}

impl UserLoader {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl Loader<i64> for UserLoader {
    type Value = User;
    type Error = async_graphql::Error;

    async fn load(&self, keys: &[i64]) -> Result<HashMap<i64, Self::Value>, Self::Error> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AppError::from(e).extend())?;
        let users = find_users_by_ids(&mut conn, keys)
            .await
            .map_err(|e| e.extend())?;
        tracing::trace!(requested = keys.len(), found = users.len(), "batched user load");
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }
}

pub async fn load_user(ctx: &Context<'_>, id: i64) -> async_graphql::Result<UserNode> {
    let loader = ctx.data_unchecked::<DataLoader<UserLoader>>();
    loader
        .load_one(id)
        .await?
        .map(UserNode)
        .ok_or_else(|| AppError::NotFound(anyhow!("User {} does not exist", id)).extend())
}
