use anyhow::anyhow;
use async_graphql::connection::CursorType;
use async_graphql::Context;
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqlitePool};

use super::node::IdCursor;
use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::middlewares::auth::Caller;
use crate::queries::pagination::PageRequest;

/// The authenticated caller, or Unauthenticated.
pub fn current_user(ctx: &Context<'_>) -> AppResult<AuthUser> {
    match ctx.data_opt::<Caller>() {
        Some(caller) => caller.require_user().cloned(),
        None => Caller::Anonymous.require_user().cloned(),
    }
}

pub fn app_config<'c>(ctx: &'c Context<'_>) -> &'c AppConfig {
    ctx.data_unchecked::<AppConfig>()
}

pub async fn db_conn(ctx: &Context<'_>) -> AppResult<PoolConnection<Sqlite>> {
    let pool = ctx.data_unchecked::<SqlitePool>();
    let conn = pool.acquire().await.map_err(|e| {
        AppError::ServiceUnavailable(anyhow!("Failed to acquire database connection: {}", e))
    })?;
    Ok(conn)
}

/// Relay connection arguments as a list field receives them.
#[derive(Debug, Default)]
pub struct PageArgs {
    pub after: Option<String>,
    pub before: Option<String>,
    pub first: Option<i32>,
    pub last: Option<i32>,
}

impl PageArgs {
    pub fn new(
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
    ) -> Self {
        Self {
            after,
            before,
            first,
            last,
        }
    }
}

pub fn page_request(ctx: &Context<'_>, args: PageArgs) -> AppResult<PageRequest> {
    let decode = |cursor: Option<String>| -> AppResult<Option<i64>> {
        cursor
            .map(|c| IdCursor::decode_cursor(&c).map(|IdCursor(id)| id))
            .transpose()
    };
    let count = |name: &str, value: Option<i32>| -> AppResult<Option<usize>> {
        match value {
            Some(v) if v < 0 => Err(AppError::Validation(anyhow!(
                "The \"{}\" parameter must be a non-negative number",
                name
            ))),
            Some(v) => Ok(Some(v as usize)),
            None => Ok(None),
        }
    };

    Ok(PageRequest::new(
        decode(args.after)?,
        decode(args.before)?,
        count("first", args.first)?,
        count("last", args.last)?,
        app_config(ctx).graphql.max_page_size,
    ))
}
