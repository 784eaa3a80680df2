//! Relay plumbing: opaque global ids, id cursors and the `Node` interface.

use anyhow::anyhow;
use async_graphql::connection::{Connection, CursorType, Edge};
use async_graphql::{Context, Interface, Object, OutputType, Result, ResultExt, ID};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::context::{current_user, db_conn};
use super::messages::MessageNode;
use super::profiles::ProfileNode;
use super::users::UserNode;
use crate::error::{AppError, AppResult};
use crate::queries::pagination::Page;
use crate::queries::{messages, profiles, users};

pub const USER_TYPE: &str = "UserNode";
pub const PROFILE_TYPE: &str = "ProfileNode";
pub const MESSAGE_TYPE: &str = "MessageNode";

/// Encode a local id as `base64("Type:id")`.
pub fn to_global_id(type_name: &str, local_id: i64) -> ID {
    ID(STANDARD.encode(format!("{}:{}", type_name, local_id)))
}

/// Decode a global id into its type name and local id.
pub fn from_global_id(id: &ID) -> Option<(String, i64)> {
    let bytes = STANDARD.decode(id.as_str()).ok()?;
    let raw = String::from_utf8(bytes).ok()?;
    let (type_name, local_id) = raw.split_once(':')?;
    Some((type_name.to_string(), local_id.parse().ok()?))
}

/// Decode a global id that must name `expected`.
pub fn expect_global_id(id: &ID, expected: &str) -> AppResult<i64> {
    match from_global_id(id) {
        Some((type_name, local_id)) if type_name == expected => Ok(local_id),
        Some((type_name, _)) => Err(AppError::Validation(anyhow!(
            "Must receive a {} id, got a {} id",
            expected,
            type_name
        ))),
        None => Err(AppError::Validation(anyhow!(
            "Unable to parse global ID \"{}\"",
            id.as_str()
        ))),
    }
}

/// Connection cursor over a row id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdCursor(pub i64);

impl CursorType for IdCursor {
    type Error = AppError;

    fn decode_cursor(s: &str) -> Result<Self, Self::Error> {
        STANDARD
            .decode(s)
            .ok()
            .and_then(|b| String::from_utf8(b).ok())
            .and_then(|s| s.strip_prefix("cursor:").and_then(|id| id.parse().ok()))
            .map(IdCursor)
            .ok_or_else(|| AppError::Validation(anyhow!("Invalid cursor \"{}\"", s)))
    }

    fn encode_cursor(&self) -> String {
        STANDARD.encode(format!("cursor:{}", self.0))
    }
}

pub fn into_connection<T, N>(
    page: Page<T>,
    id_of: impl Fn(&T) -> i64,
    to_node: impl Fn(T) -> N,
) -> Connection<IdCursor, N>
where
    N: OutputType,
{
    let mut connection = Connection::new(page.has_previous_page, page.has_next_page);
    connection.edges.extend(
        page.items
            .into_iter()
            .map(|item| Edge::new(IdCursor(id_of(&item)), to_node(item))),
    );
    connection
}

#[derive(Interface)]
#[graphql(field(name = "id", ty = "ID"))]
pub enum Node {
    User(UserNode),
    Profile(ProfileNode),
    Message(MessageNode),
}

#[derive(Default)]
pub struct NodeQuery;

#[Object]
impl NodeQuery {
    /// Fetch any node by its global ID
    async fn node(&self, ctx: &Context<'_>, id: ID) -> Result<Option<Node>> {
        resolve_node(ctx, id).await.extend()
    }
}

async fn resolve_node(ctx: &Context<'_>, id: ID) -> AppResult<Option<Node>> {
    current_user(ctx)?;
    let Some((type_name, local_id)) = from_global_id(&id) else {
        return Ok(None);
    };

    let mut conn = db_conn(ctx).await?;
    let node = match type_name.as_str() {
        USER_TYPE => users::find_user_by_id(&mut conn, local_id)
            .await?
            .map(|u| Node::User(UserNode(u))),
        PROFILE_TYPE => profiles::find_profile_by_id(&mut conn, local_id)
            .await?
            .map(|p| Node::Profile(ProfileNode(p))),
        MESSAGE_TYPE => messages::find_message_by_id(&mut conn, local_id)
            .await?
            .map(|m| Node::Message(MessageNode(m))),
        _ => None,
    };
    Ok(node)
}
