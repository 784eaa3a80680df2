use anyhow::anyhow;
use async_graphql::connection::Connection;
use async_graphql::{Context, InputObject, Object, Result, ResultExt, SimpleObject, ID};
use validator::Validate;

use super::context::{current_user, db_conn, page_request, PageArgs};
use super::loaders::load_user;
use super::node::{expect_global_id, into_connection, to_global_id, IdCursor, MESSAGE_TYPE, USER_TYPE};
use super::users::UserNode;
use crate::error::{AppError, AppResult};
use crate::models::messages::Message;
use crate::queries::messages::{self, MessageListFilter};
use crate::queries::users::find_user_by_id;

#[derive(Clone)]
pub struct MessageNode(pub Message);

#[Object]
impl MessageNode {
    /// The ID of the object
    pub async fn id(&self) -> ID {
        to_global_id(MESSAGE_TYPE, self.0.id)
    }

    async fn message(&self) -> &str {
        &self.0.message
    }

    async fn sender(&self, ctx: &Context<'_>) -> Result<UserNode> {
        load_user(ctx, self.0.sender_id).await
    }

    async fn receiver(&self, ctx: &Context<'_>) -> Result<UserNode> {
        load_user(ctx, self.0.receiver_id).await
    }
}

#[derive(InputObject, Default)]
pub struct MessageFilter {
    /// Global id of the sending user
    pub sender: Option<ID>,
    /// Global id of the receiving user
    pub receiver: Option<ID>,
}

#[derive(Default)]
pub struct MessageQuery;

#[Object]
impl MessageQuery {
    /// Every message in the system, optionally narrowed by sender or receiver
    async fn all_messages(
        &self,
        ctx: &Context<'_>,
        filter: Option<MessageFilter>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
    ) -> Result<Connection<IdCursor, MessageNode>> {
        let args = PageArgs::new(after, before, first, last);
        all_messages(ctx, filter.unwrap_or_default(), args)
            .await
            .extend()
    }
}

async fn all_messages(
    ctx: &Context<'_>,
    filter: MessageFilter,
    args: PageArgs,
) -> AppResult<Connection<IdCursor, MessageNode>> {
    current_user(ctx)?;
    let page = page_request(ctx, args)?;
    let filter = MessageListFilter {
        sender_id: filter
            .sender
            .map(|id| expect_global_id(&id, USER_TYPE))
            .transpose()?,
        receiver_id: filter
            .receiver
            .map(|id| expect_global_id(&id, USER_TYPE))
            .transpose()?,
    };
    let mut conn = db_conn(ctx).await?;
    let messages = messages::list_messages(&mut conn, &filter, &page).await?;
    Ok(into_connection(messages, |m| m.id, MessageNode))
}

#[derive(InputObject, Validate)]
pub struct CreateMessageMutationInput {
    #[validate(length(
        min = 1,
        max = 140,
        message = "Message must be between 1 and 140 characters long"
    ))]
    pub message: String,
    /// Global id of the receiving user
    pub receiver: ID,
    pub client_mutation_id: Option<String>,
}

#[derive(SimpleObject)]
pub struct CreateMessageMutationPayload {
    pub message: Option<MessageNode>,
    pub client_mutation_id: Option<String>,
}

#[derive(Default)]
pub struct MessageMutation;

#[Object]
impl MessageMutation {
    /// Send a direct message from the caller to another user.
    async fn create_message(
        &self,
        ctx: &Context<'_>,
        input: CreateMessageMutationInput,
    ) -> Result<CreateMessageMutationPayload> {
        create_message(ctx, input).await.extend()
    }
}

async fn create_message(
    ctx: &Context<'_>,
    input: CreateMessageMutationInput,
) -> AppResult<CreateMessageMutationPayload> {
    let viewer = current_user(ctx)?;
    input.validate()?;
    let receiver_id = expect_global_id(&input.receiver, USER_TYPE)?;

    let mut conn = db_conn(ctx).await?;
    if find_user_by_id(&mut conn, receiver_id).await?.is_none() {
        return Err(AppError::NotFound(anyhow!(
            "User {} does not exist",
            receiver_id
        )));
    }

    let message =
        messages::insert_message(&mut conn, &input.message, viewer.user_id, receiver_id).await?;
    tracing::info!(
        message_id = message.id,
        sender_id = viewer.user_id,
        receiver_id,
        "message created"
    );

    Ok(CreateMessageMutationPayload {
        message: Some(MessageNode(message)),
        client_mutation_id: input.client_mutation_id,
    })
}
