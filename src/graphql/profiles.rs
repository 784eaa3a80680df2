use anyhow::anyhow;
use async_graphql::connection::Connection;
use async_graphql::{Context, InputObject, Object, Result, ResultExt, SimpleObject, ID};
use chrono::{DateTime, Utc};

use super::context::{current_user, db_conn, page_request, PageArgs};
use super::loaders::load_user;
use super::node::{expect_global_id, into_connection, to_global_id, IdCursor, PROFILE_TYPE, USER_TYPE};
use super::users::{user_connection, UserFilter, UserNode};
use crate::error::{AppError, AppResult};
use crate::models::profiles::{Profile, Relation};
use crate::queries::profiles::{self, ProfileListFilter};
use crate::queries::users::{resolve_users, UserListFilter};

#[derive(Clone)]
pub struct ProfileNode(pub Profile);

impl ProfileNode {
    async fn members(
        &self,
        ctx: &Context<'_>,
        relation: Relation,
        filter: Option<UserFilter>,
        args: PageArgs,
    ) -> Result<Connection<IdCursor, UserNode>> {
        let filter = UserListFilter {
            member_of: Some((relation, self.0.id)),
            ..filter.unwrap_or_default().into()
        };
        user_connection(ctx, filter, args).await.extend()
    }
}

#[Object]
impl ProfileNode {
    /// The ID of the object
    pub async fn id(&self) -> ID {
        to_global_id(PROFILE_TYPE, self.0.id)
    }

    /// The user this profile belongs to
    async fn user_prof(&self, ctx: &Context<'_>) -> Result<UserNode> {
        load_user(ctx, self.0.user_prof_id).await
    }

    /// Alias of `userProf`
    async fn user(&self, ctx: &Context<'_>) -> Result<UserNode> {
        load_user(ctx, self.0.user_prof_id).await
    }

    async fn friends(
        &self,
        ctx: &Context<'_>,
        filter: Option<UserFilter>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
    ) -> Result<Connection<IdCursor, UserNode>> {
        let args = PageArgs::new(after, before, first, last);
        self.members(ctx, Relation::Friends, filter, args).await
    }

    /// Pending incoming requests
    async fn friend_requests(
        &self,
        ctx: &Context<'_>,
        filter: Option<UserFilter>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
    ) -> Result<Connection<IdCursor, UserNode>> {
        let args = PageArgs::new(after, before, first, last);
        self.members(ctx, Relation::FriendRequests, filter, args)
            .await
    }

    async fn created_on(&self) -> DateTime<Utc> {
        self.0.created_on
    }
}

#[derive(InputObject, Default)]
pub struct ProfileFilter {
    /// Substring match on the owner's username, ignoring ASCII case
    pub user_prof_username_icontains: Option<String>,
}

impl From<ProfileFilter> for ProfileListFilter {
    fn from(f: ProfileFilter) -> Self {
        Self {
            user_prof_username_icontains: f.user_prof_username_icontains,
            has_member: None,
        }
    }
}

#[derive(Default)]
pub struct ProfileQuery;

#[Object]
impl ProfileQuery {
    /// The caller's own profile
    async fn profile(&self, ctx: &Context<'_>) -> Result<ProfileNode> {
        own_profile(ctx).await.extend()
    }

    async fn all_profiles(
        &self,
        ctx: &Context<'_>,
        filter: Option<ProfileFilter>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
    ) -> Result<Connection<IdCursor, ProfileNode>> {
        let filter = filter.unwrap_or_default().into();
        let args = PageArgs::new(after, before, first, last);
        profile_connection(ctx, filter, args).await.extend()
    }
}

async fn own_profile(ctx: &Context<'_>) -> AppResult<ProfileNode> {
    let viewer = current_user(ctx)?;
    let mut conn = db_conn(ctx).await?;
    profiles::find_profile_by_user_id(&mut conn, viewer.user_id)
        .await?
        .map(ProfileNode)
        .ok_or_else(|| AppError::NotFound(anyhow!("Profile matching query does not exist.")))
}

/// Lists profiles as a connection; shared with the reverse relation fields
/// on users.
pub(crate) async fn profile_connection(
    ctx: &Context<'_>,
    filter: ProfileListFilter,
    args: PageArgs,
) -> AppResult<Connection<IdCursor, ProfileNode>> {
    current_user(ctx)?;
    let page = page_request(ctx, args)?;
    let mut conn = db_conn(ctx).await?;
    let profiles = profiles::list_profiles(&mut conn, &filter, &page).await?;
    Ok(into_connection(profiles, |p| p.id, ProfileNode))
}

#[derive(InputObject, Default)]
pub struct ProfileCreateMutationInput {
    pub client_mutation_id: Option<String>,
}

#[derive(SimpleObject)]
pub struct ProfileCreateMutationPayload {
    pub profile: Option<ProfileNode>,
    pub client_mutation_id: Option<String>,
}

#[derive(InputObject)]
pub struct ProfileUpdateMutationInput {
    pub id: ID,
    /// Replaces the whole friends set when present
    pub friends: Option<Vec<ID>>,
    /// Replaces the whole friend request set when present
    pub friend_requests: Option<Vec<ID>>,
    pub client_mutation_id: Option<String>,
}

#[derive(SimpleObject)]
pub struct ProfileUpdateMutationPayload {
    pub profile: Option<ProfileNode>,
    pub client_mutation_id: Option<String>,
}

#[derive(Default)]
pub struct ProfileMutation;

#[Object]
impl ProfileMutation {
    /// Create the caller's profile. Each user owns at most one.
    async fn create_profile(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] input: ProfileCreateMutationInput,
    ) -> Result<ProfileCreateMutationPayload> {
        create_profile(ctx, input).await.extend()
    }

    async fn update_profile(
        &self,
        ctx: &Context<'_>,
        input: ProfileUpdateMutationInput,
    ) -> Result<ProfileUpdateMutationPayload> {
        update_profile(ctx, input).await.extend()
    }
}

async fn create_profile(
    ctx: &Context<'_>,
    input: ProfileCreateMutationInput,
) -> AppResult<ProfileCreateMutationPayload> {
    let viewer = current_user(ctx)?;
    let mut conn = db_conn(ctx).await?;
    let profile = profiles::insert_profile(&mut conn, viewer.user_id).await?;
    tracing::info!(user_id = viewer.user_id, profile_id = profile.id, "profile created");

    Ok(ProfileCreateMutationPayload {
        profile: Some(ProfileNode(profile)),
        client_mutation_id: input.client_mutation_id,
    })
}

async fn update_profile(
    ctx: &Context<'_>,
    input: ProfileUpdateMutationInput,
) -> AppResult<ProfileUpdateMutationPayload> {
    let viewer = current_user(ctx)?;
    let profile_id = expect_global_id(&input.id, PROFILE_TYPE)?;
    let friends = input.friends.as_deref().map(decode_user_ids).transpose()?;
    let friend_requests = input
        .friend_requests
        .as_deref()
        .map(decode_user_ids)
        .transpose()?;

    let pool = ctx.data_unchecked::<sqlx::SqlitePool>();
    let mut tx = pool.begin().await.map_err(|e| {
        AppError::ServiceUnavailable(anyhow!("Failed to start transaction: {}", e))
    })?;

    let profile = profiles::find_profile_by_id(&mut tx, profile_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Profile matching query does not exist.")))?;

    if profile.user_prof_id != viewer.user_id {
        tracing::warn!(
            user_id = viewer.user_id,
            profile_id,
            owner_id = profile.user_prof_id,
            "profile relations updated by a non-owner"
        );
    }

    for (relation, ids) in [
        (Relation::Friends, friends),
        (Relation::FriendRequests, friend_requests),
    ] {
        let Some(ids) = ids else { continue };
        resolve_users(&mut tx, &ids).await?;
        profiles::replace_relation(&mut tx, profile_id, relation, &ids).await?;
        tracing::info!(
            user_id = viewer.user_id,
            profile_id,
            relation = relation.table(),
            size = ids.len(),
            "profile relation replaced"
        );
    }

    tx.commit().await.map_err(|e| {
        AppError::InternalServerError(anyhow!("Failed to commit transaction: {}", e))
    })?;

    Ok(ProfileUpdateMutationPayload {
        profile: Some(ProfileNode(profile)),
        client_mutation_id: input.client_mutation_id,
    })
}

/// Decodes user global ids, dropping duplicates while keeping order.
fn decode_user_ids(ids: &[ID]) -> AppResult<Vec<i64>> {
    let mut decoded: Vec<i64> = Vec::with_capacity(ids.len());
    for id in ids {
        let user_id = expect_global_id(id, USER_TYPE)?;
        if !decoded.contains(&user_id) {
            decoded.push(user_id);
        }
    }
    Ok(decoded)
}
