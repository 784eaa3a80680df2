use anyhow::anyhow;
use async_graphql::connection::Connection;
use async_graphql::{Context, InputObject, Object, Result, ResultExt, SimpleObject, ID};
use chrono::{DateTime, Utc};
use validator::Validate;

use super::context::{app_config, current_user, db_conn, page_request, PageArgs};
use super::node::{into_connection, to_global_id, IdCursor, USER_TYPE};
use super::profiles::{profile_connection, ProfileFilter, ProfileNode};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{IssuedToken, TokenIssuer};
use crate::error::{AppError, AppResult};
use crate::models::profiles::Relation;
use crate::models::users::User;
use crate::queries::profiles::{find_profile_by_user_id, ProfileListFilter};
use crate::queries::users::{self, UserListFilter};

#[derive(Clone)]
pub struct UserNode(pub User);

#[Object]
impl UserNode {
    /// The ID of the object
    pub async fn id(&self) -> ID {
        to_global_id(USER_TYPE, self.0.id)
    }

    /// Required. 150 characters or fewer. Letters, digits and @/./+/-/_ only.
    async fn username(&self) -> &str {
        &self.0.username
    }

    async fn email(&self) -> &str {
        &self.0.email
    }

    async fn date_joined(&self) -> DateTime<Utc> {
        self.0.date_joined
    }

    /// The profile owned by this user, if one was created.
    async fn profile(&self, ctx: &Context<'_>) -> Result<Option<ProfileNode>> {
        async {
            let mut conn = db_conn(ctx).await?;
            let profile = find_profile_by_user_id(&mut conn, self.0.id).await?;
            Ok::<_, AppError>(profile.map(ProfileNode))
        }
        .await
        .extend()
    }

    /// Profiles that list this user as a friend
    async fn profiles_friends(
        &self,
        ctx: &Context<'_>,
        filter: Option<ProfileFilter>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
    ) -> Result<Connection<IdCursor, ProfileNode>> {
        let args = PageArgs::new(after, before, first, last);
        self.member_of(ctx, Relation::Friends, filter, args).await
    }

    /// Profiles holding a pending request from this user
    async fn profiles_friend_requests(
        &self,
        ctx: &Context<'_>,
        filter: Option<ProfileFilter>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
    ) -> Result<Connection<IdCursor, ProfileNode>> {
        let args = PageArgs::new(after, before, first, last);
        self.member_of(ctx, Relation::FriendRequests, filter, args)
            .await
    }
}

impl UserNode {
    async fn member_of(
        &self,
        ctx: &Context<'_>,
        relation: Relation,
        filter: Option<ProfileFilter>,
        args: PageArgs,
    ) -> Result<Connection<IdCursor, ProfileNode>> {
        let filter = ProfileListFilter {
            has_member: Some((relation, self.0.id)),
            ..filter.unwrap_or_default().into()
        };
        profile_connection(ctx, filter, args).await.extend()
    }
}

#[derive(InputObject, Default)]
pub struct UserFilter {
    /// Exact username match
    pub username: Option<String>,
    /// Substring match on username, ignoring ASCII case
    pub username_icontains: Option<String>,
}

impl From<UserFilter> for UserListFilter {
    fn from(f: UserFilter) -> Self {
        Self {
            username: f.username,
            username_icontains: f.username_icontains,
            member_of: None,
        }
    }
}

/// Lists users as a connection; shared with the profile relation fields.
pub(crate) async fn user_connection(
    ctx: &Context<'_>,
    filter: UserListFilter,
    args: PageArgs,
) -> AppResult<Connection<IdCursor, UserNode>> {
    current_user(ctx)?;
    let page = page_request(ctx, args)?;
    let mut conn = db_conn(ctx).await?;
    let users = users::list_users(&mut conn, &filter, &page).await?;
    Ok(into_connection(users, |u| u.id, UserNode))
}

#[derive(Default)]
pub struct UserQuery;

#[Object]
impl UserQuery {
    async fn all_users(
        &self,
        ctx: &Context<'_>,
        filter: Option<UserFilter>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
    ) -> Result<Connection<IdCursor, UserNode>> {
        let filter = filter.unwrap_or_default().into();
        let args = PageArgs::new(after, before, first, last);
        user_connection(ctx, filter, args).await.extend()
    }
}

#[derive(InputObject, Validate)]
pub struct CreateUserMutationInput {
    #[validate(length(
        min = 1,
        max = 150,
        message = "Username is required and must be 150 characters or fewer"
    ))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required and cannot be empty"))]
    pub password: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub client_mutation_id: Option<String>,
}

#[derive(SimpleObject)]
pub struct CreateUserMutationPayload {
    pub user: Option<UserNode>,
    pub client_mutation_id: Option<String>,
}

#[derive(SimpleObject)]
pub struct JwtPayload {
    pub username: String,
    pub exp: i64,
    pub orig_iat: i64,
}

#[derive(SimpleObject)]
pub struct ObtainJsonWebTokenPayload {
    pub token: String,
    pub payload: JwtPayload,
    pub refresh_expires_in: i64,
}

#[derive(SimpleObject)]
pub struct VerifyPayload {
    pub payload: JwtPayload,
}

impl From<IssuedToken> for ObtainJsonWebTokenPayload {
    fn from(issued: IssuedToken) -> Self {
        Self {
            payload: JwtPayload {
                username: issued.claims.username,
                exp: issued.claims.exp,
                orig_iat: issued.claims.orig_iat,
            },
            token: issued.token,
            refresh_expires_in: issued.refresh_expires_in,
        }
    }
}

#[derive(Default)]
pub struct UserMutation;

#[Object]
impl UserMutation {
    /// Register a new account. Open to anonymous callers.
    async fn create_user(
        &self,
        ctx: &Context<'_>,
        input: CreateUserMutationInput,
    ) -> Result<CreateUserMutationPayload> {
        create_user(ctx, input).await.extend()
    }

    /// Exchange username and password for a signed token.
    async fn token_auth(
        &self,
        ctx: &Context<'_>,
        username: String,
        password: String,
    ) -> Result<ObtainJsonWebTokenPayload> {
        token_auth(ctx, &username, &password).await.extend()
    }

    async fn verify_token(&self, ctx: &Context<'_>, token: String) -> Result<VerifyPayload> {
        let issuer = ctx.data_unchecked::<TokenIssuer>();
        let claims = issuer.verify(&token).extend()?;
        Ok(VerifyPayload {
            payload: JwtPayload {
                username: claims.username,
                exp: claims.exp,
                orig_iat: claims.orig_iat,
            },
        })
    }

    /// Re-issue a valid token while its refresh window is open.
    async fn refresh_token(
        &self,
        ctx: &Context<'_>,
        token: String,
    ) -> Result<ObtainJsonWebTokenPayload> {
        let issuer = ctx.data_unchecked::<TokenIssuer>();
        issuer.refresh(&token).map(Into::into).extend()
    }
}

async fn create_user(
    ctx: &Context<'_>,
    mut input: CreateUserMutationInput,
) -> AppResult<CreateUserMutationPayload> {
    input.username = input.username.trim().to_string();
    input.email = input.email.trim().to_string();
    input.validate()?;
    check_username_chars(&input.username)?;

    let cost = app_config(ctx).security.bcrypt_cost;
    let password = input.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| AppError::InternalServerError(anyhow!("Password hashing task failed: {}", e)))??;

    let mut conn = db_conn(ctx).await?;
    let user = users::insert_user(&mut conn, &input.username, &input.email, &password_hash).await?;
    tracing::info!(user_id = user.id, username = %user.username, "user created");

    Ok(CreateUserMutationPayload {
        user: Some(UserNode(user)),
        client_mutation_id: input.client_mutation_id,
    })
}

async fn token_auth(
    ctx: &Context<'_>,
    username: &str,
    password: &str,
) -> AppResult<ObtainJsonWebTokenPayload> {
    let mut conn = db_conn(ctx).await?;
    let user = users::find_user_by_username(&mut conn, username).await?;
    drop(conn);

    let user = match user {
        Some(user) => {
            let password = password.to_string();
            let password_hash = user.password_hash.clone();
            let valid = tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
                .await
                .map_err(|e| {
                    AppError::InternalServerError(anyhow!("Password check task failed: {}", e))
                })?;
            valid.then_some(user)
        }
        None => None,
    };

    let Some(user) = user else {
        tracing::warn!(username = %username, "login failed");
        return Err(AppError::InvalidCredentials(anyhow!(
            "Please enter valid credentials"
        )));
    };

    let issued = ctx
        .data_unchecked::<TokenIssuer>()
        .issue(user.id, &user.username)?;
    tracing::info!(user_id = user.id, "token issued");
    Ok(issued.into())
}

/// Letters, digits and `@ . + - _`, as accepted for usernames.
fn check_username_chars(username: &str) -> AppResult<()> {
    let valid = username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(anyhow!(
            "username: Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
        )))
    }
}
