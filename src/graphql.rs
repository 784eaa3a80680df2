//! GraphQL schema: users, profiles and direct messages behind one endpoint.

pub mod context;
pub mod loaders;
pub mod messages;
pub mod node;
pub mod profiles;
pub mod users;

use async_graphql::dataloader::DataLoader;
use async_graphql::{EmptySubscription, MergedObject, Schema};
use sqlx::SqlitePool;

use crate::auth::TokenIssuer;
use crate::config::AppConfig;
use loaders::UserLoader;
use messages::{MessageMutation, MessageQuery};
use node::NodeQuery;
use profiles::{ProfileMutation, ProfileQuery};
use users::{UserMutation, UserQuery};

const MAX_QUERY_DEPTH: usize = 16;

/// Root query: profile, allUsers, allProfiles, allMessages, node
#[derive(MergedObject, Default)]
pub struct Query(NodeQuery, UserQuery, ProfileQuery, MessageQuery);

/// Root mutation: createUser, tokenAuth, verifyToken, refreshToken,
/// createProfile, updateProfile, createMessage
#[derive(MergedObject, Default)]
pub struct Mutation(UserMutation, ProfileMutation, MessageMutation);

pub type AppSchema = Schema<Query, Mutation, EmptySubscription>;

pub fn build_schema(pool: SqlitePool, config: AppConfig, issuer: TokenIssuer) -> AppSchema {
    Schema::build(Query::default(), Mutation::default(), EmptySubscription)
        .data(DataLoader::new(UserLoader::new(pool.clone()), tokio::spawn))
        .data(issuer)
        .data(pool)
        .data(config)
        .limit_depth(MAX_QUERY_DEPTH)
        .finish()
}
