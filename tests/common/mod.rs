#![allow(dead_code)]

use std::str::FromStr;

use anyhow::{Context, Result};
use async_graphql::{Request, Variables};
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use sns_backend::auth::AuthUser;
use sns_backend::middlewares::auth::Caller;
use sns_backend::{db, AppConfig, AppState};

/// Fresh application state over a private in-memory database.
pub async fn test_state() -> Result<AppState> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    // One long-lived connection: every new in-memory connection is a new database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .context("failed to open in-memory database")?;
    db::run_migrations(&pool).await?;

    let mut config = AppConfig::development();
    config.security.bcrypt_cost = 4;
    config.graphql.max_page_size = 50;
    Ok(AppState::new(pool, config))
}

/// Runs a document and returns the serialized response (`data` / `errors`).
pub async fn execute(state: &AppState, caller: Caller, query: &str, variables: Value) -> Value {
    let request = Request::new(query)
        .variables(Variables::from_json(variables))
        .data(caller);
    let response = state.schema.execute(request).await;
    serde_json::to_value(&response).expect("response serializes")
}

pub async fn anonymous(state: &AppState, query: &str, variables: Value) -> Value {
    execute(state, Caller::Anonymous, query, variables).await
}

pub fn error_codes(response: &Value) -> Vec<String> {
    response["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e["extensions"]["code"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub fn assert_ok(response: &Value) {
    assert!(
        response.get("errors").map_or(true, |e| e.as_array().map_or(true, Vec::is_empty)),
        "unexpected errors: {response}"
    );
}

pub const CREATE_USER: &str = r#"
    mutation CreateUser($input: CreateUserMutationInput!) {
        createUser(input: $input) {
            user { id username email }
            clientMutationId
        }
    }
"#;

pub const TOKEN_AUTH: &str = r#"
    mutation TokenAuth($username: String!, $password: String!) {
        tokenAuth(username: $username, password: $password) {
            token
            payload { username exp origIat }
            refreshExpiresIn
        }
    }
"#;

pub const CREATE_PROFILE: &str = r#"
    mutation { createProfile(input: {}) { profile { id userProf { username } } } }
"#;

pub const UPDATE_PROFILE: &str = r#"
    mutation UpdateProfile($input: ProfileUpdateMutationInput!) {
        updateProfile(input: $input) {
            profile {
                id
                friends { edges { node { id username } } }
                friendRequests { edges { node { id username } } }
            }
        }
    }
"#;

pub const CREATE_MESSAGE: &str = r#"
    mutation CreateMessage($input: CreateMessageMutationInput!) {
        createMessage(input: $input) {
            message { id message sender { username } receiver { username } }
        }
    }
"#;

/// A signed-up user with a verified token.
pub struct TestUser {
    pub id: String,
    pub username: String,
    pub token: String,
}

impl TestUser {
    pub fn caller(&self, state: &AppState) -> Caller {
        let claims = state.token_issuer.verify(&self.token).expect("token verifies");
        Caller::Authenticated(AuthUser::from(claims))
    }
}

pub async fn signup(state: &AppState, username: &str, password: &str) -> Result<TestUser> {
    signup_with_email(state, username, &format!("{username}@example.com"), password).await
}

pub async fn signup_with_email(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
) -> Result<TestUser> {
    let created = anonymous(
        state,
        CREATE_USER,
        json!({ "input": {
            "username": username,
            "password": password,
            "email": email,
        }}),
    )
    .await;
    assert_ok(&created);
    let id = created["data"]["createUser"]["user"]["id"]
        .as_str()
        .context("createUser returned no id")?
        .to_string();

    let login = anonymous(
        state,
        TOKEN_AUTH,
        json!({ "username": username, "password": password }),
    )
    .await;
    assert_ok(&login);
    let token = login["data"]["tokenAuth"]["token"]
        .as_str()
        .context("tokenAuth returned no token")?
        .to_string();

    Ok(TestUser {
        id,
        username: username.to_string(),
        token,
    })
}

pub async fn create_profile(state: &AppState, user: &TestUser) -> Result<String> {
    let response = execute(state, user.caller(state), CREATE_PROFILE, json!({})).await;
    assert_ok(&response);
    Ok(response["data"]["createProfile"]["profile"]["id"]
        .as_str()
        .context("createProfile returned no id")?
        .to_string())
}

pub fn usernames(connection: &Value) -> Vec<String> {
    connection["edges"]
        .as_array()
        .map(|edges| {
            edges
                .iter()
                .filter_map(|edge| edge["node"]["username"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
