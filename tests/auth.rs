mod common;

use anyhow::Result;
use serde_json::json;
use sns_backend::middlewares::auth::Caller;

use common::*;

#[tokio::test]
async fn signup_then_login_returns_a_usable_token() -> Result<()> {
    let state = test_state().await?;

    let created = anonymous(
        &state,
        CREATE_USER,
        json!({ "input": {
            "username": "alice",
            "password": "pw1",
            "email": "a@x.com",
            "clientMutationId": "signup-1",
        }}),
    )
    .await;
    assert_ok(&created);
    assert_eq!(created["data"]["createUser"]["user"]["username"], "alice");
    assert_eq!(created["data"]["createUser"]["user"]["email"], "a@x.com");
    assert_eq!(created["data"]["createUser"]["clientMutationId"], "signup-1");

    let login = anonymous(&state, TOKEN_AUTH, json!({ "username": "alice", "password": "pw1" })).await;
    assert_ok(&login);
    assert_eq!(login["data"]["tokenAuth"]["payload"]["username"], "alice");

    let token = login["data"]["tokenAuth"]["token"].as_str().unwrap();
    let claims = state.token_issuer.verify(token)?;
    assert_eq!(claims.username, "alice");
    assert!(claims.exp > claims.iat);
    Ok(())
}

#[tokio::test]
async fn duplicate_usernames_are_rejected() -> Result<()> {
    let state = test_state().await?;
    signup(&state, "alice", "pw1").await?;

    let again = anonymous(
        &state,
        CREATE_USER,
        json!({ "input": { "username": "alice", "password": "other", "email": "b@x.com" }}),
    )
    .await;
    assert_eq!(error_codes(&again), vec!["VALIDATION_ERROR"]);

    let users = execute(
        &state,
        signup(&state, "bob", "pw2").await?.caller(&state),
        "{ allUsers { edges { node { username } } } }",
        json!({}),
    )
    .await;
    assert_eq!(usernames(&users["data"]["allUsers"]), vec!["alice", "bob"]);
    Ok(())
}

#[tokio::test]
async fn signup_input_is_validated() -> Result<()> {
    let state = test_state().await?;

    let bad_email = anonymous(
        &state,
        CREATE_USER,
        json!({ "input": { "username": "carol", "password": "pw", "email": "not-an-email" }}),
    )
    .await;
    assert_eq!(error_codes(&bad_email), vec!["VALIDATION_ERROR"]);

    let bad_name = anonymous(
        &state,
        CREATE_USER,
        json!({ "input": { "username": "car ol", "password": "pw", "email": "c@x.com" }}),
    )
    .await;
    assert_eq!(error_codes(&bad_name), vec!["VALIDATION_ERROR"]);
    Ok(())
}

#[tokio::test]
async fn wrong_credentials_fail_with_auth_error() -> Result<()> {
    let state = test_state().await?;
    signup(&state, "alice", "pw1").await?;

    let wrong_password =
        anonymous(&state, TOKEN_AUTH, json!({ "username": "alice", "password": "nope" })).await;
    assert_eq!(error_codes(&wrong_password), vec!["AUTH_ERROR"]);

    let unknown_user =
        anonymous(&state, TOKEN_AUTH, json!({ "username": "mallory", "password": "pw1" })).await;
    assert_eq!(error_codes(&unknown_user), vec!["AUTH_ERROR"]);
    Ok(())
}

#[tokio::test]
async fn protected_operations_require_a_token() -> Result<()> {
    let state = test_state().await?;
    let alice = signup(&state, "alice", "pw1").await?;

    for query in [
        "{ profile { id } }",
        "{ allUsers { edges { node { id } } } }",
        "{ allProfiles { edges { node { id } } } }",
        "{ allMessages { edges { node { id } } } }",
    ] {
        let response = anonymous(&state, query, json!({})).await;
        assert_eq!(error_codes(&response), vec!["UNAUTHENTICATED"], "{query}");
    }

    let profile = anonymous(&state, CREATE_PROFILE, json!({})).await;
    assert_eq!(error_codes(&profile), vec!["UNAUTHENTICATED"]);

    let message = anonymous(
        &state,
        CREATE_MESSAGE,
        json!({ "input": { "message": "hi", "receiver": alice.id }}),
    )
    .await;
    assert_eq!(error_codes(&message), vec!["UNAUTHENTICATED"]);

    let node = anonymous(
        &state,
        "query($id: ID!) { node(id: $id) { id } }",
        json!({ "id": alice.id }),
    )
    .await;
    assert_eq!(error_codes(&node), vec!["UNAUTHENTICATED"]);

    // Nothing was written by the rejected calls.
    let messages = execute(
        &state,
        alice.caller(&state),
        "{ allMessages { edges { node { id } } } }",
        json!({}),
    )
    .await;
    assert_ok(&messages);
    assert_eq!(messages["data"]["allMessages"]["edges"], json!([]));

    let profile = execute(&state, alice.caller(&state), "{ profile { id } }", json!({})).await;
    assert_eq!(error_codes(&profile), vec!["NOT_FOUND"]);
    Ok(())
}

#[tokio::test]
async fn anonymous_profile_updates_change_nothing() -> Result<()> {
    let state = test_state().await?;
    let alice = signup(&state, "alice", "pw1").await?;
    let bob = signup(&state, "bob", "pw2").await?;
    let profile = create_profile(&state, &alice).await?;

    let seeded = execute(
        &state,
        alice.caller(&state),
        UPDATE_PROFILE,
        json!({ "input": { "id": profile, "friends": [bob.id] }}),
    )
    .await;
    assert_ok(&seeded);

    let rejected = anonymous(
        &state,
        UPDATE_PROFILE,
        json!({ "input": { "id": profile, "friends": [], "friendRequests": [alice.id] }}),
    )
    .await;
    assert_eq!(error_codes(&rejected), vec!["UNAUTHENTICATED"]);
    assert!(rejected["data"].is_null());

    let stored = execute(
        &state,
        alice.caller(&state),
        "{ profile { friends { edges { node { username } } } friendRequests { edges { node { username } } } } }",
        json!({}),
    )
    .await;
    assert_ok(&stored);
    assert_eq!(usernames(&stored["data"]["profile"]["friends"]), vec!["bob"]);
    assert!(usernames(&stored["data"]["profile"]["friendRequests"]).is_empty());
    Ok(())
}

#[tokio::test]
async fn rejected_tokens_surface_as_unauthenticated() -> Result<()> {
    let state = test_state().await?;
    let response = execute(
        &state,
        Caller::Rejected("Invalid token: InvalidSignature".to_string()),
        "{ allUsers { edges { node { id } } } }",
        json!({}),
    )
    .await;
    assert_eq!(error_codes(&response), vec!["UNAUTHENTICATED"]);
    assert_eq!(response["errors"][0]["message"], "Invalid token: InvalidSignature");
    Ok(())
}

#[tokio::test]
async fn tokens_can_be_verified_and_refreshed() -> Result<()> {
    let state = test_state().await?;
    let alice = signup(&state, "alice", "pw1").await?;

    let verified = anonymous(
        &state,
        "mutation($token: String!) { verifyToken(token: $token) { payload { username origIat } } }",
        json!({ "token": alice.token }),
    )
    .await;
    assert_ok(&verified);
    assert_eq!(verified["data"]["verifyToken"]["payload"]["username"], "alice");

    let refreshed = anonymous(
        &state,
        "mutation($token: String!) { refreshToken(token: $token) { token payload { origIat } } }",
        json!({ "token": alice.token }),
    )
    .await;
    assert_ok(&refreshed);
    assert_eq!(
        refreshed["data"]["refreshToken"]["payload"]["origIat"],
        verified["data"]["verifyToken"]["payload"]["origIat"]
    );

    let garbage = anonymous(
        &state,
        "mutation { verifyToken(token: \"garbage\") { payload { username } } }",
        json!({}),
    )
    .await;
    assert_eq!(error_codes(&garbage), vec!["UNAUTHENTICATED"]);
    Ok(())
}
