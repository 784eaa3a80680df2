use crate::app_state::AppState;
use crate::handlers::graphql::{graphiql, graphql_handler, GRAPHQL_PATH};
use axum::{routing::get, Router};

pub fn graphql_routes() -> Router<AppState> {
    // Same endpoint with and without the trailing slash.
    Router::new()
        .route(GRAPHQL_PATH, get(graphiql).post(graphql_handler))
        .route("/graphql", get(graphiql).post(graphql_handler))
}
