pub mod app_state;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod graphql;
pub mod handlers;
pub mod middlewares;
pub mod models;
pub mod queries;
pub mod routes;

use axum::Router;

pub use app_state::AppState;
pub use config::AppConfig;

/// Full HTTP application: GraphQL endpoint, GraphiQL and health check.
pub fn app(state: AppState) -> Router {
    routes::create_routes(&state.config.security).with_state(state)
}
