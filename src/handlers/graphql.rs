use anyhow::anyhow;
use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse};

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::middlewares::auth::Caller;

pub const GRAPHQL_PATH: &str = "/graphql/";

pub async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let caller = Caller::from_headers(&headers, &state.token_issuer);
    let request = req.into_inner().data(caller);
    state.schema.execute(request).await.into()
}

pub async fn graphiql(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    if !state.config.graphql.graphiql_enabled {
        return Err(AppError::NotFound(anyhow!("GraphiQL is disabled")));
    }
    Ok(Html(GraphiQLSource::build().endpoint(GRAPHQL_PATH).finish()))
}
