use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::config::AppConfig;
use crate::graphql::{build_schema, AppSchema};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: sqlx::SqlitePool,
    pub schema: AppSchema,
    pub token_issuer: TokenIssuer,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db_pool: sqlx::SqlitePool, config: AppConfig) -> Self {
        let token_issuer = TokenIssuer::new(&config.security);
        let schema = build_schema(db_pool.clone(), config.clone(), token_issuer.clone());
        Self {
            db_pool,
            schema,
            token_issuer,
            config: Arc::new(config),
        }
    }
}
