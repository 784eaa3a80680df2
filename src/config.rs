use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::env;
use std::str::FromStr;

const DEVELOPMENT_JWT_SECRET: &str = "sns-development-secret-change-me";

#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub graphql: GraphqlConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_minutes: i64,
    pub jwt_refresh_expiry_days: i64,
    pub bcrypt_cost: u32,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphqlConfig {
    pub max_page_size: usize,
    pub graphiql_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            _ => Environment::Development,
        };

        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.security.jwt_secret.is_empty() {
            match self.environment {
                Environment::Production => bail!("JWT_SECRET must be set when APP_ENV=production"),
                Environment::Development => bail!("JWT_SECRET must not be empty"),
            }
        }
        Ok(())
    }

    fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        override_parsed("PORT", &mut self.server.port)?;

        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        override_parsed("DATABASE_MAX_CONNECTIONS", &mut self.database.max_connections)?;

        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        override_parsed("JWT_EXPIRY_MINUTES", &mut self.security.jwt_expiry_minutes)?;
        override_parsed(
            "JWT_REFRESH_EXPIRY_DAYS",
            &mut self.security.jwt_refresh_expiry_days,
        )?;
        override_parsed("BCRYPT_COST", &mut self.security.bcrypt_cost)?;
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.security.cors_origins = parse_list(&v);
        }

        override_parsed("GRAPHQL_MAX_PAGE_SIZE", &mut self.graphql.max_page_size)?;
        override_parsed("GRAPHIQL_ENABLED", &mut self.graphql.graphiql_enabled)?;

        Ok(self)
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: "sqlite://sns.db?mode=rwc".to_string(),
                max_connections: 20,
            },
            security: SecurityConfig {
                jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
                jwt_expiry_minutes: 60,
                jwt_refresh_expiry_days: 7,
                bcrypt_cost: bcrypt::DEFAULT_COST,
                cors_origins: Vec::new(),
            },
            graphql: GraphqlConfig {
                max_page_size: 100,
                graphiql_enabled: true,
            },
        }
    }

    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.security.jwt_secret = String::new();
        config.graphql.graphiql_enabled = false;
        config
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn override_parsed<T>(key: &str, target: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(raw) = env::var(key) {
        *target = parse_value(key, &raw)?;
    }
    Ok(())
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .with_context(|| format!("invalid value for {key}: {raw:?}"))
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
