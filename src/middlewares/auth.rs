use anyhow::anyhow;
use axum::http::{header, HeaderMap};

use crate::auth::{AuthUser, TokenIssuer};
use crate::error::{AppError, AppResult};

/// Who is making the current GraphQL request.
#[derive(Clone, Debug)]
pub enum Caller {
    Anonymous,
    Authenticated(AuthUser),
    /// A token was sent but did not verify.
    Rejected(String),
}

impl Caller {
    pub fn from_headers(headers: &HeaderMap, issuer: &TokenIssuer) -> Self {
        let token = match extract_bearer_token(headers) {
            Ok(Some(token)) => token,
            Ok(None) => return Caller::Anonymous,
            Err(reason) => return Caller::Rejected(reason),
        };

        match issuer.verify(token) {
            Ok(claims) => Caller::Authenticated(claims.into()),
            Err(e) => {
                tracing::debug!(error = %e, "bearer token rejected");
                Caller::Rejected(e.to_string())
            }
        }
    }

    pub fn require_user(&self) -> AppResult<&AuthUser> {
        match self {
            Caller::Authenticated(user) => Ok(user),
            Caller::Anonymous => Err(AppError::Unauthenticated(anyhow!(
                "You do not have permission to perform this action"
            ))),
            Caller::Rejected(reason) => Err(AppError::Unauthenticated(anyhow!("{}", reason))),
        }
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<Option<&str>, String> {
    let Some(auth_header) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("Bearer") || scheme == "JWT" => {
            let token = token.trim();
            if token.is_empty() {
                return Err("Empty bearer token".to_string());
            }
            Ok(Some(token))
        }
        _ => Err("Authorization header must use Bearer token format".to_string()),
    }
}
