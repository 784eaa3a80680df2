use anyhow::anyhow;
use bcrypt::{hash, verify};

use crate::error::{AppError, AppResult};

pub fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    hash(password.as_bytes(), cost)
        .map_err(|e| AppError::InternalServerError(anyhow!("Error hashing password: {}", e)))
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match verify(password.as_bytes(), password_hash) {
        Ok(valid) => valid,
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash could not be verified");
            false
        }
    }
}
