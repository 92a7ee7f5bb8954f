use tracing::{error, warn};

use crate::error::AppError;

/// Work factor for stored password hashes.
pub const BCRYPT_COST: u32 = 12;

/// bcrypt only reads this many bytes of input; longer passwords are refused
/// rather than silently truncated.
pub const MAX_PASSWORD_BYTES: usize = 72;

pub fn fits_bcrypt(plain: &str) -> bool {
    plain.len() <= MAX_PASSWORD_BYTES
}

/// Salted bcrypt hashing of raw passwords.
#[derive(Debug, Clone, Copy)]
pub struct PasswordCodec {
    cost: u32,
}

impl Default for PasswordCodec {
    fn default() -> Self {
        Self { cost: BCRYPT_COST }
    }
}

impl PasswordCodec {
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, plain: &str) -> Result<String, AppError> {
        if !fits_bcrypt(plain) {
            return Err(AppError::Hashing(format!(
                "password is {} bytes, limit is {MAX_PASSWORD_BYTES}",
                plain.len()
            )));
        }
        bcrypt::hash(plain, self.cost).map_err(|e| {
            error!(error = %e, "bcrypt hash error");
            AppError::Hashing(e.to_string())
        })
    }

    /// Never errors: a malformed hash or an over-long password simply does not verify.
    pub fn verify(&self, plain: &str, hash: &str) -> bool {
        if !fits_bcrypt(plain) {
            return false;
        }
        match bcrypt::verify(plain, hash) {
            Ok(ok) => ok,
            Err(e) => {
                warn!(error = %e, "bcrypt verify error");
                false
            }
        }
    }

    /// Hash on the blocking pool so the async workers stay free.
    pub async fn hash_blocking(&self, plain: String) -> Result<String, AppError> {
        let codec = *self;
        tokio::task::spawn_blocking(move || codec.hash(&plain))
            .await
            .map_err(|e| AppError::Hashing(e.to_string()))?
    }

    /// Only a failed blocking task is an error; a mismatch is `Ok(false)`.
    pub async fn verify_blocking(&self, plain: String, hash: String) -> Result<bool, AppError> {
        let codec = *self;
        tokio::task::spawn_blocking(move || codec.verify(&plain, &hash))
            .await
            .map_err(|e| AppError::Hashing(e.to_string()))
    }
}
