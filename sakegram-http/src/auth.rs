use rand::Rng;
use sakegram::SakegramError;
use sha2::{Digest, Sha256};
use std::sync::RwLock;

/// Header carrying the session token.
pub const AUTH_HEADER: &str = "x-auth-token";

/// Single shared-secret session.
///
/// When no password is configured every request is let through. Otherwise
/// a successful login issues a fresh token and invalidates the previous one.
#[derive(Default)]
pub struct SessionAuth {
    token: RwLock<Option<String>>,
}

impl SessionAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check `supplied` against `password` and hand out a new token.
    pub fn login(
        &self,
        password: Option<&str>,
        supplied: Option<&str>,
    ) -> Result<String, SakegramError> {
        if let Some(expected) = password {
            match supplied {
                Some(given) if secrets_match(expected, given) => {}
                _ => return Err(SakegramError::InvalidPassword),
            }
        }

        let token = generate_hex_key();
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token.clone());
        tracing::info!("New session token issued");
        Ok(token)
    }

    pub fn is_authenticated(&self, password: Option<&str>, presented: Option<&str>) -> bool {
        if password.is_none() {
            return true;
        }
        let current = self.token.read().unwrap_or_else(|e| e.into_inner());
        match (current.as_deref(), presented) {
            (Some(expected), Some(given)) => secrets_match(expected, given),
            _ => false,
        }
    }
}

/// 32 random bytes, hex encoded.
pub fn generate_hex_key() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

/// Constant-time comparison. Both sides are hashed first so the running
/// time does not depend on where the inputs differ or on their lengths.
pub fn secrets_match(expected: &str, given: &str) -> bool {
    let a = Sha256::digest(expected.as_bytes());
    let b = Sha256::digest(given.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
