//! Security primitives guarding the service boundary: password hashing,
//! activation-code generation and the cross-origin allow-list.

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

use crate::error::{AppError, AppResult};

/// Hash a password into a PHC string (argon2id, random 16-byte salt).
pub fn hash_password(password: &str) -> AppResult<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| AppError::RandomSource(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::RandomSource(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::RandomSource(e.to_string()))?
        .to_string();
    Ok(phc)
}

/// Verify a password against a stored PHC string. An unparsable hash counts
/// as a failed verification, never as an error a caller could leak.
pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else {
        false
    }
}

/// Hex-encode `n_bytes` of fresh entropy. Session ids, access tokens and
/// refresh tokens are all minted through here.
pub fn random_hex(n_bytes: usize) -> AppResult<String> {
    let mut buf = vec![0u8; n_bytes];
    getrandom::getrandom(&mut buf).map_err(|e| AppError::RandomSource(e.to_string()))?;
    let mut out = String::with_capacity(n_bytes * 2);
    use std::fmt::Write as _;
    for b in &buf {
        let _ = write!(&mut out, "{:02x}", b);
    }
    Ok(out)
}

const ACTIVATION_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ACTIVATION_CODE_LEN: usize = 6;

/// Generate a 6-character activation code drawn uniformly from `[A-Z0-9]`.
///
/// Bytes >= 252 are re-drawn so the modulo over the 36-symbol alphabet stays
/// uniform. Entropy failure aborts the activation flow; no retry happens
/// here.
pub fn generate_activation_code() -> AppResult<String> {
    let mut code = String::with_capacity(ACTIVATION_CODE_LEN);
    while code.len() < ACTIVATION_CODE_LEN {
        let mut buf = [0u8; 16];
        getrandom::getrandom(&mut buf).map_err(|e| AppError::RandomSource(e.to_string()))?;
        for b in buf {
            // 252 is the largest multiple of 36 that fits in a byte
            if b >= 252 {
                continue;
            }
            code.push(ACTIVATION_ALPHABET[(b % 36) as usize] as char);
            if code.len() == ACTIVATION_CODE_LEN {
                break;
            }
        }
    }
    Ok(code)
}

/// Configured set of origins permitted to call the API cross-origin.
///
/// Matching is exact and case-sensitive; the single sentinel `*` allows any
/// origin. The policy is immutable after construction and holds no per-call
/// state.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Vec<String>,
    allow_any: bool,
}

impl OriginPolicy {
    pub fn from_csv(csv: &str) -> Self {
        let allowed: Vec<String> = csv
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let allow_any = allowed.iter().any(|o| o == "*");
        Self { allowed, allow_any }
    }

    pub fn allow_any() -> Self {
        Self { allowed: vec!["*".into()], allow_any: true }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allow_any || self.allowed.iter().any(|o| o == origin)
    }

    /// Gate an inbound `Origin` header value.
    pub fn verify(&self, origin: &str) -> AppResult<()> {
        if self.is_allowed(origin) {
            Ok(())
        } else {
            Err(AppError::Unauthorized)
        }
    }
}
