use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::core::app_error::AppError;

/// Name of the HTTP-only session cookie.
pub const SESSION_COOKIE: &str = "portal_session";

type HmacSha256 = Hmac<Sha256>;

// ========== Roles ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
    Nurse,
    Pharmacist,
    LabTechnician,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "patient" => Some(Role::Patient),
            "doctor" => Some(Role::Doctor),
            "nurse" => Some(Role::Nurse),
            "pharmacist" => Some(Role::Pharmacist),
            "lab_technician" => Some(Role::LabTechnician),
            "admin" => Some(Role::Admin),
            "super_admin" => Some(Role::SuperAdmin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
            Role::Pharmacist => "pharmacist",
            Role::LabTechnician => "lab_technician",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }
}

// ========== Session tokens ==========

#[derive(Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Claims carried by the session token. `jti` must match the user's current
/// `session_token` column, which keeps a single session active per login.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    pub sub: i32,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: i32, jti: Uuid, ttl_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            jti,
            iat: now.timestamp(),
            exp: (now + Duration::hours(ttl_hours)).timestamp(),
        }
    }
}

pub fn create_token(secret: &str, claims: &Claims) -> Result<String> {
    let header = TokenHeader {
        alg: "HS256".to_string(),
        typ: "JWT".to_string(),
    };

    let header_json = serde_json::to_string(&header).context("Failed to serialize header")?;
    let claims_json = serde_json::to_string(claims).context("Failed to serialize claims")?;

    let header_b64 = URL_SAFE_NO_PAD.encode(header_json.as_bytes());
    let claims_b64 = URL_SAFE_NO_PAD.encode(claims_json.as_bytes());
    let message = format!("{header_b64}.{claims_b64}");

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).context("Failed to create HMAC")?;
    mac.update(message.as_bytes());
    let signature_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{message}.{signature_b64}"))
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(AppError::Unauthorized);
    }

    let message = format!("{}.{}", parts[0], parts[1]);
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AppError::Unauthorized)?;
    mac.update(message.as_bytes());
    let expected_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    if parts[2] != expected_b64 {
        return Err(AppError::Unauthorized);
    }

    let claims_json = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|_| AppError::Unauthorized)?;
    let claims: Claims =
        serde_json::from_slice(&claims_json).map_err(|_| AppError::Unauthorized)?;

    if claims.exp < Utc::now().timestamp() {
        return Err(AppError::Unauthorized);
    }

    Ok(claims)
}

// ========== Password hashing ==========

/// Salted SHA-256, stored as `<salt_b64>$<digest_b64>`.
pub fn hash_password(password: &str) -> String {
    let salt: [u8; 16] = rand::random();
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    format!(
        "{}${}",
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    )
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_b64, digest_b64)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = URL_SAFE_NO_PAD.decode(salt_b64) else {
        return false;
    };
    let mut hasher = Sha256::new();
    hasher.update(&salt);
    hasher.update(password.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize()) == digest_b64
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn token_round_trip() {
        let claims = Claims::new(42, Uuid::new_v4(), 24);
        let token = create_token(SECRET, &claims).unwrap();
        let verified = verify_token(SECRET, &token).unwrap();
        assert_eq!(verified.sub, 42);
        assert_eq!(verified.jti, claims.jti);
    }

    #[test]
    fn rejects_expired_token() {
        let claims = Claims::new(1, Uuid::new_v4(), -1);
        let token = create_token(SECRET, &claims).unwrap();
        assert!(verify_token(SECRET, &token).is_err());
    }

    #[test]
    fn rejects_tampered_token() {
        let token_a = create_token(SECRET, &Claims::new(1, Uuid::new_v4(), 24)).unwrap();
        let token_b = create_token(SECRET, &Claims::new(2, Uuid::new_v4(), 24)).unwrap();
        // Payload of one token with the signature of another.
        let (payload_b, _) = token_b.rsplit_once('.').unwrap();
        let (_, sig_a) = token_a.rsplit_once('.').unwrap();
        assert!(verify_token(SECRET, &format!("{payload_b}.{sig_a}")).is_err());
    }

    #[test]
    fn rejects_wrong_secret() {
        let claims = Claims::new(1, Uuid::new_v4(), 24);
        let token = create_token(SECRET, &claims).unwrap();
        assert!(verify_token("other-secret", &token).is_err());
    }

    #[test]
    fn password_hash_round_trip() {
        let stored = hash_password("hunter22");
        assert!(verify_password("hunter22", &stored));
        assert!(!verify_password("hunter23", &stored));
        assert!(!verify_password("hunter22", "garbage"));
    }

    #[test]
    fn distinct_salts_produce_distinct_hashes() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn role_string_round_trip() {
        for role in [
            Role::Patient,
            Role::Doctor,
            Role::Nurse,
            Role::Pharmacist,
            Role::LabTechnician,
            Role::Admin,
            Role::SuperAdmin,
        ] {
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_str("receptionist"), None);
    }
}
