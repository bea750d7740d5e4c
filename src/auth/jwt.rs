use chrono::{Utc, Duration};
use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey, Algorithm};
use serde::{Serialize, Deserialize};
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub role: String,
    pub branch: Option<String>,
    pub full_name: String,
    pub exp: usize,
    pub iat: usize,
}

pub fn sign_token(
    user_id: i64,
    role: &str,
    branch: Option<&str>,
    full_name: &str,
    secret: &str,
) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = now + Duration::hours(8);
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        branch: branch.map(|b| b.to_string()),
        full_name: full_name.to_string(),
        iat: now.timestamp() as usize,
        exp: exp.timestamp() as usize,
    };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::internal(format!("Token signing failed: {e}")))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256)
    )
    .map(|d| d.claims)
    .map_err(|e| AppError::validation(format!("Invalid or expired token: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_roundtrip() {
        let token = sign_token(7, "branch_admin", Some("Teran"), "Ana Lopez", "test-secret").unwrap();
        let claims = verify_token(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.role, "branch_admin");
        assert_eq!(claims.branch.as_deref(), Some("Teran"));
        assert_eq!(claims.full_name, "Ana Lopez");
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let token = sign_token(1, "operative", None, "X", "secret-a").unwrap();
        assert!(verify_token(&token, "secret-b").is_err());
    }
}
