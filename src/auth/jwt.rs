use chrono::Utc;
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::policy::Role;

/// Token claims. The role is decoded as the typed enum, so a token carrying
/// an unknown role string fails verification outright.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: u64,
    pub email: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,

    pub iat: usize,
    pub exp: usize,
    pub jti: String,
}

pub fn generate_token(
    user_id: u64,
    email: String,
    role: Role,
    employee_id: Option<u64>,
    secret: &str,
    ttl: usize,
) -> Result<String, ApiError> {
    let now = Utc::now().timestamp() as usize;

    let claims = Claims {
        sub: user_id,
        email,
        role,
        employee_id,
        iat: now,
        exp: now + ttl,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("Token generation failed: {}", e)))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => ApiError::TokenExpired,
        _ => ApiError::TokenInvalid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "test-secret";

    #[test]
    fn token_round_trips_claims() {
        let token = generate_token(
            7,
            "jane@company.com".to_string(),
            Role::Manager,
            Some(42),
            SECRET,
            3600,
        )
        .unwrap();

        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.email, "jane@company.com");
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.employee_id, Some(42));
        assert_eq!(claims.exp, claims.iat + 3600);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let now = Utc::now().timestamp();
        // past the default validation leeway
        let stale = json!({
            "sub": 7,
            "email": "jane@company.com",
            "role": "manager",
            "employee_id": null,
            "iat": now - 7200,
            "exp": now - 3600,
            "jti": "x",
        });

        let token = encode(
            &Header::default(),
            &stale,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(verify_token(&token, SECRET), Err(ApiError::TokenExpired)));
    }

    #[test]
    fn garbage_token_is_invalid() {
        assert!(matches!(
            verify_token("not.a.token", SECRET),
            Err(ApiError::TokenInvalid)
        ));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token =
            generate_token(1, "a@b.c".to_string(), Role::Employee, None, SECRET, 3600).unwrap();
        assert!(matches!(
            verify_token(&token, "other-secret"),
            Err(ApiError::TokenInvalid)
        ));
    }

    #[test]
    fn unknown_role_claim_is_rejected() {
        let now = Utc::now().timestamp();
        let forged = json!({
            "sub": 7,
            "email": "jane@company.com",
            "role": "superuser",
            "employee_id": null,
            "iat": now,
            "exp": now + 3600,
            "jti": "x",
        });

        let token = encode(
            &Header::default(),
            &forged,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(verify_token(&token, SECRET), Err(ApiError::TokenInvalid)));
    }
}
