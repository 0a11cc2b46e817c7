use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims issued by the upstream identity provider. `tid` names the tenant
/// the subject belongs to.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<String>,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, tenant: Option<String>, ttl: Duration) -> Self {
        Self {
            sub: user_id,
            tid: tenant,
            exp: (Utc::now() + ttl).timestamp(),
        }
    }
}

pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_keeps_tenant() {
        let user_id = Uuid::now_v7();
        let claims = Claims::new(user_id, Some("acme".to_string()), Duration::minutes(5));
        let token = encode_token(&claims, "secret").unwrap();

        let decoded = decode_token(&token, "secret").unwrap();
        assert_eq!(decoded.sub, user_id);
        assert_eq!(decoded.tid.as_deref(), Some("acme"));
    }

    #[test]
    fn wrong_secret_or_expiry_is_rejected() {
        let claims = Claims::new(Uuid::now_v7(), None, Duration::minutes(5));
        let token = encode_token(&claims, "secret").unwrap();
        assert!(decode_token(&token, "other").is_err());

        let expired = Claims::new(Uuid::now_v7(), None, Duration::minutes(-10));
        let token = encode_token(&expired, "secret").unwrap();
        assert!(decode_token(&token, "secret").is_err());
    }
}
