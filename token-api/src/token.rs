/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use keyhunt_types::{ChannelTokenClaims, Role};
use rand::Rng;

use crate::config::Credentials;
use crate::error::AppError;

/// Upper bound (exclusive) of randomly assigned uids.
pub const RANDOM_UID_LIMIT: u32 = 100_000;

/// Parse the `uid` query value, assigning a random uid when it is absent or
/// empty.
pub fn resolve_uid(uid: Option<&str>) -> Result<u32, AppError> {
    match uid.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw.parse::<u32>().map_err(|_| AppError::invalid_uid(raw)),
        None => Ok(rand::thread_rng().gen_range(0..RANDOM_UID_LIMIT)),
    }
}

/// Sign a channel access token.
pub fn generate_channel_token(
    credentials: &Credentials,
    ttl_secs: i64,
    channel: &str,
    uid: u32,
    role: Role,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp();
    let claims = ChannelTokenClaims {
        app_id: credentials.app_id.clone(),
        channel: channel.to_string(),
        uid,
        role,
        iat: now,
        exp: now + ttl_secs,
        iss: ChannelTokenClaims::ISSUER.to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(credentials.app_certificate.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("Failed to sign JWT: {e}");
        AppError::token_generation_failed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    fn credentials() -> Credentials {
        Credentials {
            app_id: "test-app".to_string(),
            app_certificate: "super-secret-test-cert".to_string(),
        }
    }

    fn decode_claims(token: &str) -> ChannelTokenClaims {
        let mut validation = Validation::default();
        validation.set_issuer(&[ChannelTokenClaims::ISSUER]);
        decode::<ChannelTokenClaims>(
            token,
            &DecodingKey::from_secret(credentials().app_certificate.as_bytes()),
            &validation,
        )
        .expect("should decode")
        .claims
    }

    #[test]
    fn token_round_trips_with_correct_claims() {
        let token = generate_channel_token(&credentials(), 3600, "arena", 4242, Role::Publisher)
            .expect("should sign");
        let claims = decode_claims(&token);
        assert_eq!(claims.app_id, "test-app");
        assert_eq!(claims.channel, "arena");
        assert_eq!(claims.uid, 4242);
        assert_eq!(claims.role, Role::Publisher);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.iss, "keyhunt-token-api");
    }

    #[test]
    fn wrong_certificate_fails_validation() {
        let token = generate_channel_token(&credentials(), 60, "arena", 1, Role::Subscriber)
            .expect("should sign");
        let result = decode::<ChannelTokenClaims>(
            &token,
            &DecodingKey::from_secret(b"another-cert"),
            &Validation::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn exp_is_now_plus_ttl() {
        let ttl = 900_i64;
        let before = Utc::now().timestamp();
        let token =
            generate_channel_token(&credentials(), ttl, "r", 0, Role::Subscriber).expect("should sign");
        let after = Utc::now().timestamp();
        let claims = decode_claims(&token);
        assert!(claims.exp >= before + ttl);
        assert!(claims.exp <= after + ttl);
    }

    #[test]
    fn uid_parsing() {
        assert_eq!(resolve_uid(Some("17")).unwrap(), 17);
        assert_eq!(resolve_uid(Some(" 17 ")).unwrap(), 17);
        assert!(resolve_uid(Some("-1")).is_err());
        assert!(resolve_uid(Some("abc")).is_err());
        for _ in 0..100 {
            assert!(resolve_uid(None).unwrap() < RANDOM_UID_LIMIT);
            assert!(resolve_uid(Some("")).unwrap() < RANDOM_UID_LIMIT);
        }
    }
}
