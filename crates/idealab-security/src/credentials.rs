// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer credential verification.
//!
//! Tokens are HS256 JWTs carrying `{ userId, email, username, role, exp }`.
//! A token is accepted only if the signature and expiry check out AND the
//! user still exists and is active in the [`UserDirectory`].

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use idealab_core::{
    AdapterType, HealthStatus, IdeaLabError, PluginAdapter, Principal, UserDirectory, UserId,
};

/// Resolves a bearer token to an active principal.
///
/// Implementations never fail outward: any problem yields `None`.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Option<Principal>;
}

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: UserId,
    pub email: String,
    pub username: String,
    pub role: String,
    /// Expiry, seconds since the Unix epoch.
    pub exp: u64,
}

/// HS256 verifier backed by a user directory.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
    users: Arc<dyn UserDirectory>,
}

impl JwtVerifier {
    pub fn new(secret: &str, users: Arc<dyn UserDirectory>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            users,
        }
    }

    fn decode(&self, token: &str) -> Option<Claims> {
        match jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                debug!(error = %e, "bearer token rejected");
                None
            }
        }
    }
}

#[async_trait]
impl CredentialVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Option<Principal> {
        let claims = self.decode(token)?;
        match self.users.find_active_user(claims.user_id).await {
            Ok(Some(principal)) => Some(principal),
            Ok(None) => {
                debug!(user_id = claims.user_id, "bearer token for missing or inactive user");
                None
            }
            Err(e) => {
                debug!(user_id = claims.user_id, error = %e, "user lookup failed, treating caller as anonymous");
                None
            }
        }
    }
}

#[async_trait]
impl PluginAdapter for JwtVerifier {
    fn name(&self) -> &str {
        "jwt-hs256"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Credentials
    }

    async fn health_check(&self) -> Result<HealthStatus, IdeaLabError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), IdeaLabError> {
        Ok(())
    }
}

/// Sign a token for `principal` that expires after `ttl`.
pub fn sign_token(
    secret: &str,
    principal: &Principal,
    ttl: Duration,
) -> Result<String, IdeaLabError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| IdeaLabError::Internal(e.to_string()))?;
    let claims = Claims {
        user_id: principal.user_id,
        email: principal.email.clone(),
        username: principal.username.clone(),
        role: principal.role.clone(),
        exp: (now + ttl).as_secs(),
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| IdeaLabError::Internal(format!("failed to sign token: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Directory(HashMap<UserId, Principal>);

    #[async_trait]
    impl UserDirectory for Directory {
        async fn find_active_user(&self, id: UserId) -> Result<Option<Principal>, IdeaLabError> {
            Ok(self.0.get(&id).cloned())
        }
    }

    struct Failing;

    #[async_trait]
    impl UserDirectory for Failing {
        async fn find_active_user(&self, _: UserId) -> Result<Option<Principal>, IdeaLabError> {
            Err(IdeaLabError::store(std::io::Error::other("db down")))
        }
    }

    fn principal(id: UserId) -> Principal {
        Principal {
            user_id: id,
            email: format!("user{id}@example.org"),
            username: format!("user{id}"),
            role: "user".into(),
        }
    }

    fn verifier(users: Arc<dyn UserDirectory>) -> JwtVerifier {
        JwtVerifier::new("test-secret", users)
    }

    #[tokio::test]
    async fn valid_token_for_active_user_verifies() {
        let users = Arc::new(Directory(HashMap::from([(1, principal(1))])));
        let token = sign_token("test-secret", &principal(1), Duration::from_secs(600)).unwrap();
        assert_eq!(verifier(users).verify(&token).await, Some(principal(1)));
    }

    #[tokio::test]
    async fn wrong_signature_is_rejected() {
        let users = Arc::new(Directory(HashMap::from([(1, principal(1))])));
        let token = sign_token("other-secret", &principal(1), Duration::from_secs(600)).unwrap();
        assert_eq!(verifier(users).verify(&token).await, None);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let users = Arc::new(Directory(HashMap::from([(1, principal(1))])));
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
        let claims = Claims {
            user_id: 1,
            email: "a@b.c".into(),
            username: "a".into(),
            role: "user".into(),
            exp: now.as_secs() - 120,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert_eq!(verifier(users).verify(&token).await, None);
    }

    #[tokio::test]
    async fn inactive_user_is_rejected() {
        let users = Arc::new(Directory(HashMap::new()));
        let token = sign_token("test-secret", &principal(1), Duration::from_secs(600)).unwrap();
        assert_eq!(verifier(users).verify(&token).await, None);
    }

    #[tokio::test]
    async fn directory_failure_degrades_to_none() {
        let token = sign_token("test-secret", &principal(1), Duration::from_secs(600)).unwrap();
        assert_eq!(verifier(Arc::new(Failing)).verify(&token).await, None);
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let users = Arc::new(Directory(HashMap::new()));
        assert_eq!(verifier(users).verify("not-a-jwt").await, None);
    }

    #[test]
    fn claims_use_camel_case_user_id() {
        let token = sign_token("s", &principal(3), Duration::from_secs(60)).unwrap();
        let payload = token.split('.').nth(1).unwrap();
        assert!(!payload.is_empty());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        let decoded: jsonwebtoken::TokenData<serde_json::Value> =
            jsonwebtoken::decode(&token, &DecodingKey::from_secret(b"s"), &validation).unwrap();
        assert_eq!(decoded.claims["userId"], 3);
    }
}
