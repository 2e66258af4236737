use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use tracing::debug;

use crate::claims::Claims;
use crate::config::JwtConfig;
use crate::error::{AuthError, AuthResult};

/// Thread-safe store for decoding keys loaded from env-configured PEM
/// or shared-secret material. Keys are keyed by kid and carry the
/// algorithm they were registered for.
#[derive(Clone, Default)]
pub struct InMemoryKeyStore {
    inner: Arc<RwLock<HashMap<String, (DecodingKey, Algorithm)>>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_key(&self, kid: impl Into<String>, key: DecodingKey, alg: Algorithm) {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        guard.insert(kid.into(), (key, alg));
    }

    pub fn insert_rsa_pem(&self, kid: impl Into<String>, pem: &[u8]) -> AuthResult<()> {
        let kid = kid.into();
        let key = DecodingKey::from_rsa_pem(pem)
            .map_err(|err| AuthError::KeyParse(kid.clone(), err.to_string()))?;
        self.insert_key(kid, key, Algorithm::RS256);
        Ok(())
    }

    pub fn insert_hmac_secret(&self, kid: impl Into<String>, secret: &[u8]) {
        self.insert_key(kid, DecodingKey::from_secret(secret), Algorithm::HS256);
    }

    pub fn get(&self, kid: &str) -> Option<(DecodingKey, Algorithm)> {
        let guard = self.inner.read().expect("rwlock poisoned");
        guard.get(kid).cloned()
    }

    pub fn contains(&self, kid: &str) -> bool {
        let guard = self.inner.read().expect("rwlock poisoned");
        guard.contains_key(kid)
    }
}

#[derive(Clone)]
pub struct JwtVerifier {
    config: JwtConfig,
    store: InMemoryKeyStore,
}

impl JwtVerifier {
    pub fn new(config: JwtConfig) -> Self {
        Self {
            config,
            store: InMemoryKeyStore::new(),
        }
    }

    pub fn with_store(config: JwtConfig, store: InMemoryKeyStore) -> Self {
        Self { config, store }
    }

    pub fn builder(config: JwtConfig) -> JwtVerifierBuilder {
        JwtVerifierBuilder::new(config)
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    pub fn store(&self) -> &InMemoryKeyStore {
        &self.store
    }

    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        let header =
            decode_header(token).map_err(|err| AuthError::InvalidHeader(err.to_string()))?;
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
        let (key, alg) = self
            .store
            .get(&kid)
            .ok_or_else(|| AuthError::UnknownKeyId(kid.clone()))?;

        let mut validation = Validation::new(alg);
        validation.set_issuer(&[self.config.issuer.clone()]);
        validation.set_audience(&[self.config.audience.clone()]);
        validation.leeway = self.config.leeway_seconds.into();

        let token_data = decode::<Value>(token, &key, &validation)?;
        let claims = Claims::try_from(token_data.claims)?;
        debug!(kid, "verified JWT successfully");
        Ok(claims)
    }
}

pub struct JwtVerifierBuilder {
    config: JwtConfig,
    store: InMemoryKeyStore,
}

impl JwtVerifierBuilder {
    fn new(config: JwtConfig) -> Self {
        Self {
            config,
            store: InMemoryKeyStore::new(),
        }
    }

    pub fn with_store(mut self, store: InMemoryKeyStore) -> Self {
        self.store = store;
        self
    }

    pub fn with_rsa_pem(self, kid: impl Into<String>, pem: &[u8]) -> AuthResult<Self> {
        self.store.insert_rsa_pem(kid, pem)?;
        Ok(self)
    }

    pub fn with_hmac_secret(self, kid: impl Into<String>, secret: &[u8]) -> Self {
        self.store.insert_hmac_secret(kid, secret);
        self
    }

    pub fn build(self) -> JwtVerifier {
        JwtVerifier {
            config: self.config,
            store: self.store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;
    use uuid::Uuid;

    #[derive(Serialize)]
    struct TokenClaims<'a> {
        sub: &'a str,
        iss: &'a str,
        aud: &'a str,
        exp: i64,
        iat: i64,
    }

    fn issue_token(secret: &[u8], kid: &str, issuer: &str, audience: &str) -> (String, Uuid) {
        let subject = Uuid::new_v4();
        let issued_at = Utc::now().timestamp();
        let subject_str = subject.to_string();

        let claims = TokenClaims {
            sub: &subject_str,
            iss: issuer,
            aud: audience,
            exp: issued_at + 600,
            iat: issued_at,
        };

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(kid.to_string());
        let token = encode(&header, &claims, &EncodingKey::from_secret(secret)).expect("sign token");

        (token, subject)
    }

    #[test]
    fn key_store_round_trip() {
        let store = InMemoryKeyStore::new();
        assert!(!store.contains("kid"));
        store.insert_hmac_secret("kid", b"secret");
        assert!(store.contains("kid"));
        assert!(store.get("kid").is_some());
    }

    #[test]
    fn verifier_accepts_valid_token() {
        let config = JwtConfig::new("test-issuer", "test-audience");
        let verifier = JwtVerifier::builder(config)
            .with_hmac_secret("test-key", b"super-secret")
            .build();

        let (token, subject) = issue_token(b"super-secret", "test-key", "test-issuer", "test-audience");
        let claims = verifier.verify(&token).expect("verification succeeds");

        assert_eq!(claims.subject, subject);
        assert_eq!(claims.issuer, "test-issuer");
        assert_eq!(claims.audience, vec!["test-audience".to_string()]);
    }

    #[test]
    fn verifier_rejects_unknown_kid() {
        let config = JwtConfig::new("issuer", "aud");
        let verifier = JwtVerifier::new(config);

        let (token, _) = issue_token(b"secret", "missing", "issuer", "aud");
        let err = verifier.verify(&token).expect_err("verification should fail");
        match err {
            AuthError::UnknownKeyId(actual) => assert_eq!(actual, "missing"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn verifier_rejects_wrong_issuer() {
        let config = JwtConfig::new("expected-issuer", "aud");
        let verifier = JwtVerifier::builder(config)
            .with_hmac_secret("k1", b"secret")
            .build();

        let (token, _) = issue_token(b"secret", "k1", "other-issuer", "aud");
        let err = verifier.verify(&token).expect_err("verification should fail");
        assert!(matches!(err, AuthError::Verification(_)));
    }
}
