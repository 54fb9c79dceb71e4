//! Signature verification of Provider-issued JWTs.
//!
//! Signing keys are cached by key id and fetched on a miss, so a Provider
//! key rotation is picked up without a restart. Concurrent misses may
//! fetch the same key set twice; the second write is identical.

use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use rootcause::Report;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::AuthError;
use crate::provider::ProviderClient;

/// Decoded claims of a verified token.
pub type Claims = Map<String, JsonValue>;

/// The only signature algorithm accepted from the Provider.
const EXPECTED_ALGORITHM: Algorithm = Algorithm::RS256;

/// Verifies access tokens and returns their claims.
pub struct SignatureVerifier {
    mode: VerifierMode,
}

enum VerifierMode {
    Jwks(JwksVerifier),
    /// Tokens are raw JSON claim objects. No signature, expiry, or
    /// audience checks happen in this mode.
    MockClaims,
}

impl SignatureVerifier {
    /// Builds the verifier the configuration asks for.
    #[must_use]
    pub fn from_config(config: &ProviderConfig, provider: ProviderClient) -> Self {
        if config.mock_auth() {
            warn!("mock_auth is enabled: access tokens are parsed as raw JSON claims");
            return Self::mock_claims();
        }
        Self::jwks(config, provider)
    }

    /// Creates a verifier backed by the Provider's key set.
    #[must_use]
    pub fn jwks(config: &ProviderConfig, provider: ProviderClient) -> Self {
        let mut validation = Validation::new(EXPECTED_ALGORITHM);
        validation.set_audience(&[config.audience()]);
        if let Some(issuer) = config.issuer() {
            validation.set_issuer(&[issuer]);
        }
        validation.set_required_spec_claims(&["exp", "aud"]);
        validation.validate_exp = true;
        validation.leeway = config.jwt_leeway_seconds();

        Self {
            mode: VerifierMode::Jwks(JwksVerifier {
                provider,
                validation,
                min_refresh: config.jwks_min_refresh(),
                cache: RwLock::new(KeyCache::default()),
            }),
        }
    }

    /// Creates a verifier that trusts any JSON object as claims.
    #[must_use]
    pub fn mock_claims() -> Self {
        Self {
            mode: VerifierMode::MockClaims,
        }
    }

    /// Verifies a token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` on a malformed token, an
    /// unexpected algorithm, an unresolvable key id, a bad signature, an
    /// expired token, or an audience or issuer mismatch.
    pub async fn verify(&self, token: &str) -> Result<Claims, Report<AuthError>> {
        match &self.mode {
            VerifierMode::Jwks(verifier) => verifier.verify(token).await,
            VerifierMode::MockClaims => Ok(serde_json::from_str(token)
                .map_err(|_| AuthError::invalid_token("mock token is not a JSON object"))?),
        }
    }
}

#[derive(Default)]
struct KeyCache {
    keys: HashMap<String, Jwk>,
    last_fetch: Option<Instant>,
}

struct JwksVerifier {
    provider: ProviderClient,
    validation: Validation,
    min_refresh: Duration,
    cache: RwLock<KeyCache>,
}

impl JwksVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, Report<AuthError>> {
        let header = decode_header(token)
            .map_err(|e| AuthError::invalid_token(format!("malformed token header: {e}")))?;

        if header.alg != EXPECTED_ALGORITHM {
            return Err(AuthError::invalid_token(format!(
                "unexpected signature algorithm {:?}",
                header.alg
            ))
            .into());
        }

        let kid = header
            .kid
            .ok_or_else(|| AuthError::invalid_token("token header has no key id"))?;
        let key = self.decoding_key(&kid).await?;

        let data = decode::<Claims>(token, &key, &self.validation)
            .map_err(|e| AuthError::invalid_token(format!("{:?}", e.kind())))?;

        Ok(data.claims)
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, Report<AuthError>> {
        if let Some(key) = self.cached_key(kid).await? {
            return Ok(key);
        }

        self.refresh(kid).await?;

        self.cached_key(kid)
            .await?
            .ok_or_else(|| AuthError::invalid_token(format!("no signing key for key id '{kid}'")).into())
    }

    async fn cached_key(&self, kid: &str) -> Result<Option<DecodingKey>, Report<AuthError>> {
        let cache = self.cache.read().await;
        match cache.keys.get(kid) {
            Some(jwk) => Ok(Some(DecodingKey::from_jwk(jwk).map_err(|e| {
                AuthError::invalid_token(format!("unusable signing key '{kid}': {e}"))
            })?)),
            None => Ok(None),
        }
    }

    async fn refresh(&self, kid: &str) -> Result<(), Report<AuthError>> {
        {
            let cache = self.cache.read().await;
            if cache.keys.contains_key(kid) {
                return Ok(());
            }
            if let Some(last_fetch) = cache.last_fetch
                && last_fetch.elapsed() < self.min_refresh
            {
                return Err(AuthError::invalid_token(format!(
                    "unknown key id '{kid}' and key set was refreshed recently"
                ))
                .into());
            }
        }

        debug!(kid, "signing key not cached, fetching key set");
        let fetched = self.provider.fetch_jwks().await;

        let mut cache = self.cache.write().await;
        cache.last_fetch = Some(Instant::now());
        let jwks = fetched.map_err(|report| {
            AuthError::invalid_token(format!(
                "signing keys unavailable: {}",
                report.current_context()
            ))
        })?;

        cache.keys = jwks
            .keys
            .into_iter()
            .filter_map(|jwk| jwk.common.key_id.clone().map(|id| (id, jwk)))
            .collect();
        debug!(keys = cache.keys.len(), "signing key cache refreshed");

        Ok(())
    }
}
