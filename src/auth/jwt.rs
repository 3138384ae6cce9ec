use anyhow::{Context, Result};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::session::IdentityClaims;

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

struct JwksCache {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
}

/// Claims of an ID token whose signature, issuer, audience and expiry checked out
#[derive(Debug, Clone)]
pub struct VerifiedIdToken {
    pub claims: IdentityClaims,
    pub expires_at: i64,
}

pub struct IdTokenValidator {
    jwks_url: String,
    /// Expected issuer (the configured Okta issuer)
    expected_issuer: String,
    /// Expected audience (the client id)
    expected_audience: String,
    client: reqwest::Client,
    jwks_cache: RwLock<Option<JwksCache>>,
    cache_ttl: Duration,
}

impl IdTokenValidator {
    /// Create an Okta ID token validator (RS256 with JWKS)
    ///
    /// # Arguments
    /// * `jwks_url` - Key set endpoint of the authorization server
    /// * `issuer` - Expected `iss` claim
    /// * `expected_audience` - Expected audience claim (the client_id)
    /// * `client` - HTTP client used for JWKS fetches
    /// * `jwks_cache_ttl_secs` - JWKS cache TTL
    pub fn new(
        jwks_url: String,
        issuer: &str,
        expected_audience: String,
        client: reqwest::Client,
        jwks_cache_ttl_secs: u64,
    ) -> Self {
        let expected_issuer = issuer.trim_end_matches('/').to_string();

        tracing::info!(
            jwks_url = %jwks_url,
            expected_issuer = %expected_issuer,
            expected_audience = %expected_audience,
            jwks_cache_ttl_secs = jwks_cache_ttl_secs,
            "ID token validator initialized with issuer and audience validation"
        );

        Self {
            jwks_url,
            expected_issuer,
            expected_audience,
            client,
            jwks_cache: RwLock::new(None),
            cache_ttl: Duration::from_secs(jwks_cache_ttl_secs),
        }
    }

    /// Validate an ID token (fetches JWKS if not cached or expired)
    pub async fn validate(&self, token: &str) -> Result<VerifiedIdToken> {
        tracing::debug!(token_len = token.len(), "Validating ID token");

        let header = decode_header(token).context("Invalid token header")?;
        let kid = header.kid.clone().context("Token missing kid")?;

        // Try to get key from cache first
        let decoding_key = match self.get_cached_key(&kid).await? {
            Some(key) => key,
            None => {
                // Key not found in cache - Okta may have rotated keys
                tracing::warn!(kid = %kid, "Key ID not found in cache, forcing JWKS refresh");
                self.refresh_jwks().await?;

                match self.get_cached_key(&kid).await? {
                    Some(key) => key,
                    None => {
                        tracing::error!(
                            kid = %kid,
                            "Unknown key ID - kid not found in JWKS even after refresh"
                        );
                        anyhow::bail!("Unknown key ID: {}", kid);
                    }
                }
            }
        };

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        validation.set_issuer(&[&self.expected_issuer]);
        validation.set_audience(&[&self.expected_audience]);

        let token_data = match decode::<IdentityClaims>(token, &decoding_key, &validation) {
            Ok(data) => data,
            Err(e) => {
                // Audit logging without the token itself
                let token_hash = format!("{:x}", md5::compute(token));
                tracing::error!(
                    error = ?e,
                    kid = %kid,
                    alg = ?header.alg,
                    token_hash = %token_hash,
                    token_len = token.len(),
                    "ID token validation failed"
                );
                anyhow::bail!("Token validation failed: {}", e);
            }
        };

        let claims = token_data.claims;
        let expires_at = claims.expires_at().context("Token missing exp")?;

        tracing::debug!(
            sub = ?claims.text("sub"),
            expires_at,
            "ID token validated successfully"
        );

        Ok(VerifiedIdToken { claims, expires_at })
    }

    /// Check if JWKS is cached (for health checks)
    pub async fn is_jwks_cached(&self) -> bool {
        self.jwks_cache.read().await.is_some()
    }

    /// Prefetch JWKS at startup so readiness passes immediately
    pub async fn prefetch_jwks(&self) -> Result<()> {
        tracing::info!("Prefetching JWKS at startup for readiness");
        self.refresh_jwks().await
    }

    /// Get cached key if available and not expired
    async fn get_cached_key(&self, kid: &str) -> Result<Option<DecodingKey>> {
        {
            let cache = self.jwks_cache.read().await;

            if let Some(jwks_cache) = cache.as_ref() {
                if jwks_cache.fetched_at.elapsed() < self.cache_ttl {
                    return Ok(jwks_cache.keys.get(kid).cloned());
                }
                tracing::info!(
                    elapsed_secs = jwks_cache.fetched_at.elapsed().as_secs(),
                    ttl_secs = self.cache_ttl.as_secs(),
                    "JWKS cache expired, will refresh"
                );
            }
        } // Lock is dropped here

        self.refresh_jwks().await?;

        let cache = self.jwks_cache.read().await;
        Ok(cache.as_ref().and_then(|c| c.keys.get(kid).cloned()))
    }

    /// Refresh JWKS cache from Okta
    async fn refresh_jwks(&self) -> Result<()> {
        tracing::info!(url = %self.jwks_url, "Fetching JWKS from Okta");

        let response: JwksResponse = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .context("Failed to fetch JWKS")?
            .error_for_status()
            .context("JWKS endpoint returned an error status")?
            .json()
            .await
            .context("Failed to parse JWKS")?;

        tracing::info!(key_count = response.keys.len(), "JWKS fetched successfully");

        let mut keys = HashMap::new();
        for jwk in response.keys {
            let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
                .context("Failed to create decoding key")?;
            tracing::debug!(kid = %jwk.kid, "Added key to cache");
            keys.insert(jwk.kid, key);
        }

        let mut cache = self.jwks_cache.write().await;
        *cache = Some(JwksCache {
            keys,
            fetched_at: Instant::now(),
        });

        Ok(())
    }
}
