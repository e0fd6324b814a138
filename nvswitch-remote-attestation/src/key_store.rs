use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use jsonwebtoken::DecodingKey;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, Instrument};
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::errors::{AttestError, Result};

/// Resolves the public key that signed a token, by key identifier.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Returns the decoding key for `kid`, or [`AttestError::KeyNotFound`].
    async fn resolve(&self, kid: &str) -> Result<DecodingKey>;
}

/// One entry of a JWKS document. Only the fields needed to resolve a key are kept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySetEntry {
    #[serde(default)]
    pub kid: String,
    /// Base64 (standard alphabet) DER certificates, leaf first
    #[serde(default)]
    pub x5c: Vec<String>,
}

/// Snapshot of the verifier's signing key set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet {
    pub keys: Vec<KeySetEntry>,
}

impl KeySet {
    /// Finds the entry whose `kid` matches exactly.
    pub fn find(&self, kid: &str) -> Option<&KeySetEntry> {
        self.keys.iter().find(|entry| entry.kid == kid)
    }

    /// Public key of the first certificate in the chain of the entry matching `kid`.
    #[instrument(level = "debug", skip(self))]
    pub fn decoding_key(&self, kid: &str) -> Result<DecodingKey> {
        let entry = self
            .find(kid)
            .ok_or_else(|| AttestError::KeyNotFound(kid.to_string()))?;
        let cert_b64 = entry
            .x5c
            .first()
            .ok_or_else(|| AttestError::KeyNotFound(kid.to_string()))?;
        let cert_der = STANDARD.decode(cert_b64)?;
        decoding_key_from_certificate(&cert_der)
    }
}

#[async_trait]
impl KeyStore for KeySet {
    async fn resolve(&self, kid: &str) -> Result<DecodingKey> {
        self.decoding_key(kid)
    }
}

/// Extracts an EC public key from a DER-encoded X.509 certificate.
pub fn decoding_key_from_certificate(cert_der: &[u8]) -> Result<DecodingKey> {
    let (_, cert) = X509Certificate::from_der(cert_der)?;
    // The SPKI bit string holds the SEC1 encoded point, which is what the verifier expects
    let public_key_data = cert.public_key().subject_public_key.data.as_ref();
    Ok(DecodingKey::from_ec_der(public_key_data))
}

/// Key store backed by the verifier's JWKS endpoint.
///
/// Every [`KeyStore::resolve`] call fetches the key set again. Use
/// [`NrasKeyStore::snapshot`] to fetch once and verify several tokens against
/// the same key set.
#[derive(Clone, Debug)]
pub struct NrasKeyStore {
    client: Client,
    jwks_url: String,
}

impl NrasKeyStore {
    pub fn new(jwks_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            jwks_url: jwks_url.into(),
        })
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Fetches the current key set.
    #[instrument(level = "debug", skip(self), fields(jwks_url = %self.jwks_url))]
    pub async fn snapshot(&self) -> Result<KeySet> {
        let request_span = tracing::debug_span!("jwks_request", url = %self.jwks_url);
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .instrument(request_span)
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            error!(
                level = "NvSwitch::jwks",
                "JWKS request failed with status code {status}"
            );
            let body = response.text().await?;
            return Err(AttestError::ResponseError { status, body });
        }
        let key_set: KeySet = response.json().await?;
        debug!(
            level = "NvSwitch::jwks",
            "Fetched {} keys from {}",
            key_set.keys.len(),
            self.jwks_url
        );
        Ok(key_set)
    }
}

#[async_trait]
impl KeyStore for NrasKeyStore {
    async fn resolve(&self, kid: &str) -> Result<DecodingKey> {
        self.snapshot().await?.decoding_key(kid)
    }
}
