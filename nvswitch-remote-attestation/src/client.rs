use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, error, instrument, Instrument};

use crate::{
    constants::{
        DEFAULT_TIMEOUT, NVIDIA_OCSP_ALLOW_CERT_HOLD_HEADER, REMOTE_NVSWITCH_VERIFIER_SERVICE_URL,
    },
    errors::{AttestError, Result},
    remote_nvswitch_attestation::AttestRemoteOptions,
    types::RawAttestationOutcome,
    utils::{get_allow_hold_cert, parse_verifier_response},
};

/// Submits attestation payloads to a remote verifier.
#[async_trait]
pub trait VerifierClient: Send + Sync {
    /// Posts `payload` and returns the raw, not yet verified, response.
    async fn submit(&self, payload: &[u8]) -> Result<RawAttestationOutcome>;
}

/// [`VerifierClient`] talking to the NVIDIA Remote Attestation Service over HTTP.
#[derive(Clone, Debug)]
pub struct NrasVerifierClient {
    client: reqwest::Client,
    verifier_url: String,
    headers: HeaderMap,
}

impl NrasVerifierClient {
    /// Creates a client from the remote attestation options.
    ///
    /// # Errors
    ///
    /// * `AttestError::ServiceKeyParseError` - the service key is not a valid header value
    /// * `AttestError::Transport` - the HTTP client cannot be built
    pub fn new(options: &AttestRemoteOptions) -> Result<Self> {
        let verifier_url = options
            .verifier_url
            .clone()
            .unwrap_or_else(|| REMOTE_NVSWITCH_VERIFIER_SERVICE_URL.to_string());
        let allow_hold_cert = options.allow_hold_cert.unwrap_or_else(get_allow_hold_cert);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if allow_hold_cert {
            headers.insert(
                NVIDIA_OCSP_ALLOW_CERT_HOLD_HEADER,
                HeaderValue::from_static("true"),
            );
        }
        if let Some(ref service_key) = options.service_key {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(service_key)?);
        }
        let client = reqwest::Client::builder()
            .timeout(options.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()?;
        Ok(Self {
            client,
            verifier_url,
            headers,
        })
    }

    pub fn verifier_url(&self) -> &str {
        &self.verifier_url
    }
}

#[async_trait]
impl VerifierClient for NrasVerifierClient {
    #[instrument(
        name = "submit",
        skip_all,
        fields(verifier_url = %self.verifier_url)
    )]
    async fn submit(&self, payload: &[u8]) -> Result<RawAttestationOutcome> {
        debug!(
            level = "NvSwitch::attest_remote",
            "Sending attestation request to NRAS url {}", self.verifier_url
        );
        let request_span = tracing::info_span!("nras_request", url = %self.verifier_url);
        let response = self
            .client
            .post(&self.verifier_url)
            .headers(self.headers.clone())
            .body(payload.to_vec())
            .send()
            .instrument(request_span)
            .await
            .map_err(|e| {
                error!(
                    level = "NvSwitch::attest_remote",
                    "Failed to send attestation request: {e}"
                );
                AttestError::Transport(e)
            })?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            error!(
                level = "NvSwitch::attest_remote",
                "Attestation request failed with status code {status}"
            );
            let body = response.text().await?;
            return Err(AttestError::ResponseError { status, body });
        }
        let response_json = response.json::<Value>().await.map_err(|e| {
            error!(
                level = "NvSwitch::attest_remote",
                "Failed to parse response: {e}"
            );
            AttestError::Transport(e)
        })?;
        debug!(
            level = "NvSwitch::attest_remote",
            "Attestation request successful, response: {response_json}"
        );
        parse_verifier_response(&response_json)
    }
}
