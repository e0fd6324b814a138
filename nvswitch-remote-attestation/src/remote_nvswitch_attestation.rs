use std::{collections::HashMap, time::Duration};

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::{
    client::{NrasVerifierClient, VerifierClient},
    constants::{DEFAULT_CLAIMS_VERSION, DEFAULT_TIMEOUT, MEASUREMENT_SUCCESS},
    errors::{AttestError, Result},
    key_store::{KeyStore, NrasKeyStore},
    token::verify_token,
    types::{
        DecodedAttestationOutcome, DetachedClaims, OverallClaims, Payload, RawAttestationOutcome,
    },
    utils::{create_jwks_url, device_label, nonce_matches},
};

/// Options for remote attestation
#[derive(Debug, Default, Clone)]
pub struct AttestRemoteOptions {
    /// Optional URL of the verification service. If `None`, uses the default URL
    pub verifier_url: Option<String>,
    /// Optional URL of the signing key set. If `None`, derived from the verifier URL
    pub jwks_url: Option<String>,
    /// Optional flag to allow certificate hold status. If `None`, uses the system default
    pub allow_hold_cert: Option<bool>,
    /// Optional claims version. If `None`, uses the system default
    pub claims_version: Option<String>,
    /// Optional service key for authorization
    pub service_key: Option<String>,
    /// Optional request timeout, for both the verifier and the key set requests
    pub timeout: Option<Duration>,
    /// Whether to check token expiry. If `None`, expiry is checked
    pub validate_expiry: Option<bool>,
}

/// Remote attestation of NVSwitch evidence.
///
/// Submits the evidence through a [`VerifierClient`], verifies the returned
/// overall and per-device tokens against a [`KeyStore`], and decides the
/// attestation result.
pub struct RemoteAttestation<C, K> {
    client: C,
    key_store: K,
    claims_version: String,
    validate_expiry: bool,
}

impl RemoteAttestation<NrasVerifierClient, NrasKeyStore> {
    /// Builds an attestation against NRAS from the given options.
    pub fn from_options(options: &AttestRemoteOptions) -> Result<Self> {
        let client = NrasVerifierClient::new(options)?;
        let jwks_url = match options.jwks_url {
            Some(ref jwks_url) => jwks_url.clone(),
            None => create_jwks_url(client.verifier_url())?,
        };
        let key_store = NrasKeyStore::new(jwks_url, options.timeout.unwrap_or(DEFAULT_TIMEOUT))?;
        let mut attestation = Self::new(client, key_store)
            .with_expiry_validation(options.validate_expiry.unwrap_or(true));
        if let Some(ref claims_version) = options.claims_version {
            attestation = attestation.with_claims_version(claims_version.clone());
        }
        Ok(attestation)
    }
}

impl<C, K> RemoteAttestation<C, K>
where
    C: VerifierClient,
    K: KeyStore,
{
    pub fn new(client: C, key_store: K) -> Self {
        Self {
            client,
            key_store,
            claims_version: DEFAULT_CLAIMS_VERSION.to_string(),
            validate_expiry: true,
        }
    }

    pub fn with_claims_version(mut self, claims_version: impl Into<String>) -> Self {
        self.claims_version = claims_version.into();
        self
    }

    pub fn with_expiry_validation(mut self, validate_expiry: bool) -> Self {
        self.validate_expiry = validate_expiry;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn key_store(&self) -> &K {
        &self.key_store
    }

    /// Attests the given evidence.
    ///
    /// Never fails: every error, from serializing the evidence to a bad token
    /// signature, is logged and yields `false`. The second element always holds
    /// the raw tokens received from the verifier, or a placeholder if none were.
    #[instrument(name = "attest", skip_all, fields(nonce = %nonce))]
    pub async fn attest<E>(&self, nonce: &str, evidence_list: &E) -> (bool, RawAttestationOutcome)
    where
        E: Serialize + ?Sized,
    {
        let mut outcome = RawAttestationOutcome::placeholder();
        match self.try_attest(nonce, evidence_list, &mut outcome).await {
            Ok(attestation_passed) => {
                info!(
                    level = "NvSwitch::attest",
                    "NVSwitch attestation result: {attestation_passed}"
                );
                (attestation_passed, outcome)
            }
            Err(e) => {
                error!(level = "NvSwitch::attest", "NVSwitch attestation failed: {e}");
                (false, outcome)
            }
        }
    }

    async fn try_attest<E>(
        &self,
        nonce: &str,
        evidence_list: &E,
        outcome: &mut RawAttestationOutcome,
    ) -> Result<bool>
    where
        E: Serialize + ?Sized,
    {
        let payload =
            Payload::new(nonce, evidence_list)?.with_claims_version(self.claims_version.as_str());
        let body = payload.to_bytes()?;
        *outcome = self.client.submit(&body).await?;
        let decoded = self.verify_outcome(outcome).await?;
        decide(nonce, payload.evidence_list.len(), &decoded)
    }

    /// Verifies every token of `outcome` and returns the decoded claims.
    ///
    /// Detached tokens are verified concurrently; the first failure, if any, is
    /// returned once all of them have completed.
    #[instrument(level = "debug", skip_all)]
    pub async fn verify_outcome(
        &self,
        outcome: &RawAttestationOutcome,
    ) -> Result<DecodedAttestationOutcome> {
        let overall: OverallClaims =
            verify_token(outcome.overall_token(), &self.key_store, self.validate_expiry).await?;

        let verifications = outcome.devices_outcome.iter().map(|(label, token)| async move {
            let claims =
                verify_token::<DetachedClaims, _>(token, &self.key_store, self.validate_expiry)
                    .await;
            (label, claims)
        });
        let mut devices = HashMap::with_capacity(outcome.devices_outcome.len());
        for (label, claims) in join_all(verifications).await {
            let claims = claims.inspect_err(|e| {
                error!(
                    level = "NvSwitch::verify_outcome",
                    "Failed to verify detached token for {label}: {e}"
                );
            })?;
            devices.insert(label.clone(), claims);
        }
        Ok(DecodedAttestationOutcome { overall, devices })
    }
}

/// Derives the attestation result from verified claims.
///
/// Requires at least one device, exactly one detached token per submitted
/// evidence record (labelled `SWITCH-0..SWITCH-{n-1}`), and any echoed nonce
/// to match `nonce`. The result is the overall flag AND every device
/// reporting a successful measurement.
fn decide(
    nonce: &str,
    device_count: usize,
    decoded: &DecodedAttestationOutcome,
) -> Result<bool> {
    let labels_match = device_count > 0
        && decoded.devices.len() == device_count
        && (0..device_count).all(|index| decoded.devices.contains_key(&device_label(index)));
    if !labels_match {
        let mut actual: Vec<String> = decoded.devices.keys().cloned().collect();
        actual.sort();
        return Err(AttestError::DeviceCountMismatch {
            expected: device_count,
            actual,
        });
    }

    if let Some(ref echoed) = decoded.overall.nonce {
        if !nonce_matches(nonce, echoed) {
            return Err(AttestError::NonceMismatch("overall".to_string()));
        }
    }

    let mut devices_passed = true;
    for (label, claims) in &decoded.devices {
        if let Some(ref echoed) = claims.nonce {
            if !nonce_matches(nonce, echoed) {
                return Err(AttestError::NonceMismatch(label.clone()));
            }
        }
        if claims.measurement_result.as_deref() != Some(MEASUREMENT_SUCCESS) {
            warn!(
                level = "NvSwitch::decide",
                "Measurement result for {label} is {:?}", claims.measurement_result
            );
            devices_passed = false;
        }
    }

    if !decoded.overall.overall_attestation_result {
        warn!(
            level = "NvSwitch::decide",
            "Overall attestation result is false"
        );
    }
    Ok(decoded.overall.overall_attestation_result && devices_passed)
}

/// Verifies the attestation of NVSwitch devices against NRAS
///
/// This function sends the NVSwitch evidence to the remote attestation service
/// and processes the verification result.
///
/// # Arguments
///
/// * `nvswitch_evidences` - The evidence records, typically a slice of `NvSwitchEvidence`
/// * `nonce` - A unique string value to prevent replay attacks
/// * `remote_attestation_options` - Verifier URL, timeout and related options
///
/// # Returns
///
/// A tuple with:
/// * A boolean indicating the attestation result (true = passed, false = failed)
/// * The raw tokens returned by the verifier, or a placeholder if the request failed
///
/// # Example
///
/// ```rust,ignore
/// use nvswitch_remote_attestation::{verify_nvswitch_attestation, AttestRemoteOptions};
///
/// async fn example(evidence: Vec<NvSwitchEvidence>, nonce: &str) {
///     let (attestation_passed, tokens) =
///         verify_nvswitch_attestation(&evidence, nonce, AttestRemoteOptions::default()).await;
///     if attestation_passed {
///         println!("NVSwitch attestation successful!");
///     } else {
///         println!("NVSwitch attestation failed: {tokens:?}");
///     }
/// }
/// ```
#[instrument(
    name = "verify_nvswitch_attestation",
    skip_all,
    fields(nonce = %nonce)
)]
pub async fn verify_nvswitch_attestation<E>(
    nvswitch_evidences: &E,
    nonce: &str,
    remote_attestation_options: AttestRemoteOptions,
) -> (bool, RawAttestationOutcome)
where
    E: Serialize + ?Sized,
{
    match RemoteAttestation::from_options(&remote_attestation_options) {
        Ok(attestation) => attestation.attest(nonce, nvswitch_evidences).await,
        Err(e) => {
            error!(
                level = "NvSwitch::attest_remote",
                "Failed to set up remote attestation: {e}"
            );
            (false, RawAttestationOutcome::placeholder())
        }
    }
}
