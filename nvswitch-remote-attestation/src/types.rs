use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::OVERALL_TOKEN_TYPE;

/// Represents attestation evidence for an NVSwitch device
///
/// This structure contains the certificate chain and attestation evidence
/// required to verify the authenticity and integrity of an NVSwitch device.
/// One record is produced per physical switch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NvSwitchEvidence {
    /// The certificate chain for the NVSwitch device
    pub certificate: String,

    /// The remote attestation evidence for the NVSwitch device, hex encoded
    pub evidence: String,
}

/// Request body submitted to the remote verifier.
#[derive(Debug, Clone, Serialize)]
pub struct Payload {
    pub nonce: String,
    pub arch: String,
    pub evidence_list: Vec<NvSwitchEvidence>,
    pub claims_version: String,
}

/// Raw two-part response of the remote verifier.
///
/// On the wire this is `[["JWT", <overall token>], {"SWITCH-0": <detached token>, ...}]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAttestationOutcome {
    /// The `["JWT", "<jwt_token>"]` entry of the response
    pub overall_outcome: (String, String),
    /// The `{"SWITCH-0": "<jwt_token>"}` entries of the response
    pub devices_outcome: HashMap<String, String>,
}

impl RawAttestationOutcome {
    /// Diagnostic value handed back when no response could be obtained.
    pub fn placeholder() -> Self {
        Self {
            overall_outcome: (OVERALL_TOKEN_TYPE.to_string(), String::new()),
            devices_outcome: HashMap::new(),
        }
    }

    /// The overall token string.
    pub fn overall_token(&self) -> &str {
        &self.overall_outcome.1
    }
}

impl Default for RawAttestationOutcome {
    fn default() -> Self {
        Self::placeholder()
    }
}

/// Claims of the overall token issued by NRAS.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverallClaims {
    /// Boolean indicating the overall attestation result
    #[serde(rename = "x-nvidia-overall-att-result")]
    pub overall_attestation_result: bool,

    /// Nonce echoed back by the verifier
    #[serde(rename = "eat_nonce", default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Map containing any additional claims present in the token
    #[serde(flatten)]
    pub additional_claims: HashMap<String, Value>,
}

/// Claims of a per-device (detached) token issued by NRAS.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetachedClaims {
    /// Result of comparing the device measurements against reference values
    #[serde(rename = "measres", default, skip_serializing_if = "Option::is_none")]
    pub measurement_result: Option<String>,

    /// Nonce echoed back by the verifier
    #[serde(rename = "eat_nonce", default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Map containing any additional claims present in the token
    #[serde(flatten)]
    pub additional_claims: HashMap<String, Value>,
}

/// Verified and decoded contents of a [`RawAttestationOutcome`].
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedAttestationOutcome {
    pub overall: OverallClaims,
    /// Keyed by device label, e.g. `SWITCH-0`
    pub devices: HashMap<String, DetachedClaims>,
}
