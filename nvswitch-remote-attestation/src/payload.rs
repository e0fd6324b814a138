use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::{
    constants::{DEFAULT_CLAIMS_VERSION, EVIDENCE_LIST_KEY, LS10_ARCH},
    errors::Result,
    types::{NvSwitchEvidence, Payload},
};

impl Payload {
    /// Builds the request body from a nonce and an evidence list.
    ///
    /// `evidence_list` may be any serializable value that converts to a list of
    /// `{certificate, evidence}` records, a `{"evidence_list": [...]}` wrapper
    /// around one, or a single record. Anything else is a serialization error.
    pub fn new<E>(nonce: &str, evidence_list: &E) -> Result<Self>
    where
        E: Serialize + ?Sized,
    {
        let evidence_list = evidence_records(serde_json::to_value(evidence_list)?)?;
        Ok(Self {
            nonce: nonce.to_string(),
            arch: LS10_ARCH.to_string(),
            evidence_list,
            claims_version: DEFAULT_CLAIMS_VERSION.to_string(),
        })
    }

    pub fn with_claims_version(mut self, claims_version: impl Into<String>) -> Self {
        self.claims_version = claims_version.into();
        self
    }

    /// Serialized JSON request body.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

fn evidence_records(value: Value) -> Result<Vec<NvSwitchEvidence>> {
    match value {
        Value::Object(mut wrapper) => match wrapper.remove(EVIDENCE_LIST_KEY) {
            Some(evidence_list) => Ok(serde_json::from_value(evidence_list)?),
            None => Ok(vec![serde_json::from_value(Value::Object(wrapper))?]),
        },
        other => Ok(serde_json::from_value(other)?),
    }
}

/// Serializes `nonce` and `evidence_list` into the JSON body expected by the
/// NVSwitch verifier.
#[instrument(level = "debug", skip_all, fields(nonce = %nonce))]
pub fn build_payload<E>(nonce: &str, evidence_list: &E) -> Result<Vec<u8>>
where
    E: Serialize + ?Sized,
{
    Payload::new(nonce, evidence_list)?.to_bytes()
}
