use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use once_cell::sync::Lazy;
use serde_json::Value;
use url::Url;

use crate::{
    constants::{DEVICE_LABEL_PREFIX, JWKS_PATH, NV_ALLOW_HOLD_CERT_KEY, OVERALL_TOKEN_TYPE},
    errors::{AttestError, Result},
    types::RawAttestationOutcome,
};

/// Global state to control certificate hold status.
/// This is initialized as `None` and can be set at runtime.
static CERT_HOLD_STATUS: Lazy<Mutex<Option<bool>>> = Lazy::new(|| Mutex::new(None));

/// Sets whether certificates should be allowed to be held.
///
/// This function updates the global certificate hold status.
pub fn set_allow_hold_cert(value: bool) {
    let mut status = CERT_HOLD_STATUS
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    *status = Some(value);
}

/// Determines whether certificates should be allowed to be held.
///
/// This function first checks the global certificate hold status.
/// If not set, it falls back to checking the `NV_ALLOW_HOLD_CERT` environment variable.
pub fn get_allow_hold_cert() -> bool {
    let status = *CERT_HOLD_STATUS
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    status.unwrap_or_else(|| std::env::var(NV_ALLOW_HOLD_CERT_KEY).unwrap_or_default() == "true")
}

/// Generate the JWKS URL from the verifier URL
///
/// The key set lives at [`JWKS_PATH`] on the verifier's host; any path of the
/// verifier URL is dropped.
#[tracing::instrument(level = "debug")]
pub fn create_jwks_url(verifier_url: &str) -> Result<String> {
    let parsed_url = Url::parse(verifier_url)?;
    let scheme = parsed_url.scheme();
    let host = parsed_url.host_str().unwrap_or("");
    let port = parsed_url
        .port()
        .map(|p| format!(":{p}"))
        .unwrap_or_default();
    Ok(format!("{scheme}://{host}{port}{JWKS_PATH}"))
}

/// Parses the verifier response into a [`RawAttestationOutcome`].
///
/// The expected shape is `[["JWT", <overall token>], {<label>: <detached token>, ...}]`.
/// Anything else is rejected rather than guessed at.
#[tracing::instrument(level = "debug", skip(response))]
pub fn parse_verifier_response(response: &Value) -> Result<RawAttestationOutcome> {
    let parts = response
        .as_array()
        .ok_or_else(|| malformed("response is not an array"))?;

    // 1. The overall entry, ["JWT", <token>]
    let overall_entry = parts
        .first()
        .and_then(|entry| entry.as_array())
        .ok_or_else(|| malformed("first element is not an array"))?;
    let token_type = overall_entry
        .first()
        .and_then(|t| t.as_str())
        .ok_or_else(|| malformed("overall entry has no token type"))?;
    if token_type != OVERALL_TOKEN_TYPE {
        return Err(malformed(&format!(
            "unexpected overall token type `{token_type}`"
        )));
    }
    let overall_token = overall_entry
        .get(1)
        .and_then(|token| token.as_str())
        .ok_or_else(|| malformed("second element of the overall entry is not a string"))?;

    // 2. The detached entries, {"SWITCH-0": <token>, ...}
    let detached = parts
        .get(1)
        .and_then(|entry| entry.as_object())
        .ok_or_else(|| malformed("second element is not an object"))?;
    let devices_outcome = detached
        .iter()
        .map(|(label, token)| {
            token
                .as_str()
                .map(|token| (label.clone(), token.to_string()))
                .ok_or_else(|| malformed(&format!("detached token for {label} is not a string")))
        })
        .collect::<Result<HashMap<_, _>>>()?;

    Ok(RawAttestationOutcome {
        overall_outcome: (token_type.to_string(), overall_token.to_string()),
        devices_outcome,
    })
}

/// Device label of the `index`-th submitted evidence record.
pub fn device_label(index: usize) -> String {
    format!("{DEVICE_LABEL_PREFIX}{index}")
}

/// Compares a nonce echoed in the claims against the one that was sent.
///
/// Exact match, except that two hex strings may differ in letter case.
pub(crate) fn nonce_matches(sent: &str, echoed: &str) -> bool {
    if sent == echoed {
        return true;
    }
    is_hex(sent) && is_hex(echoed) && sent.eq_ignore_ascii_case(echoed)
}

fn is_hex(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_hexdigit())
}

fn malformed(reason: &str) -> AttestError {
    AttestError::MalformedResponse(reason.to_string())
}
