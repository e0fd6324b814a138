use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::{
    errors::{AttestError, Result},
    key_store::KeyStore,
};

/// Verifies an NRAS token and returns its claims.
///
/// This function performs the following steps:
/// 1. Reads the token header, without trusting it, to get the `alg` and `kid`
/// 2. Rejects anything not signed with ES384
/// 3. Resolves the public key for `kid` through `key_store`
/// 4. Verifies the signature (and, if `validate_expiry` is set, `exp`/`nbf`)
/// 5. Decodes the claims
///
/// The claims are only returned once the signature has been verified.
///
/// # Errors
///
/// * `AttestError::Jwt` - malformed token, bad signature or expired token
/// * `AttestError::UnsupportedAlgorithm` - the header names an algorithm other than ES384
/// * `AttestError::MissingKid` - the header carries no key identifier
/// * `AttestError::KeyNotFound` - no key in the key set matches the identifier
#[instrument(level = "debug", name = "verify_token", skip_all)]
pub async fn verify_token<C, K>(token: &str, key_store: &K, validate_expiry: bool) -> Result<C>
where
    C: DeserializeOwned,
    K: KeyStore + ?Sized,
{
    let header = decode_header(token)?;
    if header.alg != Algorithm::ES384 {
        return Err(AttestError::UnsupportedAlgorithm(header.alg));
    }
    let kid = header
        .kid
        .filter(|kid| !kid.is_empty())
        .ok_or(AttestError::MissingKid)?;
    debug!(level = "NvSwitch::verify_token", kid = %kid, "Resolving signing key");
    let decoding_key = key_store.resolve(&kid).await?;

    let token_data = decode::<C>(token, &decoding_key, &validation(validate_expiry))?;
    Ok(token_data.claims)
}

fn validation(validate_expiry: bool) -> Validation {
    let mut validation = Validation::new(Algorithm::ES384);
    // NRAS tokens carry no audience meant for us
    validation.validate_aud = false;
    if !validate_expiry {
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims.clear();
    }
    validation
}
