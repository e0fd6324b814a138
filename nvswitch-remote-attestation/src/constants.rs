use std::time::Duration;

/// Default URL for the remote NVSwitch verifier service (NRAS).
pub const REMOTE_NVSWITCH_VERIFIER_SERVICE_URL: &str =
    "https://nras.attestation.nvidia.com/v3/attest/switch";

/// Path, relative to the verifier host, where the signing key set is published.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Environment variable key for certificate hold status.
/// This key is used to check if certificates should be allowed to be held.
pub const NV_ALLOW_HOLD_CERT_KEY: &str = "NV_ALLOW_HOLD_CERT";

/// Header key for allowing certificate holds in NVIDIA OCSP requests.
///
/// This header is used to indicate that the OCSP responder should allow
/// certificate holds when checking the status of a certificate. Kept lowercase
/// so it can be used directly as a static `HeaderName`.
pub const NVIDIA_OCSP_ALLOW_CERT_HOLD_HEADER: &str = "x-nvidia-ocsp-allow-cert-hold";

/// LS10 architecture for NVSwitch remote attestation requests.
pub const LS10_ARCH: &str = "LS10";

/// Default claims version requested from the verifier.
pub const DEFAULT_CLAIMS_VERSION: &str = "2.0";

/// Default timeout for remote attestation requests.
///
/// Applies both to the evidence submission and to the key set fetch.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Evidence list key for remote attestation requests.
pub const EVIDENCE_LIST_KEY: &str = "evidence_list";

/// Type tag of the overall token entry in the verifier response, `["JWT", <token>]`.
pub const OVERALL_TOKEN_TYPE: &str = "JWT";

/// Value of the `measres` claim for a device whose measurements matched.
pub const MEASUREMENT_SUCCESS: &str = "success";

/// Prefix of the per-device labels in the detached token map (`SWITCH-0`, `SWITCH-1`, ...).
pub const DEVICE_LABEL_PREFIX: &str = "SWITCH-";
