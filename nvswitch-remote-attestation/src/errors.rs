use thiserror::Error;

pub type Result<T> = std::result::Result<T, AttestError>;

#[derive(Debug, Error)]
pub enum AttestError {
    #[error("Failed to collect evidence: {0}")]
    EvidenceCollection(String),
    #[error("Failed to serialize attestation payload: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to reach the attestation service")]
    Transport(#[from] reqwest::Error),
    #[error("Response error ({status}): {body}")]
    ResponseError { status: u16, body: String },
    #[error("Malformed verifier response: {0}")]
    MalformedResponse(String),
    #[error("Failed to parse URL")]
    UrlParseError(#[from] url::ParseError),
    #[error("Failed to parse service key")]
    ServiceKeyParseError(#[from] reqwest::header::InvalidHeaderValue),
    #[error("Kid not found in token header")]
    MissingKid,
    #[error("No key matching kid `{0}` in the key set")]
    KeyNotFound(String),
    #[error("Failed to decode certificate")]
    CertificateDecode(#[from] base64::DecodeError),
    #[error("Failed to parse certificate")]
    CertificateParse(#[from] x509_parser::asn1_rs::Err<x509_parser::prelude::error::X509Error>),
    #[error("Invalid JWT token")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("Unsupported token algorithm: {0:?}")]
    UnsupportedAlgorithm(jsonwebtoken::Algorithm),
    #[error("Nonce mismatch in {0} claims")]
    NonceMismatch(String),
    #[error("Expected detached tokens for {expected} devices, got {actual:?}")]
    DeviceCountMismatch { expected: usize, actual: Vec<String> },
}
