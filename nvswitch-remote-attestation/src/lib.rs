//! Remote attestation for NVIDIA NVSwitches
//!
//! This crate collects NVSwitch evidence through a driver collaborator, sends
//! it to the NVIDIA Remote Attestation Service, verifies the ES384 tokens it
//! returns against the service's published key set, and decides whether the
//! switches can be trusted.

pub mod client;
pub mod constants;
pub mod errors;
pub mod evidence;
pub mod key_store;
pub mod payload;
pub mod remote_nvswitch_attestation;
pub mod token;
pub mod types;
pub mod utils;

pub use client::{NrasVerifierClient, VerifierClient};
pub use errors::{AttestError, Result};
pub use evidence::{get_evidence, EvidenceSource};
pub use key_store::{KeySet, KeySetEntry, KeyStore, NrasKeyStore};
pub use payload::build_payload;
pub use remote_nvswitch_attestation::{
    verify_nvswitch_attestation, AttestRemoteOptions, RemoteAttestation,
};
pub use token::verify_token;
pub use types::{
    DecodedAttestationOutcome, DetachedClaims, NvSwitchEvidence, OverallClaims, Payload,
    RawAttestationOutcome,
};
