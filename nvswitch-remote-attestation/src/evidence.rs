use tracing::{debug, error, instrument};

use crate::{errors::Result, types::NvSwitchEvidence};

/// Driver-admin collaborator that produces NVSwitch evidence.
///
/// Implementations talk to the switch driver (e.g. through NSCQ) and may fail
/// for any hardware, driver or permission reason.
pub trait EvidenceSource {
    /// Collects one evidence record per switch, bound to `nonce`.
    fn collect_evidence(&self, nonce: &str, ppcie_mode: bool) -> Result<Vec<NvSwitchEvidence>>;
}

impl<F> EvidenceSource for F
where
    F: Fn(&str, bool) -> Result<Vec<NvSwitchEvidence>>,
{
    fn collect_evidence(&self, nonce: &str, ppcie_mode: bool) -> Result<Vec<NvSwitchEvidence>> {
        self(nonce, ppcie_mode)
    }
}

/// Collects attestation evidence for all NVSwitches known to `source`.
///
/// Collection is all-or-nothing: if the driver call fails the error is logged
/// and an empty list is returned, never a partial one.
#[instrument(name = "get_evidence", skip(source, nonce), fields(nonce = %nonce))]
pub fn get_evidence<S>(source: &S, nonce: &str, ppcie_mode: bool) -> Vec<NvSwitchEvidence>
where
    S: EvidenceSource + ?Sized,
{
    match source.collect_evidence(nonce, ppcie_mode) {
        Ok(evidence_list) => {
            debug!(
                level = "NvSwitch::get_evidence",
                "Collected evidence for {} switches",
                evidence_list.len()
            );
            evidence_list
        }
        Err(e) => {
            error!(
                level = "NvSwitch::get_evidence",
                "Failed to collect evidence: {e}"
            );
            Vec::new()
        }
    }
}
