//! Results of a renewal run.

use certkeeper_common::CertName;

use crate::errors::{AftercareError, InspectionError};
use crate::renewal::RenewalOutcome;

/// What happened to a certificate's aftercare commands
#[derive(Debug)]
pub enum AftercareStatus {
    /// The certificate was not renewed
    NotRequested,
    /// Renewed, but aftercare is switched off for this run
    Disabled,
    /// All commands succeeded
    Completed { commands_run: usize },
    /// A command failed and the rest were skipped
    Failed(AftercareError),
}

/// Result for one certificate
#[derive(Debug)]
pub struct CertificateReport {
    pub name: CertName,
    /// `Err` if the existing certificate could not be inspected
    pub outcome: Result<RenewalOutcome, InspectionError>,
    pub aftercare: AftercareStatus,
}

impl CertificateReport {
    /// Anything went wrong for this certificate
    ///
    /// An aftercare failure counts even though the certificate itself was
    /// renewed.
    pub fn is_failure(&self) -> bool {
        match &self.outcome {
            Err(_) => true,
            Ok(outcome) if outcome.is_failed() => true,
            Ok(_) => matches!(self.aftercare, AftercareStatus::Failed(_)),
        }
    }
}

/// Results of one run, in processing order
#[derive(Debug, Default)]
pub struct RunReport {
    pub certificates: Vec<CertificateReport>,
}

impl RunReport {
    pub fn new(certificates: Vec<CertificateReport>) -> Self {
        Self { certificates }
    }

    pub fn get(&self, name: &str) -> Option<&CertificateReport> {
        self.certificates.iter().find(|c| c.name.as_str() == name)
    }

    pub fn has_failures(&self) -> bool {
        self.certificates.iter().any(CertificateReport::is_failure)
    }

    pub fn renewed(&self) -> usize {
        self.count(|c| matches!(c.outcome, Ok(RenewalOutcome::RenewedOk)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|c| matches!(c.outcome, Ok(RenewalOutcome::Skipped { .. })))
    }

    pub fn failed(&self) -> usize {
        self.count(CertificateReport::is_failure)
    }

    fn count(&self, predicate: impl Fn(&CertificateReport) -> bool) -> usize {
        self.certificates.iter().filter(|c| predicate(c)).count()
    }
}
