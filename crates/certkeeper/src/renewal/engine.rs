//! Per-certificate renewal state machine
//!
//! ```text
//! Evaluating ──► Skipped
//!     │
//!     └────────► Renewing ──► RenewedOk
//!                    │
//!                    └──────► RenewFailed
//! ```
//!
//! In standalone mode the validation port is opened before certbot runs
//! and closed once it has finished, whatever the result. A failure to open
//! aborts the attempt before issuance. A failure to close is logged and
//! never changes the outcome.

use std::sync::Arc;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::decision::{RenewalDecision, RenewalMode};
use crate::errors::{FirewallError, InspectionError, IssuanceError};
use crate::firewall::FirewallController;
use crate::inspect::ExpiryInspector;
use crate::issuance::{IssuanceInvoker, IssuanceRequest};
use crate::record::CertificateRecord;

/// Why a renewal attempt failed
#[derive(Debug, Error)]
pub enum RenewalFailure {
    /// The validation port could not be opened; certbot was not run
    #[error(transparent)]
    Firewall(#[from] FirewallError),

    /// certbot ran and failed, could not start, or timed out
    #[error(transparent)]
    Issuance(#[from] IssuanceError),
}

impl RenewalFailure {
    /// Stage name for logs and reports
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Firewall(_) => "firewall-open",
            Self::Issuance(_) => "issuance",
        }
    }
}

/// Terminal state of one certificate
#[derive(Debug)]
pub enum RenewalOutcome {
    /// Enough validity left; nothing was executed
    Skipped { days_remaining: i64 },
    /// certbot reported success
    RenewedOk,
    /// The attempt failed at the recorded stage
    RenewFailed(RenewalFailure),
}

impl RenewalOutcome {
    pub fn is_renewed(&self) -> bool {
        matches!(self, Self::RenewedOk)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::RenewFailed(_))
    }
}

/// Decides and carries out renewal for one certificate at a time
pub struct RenewalEngine {
    inspector: Arc<dyn ExpiryInspector>,
    firewall: Arc<dyn FirewallController>,
    issuer: Arc<dyn IssuanceInvoker>,
    force: bool,
    mode: RenewalMode,
}

impl RenewalEngine {
    /// Create an engine that renews only when due, using webroot validation
    pub fn new(
        inspector: Arc<dyn ExpiryInspector>,
        firewall: Arc<dyn FirewallController>,
        issuer: Arc<dyn IssuanceInvoker>,
    ) -> Self {
        Self {
            inspector,
            firewall,
            issuer,
            force: false,
            mode: RenewalMode::Webroot,
        }
    }

    /// Renew regardless of remaining validity
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_mode(mut self, mode: RenewalMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> RenewalMode {
        self.mode
    }

    pub fn is_forced(&self) -> bool {
        self.force
    }

    /// Decide whether a certificate is due
    ///
    /// The inspector is consulted even when renewal is forced, so an
    /// unreadable certificate is always reported.
    pub fn evaluate(&self, record: &CertificateRecord) -> Result<RenewalDecision, InspectionError> {
        let days_remaining = self.inspector.days_remaining(record.name())?;
        let decision = RenewalDecision::new(self.force, days_remaining, self.mode);

        debug!(
            certificate = %record.name(),
            days_remaining = ?decision.days_remaining,
            forced = decision.forced,
            should_renew = decision.should_renew,
            mode = %decision.mode,
            "Evaluated certificate"
        );

        Ok(decision)
    }

    /// Evaluate a certificate and renew it if due
    ///
    /// Only inspection errors are returned as `Err`, and only when renewal
    /// is not forced. A forced renewal goes ahead over an unreadable
    /// certificate. Everything that goes wrong after the decision is part
    /// of the outcome.
    pub async fn process(&self, record: &CertificateRecord) -> Result<RenewalOutcome, InspectionError> {
        let decision = match self.evaluate(record) {
            Ok(decision) => decision,
            Err(e) if self.force => {
                warn!(
                    certificate = %record.name(),
                    stage = "inspection",
                    error = %e,
                    "Could not inspect certificate, renewing anyway because renewal is forced"
                );
                RenewalDecision::new(true, None, self.mode)
            }
            Err(e) => return Err(e),
        };

        if let RenewalDecision {
            should_renew: false,
            days_remaining: Some(days_remaining),
            ..
        } = decision
        {
            info!(
                certificate = %record.name(),
                days_remaining,
                "Certificate is still valid, skipping"
            );
            return Ok(RenewalOutcome::Skipped { days_remaining });
        }

        info!(
            certificate = %record.name(),
            days_remaining = ?decision.days_remaining,
            reason = decision.reason(),
            "Certificate needs renewal"
        );

        Ok(self.renew(record, decision.mode).await)
    }

    /// Run one renewal attempt
    pub async fn renew(&self, record: &CertificateRecord, mode: RenewalMode) -> RenewalOutcome {
        let start = Instant::now();

        if mode.needs_firewall() {
            if let Err(e) = self.firewall.open().await {
                error!(
                    certificate = %record.name(),
                    stage = "firewall-open",
                    error = %e,
                    "Could not open validation port, not attempting issuance"
                );
                return RenewalOutcome::RenewFailed(e.into());
            }
        }

        let request = IssuanceRequest::new(record, mode);
        let result = self.issuer.issue(&request).await;

        if mode.needs_firewall() {
            if let Err(e) = self.firewall.close().await {
                if result.is_ok() {
                    warn!(
                        certificate = %record.name(),
                        stage = "firewall-close",
                        error = %e,
                        "Certificate renewed but the validation port could not be closed"
                    );
                } else {
                    warn!(
                        certificate = %record.name(),
                        stage = "firewall-close",
                        error = %e,
                        "Validation port could not be closed after failed issuance"
                    );
                }
            }
        }

        match result {
            Ok(()) => {
                info!(
                    certificate = %record.name(),
                    elapsed_secs = start.elapsed().as_secs(),
                    "Certificate renewed successfully"
                );
                RenewalOutcome::RenewedOk
            }
            Err(e) => {
                error!(
                    certificate = %record.name(),
                    stage = "issuance",
                    error = %e,
                    "Certificate renewal failed"
                );
                RenewalOutcome::RenewFailed(e.into())
            }
        }
    }
}

impl std::fmt::Debug for RenewalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenewalEngine")
            .field("force", &self.force)
            .field("mode", &self.mode)
            .finish()
    }
}
