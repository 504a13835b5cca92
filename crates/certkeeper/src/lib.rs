//! certkeeper library
//!
//! Keeps a set of TLS certificates renewed with certbot.
//!
//! For every configured certificate a run:
//!
//! - inspects the current certificate and decides whether renewal is due
//!   (forced, missing, or 21 days or less left)
//! - opens the validation port in the firewall for standalone validation
//! - runs certbot for the certificate's domains
//! - closes the validation port again, whatever certbot reported
//! - runs the certificate's aftercare commands after a successful renewal
//!
//! Certificates are handled one after another. A failure is recorded for
//! the certificate it happened to and the run continues.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use certkeeper::{CertManager, Collaborators, RunOptions};
//! use certkeeper_common::SystemExecutor;
//! use certkeeper_config::Config;
//!
//! let config = Config::from_file("/etc/certkeeper/config.yaml")?;
//! let executor = Arc::new(SystemExecutor::default());
//! let manager = CertManager::new(&config, RunOptions::default(), Collaborators::system(executor));
//! let report = manager.run().await;
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

pub mod aftercare;
pub mod errors;
pub mod firewall;
pub mod inspect;
pub mod issuance;
pub mod manager;
pub mod record;
pub mod renewal;
pub mod report;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Public API Re-exports
// ============================================================================

// Errors
pub use errors::{AftercareError, FirewallAction, FirewallError, InspectionError, IssuanceError};

// External capabilities
pub use firewall::{FirewallController, IptablesFirewall};
pub use inspect::{ExpiryInspector, X509ExpiryInspector};
pub use issuance::{CertbotIssuer, IssuanceInvoker, IssuanceRequest, IssuerSettings};

// Renewal
pub use renewal::{
    needs_renewal, RenewalDecision, RenewalEngine, RenewalFailure, RenewalMode, RenewalOutcome,
    RENEWAL_THRESHOLD_DAYS,
};

// Orchestration
pub use aftercare::AftercareRunner;
pub use manager::{CertManager, Collaborators, EffectiveFlags, RunOptions};
pub use record::CertificateRecord;
pub use report::{AftercareStatus, CertificateReport, RunReport};
