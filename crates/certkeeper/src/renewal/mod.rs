//! Renewal decision and orchestration
//!
//! [`decision`] holds the pure renew-or-skip rule; [`engine`] applies it to
//! a certificate and drives the firewall and issuer around an attempt.

mod decision;
mod engine;

pub use decision::{needs_renewal, RenewalDecision, RenewalMode, RENEWAL_THRESHOLD_DAYS};
pub use engine::{RenewalEngine, RenewalFailure, RenewalOutcome};
