//! Per-certificate error types.
//!
//! None of these abort a run. The manager records them against the
//! certificate they occurred for and moves on to the next one.
//! Configuration problems are [`certkeeper_config::ConfigError`] and are
//! fatal before any certificate is processed.

use std::fmt;
use std::path::PathBuf;

use certkeeper_common::{CertName, CommandError};
use thiserror::Error;

/// The expiry of an existing certificate could not be determined
///
/// Distinct from "no certificate yet", which is `Ok(None)` from the
/// inspector and means first issuance.
#[derive(Debug, Error)]
pub enum InspectionError {
    #[error("failed to read certificate {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode PEM in {}: {source}", .path.display())]
    Pem {
        path: PathBuf,
        #[source]
        source: pem::PemError,
    },

    #[error("invalid X.509 certificate in {}: {message}", .path.display())]
    X509 { path: PathBuf, message: String },
}

/// Which firewall transition was attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirewallAction {
    Open,
    Close,
}

impl fmt::Display for FirewallAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Close => write!(f, "close"),
        }
    }
}

/// Opening or closing the validation port failed
#[derive(Debug, Error)]
#[error("failed to {action} validation port: {source}")]
pub struct FirewallError {
    pub action: FirewallAction,
    #[source]
    pub source: CommandError,
}

/// The issuer did not produce a certificate
#[derive(Debug, Error)]
#[error("issuance for '{name}' failed: {source}")]
pub struct IssuanceError {
    pub name: CertName,
    #[source]
    pub source: CommandError,
}

/// An aftercare command failed; later commands were not run
#[derive(Debug, Error)]
#[error("aftercare command '{command}' failed: {source}")]
pub struct AftercareError {
    pub command: String,
    #[source]
    pub source: CommandError,
}
