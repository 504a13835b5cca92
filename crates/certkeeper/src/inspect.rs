//! Certificate expiry inspection
//!
//! Reads the certificate certbot keeps for a lineage and reports how many
//! whole days it has left.
//!
//! ```text
//! /etc/letsencrypt/live/
//! └── example.com/
//!     └── cert.pem      # Leaf certificate, inspected here
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use certkeeper_common::CertName;
use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::errors::InspectionError;

/// Where certbot keeps the current certificate of every lineage
pub const DEFAULT_LIVE_DIR: &str = "/etc/letsencrypt/live";

const SECONDS_PER_DAY: i64 = 86_400;

/// Reports the remaining validity of a certificate.
pub trait ExpiryInspector: Send + Sync {
    /// Whole days until the certificate expires
    ///
    /// `Ok(None)` means no certificate exists yet. Negative values mean it
    /// has already expired.
    fn days_remaining(&self, name: &CertName) -> Result<Option<i64>, InspectionError>;
}

/// Inspects `cert.pem` files below certbot's live directory
#[derive(Debug, Clone)]
pub struct X509ExpiryInspector {
    live_dir: PathBuf,
}

impl X509ExpiryInspector {
    pub fn new(live_dir: impl Into<PathBuf>) -> Self {
        Self {
            live_dir: live_dir.into(),
        }
    }

    /// Path of the certificate for a lineage
    pub fn cert_path(&self, name: &CertName) -> PathBuf {
        self.live_dir.join(name.as_str()).join("cert.pem")
    }

    /// Days remaining relative to `now`
    pub fn days_remaining_at(
        &self,
        name: &CertName,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, InspectionError> {
        let cert_path = self.cert_path(name);

        let Some(not_after) = read_not_after(&cert_path)? else {
            debug!(
                certificate = %name,
                path = %cert_path.display(),
                "No existing certificate found"
            );
            return Ok(None);
        };

        let days = days_between(now, not_after);
        trace!(
            certificate = %name,
            expires = %not_after,
            days_remaining = days,
            "Inspected certificate expiry"
        );
        Ok(Some(days))
    }
}

impl Default for X509ExpiryInspector {
    fn default() -> Self {
        Self::new(DEFAULT_LIVE_DIR)
    }
}

impl ExpiryInspector for X509ExpiryInspector {
    fn days_remaining(&self, name: &CertName) -> Result<Option<i64>, InspectionError> {
        self.days_remaining_at(name, Utc::now())
    }
}

/// Whole days from `now` to `expires`, rounded towards negative infinity
///
/// A certificate that expired an hour ago has -1 days left, not 0.
pub fn days_between(now: DateTime<Utc>, expires: DateTime<Utc>) -> i64 {
    (expires - now).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Read the `notAfter` of the first certificate in a PEM file
///
/// Returns `Ok(None)` if the file does not exist.
fn read_not_after(cert_path: &Path) -> Result<Option<DateTime<Utc>>, InspectionError> {
    let cert_pem = match fs::read(cert_path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(InspectionError::Read {
                path: cert_path.to_path_buf(),
                source,
            })
        }
    };

    let pem = pem::parse(&cert_pem).map_err(|source| InspectionError::Pem {
        path: cert_path.to_path_buf(),
        source,
    })?;

    let (_, cert) = x509_parser::parse_x509_certificate(pem.contents()).map_err(|e| {
        InspectionError::X509 {
            path: cert_path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    let timestamp = cert.validity().not_after.timestamp();
    let not_after =
        DateTime::<Utc>::from_timestamp(timestamp, 0).ok_or_else(|| InspectionError::X509 {
            path: cert_path.to_path_buf(),
            message: format!("notAfter out of range: {}", timestamp),
        })?;

    Ok(Some(not_after))
}
