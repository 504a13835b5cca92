//! Configuration for certkeeper
//!
//! The configuration is a YAML document listing the certificates to manage
//! plus a few global switches:
//!
//! ```yaml
//! standalone: false
//! force_renew: false
//! do_aftercare: true
//! command_timeout_secs: 600
//! certificates:
//!   - name: example.com
//!     aliases: [www.example.com]
//!     aftercare:
//!       - systemctl reload nginx
//! ```
//!
//! Parsing is strict: unknown keys are rejected and every certificate entry
//! needs a `name`. After parsing, [`Config::validate`] applies the semantic
//! checks in [`validate`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod validate;

pub use validate::{ErrorCategory, ValidationError, ValidationResult, ValidationWarning};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/certkeeper/config.yaml";

/// Errors raised while loading configuration
///
/// Any of these aborts the run before a single certificate is looked at.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Root configuration document
///
/// The global switches are optional so that callers can tell "not set"
/// apart from an explicit `false` when layering CLI flags on top.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Validate with certbot's own listener instead of the webroot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standalone: Option<bool>,

    /// Renew regardless of remaining validity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_renew: Option<bool>,

    /// Run aftercare commands after a successful renewal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_aftercare: Option<bool>,

    /// Upper bound for every external command, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,

    /// Managed certificates, in processing order
    #[serde(default)]
    pub certificates: Vec<CertificateConfig>,
}

/// One managed certificate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CertificateConfig {
    /// Primary domain; also names the certificate lineage
    pub name: String,

    /// Extra domains covered by the same certificate
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Shell commands to run after this certificate was renewed
    #[serde(default)]
    pub aftercare: Vec<String>,
}

impl Config {
    /// Load, parse and validate a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Reading configuration file");

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_yaml_str(&content)?;

        info!(
            path = %path.display(),
            certificates = config.certificates.len(),
            "Loaded configuration"
        );

        Ok(config)
    }

    /// Parse and validate a configuration document
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.ensure_valid()?;
        Ok(config)
    }

    /// Run all semantic checks without failing
    pub fn validate(&self) -> ValidationResult {
        let mut result = validate::certs::validate_certificates(self);
        result.merge(validate::lint::lint_config(self));
        result
    }

    /// Log warnings and turn errors into a [`ConfigError`]
    fn ensure_valid(&self) -> Result<(), ConfigError> {
        let result = self.validate();

        for warning in &result.warnings {
            warn!(warning = %warning.message, "Configuration warning");
        }

        if result.is_valid() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(
                result.errors.iter().map(|e| e.to_string()).collect(),
            ))
        }
    }
}
