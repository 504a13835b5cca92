//! Certificate entry validation
//!
//! Rejects entries that would produce a broken issuer invocation or
//! aftercare run.

use super::{ErrorCategory, ValidationError, ValidationResult};
use crate::Config;

/// Validate certificate entries and global settings
pub fn validate_certificates(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    if config.command_timeout_secs == Some(0) {
        result.add_error(ValidationError::new(
            ErrorCategory::Runtime,
            "command_timeout_secs must be greater than zero",
        ));
    }

    for (index, cert) in config.certificates.iter().enumerate() {
        // Entries are numbered from 1 in messages
        let position = index + 1;

        if cert.name.trim().is_empty() {
            result.add_error(ValidationError::new(
                ErrorCategory::Certificate,
                format!("certificate #{} has an empty name", position),
            ));
            continue;
        }

        if let Some(ch) = cert.name.chars().find(|c| c.is_whitespace() || *c == '/') {
            result.add_error(ValidationError::new(
                ErrorCategory::Certificate,
                format!(
                    "certificate '{}' has an invalid character {:?} in its name",
                    cert.name, ch
                ),
            ));
        }

        for alias in &cert.aliases {
            if alias.trim().is_empty() {
                result.add_error(ValidationError::new(
                    ErrorCategory::Certificate,
                    format!("certificate '{}' has an empty alias", cert.name),
                ));
            } else if alias.contains(char::is_whitespace) {
                result.add_error(ValidationError::new(
                    ErrorCategory::Certificate,
                    format!(
                        "certificate '{}' has an alias containing whitespace: {:?}",
                        cert.name, alias
                    ),
                ));
            }
        }

        if cert.aftercare.iter().any(|cmd| cmd.trim().is_empty()) {
            result.add_error(ValidationError::new(
                ErrorCategory::Aftercare,
                format!("certificate '{}' has an empty aftercare command", cert.name),
            ));
        }
    }

    result
}
