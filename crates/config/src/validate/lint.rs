//! Configuration linting
//!
//! Flags entries that are legal but probably not what the operator meant.

use std::collections::HashSet;

use super::{ValidationResult, ValidationWarning};
use crate::Config;

/// Lint configuration for redundant or ambiguous entries
pub fn lint_config(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    if config.certificates.is_empty() {
        result.add_warning(ValidationWarning::new(
            "No certificates configured, nothing will be renewed",
        ));
    }

    // Selection by name uses the first entry with that name
    let mut seen_names = HashSet::new();
    for cert in &config.certificates {
        if !seen_names.insert(cert.name.as_str()) {
            result.add_warning(ValidationWarning::new(format!(
                "Certificate '{}' is configured more than once; selecting it by name uses the first entry",
                cert.name
            )));
        }
    }

    for cert in &config.certificates {
        let mut seen_aliases = HashSet::new();
        for alias in &cert.aliases {
            if alias == &cert.name {
                result.add_warning(ValidationWarning::new(format!(
                    "Certificate '{}' lists its own name as an alias",
                    cert.name
                )));
            } else if !seen_aliases.insert(alias.as_str()) {
                result.add_warning(ValidationWarning::new(format!(
                    "Certificate '{}' lists alias '{}' more than once",
                    cert.name, alias
                )));
            }
        }

        let distinct: HashSet<&str> = cert.aftercare.iter().map(String::as_str).collect();
        if distinct.len() < cert.aftercare.len() {
            result.add_warning(ValidationWarning::new(format!(
                "Certificate '{}' repeats aftercare commands; each runs only once",
                cert.name
            )));
        }
    }

    result
}
