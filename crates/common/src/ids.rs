//! Type-safe identifier newtypes for certkeeper.
//!
//! These types keep certificate identities apart from the plain domain
//! strings they are built from (aliases, command strings, paths).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Certificate identifier.
///
/// The primary domain of a managed certificate. It names the certificate
/// lineage on disk (`live/<name>/cert.pem`) and is the first `-d` entry
/// handed to the issuer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertName(String);

impl CertName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CertName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CertName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CertName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for CertName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for CertName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cert_name() {
        let name = CertName::new("example.com");
        assert_eq!(name.as_str(), "example.com");
        assert_eq!(name.to_string(), "example.com");
        assert!(name == *"example.com");
    }

    #[test]
    fn test_cert_name_from() {
        let a = CertName::from("example.com");
        let b = CertName::from("example.com".to_string());
        assert_eq!(a, b);
        assert_eq!(b.into_string(), "example.com");
    }
}
