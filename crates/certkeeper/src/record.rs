//! Typed view of one managed certificate.

use std::collections::BTreeSet;

use certkeeper_common::CertName;
use certkeeper_config::CertificateConfig;

/// A certificate certkeeper is responsible for
///
/// Built from configuration at the start of every run and never changed
/// afterwards. Aftercare commands are a set: listing a command twice still
/// runs it once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRecord {
    name: CertName,
    aliases: Vec<String>,
    aftercare: BTreeSet<String>,
}

impl CertificateRecord {
    pub fn new<A, C>(name: impl Into<CertName>, aliases: A, aftercare: C) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            name: name.into(),
            aliases: aliases.into_iter().map(Into::into).collect(),
            aftercare: aftercare.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &CertName {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn aftercare(&self) -> &BTreeSet<String> {
        &self.aftercare
    }

    /// All domains on the certificate: the name first, then the aliases in
    /// configured order
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

impl From<&CertificateConfig> for CertificateRecord {
    fn from(config: &CertificateConfig) -> Self {
        Self::new(
            config.name.as_str(),
            config.aliases.iter().cloned(),
            config.aftercare.iter().cloned(),
        )
    }
}
