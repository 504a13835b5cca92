//! Renewal run orchestration
//!
//! Resolves the effective switches, picks the certificates to work on and
//! feeds them through the [`RenewalEngine`] one at a time. A failure for one
//! certificate is recorded in the [`RunReport`] and never stops the run.
//!
//! # Switch precedence
//!
//! For `standalone`, `force_renew` and `do_aftercare`:
//!
//! 1. an explicit command line value
//! 2. the value from the configuration file
//! 3. the built-in default (`false`, `false`, `true`)

use std::sync::Arc;

use certkeeper_common::CommandExecutor;
use certkeeper_config::Config;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::aftercare::AftercareRunner;
use crate::firewall::{FirewallController, IptablesFirewall};
use crate::inspect::{ExpiryInspector, X509ExpiryInspector};
use crate::issuance::{CertbotIssuer, IssuanceInvoker};
use crate::record::CertificateRecord;
use crate::renewal::{RenewalEngine, RenewalMode, RenewalOutcome};
use crate::report::{AftercareStatus, CertificateReport, RunReport};

/// Per-invocation choices, usually from the command line
///
/// `None` defers to the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Only work on the certificate with this name
    pub target: Option<String>,
    pub standalone: Option<bool>,
    pub force_renew: Option<bool>,
    pub do_aftercare: Option<bool>,
}

/// Switches after applying precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveFlags {
    pub standalone: bool,
    pub force_renew: bool,
    pub do_aftercare: bool,
}

impl EffectiveFlags {
    pub fn resolve(options: &RunOptions, config: &Config) -> Self {
        Self {
            standalone: options.standalone.or(config.standalone).unwrap_or(false),
            force_renew: options.force_renew.or(config.force_renew).unwrap_or(false),
            do_aftercare: options.do_aftercare.or(config.do_aftercare).unwrap_or(true),
        }
    }
}

/// The external capabilities a run depends on
pub struct Collaborators {
    pub inspector: Arc<dyn ExpiryInspector>,
    pub firewall: Arc<dyn FirewallController>,
    pub issuer: Arc<dyn IssuanceInvoker>,
    pub aftercare: AftercareRunner,
}

impl Collaborators {
    /// Real implementations: certbot's live directory, iptables, certbot
    pub fn system(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            inspector: Arc::new(X509ExpiryInspector::default()),
            firewall: Arc::new(IptablesFirewall::new(executor.clone())),
            issuer: Arc::new(CertbotIssuer::new(executor.clone())),
            aftercare: AftercareRunner::new(executor),
        }
    }
}

/// Drives a renewal run over the configured certificates
pub struct CertManager {
    records: Vec<CertificateRecord>,
    target: Option<String>,
    flags: EffectiveFlags,
    engine: RenewalEngine,
    aftercare: AftercareRunner,
}

impl CertManager {
    pub fn new(config: &Config, options: RunOptions, collaborators: Collaborators) -> Self {
        let flags = EffectiveFlags::resolve(&options, config);
        let records = config.certificates.iter().map(CertificateRecord::from).collect();

        let engine = RenewalEngine::new(
            collaborators.inspector,
            collaborators.firewall,
            collaborators.issuer,
        )
        .with_force(flags.force_renew)
        .with_mode(RenewalMode::from_standalone(flags.standalone));

        debug!(
            standalone = flags.standalone,
            force_renew = flags.force_renew,
            do_aftercare = flags.do_aftercare,
            "Resolved run flags"
        );

        Self {
            records,
            target: options.target,
            flags,
            engine,
            aftercare: collaborators.aftercare,
        }
    }

    pub fn flags(&self) -> EffectiveFlags {
        self.flags
    }

    pub fn records(&self) -> &[CertificateRecord] {
        &self.records
    }

    /// Certificates this run works on
    ///
    /// The named target if it is configured (first entry wins for duplicate
    /// names), otherwise every certificate in configured order.
    pub fn select(&self) -> Vec<&CertificateRecord> {
        if let Some(target) = &self.target {
            if let Some(record) = self.records.iter().find(|r| r.name() == target.as_str()) {
                return vec![record];
            }
            warn!(
                target = %target,
                "Requested certificate is not configured, processing all certificates"
            );
        }

        self.records.iter().collect()
    }

    /// Process the selected certificates sequentially
    pub async fn run(&self) -> RunReport {
        let selected = self.select();

        info!(
            certificates = selected.len(),
            mode = %self.engine.mode(),
            forced = self.engine.is_forced(),
            "Starting renewal run"
        );

        let mut reports = Vec::with_capacity(selected.len());
        for record in selected {
            let span = info_span!("certificate", name = %record.name());
            reports.push(self.process(record).instrument(span).await);
        }

        let report = RunReport::new(reports);
        info!(
            renewed = report.renewed(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Renewal run finished"
        );
        report
    }

    async fn process(&self, record: &CertificateRecord) -> CertificateReport {
        let outcome = self.engine.process(record).await;

        let aftercare = match &outcome {
            Ok(RenewalOutcome::RenewedOk) if self.flags.do_aftercare => {
                match self.aftercare.run(record.name(), record.aftercare()).await {
                    Ok(commands_run) => AftercareStatus::Completed { commands_run },
                    Err(e) => AftercareStatus::Failed(e),
                }
            }
            Ok(RenewalOutcome::RenewedOk) => {
                debug!(certificate = %record.name(), "Aftercare disabled for this run");
                AftercareStatus::Disabled
            }
            Ok(_) => AftercareStatus::NotRequested,
            Err(e) => {
                error!(
                    certificate = %record.name(),
                    stage = "inspection",
                    error = %e,
                    "Could not determine certificate expiry"
                );
                AftercareStatus::NotRequested
            }
        };

        CertificateReport {
            name: record.name().clone(),
            outcome,
            aftercare,
        }
    }
}

impl std::fmt::Debug for CertManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertManager")
            .field("certificates", &self.records.len())
            .field("target", &self.target)
            .field("flags", &self.flags)
            .finish()
    }
}
