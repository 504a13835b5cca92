//! Test doubles for the renewal seams.
//!
//! Every double writes what it was asked to do into a shared [`Journal`],
//! so tests can assert on the exact order of external operations.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use certkeeper_common::{CertName, CommandError, CommandExecutor, CommandOutput, CommandSpec};
use parking_lot::Mutex;

use crate::errors::{FirewallAction, FirewallError, InspectionError, IssuanceError};
use crate::firewall::FirewallController;
use crate::inspect::ExpiryInspector;
use crate::issuance::{IssuanceInvoker, IssuanceRequest};

/// Ordered record of external operations
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.0.lock().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.lock().iter().position(|e| e == entry)
    }
}

pub fn command_failure(program: &str) -> CommandError {
    CommandError::Failed {
        program: program.to_string(),
        status: "exit status 1".to_string(),
        stderr: "simulated failure".to_string(),
    }
}

/// Executor that records commands instead of running them
///
/// Commands whose rendering starts with one of the `failing` prefixes
/// report a non-zero exit.
#[derive(Debug)]
pub struct ScriptedExecutor {
    journal: Journal,
    failing: Vec<String>,
}

impl ScriptedExecutor {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            failing: Vec::new(),
        }
    }

    pub fn failing(mut self, prefix: &str) -> Self {
        self.failing.push(prefix.to_string());
        self
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(&self, command: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let rendered = command.to_string();
        self.journal.push(format!("exec {rendered}"));

        if self.failing.iter().any(|p| rendered.starts_with(p.as_str())) {
            return Err(command_failure(command.program()));
        }
        Ok(CommandOutput::default())
    }
}

/// Inspector answering from a fixed table
///
/// Names missing from the table have no certificate.
#[derive(Debug, Default)]
pub struct FakeInspector {
    journal: Journal,
    days: HashMap<String, i64>,
    broken: HashSet<String>,
}

impl FakeInspector {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            ..Default::default()
        }
    }

    pub fn with_days(mut self, name: &str, days: i64) -> Self {
        self.days.insert(name.to_string(), days);
        self
    }

    pub fn with_broken(mut self, name: &str) -> Self {
        self.broken.insert(name.to_string());
        self
    }
}

impl ExpiryInspector for FakeInspector {
    fn days_remaining(&self, name: &CertName) -> Result<Option<i64>, InspectionError> {
        self.journal.push(format!("inspect {name}"));

        if self.broken.contains(name.as_str()) {
            return Err(InspectionError::X509 {
                path: PathBuf::from(format!("/live/{name}/cert.pem")),
                message: "simulated corruption".to_string(),
            });
        }
        Ok(self.days.get(name.as_str()).copied())
    }
}

#[derive(Debug, Default)]
pub struct FakeFirewall {
    journal: Journal,
    fail_open: bool,
    fail_close: bool,
}

impl FakeFirewall {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            ..Default::default()
        }
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

#[async_trait]
impl FirewallController for FakeFirewall {
    async fn open(&self) -> Result<(), FirewallError> {
        self.journal.push("firewall open");
        if self.fail_open {
            return Err(FirewallError {
                action: FirewallAction::Open,
                source: command_failure("iptables"),
            });
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), FirewallError> {
        self.journal.push("firewall close");
        if self.fail_close {
            return Err(FirewallError {
                action: FirewallAction::Close,
                source: command_failure("iptables"),
            });
        }
        Ok(())
    }
}

/// Issuer that succeeds unless the certificate name is marked failing
#[derive(Debug, Default)]
pub struct FakeIssuer {
    journal: Journal,
    failing: HashSet<String>,
}

impl FakeIssuer {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            ..Default::default()
        }
    }

    pub fn failing_for(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }
}

#[async_trait]
impl IssuanceInvoker for FakeIssuer {
    async fn issue(&self, request: &IssuanceRequest) -> Result<(), IssuanceError> {
        self.journal.push(format!(
            "issue {} {}",
            request.mode(),
            request.domains().join(",")
        ));

        if self.failing.contains(request.name().as_str()) {
            return Err(IssuanceError {
                name: request.name().clone(),
                source: command_failure("certbot"),
            });
        }
        Ok(())
    }
}
