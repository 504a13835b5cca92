//! Validation port firewall control
//!
//! Standalone validation needs certbot's temporary listener to be reachable
//! from the outside, so an inbound accept rule for the validation port is
//! inserted for the duration of the issuance and removed afterwards.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use certkeeper_common::{CommandExecutor, CommandSpec};
use tracing::{debug, info, warn};

use crate::errors::{FirewallAction, FirewallError};
use crate::issuance::VALIDATION_PORT;

/// Opens and closes inbound access to the validation port.
#[async_trait]
pub trait FirewallController: Send + Sync {
    async fn open(&self) -> Result<(), FirewallError>;
    async fn close(&self) -> Result<(), FirewallError>;
}

/// Manages a single `iptables` INPUT accept rule
///
/// Remembers whether it inserted the rule, so opening twice inserts one
/// rule and closing when nothing was opened removes nothing. A failed
/// `close` leaves the rule marked open and can be retried.
pub struct IptablesFirewall {
    executor: Arc<dyn CommandExecutor>,
    program: String,
    port: u16,
    is_open: AtomicBool,
}

impl IptablesFirewall {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            program: "iptables".to_string(),
            port: VALIDATION_PORT,
            is_open: AtomicBool::new(false),
        }
    }

    /// Use a different port than the standalone default
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn is_open(&self) -> bool {
        self.is_open.load(Ordering::SeqCst)
    }

    /// The iptables invocation for a transition
    ///
    /// Insert and delete use the same rule specification so that `-D`
    /// removes exactly the rule `-I` added.
    pub fn rule_command(&self, action: FirewallAction) -> CommandSpec {
        let flag = match action {
            FirewallAction::Open => "-I",
            FirewallAction::Close => "-D",
        };
        CommandSpec::new(&self.program).args([
            flag.to_string(),
            "INPUT".to_string(),
            "-p".to_string(),
            "tcp".to_string(),
            "--dport".to_string(),
            self.port.to_string(),
            "-j".to_string(),
            "ACCEPT".to_string(),
        ])
    }

    async fn apply(&self, action: FirewallAction) -> Result<(), FirewallError> {
        let command = self.rule_command(action);
        self.executor
            .execute(&command)
            .await
            .map(|_| ())
            .map_err(|source| FirewallError { action, source })
    }
}

#[async_trait]
impl FirewallController for IptablesFirewall {
    async fn open(&self) -> Result<(), FirewallError> {
        if self.is_open() {
            debug!(port = self.port, "Validation port already open");
            return Ok(());
        }

        self.apply(FirewallAction::Open).await?;
        self.is_open.store(true, Ordering::SeqCst);
        info!(port = self.port, "Opened validation port");
        Ok(())
    }

    async fn close(&self) -> Result<(), FirewallError> {
        if !self.is_open() {
            debug!(port = self.port, "Validation port already closed");
            return Ok(());
        }

        self.apply(FirewallAction::Close).await?;
        self.is_open.store(false, Ordering::SeqCst);
        info!(port = self.port, "Closed validation port");
        Ok(())
    }
}

impl Drop for IptablesFirewall {
    fn drop(&mut self) {
        if self.is_open() {
            warn!(
                port = self.port,
                "Validation port rule is still installed, remove it manually"
            );
        }
    }
}

impl std::fmt::Debug for IptablesFirewall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IptablesFirewall")
            .field("program", &self.program)
            .field("port", &self.port)
            .field("is_open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Journal, ScriptedExecutor};

    const OPEN: &str = "iptables -I INPUT -p tcp --dport 443 -j ACCEPT";
    const CLOSE: &str = "iptables -D INPUT -p tcp --dport 443 -j ACCEPT";

    #[test]
    fn test_rule_commands() {
        let firewall = IptablesFirewall::new(Arc::new(ScriptedExecutor::new(Journal::new())));
        assert_eq!(firewall.rule_command(FirewallAction::Open).to_string(), OPEN);
        assert_eq!(firewall.rule_command(FirewallAction::Close).to_string(), CLOSE);

        let custom = firewall.with_port(8443);
        assert_eq!(
            custom.rule_command(FirewallAction::Open).arguments()[5],
            "8443"
        );
    }

    #[tokio::test]
    async fn test_open_then_close() {
        let journal = Journal::new();
        let firewall = IptablesFirewall::new(Arc::new(ScriptedExecutor::new(journal.clone())));

        firewall.open().await.unwrap();
        assert!(firewall.is_open());
        firewall.close().await.unwrap();
        assert!(!firewall.is_open());

        assert_eq!(
            journal.entries(),
            vec![format!("exec {OPEN}"), format!("exec {CLOSE}")]
        );
    }

    #[tokio::test]
    async fn test_open_and_close_are_idempotent() {
        let journal = Journal::new();
        let firewall = IptablesFirewall::new(Arc::new(ScriptedExecutor::new(journal.clone())));

        firewall.close().await.unwrap();
        firewall.open().await.unwrap();
        firewall.open().await.unwrap();
        firewall.close().await.unwrap();
        firewall.close().await.unwrap();

        assert_eq!(
            journal.entries(),
            vec![format!("exec {OPEN}"), format!("exec {CLOSE}")]
        );
    }

    #[tokio::test]
    async fn test_failed_open_stays_closed() {
        let journal = Journal::new();
        let executor = ScriptedExecutor::new(journal.clone()).failing("iptables -I");
        let firewall = IptablesFirewall::new(Arc::new(executor));

        let err = firewall.open().await.unwrap_err();
        assert_eq!(err.action, FirewallAction::Open);
        assert!(!firewall.is_open());

        // Nothing to remove
        firewall.close().await.unwrap();
        assert_eq!(journal.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_close_can_be_retried() {
        let journal = Journal::new();
        let executor = ScriptedExecutor::new(journal.clone()).failing("iptables -D");
        let firewall = IptablesFirewall::new(Arc::new(executor));

        firewall.open().await.unwrap();
        let err = firewall.close().await.unwrap_err();
        assert_eq!(err.action, FirewallAction::Close);
        assert!(firewall.is_open());

        assert!(firewall.close().await.is_err());
        assert_eq!(journal.entries().len(), 3);
    }
}
