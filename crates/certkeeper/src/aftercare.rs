//! Post-renewal commands
//!
//! Aftercare commands typically reload the services that hold the renewed
//! certificate in memory (`systemctl reload nginx`). They are operator
//! supplied shell command lines and run through `sh -c`.

use std::collections::BTreeSet;
use std::sync::Arc;

use certkeeper_common::{CertName, CommandExecutor, CommandSpec};
use tracing::{error, info};

use crate::errors::AftercareError;

/// Runs the aftercare commands of a renewed certificate
pub struct AftercareRunner {
    executor: Arc<dyn CommandExecutor>,
}

impl AftercareRunner {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    /// Run every command once, stopping at the first failure
    ///
    /// Returns how many commands ran. The set guarantees each distinct
    /// command runs at most once; no particular order is promised.
    pub async fn run(
        &self,
        certificate: &CertName,
        commands: &BTreeSet<String>,
    ) -> Result<usize, AftercareError> {
        let mut completed = 0;

        for command in commands {
            info!(certificate = %certificate, command = %command, "Running aftercare command");

            if let Err(source) = self.executor.execute(&CommandSpec::shell(command)).await {
                error!(
                    certificate = %certificate,
                    command = %command,
                    error = %source,
                    remaining = commands.len() - completed - 1,
                    "Aftercare command failed, skipping the rest"
                );
                return Err(AftercareError {
                    command: command.clone(),
                    source,
                });
            }

            completed += 1;
        }

        Ok(completed)
    }
}

impl std::fmt::Debug for AftercareRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AftercareRunner").finish_non_exhaustive()
    }
}
