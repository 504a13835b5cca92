//! Certificate issuance through certbot
//!
//! One certbot run per renewal attempt. The domain list, validation mode
//! and the fixed deployment paths are turned into an argument vector:
//!
//! ```text
//! certbot certonly --non-interactive --config /etc/letsencrypt/cli.ini \
//!     --cert-name example.com --standalone --preferred-challenges http \
//!     --http-01-port 443 -d example.com -d www.example.com
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use certkeeper_common::{CertName, CommandExecutor, CommandSpec};
use tracing::{debug, info};

use crate::errors::IssuanceError;
use crate::record::CertificateRecord;
use crate::renewal::RenewalMode;

/// Port certbot's standalone listener binds to
pub const VALIDATION_PORT: u16 = 443;

/// Configuration profile passed to every certbot run
pub const DEFAULT_CONFIG_PROFILE: &str = "/etc/letsencrypt/cli.ini";

/// Directory served by the web server for HTTP-01 challenge files
pub const DEFAULT_WEBROOT: &str = "/var/www/letsencrypt";

/// What to issue and how to validate it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceRequest {
    name: CertName,
    domains: Vec<String>,
    mode: RenewalMode,
}

impl IssuanceRequest {
    pub fn new(record: &CertificateRecord, mode: RenewalMode) -> Self {
        Self {
            name: record.name().clone(),
            domains: record.domains().map(str::to_string).collect(),
            mode,
        }
    }

    pub fn name(&self) -> &CertName {
        &self.name
    }

    /// Primary domain first, then aliases in configured order
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn mode(&self) -> RenewalMode {
        self.mode
    }
}

/// Obtains a certificate from the external issuer.
#[async_trait]
pub trait IssuanceInvoker: Send + Sync {
    async fn issue(&self, request: &IssuanceRequest) -> Result<(), IssuanceError>;
}

/// Deployment constants for certbot invocations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerSettings {
    pub program: String,
    pub config_profile: PathBuf,
    pub webroot: PathBuf,
    pub validation_port: u16,
}

impl Default for IssuerSettings {
    fn default() -> Self {
        Self {
            program: "certbot".to_string(),
            config_profile: PathBuf::from(DEFAULT_CONFIG_PROFILE),
            webroot: PathBuf::from(DEFAULT_WEBROOT),
            validation_port: VALIDATION_PORT,
        }
    }
}

/// Runs `certbot certonly` for each request
pub struct CertbotIssuer {
    executor: Arc<dyn CommandExecutor>,
    settings: IssuerSettings,
}

impl CertbotIssuer {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self::with_settings(executor, IssuerSettings::default())
    }

    pub fn with_settings(executor: Arc<dyn CommandExecutor>, settings: IssuerSettings) -> Self {
        Self { executor, settings }
    }

    pub fn settings(&self) -> &IssuerSettings {
        &self.settings
    }

    /// Build the certbot invocation for a request
    pub fn command_for(&self, request: &IssuanceRequest) -> CommandSpec {
        let mut command = CommandSpec::new(&self.settings.program).args([
            "certonly".to_string(),
            "--non-interactive".to_string(),
            "--config".to_string(),
            self.settings.config_profile.display().to_string(),
            "--cert-name".to_string(),
            request.name.to_string(),
        ]);

        command = match request.mode {
            RenewalMode::Standalone => command.args([
                "--standalone".to_string(),
                "--preferred-challenges".to_string(),
                "http".to_string(),
                "--http-01-port".to_string(),
                self.settings.validation_port.to_string(),
            ]),
            RenewalMode::Webroot => command.args([
                "--webroot".to_string(),
                "--webroot-path".to_string(),
                self.settings.webroot.display().to_string(),
            ]),
        };

        for domain in &request.domains {
            command = command.arg("-d").arg(domain.as_str());
        }

        command
    }
}

#[async_trait]
impl IssuanceInvoker for CertbotIssuer {
    async fn issue(&self, request: &IssuanceRequest) -> Result<(), IssuanceError> {
        let command = self.command_for(request);

        info!(
            certificate = %request.name,
            mode = %request.mode,
            domains = request.domains.len(),
            "Requesting certificate"
        );
        debug!(command = %command, "certbot invocation");

        self.executor
            .execute(&command)
            .await
            .map(|_| ())
            .map_err(|source| IssuanceError {
                name: request.name.clone(),
                source,
            })
    }
}

impl std::fmt::Debug for CertbotIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertbotIssuer")
            .field("settings", &self.settings)
            .finish()
    }
}
