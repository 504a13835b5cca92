//! certkeeper - Main entry point
//!
//! Renews the configured TLS certificates once and exits. Meant to be run
//! periodically (cron or a systemd timer).

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use certkeeper::{CertManager, Collaborators, RunOptions};
use certkeeper_common::{SystemExecutor, DEFAULT_COMMAND_TIMEOUT};
use certkeeper_config::{Config, DEFAULT_CONFIG_PATH};

/// certkeeper - Renews TLS certificates with certbot
#[derive(Parser, Debug)]
#[command(name = "certkeeper")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(
        short = 'c',
        long = "config",
        env = "CERTKEEPER_CONFIG",
        default_value = DEFAULT_CONFIG_PATH,
        global = true
    )]
    config: PathBuf,

    /// Only renew the certificate with this name
    #[arg(long = "cert", value_name = "NAME", global = true)]
    cert: Option<String>,

    /// Validate with certbot's standalone listener (opens the firewall)
    #[arg(long = "standalone", conflicts_with = "webroot", global = true)]
    standalone: bool,

    /// Validate through the webroot
    #[arg(long = "webroot", global = true)]
    webroot: bool,

    /// Renew even if the certificate is still valid
    #[arg(long = "force-renew", conflicts_with = "no_force_renew", global = true)]
    force_renew: bool,

    /// Only renew certificates that are due
    #[arg(long = "no-force-renew", global = true)]
    no_force_renew: bool,

    /// Run aftercare commands after renewal
    #[arg(long = "aftercare", conflicts_with = "no_aftercare", global = true)]
    aftercare: bool,

    /// Do not run aftercare commands
    #[arg(long = "no-aftercare", global = true)]
    no_aftercare: bool,

    /// Enable verbose logging (debug level)
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration file and exit
    Check,
    /// Renew certificates that are due (default)
    Run,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

impl Cli {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            target: self.cert.clone(),
            standalone: explicit(self.standalone, self.webroot),
            force_renew: explicit(self.force_renew, self.no_force_renew),
            do_aftercare: explicit(self.aftercare, self.no_aftercare),
        }
    }
}

/// Map a `--flag` / `--no-flag` pair to "set" or "defer to the config file"
fn explicit(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    match cli.command {
        Some(Commands::Check) => check_config(&cli.config),
        Some(Commands::Run) | None => run_renewals(&cli),
    }
}

fn init_logging(verbose: bool, format: LogFormat) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

/// Load the configuration file and report what it contains
fn check_config(config_path: &Path) -> Result<ExitCode> {
    info!("Testing configuration file: {}", config_path.display());
    let config = Config::from_file(config_path).context("Failed to load configuration file")?;

    info!("Configuration test successful:");
    info!("  - {} certificate(s)", config.certificates.len());
    for cert in &config.certificates {
        info!(
            "  - {} ({} alias(es), {} aftercare command(s))",
            cert.name,
            cert.aliases.len(),
            cert.aftercare.len()
        );
    }

    println!(
        "certkeeper: configuration file {} test is successful",
        config_path.display()
    );
    Ok(ExitCode::SUCCESS)
}

fn run_renewals(cli: &Cli) -> Result<ExitCode> {
    if !is_privileged() {
        bail!("certkeeper must be run as root to manage certificates and firewall rules");
    }

    let config = Config::from_file(&cli.config).with_context(|| {
        format!(
            "Failed to load configuration file {}",
            cli.config.display()
        )
    })?;

    let timeout = config
        .command_timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_COMMAND_TIMEOUT);
    let executor = Arc::new(SystemExecutor::new(timeout));
    info!(
        config = %cli.config.display(),
        certificates = config.certificates.len(),
        command_timeout_secs = executor.timeout().as_secs(),
        "Loaded configuration"
    );
    let manager = CertManager::new(&config, cli.run_options(), Collaborators::system(executor));

    // Everything runs sequentially; a single-threaded runtime is enough
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let report = runtime.block_on(manager.run());

    if report.has_failures() {
        warn!(
            failed = report.failed(),
            "Some certificates could not be renewed, see the log above"
        );
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(unix)]
fn is_privileged() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn is_privileged() -> bool {
    false
}
