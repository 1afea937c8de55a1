//! Command-line surface: the clap parser plus helpers shared by the
//! subcommand implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::ansible::password::{resolve_password_file, ResolvedPassword};
use crate::errors::{MatrixUpError, Result};

/// matrixup CLI: Matrix homeserver provisioning driven by Ansible.
#[derive(Parser)]
#[command(
    name = "matrixup",
    about = "Matrix homeserver provisioning driven by Ansible",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Environment to operate on (default: from .matrixup.toml, else "production")
    #[arg(short = 'e', long = "env", global = true)]
    pub env_flag: Option<String>,

    /// Resolved environment name, filled in after parsing.
    #[arg(skip)]
    pub env: String,

    /// Project root (default: current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Explicit vault password file (top of the resolution chain)
    #[arg(long, global = true)]
    pub vault_password_file: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Configure an environment (interactive wizard or flags)
    Init {
        /// Take every answer from flags; abort on the first invalid value
        #[arg(long)]
        non_interactive: bool,

        /// Server IPv4 address
        #[arg(long)]
        server_ip: Option<String>,

        /// SSH port (default: 22)
        #[arg(long)]
        ssh_port: Option<u16>,

        /// Matrix homeserver domain (e.g. matrix.example.com)
        #[arg(long)]
        matrix_domain: Option<String>,

        /// Element web client domain (e.g. element.example.com)
        #[arg(long)]
        element_domain: Option<String>,

        /// Admin email (Let's Encrypt registration)
        #[arg(long)]
        admin_email: Option<String>,

        /// Enable the monitoring stack
        #[arg(long)]
        enable_monitoring: bool,

        /// Enable the TURN server for VoIP
        #[arg(long)]
        enable_turn: bool,

        /// Enable federation with other homeservers
        #[arg(long)]
        enable_federation: bool,

        /// Media retention period in days (default: 90)
        #[arg(long)]
        retention_days: Option<u32>,
    },

    /// Manage generated secrets
    Secrets {
        #[command(subcommand)]
        action: SecretsAction,
    },

    /// Work with the encrypted vault (view, edit, rekey, validate, backup)
    Vault {
        #[command(subcommand)]
        action: VaultAction,
    },

    /// Run the provisioning playbook against the environment
    Deploy {
        /// Playbook to run (relative to the playbook dir)
        #[arg(long, default_value = "site.yml")]
        playbook: String,

        /// Pass --check --diff to ansible-playbook (no changes applied)
        #[arg(long)]
        dry_run: bool,

        /// Verbose ansible output (-vvv)
        #[arg(short, long)]
        verbose: bool,

        /// Only run plays tagged with these tags (comma-separated)
        #[arg(long)]
        tags: Option<String>,

        /// Skip the pre-flight checks (not recommended)
        #[arg(long)]
        skip_preflight: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Classify the target, back it up, and retry failures with
        /// recovery actions in between
        #[arg(long)]
        smart: bool,
    },

    /// Run the read-only pre-flight checks and print a report
    Preflight {
        /// Skip checks that need the network
        #[arg(long)]
        offline: bool,

        /// Print the report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// View the audit log of provisioning operations
    #[cfg(feature = "audit-log")]
    Audit {
        /// Maximum number of entries to print
        #[arg(long, default_value = "50")]
        last: usize,
        /// Only entries newer than this age (7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },

    /// Show version information
    Version,

    /// Emit a completion script for the given shell
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Secrets subcommands.
#[derive(clap::Subcommand)]
pub enum SecretsAction {
    /// Generate random secrets and encrypt them into the vault
    Generate {
        /// Overwrite an existing encrypted vault
        #[arg(long)]
        force: bool,
    },
}

/// Vault subcommands, all wrapping the external `ansible-vault` tool.
#[derive(clap::Subcommand)]
pub enum VaultAction {
    /// Decrypt and print the vault contents
    View,

    /// Open the vault in your editor, re-encrypting on save
    Edit,

    /// Change the vault password
    Rekey,

    /// Check header, trial-decrypt, and scan for placeholder values
    Validate,

    /// Create a timestamped backup (prunes to the retention limit)
    Backup {
        /// List existing backups instead of creating one
        #[arg(long)]
        list: bool,
    },
}

// Helpers shared by the command implementations.

/// Resolve the project root: `--project-dir` or the current directory.
pub fn project_dir(cli: &Cli) -> Result<PathBuf> {
    match &cli.project_dir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(std::env::current_dir()?),
    }
}

/// Walk the vault password resolution chain and report which source won.
///
/// Returns `None` when nothing resolves — interactive callers then let
/// the external tool prompt with `--ask-vault-pass`.
pub fn resolve_password(cli: &Cli, project: &std::path::Path) -> Option<ResolvedPassword> {
    let resolved =
        resolve_password_file(project, &cli.env, cli.vault_password_file.as_deref())?;
    output::info(&format!("Vault password from {}", resolved.source));
    record_audit(
        project,
        &cli.env,
        "password-resolve",
        None,
        Some(&resolved.source.to_string()),
    );
    Some(resolved)
}

/// Log to the audit database when the feature is enabled; no-op otherwise.
#[cfg(feature = "audit-log")]
pub fn record_audit(
    project: &std::path::Path,
    env: &str,
    op: &str,
    target: Option<&str>,
    details: Option<&str>,
) {
    crate::audit::log_audit(project, env, op, target, details);
}

#[cfg(not(feature = "audit-log"))]
pub fn record_audit(
    _project: &std::path::Path,
    _env: &str,
    _op: &str,
    _target: Option<&str>,
    _details: Option<&str>,
) {
}

/// Ask a yes/no question; Ctrl-C maps to a user-cancelled error.
pub fn confirm(prompt: &str, default: bool) -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(|_| MatrixUpError::UserCancelled)
}

/// Environment names become file and directory names (`inventories/<env>/`,
/// `.vault_pass.<env>`), so keep them tame: at most 64 characters of
/// lowercase ASCII, digits, and interior hyphens.
pub fn validate_env_name(name: &str) -> Result<()> {
    let reject =
        |why: &str| MatrixUpError::ConfigError(format!("invalid environment name '{name}': {why}"));

    if name.is_empty() {
        return Err(reject("must not be empty"));
    }
    if name.len() > 64 {
        return Err(reject("longer than 64 characters"));
    }
    if name
        .bytes()
        .any(|b| !(b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-'))
    {
        return Err(reject("use only lowercase letters, digits, and hyphens"));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(reject("must not begin or end with a hyphen"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_names_that_pass() {
        for ok in ["production", "staging", "eu-west-1", "v2"] {
            assert!(validate_env_name(ok).is_ok(), "{ok} should be accepted");
        }
    }

    #[test]
    fn environment_names_that_fail() {
        let too_long = "x".repeat(65);
        let bad = [
            "",
            "Production",
            "PROD",
            "prod.test",
            "prod/test",
            "prod test",
            "prod_test",
            "-prod",
            "prod-",
            too_long.as_str(),
        ];
        for name in bad {
            assert!(validate_env_name(name).is_err(), "{name:?} should be rejected");
        }
    }
}
