//! `matrixup init` — collect server settings and write the inventory.
//!
//! Interactive by default: every answer is validated and re-prompted
//! until it passes. With `--non-interactive` all answers come from flags
//! and the first invalid value aborts the run.

use dialoguer::{Confirm, Input};

use crate::cli::output;
use crate::cli::{confirm, project_dir, record_audit, Cli};
use crate::config::Settings;
use crate::errors::{MatrixUpError, Result};
use crate::inventory::ServerConfig;
use crate::validate;

/// Answers supplied via flags for `--non-interactive` runs.
pub struct InitFlags {
    pub non_interactive: bool,
    pub server_ip: Option<String>,
    pub ssh_port: Option<u16>,
    pub matrix_domain: Option<String>,
    pub element_domain: Option<String>,
    pub admin_email: Option<String>,
    pub enable_monitoring: bool,
    pub enable_turn: bool,
    pub enable_federation: bool,
    pub retention_days: Option<u32>,
}

/// Execute the `init` command.
pub fn execute(cli: &Cli, flags: &InitFlags) -> Result<()> {
    let project = project_dir(cli)?;
    let settings = Settings::load(&project)?;

    let hosts_path = settings.hosts_path(&project, &cli.env);
    if hosts_path.exists() {
        output::warning(&format!(
            "Inventory for '{}' already exists at {}",
            cli.env,
            hosts_path.display()
        ));
        if flags.non_interactive || !confirm("Overwrite it?", false)? {
            return Err(MatrixUpError::UserCancelled);
        }
    }

    let config = if flags.non_interactive {
        from_flags(flags)?
    } else {
        run_wizard(flags)?
    };

    config.write(&settings, &project, &cli.env)?;

    output::success(&format!(
        "Inventory written for '{}' at {}",
        cli.env,
        settings.env_dir(&project, &cli.env).display()
    ));

    record_audit(&project, &cli.env, "init", None, Some("inventory written"));

    // Offer to generate the vault right away — a fresh inventory
    // references vault_* variables that don't exist yet.
    let vault_path = settings.vault_path(&project, &cli.env);
    if !vault_path.exists() {
        if !flags.non_interactive
            && confirm("No encrypted vault yet. Generate secrets now?", true)?
        {
            return crate::cli::commands::secrets_generate::execute(cli, false);
        }
        output::tip("Run `matrixup secrets generate` to create the encrypted vault.");
    }
    output::tip("Run `matrixup preflight` to check the target before deploying.");
    output::tip("Run `matrixup deploy` to provision the server.");

    Ok(())
}

/// Build the config from flags, aborting on the first invalid value.
fn from_flags(flags: &InitFlags) -> Result<ServerConfig> {
    let server_ip = required(&flags.server_ip, "--server-ip")?;
    validate::validate_ipv4(&server_ip)?;

    let ssh_port = flags.ssh_port.unwrap_or(22);
    validate::validate_port(ssh_port)?;

    let matrix_domain = required(&flags.matrix_domain, "--matrix-domain")?;
    validate::validate_domain(&matrix_domain)?;

    let element_domain = required(&flags.element_domain, "--element-domain")?;
    validate::validate_domain(&element_domain)?;

    let admin_email = required(&flags.admin_email, "--admin-email")?;
    validate::validate_email(&admin_email)?;

    Ok(ServerConfig {
        server_ip,
        ssh_port,
        matrix_domain,
        element_domain,
        admin_email,
        enable_monitoring: flags.enable_monitoring,
        enable_turn: flags.enable_turn,
        enable_federation: flags.enable_federation,
        media_retention_days: flags.retention_days.unwrap_or(90),
    })
}

fn required(value: &Option<String>, flag: &str) -> Result<String> {
    value.clone().ok_or_else(|| {
        MatrixUpError::ConfigError(format!("{flag} is required with --non-interactive"))
    })
}

/// Interactive wizard. Flags pre-fill defaults where given.
fn run_wizard(flags: &InitFlags) -> Result<ServerConfig> {
    output::info("Configuring the Matrix homeserver. Answers are validated as you go.");

    let server_ip: String = Input::new()
        .with_prompt("Server IPv4 address")
        .with_initial_text(flags.server_ip.clone().unwrap_or_default())
        .validate_with(|s: &String| validate::validate_ipv4(s).map_err(|e| e.to_string()))
        .interact_text()
        .map_err(|_| MatrixUpError::UserCancelled)?;

    let ssh_port: u16 = Input::new()
        .with_prompt("SSH port")
        .default(flags.ssh_port.unwrap_or(22))
        .validate_with(|p: &u16| validate::validate_port(*p).map_err(|e| e.to_string()))
        .interact_text()
        .map_err(|_| MatrixUpError::UserCancelled)?;

    let matrix_domain: String = Input::new()
        .with_prompt("Matrix domain (e.g. matrix.example.com)")
        .with_initial_text(flags.matrix_domain.clone().unwrap_or_default())
        .validate_with(|s: &String| validate::validate_domain(s).map_err(|e| e.to_string()))
        .interact_text()
        .map_err(|_| MatrixUpError::UserCancelled)?;

    let element_domain: String = Input::new()
        .with_prompt("Element domain (e.g. element.example.com)")
        .with_initial_text(flags.element_domain.clone().unwrap_or_default())
        .validate_with(|s: &String| validate::validate_domain(s).map_err(|e| e.to_string()))
        .interact_text()
        .map_err(|_| MatrixUpError::UserCancelled)?;

    let admin_email: String = Input::new()
        .with_prompt("Admin email (Let's Encrypt)")
        .with_initial_text(flags.admin_email.clone().unwrap_or_default())
        .validate_with(|s: &String| validate::validate_email(s).map_err(|e| e.to_string()))
        .interact_text()
        .map_err(|_| MatrixUpError::UserCancelled)?;

    let enable_monitoring = Confirm::new()
        .with_prompt("Enable the monitoring stack?")
        .default(true)
        .interact()
        .map_err(|_| MatrixUpError::UserCancelled)?;

    let enable_turn = Confirm::new()
        .with_prompt("Enable the TURN server (VoIP)?")
        .default(true)
        .interact()
        .map_err(|_| MatrixUpError::UserCancelled)?;

    let enable_federation = Confirm::new()
        .with_prompt("Enable federation with other homeservers?")
        .default(true)
        .interact()
        .map_err(|_| MatrixUpError::UserCancelled)?;

    let media_retention_days: u32 = Input::new()
        .with_prompt("Media retention (days)")
        .default(flags.retention_days.unwrap_or(90))
        .interact_text()
        .map_err(|_| MatrixUpError::UserCancelled)?;

    Ok(ServerConfig {
        server_ip,
        ssh_port,
        matrix_domain,
        element_domain,
        admin_email,
        enable_monitoring,
        enable_turn,
        enable_federation,
        media_retention_days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_flags() -> InitFlags {
        InitFlags {
            non_interactive: true,
            server_ip: Some("192.168.1.50".to_string()),
            ssh_port: Some(22),
            matrix_domain: Some("matrix.example.com".to_string()),
            element_domain: Some("element.example.com".to_string()),
            admin_email: Some("admin@example.com".to_string()),
            enable_monitoring: true,
            enable_turn: false,
            enable_federation: true,
            retention_days: None,
        }
    }

    #[test]
    fn flags_build_a_config_with_defaults() {
        let config = from_flags(&full_flags()).unwrap();
        assert_eq!(config.server_ip, "192.168.1.50");
        assert_eq!(config.media_retention_days, 90);
        assert!(!config.enable_turn);
    }

    #[test]
    fn missing_required_flag_aborts() {
        let mut flags = full_flags();
        flags.admin_email = None;
        let err = from_flags(&flags).unwrap_err();
        assert!(err.to_string().contains("--admin-email"));
    }

    #[test]
    fn invalid_ip_aborts_instead_of_proceeding() {
        let mut flags = full_flags();
        flags.server_ip = Some("999.1.1.1".to_string());
        assert!(matches!(
            from_flags(&flags),
            Err(MatrixUpError::InvalidIpv4(_))
        ));
    }

    #[test]
    fn port_zero_aborts() {
        let mut flags = full_flags();
        flags.ssh_port = Some(0);
        assert!(from_flags(&flags).is_err());
    }

    #[test]
    fn invalid_domain_aborts() {
        let mut flags = full_flags();
        flags.matrix_domain = Some("not_a_domain".to_string());
        assert!(matches!(
            from_flags(&flags),
            Err(MatrixUpError::InvalidDomain(_))
        ));
    }
}
