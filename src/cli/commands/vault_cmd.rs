//! `matrixup vault ...` — wrappers around the external `ansible-vault` tool.
//!
//! Every action resolves the password file through the standard chain;
//! when nothing resolves, the external tool prompts interactively.

use zeroize::Zeroizing;

use crate::ansible::password;
use crate::ansible::vault::{self, ValidationStep};
use crate::backup;
use crate::cli::output;
use crate::cli::{project_dir, record_audit, resolve_password, Cli};
use crate::config::Settings;
use crate::errors::{MatrixUpError, Result};

/// `matrixup vault view`
pub fn execute_view(cli: &Cli) -> Result<()> {
    vault::ensure_installed()?;
    let project = project_dir(cli)?;
    let settings = Settings::load(&project)?;
    let vault_path = existing_vault(&settings, &project, cli)?;

    let password_file = resolve_password(cli, &project).map(|r| r.path);
    let plaintext = vault::view(&vault_path, password_file.as_deref())?;
    print!("{plaintext}");

    record_audit(&project, &cli.env, "vault-view", None, None);
    Ok(())
}

/// `matrixup vault edit`
pub fn execute_edit(cli: &Cli) -> Result<()> {
    vault::ensure_installed()?;
    let project = project_dir(cli)?;
    let settings = Settings::load(&project)?;
    let vault_path = existing_vault(&settings, &project, cli)?;

    let password_file = resolve_password(cli, &project).map(|r| r.path);
    vault::edit(&vault_path, password_file.as_deref())?;

    record_audit(&project, &cli.env, "vault-edit", None, None);
    output::success("Vault re-encrypted.");
    Ok(())
}

/// `matrixup vault rekey`
pub fn execute_rekey(cli: &Cli) -> Result<()> {
    vault::ensure_installed()?;
    let project = project_dir(cli)?;
    let settings = Settings::load(&project)?;
    let vault_path = existing_vault(&settings, &project, cli)?;

    // Take a backup first — a typo'd new password with no backup is a
    // lost vault.
    let backup_dir = settings.vault_backup_dir(&project);
    let backup_path = backup::backup_vault(
        &vault_path,
        &backup_dir,
        &cli.env,
        settings.backup_retention,
    )?;
    output::info(&format!("Pre-rekey backup: {}", backup_path.display()));

    let old_password_file = resolve_password(cli, &project).map(|r| r.path);

    match &old_password_file {
        Some(stored) => {
            // A stored password file means unattended runs depend on it,
            // so take the new password ourselves and update the file
            // after a successful rekey.
            let new_password = Zeroizing::new(
                dialoguer::Password::new()
                    .with_prompt("New vault password")
                    .with_confirmation("Confirm new vault password", "Passwords do not match")
                    .interact()
                    .map_err(|_| MatrixUpError::UserCancelled)?,
            );
            let temp = password::write_temp_password(&new_password)?;
            vault::rekey(&vault_path, Some(stored), Some(temp.path()))?;

            std::fs::write(stored, new_password.as_bytes())?;
            output::info(&format!("Updated {}", stored.display()));
        }
        None => {
            // ansible-vault prompts for both passwords itself.
            vault::rekey(&vault_path, None, None)?;
        }
    }

    record_audit(&project, &cli.env, "vault-rekey", None, None);
    output::success("Vault password changed.");
    Ok(())
}

/// `matrixup vault validate`
pub fn execute_validate(cli: &Cli) -> Result<()> {
    vault::ensure_installed()?;
    let project = project_dir(cli)?;
    let settings = Settings::load(&project)?;
    let vault_path = settings.vault_path(&project, &cli.env);

    let password_file = resolve_password(cli, &project).map(|r| r.path);
    let steps = vault::validate(&vault_path, password_file.as_deref())?;

    let mut failure = None;
    for step in &steps {
        match step {
            ValidationStep::HeaderOk => output::success("Vault header present"),
            ValidationStep::HeaderMissing => {
                output::error("Vault header missing — file is not encrypted");
                failure = Some("missing vault header".to_string());
            }
            ValidationStep::DecryptOk => output::success("Trial decrypt succeeded"),
            ValidationStep::DecryptFailed => {
                output::error("Trial decrypt failed — wrong password or corrupted vault");
                failure = Some("trial decrypt failed".to_string());
            }
            ValidationStep::NoPlaceholders => output::success("No placeholder values"),
            ValidationStep::PlaceholderFound(p) => {
                output::error(&format!("Placeholder value '{p}' found — replace it"));
                failure = Some(format!("placeholder '{p}' present"));
            }
        }
    }

    record_audit(
        &project,
        &cli.env,
        "vault-validate",
        None,
        failure.as_deref().or(Some("ok")),
    );

    if vault::all_steps_passed(&steps) {
        Ok(())
    } else {
        Err(MatrixUpError::VaultValidationFailed(
            failure.unwrap_or_else(|| "validation failed".to_string()),
        ))
    }
}

/// `matrixup vault backup [--list]`
pub fn execute_backup(cli: &Cli, list: bool) -> Result<()> {
    let project = project_dir(cli)?;
    let settings = Settings::load(&project)?;
    let backup_dir = settings.vault_backup_dir(&project);

    if list {
        let backups = backup::list_backups(&backup_dir, &cli.env)?;
        output::print_backup_table(&backups);
        return Ok(());
    }

    let vault_path = existing_vault(&settings, &project, cli)?;
    let dest = backup::backup_vault(
        &vault_path,
        &backup_dir,
        &cli.env,
        settings.backup_retention,
    )?;

    record_audit(
        &project,
        &cli.env,
        "vault-backup",
        None,
        Some(&dest.display().to_string()),
    );

    output::success(&format!("Backup written to {}", dest.display()));
    output::tip(&format!(
        "Keeping the {} most recent backups per environment.",
        settings.backup_retention
    ));
    Ok(())
}

/// The vault path for this environment, erroring when it doesn't exist.
fn existing_vault(
    settings: &Settings,
    project: &std::path::Path,
    cli: &Cli,
) -> Result<std::path::PathBuf> {
    let vault_path = settings.vault_path(project, &cli.env);
    if vault_path.exists() {
        Ok(vault_path)
    } else {
        Err(MatrixUpError::VaultNotFound(vault_path))
    }
}
