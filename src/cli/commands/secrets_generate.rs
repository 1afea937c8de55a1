//! `matrixup secrets generate` — create and encrypt the vault.
//!
//! Dependency checks run first so the operator is never prompted for
//! answers that a missing tool would throw away.

use std::fs;
use std::io::Write;

use crate::ansible::{password, vault};
use crate::cli::output;
use crate::cli::{project_dir, record_audit, resolve_password, Cli};
use crate::config::Settings;
use crate::errors::{MatrixUpError, Result};
use crate::inventory::read_yaml_scalar;
use crate::secrets::{generate_token, GeneratedSecrets};
use crate::validate;

/// Execute `secrets generate`.
pub fn execute(cli: &Cli, force: bool) -> Result<()> {
    // 1. Dependency check before anything interactive.
    vault::ensure_installed()?;

    let project = project_dir(cli)?;
    let settings = Settings::load(&project)?;
    let vault_path = settings.vault_path(&project, &cli.env);

    // 2. Refuse to clobber an existing vault unless forced.
    if vault_path.exists() && !force {
        output::tip("Pass --force to replace it, or `matrixup vault edit` to change values.");
        return Err(MatrixUpError::VaultAlreadyExists(vault_path));
    }

    // 3. The SSL email comes from the inventory when available,
    //    otherwise from a validated prompt.
    let group_vars = settings.group_vars_path(&project, &cli.env);
    let ssl_email = match read_yaml_scalar(&group_vars, "admin_email") {
        Some(email) => email,
        None => dialoguer::Input::new()
            .with_prompt("Admin email (stored as vault_ssl_email)")
            .validate_with(|s: &String| validate::validate_email(s).map_err(|e| e.to_string()))
            .interact_text()
            .map_err(|_| MatrixUpError::UserCancelled)?,
    };

    // 4. Resolve (or create) the vault password file.
    let password_file = match resolve_password(cli, &project) {
        Some(resolved) => resolved.path,
        None => {
            let path = project.join(format!(".vault_pass.{}", cli.env));
            let generated = generate_token(32);
            password::create_password_file(&path, &generated)?;
            output::success(&format!(
                "Generated a vault password in {} (keep it safe, it is not recoverable)",
                path.display()
            ));
            path
        }
    };

    // 5. Generate tokens and write the plaintext document, owner-only.
    let secrets = GeneratedSecrets::generate(&ssl_email);
    if let Some(parent) = vault_path.parent() {
        fs::create_dir_all(parent)?;
    }
    if vault_path.exists() {
        fs::remove_file(&vault_path)?;
    }
    write_owner_only(&vault_path, secrets.to_vault_yaml(&cli.env).as_bytes())?;

    // 6. Encrypt in place. On failure the plaintext must not survive.
    if let Err(e) = vault::encrypt(&vault_path, Some(&password_file)) {
        let _ = fs::remove_file(&vault_path);
        return Err(e);
    }

    record_audit(
        &project,
        &cli.env,
        "secrets-generate",
        None,
        Some(&format!("{} tokens", secrets.count())),
    );

    output::success(&format!(
        "Encrypted vault written to {} ({} generated secrets)",
        vault_path.display(),
        secrets.count()
    ));
    output::tip("Run `matrixup vault validate` to verify it.");
    output::tip("Run `matrixup vault backup` before making changes.");

    Ok(())
}

/// Create a file with 0600 permissions and write the bytes.
fn write_owner_only(path: &std::path::Path, bytes: &[u8]) -> Result<()> {
    #[cfg(unix)]
    let mut file = {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(path)?
    };

    #[cfg(not(unix))]
    let mut file = fs::OpenOptions::new().write(true).create_new(true).open(path)?;

    file.write_all(bytes)?;
    file.flush()?;
    Ok(())
}
