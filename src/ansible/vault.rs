//! Wrappers around the external `ansible-vault` binary.
//!
//! The vault file format and its crypto belong to ansible-vault; matrixup
//! only builds the command lines, supplies the password file, and checks
//! the fixed text header when validating.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::errors::{MatrixUpError, Result};

/// First bytes of every ansible-vault encrypted file.
pub const VAULT_HEADER: &str = "$ANSIBLE_VAULT;";

/// Placeholder strings that must never survive into a real vault.
pub const PLACEHOLDER_STRINGS: &[&str] = &["CHANGEME", "REPLACE_ME", "changeme"];

const TOOL: &str = "ansible-vault";
const INSTALL_HINT: &str = "apt install ansible  (or: pip install ansible-core)";

/// Abort early if `ansible-vault` is not on PATH.
pub fn ensure_installed() -> Result<()> {
    super::require_binary(TOOL, INSTALL_HINT)
}

/// Does the file start with the ansible-vault header?
pub fn has_vault_header(path: &Path) -> Result<bool> {
    let contents = fs::read_to_string(path)?;
    Ok(contents.starts_with(VAULT_HEADER))
}

/// Append the password argument: a password file when one was resolved,
/// otherwise interactive `--ask-vault-pass`.
fn password_arg(cmd: &mut Command, password_file: Option<&Path>) {
    match password_file {
        Some(path) => {
            cmd.arg("--vault-password-file").arg(path);
        }
        None => {
            cmd.arg("--ask-vault-pass");
        }
    }
}

fn run_checked(mut cmd: Command) -> Result<()> {
    let status = cmd.status()?;
    if status.success() {
        Ok(())
    } else {
        Err(MatrixUpError::ExternalToolFailed {
            tool: TOOL.to_string(),
            code: status.code().unwrap_or(-1),
        })
    }
}

/// Encrypt a plaintext file in place (`ansible-vault encrypt`).
pub fn encrypt(path: &Path, password_file: Option<&Path>) -> Result<()> {
    let mut cmd = Command::new(TOOL);
    cmd.arg("encrypt").arg(path);
    password_arg(&mut cmd, password_file);
    run_checked(cmd)
}

/// Decrypt and return the plaintext contents (`ansible-vault view`).
///
/// Stdout is captured; the terminal never sees the plaintext unless the
/// caller prints it.
pub fn view(path: &Path, password_file: Option<&Path>) -> Result<String> {
    let mut cmd = Command::new(TOOL);
    cmd.arg("view").arg(path).stdout(Stdio::piped());
    password_arg(&mut cmd, password_file);

    let output = cmd.output()?;
    if !output.status.success() {
        return Err(MatrixUpError::ExternalToolFailed {
            tool: TOOL.to_string(),
            code: output.status.code().unwrap_or(-1),
        });
    }

    String::from_utf8(output.stdout)
        .map_err(|_| MatrixUpError::SerializationError("vault contents are not UTF-8".into()))
}

/// Open the vault in the operator's editor (`ansible-vault edit`).
///
/// The terminal is inherited so the external tool can drive the editor.
pub fn edit(path: &Path, password_file: Option<&Path>) -> Result<()> {
    let mut cmd = Command::new(TOOL);
    cmd.arg("edit").arg(path);
    password_arg(&mut cmd, password_file);
    run_checked(cmd)
}

/// Change the vault password (`ansible-vault rekey`).
///
/// The old password comes from `old_password_file` (or an interactive
/// prompt); the new one from `new_password_file` when provided.
pub fn rekey(
    path: &Path,
    old_password_file: Option<&Path>,
    new_password_file: Option<&Path>,
) -> Result<()> {
    let mut cmd = Command::new(TOOL);
    cmd.arg("rekey").arg(path);
    password_arg(&mut cmd, old_password_file);
    if let Some(new_file) = new_password_file {
        cmd.arg("--new-vault-password-file").arg(new_file);
    }
    run_checked(cmd)
}

/// Outcome of one validation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationStep {
    HeaderOk,
    HeaderMissing,
    DecryptOk,
    DecryptFailed,
    NoPlaceholders,
    PlaceholderFound(String),
}

/// Validate an encrypted vault: header check, trial decrypt, placeholder scan.
///
/// Returns the list of step outcomes; the caller renders them. Stops
/// early when the header is missing (a trial decrypt would be pointless).
pub fn validate(path: &Path, password_file: Option<&Path>) -> Result<Vec<ValidationStep>> {
    if !path.exists() {
        return Err(MatrixUpError::VaultNotFound(path.to_path_buf()));
    }

    let mut steps = Vec::new();

    if has_vault_header(path)? {
        steps.push(ValidationStep::HeaderOk);
    } else {
        steps.push(ValidationStep::HeaderMissing);
        return Ok(steps);
    }

    match view(path, password_file) {
        Ok(plaintext) => {
            steps.push(ValidationStep::DecryptOk);

            let mut found = None;
            for placeholder in PLACEHOLDER_STRINGS {
                if plaintext.contains(placeholder) {
                    found = Some((*placeholder).to_string());
                    break;
                }
            }
            match found {
                Some(p) => steps.push(ValidationStep::PlaceholderFound(p)),
                None => steps.push(ValidationStep::NoPlaceholders),
            }
        }
        Err(_) => steps.push(ValidationStep::DecryptFailed),
    }

    Ok(steps)
}

/// True when every validation step passed.
pub fn all_steps_passed(steps: &[ValidationStep]) -> bool {
    steps.iter().all(|s| {
        matches!(
            s,
            ValidationStep::HeaderOk | ValidationStep::DecryptOk | ValidationStep::NoPlaceholders
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn header_detected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.yml");
        fs::write(&path, "$ANSIBLE_VAULT;1.1;AES256\n61626364\n").unwrap();
        assert!(has_vault_header(&path).unwrap());
    }

    #[test]
    fn plaintext_file_fails_header_check() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.yml");
        fs::write(&path, "---\nvault_postgres_password: CHANGEME\n").unwrap();
        assert!(!has_vault_header(&path).unwrap());
    }

    #[test]
    fn validate_stops_after_missing_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.yml");
        fs::write(&path, "not a vault\n").unwrap();

        let steps = validate(&path, None).unwrap();
        assert_eq!(steps, vec![ValidationStep::HeaderMissing]);
        assert!(!all_steps_passed(&steps));
    }

    #[test]
    fn validate_errors_on_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.yml");
        assert!(matches!(
            validate(&path, None),
            Err(MatrixUpError::VaultNotFound(_))
        ));
    }

    #[test]
    fn all_passed_requires_every_step_green() {
        assert!(all_steps_passed(&[
            ValidationStep::HeaderOk,
            ValidationStep::DecryptOk,
            ValidationStep::NoPlaceholders,
        ]));
        assert!(!all_steps_passed(&[
            ValidationStep::HeaderOk,
            ValidationStep::DecryptOk,
            ValidationStep::PlaceholderFound("CHANGEME".into()),
        ]));
    }
}
