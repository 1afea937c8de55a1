//! Vault password file resolution.
//!
//! The password file gating vault decryption is discovered through an
//! explicit chain so behavior is deterministic and the chosen source can
//! be reported:
//!
//! 1. `--vault-password-file` flag
//! 2. `MATRIXUP_VAULT_PASSWORD_FILE` environment variable
//! 3. `<project>/.vault_pass.<env>`
//! 4. `<project>/.vault_pass`
//! 5. `~/.matrixup_vault_pass`
//!
//! When a password is typed interactively but an external tool needs a
//! file, the password is materialised as a `NamedTempFile` (0600, random
//! name) that is deleted on drop — never a predictable `/tmp/<pid>` path.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use zeroize::Zeroizing;

use crate::errors::{MatrixUpError, Result};

/// Environment variable overriding the password file location.
pub const PASSWORD_FILE_ENV: &str = "MATRIXUP_VAULT_PASSWORD_FILE";

/// Where a vault password file was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordSource {
    /// `--vault-password-file` flag.
    Flag,
    /// `MATRIXUP_VAULT_PASSWORD_FILE` environment variable.
    EnvVar,
    /// `<project>/.vault_pass.<env>`.
    EnvSpecificFile,
    /// `<project>/.vault_pass`.
    ProjectFile,
    /// `~/.matrixup_vault_pass`.
    HomeFile,
}

impl fmt::Display for PasswordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Flag => "--vault-password-file flag",
            Self::EnvVar => "MATRIXUP_VAULT_PASSWORD_FILE env var",
            Self::EnvSpecificFile => "project .vault_pass.<env> file",
            Self::ProjectFile => "project .vault_pass file",
            Self::HomeFile => "~/.matrixup_vault_pass",
        };
        f.write_str(s)
    }
}

/// A resolved password file path together with the source that produced it.
#[derive(Debug, Clone)]
pub struct ResolvedPassword {
    pub path: PathBuf,
    pub source: PasswordSource,
}

/// Walk the resolution chain and return the first password file that exists.
///
/// Returns `None` when nothing resolves; interactive callers then fall
/// back to `--ask-vault-pass`, unattended callers abort.
pub fn resolve_password_file(
    project_dir: &Path,
    env_name: &str,
    explicit: Option<&Path>,
) -> Option<ResolvedPassword> {
    if let Some(path) = explicit {
        if path.exists() {
            return Some(ResolvedPassword {
                path: path.to_path_buf(),
                source: PasswordSource::Flag,
            });
        }
    }

    if let Ok(value) = std::env::var(PASSWORD_FILE_ENV) {
        let path = PathBuf::from(value);
        if path.exists() {
            return Some(ResolvedPassword {
                path,
                source: PasswordSource::EnvVar,
            });
        }
    }

    let env_specific = project_dir.join(format!(".vault_pass.{env_name}"));
    if env_specific.exists() {
        return Some(ResolvedPassword {
            path: env_specific,
            source: PasswordSource::EnvSpecificFile,
        });
    }

    let project_default = project_dir.join(".vault_pass");
    if project_default.exists() {
        return Some(ResolvedPassword {
            path: project_default,
            source: PasswordSource::ProjectFile,
        });
    }

    if let Some(home) = std::env::var_os("HOME") {
        let home_file = PathBuf::from(home).join(".matrixup_vault_pass");
        if home_file.exists() {
            return Some(ResolvedPassword {
                path: home_file,
                source: PasswordSource::HomeFile,
            });
        }
    }

    None
}

/// Write a password into a scoped temp file with 0600 permissions.
///
/// The file is deleted when the returned handle drops, on every exit
/// path. Callers must keep the handle alive for as long as the external
/// tool needs the file.
pub fn write_temp_password(password: &Zeroizing<String>) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()
        .map_err(|e| MatrixUpError::CommandFailed(format!("temp password file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(file.path(), perms)?;
    }

    file.write_all(password.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// Create a persistent password file restricted to owner read/write.
///
/// Used by `secrets generate` when no password file exists yet.
pub fn create_password_file(path: &Path, password: &Zeroizing<String>) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(path)?;
        file.write_all(password.as_bytes())?;
        file.flush()?;
    }

    #[cfg(not(unix))]
    {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        file.write_all(password.as_bytes())?;
        file.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::write(path, "secret\n").unwrap();
    }

    #[test]
    fn explicit_flag_wins_over_everything() {
        let project = TempDir::new().unwrap();
        touch(&project.path().join(".vault_pass"));
        touch(&project.path().join(".vault_pass.production"));

        let flag_file = project.path().join("override_pass");
        touch(&flag_file);

        let resolved =
            resolve_password_file(project.path(), "production", Some(&flag_file)).unwrap();
        assert_eq!(resolved.source, PasswordSource::Flag);
        assert_eq!(resolved.path, flag_file);
    }

    #[test]
    fn env_specific_file_beats_project_default() {
        let project = TempDir::new().unwrap();
        touch(&project.path().join(".vault_pass"));
        touch(&project.path().join(".vault_pass.staging"));

        let resolved = resolve_password_file(project.path(), "staging", None).unwrap();
        assert_eq!(resolved.source, PasswordSource::EnvSpecificFile);
        assert!(resolved.path.ends_with(".vault_pass.staging"));
    }

    #[test]
    fn project_default_used_when_no_env_specific() {
        let project = TempDir::new().unwrap();
        touch(&project.path().join(".vault_pass"));

        let resolved = resolve_password_file(project.path(), "staging", None).unwrap();
        assert_eq!(resolved.source, PasswordSource::ProjectFile);
    }

    #[test]
    fn missing_flag_file_falls_through_chain() {
        let project = TempDir::new().unwrap();
        touch(&project.path().join(".vault_pass"));

        let missing = project.path().join("does_not_exist");
        let resolved = resolve_password_file(project.path(), "production", Some(&missing)).unwrap();
        assert_eq!(resolved.source, PasswordSource::ProjectFile);
    }

    #[test]
    fn temp_password_file_round_trips() {
        let password = Zeroizing::new("hunter2hunter2".to_string());
        let file = write_temp_password(&password).unwrap();

        let contents = fs::read_to_string(file.path()).unwrap();
        assert_eq!(contents, "hunter2hunter2");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(file.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn temp_password_file_removed_on_drop() {
        let password = Zeroizing::new("hunter2hunter2".to_string());
        let file = write_temp_password(&password).unwrap();
        let path = file.path().to_path_buf();
        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn create_password_file_refuses_overwrite() {
        let project = TempDir::new().unwrap();
        let path = project.path().join(".vault_pass");
        let password = Zeroizing::new("first".to_string());

        create_password_file(&path, &password).unwrap();
        assert!(create_password_file(&path, &password).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn created_password_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let project = TempDir::new().unwrap();
        let path = project.path().join(".vault_pass");
        create_password_file(&path, &Zeroizing::new("pw".to_string())).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
