//! `ansible-playbook` invocation building and ad hoc `ansible` probes.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::errors::{MatrixUpError, Result};

const PLAYBOOK_TOOL: &str = "ansible-playbook";
const ADHOC_TOOL: &str = "ansible";
const INSTALL_HINT: &str = "apt install ansible  (or: pip install ansible-core)";

/// Abort early if `ansible-playbook` is not on PATH.
pub fn ensure_installed() -> Result<()> {
    super::require_binary(PLAYBOOK_TOOL, INSTALL_HINT)
}

/// Builder for one `ansible-playbook` run.
///
/// Flags map straight onto the external tool: `--dry-run` becomes
/// `--check`, `--verbose` becomes `-vvv`.
#[derive(Debug, Clone)]
pub struct PlaybookInvocation {
    pub playbook: PathBuf,
    pub inventory: PathBuf,
    pub vault_password_file: Option<PathBuf>,
    pub check: bool,
    pub verbose: bool,
    pub tags: Option<String>,
}

impl PlaybookInvocation {
    pub fn new(playbook: &Path, inventory: &Path) -> Self {
        Self {
            playbook: playbook.to_path_buf(),
            inventory: inventory.to_path_buf(),
            vault_password_file: None,
            check: false,
            verbose: false,
            tags: None,
        }
    }

    /// Arguments passed to `ansible-playbook`, in order.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "-i".to_string(),
            self.inventory.display().to_string(),
            self.playbook.display().to_string(),
        ];

        match &self.vault_password_file {
            Some(path) => {
                args.push("--vault-password-file".to_string());
                args.push(path.display().to_string());
            }
            None => args.push("--ask-vault-pass".to_string()),
        }

        if self.check {
            args.push("--check".to_string());
            args.push("--diff".to_string());
        }

        if self.verbose {
            args.push("-vvv".to_string());
        }

        if let Some(tags) = &self.tags {
            args.push("--tags".to_string());
            args.push(tags.clone());
        }

        args
    }

    /// Run the playbook with inherited stdio so the operator sees
    /// Ansible's own output live.
    pub fn run(&self) -> Result<()> {
        let status = Command::new(PLAYBOOK_TOOL).args(self.to_args()).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(MatrixUpError::ExternalToolFailed {
                tool: PLAYBOOK_TOOL.to_string(),
                code: status.code().unwrap_or(-1),
            })
        }
    }

    /// `ansible-playbook --syntax-check` — parses without touching the host.
    pub fn syntax_check(&self) -> Result<()> {
        let status = Command::new(PLAYBOOK_TOOL)
            .args(self.to_args())
            .arg("--syntax-check")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(MatrixUpError::ExternalToolFailed {
                tool: PLAYBOOK_TOOL.to_string(),
                code: status.code().unwrap_or(-1),
            })
        }
    }
}

/// `ansible all -m ping` — can the controller reach the host over SSH?
pub fn ping_host(inventory: &Path, vault_password_file: Option<&Path>) -> bool {
    adhoc(inventory, vault_password_file, "ping", None)
}

/// `ansible all -m command -a "sudo -n true"` — does passwordless
/// escalation work on the host?
pub fn check_sudo(inventory: &Path, vault_password_file: Option<&Path>) -> bool {
    adhoc(inventory, vault_password_file, "command", Some("sudo -n true"))
}

fn adhoc(
    inventory: &Path,
    vault_password_file: Option<&Path>,
    module: &str,
    module_args: Option<&str>,
) -> bool {
    let mut cmd = Command::new(ADHOC_TOOL);
    cmd.arg("all")
        .arg("-i")
        .arg(inventory)
        .arg("-m")
        .arg(module);
    if let Some(args) = module_args {
        cmd.arg("-a").arg(args);
    }
    if let Some(path) = vault_password_file {
        cmd.arg("--vault-password-file").arg(path);
    }
    cmd.stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation() -> PlaybookInvocation {
        PlaybookInvocation::new(
            Path::new("playbooks/site.yml"),
            Path::new("inventory/production"),
        )
    }

    #[test]
    fn minimal_args_prompt_for_password() {
        let args = invocation().to_args();
        assert_eq!(args[0], "-i");
        assert_eq!(args[1], "inventory/production");
        assert_eq!(args[2], "playbooks/site.yml");
        assert!(args.contains(&"--ask-vault-pass".to_string()));
    }

    #[test]
    fn dry_run_maps_to_check_diff() {
        let mut inv = invocation();
        inv.check = true;
        let args = inv.to_args();
        assert!(args.contains(&"--check".to_string()));
        assert!(args.contains(&"--diff".to_string()));
    }

    #[test]
    fn verbose_maps_to_vvv() {
        let mut inv = invocation();
        inv.verbose = true;
        assert!(inv.to_args().contains(&"-vvv".to_string()));
    }

    #[test]
    fn password_file_replaces_prompt() {
        let mut inv = invocation();
        inv.vault_password_file = Some(PathBuf::from(".vault_pass"));
        let args = inv.to_args();
        assert!(args.contains(&"--vault-password-file".to_string()));
        assert!(!args.contains(&"--ask-vault-pass".to_string()));
    }

    #[test]
    fn tags_are_forwarded() {
        let mut inv = invocation();
        inv.tags = Some("synapse,nginx".to_string());
        let args = inv.to_args();
        let pos = args.iter().position(|a| a == "--tags").unwrap();
        assert_eq!(args[pos + 1], "synapse,nginx");
    }
}
