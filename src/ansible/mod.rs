//! Ansible module — thin wrappers around the external `ansible`,
//! `ansible-playbook`, and `ansible-vault` binaries.
//!
//! This module provides:
//! - Vault password file resolution and scoped temp credentials (`password`)
//! - `ansible-vault` subcommand wrappers and header checks (`vault`)
//! - `ansible-playbook` invocation building and ad hoc probes (`playbook`)
//!
//! Nothing here reimplements Ansible semantics — every operation shells
//! out and reports the external tool's outcome.

pub mod password;
pub mod playbook;
pub mod vault;

use std::process::Command;

use crate::errors::{MatrixUpError, Result};

/// Check whether a binary is available on PATH.
pub fn binary_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Abort with an installation hint if `tool` is missing from PATH.
///
/// Called before any interactive prompting so the user never types
/// answers that would be thrown away.
pub fn require_binary(tool: &str, hint: &str) -> Result<()> {
    if binary_exists(tool) {
        Ok(())
    } else {
        Err(MatrixUpError::MissingDependency {
            tool: tool.to_string(),
            hint: hint.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_common_binary() {
        // `sh` exists on every platform we support.
        assert!(binary_exists("sh"));
    }

    #[test]
    fn missing_binary_reports_hint() {
        let err = require_binary("definitely-not-a-real-tool-9xq", "apt install nothing")
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("definitely-not-a-real-tool-9xq"));
        assert!(msg.contains("apt install nothing"));
    }
}
