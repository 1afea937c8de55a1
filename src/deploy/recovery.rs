//! Named recovery actions run between playbook retries.
//!
//! Each action is an explicit, ordered repair step with a name and a
//! description, so every run can report exactly which steps executed and
//! with what outcome — no inline shell one-liners hidden in the retry loop.

use std::process::{Command, Stdio};

use crate::cli::output;

/// Connection parameters for the target host.
#[derive(Debug, Clone)]
pub struct SshTarget {
    pub host: String,
    pub port: u16,
}

impl SshTarget {
    /// Build an `ssh` invocation that runs `remote_cmd` on the target.
    ///
    /// BatchMode keeps retries unattended: a broken key setup fails fast
    /// instead of hanging on a password prompt.
    pub fn ssh_args(&self, remote_cmd: &str) -> Vec<String> {
        vec![
            "-p".to_string(),
            self.port.to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ConnectTimeout=5".to_string(),
            format!("root@{}", self.host),
            remote_cmd.to_string(),
        ]
    }
}

/// One named repair step.
#[derive(Debug, Clone)]
pub struct RecoveryAction {
    pub name: String,
    pub description: String,
    pub program: String,
    pub args: Vec<String>,
}

impl RecoveryAction {
    pub fn new(name: &str, description: &str, program: &str, args: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            program: program.to_string(),
            args,
        }
    }

    /// Run the action, discarding its output. Returns whether it succeeded.
    pub fn run(&self) -> bool {
        Command::new(&self.program)
            .args(&self.args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

/// What happened when a recovery action ran.
#[derive(Debug, Clone)]
pub struct RecoveryOutcome {
    pub name: String,
    pub succeeded: bool,
}

/// Run every action in order, reporting each outcome as it happens.
///
/// A failed action does not stop the rest — repairs are independent and
/// best-effort; the retry that follows is the real test.
pub fn run_all(actions: &[RecoveryAction]) -> Vec<RecoveryOutcome> {
    let mut outcomes = Vec::with_capacity(actions.len());

    for action in actions {
        output::info(&format!("Recovery: {} — {}", action.name, action.description));
        let succeeded = action.run();
        if succeeded {
            output::success(&format!("Recovery '{}' completed", action.name));
        } else {
            output::warning(&format!("Recovery '{}' failed, continuing", action.name));
        }
        outcomes.push(RecoveryOutcome {
            name: action.name.clone(),
            succeeded,
        });
    }

    outcomes
}

/// The default repair list for a Synapse host.
pub fn default_actions(target: &SshTarget) -> Vec<RecoveryAction> {
    vec![
        RecoveryAction::new(
            "fix-ownership",
            "restore ownership of the Synapse data directory",
            "ssh",
            target.ssh_args("chown -R matrix-synapse:matrix-synapse /var/lib/matrix-synapse"),
        ),
        RecoveryAction::new(
            "restart-postgres",
            "restart the PostgreSQL service",
            "ssh",
            target.ssh_args("systemctl restart postgresql"),
        ),
        RecoveryAction::new(
            "restart-synapse",
            "restart the Synapse service",
            "ssh",
            target.ssh_args("systemctl restart matrix-synapse"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssh_args_are_unattended() {
        let target = SshTarget {
            host: "192.168.1.50".to_string(),
            port: 2222,
        };
        let args = target.ssh_args("systemctl is-active matrix-synapse");
        assert!(args.contains(&"BatchMode=yes".to_string()));
        assert!(args.contains(&"root@192.168.1.50".to_string()));
        assert_eq!(args[1], "2222");
        assert_eq!(args.last().unwrap(), "systemctl is-active matrix-synapse");
    }

    #[test]
    fn successful_action_reports_success() {
        let action = RecoveryAction::new("noop", "does nothing", "true", vec![]);
        assert!(action.run());
    }

    #[test]
    fn failing_action_reports_failure() {
        let action = RecoveryAction::new("fail", "always fails", "false", vec![]);
        assert!(!action.run());
    }

    #[test]
    fn missing_program_reports_failure() {
        let action = RecoveryAction::new("ghost", "missing binary", "no-such-binary-7qz", vec![]);
        assert!(!action.run());
    }

    #[test]
    fn run_all_continues_past_failures() {
        let actions = vec![
            RecoveryAction::new("first", "fails", "false", vec![]),
            RecoveryAction::new("second", "succeeds", "true", vec![]),
        ];
        let outcomes = run_all(&actions);
        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].succeeded);
        assert!(outcomes[1].succeeded);
    }

    #[test]
    fn default_actions_are_named_and_ordered() {
        let target = SshTarget {
            host: "10.0.0.1".to_string(),
            port: 22,
        };
        let actions = default_actions(&target);
        let names: Vec<&str> = actions.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["fix-ownership", "restart-postgres", "restart-synapse"]);
    }
}
