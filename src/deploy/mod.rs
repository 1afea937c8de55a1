//! Deploy orchestration — bounded retry around `ansible-playbook`.
//!
//! This module provides:
//! - Target classification for smart deploys (`probe`)
//! - Named recovery actions run between retries (`recovery`)
//! - The retry loop itself (`run_with_retry`)
//! - Best-effort pre-deploy backups of the target host
//!
//! The retry loop is linear and bounded: one initial attempt plus at
//! most `max_retries` retries, a fixed backoff between attempts, and the
//! recovery actions run once per failed attempt. No jitter, no circuit
//! breaking — idempotency is the playbook's responsibility.

pub mod probe;
pub mod recovery;

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use chrono::Local;

use crate::ansible::playbook::PlaybookInvocation;
use crate::cli::output;
use crate::config::Settings;
use crate::errors::Result;

pub use probe::{classify, DeployMode, SshProbe, TargetProbe};
pub use recovery::{default_actions, RecoveryAction, RecoveryOutcome, SshTarget};

/// How many times and how fast to retry a failing playbook.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the initial attempt (2 → 3 invocations total).
    pub max_retries: u32,
    /// Fixed wait between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_retries: settings.retry_cap,
            backoff: Duration::from_secs(settings.retry_backoff_secs),
        }
    }

    /// Policy that never retries — plain (non-smart) deploys.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }
}

/// Anything that can run the playbook once. The production impl shells
/// out to `ansible-playbook`; tests substitute a counter.
pub trait PlaybookRunner {
    fn run_playbook(&mut self) -> Result<()>;
}

impl PlaybookRunner for PlaybookInvocation {
    fn run_playbook(&mut self) -> Result<()> {
        self.run()
    }
}

/// What a deploy run did, attempt by attempt.
#[derive(Debug)]
pub struct DeployReport {
    /// Total playbook invocations (1 initial + retries).
    pub attempts: u32,
    /// Recovery actions that ran, in order, across all retries.
    pub recovery_outcomes: Vec<RecoveryOutcome>,
    pub succeeded: bool,
}

/// Run the playbook with bounded retries and named recovery between attempts.
pub fn run_with_retry(
    runner: &mut dyn PlaybookRunner,
    actions: &[RecoveryAction],
    policy: &RetryPolicy,
) -> DeployReport {
    let total_attempts = policy.max_retries + 1;
    let mut recovery_outcomes = Vec::new();

    for attempt in 1..=total_attempts {
        if attempt > 1 {
            output::info(&format!(
                "Retrying in {}s (attempt {attempt}/{total_attempts})",
                policy.backoff.as_secs()
            ));
            std::thread::sleep(policy.backoff);
            recovery_outcomes.extend(recovery::run_all(actions));
        }

        match runner.run_playbook() {
            Ok(()) => {
                return DeployReport {
                    attempts: attempt,
                    recovery_outcomes,
                    succeeded: true,
                };
            }
            Err(e) => {
                output::warning(&format!("Playbook attempt {attempt} failed: {e}"));
            }
        }
    }

    DeployReport {
        attempts: total_attempts,
        recovery_outcomes,
        succeeded: false,
    }
}

/// Best-effort backup of the target before an update/recovery run:
/// config tarball plus a full database dump, each streamed over SSH
/// into a timestamped local directory.
///
/// Failures are reported as warnings and never block the deploy.
pub fn backup_target(target: &SshTarget, backup_root: &Path) -> Result<Vec<RecoveryOutcome>> {
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let dir = backup_root.join(format!("predeploy-{stamp}"));
    fs::create_dir_all(&dir)?;

    let jobs: [(&str, &str, &str); 2] = [
        (
            "config-tarball",
            "tar czf - /etc/matrix-synapse 2>/dev/null",
            "matrix-synapse-etc.tar.gz",
        ),
        (
            "database-dump",
            "sudo -u postgres pg_dumpall 2>/dev/null",
            "pg_dumpall.sql",
        ),
    ];

    let mut outcomes = Vec::with_capacity(jobs.len());
    for (name, remote_cmd, filename) in jobs {
        let succeeded = stream_remote(target, remote_cmd, &dir.join(filename));
        if succeeded {
            output::success(&format!("Backed up {name} to {}", dir.display()));
        } else {
            output::warning(&format!("Backup of {name} failed, continuing"));
        }
        outcomes.push(RecoveryOutcome {
            name: name.to_string(),
            succeeded,
        });
    }

    Ok(outcomes)
}

/// Run a remote command and write its stdout to a local file.
fn stream_remote(target: &SshTarget, remote_cmd: &str, local_path: &Path) -> bool {
    let output = match Command::new("ssh")
        .args(target.ssh_args(remote_cmd))
        .stderr(Stdio::null())
        .output()
    {
        Ok(out) => out,
        Err(_) => return false,
    };

    if !output.status.success() || output.stdout.is_empty() {
        return false;
    }

    fs::write(local_path, &output.stdout).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MatrixUpError;

    /// Fails a fixed number of times, then succeeds. Counts invocations.
    struct FlakyRunner {
        failures_remaining: u32,
        invocations: u32,
    }

    impl FlakyRunner {
        fn new(failures: u32) -> Self {
            Self {
                failures_remaining: failures,
                invocations: 0,
            }
        }
    }

    impl PlaybookRunner for FlakyRunner {
        fn run_playbook(&mut self) -> Result<()> {
            self.invocations += 1;
            if self.failures_remaining > 0 {
                self.failures_remaining -= 1;
                Err(MatrixUpError::ExternalToolFailed {
                    tool: "ansible-playbook".to_string(),
                    code: 2,
                })
            } else {
                Ok(())
            }
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            backoff: Duration::ZERO,
        }
    }

    #[test]
    fn succeeds_first_try_without_recovery() {
        let mut runner = FlakyRunner::new(0);
        let report = run_with_retry(&mut runner, &[], &fast_policy());
        assert!(report.succeeded);
        assert_eq!(report.attempts, 1);
        assert_eq!(runner.invocations, 1);
        assert!(report.recovery_outcomes.is_empty());
    }

    #[test]
    fn two_failures_then_success_takes_three_invocations() {
        let mut runner = FlakyRunner::new(2);
        let report = run_with_retry(&mut runner, &[], &fast_policy());
        assert!(report.succeeded);
        assert_eq!(report.attempts, 3);
        assert_eq!(runner.invocations, 3);
    }

    #[test]
    fn persistent_failure_stops_after_three_invocations() {
        let mut runner = FlakyRunner::new(u32::MAX);
        let report = run_with_retry(&mut runner, &[], &fast_policy());
        assert!(!report.succeeded);
        assert_eq!(report.attempts, 3);
        assert_eq!(runner.invocations, 3);
    }

    #[test]
    fn recovery_runs_once_per_retry() {
        let actions = vec![RecoveryAction::new("noop", "does nothing", "true", vec![])];
        let mut runner = FlakyRunner::new(u32::MAX);
        let report = run_with_retry(&mut runner, &actions, &fast_policy());
        // Two retries, one action each.
        assert_eq!(report.recovery_outcomes.len(), 2);
        assert!(report.recovery_outcomes.iter().all(|o| o.succeeded));
    }

    #[test]
    fn zero_retry_policy_runs_exactly_once() {
        let mut runner = FlakyRunner::new(u32::MAX);
        let report = run_with_retry(&mut runner, &[], &RetryPolicy::none());
        assert!(!report.succeeded);
        assert_eq!(runner.invocations, 1);
    }

    #[test]
    fn policy_from_settings_reads_cap_and_backoff() {
        let settings = Settings {
            retry_cap: 4,
            retry_backoff_secs: 7,
            ..Settings::default()
        };
        let policy = RetryPolicy::from_settings(&settings);
        assert_eq!(policy.max_retries, 4);
        assert_eq!(policy.backoff, Duration::from_secs(7));
    }
}
