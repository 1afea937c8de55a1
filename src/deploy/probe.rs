//! Target classification for smart deploys.
//!
//! Before a smart deploy, the target is probed over SSH for an existing
//! Synapse service unit and config directory. Probes are best-effort: if
//! SSH itself fails, the target is treated as fresh and the playbook is
//! left to sort it out.

use std::process::{Command, Stdio};

use super::recovery::SshTarget;

/// What kind of run this deploy is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployMode {
    /// No Synapse installation detected.
    Fresh,
    /// Service running with config in place — routine update.
    Update,
    /// Config present but the service is missing or failed.
    Recovery,
}

impl DeployMode {
    /// Does this mode warrant a pre-deploy backup of the target?
    pub fn wants_backup(&self) -> bool {
        matches!(self, Self::Update | Self::Recovery)
    }
}

impl std::fmt::Display for DeployMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Fresh => "fresh install",
            Self::Update => "update",
            Self::Recovery => "recovery",
        };
        f.write_str(s)
    }
}

/// Probe interface so classification is testable without a live host.
pub trait TargetProbe {
    /// Is `matrix-synapse.service` active? `None` when the probe failed.
    fn service_active(&self) -> Option<bool>;

    /// Does `/etc/matrix-synapse` exist? `None` when the probe failed.
    fn config_dir_exists(&self) -> Option<bool>;
}

/// Classify the target from probe results.
pub fn classify(probe: &dyn TargetProbe) -> DeployMode {
    match probe.config_dir_exists() {
        Some(true) => match probe.service_active() {
            Some(true) => DeployMode::Update,
            // Service missing, failed, or unprobeable with config present.
            Some(false) | None => DeployMode::Recovery,
        },
        Some(false) | None => DeployMode::Fresh,
    }
}

/// Live probe over SSH.
pub struct SshProbe {
    target: SshTarget,
}

impl SshProbe {
    pub fn new(target: SshTarget) -> Self {
        Self { target }
    }

    fn remote_exit_ok(&self, remote_cmd: &str) -> Option<bool> {
        let status = Command::new("ssh")
            .args(self.target.ssh_args(remote_cmd))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .ok()?;

        // ssh exits 255 when the connection itself failed; anything else
        // is the remote command's exit code.
        match status.code() {
            Some(255) | None => None,
            Some(0) => Some(true),
            Some(_) => Some(false),
        }
    }
}

impl TargetProbe for SshProbe {
    fn service_active(&self) -> Option<bool> {
        self.remote_exit_ok("systemctl is-active --quiet matrix-synapse")
    }

    fn config_dir_exists(&self) -> Option<bool> {
        self.remote_exit_ok("test -d /etc/matrix-synapse")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeProbe {
        service: Option<bool>,
        config: Option<bool>,
    }

    impl TargetProbe for FakeProbe {
        fn service_active(&self) -> Option<bool> {
            self.service
        }

        fn config_dir_exists(&self) -> Option<bool> {
            self.config
        }
    }

    #[test]
    fn no_config_means_fresh() {
        let probe = FakeProbe {
            service: Some(false),
            config: Some(false),
        };
        assert_eq!(classify(&probe), DeployMode::Fresh);
    }

    #[test]
    fn unreachable_host_means_fresh() {
        let probe = FakeProbe {
            service: None,
            config: None,
        };
        assert_eq!(classify(&probe), DeployMode::Fresh);
    }

    #[test]
    fn active_service_with_config_means_update() {
        let probe = FakeProbe {
            service: Some(true),
            config: Some(true),
        };
        assert_eq!(classify(&probe), DeployMode::Update);
    }

    #[test]
    fn dead_service_with_config_means_recovery() {
        let probe = FakeProbe {
            service: Some(false),
            config: Some(true),
        };
        assert_eq!(classify(&probe), DeployMode::Recovery);
    }

    #[test]
    fn only_update_and_recovery_want_backup() {
        assert!(!DeployMode::Fresh.wants_backup());
        assert!(DeployMode::Update.wants_backup());
        assert!(DeployMode::Recovery.wants_backup());
    }
}
