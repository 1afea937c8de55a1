//! `matrixup deploy` — orchestrated `ansible-playbook` run.
//!
//! Plain mode is a single invocation behind pre-flight checks and a
//! confirmation prompt. `--smart` additionally classifies the target,
//! backs it up when it already carries an installation, and retries
//! failures with named recovery actions between attempts.

use zeroize::Zeroizing;

use crate::ansible::password;
use crate::ansible::{playbook, playbook::PlaybookInvocation};
use crate::cli::commands::preflight_cmd;
use crate::cli::output;
use crate::cli::{confirm, project_dir, record_audit, resolve_password, Cli};
use crate::config::Settings;
use crate::deploy::{self, DeployMode, RetryPolicy, SshProbe, SshTarget};
use crate::errors::{MatrixUpError, Result};
use crate::inventory::read_yaml_scalar;

/// Flags for one deploy run.
pub struct DeployFlags {
    pub playbook: String,
    pub dry_run: bool,
    pub verbose: bool,
    pub tags: Option<String>,
    pub skip_preflight: bool,
    pub yes: bool,
    pub smart: bool,
}

/// Execute the `deploy` command.
pub fn execute(cli: &Cli, flags: &DeployFlags) -> Result<()> {
    let project = project_dir(cli)?;
    let settings = Settings::load(&project)?;

    let playbook_path = settings.playbook_path(&project, &flags.playbook);
    let inventory_dir = settings.env_dir(&project, &cli.env);
    let hosts_path = settings.hosts_path(&project, &cli.env);

    if !hosts_path.exists() {
        return Err(MatrixUpError::InventoryNotFound(hosts_path));
    }

    playbook::ensure_installed()?;

    // Retries re-invoke ansible-playbook, and --ask-vault-pass would
    // prompt on every attempt. When nothing resolves in smart mode, the
    // password is typed once and held in a scoped temp file that is
    // removed when the run ends.
    let mut temp_password = None;
    let password_file = match resolve_password(cli, &project).map(|r| r.path) {
        Some(path) => Some(path),
        // Unattended runs must not hang on an ansible password prompt.
        None if flags.yes => return Err(MatrixUpError::VaultPasswordUnavailable),
        None if flags.smart && !flags.dry_run => {
            let typed = Zeroizing::new(
                dialoguer::Password::new()
                    .with_prompt("Vault password")
                    .interact()
                    .map_err(|_| MatrixUpError::UserCancelled)?,
            );
            let file = password::write_temp_password(&typed)?;
            let path = file.path().to_path_buf();
            temp_password = Some(file);
            Some(path)
        }
        None => None,
    };

    // 1. Pre-flight, unless explicitly skipped.
    if flags.skip_preflight {
        output::warning("Skipping pre-flight checks (--skip-preflight)");
    } else {
        let ctx = preflight_cmd::build_context(
            cli,
            &project,
            &settings,
            &flags.playbook,
            password_file.clone(),
            false,
        );
        let report = crate::preflight::run_checks(&ctx);
        output::print_preflight_table(&report);

        let failed = report.failed_required();
        if failed > 0 {
            return Err(MatrixUpError::PreflightFailed(failed));
        }
    }

    // 2. Smart mode: classify the target and back it up if needed.
    let target = ssh_target(&hosts_path);
    let mode = if flags.smart {
        let mode = match &target {
            Some(t) => deploy::classify(&SshProbe::new(t.clone())),
            None => DeployMode::Fresh,
        };
        output::info(&format!("Target classified as: {mode}"));

        if mode.wants_backup() && !flags.dry_run {
            if let Some(t) = &target {
                output::info("Taking a pre-deploy backup of the target (best effort)");
                let outcomes = deploy::backup_target(t, &project.join(&settings.backup_dir))?;
                for o in &outcomes {
                    record_audit(
                        &project,
                        &cli.env,
                        "predeploy-backup",
                        Some(&o.name),
                        Some(if o.succeeded { "ok" } else { "failed" }),
                    );
                }
            }
        }
        Some(mode)
    } else {
        None
    };

    // 3. Confirmation.
    if !flags.yes && !flags.dry_run {
        let host = target
            .as_ref()
            .map(|t| t.host.clone())
            .unwrap_or_else(|| "unknown host".to_string());
        let proceed = confirm(
            &format!(
                "Run playbook '{}' against '{}' ({host})?",
                flags.playbook, cli.env
            ),
            false,
        )?;
        if !proceed {
            return Err(MatrixUpError::UserCancelled);
        }
    }

    // 4. Build the invocation.
    let mut invocation = PlaybookInvocation::new(&playbook_path, &inventory_dir);
    invocation.vault_password_file = password_file;
    invocation.check = flags.dry_run;
    invocation.verbose = flags.verbose;
    invocation.tags = flags.tags.clone();

    // 5. Retry policy and recovery actions only apply in smart mode;
    //    dry runs never retry, there is nothing to repair.
    let (policy, actions) = if flags.smart && !flags.dry_run {
        let actions = target
            .as_ref()
            .map(deploy::default_actions)
            .unwrap_or_default();
        (RetryPolicy::from_settings(&settings), actions)
    } else {
        (RetryPolicy::none(), Vec::new())
    };

    let report = deploy::run_with_retry(&mut invocation, &actions, &policy);
    drop(temp_password);

    for outcome in &report.recovery_outcomes {
        record_audit(
            &project,
            &cli.env,
            "recovery-action",
            Some(&outcome.name),
            Some(if outcome.succeeded { "ok" } else { "failed" }),
        );
    }

    let mode_label = mode.map(|m| m.to_string()).unwrap_or_else(|| "plain".into());
    record_audit(
        &project,
        &cli.env,
        "deploy",
        Some(&flags.playbook),
        Some(&format!(
            "mode={mode_label} attempts={} success={}",
            report.attempts, report.succeeded
        )),
    );

    if report.succeeded {
        if flags.dry_run {
            output::success("Dry run complete — no changes were applied.");
        } else {
            output::success(&format!(
                "Deploy complete after {} attempt(s).",
                report.attempts
            ));
            output::tip("Run `matrixup preflight` any time to re-check the server.");
        }
        Ok(())
    } else {
        Err(MatrixUpError::PlaybookFailed {
            attempts: report.attempts,
        })
    }
}

/// Recover the SSH target from the generated hosts file.
fn ssh_target(hosts_path: &std::path::Path) -> Option<SshTarget> {
    let host = read_yaml_scalar(hosts_path, "ansible_host")?;
    let port = read_yaml_scalar(hosts_path, "ansible_port")
        .and_then(|p| p.parse().ok())
        .unwrap_or(22);
    Some(SshTarget { host, port })
}
