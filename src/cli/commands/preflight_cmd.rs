//! `matrixup preflight` — standalone read-only checker.

use std::path::{Path, PathBuf};

use crate::cli::output;
use crate::cli::{project_dir, record_audit, resolve_password, Cli};
use crate::config::Settings;
use crate::errors::{MatrixUpError, Result};
use crate::inventory::read_yaml_scalar;
use crate::preflight::{self, PreflightContext};

/// Execute the `preflight` command.
pub fn execute(cli: &Cli, offline: bool, json: bool) -> Result<()> {
    let project = project_dir(cli)?;
    let settings = Settings::load(&project)?;

    let password_file = resolve_password(cli, &project).map(|r| r.path);
    let ctx = build_context(cli, &project, &settings, "site.yml", password_file, offline);
    let report = preflight::run_checks(&ctx);

    if json {
        println!("{}", report.to_json()?);
    } else {
        output::print_preflight_table(&report);
    }

    let failed = report.failed_required();
    record_audit(
        &project,
        &cli.env,
        "preflight",
        None,
        Some(&format!("failed_required={failed}")),
    );

    if failed > 0 {
        Err(MatrixUpError::PreflightFailed(failed))
    } else {
        Ok(())
    }
}

/// Assemble the check context from settings and generated files.
///
/// Shared with `deploy`, which checks whichever playbook it is about to
/// run. Callers resolve the vault password themselves so it is reported
/// and audited exactly once per run.
pub fn build_context(
    cli: &Cli,
    project: &Path,
    settings: &Settings,
    playbook: &str,
    vault_password_file: Option<PathBuf>,
    offline: bool,
) -> PreflightContext {
    let hosts_path = settings.hosts_path(project, &cli.env);
    let group_vars = settings.group_vars_path(project, &cli.env);

    PreflightContext {
        project_dir: project.to_path_buf(),
        inventory_dir: settings.env_dir(project, &cli.env),
        hosts_path: hosts_path.clone(),
        vault_path: settings.vault_path(project, &cli.env),
        playbook_path: settings.playbook_path(project, playbook),
        vault_password_file,
        matrix_domain: read_yaml_scalar(&group_vars, "matrix_domain"),
        server_ip: read_yaml_scalar(&hosts_path, "ansible_host"),
        offline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn context_checks_the_playbook_it_is_given() {
        let mut cli = Cli::parse_from(["matrixup", "preflight"]);
        cli.env = "production".to_string();
        let settings = Settings::default();
        let project = Path::new("/srv/matrix");

        let ctx = build_context(&cli, project, &settings, "maintenance.yml", None, true);
        assert_eq!(
            ctx.playbook_path,
            Path::new("/srv/matrix/playbooks/maintenance.yml")
        );
        assert!(ctx.vault_password_file.is_none());
    }
}
