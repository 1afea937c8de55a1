//! Styled terminal output.
//!
//! Every command prints through these helpers, so symbols and colors
//! stay uniform: successes on stdout, errors and warnings on stderr.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::preflight::{CheckStatus, PreflightReport, Severity};

/// Green check mark, stdout.
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Red cross, stderr.
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Yellow warning sign, stderr.
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Blue info sign, stdout.
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Dimmed follow-up hint.
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print the pre-flight results table plus a summary line.
pub fn print_preflight_table(report: &PreflightReport) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Check", "Severity", "Result", "Detail"]);

    for r in &report.results {
        let status = match r.status {
            CheckStatus::Pass => style("pass").green().to_string(),
            CheckStatus::Fail => style("FAIL").red().bold().to_string(),
            CheckStatus::Skipped => style("skipped").dim().to_string(),
        };
        let severity = match r.severity {
            Severity::Required => "required",
            Severity::Advisory => "advisory",
        };
        table.add_row(vec![
            r.name.clone(),
            severity.to_string(),
            status,
            r.detail.clone(),
        ]);
    }

    println!("{table}");

    let (passed, failed, skipped) = report.counts();
    println!(
        "{} passed, {} failed, {} skipped",
        style(passed).green(),
        if failed > 0 {
            style(failed).red().bold().to_string()
        } else {
            failed.to_string()
        },
        style(skipped).dim(),
    );
}

/// Print a table of vault backups (newest first).
pub fn print_backup_table(backups: &[std::path::PathBuf]) {
    if backups.is_empty() {
        info("No backups yet.");
        tip("Run `matrixup vault backup` to create one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Backup"]);

    for (i, path) in backups.iter().enumerate() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        table.add_row(vec![(i + 1).to_string(), name]);
    }

    println!("{table}");
}

/// Print a table of audit entries (Time, Operation, Env, Target, Details).
#[cfg(feature = "audit-log")]
pub fn print_audit_table(entries: &[crate::audit::AuditEntry]) {
    if entries.is_empty() {
        info("No audit entries yet.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Operation", "Env", "Target", "Details"]);

    for e in entries {
        table.add_row(vec![
            e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            e.operation.clone(),
            e.environment.clone(),
            e.target.clone().unwrap_or_default(),
            e.details.clone().unwrap_or_default(),
        ]);
    }

    println!("{table}");
}
