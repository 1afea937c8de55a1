//! Pre-flight checks — read-only validation before a deploy.
//!
//! Every check has a name and a severity. Required failures block the
//! deploy; advisory failures are surfaced but don't. Checks never mutate
//! anything, on the controller or the target.

use std::net::ToSocketAddrs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Serialize;

use crate::ansible::{self, playbook};
use crate::errors::Result;

/// Minimum free disk space on the controller, in KiB (1 GiB).
const MIN_FREE_DISK_KIB: u64 = 1_048_576;

/// Minimum available memory on the controller, in KiB (512 MiB).
const MIN_AVAILABLE_MEM_KIB: u64 = 524_288;

/// How much a failed check matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Required,
    Advisory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

/// One check's outcome.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub severity: Severity,
    pub status: CheckStatus,
    pub detail: String,
}

impl CheckResult {
    fn pass(name: &str, severity: Severity, detail: &str) -> Self {
        Self {
            name: name.to_string(),
            severity,
            status: CheckStatus::Pass,
            detail: detail.to_string(),
        }
    }

    fn fail(name: &str, severity: Severity, detail: &str) -> Self {
        Self {
            name: name.to_string(),
            severity,
            status: CheckStatus::Fail,
            detail: detail.to_string(),
        }
    }

    fn skipped(name: &str, severity: Severity, detail: &str) -> Self {
        Self {
            name: name.to_string(),
            severity,
            status: CheckStatus::Skipped,
            detail: detail.to_string(),
        }
    }
}

/// All check outcomes from one pre-flight pass.
#[derive(Debug, Serialize)]
pub struct PreflightReport {
    pub results: Vec<CheckResult>,
}

impl PreflightReport {
    /// Number of Required checks that failed.
    pub fn failed_required(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.severity == Severity::Required && r.status == CheckStatus::Fail)
            .count()
    }

    /// (passed, failed, skipped) counts across all checks.
    pub fn counts(&self) -> (usize, usize, usize) {
        let mut counts = (0, 0, 0);
        for r in &self.results {
            match r.status {
                CheckStatus::Pass => counts.0 += 1,
                CheckStatus::Fail => counts.1 += 1,
                CheckStatus::Skipped => counts.2 += 1,
            }
        }
        counts
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::errors::MatrixUpError::SerializationError(e.to_string()))
    }
}

/// Everything the checks need to know about the run.
pub struct PreflightContext {
    pub project_dir: PathBuf,
    pub inventory_dir: PathBuf,
    pub hosts_path: PathBuf,
    pub vault_path: PathBuf,
    pub playbook_path: PathBuf,
    pub vault_password_file: Option<PathBuf>,
    /// From group_vars, for DNS resolution. `None` skips the check.
    pub matrix_domain: Option<String>,
    /// From the inventory, for ICMP ping. `None` skips the check.
    pub server_ip: Option<String>,
    /// Skip checks that need the network (ansible ping, DNS, ICMP).
    pub offline: bool,
}

/// Run the full check suite.
pub fn run_checks(ctx: &PreflightContext) -> PreflightReport {
    let mut results = Vec::new();

    // Required binaries come first: everything else shells out to them.
    for tool in ["ansible-playbook", "ansible-vault", "ssh"] {
        if ansible::binary_exists(tool) {
            results.push(CheckResult::pass(tool, Severity::Required, "found on PATH"));
        } else {
            results.push(CheckResult::fail(
                tool,
                Severity::Required,
                "not found — apt install ansible openssh-client",
            ));
        }
    }

    results.push(file_check(
        "inventory",
        &ctx.hosts_path,
        "run `matrixup init` to create it",
    ));
    results.push(vault_check(&ctx.vault_path));
    results.push(syntax_check(ctx));

    if ctx.offline {
        results.push(CheckResult::skipped(
            "ansible ping",
            Severity::Required,
            "--offline",
        ));
        results.push(CheckResult::skipped("sudo check", Severity::Advisory, "--offline"));
    } else {
        results.push(connectivity_check(ctx));
        results.push(sudo_check(ctx));
    }

    results.push(disk_space_check(&ctx.project_dir));
    results.push(memory_check());

    match (&ctx.matrix_domain, ctx.offline) {
        (Some(domain), false) => results.push(dns_check(domain)),
        _ => results.push(CheckResult::skipped(
            "dns resolution",
            Severity::Advisory,
            if ctx.offline { "--offline" } else { "domain unknown" },
        )),
    }

    match (&ctx.server_ip, ctx.offline) {
        (Some(ip), false) => results.push(icmp_check(ip)),
        _ => results.push(CheckResult::skipped(
            "icmp ping",
            Severity::Advisory,
            if ctx.offline { "--offline" } else { "server ip unknown" },
        )),
    }

    PreflightReport { results }
}

fn file_check(name: &str, path: &Path, hint: &str) -> CheckResult {
    if path.exists() {
        CheckResult::pass(name, Severity::Required, &path.display().to_string())
    } else {
        CheckResult::fail(
            name,
            Severity::Required,
            &format!("{} missing — {hint}", path.display()),
        )
    }
}

fn vault_check(path: &Path) -> CheckResult {
    let name = "encrypted vault";
    if !path.exists() {
        return CheckResult::fail(
            name,
            Severity::Required,
            &format!(
                "{} missing — run `matrixup secrets generate`",
                path.display()
            ),
        );
    }
    match crate::ansible::vault::has_vault_header(path) {
        Ok(true) => CheckResult::pass(name, Severity::Required, "vault header present"),
        Ok(false) => CheckResult::fail(
            name,
            Severity::Required,
            "file exists but is not encrypted — encrypt it before deploying",
        ),
        Err(e) => CheckResult::fail(name, Severity::Required, &e.to_string()),
    }
}

fn syntax_check(ctx: &PreflightContext) -> CheckResult {
    let name = "playbook syntax";
    if !ctx.playbook_path.exists() {
        return CheckResult::fail(
            name,
            Severity::Required,
            &format!("{} not found", ctx.playbook_path.display()),
        );
    }

    let mut invocation = playbook::PlaybookInvocation::new(&ctx.playbook_path, &ctx.inventory_dir);
    invocation.vault_password_file = ctx.vault_password_file.clone();

    match invocation.syntax_check() {
        Ok(()) => CheckResult::pass(name, Severity::Required, "syntax ok"),
        Err(e) => CheckResult::fail(name, Severity::Required, &e.to_string()),
    }
}

fn connectivity_check(ctx: &PreflightContext) -> CheckResult {
    let name = "ansible ping";
    if playbook::ping_host(&ctx.inventory_dir, ctx.vault_password_file.as_deref()) {
        CheckResult::pass(name, Severity::Required, "host reachable over SSH")
    } else {
        CheckResult::fail(
            name,
            Severity::Required,
            "host unreachable — check SSH access and inventory",
        )
    }
}

fn sudo_check(ctx: &PreflightContext) -> CheckResult {
    let name = "sudo check";
    if playbook::check_sudo(&ctx.inventory_dir, ctx.vault_password_file.as_deref()) {
        CheckResult::pass(name, Severity::Advisory, "passwordless sudo available")
    } else {
        CheckResult::fail(
            name,
            Severity::Advisory,
            "passwordless sudo unavailable — deploy may prompt",
        )
    }
}

/// Parse `df -Pk` output for the available KiB on the project dir's filesystem.
fn disk_space_check(project_dir: &Path) -> CheckResult {
    let name = "controller disk space";
    let output = Command::new("df")
        .arg("-Pk")
        .arg(project_dir)
        .stderr(Stdio::null())
        .output();

    let available_kib = output.ok().and_then(|out| {
        if !out.status.success() {
            return None;
        }
        let text = String::from_utf8_lossy(&out.stdout).to_string();
        let line = text.lines().nth(1)?;
        line.split_whitespace().nth(3)?.parse::<u64>().ok()
    });

    match available_kib {
        Some(kib) if kib >= MIN_FREE_DISK_KIB => CheckResult::pass(
            name,
            Severity::Advisory,
            &format!("{} MiB free", kib / 1024),
        ),
        Some(kib) => CheckResult::fail(
            name,
            Severity::Advisory,
            &format!("only {} MiB free — backups may fail", kib / 1024),
        ),
        None => CheckResult::skipped(name, Severity::Advisory, "df unavailable"),
    }
}

/// Read MemAvailable from /proc/meminfo. Skipped on platforms without it.
fn memory_check() -> CheckResult {
    let name = "controller memory";
    let available_kib = std::fs::read_to_string("/proc/meminfo")
        .ok()
        .and_then(|text| {
            text.lines()
                .find(|line| line.starts_with("MemAvailable:"))?
                .split_whitespace()
                .nth(1)?
                .parse::<u64>()
                .ok()
        });

    match available_kib {
        Some(kib) if kib >= MIN_AVAILABLE_MEM_KIB => CheckResult::pass(
            name,
            Severity::Advisory,
            &format!("{} MiB available", kib / 1024),
        ),
        Some(kib) => CheckResult::fail(
            name,
            Severity::Advisory,
            &format!("only {} MiB available", kib / 1024),
        ),
        None => CheckResult::skipped(name, Severity::Advisory, "meminfo unavailable"),
    }
}

fn dns_check(domain: &str) -> CheckResult {
    let name = "dns resolution";
    match (domain, 443u16).to_socket_addrs() {
        Ok(mut addrs) => match addrs.next() {
            Some(addr) => {
                CheckResult::pass(name, Severity::Advisory, &format!("{domain} → {}", addr.ip()))
            }
            None => CheckResult::fail(
                name,
                Severity::Advisory,
                &format!("{domain} resolved to nothing"),
            ),
        },
        Err(_) => CheckResult::fail(
            name,
            Severity::Advisory,
            &format!("{domain} does not resolve — check DNS records"),
        ),
    }
}

fn icmp_check(ip: &str) -> CheckResult {
    let name = "icmp ping";
    let reachable = Command::new("ping")
        .args(["-c", "1", "-W", "2", ip])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);

    if reachable {
        CheckResult::pass(name, Severity::Advisory, &format!("{ip} responds"))
    } else {
        CheckResult::fail(
            name,
            Severity::Advisory,
            &format!("{ip} does not respond to ping (may be firewalled)"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(severity: Severity, status: CheckStatus) -> CheckResult {
        CheckResult {
            name: "x".to_string(),
            severity,
            status,
            detail: String::new(),
        }
    }

    #[test]
    fn advisory_failures_do_not_count_as_required() {
        let report = PreflightReport {
            results: vec![
                result(Severity::Required, CheckStatus::Pass),
                result(Severity::Advisory, CheckStatus::Fail),
            ],
        };
        assert_eq!(report.failed_required(), 0);
        assert_eq!(report.counts(), (1, 1, 0));
    }

    #[test]
    fn required_failures_are_counted() {
        let report = PreflightReport {
            results: vec![
                result(Severity::Required, CheckStatus::Fail),
                result(Severity::Required, CheckStatus::Fail),
                result(Severity::Advisory, CheckStatus::Skipped),
            ],
        };
        assert_eq!(report.failed_required(), 2);
        assert_eq!(report.counts(), (0, 2, 1));
    }

    #[test]
    fn report_serializes_to_json() {
        let report = PreflightReport {
            results: vec![result(Severity::Required, CheckStatus::Pass)],
        };
        let json = report.to_json().unwrap();
        assert!(json.contains("\"status\": \"pass\""));
        assert!(json.contains("\"severity\": \"required\""));
    }

    #[test]
    fn missing_file_check_fails_with_hint() {
        let r = file_check("inventory", Path::new("/nonexistent/hosts.yml"), "run init");
        assert_eq!(r.status, CheckStatus::Fail);
        assert!(r.detail.contains("run init"));
    }

    #[test]
    fn disk_space_check_runs_on_controller() {
        // Whatever the free space is, the check must not panic and must
        // produce a Pass/Fail/Skipped with a detail message.
        let r = disk_space_check(Path::new("."));
        assert!(!r.detail.is_empty());
    }

    #[test]
    fn memory_check_runs_on_controller() {
        let r = memory_check();
        assert_eq!(r.severity, Severity::Advisory);
        assert!(!r.detail.is_empty());
    }
}
