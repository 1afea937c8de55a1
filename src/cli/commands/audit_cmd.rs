//! `matrixup audit` — display the operation history.

use chrono::{DateTime, Duration, Utc};

use crate::audit::{state_dir, AuditLog};
use crate::cli::output;
use crate::cli::{project_dir, Cli};
use crate::errors::{MatrixUpError, Result};

pub fn execute(cli: &Cli, last: usize, since: Option<&str>) -> Result<()> {
    let project = project_dir(cli)?;

    let audit = AuditLog::open(&state_dir(&project))
        .ok_or_else(|| MatrixUpError::AuditError("failed to open audit database".into()))?;

    let cutoff = since.map(cutoff_from).transpose()?;
    let entries = audit.recent(last, cutoff)?;
    output::print_audit_table(&entries);

    Ok(())
}

/// Turn a relative age like `7d`, `24h`, or `30m` into an absolute cutoff.
fn cutoff_from(age: &str) -> Result<DateTime<Utc>> {
    let age = age.trim();
    let invalid = || {
        MatrixUpError::CommandFailed(format!(
            "cannot parse '{age}' as an age (expected forms: 7d, 24h, 30m)"
        ))
    };

    if age.len() < 2 {
        return Err(invalid());
    }

    let (count, unit) = age.split_at(age.len() - 1);
    let count: i64 = count.parse().map_err(|_| invalid())?;

    let span = match unit {
        "d" => Duration::days(count),
        "h" => Duration::hours(count),
        "m" => Duration::minutes(count),
        _ => return Err(invalid()),
    };

    Ok(Utc::now() - span)
}
