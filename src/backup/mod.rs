//! Vault backups — timestamped copies with retention pruning.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Local;

use crate::errors::{MatrixUpError, Result};

/// Copy the encrypted vault into `backup_dir` under a timestamped name,
/// then prune that environment's backups down to `retention`.
///
/// Returns the path of the new backup.
pub fn backup_vault(
    vault_path: &Path,
    backup_dir: &Path,
    env_name: &str,
    retention: usize,
) -> Result<PathBuf> {
    if !vault_path.exists() {
        return Err(MatrixUpError::VaultNotFound(vault_path.to_path_buf()));
    }

    fs::create_dir_all(backup_dir)?;

    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let mut dest = backup_dir.join(format!("vault-{env_name}-{stamp}.yml"));

    // Several backups inside the same second get a numeric suffix
    // instead of overwriting each other.
    let mut counter = 1;
    while dest.exists() {
        dest = backup_dir.join(format!("vault-{env_name}-{stamp}-{counter}.yml"));
        counter += 1;
    }

    fs::copy(vault_path, &dest)?;
    prune_backups(backup_dir, env_name, retention)?;

    Ok(dest)
}

/// Delete this environment's oldest backups beyond `retention`.
/// Other environments' backups are never touched.
///
/// Returns how many files were removed.
pub fn prune_backups(backup_dir: &Path, env_name: &str, retention: usize) -> Result<usize> {
    let prefix = format!("vault-{env_name}-");

    let mut backups: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(backup_dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();
        if !name.starts_with(&prefix) || !name.ends_with(".yml") {
            continue;
        }
        let modified = entry
            .metadata()?
            .modified()
            .unwrap_or(SystemTime::UNIX_EPOCH);
        backups.push((modified, entry.path()));
    }

    if backups.len() <= retention {
        return Ok(0);
    }

    // Newest first; everything past `retention` goes.
    backups.sort_by(|a, b| b.cmp(a));

    let mut removed = 0;
    for (_, path) in backups.into_iter().skip(retention) {
        fs::remove_file(path)?;
        removed += 1;
    }

    Ok(removed)
}

/// List an environment's backups, newest first.
pub fn list_backups(backup_dir: &Path, env_name: &str) -> Result<Vec<PathBuf>> {
    if !backup_dir.exists() {
        return Ok(Vec::new());
    }

    let prefix = format!("vault-{env_name}-");
    let mut backups: Vec<(SystemTime, PathBuf)> = Vec::new();

    for entry in fs::read_dir(backup_dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();
        if !name.starts_with(&prefix) || !name.ends_with(".yml") {
            continue;
        }
        let modified = entry
            .metadata()?
            .modified()
            .unwrap_or(SystemTime::UNIX_EPOCH);
        backups.push((modified, entry.path()));
    }

    backups.sort_by(|a, b| b.cmp(a));
    Ok(backups.into_iter().map(|(_, p)| p).collect())
}
