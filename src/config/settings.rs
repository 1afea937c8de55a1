use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{MatrixUpError, Result};

/// Project-level configuration read from `.matrixup.toml`.
///
/// Every field carries a default, so a project with no config file
/// still gets a working setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Which environment to use when none is specified (e.g. "production").
    #[serde(default = "default_environment")]
    pub default_environment: String,

    /// Directory (relative to project root) holding per-environment inventories.
    #[serde(default = "default_inventory_dir")]
    pub inventory_dir: String,

    /// Directory (relative to project root) holding playbooks.
    #[serde(default = "default_playbook_dir")]
    pub playbook_dir: String,

    /// Directory (relative to project root) for vault backups.
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,

    /// Maximum number of playbook retries after the initial attempt (default: 2).
    #[serde(default = "default_retry_cap")]
    pub retry_cap: u32,

    /// Seconds to wait between playbook attempts (default: 10).
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,

    /// How many timestamped vault backups to keep per environment (default: 10).
    #[serde(default = "default_backup_retention")]
    pub backup_retention: usize,
}


fn default_environment() -> String {
    "production".to_string()
}

fn default_inventory_dir() -> String {
    "inventory".to_string()
}

fn default_playbook_dir() -> String {
    "playbooks".to_string()
}

fn default_backup_dir() -> String {
    "backups".to_string()
}

fn default_retry_cap() -> u32 {
    2
}

fn default_retry_backoff_secs() -> u64 {
    10
}

fn default_backup_retention() -> usize {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_environment: default_environment(),
            inventory_dir: default_inventory_dir(),
            playbook_dir: default_playbook_dir(),
            backup_dir: default_backup_dir(),
            retry_cap: default_retry_cap(),
            retry_backoff_secs: default_retry_backoff_secs(),
            backup_retention: default_backup_retention(),
        }
    }
}

impl Settings {
    const FILE_NAME: &'static str = ".matrixup.toml";

    /// Read `<project_dir>/.matrixup.toml`. A missing file yields the
    /// defaults; a file that fails to parse is a hard error rather than a
    /// silent fallback.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            MatrixUpError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Directory holding the inventory for a given environment.
    ///
    /// Example: `project_dir/inventory/production`
    pub fn env_dir(&self, project_dir: &Path, env_name: &str) -> PathBuf {
        project_dir.join(&self.inventory_dir).join(env_name)
    }

    /// Full path to the hosts file for an environment.
    ///
    /// Example: `project_dir/inventory/production/hosts.yml`
    pub fn hosts_path(&self, project_dir: &Path, env_name: &str) -> PathBuf {
        self.env_dir(project_dir, env_name).join("hosts.yml")
    }

    /// Full path to the group variables file for an environment.
    pub fn group_vars_path(&self, project_dir: &Path, env_name: &str) -> PathBuf {
        self.env_dir(project_dir, env_name)
            .join("group_vars")
            .join("all.yml")
    }

    /// Full path to the encrypted vault file for an environment.
    ///
    /// Example: `project_dir/inventory/production/group_vars/vault.yml`
    pub fn vault_path(&self, project_dir: &Path, env_name: &str) -> PathBuf {
        self.env_dir(project_dir, env_name)
            .join("group_vars")
            .join("vault.yml")
    }

    /// Full path to a playbook by name.
    pub fn playbook_path(&self, project_dir: &Path, playbook: &str) -> PathBuf {
        project_dir.join(&self.playbook_dir).join(playbook)
    }

    /// Directory where vault backups are stored.
    pub fn vault_backup_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.backup_dir).join("vault")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.default_environment, "production");
        assert_eq!(s.inventory_dir, "inventory");
        assert_eq!(s.retry_cap, 2);
        assert_eq!(s.retry_backoff_secs, 10);
        assert_eq!(s.backup_retention, 10);
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.default_environment, "production");
    }

    #[test]
    fn config_file_overrides_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
default_environment = "staging"
inventory_dir = "envs"
retry_cap = 5
retry_backoff_secs = 1
backup_retention = 3
"#;
        fs::write(tmp.path().join(".matrixup.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.default_environment, "staging");
        assert_eq!(settings.inventory_dir, "envs");
        assert_eq!(settings.retry_cap, 5);
        assert_eq!(settings.retry_backoff_secs, 1);
        assert_eq!(settings.backup_retention, 3);
    }

    #[test]
    fn partial_config_keeps_remaining_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = "default_environment = \"staging\"\n";
        fs::write(tmp.path().join(".matrixup.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.default_environment, "staging");
        assert_eq!(settings.playbook_dir, "playbooks");
        assert_eq!(settings.retry_cap, 2);
    }

    #[test]
    fn unparseable_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".matrixup.toml"), "not valid {{toml").unwrap();

        let result = Settings::load(tmp.path());
        assert!(result.is_err());
    }

    #[test]
    fn paths_follow_inventory_layout() {
        let s = Settings::default();
        let project = Path::new("/srv/matrix");
        assert_eq!(
            s.hosts_path(project, "production"),
            PathBuf::from("/srv/matrix/inventory/production/hosts.yml")
        );
        assert_eq!(
            s.vault_path(project, "production"),
            PathBuf::from("/srv/matrix/inventory/production/group_vars/vault.yml")
        );
        assert_eq!(
            s.playbook_path(project, "site.yml"),
            PathBuf::from("/srv/matrix/playbooks/site.yml")
        );
    }

    #[test]
    fn paths_respect_custom_dirs() {
        let s = Settings {
            inventory_dir: "envs".to_string(),
            backup_dir: "archive".to_string(),
            ..Settings::default()
        };
        let project = Path::new("/srv/matrix");
        assert_eq!(
            s.group_vars_path(project, "staging"),
            PathBuf::from("/srv/matrix/envs/staging/group_vars/all.yml")
        );
        assert_eq!(
            s.vault_backup_dir(project),
            PathBuf::from("/srv/matrix/archive/vault")
        );
    }
}
