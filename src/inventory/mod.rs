//! Inventory and group-variable file generation.
//!
//! The wizard answers become two YAML files per environment:
//! `hosts.yml` with host connection parameters, and `group_vars/all.yml`
//! with operational settings plus `{{ vault_* }}` references into the
//! encrypted vault.

use std::fs;
use std::path::Path;

use crate::config::Settings;
use crate::errors::Result;

/// Everything the configuration wizard collects.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_ip: String,
    pub ssh_port: u16,
    pub matrix_domain: String,
    pub element_domain: String,
    pub admin_email: String,
    pub enable_monitoring: bool,
    pub enable_turn: bool,
    pub enable_federation: bool,
    pub media_retention_days: u32,
}

impl ServerConfig {
    /// Render the `hosts.yml` inventory document.
    pub fn hosts_yaml(&self) -> String {
        format!(
            "---\n\
             all:\n\
             \x20 hosts:\n\
             \x20   matrix:\n\
             \x20     ansible_host: {ip}\n\
             \x20     ansible_port: {port}\n\
             \x20     ansible_user: root\n\
             \x20     ansible_python_interpreter: /usr/bin/python3\n",
            ip = self.server_ip,
            port = self.ssh_port,
        )
    }

    /// Render the `group_vars/all.yml` document.
    ///
    /// Secrets are never written here — only `{{ vault_* }}` references
    /// resolved by Ansible from the encrypted vault at run time.
    pub fn group_vars_yaml(&self) -> String {
        format!(
            "---\n\
             # Operational settings for the Matrix homeserver\n\
             matrix_domain: {matrix_domain}\n\
             element_domain: {element_domain}\n\
             admin_email: {admin_email}\n\
             enable_monitoring: {monitoring}\n\
             enable_turn: {turn}\n\
             enable_federation: {federation}\n\
             media_retention_days: {retention}\n\
             \n\
             # Secrets resolved from the encrypted vault\n\
             postgres_password: \"{{{{ vault_postgres_password }}}}\"\n\
             synapse_registration_shared_secret: \"{{{{ vault_synapse_registration_shared_secret }}}}\"\n\
             synapse_macaroon_secret_key: \"{{{{ vault_synapse_macaroon_secret_key }}}}\"\n\
             synapse_form_secret: \"{{{{ vault_synapse_form_secret }}}}\"\n\
             turn_static_auth_secret: \"{{{{ vault_turn_static_auth_secret }}}}\"\n\
             admin_password: \"{{{{ vault_admin_password }}}}\"\n\
             ssl_email: \"{{{{ vault_ssl_email }}}}\"\n",
            matrix_domain = self.matrix_domain,
            element_domain = self.element_domain,
            admin_email = self.admin_email,
            monitoring = self.enable_monitoring,
            turn = self.enable_turn,
            federation = self.enable_federation,
            retention = self.media_retention_days,
        )
    }

    /// Write `hosts.yml` and `group_vars/all.yml` for an environment,
    /// creating directories as needed.
    pub fn write(&self, settings: &Settings, project_dir: &Path, env_name: &str) -> Result<()> {
        let hosts_path = settings.hosts_path(project_dir, env_name);
        let group_vars_path = settings.group_vars_path(project_dir, env_name);

        if let Some(parent) = group_vars_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&hosts_path, self.hosts_yaml())?;
        fs::write(&group_vars_path, self.group_vars_yaml())?;
        Ok(())
    }
}

/// Read a single scalar value back out of a generated YAML file.
///
/// A full YAML parser is overkill for the flat documents this tool
/// writes: a line scan for `key: value` is enough and keeps the
/// dependency surface down. Quotes around the value are stripped.
pub fn read_yaml_scalar(path: &Path, key: &str) -> Option<String> {
    let contents = fs::read_to_string(path).ok()?;
    let prefix = format!("{key}:");

    for line in contents.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix(&prefix) {
            let value = rest.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}
