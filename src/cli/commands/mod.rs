//! One module per subcommand.

#[cfg(feature = "audit-log")]
pub mod audit_cmd;
pub mod completions;
pub mod deploy;
pub mod init;
pub mod preflight_cmd;
pub mod secrets_generate;
pub mod vault_cmd;
pub mod version;
