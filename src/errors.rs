use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while provisioning.
#[derive(Debug, Error)]
pub enum MatrixUpError {
    #[error("Required tool '{tool}' not found on PATH — install it with: {hint}")]
    MissingDependency { tool: String, hint: String },

    #[error("Inventory not found at {0} — run `matrixup init` to create it")]
    InventoryNotFound(PathBuf),

    #[error("Encrypted vault not found at {0} — run `matrixup secrets generate` to create it")]
    VaultNotFound(PathBuf),

    #[error("Vault already exists at {0} (use --force to overwrite)")]
    VaultAlreadyExists(PathBuf),

    #[error("File at {0} is not an ansible-vault file — missing the $ANSIBLE_VAULT header")]
    InvalidVaultHeader(PathBuf),

    #[error("No vault password file found — create one with `matrixup secrets generate` or pass --vault-password-file")]
    VaultPasswordUnavailable,

    #[error("'{0}' is not a valid domain name")]
    InvalidDomain(String),

    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),

    #[error("'{0}' is not a valid IPv4 address")]
    InvalidIpv4(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    SerializationError(String),

    #[error("{tool} exited with code {code}")]
    ExternalToolFailed { tool: String, code: i32 },

    #[error("Playbook run failed after {attempts} attempt(s)")]
    PlaybookFailed { attempts: u32 },

    #[error("{0} pre-flight check(s) failed")]
    PreflightFailed(usize),

    #[error("Vault validation failed: {0}")]
    VaultValidationFailed(String),

    #[error("{0}")]
    CommandFailed(String),

    #[error("Cancelled by user")]
    UserCancelled,

    #[error("Audit log error: {0}")]
    AuditError(String),
}

impl MatrixUpError {
    /// Exit code for this error: 130 for a user interrupt, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UserCancelled => 130,
            _ => 1,
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, MatrixUpError>;
