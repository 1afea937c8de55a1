//! Input validation for wizard answers and CLI flags.
//!
//! Domains and emails are checked against fixed patterns; IPv4 addresses
//! additionally get an octet range check. Interactive flows re-prompt on
//! a validation failure, non-interactive flows abort with the error.

use std::sync::OnceLock;

use regex::Regex;

use crate::errors::{MatrixUpError, Result};

fn domain_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}$")
            .expect("domain regex is valid")
    })
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9]([A-Za-z0-9.-]*[A-Za-z0-9])?\.[A-Za-z]{2,}$")
            .expect("email regex is valid")
    })
}

fn ipv4_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,3}(\.\d{1,3}){3}$").expect("ipv4 regex is valid"))
}

/// Validate a fully-qualified domain name (e.g. `matrix.example.com`).
pub fn validate_domain(value: &str) -> Result<()> {
    if value.len() <= 253 && domain_re().is_match(value) {
        Ok(())
    } else {
        Err(MatrixUpError::InvalidDomain(value.to_string()))
    }
}

/// Validate an email address (used for Let's Encrypt registration).
pub fn validate_email(value: &str) -> Result<()> {
    if email_re().is_match(value) {
        Ok(())
    } else {
        Err(MatrixUpError::InvalidEmail(value.to_string()))
    }
}

/// Validate an IPv4 address, including the 0-255 range of each octet.
pub fn validate_ipv4(value: &str) -> Result<()> {
    if !ipv4_re().is_match(value) {
        return Err(MatrixUpError::InvalidIpv4(value.to_string()));
    }

    for octet in value.split('.') {
        let n: u16 = octet
            .parse()
            .map_err(|_| MatrixUpError::InvalidIpv4(value.to_string()))?;
        if n > 255 {
            return Err(MatrixUpError::InvalidIpv4(value.to_string()));
        }
    }

    Ok(())
}

/// Validate an SSH port. Clap and the wizard already bound the value to
/// `u16`; only port 0 slips through both.
pub fn validate_port(port: u16) -> Result<()> {
    if port == 0 {
        return Err(MatrixUpError::ConfigError(
            "port 0 is not a usable SSH port (1-65535)".into(),
        ));
    }
    Ok(())
}
