pub mod ansible;
pub mod backup;
pub mod cli;
pub mod config;
pub mod deploy;
pub mod errors;
pub mod inventory;
pub mod preflight;
pub mod secrets;
pub mod validate;

#[cfg(feature = "audit-log")]
pub mod audit;
