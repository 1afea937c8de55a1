//! Config module — project-level settings from `.matrixup.toml`.

pub mod settings;

pub use settings::Settings;
