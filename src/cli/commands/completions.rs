//! `matrixup completions` — generate shell completion scripts.
//!
//! The shell name is parsed by clap itself, so `matrixup completions
//! bash > ~/.bash_completion.d/matrixup` just works and unknown shells
//! are rejected with the usual clap error.

use std::io;

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::Cli;
use crate::errors::Result;

/// Write the completion script for `shell` to stdout.
pub fn execute(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "matrixup", &mut io::stdout());
    Ok(())
}
