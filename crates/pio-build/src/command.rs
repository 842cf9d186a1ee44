//! External command execution helpers.
//!
//! Every subcommand that shells out goes through [`run`], which echoes the
//! fully-constructed command line before executing it.

use anyhow::{bail, Context, Result};
use std::process::Command;
use tracing::debug;

/// Render a command as a single shell-style line.
pub fn render(cmd: &Command) -> String {
    let mut line = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

/// Run a command to completion, inheriting stdio.
///
/// The rendered command line is printed before execution. A non-zero exit
/// status becomes an error naming the failing command.
pub fn run(mut cmd: Command) -> Result<()> {
    let line = render(&cmd);
    println!("builder: executing {line}");
    debug!(command = %line, "Spawning external process");

    let status = cmd.status().with_context(|| {
        format!(
            "Failed to execute {} - is it installed?",
            cmd.get_program().to_string_lossy()
        )
    })?;

    if !status.success() {
        bail!("'{}' failed with status: {}", line, status);
    }

    Ok(())
}
