//! Router service restart hook
//!
//! claude-code-router only reads its config at startup, so after a routing
//! change the service is stopped and picks up the new file on next use.
//! Failures here never undo the configuration change already written.

use std::fmt;
use std::io::ErrorKind;
use std::process::Command;

#[derive(Debug)]
pub enum RestartError {
    /// Nothing configured to run
    NoCommand,
    /// Program not on PATH
    NotInstalled(String),
    /// Program ran and exited unsuccessfully
    Failed { program: String, detail: String },
}

impl fmt::Display for RestartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCommand => write!(f, "No restart command configured"),
            Self::NotInstalled(program) => write!(
                f,
                "{} command not found. Please ensure it is installed.",
                program
            ),
            Self::Failed { program, detail } => {
                write!(f, "Failed to issue {} command: {}", program, detail)
            }
        }
    }
}

impl std::error::Error for RestartError {}

/// Run the restart command, capturing its output
pub fn run_restart_hook(command: &[String]) -> Result<(), RestartError> {
    let (program, args) = command.split_first().ok_or(RestartError::NoCommand)?;

    tracing::debug!(program = %program, ?args, "Running restart hook");
    let output = Command::new(program).args(args).output().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            RestartError::NotInstalled(program.clone())
        } else {
            RestartError::Failed {
                program: program.clone(),
                detail: e.to_string(),
            }
        }
    })?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let detail = match stderr.trim() {
        "" => output.status.to_string(),
        msg => format!("{} ({})", output.status, msg),
    };
    Err(RestartError::Failed {
        program: program.clone(),
        detail,
    })
}
