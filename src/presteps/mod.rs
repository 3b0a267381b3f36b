//! Pre-build commands
//!
//! External generators (type checking, metadata, icon manifests) run before
//! the bundle, one at a time, with the terminal passed straight through.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::info;

use crate::error::PreStepError;

/// Run every step in order, stopping at the first failure
pub async fn run_all(steps: &[Vec<String>], cwd: &Path) -> Result<(), PreStepError> {
    for step in steps {
        run(step, cwd).await?;
    }
    Ok(())
}

async fn run(step: &[String], cwd: &Path) -> Result<(), PreStepError> {
    let command = step.join(" ");
    let Some((program, args)) = step.split_first() else {
        return Ok(());
    };

    info!("Running {}", command);

    let status = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|source| PreStepError::Spawn {
            command: command.clone(),
            source,
        })?;

    if !status.success() {
        return Err(PreStepError::Failed { command, status });
    }

    Ok(())
}
