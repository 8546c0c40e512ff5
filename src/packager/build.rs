//! Upstream build step
//!
//! Produces the compiled entry scripts and one `.info.json` descriptor per
//! script under the target directory. Packaging never starts unless it
//! succeeds.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{PackError, Result};

#[async_trait]
pub trait BuildStep: Send + Sync {
    async fn build(&self, target_dir: &Path, sources: &[String]) -> Result<()>;
}

/// Assume the target directory is already current.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipBuild;

#[async_trait]
impl BuildStep for SkipBuild {
    async fn build(&self, target_dir: &Path, _sources: &[String]) -> Result<()> {
        debug!(dir = %target_dir.display(), "build step skipped");
        Ok(())
    }
}

/// Run an external build program: `<program> <args> --target-dir <dir> <sources>...`.
#[derive(Debug, Clone)]
pub struct CommandBuildStep {
    program: String,
    args: Vec<String>,
}

impl CommandBuildStep {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl BuildStep for CommandBuildStep {
    async fn build(&self, target_dir: &Path, sources: &[String]) -> Result<()> {
        debug!(program = %self.program, dir = %target_dir.display(), "running build step");
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg("--target-dir")
            .arg(target_dir)
            .args(sources)
            .status()
            .await
            .map_err(|err| PackError::BuildFailed(format!("{}: {err}", self.program)))?;

        if status.success() {
            Ok(())
        } else {
            Err(PackError::BuildFailed(format!(
                "{} exited with {status}",
                self.program
            )))
        }
    }
}
