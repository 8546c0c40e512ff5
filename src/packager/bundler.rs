//! Bundler adapter
//!
//! The bundler is an external collaborator: it receives every entry point in
//! one call, writes `<working_dir>/<key>.bundle.js` per entry, and reports
//! errors and warnings as data rather than failing.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::{PackError, Result};

/// Progress callback: `(fraction 0..=1, phase label, optional detail)`.
pub type BundleProgress = Arc<dyn Fn(f64, &str, Option<&str>) + Send + Sync>;

/// One bundling pass over every script that still needs packaging.
#[derive(Debug, Clone)]
pub struct BundleRequest {
    pub working_dir: PathBuf,
    /// Module resolution search paths.
    pub search_paths: Vec<PathBuf>,
    pub minify: bool,
    /// Bundle key to absolute entry file.
    pub entries: BTreeMap<String, PathBuf>,
}

/// Diagnostics returned by the bundler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BundleReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl BundleReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

#[async_trait]
pub trait Bundler: Send + Sync {
    /// Bundle every entry. `Err` only when the bundler could not run at all.
    async fn bundle(&self, request: BundleRequest, progress: BundleProgress)
    -> Result<BundleReport>;
}

/// Runs an esbuild-compatible command line.
#[derive(Clone)]
pub struct CommandBundler {
    program: String,
    args: Vec<String>,
}

impl CommandBundler {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn command(&self, request: &BundleRequest) -> Result<Command> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--bundle")
            .arg("--platform=node")
            .arg(format!("--outdir={}", request.working_dir.display()));
        if request.minify {
            cmd.arg("--minify");
        }
        for (key, entry) in &request.entries {
            cmd.arg(format!("{key}.bundle={}", entry.display()));
        }
        if !request.search_paths.is_empty() {
            let node_path = std::env::join_paths(&request.search_paths)
                .map_err(|err| PackError::BundlerFailed(format!("invalid search path: {err}")))?;
            cmd.env("NODE_PATH", node_path);
        }
        cmd.current_dir(&request.working_dir);
        Ok(cmd)
    }
}

impl fmt::Debug for CommandBundler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBundler")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Bundler for CommandBundler {
    async fn bundle(
        &self,
        request: BundleRequest,
        progress: BundleProgress,
    ) -> Result<BundleReport> {
        progress(0.0, "Bundling", Some("compiling modules"));
        debug!(program = %self.program, entries = request.entries.len(), "running bundler");

        let output = self
            .command(&request)?
            .output()
            .await
            .map_err(|err| PackError::BundlerFailed(format!("{}: {err}", self.program)))?;

        progress(0.9, "Bundling", Some("writing bundles"));
        let mut report = parse_diagnostics(&String::from_utf8_lossy(&output.stderr));
        if !output.status.success() && report.errors.is_empty() {
            report
                .errors
                .push(format!("{} exited with {}", self.program, output.status));
        }
        progress(1.0, "Bundling", Some("done"));
        Ok(report)
    }
}

/// Pick esbuild-style `[ERROR]` / `[WARNING]` lines out of bundler output.
#[must_use]
pub fn parse_diagnostics(stderr: &str) -> BundleReport {
    let mut report = BundleReport::default();
    for line in stderr.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let lower = line.to_lowercase();
        if lower.contains("[error]") || lower.starts_with("error:") {
            report.errors.push(line.to_string());
        } else if lower.contains("[warning]") || lower.starts_with("warning:") {
            report.warnings.push(line.to_string());
        }
    }
    report
}
