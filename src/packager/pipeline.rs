//! Packaging pipeline
//!
//! build → load descriptors → flatten → incremental filter → derive paths →
//! bundle (once, all scripts) → archive (concurrently) → persist descriptors.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::archive::build_archive;
use super::build::BuildStep;
use super::bundler::{BundleProgress, BundleReport, BundleRequest, Bundler};
use super::descriptor::{self, ArtifactLayout, ScriptDescriptor};
use super::events::{Events, PackageEvent};
use super::flatten::flatten;
use super::incremental::filter_changed;
use super::progress::{NoopProgress, ProgressSink, ProgressTracker};
use crate::error::{PackError, Result};

/// Inputs for one packaging run.
#[derive(Debug, Clone)]
pub struct PackageOptions {
    pub target_dir: PathBuf,
    /// Source selection handed to the build step.
    pub sources: Vec<String>,
    pub only_changed: bool,
    pub minify: bool,
    /// Module resolution search paths for the bundler.
    pub module_paths: Vec<PathBuf>,
}

impl PackageOptions {
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            sources: Vec::new(),
            only_changed: false,
            minify: false,
            module_paths: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A bundler diagnostic surfaced during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// What a successful run did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Archived scripts with their final descriptors, sorted by name.
    pub packaged: Vec<ScriptDescriptor>,
    /// Scripts skipped by the incremental filter.
    pub ignored: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunSummary {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.packaged.is_empty()
    }
}

/// Orchestrates one packaging run.
pub struct Packager {
    options: PackageOptions,
    build: Arc<dyn BuildStep>,
    bundler: Arc<dyn Bundler>,
    progress: Arc<dyn ProgressSink>,
    events: Events,
}

impl Packager {
    pub fn new(
        options: PackageOptions,
        build: Arc<dyn BuildStep>,
        bundler: Arc<dyn Bundler>,
    ) -> Self {
        Self {
            options,
            build,
            bundler,
            progress: Arc::new(NoopProgress),
            events: Events::new(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Register an observer for `ignore-package` / `create-package`.
    pub fn on_event<F>(&mut self, listener: F)
    where
        F: Fn(&PackageEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener);
    }

    #[must_use]
    pub const fn options(&self) -> &PackageOptions {
        &self.options
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let target = &self.options.target_dir;

        self.build.build(target, &self.options.sources).await?;

        let loaded = descriptor::load_all(target).await?;
        let flattened = flatten(&loaded);
        let candidates: Vec<String> = flattened.iter().map(|d| d.name.clone()).collect();

        let pending = filter_changed(flattened, self.options.only_changed, &self.events);
        let pending_names: HashSet<&str> = pending.iter().map(|d| d.name.as_str()).collect();
        let ignored: Vec<String> = candidates
            .iter()
            .filter(|name| !pending_names.contains(name.as_str()))
            .cloned()
            .collect();

        if pending.is_empty() {
            debug!(ignored = ignored.len(), "all archives up to date");
            return Ok(RunSummary {
                ignored,
                ..RunSummary::default()
            });
        }

        let layout = ArtifactLayout::new(target.clone());
        let scripts: Vec<ScriptDescriptor> = pending.into_iter().map(|d| layout.apply(d)).collect();
        let tracker = ProgressTracker::new(Arc::clone(&self.progress), scripts.len());

        let report = self.bundle(&layout, &scripts, &tracker).await?;
        let diagnostics = surface(&report);

        let (packaged, failed) = self.archive(scripts, &tracker).await?;
        // Failed scripts are written back too, without `archiveSize`.
        descriptor::store_all(&packaged).await?;
        descriptor::store_all(&failed).await?;

        if !failed.is_empty() {
            tracker.abandon(&format!("{} archive(s) failed", failed.len()));
            return Err(PackError::ArchivePhaseFailed {
                failed: failed.into_iter().map(|d| d.name).collect(),
            });
        }

        tracker.finish(&format!("Packaged {} script(s)", packaged.len()));
        info!(packaged = packaged.len(), ignored = ignored.len(), "packaging complete");
        Ok(RunSummary {
            packaged,
            ignored,
            diagnostics,
        })
    }

    async fn bundle(
        &self,
        layout: &ArtifactLayout,
        scripts: &[ScriptDescriptor],
        tracker: &ProgressTracker,
    ) -> Result<BundleReport> {
        let entries: BTreeMap<String, PathBuf> = scripts
            .iter()
            .map(|d| (d.bundle_key(), layout.entry_path(d)))
            .collect();
        let request = BundleRequest {
            working_dir: layout.target_dir().to_path_buf(),
            search_paths: self.options.module_paths.clone(),
            minify: self.options.minify,
            entries,
        };

        let sink = tracker.clone();
        let callback: BundleProgress =
            Arc::new(move |percent: f64, phase: &str, detail: Option<&str>| {
                sink.bundling(percent, phase, detail);
            });

        debug!(scripts = scripts.len(), "bundling");
        let report = self.bundler.bundle(request, callback).await?;
        tracker.bundling(1.0, "Bundling", None);
        Ok(report)
    }

    /// Archive every script concurrently. Failures do not cancel siblings.
    ///
    /// Returns `(archived, failed)`; failed descriptors carry no `archive_size`.
    async fn archive(
        &self,
        scripts: Vec<ScriptDescriptor>,
        tracker: &ProgressTracker,
    ) -> Result<(Vec<ScriptDescriptor>, Vec<ScriptDescriptor>)> {
        let mut jobs = JoinSet::new();
        for script in scripts {
            let progress = tracker.clone();
            let events = self.events.clone();
            jobs.spawn(async move {
                let result = build_archive(script.clone(), progress, events).await;
                (script, result)
            });
        }

        let mut packaged = Vec::new();
        let mut failed = Vec::new();
        while let Some(joined) = jobs.join_next().await {
            match joined? {
                (_, Ok(done)) => packaged.push(done),
                (script, Err(_)) => failed.push(script),
            }
        }
        packaged.sort_by(|a, b| a.name.cmp(&b.name));
        failed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok((packaged, failed))
    }
}

/// Log every bundler diagnostic once and collect them for the summary.
fn surface(report: &BundleReport) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::with_capacity(report.errors.len() + report.warnings.len());
    for message in &report.errors {
        error!(diagnostic = %message, "bundler error");
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            message: message.clone(),
        });
    }
    for message in &report.warnings {
        warn!(diagnostic = %message, "bundler warning");
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            message: message.clone(),
        });
    }
    diagnostics
}
