//! Script packaging: descriptors in, one zip per script out

pub mod archive;
pub mod build;
pub mod bundler;
pub mod descriptor;
pub mod events;
pub mod flatten;
pub mod incremental;
pub mod pipeline;
pub mod progress;

pub use archive::{PackageManifest, build_archive};
pub use build::{BuildStep, CommandBuildStep, SkipBuild};
pub use bundler::{BundleProgress, BundleReport, BundleRequest, Bundler, CommandBundler};
pub use descriptor::{ArtifactLayout, ScriptDescriptor};
pub use events::{Events, PackageEvent};
pub use flatten::flatten;
pub use incremental::filter_changed;
pub use pipeline::{Diagnostic, PackageOptions, Packager, RunSummary, Severity};
pub use progress::{NoopProgress, ProgressSink, ProgressTracker};
