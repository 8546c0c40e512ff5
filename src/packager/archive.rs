//! Archive assembly
//!
//! Every script becomes one zip holding exactly two entries: a generated
//! `package.json` and the compiled bundle stored under the entry script's
//! basename. Entries use a fixed timestamp and permissions so identical
//! inputs give byte-identical archives.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::descriptor::ScriptDescriptor;
use super::events::{Events, PackageEvent};
use super::progress::ProgressTracker;
use crate::error::{PackError, Result};

/// Name of the manifest entry inside every archive.
pub const MANIFEST_ENTRY: &str = "package.json";
pub const MANIFEST_VERSION: &str = "1.0.0";
pub const MANIFEST_LICENSE: &str = "MIT";

const ARCHIVE_LABEL: &str = "Creating archives";

/// Generated `package.json`. Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    pub description: String,
    pub main: String,
    pub license: String,
}

impl PackageManifest {
    #[must_use]
    pub fn for_script(descriptor: &ScriptDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            version: MANIFEST_VERSION.to_string(),
            description: format!("{} script package", descriptor.name),
            main: descriptor.main_basename(),
            license: MANIFEST_LICENSE.to_string(),
        }
    }

    /// Pretty JSON with 2-space indentation.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Build the archive for one finalized descriptor.
///
/// On success the returned descriptor carries `archive_size` and a
/// `create-package` event has been emitted. On failure nothing is emitted,
/// and no archive is left at `zip_file`.
pub async fn build_archive(
    descriptor: ScriptDescriptor,
    progress: ProgressTracker,
    events: Events,
) -> Result<ScriptDescriptor> {
    let name = descriptor.name.clone();
    let job = descriptor.clone();
    let written = tokio::task::spawn_blocking(move || write_archive(&job, &progress))
        .await
        .map_err(PackError::from)
        .and_then(|result| result);

    match written {
        Ok(size) => {
            let finalized = descriptor.with_archive_size(size);
            info!(script = %name, bytes = size, "archive created");
            events.emit(&PackageEvent::CreatePackage(finalized.clone()));
            Ok(finalized)
        }
        Err(err) => {
            error!(script = %name, error = %err, "archive failed");
            Err(PackError::ArchiveFailed {
                name,
                reason: err.to_string(),
            })
        }
    }
}

/// Write the zip next to its destination and move it into place.
///
/// Returns the final archive size in bytes.
pub fn write_archive(descriptor: &ScriptDescriptor, progress: &ProgressTracker) -> Result<u64> {
    let zip_path = required(descriptor, descriptor.zip_file.as_deref(), "zipFile")?;
    let bundle_path = required(descriptor, descriptor.bundle_path.as_deref(), "bundlePath")?;
    if let Some(parent) = zip_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let partial = partial_path(zip_path);
    let result = write_entries(&partial, bundle_path, descriptor, progress)
        .and_then(|size| fs::rename(&partial, zip_path).map(|()| size).map_err(Into::into));

    if result.is_err() {
        // Neither a half-written file nor a stale archive may pass as current.
        let _ = fs::remove_file(&partial);
        let _ = fs::remove_file(zip_path);
    }
    result
}

fn write_entries(
    partial: &Path,
    bundle_path: &Path,
    descriptor: &ScriptDescriptor,
    progress: &ProgressTracker,
) -> Result<u64> {
    let manifest = PackageManifest::for_script(descriptor).to_json()?;
    let mut bundle = File::open(bundle_path)?;

    let mut zip = ZipWriter::new(File::create(partial)?);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644)
        .last_modified_time(DateTime::default());

    zip.start_file(MANIFEST_ENTRY, options)?;
    zip.write_all(manifest.as_bytes())?;
    progress.tick(ARCHIVE_LABEL);

    zip.start_file(descriptor.main_basename(), options)?;
    io::copy(&mut bundle, &mut zip)?;
    progress.tick(ARCHIVE_LABEL);

    let mut file = zip.finish()?;
    file.flush()?;
    file.sync_all()?;
    Ok(file.metadata()?.len())
}

fn required<'a>(
    descriptor: &ScriptDescriptor,
    value: Option<&'a Path>,
    field: &str,
) -> Result<&'a Path> {
    value.ok_or_else(|| PackError::DescriptorInvalid {
        path: descriptor
            .info_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(&descriptor.main)),
        reason: format!("`{field}` not derived before archiving"),
    })
}

fn partial_path(zip_path: &Path) -> PathBuf {
    let mut name = zip_path.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}
