//! Script descriptors and their on-disk store
//!
//! A descriptor is the `.info.json` record the build step writes for every
//! packagable script. The packager reads them all at run start, derives the
//! artifact paths, and writes the processed ones back at run end.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{PackError, Result};

/// Suffix of persisted descriptor files.
pub const INFO_SUFFIX: &str = ".info.json";
/// Suffix of bundler output files.
pub const BUNDLE_SUFFIX: &str = ".bundle.js";
/// Suffix of packaged archives.
pub const ARCHIVE_SUFFIX: &str = ".zip";

/// One packagable script.
///
/// Fields after `requires` are derived by [`ArtifactLayout::apply`] and are
/// absent until then. Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDescriptor {
    #[serde(default)]
    pub name: String,
    pub main: String,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dirname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_file: Option<PathBuf>,
}

impl ScriptDescriptor {
    pub fn new(main: impl Into<String>) -> Self {
        let main = main.into();
        Self {
            name: script_name(&main),
            main,
            is_static: false,
            requires: Vec::new(),
            dirname: None,
            bundle_name: None,
            bundle_path: None,
            archive_name: None,
            zip_file: None,
            archive_size: None,
            info_file: None,
        }
    }

    #[must_use]
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    #[must_use]
    pub fn with_requires<I, S>(mut self, requires: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires = requires.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_zip_file(mut self, zip_file: Option<PathBuf>) -> Self {
        self.zip_file = zip_file;
        self
    }

    #[must_use]
    pub fn with_info_file(mut self, info_file: impl Into<PathBuf>) -> Self {
        self.info_file = Some(info_file.into());
        self
    }

    /// Mark the descriptor as successfully archived.
    #[must_use]
    pub fn with_archive_size(mut self, size: u64) -> Self {
        self.archive_size = Some(size);
        self
    }

    /// Basename of the entry script, used inside the archive.
    #[must_use]
    pub fn main_basename(&self) -> String {
        Path::new(&self.main)
            .file_name()
            .map_or_else(|| self.main.clone(), |n| n.to_string_lossy().into_owned())
    }

    /// Key handed to the bundler; the bundle lands at `<workdir>/<key>.bundle.js`.
    #[must_use]
    pub fn bundle_key(&self) -> String {
        match self.dirname.as_deref() {
            Some(dir) if !dir.is_empty() => format!("{dir}/{}", self.name),
            _ => self.name.clone(),
        }
    }
}

/// Script name derived from the entry file: basename without extension.
#[must_use]
pub fn script_name(main: &str) -> String {
    Path::new(main)
        .file_stem()
        .map_or_else(|| main.to_string(), |s| s.to_string_lossy().into_owned())
}

/// Normalize a relative script path so `./a.js` and `a.js` compare equal.
#[must_use]
pub fn normalize_script_path(path: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.last().is_none_or(|last| last == "..") {
                    parts.push("..".to_string());
                } else {
                    parts.pop();
                }
            }
            other => parts.push(other.as_os_str().to_string_lossy().into_owned()),
        }
    }
    parts.join("/")
}

/// Deterministic artifact placement under a target directory.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    target_dir: PathBuf,
}

impl ArtifactLayout {
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
        }
    }

    #[must_use]
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Absolute path of the compiled entry script the bundler starts from.
    #[must_use]
    pub fn entry_path(&self, descriptor: &ScriptDescriptor) -> PathBuf {
        self.target_dir.join(&descriptor.main)
    }

    /// Return the descriptor with every derived field filled in.
    ///
    /// Static scripts sit directly in the target directory; every other
    /// script gets a directory named after itself. A descriptor read from
    /// disk keeps its `info_file` so it is written back where it was found.
    #[must_use]
    pub fn apply(&self, descriptor: ScriptDescriptor) -> ScriptDescriptor {
        let name = script_name(&descriptor.main);
        let dirname = if descriptor.is_static {
            String::new()
        } else {
            name.clone()
        };
        let dir = self.target_dir.join(&dirname);
        let bundle_name = format!("{name}{BUNDLE_SUFFIX}");
        let archive_name = format!("{name}{ARCHIVE_SUFFIX}");

        ScriptDescriptor {
            bundle_path: Some(dir.join(&bundle_name)),
            zip_file: Some(dir.join(&archive_name)),
            info_file: descriptor
                .info_file
                .clone()
                .or_else(|| Some(dir.join(format!("{name}{INFO_SUFFIX}")))),
            bundle_name: Some(bundle_name),
            archive_name: Some(archive_name),
            dirname: Some(dirname),
            archive_size: None,
            name,
            ..descriptor
        }
    }
}

/// Find every descriptor file under `target_dir`, sorted by path.
///
/// An unreadable directory fails the scan instead of hiding descriptors.
pub fn discover(target_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(target_dir).follow_links(false) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file()
            && entry.file_name().to_string_lossy().ends_with(INFO_SUFFIX)
        {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

/// Parse one descriptor file. The descriptor remembers where it came from.
///
/// `name` is always derived from `main`; a stored value is ignored.
pub async fn read_descriptor(path: PathBuf) -> Result<ScriptDescriptor> {
    let raw = tokio::fs::read_to_string(&path).await?;
    let mut descriptor: ScriptDescriptor =
        serde_json::from_str(&raw).map_err(|err| PackError::DescriptorInvalid {
            path: path.clone(),
            reason: err.to_string(),
        })?;

    if descriptor.main.trim().is_empty() {
        return Err(PackError::DescriptorInvalid {
            path,
            reason: "missing entry script (`main`)".to_string(),
        });
    }
    descriptor.name = script_name(&descriptor.main);
    if descriptor.info_file.is_none() {
        descriptor.info_file = Some(path);
    }
    Ok(descriptor)
}

/// Load every descriptor under `target_dir` concurrently.
///
/// The result is sorted by name; duplicate names are rejected.
pub async fn load_all(target_dir: &Path) -> Result<Vec<ScriptDescriptor>> {
    let paths = discover(target_dir)?;
    debug!(count = paths.len(), dir = %target_dir.display(), "loading descriptors");

    let mut reads = JoinSet::new();
    for path in paths {
        reads.spawn(async move {
            let descriptor = read_descriptor(path.clone()).await;
            (path, descriptor)
        });
    }

    let mut loaded = Vec::new();
    while let Some(joined) = reads.join_next().await {
        let (path, descriptor) = joined?;
        loaded.push((path, descriptor?));
    }
    loaded.sort_by(|a, b| a.0.cmp(&b.0));

    let mut seen: HashMap<String, PathBuf> = HashMap::new();
    for (path, descriptor) in &loaded {
        if let Some(first) = seen.insert(descriptor.name.clone(), path.clone()) {
            return Err(PackError::DuplicateScript {
                name: descriptor.name.clone(),
                first,
                second: path.clone(),
            });
        }
    }

    let mut descriptors: Vec<ScriptDescriptor> = loaded.into_iter().map(|(_, d)| d).collect();
    descriptors.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(descriptors)
}

/// Persist one descriptor to its `info_file` with stable 2-space JSON.
pub async fn write_descriptor(descriptor: &ScriptDescriptor) -> Result<()> {
    let path = descriptor
        .info_file
        .as_ref()
        .ok_or_else(|| PackError::DescriptorInvalid {
            path: PathBuf::from(&descriptor.main),
            reason: "no info file location".to_string(),
        })?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut json = serde_json::to_string_pretty(descriptor)?;
    json.push('\n');
    tokio::fs::write(path, json).await?;
    Ok(())
}

/// Persist all descriptors concurrently; each owns a distinct file.
pub async fn store_all(descriptors: &[ScriptDescriptor]) -> Result<()> {
    let mut writes = JoinSet::new();
    for descriptor in descriptors.iter().cloned() {
        writes.spawn(async move { write_descriptor(&descriptor).await });
    }
    while let Some(joined) = writes.join_next().await {
        joined??;
    }
    Ok(())
}
