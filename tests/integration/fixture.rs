use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use zip::ZipArchive;

use scriptpack::packager::{
    BuildStep, BundleProgress, BundleReport, BundleRequest, Bundler, PackageEvent,
    PackageOptions, Packager, ScriptDescriptor,
};
use scriptpack::{PackError, Result};

/// A target directory seeded with compiled scripts and descriptors.
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn target(&self) -> &Path {
        self.dir.path()
    }

    /// Write `<main>` and a static descriptor next to it.
    pub fn add_static(&self, main: &str, requires: &[&str]) -> PathBuf {
        self.add(ScriptDescriptor::new(main).with_static(true), requires, "")
    }

    /// Write `<main>` and a descriptor under `<name>/`.
    pub fn add_regular(&self, main: &str, requires: &[&str]) -> PathBuf {
        let name = scriptpack::packager::descriptor::script_name(main);
        self.add(ScriptDescriptor::new(main), requires, &name)
    }

    fn add(&self, descriptor: ScriptDescriptor, requires: &[&str], dir: &str) -> PathBuf {
        let entry = self.target().join(&descriptor.main);
        std::fs::create_dir_all(entry.parent().unwrap()).unwrap();
        std::fs::write(&entry, format!("// {}\n", descriptor.main)).unwrap();

        let info = self
            .target()
            .join(dir)
            .join(format!("{}.info.json", descriptor.name));
        std::fs::create_dir_all(info.parent().unwrap()).unwrap();
        let json = serde_json::json!({
            "name": descriptor.name,
            "main": descriptor.main,
            "isStatic": descriptor.is_static,
            "requires": requires,
        });
        std::fs::write(&info, serde_json::to_string_pretty(&json).unwrap()).unwrap();
        info
    }

    pub fn read_info(&self, path: &Path) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    pub fn options(&self) -> PackageOptions {
        PackageOptions::new(self.target())
    }
}

/// Read every entry of a zip into `(name, contents)`, in archive order.
pub fn zip_entries(path: &Path) -> Vec<(String, String)> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut contents = String::new();
            file.read_to_string(&mut contents).unwrap();
            (file.name().to_string(), contents)
        })
        .collect()
}

// =============================================================================
// Fakes
// =============================================================================

/// Build step that records its invocations and can be told to fail.
#[derive(Default)]
pub struct FakeBuild {
    pub calls: Mutex<Vec<(PathBuf, Vec<String>)>>,
    pub fail: bool,
}

impl FakeBuild {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl BuildStep for FakeBuild {
    async fn build(&self, target_dir: &Path, sources: &[String]) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((target_dir.to_path_buf(), sources.to_vec()));
        if self.fail {
            return Err(PackError::BuildFailed("compile error".to_string()));
        }
        Ok(())
    }
}

/// Bundler that copies each entry to `<workdir>/<key>.bundle.js`.
#[derive(Default)]
pub struct FakeBundler {
    pub requests: Mutex<Vec<BundleRequest>>,
    pub warnings: Vec<String>,
    /// Keys whose bundle is not written (simulates a broken entry).
    pub skip: HashSet<String>,
}

impl FakeBundler {
    pub fn with_warnings(warnings: &[&str]) -> Self {
        Self {
            warnings: warnings.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn skipping(keys: &[&str]) -> Self {
        Self {
            skip: keys.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn keys(&self, call: usize) -> Vec<String> {
        self.requests.lock().unwrap()[call]
            .entries
            .keys()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Bundler for FakeBundler {
    async fn bundle(&self, request: BundleRequest, progress: BundleProgress) -> Result<BundleReport> {
        progress(0.0, "Bundling", Some("start"));
        let mut errors = Vec::new();
        for (key, entry) in &request.entries {
            if self.skip.contains(key) {
                errors.push(format!("[ERROR] cannot bundle {key}"));
                continue;
            }
            let source = std::fs::read_to_string(entry)?;
            let out = request.working_dir.join(format!("{key}.bundle.js"));
            std::fs::create_dir_all(out.parent().unwrap())?;
            std::fs::write(out, format!("/* bundled */\n{source}"))?;
        }
        progress(0.5, "Bundling", Some("half"));
        self.requests.lock().unwrap().push(request);
        Ok(BundleReport {
            errors,
            warnings: self.warnings.clone(),
        })
    }
}

pub type EventLog = Arc<Mutex<Vec<PackageEvent>>>;

pub fn packager(
    fixture: &Fixture,
    build: Arc<FakeBuild>,
    bundler: Arc<FakeBundler>,
) -> (Packager, EventLog) {
    packager_with(fixture.options(), build, bundler)
}

pub fn packager_with(
    options: PackageOptions,
    build: Arc<FakeBuild>,
    bundler: Arc<FakeBundler>,
) -> (Packager, EventLog) {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let mut packager = Packager::new(options, build, bundler);
    packager.on_event(move |event| sink.lock().unwrap().push(event.clone()));
    (packager, log)
}

pub fn event_names(log: &EventLog) -> Vec<(String, String)> {
    let mut names: Vec<(String, String)> = log
        .lock()
        .unwrap()
        .iter()
        .map(|e| (e.name().to_string(), e.descriptor().name.clone()))
        .collect();
    names.sort();
    names
}

// =============================================================================
// Log capture
// =============================================================================

/// Shared buffer a `fmt` subscriber writes into.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Route this thread's tracing output into a buffer until the guard drops.
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    (buffer, tracing::subscriber::set_default(subscriber))
}
