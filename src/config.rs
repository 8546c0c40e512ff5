use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PackError, Result};
use crate::packager::PackageOptions;

/// Project config file looked up in the working directory.
pub const PROJECT_CONFIG: &str = "scriptpack.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub package: PackageConfig,
    #[serde(default)]
    pub bundler: BundlerConfig,
    #[serde(default)]
    pub build: BuildConfig,
}

impl Config {
    pub fn load(explicit_path: Option<&Path>, project_root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("SCRIPTPACK_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            let patch = Self::load_patch(&path)?.ok_or_else(|| {
                PackError::MissingConfig(format!("config file {} not found", path.display()))
            })?;
            config.merge_patch(patch);
        } else if let Some(project) = Self::load_patch(&project_root.join(PROJECT_CONFIG))? {
            config.merge_patch(project);
        }

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Parse a TOML document on top of the defaults. No env overrides.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let patch: ConfigPatch =
            toml::from_str(raw).map_err(|err| PackError::Config(format!("parse config: {err}")))?;
        let mut config = Self::default();
        config.merge_patch(patch);
        Ok(config)
    }

    /// Pipeline options, with relative paths resolved against `project_root`.
    #[must_use]
    pub fn package_options(&self, project_root: &Path) -> PackageOptions {
        PackageOptions {
            target_dir: project_root.join(&self.package.target_dir),
            sources: self.package.sources.clone(),
            only_changed: self.package.only_changed,
            minify: self.package.minify,
            module_paths: self
                .package
                .module_paths
                .iter()
                .map(|path| project_root.join(path))
                .collect(),
        }
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| PackError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| PackError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.package {
            self.package.merge(patch);
        }
        if let Some(patch) = patch.bundler {
            self.bundler.merge(patch);
        }
        if let Some(patch) = patch.build {
            self.build.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_string("SCRIPTPACK_TARGET_DIR") {
            self.package.target_dir = PathBuf::from(value);
        }
        if let Some(value) = env_bool("SCRIPTPACK_MINIFY")? {
            self.package.minify = value;
        }
        if let Some(value) = env_bool("SCRIPTPACK_ONLY_CHANGED")? {
            self.package.only_changed = value;
        }
        if let Some(value) = env_string("SCRIPTPACK_BUNDLER") {
            if value.trim().is_empty() {
                return Err(PackError::Config(
                    "SCRIPTPACK_BUNDLER must not be empty".to_string(),
                ));
            }
            self.bundler.program = value;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    pub target_dir: PathBuf,
    pub sources: Vec<String>,
    #[serde(default)]
    pub minify: bool,
    #[serde(default)]
    pub only_changed: bool,
    pub module_paths: Vec<PathBuf>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            target_dir: PathBuf::from("dist"),
            sources: vec!["src/**/*.js".to_string()],
            minify: false,
            only_changed: false,
            module_paths: vec![PathBuf::from("node_modules")],
        }
    }
}

impl PackageConfig {
    fn merge(&mut self, patch: PackagePatch) {
        if let Some(value) = patch.target_dir {
            self.target_dir = value;
        }
        if let Some(values) = patch.sources {
            self.sources = values;
        }
        if let Some(value) = patch.minify {
            self.minify = value;
        }
        if let Some(value) = patch.only_changed {
            self.only_changed = value;
        }
        if let Some(values) = patch.module_paths {
            self.module_paths = values;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundlerConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            program: "esbuild".to_string(),
            args: Vec::new(),
        }
    }
}

impl BundlerConfig {
    fn merge(&mut self, patch: BundlerPatch) {
        if let Some(value) = patch.program {
            self.program = value;
        }
        if let Some(values) = patch.args {
            self.args = values;
        }
    }
}

/// Upstream build command. Without a program the build step is skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    pub program: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

impl BuildConfig {
    fn merge(&mut self, patch: BuildPatch) {
        if let Some(value) = patch.program {
            self.program = Some(value);
        }
        if let Some(values) = patch.args {
            self.args = values;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    pub package: Option<PackagePatch>,
    pub bundler: Option<BundlerPatch>,
    pub build: Option<BuildPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackagePatch {
    pub target_dir: Option<PathBuf>,
    pub sources: Option<Vec<String>>,
    pub minify: Option<bool>,
    pub only_changed: Option<bool>,
    pub module_paths: Option<Vec<PathBuf>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct BundlerPatch {
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct BuildPatch {
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_bool(key: &str) -> Result<Option<bool>> {
    match std::env::var(key) {
        Ok(value) => parse_bool(&value)
            .map(Some)
            .ok_or_else(|| PackError::Config(format!("invalid {key} value {value}"))),
        Err(_) => Ok(None),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
