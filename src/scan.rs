//! Descriptor discovery and manifest generation.
//!
//! Stage 1 of the generation pipeline. Walks a descriptor root, loads every
//! class descriptor, and validates the whole set against the configuration
//! before anything is written.
//!
//! ## Directory Structure
//!
//! ```text
//! descriptors/                     # Descriptor root
//! ├── interop.toml                 # Generator configuration (optional)
//! ├── MagickImage.toml             # One class per file
//! ├── MagickFormatInfo.json        # JSON works too
//! └── Settings/                    # Subdirectories mirror into the output
//!     └── MagickSettings.toml
//! ```
//!
//! ## Output
//!
//! Produces a [`Manifest`] holding the resolved configuration and every
//! class descriptor with its relative source path. Entries are ordered by
//! path so the manifest, and everything generated from it, is stable across
//! hosts and runs.
//!
//! ## Validation
//!
//! Scanning fails on the first descriptor that does not parse, and then on
//! any model error (unknown types, duplicate classes, reserved argument
//! names, ...). A manifest that comes out of [`scan`] always builds a model.

use crate::config::{self, CONFIG_FILENAME, GeneratorConfig};
use crate::descriptor::{self, ClassSpec, DescriptorError};
use crate::model::{Model, ModelError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("{path}: {source}")]
    Descriptor {
        path: PathBuf,
        source: DescriptorError,
    },
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
    #[error("Descriptor root not found: {0}")]
    MissingRoot(PathBuf),
}

/// Manifest output from the scan stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub config: GeneratorConfig,
    pub classes: Vec<ClassEntry>,
}

/// One descriptor file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassEntry {
    /// Path relative to the descriptor root, `/`-separated.
    pub source_path: String,
    /// Directory the emitted files go to, relative to the output root.
    /// Empty for descriptors at the root.
    pub output_dir: String,
    pub descriptor: ClassSpec,
}

impl Manifest {
    /// Validate the manifest into a model.
    pub fn model(&self) -> Result<Model, ModelError> {
        let specs: Vec<ClassSpec> = self.classes.iter().map(|c| c.descriptor.clone()).collect();
        Model::build(self.config.clone(), &specs)
    }

    /// Entry for a class by name.
    pub fn entry(&self, class: &str) -> Option<&ClassEntry> {
        self.classes.iter().find(|c| c.descriptor.name == class)
    }
}

pub fn scan(root: &Path) -> Result<Manifest, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::MissingRoot(root.to_path_buf()));
    }
    let config = config::load_config(root)?;

    let mut classes = Vec::new();
    for path in collect_descriptors(root)? {
        let descriptor = ClassSpec::load(&path).map_err(|source| ScanError::Descriptor {
            path: path.clone(),
            source,
        })?;
        let relative = path.strip_prefix(root).unwrap_or(&path);
        tracing::debug!(path = %relative.display(), class = %descriptor.name, "loaded descriptor");
        classes.push(ClassEntry {
            source_path: slash_path(relative),
            output_dir: relative.parent().map(slash_path).unwrap_or_default(),
            descriptor,
        });
    }

    let manifest = Manifest { config, classes };
    manifest.model()?;
    tracing::info!(classes = manifest.classes.len(), root = %root.display(), "scan complete");
    Ok(manifest)
}

/// Descriptor files under `root`, sorted by path. Hidden entries and the
/// configuration file are skipped.
fn collect_descriptors(root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut paths = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if entry.depth() == 1 && entry.file_name() == CONFIG_FILENAME {
            continue;
        }
        let is_descriptor = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(descriptor::is_descriptor_extension);
        if is_descriptor {
            paths.push(path.to_path_buf());
        }
    }
    Ok(paths)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn scan_fixture_descriptors() {
        let tmp = setup_fixtures();
        let manifest = scan(tmp.path()).unwrap();
        assert_eq!(
            class_names(&manifest),
            vec![
                "MagickColor",
                "MagickFormatInfo",
                "MagickImage",
                "MagickImageCollection",
                "PixelChannels",
                "PixelCollection",
                "ResourceLimits",
                "MagickSettings",
            ]
        );
    }

    #[test]
    fn subdirectories_become_output_dirs() {
        let tmp = setup_fixtures();
        let manifest = scan(tmp.path()).unwrap();
        let settings = find_entry(&manifest, "MagickSettings");
        assert_eq!(settings.source_path, "Settings/MagickSettings.toml");
        assert_eq!(settings.output_dir, "Settings");
        assert_eq!(find_entry(&manifest, "MagickImage").output_dir, "");
    }

    #[test]
    fn config_file_is_not_a_descriptor() {
        let tmp = setup_fixtures();
        let manifest = scan(tmp.path()).unwrap();
        assert!(
            manifest
                .classes
                .iter()
                .all(|c| !c.source_path.ends_with(CONFIG_FILENAME))
        );
        assert_eq!(manifest.config.namespace, "ImageMagick");
        assert_eq!(manifest.config.license_header.len(), 3);
    }

    #[test]
    fn json_descriptor_is_loaded() {
        let tmp = setup_fixtures();
        let manifest = scan(tmp.path()).unwrap();
        let info = find_entry(&manifest, "MagickFormatInfo");
        assert!(info.source_path.ends_with(".json"));
        assert!(info.descriptor.no_constructor);
    }

    #[test]
    fn other_files_are_ignored() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("README.md"), "# notes").unwrap();
        fs::write(tmp.path().join("A.toml"), "name = \"A\"\ninstance = true\n").unwrap();
        fs::create_dir(tmp.path().join(".hidden")).unwrap();
        fs::write(tmp.path().join(".hidden/B.toml"), "not = valid").unwrap();

        let manifest = scan(tmp.path()).unwrap();
        assert_eq!(class_names(&manifest), vec!["A"]);
    }

    #[test]
    fn parse_error_names_the_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("Broken.toml"), "name = \"Broken\"\nbogus = 1\n").unwrap();
        let err = scan(tmp.path()).unwrap_err();
        assert!(matches!(err, ScanError::Descriptor { .. }));
        assert!(err.to_string().contains("Broken.toml"));
    }

    #[test]
    fn model_errors_fail_the_scan() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("A.toml"),
            "name = \"A\"\ninstance = true\n[[properties]]\nname = \"Color\"\ntype = \"Unknown\"\n",
        )
        .unwrap();
        let err = scan(tmp.path()).unwrap_err();
        assert!(matches!(err, ScanError::Model(ModelError::UnmappedType { .. })));
    }

    #[test]
    fn duplicate_class_across_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("A.toml"), "name = \"A\"\n").unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/A.json"), r#"{"name": "A"}"#).unwrap();
        let err = scan(tmp.path()).unwrap_err();
        assert!(matches!(err, ScanError::Model(ModelError::DuplicateClass(_))));
    }

    #[test]
    fn missing_root() {
        let tmp = TempDir::new().unwrap();
        let err = scan(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, ScanError::MissingRoot(_)));
    }

    #[test]
    fn manifest_survives_json() {
        let tmp = setup_fixtures();
        let manifest = scan(tmp.path()).unwrap();
        let json = serde_json::to_string_pretty(&manifest).unwrap();
        let back: Manifest = serde_json::from_str(&json).unwrap();
        assert_eq!(class_names(&back), class_names(&manifest));
        assert!(back.model().is_ok());
    }
}
