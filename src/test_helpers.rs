//! Shared test utilities for the magick-interop test suite.
//!
//! Provides fixture setup, inline-descriptor model building, and lookup
//! helpers over scan-phase data.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let manifest = scan(tmp.path()).unwrap();
//! let image = find_entry(&manifest, "MagickImage");
//! assert_eq!(image.source_path, "MagickImage.toml");
//!
//! let model = build_model(GeneratorConfig::default(), &["name = \"A\"\ninstance = true\n"]);
//! let text = class_file(&model, "A");
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::config::GeneratorConfig;
use crate::descriptor::ClassSpec;
use crate::emit;
use crate::model::Model;
use crate::scan::{ClassEntry, Manifest};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/descriptors/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/descriptors");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Inline descriptors
// =========================================================================

/// Build a model from TOML descriptor sources. Panics on any error.
pub fn build_model(config: GeneratorConfig, sources: &[&str]) -> Model {
    let specs: Vec<ClassSpec> = sources
        .iter()
        .map(|s| ClassSpec::from_toml_str(s).unwrap_or_else(|e| panic!("bad descriptor: {e}\n{s}")))
        .collect();
    Model::build(config, &specs).unwrap_or_else(|e| panic!("model error: {e}"))
}

/// Emit one class as a single depth-neutral file. Panics if not found.
pub fn class_file(model: &Model, class: &str) -> String {
    let descriptor = model.class(class).unwrap_or_else(|| {
        let names: Vec<&str> = model.classes.iter().map(|c| c.name.as_str()).collect();
        panic!("class '{class}' not found. Available: {names:?}")
    });
    emit::emit_class(&model.context, descriptor, None)
}

// =========================================================================
// Manifest lookups — panics with a clear message on miss
// =========================================================================

/// Find a manifest entry by class name. Panics if not found.
pub fn find_entry<'a>(manifest: &'a Manifest, class: &str) -> &'a ClassEntry {
    manifest.entry(class).unwrap_or_else(|| {
        let names = class_names(manifest);
        panic!("class '{class}' not found. Available: {names:?}")
    })
}

/// All class names in manifest order.
pub fn class_names(manifest: &Manifest) -> Vec<&str> {
    manifest
        .classes
        .iter()
        .map(|c| c.descriptor.name.as_str())
        .collect()
}
