//! Output cache for incremental generation.
//!
//! Generated files are checked into consuming projects and picked up by
//! their build. Rewriting an unchanged file bumps its modification time and
//! triggers a rebuild downstream, so the generate stage skips emission when
//! neither the descriptor nor the generation parameters changed since the
//! last run.
//!
//! ## Cache keys
//!
//! The cache is **content-addressed**: lookups are by the combination of
//! `source_hash` and `params_hash`, not by output file path. Moving a
//! descriptor into another subdirectory copies the previous output instead of
//! emitting it again.
//!
//! - **`source_hash`**: SHA-256 of the descriptor's canonical JSON form, so
//!   reformatting a TOML file or converting it to JSON is not a change.
//!
//! - **`params_hash`**: SHA-256 of everything else the output depends on:
//!   tool version, resolved configuration, quantum variant, and the registry
//!   of classes other descriptors may refer to.
//!
//! A cache hit requires:
//! 1. An entry with matching `source_hash` and `params_hash` exists
//! 2. The previously-written output file still exists on disk
//!
//! ## Storage
//!
//! The cache manifest is a JSON file at `<output_dir>/.interop-cache.json`.
//!
//! ## Bypassing the cache
//!
//! Pass `--no-cache` to `generate` or `build` to load an empty manifest, so
//! every file is emitted and written again.

use crate::config::GeneratorConfig;
use crate::descriptor::ClassSpec;
use crate::platform::QuantumDepth;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the cache manifest file within the output directory.
const MANIFEST_FILENAME: &str = ".interop-cache.json";

/// Version of the cache manifest format. Bump this to invalidate all
/// existing caches when the format or key computation changes.
const MANIFEST_VERSION: u32 = 1;

/// A single cached output file.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
}

/// On-disk cache manifest mapping output paths to their cache entries.
///
/// Lookups go through a runtime `content_index` that maps
/// `"{source_hash}:{params_hash}"` to the stored output path.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
    /// Built at load time, maintained on insert. Never serialized.
    #[serde(skip)]
    content_index: HashMap<String, String>,
}

impl CacheManifest {
    /// Create an empty manifest (used for `--no-cache` or first run).
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
            content_index: HashMap::new(),
        }
    }

    /// Load from the output directory. Returns an empty manifest if the
    /// file doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(output_dir: &Path) -> Self {
        let path = output_dir.join(MANIFEST_FILENAME);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let mut manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "ignoring unreadable cache manifest");
                return Self::empty();
            }
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest.content_index = build_content_index(&manifest.entries);
        manifest
    }

    /// Save to the output directory.
    pub fn save(&self, output_dir: &Path) -> io::Result<()> {
        let path = output_dir.join(MANIFEST_FILENAME);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Look up a cached output file by content hashes.
    ///
    /// Returns the stored output path if a matching entry exists and the
    /// file is still on disk. The path may differ from the caller's expected
    /// one after a descriptor moved; the caller copies it over.
    pub fn find_cached(
        &self,
        source_hash: &str,
        params_hash: &str,
        output_dir: &Path,
    ) -> Option<String> {
        let content_key = format!("{}:{}", source_hash, params_hash);
        let stored_path = self.content_index.get(&content_key)?;
        if output_dir.join(stored_path).exists() {
            Some(stored_path.clone())
        } else {
            None
        }
    }

    /// Record a cache entry for an output file.
    ///
    /// An entry with the same content under a different path is dropped.
    pub fn insert(&mut self, output_path: String, source_hash: String, params_hash: String) {
        let content_key = format!("{}:{}", source_hash, params_hash);

        if let Some(old_path) = self.content_index.get(&content_key)
            && *old_path != output_path
        {
            self.entries.remove(old_path.as_str());
        }

        self.content_index.insert(content_key, output_path.clone());
        self.entries.insert(
            output_path,
            CacheEntry {
                source_hash,
                params_hash,
            },
        );
    }
}

fn build_content_index(entries: &HashMap<String, CacheEntry>) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(output_path, entry)| {
            let content_key = format!("{}:{}", entry.source_hash, entry.params_hash);
            (content_key, output_path.clone())
        })
        .collect()
}

/// SHA-256 of a descriptor's canonical JSON form, as a hex string.
pub fn hash_descriptor(descriptor: &ClassSpec) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(descriptor)?;
    Ok(format!("{:x}", Sha256::digest(&json)))
}

/// Source hash of the shared exception helper, which has no descriptor.
pub fn hash_exception_helper() -> String {
    format!("{:x}", Sha256::digest(b"exception-helper\0"))
}

/// Fingerprint of the class registry: the traits other descriptors see when
/// they reference a class by name.
pub fn registry_fingerprint<'a>(descriptors: impl IntoIterator<Item = &'a ClassSpec>) -> String {
    let mut lines: Vec<String> = descriptors
        .into_iter()
        .map(|d| {
            format!(
                "{}:{}:{:?}:{}:{}",
                d.name, d.is_static, d.dynamic, d.interface, d.quantum_type
            )
        })
        .collect();
    lines.sort();
    let mut hasher = Sha256::new();
    for line in lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// SHA-256 of the generation parameters for one output file.
///
/// Inputs: tool version, resolved config, quantum variant, and the registry
/// fingerprint. If any of these change, the file is emitted again.
pub fn hash_generation_params(
    config: &GeneratorConfig,
    depth: Option<QuantumDepth>,
    registry: &str,
) -> Result<String, serde_json::Error> {
    let mut hasher = Sha256::new();
    hasher.update(b"generate\0");
    hasher.update(env!("CARGO_PKG_VERSION").as_bytes());
    hasher.update(b"\0");
    hasher.update(serde_json::to_vec(config)?);
    match depth {
        Some(depth) => {
            hasher.update(b"\x01");
            hasher.update(depth.symbol().as_bytes());
        }
        None => {
            hasher.update(b"\x00");
        }
    }
    hasher.update(registry.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Summary of cache performance for a generation run.
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: u32,
    pub copies: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn copy(&mut self) {
        self.copies += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.copies + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 || self.copies > 0 {
            if self.copies > 0 {
                write!(
                    f,
                    "{} cached, {} copied, {} written ({} total)",
                    self.hits,
                    self.copies,
                    self.misses,
                    self.total()
                )
            } else {
                write!(
                    f,
                    "{} cached, {} written ({} total)",
                    self.hits,
                    self.misses,
                    self.total()
                )
            }
        } else {
            write!(f, "{} written", self.misses)
        }
    }
}

/// Resolve the cache manifest path for an output directory.
pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILENAME)
}
