//! Interop source generation.
//!
//! Stage 2 of the generation pipeline. Takes the scan manifest, builds the
//! validated model, and writes one C# file per class (per quantum depth in
//! expand mode) plus the shared exception helper.
//!
//! ## Output Structure
//!
//! ```text
//! out/
//! ├── .interop-cache.json          # Generation cache
//! ├── MagickExceptionHelper.g.cs   # Severity dispatch (when enabled)
//! ├── MagickImage.cs
//! ├── PixelCollection.Q8.cs        # Expand mode: one file per depth
//! ├── PixelCollection.Q16.cs
//! └── Settings/                    # Mirrors the descriptor subdirectory
//!     └── MagickSettings.cs
//! ```
//!
//! Files are emitted in manifest order. Progress is reported through an
//! optional event channel so the CLI can print as files land.

use crate::cache::{self, CacheManifest, CacheStats};
use crate::emit;
use crate::model::ModelError;
use crate::naming;
use crate::scan::Manifest;
use std::fs;
use std::path::Path;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
    #[error("Class {0} is missing from the manifest")]
    MissingEntry(String),
}

/// How an output file was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Unchanged since the last run; not touched.
    Cached,
    /// Unchanged content found under another path and copied.
    Copied,
    /// Emitted and written.
    Written,
}

/// Progress reported while generating.
#[derive(Debug, Clone)]
pub enum GenerateEvent {
    ClassStarted {
        index: usize,
        class: String,
        source_path: String,
    },
    FileGenerated(GeneratedFile),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// `None` for shared helpers.
    pub class: Option<String>,
    /// Path relative to the output root, `/`-separated.
    pub path: String,
    pub status: FileStatus,
}

#[derive(Debug)]
pub struct GenerateResult {
    pub files: Vec<GeneratedFile>,
    pub cache_stats: CacheStats,
}

/// Read a manifest written by the scan stage.
pub fn load_manifest(path: &Path) -> Result<Manifest, GenerateError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn generate(
    manifest: &Manifest,
    output_dir: &Path,
    use_cache: bool,
    progress: Option<Sender<GenerateEvent>>,
) -> Result<GenerateResult, GenerateError> {
    let model = manifest.model()?;
    fs::create_dir_all(output_dir)?;

    let mut cache = if use_cache {
        CacheManifest::load(output_dir)
    } else {
        CacheManifest::empty()
    };
    let registry = cache::registry_fingerprint(manifest.classes.iter().map(|c| &c.descriptor));
    let config = model.context.config();

    let mut writer = OutputWriter {
        output_dir,
        cache: &mut cache,
        stats: CacheStats::default(),
        files: Vec::new(),
        progress: progress.as_ref(),
    };

    for (index, class) in model.classes.iter().enumerate() {
        let entry = manifest
            .entry(&class.name)
            .ok_or_else(|| GenerateError::MissingEntry(class.name.clone()))?;
        if let Some(tx) = writer.progress {
            tx.send(GenerateEvent::ClassStarted {
                index: index + 1,
                class: class.name.clone(),
                source_path: entry.source_path.clone(),
            })
            .ok();
        }

        let source_hash = cache::hash_descriptor(&entry.descriptor)?;
        for depth in class.variants(&config.matrix) {
            let params_hash = cache::hash_generation_params(config, depth, &registry)?;
            let path = join_relative(&entry.output_dir, &class.variant_file_name(depth));
            writer.produce(Some(&class.name), path, source_hash.clone(), params_hash, || {
                emit::emit_class(&model.context, class, depth)
            })?;
        }
    }

    if config.emit_exception_helper {
        let params_hash = cache::hash_generation_params(config, None, &registry)?;
        writer.produce(
            None,
            naming::EXCEPTION_HELPER_FILE.to_string(),
            cache::hash_exception_helper(),
            params_hash,
            || emit::exception::emit_exception_helper(&model.context).content,
        )?;
    }

    let OutputWriter { stats, files, .. } = writer;
    cache.save(output_dir)?;
    tracing::info!(files = files.len(), cache = %stats, "generation complete");

    Ok(GenerateResult {
        files,
        cache_stats: stats,
    })
}

struct OutputWriter<'a> {
    output_dir: &'a Path,
    cache: &'a mut CacheManifest,
    stats: CacheStats,
    files: Vec<GeneratedFile>,
    progress: Option<&'a Sender<GenerateEvent>>,
}

impl OutputWriter<'_> {
    /// Produce one output file, emitting it only on a cache miss.
    fn produce<F>(
        &mut self,
        class: Option<&str>,
        path: String,
        source_hash: String,
        params_hash: String,
        emit: F,
    ) -> Result<(), GenerateError>
    where
        F: FnOnce() -> String,
    {
        let target = self.output_dir.join(&path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let status = match self
            .cache
            .find_cached(&source_hash, &params_hash, self.output_dir)
        {
            Some(stored) if stored == path => {
                self.stats.hit();
                FileStatus::Cached
            }
            Some(stored) => {
                fs::copy(self.output_dir.join(&stored), &target)?;
                self.stats.copy();
                FileStatus::Copied
            }
            None => {
                fs::write(&target, emit())?;
                self.stats.miss();
                FileStatus::Written
            }
        };
        tracing::debug!(path = %path, ?status, "output file");
        self.cache.insert(path.clone(), source_hash, params_hash);

        let file = GeneratedFile {
            class: class.map(str::to_string),
            path,
            status,
        };
        if let Some(tx) = self.progress {
            tx.send(GenerateEvent::FileGenerated(file.clone())).ok();
        }
        self.files.push(file);
        Ok(())
    }
}

fn join_relative(dir: &str, file: &str) -> String {
    if dir.is_empty() {
        file.to_string()
    } else {
        format!("{dir}/{file}")
    }
}
