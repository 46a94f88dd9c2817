//! Dataset ingestion and the shared analysis context.
//!
//! [`DatasetLoader`] parses a source once and caches the frame by source
//! identity. [`Session`] runs the preprocessing pipeline once per load and
//! hands out the resulting [`AnalysisContext`], which is immutable and shared
//! through an `Arc`.

use crate::config::PrepConfig;
use crate::error::{InsightsError, Result, ResultExt};
use crate::filters::{AppliedConstraint, FilterEngine, FilterSelections};
use crate::pipeline::Pipeline;
use crate::types::{Artifacts, DatasetSchema, PreparedDataset};
use parking_lot::RwLock;
use polars::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a dataset comes from.
#[derive(Debug, Clone)]
pub enum DataSource {
    /// A CSV file, or Parquet when the extension is `.parquet`.
    Path(PathBuf),
    /// CSV content uploaded in memory.
    Upload { name: String, bytes: Vec<u8> },
}

impl DataSource {
    /// Human-readable name for logs and errors.
    pub fn display_name(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Upload { name, .. } => name.clone(),
        }
    }

    fn cache_key(&self) -> SourceKey {
        match self {
            Self::Path(path) => SourceKey::Path(path.clone()),
            Self::Upload { name, bytes } => {
                let mut hasher = DefaultHasher::new();
                bytes.hash(&mut hasher);
                SourceKey::Upload {
                    name: name.clone(),
                    len: bytes.len(),
                    digest: hasher.finish(),
                }
            }
        }
    }
}

/// Identity of a source in the loader cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SourceKey {
    Path(PathBuf),
    Upload {
        name: String,
        len: usize,
        digest: u64,
    },
}

/// Loads datasets and caches them by source identity.
#[derive(Debug, Default)]
pub struct DatasetLoader {
    cache: RwLock<HashMap<SourceKey, DataFrame>>,
}

impl DatasetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `source`, parsing it only on the first request.
    pub fn load(&self, source: &DataSource) -> Result<DataFrame> {
        let key = source.cache_key();
        if let Some(df) = self.cache.read().get(&key) {
            debug!("Cache hit for '{}'", source.display_name());
            return Ok(df.clone());
        }

        let df = match source {
            DataSource::Path(path) => Self::read_path(path),
            DataSource::Upload { bytes, .. } => Self::read_csv_bytes(bytes),
        }
        .map_err(|e| InsightsError::LoadFailed {
            source_name: source.display_name(),
            reason: e.to_string(),
        })?;

        info!(
            "Loaded '{}': {} rows x {} columns",
            source.display_name(),
            df.height(),
            df.width()
        );
        self.cache.write().insert(key, df.clone());
        Ok(df)
    }

    /// Number of cached sources.
    pub fn cached_sources(&self) -> usize {
        self.cache.read().len()
    }

    pub fn clear(&self) {
        self.cache.write().clear();
    }

    fn read_path(path: &Path) -> Result<DataFrame> {
        if !path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )
            .into());
        }

        let is_parquet = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));
        if is_parquet {
            let file = std::fs::File::open(path)?;
            return ParquetReader::new(file)
                .finish()
                .context("Failed to read Parquet file");
        }

        Self::read_csv_with_fallbacks(path)
    }

    /// Load CSV with progressively more lenient strategies.
    fn read_csv_with_fallbacks(path: &Path) -> Result<DataFrame> {
        // Strategy 1: standard parsing with quote handling
        match CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(1000))
            .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()
        {
            Ok(df) => return Ok(df),
            Err(e) => debug!("Standard loading failed: {}", e),
        }

        // Strategy 2: skip values that do not fit the inferred schema
        match CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(1000))
            .with_ignore_errors(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()
        {
            Ok(df) => {
                warn!("Loaded '{}' ignoring unparsable values", path.display());
                return Ok(df);
            }
            Err(e) => debug!("Lenient loading failed: {}", e),
        }

        // Strategy 3: pre-clean the content
        let content = std::fs::read_to_string(path)?;
        Self::read_csv_bytes(clean_csv_content(&content).as_bytes())
    }

    fn read_csv_bytes(bytes: &[u8]) -> Result<DataFrame> {
        let parse = |ignore_errors: bool| {
            CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(Some(1000))
                .with_ignore_errors(ignore_errors)
                .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
                .finish()
        };

        match parse(false) {
            Ok(df) => Ok(df),
            Err(e) => {
                debug!("Standard loading failed: {}", e);
                parse(true).context("Failed to parse CSV content")
            }
        }
    }
}

/// Collapse doubled quotes and drop blank lines.
fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Raw dataset, cleaned dataset, schema and artifacts of one preparation run.
///
/// Built once and never mutated; every page derives filtered copies from it.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    raw: DataFrame,
    prepared: PreparedDataset,
    target_column: String,
}

static_assertions::assert_impl_all!(AnalysisContext: Send, Sync);

impl AnalysisContext {
    pub fn new(raw: DataFrame, prepared: PreparedDataset, target_column: impl Into<String>) -> Self {
        Self {
            raw,
            prepared,
            target_column: target_column.into(),
        }
    }

    pub fn raw(&self) -> &DataFrame {
        &self.raw
    }

    pub fn clean(&self) -> &DataFrame {
        &self.prepared.clean
    }

    pub fn schema(&self) -> &DatasetSchema {
        &self.prepared.schema
    }

    pub fn artifacts(&self) -> &Artifacts {
        &self.prepared.artifacts
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Apply the global filters to the cleaned dataset.
    pub fn filtered(
        &self,
        selections: &FilterSelections,
    ) -> Result<(DataFrame, BTreeMap<String, AppliedConstraint>)> {
        FilterEngine::default().apply(self.clean(), selections)
    }
}

/// Holds the loader cache and the current analysis context.
pub struct Session {
    loader: DatasetLoader,
    pipeline: Pipeline,
    context: RwLock<Option<Arc<AnalysisContext>>>,
}

static_assertions::assert_impl_all!(Session: Send, Sync);

impl Session {
    pub fn new(config: PrepConfig) -> Result<Self> {
        let pipeline = Pipeline::builder()
            .config(config)
            .build()
            .map_err(|e| InsightsError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            loader: DatasetLoader::new(),
            pipeline,
            context: RwLock::new(None),
        })
    }

    /// Load `source`, run the pipeline and store the resulting context.
    pub fn load_and_prepare(&self, source: &DataSource) -> Result<Arc<AnalysisContext>> {
        let raw = self.loader.load(source)?;
        let prepared = self
            .pipeline
            .process(raw.clone())
            .context(format!("Preparing '{}'", source.display_name()))?;

        let context = Arc::new(AnalysisContext::new(
            raw,
            prepared,
            self.pipeline.config().target_column.clone(),
        ));
        *self.context.write() = Some(Arc::clone(&context));
        Ok(context)
    }

    /// The current context, or [`InsightsError::NotPrepared`] before the
    /// first successful [`load_and_prepare`](Self::load_and_prepare).
    pub fn context(&self) -> Result<Arc<AnalysisContext>> {
        self.context
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(InsightsError::NotPrepared)
    }

    pub fn loader(&self) -> &DatasetLoader {
        &self.loader
    }

    /// Forget the current context; the loader cache is kept.
    pub fn reset(&self) {
        *self.context.write() = None;
    }
}
