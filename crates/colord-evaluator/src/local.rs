//! Single-node sequential scan strategy

use async_trait::async_trait;
use colord_common::{Column, ColordError, EvaluationMethod, EvaluationResult, Result};
use colord_storage::{list_table_files, resolve_path};
use parquet::arrow::arrow_reader::{
    ArrowReaderMetadata, ArrowReaderOptions, ParquetRecordBatchReaderBuilder,
};
use parquet::arrow::ProjectionMask;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::strategy::{EvaluationStrategy, QueryContext, TableLeg};

/// A table variant with its file listing and reader metadata loaded once
#[derive(Debug)]
pub struct LocalTable {
    root: PathBuf,
    files: Vec<(PathBuf, ArrowReaderMetadata)>,
}

impl LocalTable {
    pub fn open(location: &str) -> Result<Self> {
        let root = resolve_path(location)?;
        let paths = list_table_files(&root)?;
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let file = File::open(&path)?;
            let meta = ArrowReaderMetadata::load(&file, ArrowReaderOptions::new()).map_err(|e| {
                ColordError::Metadata(format!(
                    "failed to read metadata of {}: {}",
                    path.display(),
                    e
                ))
            })?;
            files.push((path, meta));
        }
        tracing::info!("Loaded metadata of {} files in {:?}", files.len(), root);
        Ok(Self { root, files })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Resolve requested names against the first file's schema, in schema
    /// order. Names the schema does not have are dropped.
    pub fn resolve_columns<S: AsRef<str>>(&self, requested: &[S]) -> Vec<Column> {
        let wanted: HashSet<String> = requested.iter().map(|c| c.as_ref().to_lowercase()).collect();
        let Some((_, meta)) = self.files.first() else {
            return vec![];
        };
        let resolved: Vec<Column> = meta
            .parquet_schema()
            .root_schema()
            .get_fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| wanted.contains(&f.name().to_lowercase()))
            .map(|(i, f)| Column::new(i, f.name()))
            .collect();

        if resolved.len() < wanted.len() {
            let found: HashSet<String> = resolved.iter().map(|c| c.name.to_lowercase()).collect();
            for name in requested {
                if !found.contains(&name.as_ref().to_lowercase()) {
                    tracing::warn!("Column {} not found in {:?}", name.as_ref(), self.root);
                }
            }
        }
        resolved
    }

    /// Read exactly the requested columns of every file and time it.
    pub fn scan<S: AsRef<str>>(&self, requested: &[S]) -> Result<EvaluationResult> {
        let columns = self.resolve_columns(requested);
        let positions: Vec<usize> = columns.iter().map(|c| c.position).collect();

        let start = Instant::now();
        let mut rows = 0usize;
        for (path, meta) in &self.files {
            let root_fields = meta.parquet_schema().root_schema().get_fields().len();
            if let Some(&p) = positions.iter().find(|&&p| p >= root_fields) {
                return Err(ColordError::Metadata(format!(
                    "{} has {} columns, column position {} is out of range",
                    path.display(),
                    root_fields,
                    p
                )));
            }
            let mask = ProjectionMask::roots(meta.parquet_schema(), positions.iter().copied());
            let reader = ParquetRecordBatchReaderBuilder::new_with_metadata(File::open(path)?, meta.clone())
                .with_projection(mask)
                .build()?;
            for batch in reader {
                rows += batch?.num_rows();
            }
        }
        let elapsed_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "Scanned {} rows of {} columns in {:?} in {} ms",
            rows,
            columns.len(),
            self.root,
            elapsed_ms
        );
        Ok(EvaluationResult::new(elapsed_ms).with_columns(columns))
    }
}

/// Local strategy: an in-process scan of each table variant
pub struct LocalEvaluator {
    ordered: Arc<LocalTable>,
    unordered: Arc<LocalTable>,
}

impl LocalEvaluator {
    pub fn new(ordered: LocalTable, unordered: LocalTable) -> Self {
        Self {
            ordered: Arc::new(ordered),
            unordered: Arc::new(unordered),
        }
    }

    /// Open both variants. Listing and metadata reading happen here, once
    /// per run.
    pub fn open(ordered_dir: &str, unordered_dir: &str) -> Result<Self> {
        Ok(Self::new(LocalTable::open(ordered_dir)?, LocalTable::open(unordered_dir)?))
    }

    pub fn table(&self, leg: TableLeg) -> &Arc<LocalTable> {
        match leg {
            TableLeg::Ordered => &self.ordered,
            TableLeg::Unordered => &self.unordered,
        }
    }
}

#[async_trait]
impl EvaluationStrategy for LocalEvaluator {
    fn method(&self) -> EvaluationMethod {
        EvaluationMethod::Local
    }

    fn time_log_name(&self) -> &'static str {
        "local_time"
    }

    fn writes_column_log(&self) -> bool {
        true
    }

    async fn execute(&self, leg: TableLeg, ctx: &QueryContext) -> Result<EvaluationResult> {
        let table = self.table(leg).clone();
        let columns = ctx.query.columns().to_vec();
        tokio::task::spawn_blocking(move || table.scan(&columns))
            .await
            .map_err(|e| ColordError::Execution(format!("{leg} scan of query {} failed: {e}", ctx.index)))?
    }
}
