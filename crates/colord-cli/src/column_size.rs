//! GET_COLUMN_SIZE command: per-column chunk size statistics of a table

use async_trait::async_trait;
use colord_common::{ColordError, Result};
use colord_storage::{resolve_path, MetadataStat, ParquetMetadataReader};

use crate::registry::{Command, Properties};

pub struct ColumnSizeCommand;

/// One `{name}\t{avg}\t{stddev}` line per column.
pub fn column_size_report(stat: &MetadataStat) -> Result<String> {
    let avg = stat.avg_column_chunk_size()?;
    let dev = stat.column_chunk_size_std_dev(&avg)?;
    let mut out = String::new();
    for ((name, a), d) in stat.field_names().iter().zip(&avg).zip(&dev) {
        out.push_str(&format!("{name}\t{a}\t{d}\n"));
    }
    Ok(out)
}

/// One-line table summary. A table without rows has no row size.
pub fn table_summary(dir: &str, stat: &MetadataStat) -> String {
    let row_size = match stat.row_size() {
        Ok(size) => format!("{size:.2}"),
        Err(e) => {
            tracing::warn!("{}: row size unavailable: {}", dir, e);
            "n/a".to_string()
        }
    };
    format!(
        "{}: {} files, {} blocks, {} rows, row size {}, {} bytes compressed, {} bytes uncompressed",
        dir,
        stat.file_count(),
        stat.block_count(),
        stat.row_count(),
        row_size,
        stat.total_compressed_size(),
        stat.total_size()
    )
}

async fn column_sizes(params: &Properties) -> Result<()> {
    let dir = params
        .get("table.dir")
        .ok_or_else(|| ColordError::Config("missing parameter 'table.dir'".to_string()))?;
    let stat = MetadataStat::open(resolve_path(dir)?, &ParquetMetadataReader::new())?;

    tracing::info!("{}", table_summary(dir, &stat));

    let report = column_size_report(&stat)?;
    match params.get("output.file") {
        Some(output) => {
            tokio::fs::write(output, report).await?;
            tracing::info!("Column sizes written to {}", output);
        }
        None => {
            for line in report.lines() {
                tracing::info!("{}", line);
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Command for ColumnSizeCommand {
    async fn execute(&self, params: Properties) -> Properties {
        let outcome = column_sizes(&params).await;
        let mut results = params;
        match outcome {
            Ok(()) => {
                results.insert("success".to_string(), "true".to_string());
            }
            Err(e) => {
                tracing::error!("get column size error: {}", e);
                results.insert("success".to_string(), "false".to_string());
            }
        }
        results
    }
}
