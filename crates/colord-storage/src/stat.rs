//! Block and column-chunk size statistics over a table directory

use crate::fs::list_table_files;
use crate::metadata::{Block, Field, FileMetadata, MetadataReader};
use colord_common::{ColordError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Aggregated statistics over every block of every file in a table.
///
/// The file list never changes after construction, so the block count and
/// row count are computed once up front.
#[derive(Debug, Clone)]
pub struct MetadataStat {
    files: Vec<FileMetadata>,
    fields: Vec<Field>,
    block_count: usize,
    row_count: u64,
}

impl MetadataStat {
    /// Read the metadata of every data file in `dir`.
    pub fn open(dir: impl AsRef<Path>, reader: &dyn MetadataReader) -> Result<Self> {
        let dir = dir.as_ref();
        let files = list_table_files(dir)?
            .iter()
            .map(|path| reader.read(path))
            .collect::<Result<Vec<_>>>()?;
        tracing::info!("Read metadata of {} files in {:?}", files.len(), dir);
        Self::from_files(files)
    }

    /// Aggregate already-read file metadata. The first file's schema is
    /// authoritative for the whole table.
    pub fn from_files(files: Vec<FileMetadata>) -> Result<Self> {
        let first = files.first().ok_or_else(|| {
            ColordError::Directory("file metadata list is empty, path is not a table directory".to_string())
        })?;
        let fields = first.fields.clone();
        let block_count = files.iter().map(|f| f.blocks.len()).sum();
        let row_count = files.iter().map(FileMetadata::row_count).sum();
        Ok(Self {
            files,
            fields,
            block_count,
            row_count,
        })
    }

    /// All blocks, file by file, in file order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.files.iter().flat_map(|f| f.blocks.iter())
    }

    pub fn file_metadata(&self) -> &[FileMetadata] {
        &self.files
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn block_count(&self) -> usize {
        self.block_count
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn column_count(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Column names in schema order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Average compressed chunk size of each column over all blocks.
    pub fn avg_column_chunk_size(&self) -> Result<Vec<f64>> {
        let block_count = self.nonzero_block_count("average column chunk size")?;
        let mut sum = vec![0.0; self.column_count()];
        for block in self.blocks() {
            for (acc, chunk) in sum.iter_mut().zip(&block.columns) {
                *acc += chunk.compressed_size as f64;
            }
        }
        Ok(sum.into_iter().map(|s| s / block_count).collect())
    }

    /// Population standard deviation of each column's compressed chunk size.
    ///
    /// Takes the averages from [`Self::avg_column_chunk_size`] so callers that
    /// already hold them do not pay for a second pass.
    pub fn column_chunk_size_std_dev(&self, avg: &[f64]) -> Result<Vec<f64>> {
        if avg.len() != self.column_count() {
            return Err(ColordError::Metadata(format!(
                "expected {} column averages, got {}",
                self.column_count(),
                avg.len()
            )));
        }
        let block_count = self.nonzero_block_count("column chunk size deviation")?;
        let mut dev = vec![0.0; self.column_count()];
        for block in self.blocks() {
            for ((acc, chunk), mean) in dev.iter_mut().zip(&block.columns).zip(avg) {
                *acc += (chunk.compressed_size as f64 - mean).powi(2);
            }
        }
        Ok(dev.into_iter().map(|d| (d / block_count).sqrt()).collect())
    }

    /// Average compressed bytes per row.
    pub fn row_size(&self) -> Result<f64> {
        if self.row_count == 0 {
            return Err(ColordError::DivisionUndefined(
                "row size of a table without rows".to_string(),
            ));
        }
        let size: f64 = self.avg_column_chunk_size()?.iter().sum();
        Ok(size * self.block_count as f64 / self.row_count as f64)
    }

    /// Total compressed bytes of all blocks.
    pub fn total_compressed_size(&self) -> u64 {
        self.blocks().map(|b| b.compressed_size).sum()
    }

    /// Total uncompressed bytes of all blocks.
    pub fn total_size(&self) -> u64 {
        self.blocks().map(|b| b.total_byte_size).sum()
    }

    /// Average chunk size keyed by lower-cased column name.
    pub fn column_sizes(&self) -> Result<HashMap<String, f64>> {
        let sizes = self.avg_column_chunk_size()?;
        Ok(self
            .fields
            .iter()
            .zip(sizes)
            .map(|(f, s)| (f.name.to_lowercase(), s))
            .collect())
    }

    fn nonzero_block_count(&self, what: &str) -> Result<f64> {
        if self.block_count == 0 {
            return Err(ColordError::DivisionUndefined(format!(
                "{what} of a table without blocks"
            )));
        }
        Ok(self.block_count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::write_fixture_file;
    use crate::metadata::{ColumnChunk, ParquetMetadataReader};
    use tempfile::TempDir;

    fn fields(names: &[&str]) -> Vec<Field> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| Field::new(*n, i))
            .collect()
    }

    fn block(rows: u64, sizes: &[u64]) -> Block {
        Block::new(
            rows,
            sizes.iter().map(|s| ColumnChunk::new(*s, s * 2)).collect(),
        )
    }

    fn sample_stat() -> MetadataStat {
        MetadataStat::from_files(vec![
            FileMetadata::new(
                "part-0",
                fields(&["a", "b"]),
                vec![block(10, &[100, 40]), block(20, &[300, 40])],
            ),
            FileMetadata::new("part-1", fields(&["a", "b"]), vec![block(5, &[200, 40])]),
        ])
        .unwrap()
    }

    #[test]
    fn test_counts() {
        let stat = sample_stat();
        assert_eq!(stat.file_count(), 2);
        assert_eq!(stat.block_count(), 3);
        assert_eq!(stat.column_count(), 2);
        assert_eq!(stat.row_count(), 35);
        assert_eq!(
            stat.row_count(),
            stat.blocks().map(|b| b.row_count).sum::<u64>()
        );
        assert_eq!(stat.field_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_blocks_in_file_order() {
        let stat = sample_stat();
        let rows: Vec<_> = stat.blocks().map(|b| b.row_count).collect();
        assert_eq!(rows, vec![10, 20, 5]);
    }

    #[test]
    fn test_avg_and_std_dev() {
        let stat = sample_stat();
        let avg = stat.avg_column_chunk_size().unwrap();
        assert_eq!(avg, vec![200.0, 40.0]);

        let dev = stat.column_chunk_size_std_dev(&avg).unwrap();
        let expected = ((100.0f64.powi(2) + 100.0f64.powi(2) + 0.0) / 3.0).sqrt();
        assert!((dev[0] - expected).abs() < 1e-9);
        // identical chunk sizes have no spread
        assert_eq!(dev[1], 0.0);
    }

    #[test]
    fn test_std_dev_rejects_wrong_width() {
        let stat = sample_stat();
        assert!(matches!(
            stat.column_chunk_size_std_dev(&[1.0]),
            Err(ColordError::Metadata(_))
        ));
    }

    #[test]
    fn test_row_size_and_totals() {
        let stat = sample_stat();
        let row_size = stat.row_size().unwrap();
        assert!((row_size - 240.0 * 3.0 / 35.0).abs() < 1e-9);
        assert_eq!(stat.total_compressed_size(), 720);
        assert_eq!(stat.total_size(), 1440);
    }

    #[test]
    fn test_column_sizes_lowercases_names() {
        let stat = MetadataStat::from_files(vec![FileMetadata::new(
            "part-0",
            fields(&["Market", "ID"]),
            vec![block(1, &[8, 4])],
        )])
        .unwrap();
        let sizes = stat.column_sizes().unwrap();
        assert_eq!(sizes.get("market"), Some(&8.0));
        assert_eq!(sizes.get("id"), Some(&4.0));
    }

    #[test]
    fn test_empty_file_list() {
        assert!(matches!(
            MetadataStat::from_files(vec![]),
            Err(ColordError::Directory(_))
        ));
    }

    #[test]
    fn test_zero_blocks_is_division_undefined() {
        let stat =
            MetadataStat::from_files(vec![FileMetadata::new("empty", fields(&["a"]), vec![])])
                .unwrap();
        assert_eq!(stat.block_count(), 0);
        assert!(matches!(
            stat.avg_column_chunk_size(),
            Err(ColordError::DivisionUndefined(_))
        ));
        assert!(matches!(
            stat.column_chunk_size_std_dev(&[0.0]),
            Err(ColordError::DivisionUndefined(_))
        ));
        assert!(matches!(
            stat.row_size(),
            Err(ColordError::DivisionUndefined(_))
        ));
        assert_eq!(stat.total_compressed_size(), 0);
    }

    #[test]
    fn test_zero_rows_is_division_undefined() {
        let stat = MetadataStat::from_files(vec![FileMetadata::new(
            "no-rows",
            fields(&["a"]),
            vec![block(0, &[16])],
        )])
        .unwrap();
        assert!(matches!(
            stat.row_size(),
            Err(ColordError::DivisionUndefined(_))
        ));
    }

    #[test]
    fn test_totals_grow_with_blocks() {
        let mut blocks = Vec::new();
        let mut prev = (0, 0);
        for i in 0..20u64 {
            blocks.push(block(i, &[i * 3, (i * 7) % 5]));
            let stat = MetadataStat::from_files(vec![FileMetadata::new(
                "grow",
                fields(&["a", "b"]),
                blocks.clone(),
            )])
            .unwrap();
            let now = (stat.total_compressed_size(), stat.total_size());
            assert!(now.0 >= prev.0 && now.1 >= prev.1);
            prev = now;
        }
    }

    #[test]
    fn test_open_parquet_directory() {
        let temp_dir = TempDir::new().unwrap();
        write_fixture_file(&temp_dir.path().join("part-0.parquet"), &["id", "market"], 50, 20)
            .unwrap();
        write_fixture_file(&temp_dir.path().join("part-1.parquet"), &["id", "market"], 25, 20)
            .unwrap();
        std::fs::write(temp_dir.path().join("_SUCCESS"), b"").unwrap();

        let stat = MetadataStat::open(temp_dir.path(), &ParquetMetadataReader::new()).unwrap();
        assert_eq!(stat.file_count(), 2);
        // 50 rows -> 20, 20, 10; 25 rows -> 20, 5
        assert_eq!(stat.block_count(), 5);
        assert_eq!(stat.row_count(), 75);

        let avg = stat.avg_column_chunk_size().unwrap();
        let total_id: u64 = stat.blocks().map(|b| b.columns[0].compressed_size).sum();
        assert!((avg[0] - total_id as f64 / 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_open_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let err = MetadataStat::open(temp_dir.path(), &ParquetMetadataReader::new()).unwrap_err();
        assert!(matches!(err, ColordError::Directory(_)));
    }
}
