//! Structural metadata of block-structured table files

use colord_common::{ColordError, Result};
use parquet::file::metadata::RowGroupMetaData;
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::fs::File;
use std::path::{Path, PathBuf};

/// A top-level schema field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub position: usize,
}

impl Field {
    pub fn new(name: impl Into<String>, position: usize) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }
}

/// Bytes of one column inside one block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnChunk {
    pub compressed_size: u64,
    pub uncompressed_size: u64,
}

impl ColumnChunk {
    pub fn new(compressed_size: u64, uncompressed_size: u64) -> Self {
        Self {
            compressed_size,
            uncompressed_size,
        }
    }
}

/// A block (row group): one chunk per field, in field order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub row_count: u64,
    pub columns: Vec<ColumnChunk>,
    /// Compressed bytes of the whole block
    pub compressed_size: u64,
    /// Uncompressed bytes of the whole block
    pub total_byte_size: u64,
}

impl Block {
    /// Build a block whose aggregate sizes are the sums over its chunks.
    pub fn new(row_count: u64, columns: Vec<ColumnChunk>) -> Self {
        let compressed_size = columns.iter().map(|c| c.compressed_size).sum();
        let total_byte_size = columns.iter().map(|c| c.uncompressed_size).sum();
        Self {
            row_count,
            columns,
            compressed_size,
            total_byte_size,
        }
    }

    fn from_row_group(rg: &RowGroupMetaData) -> Self {
        let columns = rg
            .columns()
            .iter()
            .map(|c| ColumnChunk::new(non_negative(c.compressed_size()), non_negative(c.uncompressed_size())))
            .collect();
        Self {
            row_count: non_negative(rg.num_rows()),
            columns,
            compressed_size: non_negative(rg.compressed_size()),
            total_byte_size: non_negative(rg.total_byte_size()),
        }
    }
}

/// Metadata of one table file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub path: PathBuf,
    pub fields: Vec<Field>,
    pub blocks: Vec<Block>,
}

impl FileMetadata {
    pub fn new(path: impl Into<PathBuf>, fields: Vec<Field>, blocks: Vec<Block>) -> Self {
        Self {
            path: path.into(),
            fields,
            blocks,
        }
    }

    pub fn row_count(&self) -> u64 {
        self.blocks.iter().map(|b| b.row_count).sum()
    }
}

/// Reads the structural metadata of a table file
pub trait MetadataReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<FileMetadata>;
}

/// Reads Parquet footers
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetMetadataReader;

impl ParquetMetadataReader {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataReader for ParquetMetadataReader {
    fn read(&self, path: &Path) -> Result<FileMetadata> {
        let file = File::open(path).map_err(|e| {
            ColordError::Metadata(format!("failed to open {}: {}", path.display(), e))
        })?;
        let reader = SerializedFileReader::new(file).map_err(|e| {
            ColordError::Metadata(format!(
                "failed to read footer of {}: {}",
                path.display(),
                e
            ))
        })?;
        let meta = reader.metadata();

        let fields = meta
            .file_metadata()
            .schema()
            .get_fields()
            .iter()
            .enumerate()
            .map(|(i, t)| Field::new(t.name(), i))
            .collect();
        let blocks = meta.row_groups().iter().map(Block::from_row_group).collect();

        Ok(FileMetadata::new(path, fields, blocks))
    }
}

fn non_negative(v: i64) -> u64 {
    v.max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::write_fixture_file;
    use tempfile::TempDir;

    #[test]
    fn test_block_new_sums_chunks() {
        let block = Block::new(
            10,
            vec![ColumnChunk::new(100, 300), ColumnChunk::new(50, 70)],
        );
        assert_eq!(block.compressed_size, 150);
        assert_eq!(block.total_byte_size, 370);
    }

    #[test]
    fn test_read_parquet_footer() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("part-0.parquet");
        write_fixture_file(&path, &["id", "market", "price"], 100, 30).unwrap();

        let meta = ParquetMetadataReader::new().read(&path).unwrap();
        let names: Vec<_> = meta.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "market", "price"]);
        assert_eq!(meta.fields[2].position, 2);

        // 100 rows in groups of 30
        let rows: Vec<_> = meta.blocks.iter().map(|b| b.row_count).collect();
        assert_eq!(rows, vec![30, 30, 30, 10]);
        assert_eq!(meta.row_count(), 100);

        for block in &meta.blocks {
            assert_eq!(block.columns.len(), 3);
            assert!(block.columns.iter().all(|c| c.compressed_size > 0));
            assert_eq!(
                block.compressed_size,
                block.columns.iter().map(|c| c.compressed_size).sum::<u64>()
            );
        }
    }

    #[test]
    fn test_read_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.parquet");
        std::fs::write(&path, b"definitely not parquet").unwrap();

        let err = ParquetMetadataReader::new().read(&path).unwrap_err();
        assert!(matches!(err, ColordError::Metadata(_)));
        assert!(err.to_string().contains("broken.parquet"));
    }
}
