//! colord Storage - Table file listing, block metadata and size statistics

pub mod fs;
pub mod metadata;
pub mod stat;

#[cfg(any(test, feature = "test-util"))]
pub mod fixture;

pub use fs::{list_table_files, resolve_path};
pub use metadata::{Block, ColumnChunk, Field, FileMetadata, MetadataReader, ParquetMetadataReader};
pub use stat::MetadataStat;
