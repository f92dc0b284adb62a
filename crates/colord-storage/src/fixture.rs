//! Parquet fixture writers for tests

use arrow_array::{ArrayRef, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use colord_common::{ColordError, Result};
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Write a Parquet file with `rows` rows split into row groups of
/// `rows_per_group`.
///
/// Columns named `market` or ending in `_name` are strings; all others are
/// Int64 with values that differ per column, so chunk sizes differ too.
pub fn write_fixture_file(
    path: &Path,
    columns: &[&str],
    rows: usize,
    rows_per_group: usize,
) -> Result<()> {
    let fields: Vec<Field> = columns
        .iter()
        .map(|name| Field::new(*name, column_type(name), false))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let arrays: Vec<ArrayRef> = columns
        .iter()
        .enumerate()
        .map(|(j, name)| -> ArrayRef {
            match column_type(name) {
                DataType::Utf8 => Arc::new(StringArray::from_iter_values(
                    (0..rows).map(|r| format!("{name}-{}", r % 7)),
                )),
                _ => Arc::new(Int64Array::from_iter_values(
                    (0..rows).map(|r| (r as i64) * (j as i64 + 1) * 1_000_003),
                )),
            }
        })
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), arrays)?;

    let props = WriterProperties::builder()
        .set_max_row_group_size(rows_per_group.max(1))
        .build();
    let file = File::create(path)
        .map_err(|e| ColordError::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display()))))?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Write a Parquet file with the given schema and no row group at all.
pub fn write_empty_fixture_file(path: &Path, columns: &[&str]) -> Result<()> {
    let fields: Vec<Field> = columns
        .iter()
        .map(|name| Field::new(*name, column_type(name), false))
        .collect();
    let schema = Arc::new(Schema::new(fields));
    let file = File::create(path)
        .map_err(|e| ColordError::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display()))))?;
    ArrowWriter::try_new(file, schema, None)?.close()?;
    Ok(())
}

fn column_type(name: &str) -> DataType {
    if name.eq_ignore_ascii_case("market") || name.ends_with("_name") {
        DataType::Utf8
    } else {
        DataType::Int64
    }
}
