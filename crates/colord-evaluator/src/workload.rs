//! Workload file parsing
//!
//! A workload file holds one query per line, tab separated. The first two
//! fields (query id and weight) are carried through untouched; the third is
//! the comma-separated list of columns the query reads.

use colord_common::{ColordError, Result};
use std::collections::HashSet;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// One workload line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadQuery {
    id: String,
    weight: String,
    columns: Vec<String>,
}

impl WorkloadQuery {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut fields = line.split('\t');
        let (Some(id), Some(weight), Some(columns)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(ColordError::Workload(format!(
                "expected at least 3 tab-separated fields in line '{line}'"
            )));
        };
        // Names compare case-insensitively; the first spelling wins.
        let mut seen = HashSet::new();
        let columns = columns
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty() && seen.insert(c.to_lowercase()))
            .map(str::to_string)
            .collect();
        Ok(Self {
            id: id.to_string(),
            weight: weight.to_string(),
            columns,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn weight(&self) -> &str {
        &self.weight
    }

    /// Requested column names, deduplicated, with their original casing.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// Streams queries out of a workload file, keeping count of consumed bytes.
pub struct WorkloadReader<R> {
    reader: R,
    bytes_read: u64,
    line: String,
}

impl<R: AsyncBufRead + Unpin> WorkloadReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            bytes_read: 0,
            line: String::new(),
        }
    }

    /// Bytes consumed so far, line terminators included.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Next query, skipping blank lines. `None` at end of input.
    pub async fn next_query(&mut self) -> Result<Option<WorkloadQuery>> {
        loop {
            self.line.clear();
            let n = self.reader.read_line(&mut self.line).await?;
            if n == 0 {
                return Ok(None);
            }
            self.bytes_read += n as u64;
            if self.line.trim().is_empty() {
                continue;
            }
            return WorkloadQuery::parse(&self.line).map(Some);
        }
    }
}
