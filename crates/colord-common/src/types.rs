//! colord core types

use serde::{Deserialize, Serialize};

/// A column resolved against a table schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /// Position of the column in schema order
    pub position: usize,
    pub name: String,
}

impl Column {
    pub fn new(position: usize, name: impl Into<String>) -> Self {
        Self {
            position,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.position, self.name)
    }
}

/// Outcome of one evaluation leg
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Wall-clock millis (local) or reported stage duration (cluster)
    pub elapsed_ms: u64,

    /// Columns actually touched, for diagnostics
    pub columns: Vec<Column>,
}

impl EvaluationResult {
    pub fn new(elapsed_ms: u64) -> Self {
        Self {
            elapsed_ms,
            columns: vec![],
        }
    }

    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_display() {
        assert_eq!(Column::new(3, "market").to_string(), "3, market");
    }
}
