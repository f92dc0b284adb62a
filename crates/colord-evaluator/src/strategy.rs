//! Evaluation strategy trait shared by the driver loop

use async_trait::async_trait;
use colord_common::{EvaluationMethod, EvaluationResult, Result};

use crate::workload::WorkloadQuery;

/// Which table variant a leg runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableLeg {
    Ordered,
    Unordered,
}

impl TableLeg {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableLeg::Ordered => "ordered",
            TableLeg::Unordered => "unordered",
        }
    }

    /// Job name of this leg for query `index`, unique per query.
    pub fn job_name(&self, index: usize) -> String {
        format!("{}_{}", self.as_str(), index)
    }
}

impl std::fmt::Display for TableLeg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-query state handed to both legs
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// 0-based index of the query in the workload
    pub index: usize,
    pub query: WorkloadQuery,
    /// Ordering key, for strategies that use one
    pub order_by: Option<String>,
}

/// One way of measuring a comparison leg
#[async_trait]
pub trait EvaluationStrategy: Send + Sync {
    fn method(&self) -> EvaluationMethod;

    /// File name of the time log inside the log directory
    fn time_log_name(&self) -> &'static str;

    /// Whether accessed columns are written to the column log
    fn writes_column_log(&self) -> bool;

    /// Resolve the ordering key of a query, once, before its legs run.
    fn order_by_column(&self, _query: &WorkloadQuery) -> Result<Option<String>> {
        Ok(None)
    }

    /// Run one leg to completion and report its cost.
    async fn execute(&self, leg: TableLeg, ctx: &QueryContext) -> Result<EvaluationResult>;
}
