//! Workload evaluation driver
//!
//! Replays a workload against the ordered and the unordered table variant,
//! one query at a time, and appends the cost of both legs to the result logs.
//! Everything is sequential: legs never overlap, and a flush of the OS caches
//! (when enabled) finishes before the leg it protects starts.

use colord_common::{ColordError, EvaluationMethod, EvaluationParams, EvaluationResult, Result};
use colord_storage::resolve_path;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};

use crate::cache::CacheDropper;
use crate::distributed::{DataFusionJobSubmitter, DistributedEvaluator, JobSubmitter};
use crate::local::LocalEvaluator;
use crate::strategy::{EvaluationStrategy, QueryContext, TableLeg};
use crate::workload::WorkloadReader;

/// Name of the column log written by strategies that report accessed columns
pub const COLUMN_LOG_NAME: &str = "columns";

/// Result set handed back to the caller of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationReport {
    pub log_dir: String,
    pub success: bool,
    params: BTreeMap<String, String>,
}

impl EvaluationReport {
    fn new(params: &EvaluationParams) -> Self {
        Self {
            log_dir: params.normalized_log_dir(),
            success: false,
            params: params.to_properties(),
        }
    }

    /// Input parameters overlaid with `log.dir` and `success`.
    pub fn to_properties(&self) -> BTreeMap<String, String> {
        let mut props = self.params.clone();
        props.insert("log.dir".to_string(), self.log_dir.clone());
        props.insert("success".to_string(), self.success.to_string());
        props
    }
}

/// One evaluation run over a workload file
pub struct WorkloadEvaluation {
    params: EvaluationParams,
    submitter: Arc<dyn JobSubmitter>,
}

impl WorkloadEvaluation {
    pub fn new(params: EvaluationParams) -> Self {
        Self {
            params,
            submitter: Arc::new(DataFusionJobSubmitter::new()),
        }
    }

    /// Use another job submitter for the cluster method.
    pub fn with_submitter(mut self, submitter: Arc<dyn JobSubmitter>) -> Self {
        self.submitter = submitter;
        self
    }

    pub fn params(&self) -> &EvaluationParams {
        &self.params
    }

    /// Run the evaluation with the strategy selected by `method`.
    ///
    /// Never fails: errors are logged and leave `success` false. Logs already
    /// flushed for earlier queries stay valid.
    pub async fn run<P, C>(&self, progress: P, on_complete: C) -> EvaluationReport
    where
        P: FnMut(f64),
        C: FnOnce(&EvaluationReport),
    {
        self.run_inner(None, progress, on_complete).await
    }

    /// Run the evaluation loop with a caller-provided strategy.
    pub async fn run_with_strategy<P, C>(
        &self,
        strategy: Arc<dyn EvaluationStrategy>,
        progress: P,
        on_complete: C,
    ) -> EvaluationReport
    where
        P: FnMut(f64),
        C: FnOnce(&EvaluationReport),
    {
        self.run_inner(Some(strategy), progress, on_complete).await
    }

    async fn run_inner<P, C>(
        &self,
        strategy: Option<Arc<dyn EvaluationStrategy>>,
        mut progress: P,
        on_complete: C,
    ) -> EvaluationReport
    where
        P: FnMut(f64),
        C: FnOnce(&EvaluationReport),
    {
        let mut report = EvaluationReport::new(&self.params);
        progress(0.0);

        let method = strategy
            .as_ref()
            .map(|s| s.method())
            .unwrap_or(self.params.method)
            .as_str()
            .to_lowercase();
        match self.evaluate(strategy, &mut progress).await {
            Ok(queries) => {
                report.success = true;
                tracing::info!(
                    "Evaluated {} queries, results in {}",
                    queries,
                    report.log_dir
                );
            }
            Err(e) => {
                tracing::error!("evaluate {} {} error: {}", method, e.kind(), e);
            }
        }

        on_complete(&report);
        report
    }

    async fn evaluate<P: FnMut(f64)>(
        &self,
        strategy: Option<Arc<dyn EvaluationStrategy>>,
        progress: &mut P,
    ) -> Result<usize> {
        self.params.validate()?;
        let log_dir = self.params.normalized_log_dir();

        let workload_path = resolve_path(&self.params.workload_file)?;
        let workload = File::open(&workload_path).await.map_err(|e| {
            ColordError::Io(std::io::Error::new(
                e.kind(),
                format!("workload file {}: {}", workload_path.display(), e),
            ))
        })?;
        let workload_len = workload.metadata().await?.len();

        let strategy = match strategy {
            Some(s) => s,
            None => self.build_strategy()?,
        };
        let dropper = if self.params.drop_cache {
            self.params.drop_caches_sh.as_deref().map(CacheDropper::new)
        } else {
            None
        };

        let mut time_log =
            BufWriter::new(File::create(format!("{}{}", log_dir, strategy.time_log_name())).await?);
        let mut column_log = if strategy.writes_column_log() {
            Some(BufWriter::new(
                File::create(format!("{}{}", log_dir, COLUMN_LOG_NAME)).await?,
            ))
        } else {
            None
        };

        let mut reader = WorkloadReader::new(BufReader::new(workload));
        let mut index = 0;
        while let Some(query) = reader.next_query().await? {
            let order_by = strategy.order_by_column(&query)?;
            let ctx = QueryContext {
                index,
                query,
                order_by,
            };

            let ordered = run_leg(strategy.as_ref(), TableLeg::Ordered, &ctx, dropper.as_ref()).await?;
            let unordered =
                run_leg(strategy.as_ref(), TableLeg::Unordered, &ctx, dropper.as_ref()).await?;

            time_log
                .write_all(
                    format!("{}\t{}\t{}\n", index, ordered.elapsed_ms, unordered.elapsed_ms)
                        .as_bytes(),
                )
                .await?;
            time_log.flush().await?;

            if let Some(column_log) = column_log.as_mut() {
                column_log
                    .write_all(format_column_block(index, &ordered, &unordered).as_bytes())
                    .await?;
                column_log.flush().await?;
            }

            index += 1;
            progress(progress_fraction(reader.bytes_read(), workload_len));
        }

        time_log.shutdown().await?;
        if let Some(mut column_log) = column_log {
            column_log.shutdown().await?;
        }
        Ok(index)
    }

    fn build_strategy(&self) -> Result<Arc<dyn EvaluationStrategy>> {
        let p = &self.params;
        Ok(match p.method {
            EvaluationMethod::Local => {
                Arc::new(LocalEvaluator::open(&p.ordered_table_dir, &p.table_dir)?)
            }
            EvaluationMethod::Spark => Arc::new(DistributedEvaluator::open(
                &p.ordered_table_dir,
                &p.table_dir,
                &p.cluster,
                self.submitter.clone(),
            )?),
        })
    }
}

async fn run_leg(
    strategy: &dyn EvaluationStrategy,
    leg: TableLeg,
    ctx: &QueryContext,
    dropper: Option<&CacheDropper>,
) -> Result<EvaluationResult> {
    if let Some(dropper) = dropper {
        dropper.drop_caches().await?;
    }
    let result = strategy.execute(leg, ctx).await?;
    tracing::debug!(
        "Query {} {} leg: {} ms",
        ctx.index,
        leg,
        result.elapsed_ms
    );
    Ok(result)
}

/// Column log entry of one query.
pub fn format_column_block(
    index: usize,
    ordered: &EvaluationResult,
    unordered: &EvaluationResult,
) -> String {
    let mut out = format!("[query {index}]\nordered:\n");
    for column in &ordered.columns {
        out.push_str(&format!("{column}\n"));
    }
    out.push_str("\nunordered:\n");
    for column in &unordered.columns {
        out.push_str(&format!("{column}\n"));
    }
    out.push_str("\n\n");
    out
}

fn progress_fraction(read: u64, total: u64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    (read as f64 / total as f64).min(1.0)
}
