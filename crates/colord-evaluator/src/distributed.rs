//! Cluster strategy: one job per leg, sorted on a chosen column

use async_trait::async_trait;
use colord_common::{ClusterConfig, ColordError, EvaluationMethod, EvaluationResult, Result};
use colord_storage::{list_table_files, resolve_path, MetadataStat, ParquetMetadataReader};
use datafusion::prelude::{ident, ParquetReadOptions, SessionConfig, SessionContext};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::order::select_order_by_column;
use crate::strategy::{EvaluationStrategy, QueryContext, TableLeg};
use crate::workload::WorkloadQuery;

/// Where jobs are submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterEndpoint {
    pub master: String,
    pub app_port: u16,
    pub driver_webapps_port: u16,
}

impl From<&ClusterConfig> for ClusterEndpoint {
    fn from(config: &ClusterConfig) -> Self {
        Self {
            master: config.master.clone(),
            app_port: config.app_port,
            driver_webapps_port: config.driver_webapps_port,
        }
    }
}

impl std::fmt::Display for ClusterEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.master, self.app_port)
    }
}

/// A single scan job
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Unique per query and leg, e.g. `ordered_3`
    pub name: String,
    pub endpoint: ClusterEndpoint,
    pub table_path: String,
    pub columns: Vec<String>,
    pub order_by: String,
}

/// Metrics the cluster reports for a finished job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageMetrics {
    pub duration_ms: u64,
    pub rows: u64,
}

/// Submits a job and blocks until it has finished
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    async fn submit(&self, job: &JobSpec) -> Result<StageMetrics>;
}

/// Runs jobs as DataFusion plans: parquet scan, projection, sort.
///
/// Each job gets a fresh session so no state is shared between the legs.
#[derive(Debug, Clone)]
pub struct DataFusionJobSubmitter {
    target_partitions: usize,
}

impl DataFusionJobSubmitter {
    pub fn new() -> Self {
        Self {
            target_partitions: SessionConfig::new().target_partitions(),
        }
    }

    pub fn with_target_partitions(mut self, target_partitions: usize) -> Self {
        self.target_partitions = target_partitions.max(1);
        self
    }
}

impl Default for DataFusionJobSubmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobSubmitter for DataFusionJobSubmitter {
    async fn submit(&self, job: &JobSpec) -> Result<StageMetrics> {
        let config = SessionConfig::new().with_target_partitions(self.target_partitions);
        let ctx = SessionContext::new_with_config(config);
        // Same data files the metadata side reads, whatever their extension.
        let files = list_table_files(resolve_path(&job.table_path)?)?
            .into_iter()
            .map(|p| {
                p.to_str().map(str::to_string).ok_or_else(|| {
                    ColordError::Execution(format!("non UTF-8 table file path {p:?}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let start = Instant::now();
        let options = ParquetReadOptions::default().file_extension("");
        let df = ctx.read_parquet(files, options).await?;

        // Workload names are case-insensitive, the file schema is not.
        let schema_names: Vec<String> = df
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        let lookup = |name: &str| {
            schema_names
                .iter()
                .find(|s| s.eq_ignore_ascii_case(name))
                .cloned()
                .ok_or_else(|| {
                    ColordError::Execution(format!(
                        "job {}: column {} not found in {}",
                        job.name, name, job.table_path
                    ))
                })
        };
        let mut columns: Vec<String> = Vec::with_capacity(job.columns.len());
        for name in &job.columns {
            let resolved = lookup(name)?;
            if !columns.contains(&resolved) {
                columns.push(resolved);
            }
        }
        let order_by = lookup(&job.order_by)?;

        let projected: Vec<&str> = columns.iter().map(String::as_str).collect();
        let batches = df
            .select_columns(&projected)?
            .sort(vec![ident(order_by).sort(true, false)])?
            .collect()
            .await?;
        let duration_ms = start.elapsed().as_millis() as u64;
        let rows = batches.iter().map(|b| b.num_rows() as u64).sum();

        tracing::info!(
            "Job {} on {} finished: {} rows in {} ms",
            job.name,
            job.endpoint,
            rows,
            duration_ms
        );
        Ok(StageMetrics { duration_ms, rows })
    }
}

/// Cluster strategy over the ordered and unordered table locations
pub struct DistributedEvaluator {
    ordered_path: String,
    unordered_path: String,
    endpoint: ClusterEndpoint,
    column_sizes: HashMap<String, f64>,
    submitter: Arc<dyn JobSubmitter>,
}

impl DistributedEvaluator {
    pub fn new(
        ordered_path: impl Into<String>,
        unordered_path: impl Into<String>,
        endpoint: ClusterEndpoint,
        column_sizes: HashMap<String, f64>,
        submitter: Arc<dyn JobSubmitter>,
    ) -> Self {
        Self {
            ordered_path: ordered_path.into(),
            unordered_path: unordered_path.into(),
            endpoint,
            column_sizes,
            submitter,
        }
    }

    /// Read the ordered variant's block metadata once and keep its average
    /// column chunk sizes for order-by selection.
    pub fn open(
        ordered_path: &str,
        unordered_path: &str,
        cluster: &ClusterConfig,
        submitter: Arc<dyn JobSubmitter>,
    ) -> Result<Self> {
        let stat = MetadataStat::open(resolve_path(ordered_path)?, &ParquetMetadataReader::new())?;
        let column_sizes = stat.column_sizes()?;
        tracing::info!(
            "Column sizes of {} columns over {} blocks loaded from {}",
            column_sizes.len(),
            stat.block_count(),
            ordered_path
        );
        Ok(Self::new(
            ordered_path,
            unordered_path,
            ClusterEndpoint::from(cluster),
            column_sizes,
            submitter,
        ))
    }

    pub fn column_sizes(&self) -> &HashMap<String, f64> {
        &self.column_sizes
    }

    fn table_path(&self, leg: TableLeg) -> &str {
        match leg {
            TableLeg::Ordered => &self.ordered_path,
            TableLeg::Unordered => &self.unordered_path,
        }
    }
}

#[async_trait]
impl EvaluationStrategy for DistributedEvaluator {
    fn method(&self) -> EvaluationMethod {
        EvaluationMethod::Spark
    }

    fn time_log_name(&self) -> &'static str {
        "spark_time"
    }

    fn writes_column_log(&self) -> bool {
        false
    }

    fn order_by_column(&self, query: &WorkloadQuery) -> Result<Option<String>> {
        select_order_by_column(query.columns(), &self.column_sizes).map(Some)
    }

    async fn execute(&self, leg: TableLeg, ctx: &QueryContext) -> Result<EvaluationResult> {
        let order_by = ctx.order_by.clone().ok_or_else(|| {
            ColordError::Execution(format!("query {} has no order-by column", ctx.index))
        })?;
        let job = JobSpec {
            name: leg.job_name(ctx.index),
            endpoint: self.endpoint.clone(),
            table_path: self.table_path(leg).to_string(),
            columns: ctx.query.columns().to_vec(),
            order_by,
        };
        let metrics = self.submitter.submit(&job).await?;
        Ok(EvaluationResult::new(metrics.duration_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colord_storage::fixture::write_fixture_file;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSubmitter {
        jobs: Mutex<Vec<JobSpec>>,
    }

    #[async_trait]
    impl JobSubmitter for RecordingSubmitter {
        async fn submit(&self, job: &JobSpec) -> Result<StageMetrics> {
            let mut jobs = self.jobs.lock().unwrap();
            jobs.push(job.clone());
            Ok(StageMetrics {
                duration_ms: 10 * jobs.len() as u64,
                rows: 0,
            })
        }
    }

    fn evaluator(submitter: Arc<RecordingSubmitter>) -> DistributedEvaluator {
        let sizes = [("a", 300.0), ("b", 100.0), ("c", 200.0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        DistributedEvaluator::new(
            "/t/ordered",
            "/t/unordered",
            ClusterEndpoint::from(&ClusterConfig::default()),
            sizes,
            submitter,
        )
    }

    #[tokio::test]
    async fn test_jobs_carry_leg_names_and_order_by() {
        let submitter = Arc::new(RecordingSubmitter::default());
        let evaluator = evaluator(submitter.clone());

        let query = WorkloadQuery::parse("0\t1\tA,b,c").unwrap();
        let order_by = evaluator.order_by_column(&query).unwrap();
        assert_eq!(order_by.as_deref(), Some("b"));

        let ctx = QueryContext {
            index: 7,
            query,
            order_by,
        };
        let o = evaluator.execute(TableLeg::Ordered, &ctx).await.unwrap();
        let u = evaluator.execute(TableLeg::Unordered, &ctx).await.unwrap();
        assert_eq!((o.elapsed_ms, u.elapsed_ms), (10, 20));

        let jobs = submitter.jobs.lock().unwrap();
        assert_eq!(jobs[0].name, "ordered_7");
        assert_eq!(jobs[0].table_path, "/t/ordered");
        assert_eq!(jobs[1].name, "unordered_7");
        assert_eq!(jobs[1].table_path, "/t/unordered");
        assert!(jobs.iter().all(|j| j.order_by == "b"));
    }

    #[tokio::test]
    async fn test_execute_without_order_by_fails() {
        let evaluator = evaluator(Arc::new(RecordingSubmitter::default()));
        let ctx = QueryContext {
            index: 0,
            query: WorkloadQuery::parse("0\t1\ta").unwrap(),
            order_by: None,
        };
        assert!(evaluator.execute(TableLeg::Ordered, &ctx).await.is_err());
    }

    #[test]
    fn test_open_reads_column_sizes() {
        let dir = TempDir::new().unwrap();
        write_fixture_file(&dir.path().join("part-0.parquet"), &["ID", "market"], 30, 10).unwrap();
        let path = dir.path().to_str().unwrap();

        let evaluator = DistributedEvaluator::open(
            path,
            path,
            &ClusterConfig::default(),
            Arc::new(DataFusionJobSubmitter::new()),
        )
        .unwrap();
        let sizes = evaluator.column_sizes();
        assert_eq!(sizes.len(), 2);
        assert!(sizes.contains_key("id"));
        assert!(sizes["market"] > 0.0);
    }

    #[tokio::test]
    async fn test_datafusion_submitter_runs_job() {
        let dir = TempDir::new().unwrap();
        write_fixture_file(&dir.path().join("part-0.parquet"), &["id", "Price", "qty"], 64, 16)
            .unwrap();
        write_fixture_file(&dir.path().join("part-1.parquet"), &["id", "Price", "qty"], 36, 16)
            .unwrap();

        let job = JobSpec {
            name: "ordered_0".to_string(),
            endpoint: ClusterEndpoint::from(&ClusterConfig::default()),
            table_path: dir.path().to_str().unwrap().to_string(),
            columns: vec!["price".to_string(), "QTY".to_string()],
            order_by: "qty".to_string(),
        };
        let metrics = DataFusionJobSubmitter::new()
            .with_target_partitions(2)
            .submit(&job)
            .await
            .unwrap();
        assert_eq!(metrics.rows, 100);
    }

    fn job(name: &str, table: &Path, columns: &[&str], order_by: &str) -> JobSpec {
        JobSpec {
            name: name.to_string(),
            endpoint: ClusterEndpoint::from(&ClusterConfig::default()),
            table_path: table.to_str().unwrap().to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            order_by: order_by.to_string(),
        }
    }

    #[tokio::test]
    async fn test_datafusion_submitter_reads_extensionless_files() {
        let dir = TempDir::new().unwrap();
        write_fixture_file(&dir.path().join("000000_0"), &["id", "qty"], 40, 16).unwrap();
        write_fixture_file(&dir.path().join("000001_0"), &["id", "qty"], 10, 16).unwrap();
        std::fs::write(dir.path().join("_SUCCESS"), b"").unwrap();

        let stat = MetadataStat::open(dir.path(), &ParquetMetadataReader::new()).unwrap();
        assert_eq!(stat.file_count(), 2);

        let metrics = DataFusionJobSubmitter::new()
            .submit(&job("ordered_0", dir.path(), &["id"], "qty"))
            .await
            .unwrap();
        assert_eq!(metrics.rows, 50);
    }

    #[tokio::test]
    async fn test_datafusion_submitter_projects_each_column_once() {
        let dir = TempDir::new().unwrap();
        write_fixture_file(&dir.path().join("part-0.parquet"), &["id", "qty"], 20, 8).unwrap();

        let metrics = DataFusionJobSubmitter::new()
            .submit(&job("unordered_0", dir.path(), &["id", "ID", "qty"], "id"))
            .await
            .unwrap();
        assert_eq!(metrics.rows, 20);
    }

    #[tokio::test]
    async fn test_datafusion_submitter_unknown_column() {
        let dir = TempDir::new().unwrap();
        write_fixture_file(&dir.path().join("part-0.parquet"), &["id"], 8, 8).unwrap();
        let job = JobSpec {
            name: "unordered_0".to_string(),
            endpoint: ClusterEndpoint::from(&ClusterConfig::default()),
            table_path: dir.path().to_str().unwrap().to_string(),
            columns: vec!["nope".to_string()],
            order_by: "nope".to_string(),
        };
        assert!(DataFusionJobSubmitter::new().submit(&job).await.is_err());
    }
}
