//! colord Evaluator - Comparative workload evaluation of table layouts

pub mod cache;
pub mod distributed;
pub mod driver;
pub mod local;
pub mod order;
pub mod strategy;
pub mod workload;

pub use cache::CacheDropper;
pub use distributed::{
    ClusterEndpoint, DataFusionJobSubmitter, DistributedEvaluator, JobSpec, JobSubmitter,
    StageMetrics,
};
pub use driver::{EvaluationReport, WorkloadEvaluation};
pub use local::{LocalEvaluator, LocalTable};
pub use order::select_order_by_column;
pub use strategy::{EvaluationStrategy, QueryContext, TableLeg};
pub use workload::{WorkloadQuery, WorkloadReader};
