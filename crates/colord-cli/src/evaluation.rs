//! WORKLOAD_EVALUATION command

use async_trait::async_trait;
use colord_common::EvaluationParams;
use colord_evaluator::WorkloadEvaluation;

use crate::registry::{Command, Properties};

pub struct WorkloadEvaluationCommand;

/// Progress line as printed by the CLI. `fraction` is in [0, 1].
pub fn progress_message(fraction: f64) -> String {
    format!(
        "WORKLOAD_EVALUATION: {:.2}% finished",
        (fraction * 10000.0).floor() / 100.0
    )
}

#[async_trait]
impl Command for WorkloadEvaluationCommand {
    async fn execute(&self, params: Properties) -> Properties {
        let parsed = match EvaluationParams::from_properties(&params) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("invalid workload evaluation parameters: {}", e);
                let mut results = params;
                results.insert("success".to_string(), "false".to_string());
                return results;
            }
        };

        let report = WorkloadEvaluation::new(parsed)
            .run(
                |fraction| tracing::info!("{}", progress_message(fraction)),
                |_| tracing::info!("Finish."),
            )
            .await;

        let mut results = params;
        results.extend(report.to_properties());
        results
    }
}
