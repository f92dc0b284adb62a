//! colord CLI Binary

use clap::{Parser, Subcommand};
use colord_common::{EvaluationMethod, EvaluationParams};
use std::path::PathBuf;

mod column_size;
mod evaluation;
mod registry;

use registry::{CommandRegistry, Properties, GET_COLUMN_SIZE, WORKLOAD_EVALUATION};

/// colord CLI
#[derive(Parser, Debug)]
#[command(name = "colord")]
#[command(version = "0.1.0")]
#[command(about = "Evaluate column orderings of columnar tables against a workload")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a workload against the ordered and the unordered table
    Evaluate {
        /// TOML file with the evaluation parameters
        #[arg(long)]
        config: Option<PathBuf>,

        /// Evaluation method, overrides the config file
        #[arg(long, value_enum, ignore_case = true)]
        method: Option<EvaluationMethod>,

        /// Extra or overriding parameters, e.g. --param drop.cache=true
        #[arg(long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },

    /// Print or write per-column chunk size statistics of a table directory
    ColumnSize {
        /// Table directory
        #[arg(long)]
        dir: String,

        /// Write `name<TAB>avg<TAB>stddev` lines to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run a registered command with raw parameters
    Run {
        /// Command identifier, e.g. WORKLOAD_EVALUATION
        command: String,

        #[arg(long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 {
        return Err(format!("Expected format: key=value, got: {s}"));
    }
    Ok((parts[0].trim().to_string(), parts[1].trim().to_string()))
}

fn evaluation_properties(
    config: Option<PathBuf>,
    method: Option<EvaluationMethod>,
    overrides: Vec<(String, String)>,
) -> anyhow::Result<Properties> {
    let mut props = match config {
        Some(path) => EvaluationParams::load_from_file(path)?.to_properties(),
        None => Properties::new(),
    };
    if let Some(method) = method {
        props.insert("method".to_string(), method.to_string());
    }
    props.extend(overrides);
    Ok(props)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    let registry = CommandRegistry::with_builtin();

    let (id, params) = match args.command {
        Commands::Evaluate {
            config,
            method,
            params,
        } => (
            WORKLOAD_EVALUATION.to_string(),
            evaluation_properties(config, method, params)?,
        ),
        Commands::ColumnSize { dir, output } => {
            let mut props = Properties::new();
            props.insert("table.dir".to_string(), dir);
            if let Some(output) = output {
                props.insert("output.file".to_string(), output.display().to_string());
            }
            (GET_COLUMN_SIZE.to_string(), props)
        }
        Commands::Run { command, params } => (command, params.into_iter().collect()),
    };

    let command = registry.get(&id).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown command {}, expected one of: {}",
            id,
            registry.ids().join(", ")
        )
    })?;

    tracing::info!("Running {}", id);
    let results = command.execute(params).await;
    if results.get("success").map(String::as_str) != Some("true") {
        anyhow::bail!("{} failed", id);
    }
    Ok(())
}
