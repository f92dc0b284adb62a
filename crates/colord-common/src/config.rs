//! Workload evaluation configuration

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::{ColordError, Result};

/// How each comparison leg is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(try_from = "String", into = "String")]
pub enum EvaluationMethod {
    /// Single-node sequential scan of the requested columns
    #[default]
    Local,
    /// One job per leg on the cluster compute system
    #[value(alias = "distributed")]
    Spark,
}

impl EvaluationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationMethod::Local => "LOCAL",
            EvaluationMethod::Spark => "SPARK",
        }
    }
}

impl FromStr for EvaluationMethod {
    type Err = ColordError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOCAL" => Ok(EvaluationMethod::Local),
            "SPARK" | "DISTRIBUTED" => Ok(EvaluationMethod::Spark),
            other => Err(ColordError::Config(format!(
                "unknown evaluation method '{other}', expected LOCAL or SPARK"
            ))),
        }
    }
}

impl TryFrom<String> for EvaluationMethod {
    type Error = ColordError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<EvaluationMethod> for String {
    fn from(method: EvaluationMethod) -> Self {
        method.as_str().to_string()
    }
}

impl std::fmt::Display for EvaluationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings of the external cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Host name of the distributed filesystem name node
    pub namenode: String,

    /// Port of the name node, usually 9000 or 8020
    pub hdfs_port: u16,

    /// Host name of the cluster master
    pub master: String,

    /// Port applications are submitted to
    pub app_port: u16,

    /// Port of the driver web UI, where stage metrics are published
    pub driver_webapps_port: u16,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            namenode: "localhost".to_string(),
            hdfs_port: 9000,
            master: "localhost".to_string(),
            app_port: 7077,
            driver_webapps_port: 4040,
        }
    }
}

/// Parameters of one workload evaluation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationParams {
    pub method: EvaluationMethod,

    /// Directory of the column-ordered table variant
    #[serde(rename = "ordered.table.dir")]
    pub ordered_table_dir: String,

    /// Directory of the default (unordered) table variant
    #[serde(rename = "table.dir")]
    pub table_dir: String,

    #[serde(rename = "workload.file")]
    pub workload_file: String,

    /// Local directory the result logs are written to
    #[serde(rename = "log.dir")]
    pub log_dir: String,

    /// Flush OS file caches before each timed leg
    #[serde(rename = "drop.cache", default)]
    pub drop_cache: bool,

    /// Executable that flushes the caches
    #[serde(
        rename = "drop.caches.sh",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub drop_caches_sh: Option<String>,

    #[serde(default)]
    pub cluster: ClusterConfig,
}

impl EvaluationParams {
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ColordError::Config(e.to_string()))
    }

    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Build parameters from a flat property set.
    ///
    /// Unknown keys are ignored so a caller can hand over its whole property
    /// set. Cluster settings use the `namenode`, `hdfs.port`, `spark.master`,
    /// `spark.app.port` and `spark.driver.webapps.port` keys.
    pub fn from_properties<I, K, V>(properties: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let props: BTreeMap<String, String> = properties
            .into_iter()
            .map(|(k, v)| (k.as_ref().trim().to_string(), v.as_ref().trim().to_string()))
            .collect();
        let get = |key: &str| props.get(key).cloned();
        let require = |key: &str| {
            get(key).ok_or_else(|| ColordError::Config(format!("missing parameter '{key}'")))
        };

        let mut cluster = ClusterConfig::default();
        if let Some(namenode) = get("namenode") {
            cluster.namenode = namenode;
        }
        if let Some(master) = get("spark.master") {
            cluster.master = master;
        }
        cluster.hdfs_port = parse_port(&props, "hdfs.port", cluster.hdfs_port)?;
        cluster.app_port = parse_port(&props, "spark.app.port", cluster.app_port)?;
        cluster.driver_webapps_port = parse_port(
            &props,
            "spark.driver.webapps.port",
            cluster.driver_webapps_port,
        )?;

        Ok(Self {
            method: require("method")?.parse()?,
            ordered_table_dir: require("ordered.table.dir")?,
            table_dir: require("table.dir")?,
            workload_file: require("workload.file")?,
            log_dir: require("log.dir")?,
            // Anything but a case-insensitive "true" means false.
            drop_cache: get("drop.cache")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            drop_caches_sh: get("drop.caches.sh").filter(|s| !s.is_empty()),
            cluster,
        })
    }

    /// Flatten back into the property set an invoking collaborator expects.
    pub fn to_properties(&self) -> BTreeMap<String, String> {
        let mut props = BTreeMap::new();
        props.insert("method".to_string(), self.method.to_string());
        props.insert(
            "ordered.table.dir".to_string(),
            self.ordered_table_dir.clone(),
        );
        props.insert("table.dir".to_string(), self.table_dir.clone());
        props.insert("workload.file".to_string(), self.workload_file.clone());
        props.insert("log.dir".to_string(), self.log_dir.clone());
        props.insert("drop.cache".to_string(), self.drop_cache.to_string());
        if let Some(sh) = &self.drop_caches_sh {
            props.insert("drop.caches.sh".to_string(), sh.clone());
        }
        props.insert("namenode".to_string(), self.cluster.namenode.clone());
        props.insert("hdfs.port".to_string(), self.cluster.hdfs_port.to_string());
        props.insert("spark.master".to_string(), self.cluster.master.clone());
        props.insert(
            "spark.app.port".to_string(),
            self.cluster.app_port.to_string(),
        );
        props.insert(
            "spark.driver.webapps.port".to_string(),
            self.cluster.driver_webapps_port.to_string(),
        );
        props
    }

    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("ordered.table.dir", &self.ordered_table_dir),
            ("table.dir", &self.table_dir),
            ("workload.file", &self.workload_file),
            ("log.dir", &self.log_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ColordError::Config(format!("'{key}' must not be empty")));
            }
        }
        if self.drop_cache && self.drop_caches_sh.as_deref().map_or(true, str::is_empty) {
            return Err(ColordError::Config(
                "'drop.cache' is enabled but 'drop.caches.sh' is not set".to_string(),
            ));
        }
        Ok(())
    }

    /// The log directory, always terminated by a path separator.
    pub fn normalized_log_dir(&self) -> String {
        if self.log_dir.ends_with('/') {
            self.log_dir.clone()
        } else {
            format!("{}/", self.log_dir)
        }
    }
}

fn parse_port(props: &BTreeMap<String, String>, key: &str, default: u16) -> Result<u16> {
    match props.get(key) {
        Some(v) => v
            .parse()
            .map_err(|e| ColordError::Config(format!("invalid '{key}' value '{v}': {e}"))),
        None => Ok(default),
    }
}
