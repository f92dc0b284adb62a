//! OS file cache flushing between timed legs

use colord_common::{ColordError, Result};
use std::path::PathBuf;
use tokio::process::Command;

/// Runs the external cache-flush executable
#[derive(Debug, Clone)]
pub struct CacheDropper {
    script: PathBuf,
}

impl CacheDropper {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }

    /// Run the flush and wait for it to exit. The next timed leg must not
    /// start before the caches are actually dropped.
    pub async fn drop_caches(&self) -> Result<()> {
        let status = Command::new(&self.script)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| {
                ColordError::Io(std::io::Error::new(
                    e.kind(),
                    format!("failed to run {}: {}", self.script.display(), e),
                ))
            })?;
        if !status.success() {
            return Err(ColordError::CacheDrop(format!(
                "{} exited with {}",
                self.script.display(),
                status
            )));
        }
        tracing::debug!("Dropped caches with {:?}", self.script);
        Ok(())
    }
}
