//! PDF proof-of-retrieval, one file per scraped page.
//!
//! Rendering is delegated to `wkhtmltopdf`, which also runs the page's
//! client-side scripts before printing.

use crate::config::SnapshotConfig;
use crate::scraper::error::ScrapeError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

pub struct SnapshotWriter {
    dir: PathBuf,
    tool: String,
    timeout: Duration,
}

impl SnapshotWriter {
    pub fn new(config: &SnapshotConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            tool: config.tool.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Deterministic file name for a page index.
    pub fn path_for(&self, page: u32) -> PathBuf {
        self.dir.join(format!("prova_consulta_page_{page}.pdf"))
    }

    pub async fn capture(&self, page: u32, url: &str) -> Result<PathBuf, ScrapeError> {
        ensure_dir(&self.dir)?;
        let path = self.path_for(page);

        debug!("Rendering {} → {:?}", url, path);
        let child = Command::new(&self.tool)
            .arg("--quiet")
            .arg(url)
            .arg(&path)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| self.failure(url, format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| self.failure(url, format!("could not run {}: {e}", self.tool)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(url, format!("{} ({})", output.status, stderr.trim())));
        }

        info!("Page {} saved for {}", page, url);
        Ok(path)
    }

    fn failure(&self, url: &str, reason: String) -> ScrapeError {
        ScrapeError::Snapshot {
            url: url.to_string(),
            reason,
        }
    }
}

fn ensure_dir(dir: &Path) -> Result<(), ScrapeError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        info!("Created snapshot directory {:?}", dir);
    }
    Ok(())
}
