//! Filesystem report store.
//!
//! Layout: `<root>/<report_id>/report.json` plus `report.digest`, the SHA-256
//! of the JSON bytes. `report_id` is derived from the report's content digest
//! and generation time, so re-persisting the same report is idempotent.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::collab::ReportStore;
use crate::domain::digest::{digest_bytes, short};
use crate::domain::error::PersistenceError;
use crate::domain::report::ConfidenceReport;

const REPORT_FILE: &str = "report.json";
const DIGEST_FILE: &str = "report.digest";

#[derive(Debug, Clone)]
pub struct FsReportStore {
    root: PathBuf,
}

impl FsReportStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stable identifier for a report.
    pub fn report_id(report: &ConfidenceReport) -> String {
        let stamp = report.generated_at().timestamp_millis();
        let seed = format!("{}|{}", report.content_digest(), stamp);
        format!("rpt-{}", short(&digest_bytes(seed.as_bytes()), 16))
    }

    fn write_sync(&self, report: &ConfidenceReport) -> Result<String, PersistenceError> {
        let id = Self::report_id(report);
        let dir = self.root.join(&id);
        std::fs::create_dir_all(&dir)?;

        let json = serde_json::to_vec_pretty(report)?;
        let digest = digest_bytes(&json);
        std::fs::write(dir.join(REPORT_FILE), &json)?;
        std::fs::write(dir.join(DIGEST_FILE), digest.as_bytes())?;
        Ok(id)
    }

    fn read_sync(&self, report_id: &str) -> Result<ConfidenceReport, PersistenceError> {
        if report_id.is_empty() || report_id.contains(['/', '\\']) || report_id.contains("..") {
            return Err(PersistenceError::Backend(format!(
                "invalid report id {report_id:?}"
            )));
        }
        let dir = self.root.join(report_id);
        let json = std::fs::read(dir.join(REPORT_FILE))?;
        let expected = std::fs::read_to_string(dir.join(DIGEST_FILE))?;
        let actual = digest_bytes(&json);
        if expected.trim() != actual {
            return Err(PersistenceError::DigestMismatch {
                expected: expected.trim().to_string(),
                actual,
            });
        }
        Ok(serde_json::from_slice(&json)?)
    }
}

#[async_trait]
impl ReportStore for FsReportStore {
    async fn persist(&self, report: &ConfidenceReport) -> Result<String, PersistenceError> {
        let store = self.clone();
        let report = report.clone();
        tokio::task::spawn_blocking(move || store.write_sync(&report))
            .await
            .map_err(|e| PersistenceError::Backend(format!("store task failed: {e}")))?
    }

    async fn load(&self, report_id: &str) -> Result<ConfidenceReport, PersistenceError> {
        let store = self.clone();
        let id = report_id.to_string();
        tokio::task::spawn_blocking(move || store.read_sync(&id))
            .await
            .map_err(|e| PersistenceError::Backend(format!("store task failed: {e}")))?
    }
}
