//! Report Storage
//!
//! Each diagnosis report is written to disk as one JSON file. Only the
//! summaries used for listing are held in memory; full reports are read
//! back from disk on demand.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{DiagnosisReport, ReportSummary};
use crate::types::{AppError, AppResult};

#[derive(Clone)]
pub struct ReportStore {
    dir: PathBuf,
    index: Arc<RwLock<HashMap<Uuid, ReportSummary>>>,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            index: Arc::default(),
        }
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Write the report to disk, then index it
    pub async fn save(&self, report: &DiagnosisReport) -> AppResult<()> {
        fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(report.id);
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(report)?;
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, &path).await?;

        self.index
            .write()
            .await
            .insert(report.id, ReportSummary::from(report));
        debug!(report_id = %report.id, path = %path.display(), "Report saved");
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> AppResult<DiagnosisReport> {
        let path = self.path_for(id);
        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound(format!("report {}", id)));
            }
            Err(e) => return Err(e.into()),
        };
        let report: DiagnosisReport = serde_json::from_slice(&data)?;

        self.index
            .write()
            .await
            .entry(id)
            .or_insert_with(|| ReportSummary::from(&report));
        Ok(report)
    }

    /// Newest first
    pub async fn list(&self) -> Vec<ReportSummary> {
        let mut summaries: Vec<ReportSummary> = self.index.read().await.values().cloned().collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    /// Index reports already on disk; unreadable files are skipped
    pub async fn load_existing(&self) -> AppResult<usize> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut loaded = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = fs::read(&path)
                .await
                .map_err(AppError::from)
                .and_then(|data| serde_json::from_slice::<DiagnosisReport>(&data).map_err(AppError::from));
            match parsed {
                Ok(report) => {
                    self.index
                        .write()
                        .await
                        .insert(report.id, ReportSummary::from(&report));
                    loaded += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable report"),
            }
        }

        info!(count = loaded, dir = %self.dir.display(), "Loaded existing reports");
        Ok(loaded)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::sample_report;
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("agrigpt-store-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let dir = temp_dir();
        let store = ReportStore::new(&dir);
        let report = sample_report("tomato");

        store.save(&report).await.unwrap();
        assert!(dir.join(format!("{}.json", report.id)).exists());
        assert!(!dir.join(format!("{}.json.tmp", report.id)).exists());

        let fetched = store.get(report.id).await.unwrap();
        assert_eq!(fetched.diagnosis.content, "Apply sulfur dust.");
        assert_eq!(store.list().await.len(), 1);
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_get_falls_back_to_disk() {
        let dir = temp_dir();
        let report = sample_report("beans");
        ReportStore::new(&dir).save(&report).await.unwrap();

        let fresh = ReportStore::new(&dir);
        assert_eq!(fresh.get(report.id).await.unwrap().plant_name, "beans");
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_get_reads_from_disk_not_memory() {
        let dir = temp_dir();
        let store = ReportStore::new(&dir);
        let report = sample_report("sorghum");
        store.save(&report).await.unwrap();

        let summaries = store.list().await;
        assert_eq!(summaries[0].plant_name, "sorghum");
        assert_eq!(summaries[0].label, "Fungus");

        std::fs::remove_file(dir.join(format!("{}.json", report.id))).unwrap();
        let err = store.get(report.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_missing_report_is_not_found() {
        let store = ReportStore::new(temp_dir());
        let err = store.get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_load_existing_skips_garbage() {
        let dir = temp_dir();
        let first = sample_report("maize");
        let second = sample_report("cassava");
        let writer = ReportStore::new(&dir);
        writer.save(&first).await.unwrap();
        writer.save(&second).await.unwrap();
        std::fs::write(dir.join("broken.json"), b"{not json").unwrap();
        std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();

        let reader = ReportStore::new(&dir);
        assert_eq!(reader.load_existing().await.unwrap(), 2);
        assert_eq!(reader.list().await.len(), 2);
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_load_existing_without_dir() {
        let store = ReportStore::new(temp_dir());
        assert_eq!(store.load_existing().await.unwrap(), 0);
    }
}
