//! Record of threads that already have a finished video.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{WorkerError, WorkerResult};

/// One finished video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducedEntry {
    pub thread_id: String,
    pub produced_at: DateTime<Utc>,
    pub output: PathBuf,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    produced: Vec<ProducedEntry>,
    /// Bare id list written by older versions.
    #[serde(default, skip_serializing)]
    produced_ids: Vec<String>,
}

/// JSON-file ledger of produced threads.
#[derive(Debug)]
pub struct ProducedLedger {
    path: PathBuf,
    entries: Vec<ProducedEntry>,
    legacy_ids: HashSet<String>,
}

impl ProducedLedger {
    /// Load the ledger at `path`; a missing file is an empty ledger.
    pub async fn load(path: impl Into<PathBuf>) -> WorkerResult<Self> {
        let path = path.into();
        let file = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str::<LedgerFile>(&raw)
                .map_err(|e| WorkerError::ledger(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LedgerFile::default(),
            Err(e) => return Err(e.into()),
        };

        debug!(
            path = %path.display(),
            entries = file.produced.len() + file.produced_ids.len(),
            "Loaded produced ledger"
        );
        Ok(Self {
            path,
            entries: file.produced,
            legacy_ids: file.produced_ids.into_iter().collect(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[ProducedEntry] {
        &self.entries
    }

    pub fn is_produced(&self, thread_id: &str) -> bool {
        self.legacy_ids.contains(thread_id) || self.entries.iter().any(|e| e.thread_id == thread_id)
    }

    /// Record a finished video and persist the ledger.
    ///
    /// The file is written to a sibling temp file and renamed into place.
    pub async fn mark_produced(&mut self, thread_id: &str, output: &Path) -> WorkerResult<()> {
        self.entries.retain(|e| e.thread_id != thread_id);
        self.legacy_ids.remove(thread_id);
        self.entries.push(ProducedEntry {
            thread_id: thread_id.to_string(),
            produced_at: Utc::now(),
            output: output.to_path_buf(),
        });
        self.save().await?;
        info!(thread_id = %thread_id, output = %output.display(), "Marked thread as produced");
        Ok(())
    }

    async fn save(&self) -> WorkerResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut produced = self.entries.clone();
        produced.extend(self.legacy_ids.iter().map(|id| ProducedEntry {
            thread_id: id.clone(),
            produced_at: DateTime::<Utc>::UNIX_EPOCH,
            output: PathBuf::new(),
        }));
        let file = LedgerFile {
            produced,
            produced_ids: Vec::new(),
        };

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&file)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
