//! Dedup ledger: which incidents already have a ticket in which repository.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use incident_model::{DedupKey, TicketRecord};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::errors::{Result, TicketingError};

#[async_trait]
pub trait TicketLedger: Send + Sync {
    async fn find(&self, key: &DedupKey) -> Result<Option<TicketRecord>>;

    /// Store `record` unless its key is already present.
    ///
    /// Returns `false` when an entry for the key existed.
    async fn insert_if_absent(&self, record: TicketRecord) -> Result<bool>;
}

/// Ledger that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryTicketLedger {
    records: Mutex<BTreeMap<DedupKey, TicketRecord>>,
}

impl MemoryTicketLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }
}

#[async_trait]
impl TicketLedger for MemoryTicketLedger {
    async fn find(&self, key: &DedupKey) -> Result<Option<TicketRecord>> {
        Ok(self.records.lock().await.get(key).cloned())
    }

    async fn insert_if_absent(&self, record: TicketRecord) -> Result<bool> {
        let mut records = self.records.lock().await;
        if records.contains_key(&record.key()) {
            return Ok(false);
        }
        records.insert(record.key(), record);
        Ok(true)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    records: Vec<TicketRecord>,
}

/// JSON-file ledger, loaded once and rewritten atomically on every insert.
#[derive(Debug)]
pub struct FileTicketLedger {
    path: PathBuf,
    records: Mutex<BTreeMap<DedupKey, TicketRecord>>,
}

impl FileTicketLedger {
    /// Open the ledger at `path`; a missing file is an empty ledger.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = match tokio::fs::read(&path).await {
            Ok(raw) => {
                let file: LedgerFile =
                    serde_json::from_slice(&raw).map_err(|source| TicketingError::LedgerFormat {
                        path: path.clone(),
                        source,
                    })?;
                file.records
                    .into_iter()
                    .map(|record| (record.key(), record))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(TicketingError::LedgerIo { path, source }),
        };

        info!(path = %path.display(), records = records.len(), "Opened ticket ledger");
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn save(&self, records: &BTreeMap<DedupKey, TicketRecord>) -> Result<()> {
        let io_error = |source: std::io::Error| TicketingError::LedgerIo {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        let file = LedgerFile {
            records: records.values().cloned().collect(),
        };
        let raw = serde_json::to_vec_pretty(&file).map_err(|source| TicketingError::LedgerFormat {
            path: self.path.clone(),
            source,
        })?;

        // Write-then-rename so a crash never leaves a truncated ledger.
        let tmp = self
            .path
            .with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, &raw).await.map_err(io_error)?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_error(e));
        }
        debug!(path = %self.path.display(), records = records.len(), "Saved ticket ledger");
        Ok(())
    }
}

#[async_trait]
impl TicketLedger for FileTicketLedger {
    async fn find(&self, key: &DedupKey) -> Result<Option<TicketRecord>> {
        Ok(self.records.lock().await.get(key).cloned())
    }

    /// A record whose save fails stays in memory, so this process still sees
    /// it as a duplicate; it reaches disk with the next successful save.
    async fn insert_if_absent(&self, record: TicketRecord) -> Result<bool> {
        let mut records = self.records.lock().await;
        if records.contains_key(&record.key()) {
            return Ok(false);
        }
        records.insert(record.key(), record);
        self.save(&records).await?;
        Ok(true)
    }
}
