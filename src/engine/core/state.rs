use super::scan::METADATA_DIR;
use super::types::{ActionHandle, CatalogRecord, ConsentRequest, MediaType};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const INDEX_FILE: &str = "catalog.json";
const CONSENT_FILE: &str = "consent.json";

fn metadata_dir(volume: &Path) -> PathBuf {
    volume.join(METADATA_DIR)
}

/// One persisted catalog row plus the access bits the local catalog enforces
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexedRecord {
    pub id: u64,
    pub display_name: String,
    pub bucket_path: String,
    pub media_type: MediaType,

    /// Written by this app, so writable without consent
    #[serde(default)]
    pub owned: bool,
    #[serde(default)]
    pub read_only: bool,
    /// User approved a grant for this record
    #[serde(default)]
    pub granted: bool,

    #[serde(default)]
    pub size_bytes: u64,
    /// Seconds since the epoch
    #[serde(default)]
    pub date_modified: i64,
}

impl IndexedRecord {
    pub fn to_record(&self) -> CatalogRecord {
        CatalogRecord {
            id: self.id,
            display_name: self.display_name.clone(),
            bucket_path: self.bucket_path.clone(),
            media_type: self.media_type,
        }
    }

    /// Path relative to the volume root
    pub fn relative_path(&self) -> String {
        format!("{}{}", self.bucket_path, self.display_name)
    }
}

/// Persistent catalog index stored in <volume>/.mediabridge/catalog.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogIndex {
    pub next_id: u64,
    pub records: Vec<IndexedRecord>,
}

impl Default for CatalogIndex {
    fn default() -> Self {
        Self {
            next_id: 1,
            records: Vec::new(),
        }
    }
}

impl CatalogIndex {
    pub fn path(volume: &Path) -> PathBuf {
        metadata_dir(volume).join(INDEX_FILE)
    }

    pub fn exists(volume: &Path) -> bool {
        Self::path(volume).exists()
    }

    /// Load the index, or an empty one when the volume was never scanned
    pub fn load(volume: &Path) -> Result<Self> {
        let index_path = Self::path(volume);
        if !index_path.exists() {
            return Ok(Self::default());
        }

        let file = File::open(&index_path)
            .with_context(|| format!("Failed to open {}", index_path.display()))?;
        let index: CatalogIndex = serde_json::from_reader(file)
            .with_context(|| format!("Failed to parse {}", index_path.display()))?;

        Ok(index)
    }

    pub fn save(&self, volume: &Path) -> Result<()> {
        let dir = metadata_dir(volume);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let json = serde_json::to_string_pretty(&self).context("Failed to serialize catalog index")?;
        let mut file =
            File::create(Self::path(volume)).context("Failed to create catalog index file")?;
        file.write_all(json.as_bytes())
            .context("Failed to write catalog index file")?;

        Ok(())
    }

    pub fn find(&self, id: u64, media_type: MediaType) -> Option<&IndexedRecord> {
        self.records
            .iter()
            .find(|r| r.id == id && r.media_type == media_type)
    }

    pub fn find_mut(&mut self, id: u64, media_type: MediaType) -> Option<&mut IndexedRecord> {
        self.records
            .iter_mut()
            .find(|r| r.id == id && r.media_type == media_type)
    }

    pub fn find_by_location(&self, bucket_path: &str, display_name: &str) -> Option<&IndexedRecord> {
        self.records
            .iter()
            .find(|r| r.bucket_path == bucket_path && r.display_name == display_name)
    }

    pub fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// A grant prompt recorded by the CLI launcher, answered later with `consent <token>`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingConsent {
    pub correlation_token: String,
    pub action_handle: ActionHandle,
    pub issued_at: i64,
}

impl PendingConsent {
    pub fn from_request(request: &ConsentRequest) -> Self {
        Self {
            correlation_token: request.correlation_token.clone(),
            action_handle: request.action_handle.clone(),
            issued_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Pending grant prompts stored in <volume>/.mediabridge/consent.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsentLedger {
    pub pending: Vec<PendingConsent>,
}

impl ConsentLedger {
    pub fn path(volume: &Path) -> PathBuf {
        metadata_dir(volume).join(CONSENT_FILE)
    }

    pub fn load(volume: &Path) -> Result<Self> {
        let ledger_path = Self::path(volume);
        if !ledger_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&ledger_path)
            .with_context(|| format!("Failed to read {}", ledger_path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", ledger_path.display()))
    }

    pub fn save(&self, volume: &Path) -> Result<()> {
        let dir = metadata_dir(volume);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let json = serde_json::to_string_pretty(&self).context("Failed to serialize consent ledger")?;
        fs::write(Self::path(volume), json).context("Failed to write consent ledger")?;
        Ok(())
    }

    /// Record a prompt. An earlier prompt for the same grant is replaced, so only
    /// the newest token can answer it.
    pub fn push(&mut self, entry: PendingConsent) {
        self.pending.retain(|p| {
            p.correlation_token != entry.correlation_token && p.action_handle != entry.action_handle
        });
        self.pending.push(entry);
    }

    /// Remove and return the entry for a token
    pub fn take(&mut self, token: &str) -> Option<PendingConsent> {
        let pos = self
            .pending
            .iter()
            .position(|p| p.correlation_token == token)?;
        Some(self.pending.remove(pos))
    }
}
