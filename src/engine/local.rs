//! Filesystem-backed catalog.
//!
//! A "volume" directory stands in for the primary shared-storage volume. Logical
//! paths under `logical_root` (e.g. `/storage/emulated/0/DCIM/Camera/a.mp4`) map to
//! files under the volume directory, and a JSON index plays the part of the
//! platform media catalog, including which records the app may write without
//! asking the user.

use crate::engine::catalog::{
    AccessError, Catalog, CatalogError, CatalogQuery, PlatformDenial, WriteMode, WriteTarget,
};
use crate::engine::consent::{ConsentOutcome, LaunchError, UiLauncher};
use crate::engine::core::{
    AccessStrategy, ActionHandle, CapabilityTier, CatalogIndex, CatalogRecord, ConsentLedger,
    ConsentRequest, ContentIdentifier, IndexedRecord, MediaType, PendingConsent,
    ResourceIdentifier, media_type_for, scan_streaming,
};
use anyhow::{Context, Result, bail};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tempfile::NamedTempFile;

const GRANT_PREFIX: &str = "grant:";

pub struct LocalCatalog {
    volume: PathBuf,
    logical_root: String,
    tier: CapabilityTier,
    index: Arc<RwLock<CatalogIndex>>,
}

impl LocalCatalog {
    /// Open the catalog for a volume, loading its index if one exists
    pub fn open(volume: impl Into<PathBuf>, logical_root: &str, tier: CapabilityTier) -> Result<Self> {
        let volume = volume.into();
        if !volume.is_dir() {
            bail!("Volume directory does not exist: {}", volume.display());
        }
        let index = CatalogIndex::load(&volume)?;

        Ok(Self {
            volume,
            logical_root: logical_root.trim_end_matches('/').to_string(),
            tier,
            index: Arc::new(RwLock::new(index)),
        })
    }

    pub fn volume(&self) -> &Path {
        &self.volume
    }

    pub fn logical_root(&self) -> &str {
        &self.logical_root
    }

    pub fn tier(&self) -> CapabilityTier {
        self.tier
    }

    fn read_index(&self) -> RwLockReadGuard<'_, CatalogIndex> {
        self.index.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_index(&self) -> RwLockWriteGuard<'_, CatalogIndex> {
        self.index.write().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, index: &CatalogIndex) -> Result<(), CatalogError> {
        index
            .save(&self.volume)
            .map_err(|e| CatalogError::Unavailable(format!("{:#}", e)))
    }

    /// Map a logical absolute path onto the volume. None when it lies outside the root.
    pub fn logical_to_real(&self, logical: &str) -> Option<PathBuf> {
        let rest = logical.strip_prefix(&self.logical_root)?;
        let rest = rest.strip_prefix('/')?;
        let relative = Path::new(rest);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.volume.join(relative))
    }

    /// Logical path of a volume file
    pub fn real_to_logical(&self, real: &Path) -> Option<String> {
        let relative = real.strip_prefix(&self.volume).ok()?;
        let relative = relative.to_str()?.replace('\\', "/");
        Some(format!("{}/{}", self.logical_root, relative))
    }

    fn record_path(&self, record: &IndexedRecord) -> PathBuf {
        self.volume.join(record.relative_path())
    }

    /// Index every media file on the volume that is not yet in the catalog
    pub fn scan(&self, owned: bool) -> Result<usize> {
        let mut found = Vec::new();
        scan_streaming(&self.volume, |path, media_type| found.push((path, media_type)))?;

        let mut index = self.write_index();
        let mut added = 0;
        for (path, media_type) in found {
            let Some((bucket_path, display_name)) = self.split_location(&path) else {
                continue;
            };
            if index.find_by_location(&bucket_path, &display_name).is_some() {
                continue;
            }
            insert_record(&mut index, bucket_path, display_name, media_type, owned, &path);
            added += 1;
        }

        index.save(&self.volume)?;
        tracing::info!(added, volume = %self.volume.display(), "catalog scan complete");
        Ok(added)
    }

    /// Register or refresh one file, addressed by logical path
    pub fn scan_file(&self, logical: &str, owned: bool) -> Result<ContentIdentifier> {
        let real = self
            .logical_to_real(logical)
            .with_context(|| format!("Path is outside {}: {}", self.logical_root, logical))?;
        if !real.is_file() {
            bail!("File not found: {}", logical);
        }
        let media_type = media_type_for(&real)
            .with_context(|| format!("Not a media file: {}", logical))?;
        let (bucket_path, display_name) = self
            .split_location(&real)
            .with_context(|| format!("Cannot derive a bucket for {}", logical))?;

        let mut index = self.write_index();
        let id = if let Some(record) = index
            .records
            .iter_mut()
            .find(|r| r.bucket_path == bucket_path && r.display_name == display_name)
        {
            record.owned |= owned;
            refresh_stats(record, &real);
            record.id
        } else {
            insert_record(&mut index, bucket_path, display_name, media_type, owned, &real)
        };

        index.save(&self.volume)?;
        tracing::debug!(id, path = logical, "registered file in catalog");

        let record = index
            .records
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.to_record())
            .context("Record vanished after registration")?;
        Ok(record.content_id())
    }

    /// Mark every record named by a grant handle as granted
    pub fn apply_grant(&self, handle: &ActionHandle) -> Result<usize, CatalogError> {
        let targets = decode_grant(handle)
            .ok_or_else(|| CatalogError::Unavailable(format!("unrecognized grant handle: {}", handle.as_str())))?;

        let mut index = self.write_index();
        let mut granted = 0;
        for target in &targets {
            if let Some(record) = index.find_mut(target.catalog_id, target.media_type) {
                record.granted = true;
                granted += 1;
            }
        }
        self.persist(&index)?;

        tracing::info!(granted, "applied write grant");
        Ok(granted)
    }

    pub fn set_read_only(&self, id: &ContentIdentifier, read_only: bool) -> Result<(), CatalogError> {
        let mut index = self.write_index();
        let record = index
            .find_mut(id.catalog_id, id.media_type)
            .ok_or(CatalogError::UnknownRecord(*id))?;
        record.read_only = read_only;
        self.persist(&index)
    }

    /// Snapshot of the persisted row, access bits included
    pub fn indexed(&self, id: &ContentIdentifier) -> Option<IndexedRecord> {
        self.read_index().find(id.catalog_id, id.media_type).cloned()
    }

    fn split_location(&self, real: &Path) -> Option<(String, String)> {
        let relative = real.strip_prefix(&self.volume).ok()?;
        let display_name = relative.file_name()?.to_str()?.to_string();
        let bucket_path = match relative.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                format!("{}/", parent.to_str()?.replace('\\', "/"))
            }
            _ => String::new(),
        };
        Some((bucket_path, display_name))
    }

    fn resolve_real(&self, id: &ResourceIdentifier) -> Result<(PathBuf, Option<IndexedRecord>), AccessError> {
        match id {
            ResourceIdentifier::Content(content) => {
                let record = self
                    .read_index()
                    .find(content.catalog_id, content.media_type)
                    .cloned()
                    .ok_or(AccessError::NotFound)?;
                Ok((self.record_path(&record), Some(record)))
            }
            ResourceIdentifier::LegacyPath { absolute_path } => {
                if !self.tier.strategy().permits_raw_paths() {
                    return Err(AccessError::Denied(PlatformDenial::terminal(
                        "raw path access is not permitted on this tier",
                    )));
                }
                let real = self.logical_to_real(absolute_path).ok_or(AccessError::NotFound)?;
                Ok((real, None))
            }
            // This catalog does not host any document provider
            ResourceIdentifier::Document(_) => Err(AccessError::NotFound),
        }
    }

    fn check_write_access(&self, record: &IndexedRecord) -> Result<(), AccessError> {
        if record.read_only {
            return Err(AccessError::Denied(PlatformDenial::terminal(format!(
                "{} is read-only",
                record.display_name
            ))));
        }

        match self.tier.strategy() {
            AccessStrategy::Legacy => Ok(()),
            AccessStrategy::ScopedHandle if record.owned || record.granted => Ok(()),
            AccessStrategy::ScopedHandle => {
                let target = record.to_record().content_id();
                Err(AccessError::Denied(PlatformDenial::recoverable(
                    format!("{} is not owned by this app", record.display_name),
                    encode_grant(&[target]),
                )))
            }
        }
    }
}

impl Catalog for LocalCatalog {
    fn query(&self, query: &CatalogQuery) -> Result<Vec<CatalogRecord>, CatalogError> {
        Ok(self
            .read_index()
            .records
            .iter()
            .filter(|r| {
                r.display_name == query.display_name && r.bucket_path.starts_with(&query.bucket_prefix)
            })
            .map(IndexedRecord::to_record)
            .collect())
    }

    fn lookup(&self, id: &ContentIdentifier) -> Result<Option<CatalogRecord>, CatalogError> {
        Ok(self
            .read_index()
            .find(id.catalog_id, id.media_type)
            .map(IndexedRecord::to_record))
    }

    fn raw_path(&self, id: &ContentIdentifier) -> Result<Option<String>, CatalogError> {
        Ok(self
            .read_index()
            .find(id.catalog_id, id.media_type)
            .map(|r| format!("{}/{}", self.logical_root, r.relative_path())))
    }

    fn open_read(&self, id: &ResourceIdentifier) -> Result<Box<dyn Read + Send>, AccessError> {
        let (real, _) = self.resolve_real(id)?;
        let file = File::open(&real).map_err(classify_io)?;
        Ok(Box::new(file))
    }

    fn open_write(
        &self,
        id: &ResourceIdentifier,
        mode: WriteMode,
    ) -> Result<Box<dyn WriteTarget>, AccessError> {
        let (real, record) = self.resolve_real(id)?;
        if let Some(record) = &record {
            self.check_write_access(record)?;
        }
        if !real.is_file() {
            return Err(AccessError::NotFound);
        }

        let refresh = StatsRefresh {
            index: Arc::clone(&self.index),
            volume: self.volume.clone(),
            key: record.map(|r| (r.id, r.media_type)),
        };

        match mode {
            WriteMode::Truncate => {
                let file = OpenOptions::new()
                    .write(true)
                    .truncate(true)
                    .open(&real)
                    .map_err(classify_io)?;
                Ok(Box::new(TruncateTarget {
                    file,
                    path: real,
                    refresh,
                }))
            }
            WriteMode::AtomicSwap => {
                let dir = real.parent().ok_or(AccessError::NotFound)?;
                let scratch = NamedTempFile::new_in(dir).map_err(classify_io)?;
                Ok(Box::new(SwapTarget {
                    scratch,
                    dest: real,
                    refresh,
                }))
            }
        }
    }

    fn create_write_request(&self, ids: &[ContentIdentifier]) -> Result<ActionHandle, CatalogError> {
        let index = self.read_index();
        for id in ids {
            if index.find(id.catalog_id, id.media_type).is_none() {
                return Err(CatalogError::UnknownRecord(*id));
            }
        }
        Ok(encode_grant(ids))
    }
}

/// UI host for headless use: records each grant prompt in the volume's consent
/// ledger, to be answered later through [`LocalCatalog::answer_consent`].
pub struct LedgerLauncher {
    volume: PathBuf,
}

impl LedgerLauncher {
    pub fn new(volume: impl Into<PathBuf>) -> Self {
        Self {
            volume: volume.into(),
        }
    }
}

impl UiLauncher for LedgerLauncher {
    fn launch(&self, request: &ConsentRequest) -> Result<(), LaunchError> {
        let mut ledger =
            ConsentLedger::load(&self.volume).map_err(|e| LaunchError::Failed(format!("{:#}", e)))?;
        ledger.push(PendingConsent::from_request(request));
        ledger
            .save(&self.volume)
            .map_err(|e| LaunchError::Failed(format!("{:#}", e)))
    }

    fn withdraw(&self, correlation_token: &str) {
        let result = ConsentLedger::load(&self.volume).and_then(|mut ledger| {
            if ledger.take(correlation_token).is_some() {
                ledger.save(&self.volume)?;
            }
            Ok(())
        });
        if let Err(e) = result {
            tracing::warn!(token = correlation_token, "Failed to withdraw grant prompt: {:#}", e);
        }
    }
}

impl LocalCatalog {
    /// Answer a prompt recorded by [`LedgerLauncher`]; approval grants access
    pub fn answer_consent(&self, token: &str, outcome: ConsentOutcome) -> Result<PendingConsent> {
        let mut ledger = ConsentLedger::load(&self.volume)?;
        let entry = ledger
            .take(token)
            .with_context(|| format!("No pending consent with token {}", token))?;

        if outcome == ConsentOutcome::Approved {
            self.apply_grant(&entry.action_handle)?;
        }
        ledger.save(&self.volume)?;

        tracing::info!(token, ?outcome, "consent recorded");
        Ok(entry)
    }
}

fn insert_record(
    index: &mut CatalogIndex,
    bucket_path: String,
    display_name: String,
    media_type: MediaType,
    owned: bool,
    real: &Path,
) -> u64 {
    let id = index.allocate_id();
    let mut record = IndexedRecord {
        id,
        display_name,
        bucket_path,
        media_type,
        owned,
        read_only: false,
        granted: false,
        size_bytes: 0,
        date_modified: 0,
    };
    refresh_stats(&mut record, real);
    index.records.push(record);
    id
}

fn refresh_stats(record: &mut IndexedRecord, real: &Path) {
    record.size_bytes = std::fs::metadata(real).map(|m| m.len()).unwrap_or(0);
    record.date_modified = chrono::Utc::now().timestamp();
}

/// Map an OS error onto the access taxonomy
fn classify_io(err: io::Error) -> AccessError {
    #[cfg(unix)]
    if err.raw_os_error() == Some(libc::EROFS) {
        return AccessError::Denied(PlatformDenial::terminal("read-only file system"));
    }

    match err.kind() {
        io::ErrorKind::NotFound => AccessError::NotFound,
        io::ErrorKind::PermissionDenied => {
            AccessError::Denied(PlatformDenial::terminal(err.to_string()))
        }
        _ => AccessError::Io(err),
    }
}

fn encode_grant(ids: &[ContentIdentifier]) -> ActionHandle {
    let targets: Vec<String> = ids
        .iter()
        .map(|id| format!("{}/{}", id.media_type.collection(), id.catalog_id))
        .collect();
    ActionHandle::new(format!("{}{}", GRANT_PREFIX, targets.join(",")))
}

fn decode_grant(handle: &ActionHandle) -> Option<Vec<ContentIdentifier>> {
    let body = handle.as_str().strip_prefix(GRANT_PREFIX)?;
    body.split(',')
        .map(|target| {
            let (collection, id) = target.split_once('/')?;
            Some(ContentIdentifier {
                catalog_id: id.parse().ok()?,
                media_type: MediaType::from_collection(collection)?,
            })
        })
        .collect()
}

/// Refreshes the catalog row once new content is in place
struct StatsRefresh {
    index: Arc<RwLock<CatalogIndex>>,
    volume: PathBuf,
    key: Option<(u64, MediaType)>,
}

impl StatsRefresh {
    fn apply(&self, real: &Path) {
        let Some((id, media_type)) = self.key else {
            return;
        };
        let mut index = self.index.write().unwrap_or_else(|e| e.into_inner());
        if let Some(record) = index.find_mut(id, media_type) {
            refresh_stats(record, real);
        }
        if let Err(e) = index.save(&self.volume) {
            tracing::warn!("Failed to persist catalog after write: {:#}", e);
        }
    }
}

struct TruncateTarget {
    file: File,
    path: PathBuf,
    refresh: StatsRefresh,
}

impl Write for TruncateTarget {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl WriteTarget for TruncateTarget {
    fn commit(mut self: Box<Self>) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        self.refresh.apply(&self.path);
        Ok(())
    }
}

struct SwapTarget {
    scratch: NamedTempFile,
    dest: PathBuf,
    refresh: StatsRefresh,
}

impl Write for SwapTarget {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.scratch.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.scratch.flush()
    }
}

impl WriteTarget for SwapTarget {
    fn commit(self: Box<Self>) -> io::Result<()> {
        let SwapTarget {
            mut scratch,
            dest,
            refresh,
        } = *self;
        scratch.flush()?;
        scratch.as_file().sync_all()?;
        scratch.persist(&dest).map_err(|e| e.error)?;
        refresh.apply(&dest);
        Ok(())
    }
}
