//! The platform seam: catalog queries and handle-granting.
//!
//! Everything platform-specific sits behind [`Catalog`]. The resolver, writer and
//! consent negotiator only ever talk to this trait, so they can run against the
//! bundled [`LocalCatalog`](crate::engine::local::LocalCatalog) or any other backend.

use crate::engine::core::{ActionHandle, CatalogRecord, ContentIdentifier, ResourceIdentifier};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use thiserror::Error;

/// Selection used to find records for a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub display_name: String,
    /// Matches records whose bucket path starts with this value
    pub bucket_prefix: String,
}

/// How a write handle replaces the target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteMode {
    /// Truncate the target in place and stream into it. Not crash-atomic.
    #[default]
    Truncate,
    /// Write a fresh resource next to the target and swap it in on commit
    AtomicSwap,
}

/// Denial reported by the platform when opening a handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDenial {
    pub reason: String,
    /// Present when the user can grant access through a prompt
    pub action: Option<ActionHandle>,
}

impl PlatformDenial {
    pub fn recoverable(reason: impl Into<String>, action: ActionHandle) -> Self {
        Self {
            reason: reason.into(),
            action: Some(action),
        }
    }

    pub fn terminal(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            action: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    #[error("unknown catalog record: {0:?}")]
    UnknownRecord(ContentIdentifier),

    #[error("catalog I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("resource not found")]
    NotFound,

    #[error("permission denied: {}", .0.reason)]
    Denied(PlatformDenial),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Scoped write handle. Dropping it without `commit` releases the handle and
/// leaves any swap-mode scratch resource discarded.
pub trait WriteTarget: Write + Send {
    /// Flush and release, making the written content the resource content
    fn commit(self: Box<Self>) -> io::Result<()>;
}

pub trait Catalog: Send + Sync {
    /// Records matching the query, in catalog-native order
    fn query(&self, query: &CatalogQuery) -> Result<Vec<CatalogRecord>, CatalogError>;

    fn lookup(&self, id: &ContentIdentifier) -> Result<Option<CatalogRecord>, CatalogError>;

    /// The legacy raw path column. Only meaningful on legacy tiers.
    fn raw_path(&self, id: &ContentIdentifier) -> Result<Option<String>, CatalogError>;

    fn open_read(&self, id: &ResourceIdentifier) -> Result<Box<dyn Read + Send>, AccessError>;

    fn open_write(
        &self,
        id: &ResourceIdentifier,
        mode: WriteMode,
    ) -> Result<Box<dyn WriteTarget>, AccessError>;

    /// Build a batch grant handle covering every listed record
    fn create_write_request(&self, ids: &[ContentIdentifier]) -> Result<ActionHandle, CatalogError>;
}
