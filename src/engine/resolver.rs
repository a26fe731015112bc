// Mapping between logical paths, catalog identifiers and document identifiers

use crate::engine::catalog::{AccessError, Catalog, CatalogError, CatalogQuery};
use crate::engine::core::{
    AccessStrategy, BucketTable, CapabilityTier, MEDIA_DOCUMENTS_AUTHORITY, MediaType,
    ResourceIdentifier,
};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("cannot access resource: {0}")]
    Inaccessible(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Turn a media-documents identifier into the catalog identifier it wraps.
///
/// Anything else is returned unchanged, so applying this twice is the same as once.
pub fn translate_document_identifier(id: &ResourceIdentifier) -> ResourceIdentifier {
    let ResourceIdentifier::Document(doc) = id else {
        return id.clone();
    };
    if doc.provider_authority != MEDIA_DOCUMENTS_AUTHORITY {
        return id.clone();
    }

    let Some((prefix, raw_id)) = doc.composite_id.split_once(':') else {
        return id.clone();
    };
    match (MediaType::from_document_prefix(prefix), raw_id.parse::<u64>()) {
        (Some(media_type), Ok(catalog_id)) => ResourceIdentifier::content(catalog_id, media_type),
        _ => id.clone(),
    }
}

pub struct CatalogResolver {
    catalog: Arc<dyn Catalog>,
    tier: CapabilityTier,
    buckets: BucketTable,
    storage_root: String,
}

impl CatalogResolver {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        tier: CapabilityTier,
        buckets: BucketTable,
        storage_root: &str,
    ) -> Self {
        Self {
            catalog,
            tier,
            buckets,
            storage_root: storage_root.trim_end_matches('/').to_string(),
        }
    }

    pub fn buckets(&self) -> &BucketTable {
        &self.buckets
    }

    /// Find the catalog identifier for an absolute path.
    ///
    /// Returns None when the path has no known bucket or no record matches. When
    /// several records share the name and bucket, the catalog's first row wins.
    pub fn resolve_identifier_from_path(&self, path: &str) -> Option<ResourceIdentifier> {
        let file_name = path.rsplit('/').next().filter(|name| !name.is_empty())?;
        let Some(bucket) = self.buckets.bucket_for(path) else {
            tracing::debug!(path, "no bucket for path");
            return None;
        };

        let query = CatalogQuery {
            display_name: file_name.to_string(),
            bucket_prefix: bucket,
        };
        let records = match self.catalog.query(&query) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(path, "catalog query failed: {}", e);
                return None;
            }
        };

        if records.len() > 1 {
            tracing::debug!(path, matches = records.len(), "ambiguous path, taking first match");
        }
        records
            .first()
            .map(|record| ResourceIdentifier::Content(record.content_id()))
    }

    /// Recover a display path for an identifier
    pub fn resolve_path_from_identifier(
        &self,
        id: &ResourceIdentifier,
    ) -> Result<Option<String>, ResolveError> {
        let content = match translate_document_identifier(id) {
            ResourceIdentifier::Content(content) => content,
            ResourceIdentifier::LegacyPath { absolute_path } => {
                return self.resolve_raw_path(absolute_path);
            }
            ResourceIdentifier::Document(doc) => {
                tracing::debug!(authority = %doc.provider_authority, "untranslatable document identifier");
                return Ok(None);
            }
        };

        match self.tier.strategy() {
            AccessStrategy::ScopedHandle => {
                self.confirm_openable(&content.into())?;

                // TODO: take the volume from the record instead of assuming the primary one
                Ok(self.catalog.lookup(&content)?.map(|record| {
                    format!(
                        "{}/{}{}",
                        self.storage_root, record.bucket_path, record.display_name
                    )
                }))
            }
            AccessStrategy::Legacy => Ok(self.catalog.raw_path(&content)?),
        }
    }

    /// Raw paths are only handed back as-is where raw access is allowed
    fn resolve_raw_path(&self, absolute_path: String) -> Result<Option<String>, ResolveError> {
        if self.tier.strategy() == AccessStrategy::ScopedHandle {
            self.confirm_openable(&ResourceIdentifier::legacy_path(absolute_path.as_str()))?;
        }
        Ok(Some(absolute_path))
    }

    // Open a read handle and drop it right away
    fn confirm_openable(&self, id: &ResourceIdentifier) -> Result<(), ResolveError> {
        match self.catalog.open_read(id) {
            Ok(_handle) => Ok(()),
            Err(AccessError::NotFound) => {
                Err(ResolveError::Inaccessible("resource not found".to_string()))
            }
            Err(e) => Err(ResolveError::Inaccessible(e.to_string())),
        }
    }
}
