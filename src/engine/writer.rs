// Truncate-and-rewrite of a catalog resource from a staging file

use crate::engine::catalog::{AccessError, Catalog, WriteMode};
use crate::engine::consent::on_permission_denied;
use crate::engine::core::{
    CapabilityTier, PermissionDenial, ReplacementOutcome, ResourceIdentifier,
};
use crate::engine::resolver::translate_document_identifier;
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

pub struct ResourceWriter {
    catalog: Arc<dyn Catalog>,
    tier: CapabilityTier,
    mode: WriteMode,
}

impl ResourceWriter {
    pub fn new(catalog: Arc<dyn Catalog>, tier: CapabilityTier, mode: WriteMode) -> Self {
        Self {
            catalog,
            tier,
            mode,
        }
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Replace the content of `identifier` with the bytes of `staging`.
    ///
    /// The staging file is opened before the target, so a missing or unreadable
    /// staging file never touches the target. In `Truncate` mode a failure after
    /// the target was opened leaves it partially written.
    pub fn replace(&self, identifier: &ResourceIdentifier, staging: &Path) -> ReplacementOutcome {
        let mut source = match open_staging(staging) {
            Ok(file) => file,
            Err(e) => {
                tracing::debug!(staging = %staging.display(), "staging file unavailable: {}", e);
                return ReplacementOutcome::NotFound {
                    what: format!("staging file {}", staging.display()),
                };
            }
        };

        let target_id = translate_document_identifier(identifier);
        let mut target = match self.catalog.open_write(&target_id, self.mode) {
            Ok(target) => target,
            Err(AccessError::NotFound) => {
                return ReplacementOutcome::NotFound {
                    what: format!("target {}", target_id),
                };
            }
            Err(AccessError::Denied(denial)) => {
                tracing::warn!(resource = %target_id, "write denied: {}", denial.reason);
                let denial = match on_permission_denied(denial, self.tier) {
                    Ok(request) => PermissionDenial::Recoverable(request),
                    Err(fatal) => PermissionDenial::Terminal {
                        reason: fatal.to_string(),
                    },
                };
                return ReplacementOutcome::PermissionDenied(denial);
            }
            Err(AccessError::Io(e)) => {
                return ReplacementOutcome::IoFailure {
                    reason: format!("failed to open {}: {}", target_id, e),
                };
            }
        };

        // `target` is released on every return below; uncommitted swap scratch is discarded
        let copied = match io::copy(&mut source, &mut target) {
            Ok(n) => n,
            Err(e) => {
                return ReplacementOutcome::IoFailure {
                    reason: format!("failed to write {}: {}", target_id, e),
                };
            }
        };

        if let Err(e) = target.commit() {
            return ReplacementOutcome::IoFailure {
                reason: format!("failed to finalize {}: {}", target_id, e),
            };
        }

        tracing::info!(resource = %target_id, bytes = copied, mode = ?self.mode, "replaced resource");
        ReplacementOutcome::Success
    }
}

fn open_staging(path: &Path) -> io::Result<File> {
    let metadata = std::fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(io::Error::new(io::ErrorKind::NotFound, "not a regular file"));
    }
    File::open(path)
}
