//! Host-facing operations: string identifiers and paths in, value or coded error out.

use crate::engine::catalog::{Catalog, WriteMode};
use crate::engine::consent::{ConsentError, ConsentNegotiator, ConsentOutcome, UiLauncher};
use crate::engine::core::{
    BucketTable, CapabilityTier, PermissionDenial, ReplacementOutcome, ResourceIdentifier,
};
use crate::engine::error::{BridgeError, BridgeResult, ErrorCode};
use crate::engine::resolver::{CatalogResolver, ResolveError, translate_document_identifier};
use crate::engine::session::{ReplaceSession, SessionStep};
use crate::engine::writer::ResourceWriter;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Settings the bridge components share
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub tier: CapabilityTier,
    pub storage_root: String,
    pub buckets: BucketTable,
    pub write_mode: WriteMode,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            tier: CapabilityTier(33),
            storage_root: "/storage/emulated/0".to_string(),
            buckets: BucketTable::default(),
            write_mode: WriteMode::Truncate,
        }
    }
}

pub struct MediaBridge {
    resolver: CatalogResolver,
    writer: ResourceWriter,
    negotiator: ConsentNegotiator,
    /// Open replace operations keyed by canonical target identifier. An entry lives
    /// from the first consent prompt until the retry finishes, the prompt is
    /// answered negatively, or the caller calls `abandon_replace`.
    sessions: Mutex<HashMap<String, ReplaceSession>>,
}

impl MediaBridge {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        settings: BridgeSettings,
        launcher: Option<Arc<dyn UiLauncher>>,
    ) -> Self {
        let BridgeSettings {
            tier,
            storage_root,
            buckets,
            write_mode,
        } = settings;

        Self {
            resolver: CatalogResolver::new(Arc::clone(&catalog), tier, buckets, &storage_root),
            writer: ResourceWriter::new(Arc::clone(&catalog), tier, write_mode),
            negotiator: ConsentNegotiator::new(catalog, tier, launcher),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn resolver(&self) -> &CatalogResolver {
        &self.resolver
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, ReplaceSession>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn resolve_identifier_from_path(&self, file_path: &str) -> BridgeResult<Option<String>> {
        if file_path.trim().is_empty() {
            return Err(BridgeError::invalid_argument("filePath is required"));
        }
        Ok(self
            .resolver
            .resolve_identifier_from_path(file_path)
            .map(|id| id.to_string()))
    }

    pub fn resolve_path_from_identifier(&self, identifier: &str) -> BridgeResult<Option<String>> {
        let id: ResourceIdentifier = identifier.parse().map_err(|e| {
            BridgeError::new(
                ErrorCode::ResolveError,
                format!("Error resolving path: {}", e),
            )
        })?;

        self.resolver
            .resolve_path_from_identifier(&id)
            .map_err(|e| match e {
                ResolveError::Inaccessible(reason) => BridgeError::new(
                    ErrorCode::FileAccessError,
                    format!("Cannot access file: {}", reason),
                ),
                ResolveError::Catalog(err) => BridgeError::new(
                    ErrorCode::ResolveError,
                    format!("Error resolving path: {}", err),
                ),
            })
    }

    /// Translate a document identifier string; other identifiers come back unchanged
    pub fn translate_document_identifier(&self, identifier: &str) -> BridgeResult<String> {
        let id: ResourceIdentifier = identifier
            .parse()
            .map_err(|e| BridgeError::invalid_argument(format!("{}", e)))?;
        Ok(translate_document_identifier(&id).to_string())
    }

    /// Overwrite the resource at `identifier` with the staging file.
    ///
    /// `Ok(None)` on success. CONSENT_REQUIRED means a grant prompt was launched;
    /// call again once [`notify_consent`](Self::notify_consent) reported approval.
    pub fn replace_at_identifier(
        &self,
        identifier: &str,
        staging_path: &str,
    ) -> BridgeResult<Option<String>> {
        if identifier.trim().is_empty() || staging_path.trim().is_empty() {
            return Err(BridgeError::invalid_argument(
                "uri and tempPath are required",
            ));
        }
        let id: ResourceIdentifier = identifier
            .parse()
            .map_err(|e| BridgeError::invalid_argument(format!("Invalid identifier: {}", e)))?;
        let target = translate_document_identifier(&id);
        let key = target.to_string();

        // A granted session is resumed; anything else starts over and invalidates
        // the stale consent request
        let previous = self.sessions().remove(&key);
        let mut session = match previous {
            Some(session) if session.is_ready_for_retry() => session,
            Some(stale) => {
                if let Some(token) = stale.pending_token() {
                    tracing::debug!(resource = %key, token, "superseding unanswered consent request");
                    self.negotiator.withdraw_consent(token);
                }
                ReplaceSession::new(key.clone())
            }
            None => ReplaceSession::new(key.clone()),
        };

        session
            .begin_attempt()
            .map_err(|e| BridgeError::new(ErrorCode::ReplaceFailed, e.to_string()))?;
        let outcome = self.writer.replace(&target, Path::new(staging_path));
        let step = session
            .record(outcome)
            .map_err(|e| BridgeError::new(ErrorCode::ReplaceFailed, e.to_string()))?;

        match step {
            SessionStep::Done => Ok(None),
            SessionStep::NeedsConsent(request) => {
                self.negotiator
                    .request_consent(&request)
                    .map_err(|e| consent_error(e, "request consent"))?;
                self.sessions().insert(key, session);
                Err(BridgeError::consent_required(request.correlation_token))
            }
            SessionStep::Failed(outcome) => Err(outcome_error(outcome, staging_path)),
        }
    }

    /// Proactively ask for write access to one or more identifiers
    pub fn request_write_permission(&self, identifiers: &[&str]) -> BridgeResult<Option<String>> {
        let ids = identifiers
            .iter()
            .map(|raw| raw.parse::<ResourceIdentifier>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                BridgeError::new(
                    ErrorCode::PermissionError,
                    format!("Error requesting write permission: {}", e),
                )
            })?;

        let request = self
            .negotiator
            .request_write_permission(&ids)
            .map_err(|e| consent_error(e, "request write permission"))?;
        tracing::debug!(token = %request.correlation_token, targets = ids.len(), "write permission pending");
        Ok(None)
    }

    /// Out-of-band answer to a grant prompt launched for a replace
    pub fn notify_consent(&self, token: &str, outcome: ConsentOutcome) -> BridgeResult<()> {
        let mut sessions = self.sessions();
        let key = sessions
            .iter()
            .find(|(_, s)| s.pending_token() == Some(token))
            .map(|(k, _)| k.clone())
            .ok_or_else(|| {
                BridgeError::invalid_argument(format!("Unknown consent token: {}", token))
            })?;

        let Some(session) = sessions.get_mut(&key) else {
            return Err(BridgeError::invalid_argument(format!(
                "Unknown consent token: {}",
                token
            )));
        };
        session
            .on_consent(outcome)
            .map_err(|e| BridgeError::invalid_argument(e.to_string()))?;
        if session.is_finished() {
            sessions.remove(&key);
        }

        tracing::info!(resource = %key, ?outcome, "consent answered");
        Ok(())
    }

    /// Drop the open replace operation for `identifier`, withdrawing its prompt if
    /// one is still unanswered. Returns whether an operation was open.
    pub fn abandon_replace(&self, identifier: &str) -> BridgeResult<bool> {
        let id: ResourceIdentifier = identifier
            .parse()
            .map_err(|e| BridgeError::invalid_argument(format!("Invalid identifier: {}", e)))?;
        let key = translate_document_identifier(&id).to_string();

        let Some(session) = self.sessions().remove(&key) else {
            return Ok(false);
        };
        if let Some(token) = session.pending_token() {
            self.negotiator.withdraw_consent(token);
        }
        tracing::debug!(resource = %key, "replace abandoned");
        Ok(true)
    }

    /// Number of replace operations waiting on or holding a grant
    pub fn open_sessions(&self) -> usize {
        self.sessions().len()
    }
}

fn consent_error(err: ConsentError, action: &str) -> BridgeError {
    let code = match &err {
        ConsentError::NoActivity => ErrorCode::NoActivity,
        ConsentError::LaunchFailed(_) => ErrorCode::ConsentError,
        ConsentError::UnsupportedCapability { .. } => ErrorCode::UnsupportedVersion,
        ConsentError::Platform(_) => ErrorCode::PermissionError,
    };
    BridgeError::new(code, format!("Failed to {}: {}", action, err))
}

fn outcome_error(outcome: ReplacementOutcome, staging_path: &str) -> BridgeError {
    match outcome {
        ReplacementOutcome::NotFound { what } => BridgeError::new(
            ErrorCode::FileNotFound,
            format!("Not found: {} (staging {})", what, staging_path),
        ),
        ReplacementOutcome::PermissionDenied(PermissionDenial::Terminal { reason }) => {
            BridgeError::new(ErrorCode::SecurityError, format!("Security error: {}", reason))
        }
        ReplacementOutcome::IoFailure { reason } => BridgeError::new(
            ErrorCode::ReplaceFailed,
            format!("Error replacing file: {}", reason),
        ),
        // The session turns these into Done / NeedsConsent
        ReplacementOutcome::Success
        | ReplacementOutcome::PermissionDenied(PermissionDenial::Recoverable(_)) => {
            BridgeError::new(ErrorCode::ReplaceFailed, "Unexpected replace outcome")
        }
    }
}
