//! User-consent negotiation for writes the app does not own.
//!
//! A recoverable denial becomes a [`ConsentRequest`], which is handed to an injected
//! [`UiLauncher`]. Launching never blocks: the user's answer comes back later,
//! keyed by the request's correlation token, and the caller retries the write.

use crate::engine::catalog::{Catalog, PlatformDenial};
use crate::engine::core::{CapabilityTier, ConsentRequest, ResourceIdentifier};
use crate::engine::resolver::translate_document_identifier;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// How the user answered a grant prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentOutcome {
    Approved,
    Denied,
    Dismissed,
}

/// Denial with no retry path
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("access denied: {reason}")]
pub struct FatalSecurityError {
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to launch grant prompt: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum ConsentError {
    #[error("no UI host available to show the grant prompt")]
    NoActivity,

    #[error("failed to launch grant prompt: {0}")]
    LaunchFailed(String),

    #[error("batch write consent requires tier {required} or later (running {actual})")]
    UnsupportedCapability { required: u32, actual: u32 },

    #[error("platform rejected the write request: {0}")]
    Platform(String),
}

/// Hosting UI layer that can show the system grant prompt
pub trait UiLauncher: Send + Sync {
    /// Show the prompt and return immediately
    fn launch(&self, request: &ConsentRequest) -> Result<(), LaunchError>;

    /// Retract a prompt that no operation is waiting on any more
    fn withdraw(&self, _correlation_token: &str) {}
}

/// Classify a platform denial. Recoverable only when it carries a grant handle
/// and the tier reports recoverable denials at all.
pub fn on_permission_denied(
    denial: PlatformDenial,
    tier: CapabilityTier,
) -> Result<ConsentRequest, FatalSecurityError> {
    match denial.action {
        Some(action_handle) if tier.supports_recoverable_denial() => Ok(ConsentRequest {
            action_handle,
            correlation_token: Uuid::new_v4().to_string(),
        }),
        _ => Err(FatalSecurityError {
            reason: denial.reason,
        }),
    }
}

pub struct ConsentNegotiator {
    catalog: Arc<dyn Catalog>,
    tier: CapabilityTier,
    launcher: Option<Arc<dyn UiLauncher>>,
}

impl ConsentNegotiator {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        tier: CapabilityTier,
        launcher: Option<Arc<dyn UiLauncher>>,
    ) -> Self {
        Self {
            catalog,
            tier,
            launcher,
        }
    }

    pub fn on_permission_denied(
        &self,
        denial: PlatformDenial,
    ) -> Result<ConsentRequest, FatalSecurityError> {
        on_permission_denied(denial, self.tier)
    }

    /// Dispatch the grant prompt for a request without waiting for the answer
    pub fn request_consent(&self, request: &ConsentRequest) -> Result<(), ConsentError> {
        let launcher = self.launcher.as_ref().ok_or(ConsentError::NoActivity)?;
        launcher.launch(request).map_err(|e| match e {
            LaunchError::Failed(msg) => ConsentError::LaunchFailed(msg),
        })?;

        tracing::info!(token = %request.correlation_token, "grant prompt launched");
        Ok(())
    }

    /// Retract a superseded prompt so its answer can no longer grant anything
    pub fn withdraw_consent(&self, correlation_token: &str) {
        if let Some(launcher) = &self.launcher {
            launcher.withdraw(correlation_token);
            tracing::debug!(token = correlation_token, "grant prompt withdrawn");
        }
    }

    /// Ask up front for write access to several resources at once
    pub fn request_write_permission(
        &self,
        identifiers: &[ResourceIdentifier],
    ) -> Result<ConsentRequest, ConsentError> {
        if !self.tier.supports_batch_consent() {
            return Err(ConsentError::UnsupportedCapability {
                required: crate::engine::core::BATCH_CONSENT_TIER,
                actual: self.tier.0,
            });
        }
        if identifiers.is_empty() {
            return Err(ConsentError::Platform("no identifiers given".to_string()));
        }

        let mut targets = Vec::with_capacity(identifiers.len());
        for id in identifiers {
            match translate_document_identifier(id) {
                ResourceIdentifier::Content(content) => targets.push(content),
                other => {
                    return Err(ConsentError::Platform(format!(
                        "{} is not a catalog identifier",
                        other
                    )));
                }
            }
        }

        let action_handle = self
            .catalog
            .create_write_request(&targets)
            .map_err(|e| ConsentError::Platform(e.to_string()))?;
        let request = ConsentRequest {
            action_handle,
            correlation_token: Uuid::new_v4().to_string(),
        };

        self.request_consent(&request)?;
        Ok(request)
    }
}
