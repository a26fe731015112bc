use serde::{Deserialize, Serialize};

/// First tier where raw paths are hidden and recoverable denials exist (API 29)
pub const SCOPED_STORAGE_TIER: u32 = 29;

/// First tier with batch write-consent requests (API 30)
pub const BATCH_CONSENT_TIER: u32 = 30;

/// Platform version tier, computed once and passed to every component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityTier(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessStrategy {
    /// Raw path column is readable and paths may be opened directly
    Legacy,
    /// Access goes through catalog handles; paths are reconstructed from metadata
    ScopedHandle,
}

/// Pick the access strategy for a tier
pub fn select_strategy(tier: CapabilityTier) -> AccessStrategy {
    if tier.0 >= SCOPED_STORAGE_TIER {
        AccessStrategy::ScopedHandle
    } else {
        AccessStrategy::Legacy
    }
}

impl CapabilityTier {
    pub fn strategy(self) -> AccessStrategy {
        select_strategy(self)
    }

    /// Whether the platform reports denials that carry a grant handle
    pub fn supports_recoverable_denial(self) -> bool {
        self.0 >= SCOPED_STORAGE_TIER
    }

    pub fn supports_batch_consent(self) -> bool {
        self.0 >= BATCH_CONSENT_TIER
    }
}

impl AccessStrategy {
    pub fn permits_raw_paths(self) -> bool {
        matches!(self, AccessStrategy::Legacy)
    }
}
