mod buckets;
mod capability;
mod log;
mod scan;
mod state;
mod types;
mod uri;

pub use buckets::{APP_MEDIA_MARKER, BucketRow, BucketRule, BucketTable, BucketTarget};
pub use capability::{
    AccessStrategy, BATCH_CONSENT_TIER, CapabilityTier, SCOPED_STORAGE_TIER, select_strategy,
};
pub use log::{Verbosity, init_tracing};
pub use scan::{METADATA_DIR, is_media_file, media_type_for, scan, scan_streaming};
pub use state::{CatalogIndex, ConsentLedger, IndexedRecord, PendingConsent};
pub use types::{
    ActionHandle, CatalogRecord, ConsentRequest, ContentIdentifier, DocumentIdentifier,
    MediaType, PermissionDenial, ReplacementOutcome, ResourceIdentifier,
};
pub use uri::{IdentifierParseError, MEDIA_AUTHORITY, MEDIA_DOCUMENTS_AUTHORITY};
