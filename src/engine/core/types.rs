use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog collection a record belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Image,
    Audio,
}

impl MediaType {
    pub const ALL: [MediaType; 3] = [MediaType::Video, MediaType::Image, MediaType::Audio];

    /// Prefix used inside document-provider composite ids ("video:123")
    pub fn document_prefix(&self) -> &'static str {
        match self {
            MediaType::Video => "video",
            MediaType::Image => "image",
            MediaType::Audio => "audio",
        }
    }

    pub fn from_document_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "video" => Some(MediaType::Video),
            "image" => Some(MediaType::Image),
            "audio" => Some(MediaType::Audio),
            _ => None,
        }
    }

    /// Collection segment used in content identifiers
    pub fn collection(&self) -> &'static str {
        match self {
            MediaType::Video => "video",
            MediaType::Image => "images",
            MediaType::Audio => "audio",
        }
    }

    pub fn from_collection(segment: &str) -> Option<Self> {
        match segment {
            "video" => Some(MediaType::Video),
            "images" => Some(MediaType::Image),
            "audio" => Some(MediaType::Audio),
            _ => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.document_prefix())
    }
}

/// Read-only projection of one catalog row.
///
/// Never cached by the resolver; every call queries the catalog again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogRecord {
    pub id: u64,
    pub display_name: String,
    /// Relative bucket path with trailing slash, e.g. "DCIM/Camera/"
    pub bucket_path: String,
    pub media_type: MediaType,
}

impl CatalogRecord {
    pub fn content_id(&self) -> ContentIdentifier {
        ContentIdentifier {
            catalog_id: self.id,
            media_type: self.media_type,
        }
    }
}

/// Catalog-issued identifier for one record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ContentIdentifier {
    pub catalog_id: u64,
    pub media_type: MediaType,
}

/// Identifier issued by a storage-provider abstraction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DocumentIdentifier {
    pub provider_authority: String,
    /// Decoded composite id, e.g. "video:1000159466"
    pub composite_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ResourceIdentifier {
    Content(ContentIdentifier),
    Document(DocumentIdentifier),
    LegacyPath { absolute_path: String },
}

impl ResourceIdentifier {
    pub fn content(catalog_id: u64, media_type: MediaType) -> Self {
        ResourceIdentifier::Content(ContentIdentifier {
            catalog_id,
            media_type,
        })
    }

    pub fn document(authority: impl Into<String>, composite_id: impl Into<String>) -> Self {
        ResourceIdentifier::Document(DocumentIdentifier {
            provider_authority: authority.into(),
            composite_id: composite_id.into(),
        })
    }

    pub fn legacy_path(path: impl Into<String>) -> Self {
        ResourceIdentifier::LegacyPath {
            absolute_path: path.into(),
        }
    }

    pub fn as_content(&self) -> Option<&ContentIdentifier> {
        match self {
            ResourceIdentifier::Content(c) => Some(c),
            _ => None,
        }
    }
}

impl From<ContentIdentifier> for ResourceIdentifier {
    fn from(id: ContentIdentifier) -> Self {
        ResourceIdentifier::Content(id)
    }
}

/// Platform-issued handle that launches a grant prompt.
///
/// Opaque to everything except the catalog that minted it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ActionHandle(String);

impl ActionHandle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Pending user consent for one write.
///
/// Valid for exactly one retry; consumed by the session that created it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsentRequest {
    pub action_handle: ActionHandle,
    pub correlation_token: String,
}

/// Permission failure split by whether a retry path exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionDenial {
    Recoverable(ConsentRequest),
    Terminal { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplacementOutcome {
    Success,
    PermissionDenied(PermissionDenial),
    /// Staging file or target resource is absent
    NotFound { what: String },
    IoFailure { reason: String },
}

impl ReplacementOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ReplacementOutcome::Success)
    }

    pub fn consent_request(&self) -> Option<&ConsentRequest> {
        match self {
            ReplacementOutcome::PermissionDenied(PermissionDenial::Recoverable(req)) => Some(req),
            _ => None,
        }
    }
}
