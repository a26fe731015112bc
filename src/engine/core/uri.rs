// String encoding of resource identifiers at the host boundary

use super::types::{ContentIdentifier, DocumentIdentifier, MediaType, ResourceIdentifier};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const CONTENT_SCHEME: &str = "content://";
pub const FILE_SCHEME: &str = "file://";

/// Authority of the catalog's own content identifiers
pub const MEDIA_AUTHORITY: &str = "media";

/// Document provider whose ids translate into catalog ids
pub const MEDIA_DOCUMENTS_AUTHORITY: &str = "com.android.providers.media.documents";

const VOLUME_EXTERNAL: &str = "external";

const DOCUMENT_ID_ENCODE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentifierParseError {
    #[error("identifier is empty")]
    Empty,

    #[error("unsupported identifier scheme: {0}")]
    UnsupportedScheme(String),

    #[error("malformed identifier '{0}'")]
    Malformed(String),
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceIdentifier::Content(c) => write!(
                f,
                "{}{}/{}/{}/media/{}",
                CONTENT_SCHEME,
                MEDIA_AUTHORITY,
                VOLUME_EXTERNAL,
                c.media_type.collection(),
                c.catalog_id
            ),
            ResourceIdentifier::Document(d) => write!(
                f,
                "{}{}/document/{}",
                CONTENT_SCHEME,
                d.provider_authority,
                utf8_percent_encode(&d.composite_id, DOCUMENT_ID_ENCODE)
            ),
            ResourceIdentifier::LegacyPath { absolute_path } => f.write_str(absolute_path),
        }
    }
}

impl FromStr for ResourceIdentifier {
    type Err = IdentifierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IdentifierParseError::Empty);
        }

        if s.starts_with('/') {
            return Ok(ResourceIdentifier::legacy_path(s));
        }

        if let Some(path) = s.strip_prefix(FILE_SCHEME) {
            if !path.starts_with('/') {
                return Err(IdentifierParseError::Malformed(s.to_string()));
            }
            let decoded = percent_decode_str(path)
                .decode_utf8()
                .map_err(|_| IdentifierParseError::Malformed(s.to_string()))?;
            return Ok(ResourceIdentifier::legacy_path(decoded.into_owned()));
        }

        let Some(rest) = s.strip_prefix(CONTENT_SCHEME) else {
            let scheme = s.split_once("://").map(|(scheme, _)| scheme).unwrap_or(s);
            return Err(IdentifierParseError::UnsupportedScheme(scheme.to_string()));
        };

        let (authority, path) = rest
            .split_once('/')
            .ok_or_else(|| IdentifierParseError::Malformed(s.to_string()))?;
        let segments: Vec<&str> = path.split('/').filter(|seg| !seg.is_empty()).collect();

        if authority == MEDIA_AUTHORITY {
            return parse_content_segments(&segments)
                .map(ResourceIdentifier::Content)
                .ok_or_else(|| IdentifierParseError::Malformed(s.to_string()));
        }

        match segments.as_slice() {
            ["document", encoded] if !authority.is_empty() => {
                let composite_id = percent_decode_str(encoded)
                    .decode_utf8()
                    .map_err(|_| IdentifierParseError::Malformed(s.to_string()))?;
                Ok(ResourceIdentifier::Document(DocumentIdentifier {
                    provider_authority: authority.to_string(),
                    composite_id: composite_id.into_owned(),
                }))
            }
            _ => Err(IdentifierParseError::Malformed(s.to_string())),
        }
    }
}

// external/<collection>/media/<id>
fn parse_content_segments(segments: &[&str]) -> Option<ContentIdentifier> {
    match segments {
        [_volume, collection, "media", id] => Some(ContentIdentifier {
            catalog_id: id.parse().ok()?,
            media_type: MediaType::from_collection(collection)?,
        }),
        _ => None,
    }
}
