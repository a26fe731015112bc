// Storage bridge engine - independent of the CLI

pub mod bridge;
pub mod catalog;
pub mod consent;
pub mod core;
pub mod error;
pub mod local;
pub mod resolver;
pub mod session;
pub mod worker;
pub mod writer;

pub use bridge::{BridgeSettings, MediaBridge};
pub use catalog::{AccessError, Catalog, CatalogError, CatalogQuery, PlatformDenial, WriteMode, WriteTarget};
pub use consent::{ConsentNegotiator, ConsentOutcome, LaunchError, UiLauncher};
pub use self::core::*;
pub use error::{BridgeError, BridgeResult, ErrorCode, FailureKind};
pub use local::LocalCatalog;
pub use resolver::{CatalogResolver, translate_document_identifier};
pub use writer::ResourceWriter;
