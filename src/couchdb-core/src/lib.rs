//! couchdb-core
//!
//! Transport-free building blocks for the couchdb-rs client:
//! - Client configuration and authentication method
//! - Query-string and URL construction
//! - Name, user-id and proxy validation
//! - Document, view, security and request/response models
//! - AuthSession cookie parsing

pub mod config;
pub mod document;
pub mod error;
pub mod models;
pub mod query;
pub mod session;
pub mod utils;
pub mod view;

// Re-export commonly used types
pub use config::{AuthMethod, ClientConfig};
pub use document::{Attachment, DocRef, Document, SecurityDocument, SecurityElement};
pub use error::{CoreError, ErrorBody};
pub use models::*;
pub use query::{build_url, Query, QueryValue};
pub use session::SessionToken;
pub use view::{ViewOptions, ViewResult, ViewRow};
