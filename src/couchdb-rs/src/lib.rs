//! CouchDB Client Library
//!
//! Async HTTP client for Apache CouchDB servers.
//!
//! ```no_run
//! use couchdb_rs::{Document, GetOptions, Server};
//!
//! # async fn run() -> couchdb_rs::Result<()> {
//! let server = Server::with_credentials("http://localhost:5984", "admin", "secret")?;
//! let db = server.database("inventory")?;
//! db.create(&Document::new().with("_id", "widget").with("qty", 3), false).await?;
//! let doc = db.get("widget", &GetOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

mod connection;
mod database;
mod error;
mod partition;
mod server;

pub use database::Database;
pub use error::{ClientError, Result};
pub use partition::Partition;
pub use server::Server;

pub use couchdb_core::{
    utils, AllDbsOptions, Attachment, AttachmentSource, AuthMethod, BulkDocResult, BulkGetDoc,
    BulkGetResult, ClientConfig, CreateDatabaseOptions, DesignDocument, DocRef, DocUpdate,
    Document, ErrorBody, FindRequest, FindResponse, GetOptions, IndexCreated, IndexDefinition,
    IndexInfo, IndexList, ReplicationEndpoint, ReplicationRequest, SaveOptions, SecurityDocument,
    SecurityElement, UserDocument, ViewOptions, ViewResult, ViewRow,
};
pub use couchdb_core::CoreError;
