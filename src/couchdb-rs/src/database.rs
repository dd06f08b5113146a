use couchdb_core::utils;
use couchdb_core::{
    Attachment, AttachmentSource, BulkDocResult, BulkGetResult, CoreError, DesignDocument, DocRef,
    DocUpdate, Document, FindRequest, FindResponse, GetOptions, IndexCreated, IndexDefinition,
    IndexList, Query, SaveOptions, SecurityDocument, SecurityElement, ViewOptions, ViewResult,
};
use reqwest::header::{self, HeaderName};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::connection::{header_value, Connection, OkResponse, Request};
use crate::error::Result;
use crate::partition::Partition;

/// Handle to one database on a [`crate::Server`]
#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Connection>,
    name: String,
}

#[derive(Serialize)]
struct BulkDocsRequest<'a> {
    docs: &'a [Document],
    new_edits: bool,
}

#[derive(Serialize)]
struct BulkGetRequest<'a> {
    docs: &'a [DocRef],
}

#[derive(Deserialize)]
struct BulkGetResponse {
    #[serde(default)]
    results: Vec<BulkGetResult>,
}

fn batch_query(batch: bool) -> Query {
    Query::new().with("batch", batch.then_some("ok"))
}

impl Database {
    pub(crate) fn new(conn: Arc<Connection>, name: &str) -> Result<Self> {
        if !utils::validate_db_name(name) {
            return Err(CoreError::NameCompliance(name.to_string()).into());
        }
        Ok(Self {
            conn,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path segments under this database
    fn path<I, S>(&self, rest: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        std::iter::once(self.name.clone())
            .chain(rest.into_iter().map(Into::into))
            .collect()
    }

    fn doc_path(&self, docid: &str) -> Vec<String> {
        self.path(utils::doc_path(docid))
    }

    fn attachment_path(&self, docid: &str, attname: &str) -> Vec<String> {
        let mut path = self.doc_path(docid);
        path.push(attname.to_string());
        path
    }

    // --- existence and metadata ---

    /// `true` if the database exists; transport errors propagate
    pub async fn exists(&self) -> Result<bool> {
        self.conn.contains(self.path(Vec::<String>::new())).await
    }

    /// `true` if the database answers successfully, `false` on any error
    pub async fn check(&self) -> bool {
        self.conn.check(self.path(Vec::<String>::new())).await
    }

    /// `true` if a document with this id exists
    pub async fn contains(&self, docid: &str) -> Result<bool> {
        self.conn.contains(self.doc_path(docid)).await
    }

    pub async fn info(&self) -> Result<Value> {
        self.conn.json(Request::get(self.path(Vec::<String>::new()))).await
    }

    pub async fn partition_info(&self, partition: &str) -> Result<Value> {
        self.conn
            .json(Request::get(self.path(["_partition", partition])))
            .await
    }

    /// Current revision of a document, `None` if it does not exist. Other
    /// failures, including an unreachable server, are returned as errors.
    pub async fn rev(&self, docid: &str) -> Result<Option<String>> {
        self.conn.rev(self.doc_path(docid)).await
    }

    /// Handle scoped to one partition of a partitioned database
    pub fn partition(&self, partition_id: &str) -> Partition {
        Partition::new(self.clone(), partition_id)
    }

    // --- documents ---

    pub async fn get(&self, docid: &str, options: &GetOptions) -> Result<Document> {
        self.conn
            .json(Request::get(self.doc_path(docid)).query(options.to_query()))
            .await
    }

    /// Like [`Database::get`], but a missing document is `None`
    pub async fn get_opt(&self, docid: &str, options: &GetOptions) -> Result<Option<Document>> {
        match self.get(docid, options).await {
            Ok(doc) => Ok(Some(doc)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn get_design(&self, ddoc: &str, options: &GetOptions) -> Result<Document> {
        self.get(&format!("_design/{}", ddoc), options).await
    }

    /// POST a new document; the server assigns an id when `_id` is absent
    pub async fn create(&self, doc: &Document, batch: bool) -> Result<DocUpdate> {
        let request = Request::post(self.path(Vec::<String>::new()))
            .query(batch_query(batch))
            .json(doc)?;
        self.conn.json(request).await
    }

    /// PUT a document under its `_id`, updating it when `_rev` is set
    pub async fn save(&self, doc: &Document, options: &SaveOptions) -> Result<DocUpdate> {
        let docid = doc
            .id()
            .ok_or_else(|| CoreError::InvalidArgument("document has no _id".to_string()))?;
        let path = match &options.path {
            Some(prefix) => self.path([prefix.as_str(), docid]),
            None => self.doc_path(docid),
        };
        let query = batch_query(options.batch)
            .with("new_edits", options.new_edits)
            .with("rev", doc.rev());
        let result: DocUpdate = self
            .conn
            .json(Request::put(path).query(query).json(doc)?)
            .await?;
        tracing::debug!(db = %self.name, id = %result.id, rev = %result.rev, "Document saved");
        Ok(result)
    }

    /// Server-side copy of `docid` to `destid`. `destrev` is required when
    /// the destination already exists.
    pub async fn copy(
        &self,
        docid: &str,
        destid: &str,
        rev: Option<&str>,
        destrev: Option<&str>,
    ) -> Result<DocUpdate> {
        let destination = match destrev {
            Some(destrev) => format!("{}?rev={}", destid, destrev),
            None => destid.to_string(),
        };
        let method = Method::from_bytes(b"COPY")
            .map_err(|e| CoreError::InvalidArgument(e.to_string()))?;
        let request = Request::new(method, self.doc_path(docid))
            .query(Query::new().with("rev", rev))
            .header(HeaderName::from_static("destination"), &destination)?;
        self.conn.json(request).await
    }

    pub async fn delete(&self, docid: &str, rev: &str, batch: bool) -> Result<bool> {
        let query = batch_query(batch).with("rev", rev);
        let response: OkResponse = self
            .conn
            .json(Request::delete(self.doc_path(docid)).query(query))
            .await?;
        Ok(response.ok)
    }

    /// Permanently remove revisions: `{docid: [rev, ...]}`
    pub async fn purge(&self, revs: &HashMap<String, Vec<String>>) -> Result<Value> {
        self.conn
            .json(Request::post(self.path(["_purge"])).json(revs)?)
            .await
    }

    // --- bulk ---

    pub async fn bulk_docs(&self, docs: &[Document], new_edits: bool) -> Result<Vec<BulkDocResult>> {
        let request =
            Request::post(self.path(["_bulk_docs"])).json(&BulkDocsRequest { docs, new_edits })?;
        self.conn.json(request).await
    }

    pub async fn bulk_get(&self, docs: &[DocRef], revs: bool) -> Result<Vec<BulkGetResult>> {
        let request = Request::post(self.path(["_bulk_get"]))
            .query(Query::new().with("revs", revs))
            .json(&BulkGetRequest { docs })?;
        let response: BulkGetResponse = self.conn.json(request).await?;
        Ok(response.results)
    }

    // --- views and queries ---

    pub async fn all_docs(&self, options: &ViewOptions) -> Result<ViewResult> {
        self.query_view(None, vec!["_all_docs".to_string()], options)
            .await
    }

    pub async fn all_docs_in(&self, partition: &str, options: &ViewOptions) -> Result<ViewResult> {
        self.query_view(Some(partition), vec!["_all_docs".to_string()], options)
            .await
    }

    pub async fn view(&self, ddoc: &str, view: &str, options: &ViewOptions) -> Result<ViewResult> {
        self.query_view(None, view_path(ddoc, view), options).await
    }

    pub async fn view_in(
        &self,
        partition: &str,
        ddoc: &str,
        view: &str,
        options: &ViewOptions,
    ) -> Result<ViewResult> {
        self.query_view(Some(partition), view_path(ddoc, view), options)
            .await
    }

    /// `keys` are POSTed in the body; every other option goes in the query string
    async fn query_view(
        &self,
        partition: Option<&str>,
        resource: Vec<String>,
        options: &ViewOptions,
    ) -> Result<ViewResult> {
        let path = self.path(utils::partition_path(resource, partition));
        let request = match &options.keys {
            Some(keys) => Request::post(path).json(&json!({ "keys": keys }))?,
            None => Request::get(path),
        };
        self.conn.json(request.query(options.to_query())).await
    }

    pub async fn find(&self, request: &FindRequest) -> Result<FindResponse> {
        self.find_at(None, request).await
    }

    pub async fn find_in(&self, partition: &str, request: &FindRequest) -> Result<FindResponse> {
        self.find_at(Some(partition), request).await
    }

    async fn find_at(&self, partition: Option<&str>, request: &FindRequest) -> Result<FindResponse> {
        let path = self.path(utils::partition_path(vec!["_find".to_string()], partition));
        self.conn.json(Request::post(path).json(request)?).await
    }

    /// Which index a Mango query would use
    pub async fn explain(&self, request: &FindRequest) -> Result<Value> {
        self.conn
            .json(Request::post(self.path(["_explain"])).json(request)?)
            .await
    }

    pub async fn indexes(&self) -> Result<IndexList> {
        self.conn.json(Request::get(self.path(["_index"]))).await
    }

    pub async fn save_index(&self, index: &IndexDefinition) -> Result<IndexCreated> {
        let created: IndexCreated = self
            .conn
            .json(Request::post(self.path(["_index"])).json(index)?)
            .await?;
        tracing::info!(db = %self.name, index = %created.name, result = %created.result, "Index saved");
        Ok(created)
    }

    // --- attachments ---

    pub async fn get_attachment(&self, docid: &str, attname: &str, rev: Option<&str>) -> Result<Attachment> {
        let request = Request::get(self.attachment_path(docid, attname))
            .query(Query::new().with("rev", rev));
        let response = self.conn.send(request).await?;

        let content_encoding = header_value(&response, header::CONTENT_ENCODING);
        let content_length = header_value(&response, header::CONTENT_LENGTH)
            .and_then(|v| v.parse().ok());
        let content_type = header_value(&response, header::CONTENT_TYPE);
        let digest = header_value(&response, HeaderName::from_static("content-md5"))
            .map(|md5| format!("md5-{}", md5));
        let content = response.bytes().await?.to_vec();

        Ok(Attachment {
            content_length: content_length.or(Some(content.len() as u64)),
            content,
            content_encoding,
            content_type,
            digest,
        })
    }

    /// Upload an attachment. `rev` is required when the document already exists.
    pub async fn put_attachment(
        &self,
        docid: &str,
        attname: &str,
        source: AttachmentSource,
        rev: Option<&str>,
    ) -> Result<DocUpdate> {
        let (data, content_type) = match source {
            AttachmentSource::Path(path) => {
                let data = tokio::fs::read(&path).await?;
                let file_name = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or(attname);
                (data, utils::guess_content_type(file_name).to_string())
            }
            AttachmentSource::Content { data, content_type } => (
                data,
                content_type.unwrap_or_else(|| utils::guess_content_type(attname).to_string()),
            ),
        };
        let request = Request::put(self.attachment_path(docid, attname))
            .query(Query::new().with("rev", rev))
            .raw(data, content_type);
        self.conn.json(request).await
    }

    pub async fn delete_attachment(
        &self,
        docid: &str,
        attname: &str,
        rev: &str,
        batch: bool,
    ) -> Result<DocUpdate> {
        let query = batch_query(batch).with("rev", rev);
        self.conn
            .json(Request::delete(self.attachment_path(docid, attname)).query(query))
            .await
    }

    // --- design, security, maintenance ---

    pub async fn put_design(&self, ddoc: &str, design: DesignDocument) -> Result<DocUpdate> {
        self.save(&design.into_document(ddoc), &SaveOptions::default())
            .await
    }

    pub async fn security(&self) -> Result<SecurityDocument> {
        self.conn.json(Request::get(self.path(["_security"]))).await
    }

    pub async fn update_security(&self, admins: &SecurityElement, members: &SecurityElement) -> Result<bool> {
        let security = SecurityDocument {
            admins: admins.clone(),
            members: members.clone(),
        };
        let response: OkResponse = self
            .conn
            .json(Request::put(self.path(["_security"])).json(&security)?)
            .await?;
        tracing::info!(db = %self.name, "Security object updated");
        Ok(response.ok)
    }

    /// Compact the database, or the view indexes of one design document
    pub async fn compact(&self, ddoc: Option<&str>) -> Result<bool> {
        let mut path = self.path(["_compact"]);
        path.extend(ddoc.map(str::to_string));
        let response: OkResponse = self.conn.json(Request::post(path).json(&json!({}))?).await?;
        Ok(response.ok)
    }
}

fn view_path(ddoc: &str, view: &str) -> Vec<String> {
    ["_design", ddoc, "_view", view]
        .into_iter()
        .map(str::to_string)
        .collect()
}
