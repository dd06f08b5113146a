use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::document::Document;
use crate::error::CoreError;
use crate::query::Query;
use crate::utils::validate_proxy;

/// DocUpdate is the `{ok, id, rev}` answer to any single-document write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocUpdate {
    pub id: String,
    #[serde(default)]
    pub ok: bool,
    pub rev: String,
}

/// Per-document outcome of `_bulk_docs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkDocResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub rev: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// One revision returned by `_bulk_get`: either `ok` or `error`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkGetDoc {
    #[serde(default)]
    pub ok: Option<Document>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkGetResult {
    pub id: String,
    #[serde(default)]
    pub docs: Vec<BulkGetDoc>,
}

/// Mango query for `_find` and `_explain`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindRequest {
    pub selector: Value,
    pub limit: u64,
    pub skip: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    /// Design document name or `[ddoc, index]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_index: Option<Value>,
    pub conflicts: bool,
    pub r: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<String>,
    pub update: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stable: Option<bool>,
    pub execution_stats: bool,
}

impl FindRequest {
    pub fn new(selector: Value) -> Self {
        Self {
            selector,
            limit: 25,
            skip: 0,
            sort: None,
            fields: None,
            use_index: None,
            conflicts: false,
            r: 1,
            bookmark: None,
            update: true,
            stable: None,
            execution_stats: false,
        }
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn sort(mut self, sort: Vec<Value>) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn fields<I: IntoIterator<Item = S>, S: Into<String>>(mut self, fields: I) -> Self {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn use_index(mut self, index: impl Into<Value>) -> Self {
        self.use_index = Some(index.into());
        self
    }

    pub fn bookmark(mut self, bookmark: impl Into<String>) -> Self {
        self.bookmark = Some(bookmark.into());
        self
    }

    pub fn execution_stats(mut self) -> Self {
        self.execution_stats = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindResponse {
    #[serde(default)]
    pub docs: Vec<Document>,
    #[serde(default)]
    pub bookmark: Option<String>,
    #[serde(default)]
    pub warning: Option<String>,
    #[serde(default)]
    pub execution_stats: Option<Value>,
}

/// Entry of `GET /{db}/_index`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    #[serde(default)]
    pub ddoc: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub index_type: String,
    #[serde(default)]
    pub def: Value,
    #[serde(default)]
    pub partitioned: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexList {
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default)]
    pub indexes: Vec<IndexInfo>,
}

/// Body of `POST /{db}/_index`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub index: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ddoc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub index_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partitioned: Option<bool>,
}

impl IndexDefinition {
    /// JSON index over the given fields
    pub fn json<I: IntoIterator<Item = S>, S: Into<String>>(fields: I) -> Self {
        let fields: Vec<Value> = fields.into_iter().map(|f| Value::String(f.into())).collect();
        Self {
            index: serde_json::json!({ "fields": fields }),
            ddoc: None,
            name: None,
            index_type: "json".to_string(),
            partitioned: None,
        }
    }

    pub fn named(mut self, ddoc: impl Into<String>, name: impl Into<String>) -> Self {
        self.ddoc = Some(ddoc.into());
        self.name = Some(name.into());
        self
    }
}

/// `{result, id, name}` answer to index creation; `result` is `created` or `exists`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexCreated {
    pub result: String,
    pub id: String,
    pub name: String,
}

/// Fields of a design document; `partitioned` is folded into `options`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesignDocument {
    pub rev: Option<String>,
    pub language: Option<String>,
    pub options: Option<Map<String, Value>>,
    pub filters: Option<Map<String, Value>>,
    pub updates: Option<Map<String, Value>>,
    pub validate_doc_update: Option<String>,
    pub views: Option<Map<String, Value>>,
    pub autoupdate: Option<bool>,
    pub partitioned: Option<bool>,
}

impl DesignDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a view with a map (and optional reduce) function
    pub fn view(mut self, name: impl Into<String>, map: impl Into<String>, reduce: Option<&str>) -> Self {
        let mut view = Map::new();
        view.insert("map".to_string(), Value::String(map.into()));
        if let Some(reduce) = reduce {
            view.insert("reduce".to_string(), Value::String(reduce.to_string()));
        }
        self.views
            .get_or_insert_with(Map::new)
            .insert(name.into(), Value::Object(view));
        self
    }

    pub fn into_document(self, ddoc: &str) -> Document {
        let mut options = self.options;
        if let Some(partitioned) = self.partitioned {
            options
                .get_or_insert_with(Map::new)
                .insert("partitioned".to_string(), Value::Bool(partitioned));
        }

        let mut doc = Document::new();
        doc.set_id(format!("_design/{}", ddoc));
        if let Some(rev) = self.rev {
            doc.set_rev(rev);
        }
        let fields = [
            ("language", self.language.map(Value::String)),
            ("options", options.map(Value::Object)),
            ("filters", self.filters.map(Value::Object)),
            ("updates", self.updates.map(Value::Object)),
            ("validate_doc_update", self.validate_doc_update.map(Value::String)),
            ("views", self.views.map(Value::Object)),
            ("autoupdate", self.autoupdate.map(Value::Bool)),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                doc.insert(key, value);
            }
        }
        doc
    }
}

/// A `_users` document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDocument {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_sha: Option<String>,
    /// `simple` or `pbkdf2`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
    #[serde(rename = "type", default = "default_user_type")]
    pub doc_type: String,
}

fn default_user_type() -> String {
    "user".to_string()
}

impl Default for UserDocument {
    fn default() -> Self {
        Self {
            id: None,
            rev: None,
            name: String::new(),
            roles: Vec::new(),
            password: None,
            derived_key: None,
            password_sha: None,
            password_scheme: None,
            salt: None,
            iterations: None,
            doc_type: default_user_type(),
        }
    }
}

impl UserDocument {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: Some(password.into()),
            ..Default::default()
        }
    }

    pub fn with_roles<I: IntoIterator<Item = S>, S: Into<String>>(mut self, roles: I) -> Self {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }
}

/// Replication source or target: a database name/URL, or an object with headers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplicationEndpoint {
    Url(String),
    Remote {
        url: String,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        headers: HashMap<String, String>,
    },
}

impl From<&str> for ReplicationEndpoint {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

impl From<String> for ReplicationEndpoint {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

/// Document posted to `_replicator`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationRequest {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub replication_id: Option<String>,
    pub source: ReplicationEndpoint,
    pub target: ReplicationEndpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuous: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_target: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_target_params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_proxy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_proxy: Option<String>,
}

impl ReplicationRequest {
    pub fn new(source: impl Into<ReplicationEndpoint>, target: impl Into<ReplicationEndpoint>) -> Self {
        Self {
            replication_id: None,
            source: source.into(),
            target: target.into(),
            cancel: None,
            continuous: None,
            create_target: None,
            create_target_params: None,
            doc_ids: None,
            filter: None,
            selector: None,
            source_proxy: None,
            target_proxy: None,
        }
    }

    pub fn continuous(mut self) -> Self {
        self.continuous = Some(true);
        self
    }

    pub fn create_target(mut self) -> Self {
        self.create_target = Some(true);
        self
    }

    /// Proxies must use http, https or socks5; `doc_ids`, `filter` and
    /// `selector` are mutually exclusive.
    pub fn validate(&self) -> Result<(), CoreError> {
        for proxy in [&self.source_proxy, &self.target_proxy].into_iter().flatten() {
            if !validate_proxy(proxy) {
                return Err(CoreError::ProxySchemeCompliance(proxy.clone()));
            }
        }
        let selectors = [
            self.doc_ids.is_some(),
            self.filter.is_some(),
            self.selector.is_some(),
        ];
        if selectors.iter().filter(|set| **set).count() > 1 {
            return Err(CoreError::InvalidArgument(
                "\"doc_ids\", \"filter\" and \"selector\" are mutually exclusive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Options for `GET /_all_dbs`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllDbsOptions {
    pub descending: Option<bool>,
    pub endkey: Option<String>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
    pub startkey: Option<String>,
}

impl AllDbsOptions {
    pub fn to_query(&self) -> Query {
        Query::new()
            .with("descending", self.descending)
            .with("endkey", self.endkey.clone().map(Value::String))
            .with("limit", self.limit)
            .with("skip", self.skip)
            .with("startkey", self.startkey.clone().map(Value::String))
    }
}

/// Options for `PUT /{db}`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateDatabaseOptions {
    /// Shards
    pub q: Option<u32>,
    /// Replicas
    pub n: Option<u32>,
    pub partitioned: bool,
}

impl CreateDatabaseOptions {
    pub fn partitioned() -> Self {
        Self {
            partitioned: true,
            ..Default::default()
        }
    }

    pub fn to_query(&self) -> Query {
        Query::new()
            .with("q", self.q)
            .with("n", self.n)
            .with("partitioned", self.partitioned)
    }
}

/// Options for `GET /{db}/{docid}`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOptions {
    pub attachments: Option<bool>,
    pub att_encoding_info: Option<bool>,
    pub atts_since: Option<Vec<String>>,
    pub conflicts: Option<bool>,
    pub deleted_conflicts: Option<bool>,
    pub latest: Option<bool>,
    pub local_seq: Option<bool>,
    pub meta: Option<bool>,
    pub open_revs: Option<Vec<String>>,
    pub rev: Option<String>,
    pub revs: Option<bool>,
    pub revs_info: Option<bool>,
}

impl GetOptions {
    pub fn rev(rev: impl Into<String>) -> Self {
        Self {
            rev: Some(rev.into()),
            ..Default::default()
        }
    }

    pub fn to_query(&self) -> Query {
        Query::new()
            .with("attachments", self.attachments)
            .with("att_encoding_info", self.att_encoding_info)
            .with("atts_since", &self.atts_since)
            .with("conflicts", self.conflicts)
            .with("deleted_conflicts", self.deleted_conflicts)
            .with("latest", self.latest)
            .with("local_seq", self.local_seq)
            .with("meta", self.meta)
            .with("open_revs", &self.open_revs)
            .with("rev", &self.rev)
            .with("revs", self.revs)
            .with("revs_info", self.revs_info)
    }
}

/// Options for `PUT /{db}/{docid}`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOptions {
    pub batch: bool,
    pub new_edits: Option<bool>,
    /// Extra path between database and id, e.g. `_local`
    pub path: Option<String>,
}

/// Where attachment content comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentSource {
    /// Read from disk; the content type is guessed from the file name
    Path(PathBuf),
    Content {
        data: Vec<u8>,
        content_type: Option<String>,
    },
}

impl AttachmentSource {
    pub fn bytes(data: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self::Content {
            data: data.into(),
            content_type: Some(content_type.into()),
        }
    }
}
