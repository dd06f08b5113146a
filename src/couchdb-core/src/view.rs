use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;
use crate::query::Query;

/// Query parameters shared by `_all_docs` and design-document views
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewOptions {
    pub conflicts: Option<bool>,
    pub descending: Option<bool>,
    pub endkey: Option<Value>,
    pub endkey_docid: Option<String>,
    pub group: Option<bool>,
    pub group_level: Option<u32>,
    pub include_docs: Option<bool>,
    pub attachments: Option<bool>,
    pub att_encoding_info: Option<bool>,
    pub inclusive_end: Option<bool>,
    pub key: Option<Value>,
    /// Sent in a POST body rather than the query string
    pub keys: Option<Vec<Value>>,
    pub limit: Option<u64>,
    pub reduce: Option<bool>,
    pub skip: Option<u64>,
    pub sorted: Option<bool>,
    pub stable: Option<bool>,
    pub startkey: Option<Value>,
    pub startkey_docid: Option<String>,
    /// `true`, `false` or `lazy`
    pub update: Option<String>,
    pub update_seq: Option<bool>,
}

impl ViewOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_docs(mut self) -> Self {
        self.include_docs = Some(true);
        self
    }

    pub fn keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Value>,
    {
        self.keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn to_query(&self) -> Query {
        Query::new()
            .with("conflicts", self.conflicts)
            .with("descending", self.descending)
            .with("endkey", &self.endkey)
            .with("endkey_docid", &self.endkey_docid)
            .with("group", self.group)
            .with("group_level", self.group_level)
            .with("include_docs", self.include_docs)
            .with("attachments", self.attachments)
            .with("att_encoding_info", self.att_encoding_info)
            .with("inclusive_end", self.inclusive_end)
            .with("key", &self.key)
            .with("limit", self.limit)
            .with("reduce", self.reduce)
            .with("skip", self.skip)
            .with("sorted", self.sorted)
            .with("stable", self.stable)
            .with("startkey", &self.startkey)
            .with("startkey_docid", &self.startkey_docid)
            .with("update", &self.update)
            .with("update_seq", self.update_seq)
    }
}

/// One row of a view response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub key: Value,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub doc: Option<Document>,
    /// Set for `keys` lookups that matched nothing, e.g. `not_found`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewResult {
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub rows: Vec<ViewRow>,
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_seq: Option<Value>,
}
