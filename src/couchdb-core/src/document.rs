use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// A CouchDB document: a JSON object carrying `_id` and `_rev`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert any serializable value. Non-object values are rejected.
    pub fn from_typed<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        serde_json::from_value(serde_json::to_value(value)?)
    }

    pub fn into_typed<T: DeserializeOwned>(self) -> serde_json::Result<T> {
        serde_json::from_value(Value::Object(self.0))
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("_id").and_then(Value::as_str)
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.0.insert("_id".to_string(), Value::String(id.into()));
    }

    pub fn rev(&self) -> Option<&str> {
        self.0.get("_rev").and_then(Value::as_str)
    }

    pub fn set_rev(&mut self, rev: impl Into<String>) {
        self.0.insert("_rev".to_string(), Value::String(rev.into()));
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Document {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
    }
}

/// Id and (optionally) revision of a document, as sent to `_bulk_get`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
}

impl DocRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rev: None,
        }
    }

    pub fn with_rev(mut self, rev: impl Into<String>) -> Self {
        self.rev = Some(rev.into());
        self
    }

    /// Read `_id` (or `id`) and `_rev` (or `rev`) from a document
    pub fn from_document(doc: &Document, include_rev: bool) -> Option<Self> {
        let field = |primary: &str, fallback: &str| {
            doc.get(primary)
                .or_else(|| doc.get(fallback))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let id = field("_id", "id")?;
        let rev = if include_rev { field("_rev", "rev") } else { None };
        Some(Self { id, rev })
    }
}

/// Attachment content plus the metadata reported in the response headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachment {
    pub content: Vec<u8>,
    pub content_encoding: Option<String>,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    /// `md5-<base64>` built from the `Content-MD5` header
    pub digest: Option<String>,
}

/// `admins` or `members` section of a database security object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityElement {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl SecurityElement {
    pub fn add_name(&mut self, name: impl Into<String>) {
        self.names = sorted_union(&self.names, name.into());
    }

    pub fn add_role(&mut self, role: impl Into<String>) {
        self.roles = sorted_union(&self.roles, role.into());
    }
}

fn sorted_union(existing: &[String], item: String) -> Vec<String> {
    let mut set: BTreeSet<String> = existing.iter().cloned().collect();
    set.insert(item);
    set.into_iter().collect()
}

/// Database security object (`/{db}/_security`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityDocument {
    #[serde(default)]
    pub admins: SecurityElement,
    #[serde(default)]
    pub members: SecurityElement,
}
