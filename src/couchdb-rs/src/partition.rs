use couchdb_core::{
    Attachment, AttachmentSource, BulkDocResult, BulkGetResult, DocRef, DocUpdate, Document,
    FindRequest, FindResponse, GetOptions, SaveOptions, ViewOptions, ViewResult,
};
use serde_json::Value;

use crate::database::Database;
use crate::error::Result;

/// A partition of a partitioned database
///
/// Document ids passed in are prefixed with `{partition}:` unless they
/// already carry it; queries go through `/{db}/_partition/{partition}/...`.
#[derive(Debug, Clone)]
pub struct Partition {
    db: Database,
    partition_id: String,
}

impl Partition {
    pub(crate) fn new(db: Database, partition_id: &str) -> Self {
        Self {
            db,
            partition_id: partition_id.to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.partition_id
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// `doc` becomes `{partition}:doc`; ids already in the partition are kept
    pub fn add_partition_to_str(&self, docid: &str) -> String {
        let prefix = format!("{}:", self.partition_id);
        if docid.starts_with(&prefix) {
            docid.to_string()
        } else {
            format!("{}{}", prefix, docid)
        }
    }

    /// Copy of `doc` with its `_id` moved into this partition
    pub fn add_partition_to_doc(&self, doc: &Document) -> Document {
        let mut doc = doc.clone();
        if let Some(id) = doc.id().map(|id| self.add_partition_to_str(id)) {
            doc.set_id(id);
        }
        doc
    }

    pub async fn info(&self) -> Result<Value> {
        self.db.partition_info(&self.partition_id).await
    }

    pub async fn all_docs(&self, options: &ViewOptions) -> Result<ViewResult> {
        self.db.all_docs_in(&self.partition_id, options).await
    }

    pub async fn find(&self, request: &FindRequest) -> Result<FindResponse> {
        self.db.find_in(&self.partition_id, request).await
    }

    pub async fn view(&self, ddoc: &str, view: &str, options: &ViewOptions) -> Result<ViewResult> {
        self.db.view_in(&self.partition_id, ddoc, view, options).await
    }

    pub async fn bulk_docs(&self, docs: &[Document], new_edits: bool) -> Result<Vec<BulkDocResult>> {
        let docs: Vec<Document> = docs.iter().map(|doc| self.add_partition_to_doc(doc)).collect();
        self.db.bulk_docs(&docs, new_edits).await
    }

    pub async fn bulk_get(&self, docs: &[DocRef], revs: bool) -> Result<Vec<BulkGetResult>> {
        let docs: Vec<DocRef> = docs
            .iter()
            .map(|doc| DocRef {
                id: self.add_partition_to_str(&doc.id),
                rev: doc.rev.clone(),
            })
            .collect();
        self.db.bulk_get(&docs, revs).await
    }

    pub async fn copy(
        &self,
        docid: &str,
        destid: &str,
        rev: Option<&str>,
        destrev: Option<&str>,
    ) -> Result<DocUpdate> {
        self.db
            .copy(
                &self.add_partition_to_str(docid),
                &self.add_partition_to_str(destid),
                rev,
                destrev,
            )
            .await
    }

    pub async fn create(&self, doc: &Document, batch: bool) -> Result<DocUpdate> {
        self.db.create(&self.add_partition_to_doc(doc), batch).await
    }

    pub async fn save(&self, doc: &Document, options: &SaveOptions) -> Result<DocUpdate> {
        self.db.save(&self.add_partition_to_doc(doc), options).await
    }

    pub async fn delete(&self, docid: &str, rev: &str, batch: bool) -> Result<bool> {
        self.db
            .delete(&self.add_partition_to_str(docid), rev, batch)
            .await
    }

    pub async fn get(&self, docid: &str, options: &GetOptions) -> Result<Document> {
        self.db.get(&self.add_partition_to_str(docid), options).await
    }

    pub async fn get_opt(&self, docid: &str, options: &GetOptions) -> Result<Option<Document>> {
        self.db
            .get_opt(&self.add_partition_to_str(docid), options)
            .await
    }

    pub async fn contains(&self, docid: &str) -> Result<bool> {
        self.db.contains(&self.add_partition_to_str(docid)).await
    }

    pub async fn rev(&self, docid: &str) -> Result<Option<String>> {
        self.db.rev(&self.add_partition_to_str(docid)).await
    }

    pub async fn get_attachment(&self, docid: &str, attname: &str, rev: Option<&str>) -> Result<Attachment> {
        self.db
            .get_attachment(&self.add_partition_to_str(docid), attname, rev)
            .await
    }

    pub async fn put_attachment(
        &self,
        docid: &str,
        attname: &str,
        source: AttachmentSource,
        rev: Option<&str>,
    ) -> Result<DocUpdate> {
        self.db
            .put_attachment(&self.add_partition_to_str(docid), attname, source, rev)
            .await
    }

    pub async fn delete_attachment(
        &self,
        docid: &str,
        attname: &str,
        rev: &str,
        batch: bool,
    ) -> Result<DocUpdate> {
        self.db
            .delete_attachment(&self.add_partition_to_str(docid), attname, rev, batch)
            .await
    }
}
