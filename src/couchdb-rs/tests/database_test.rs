use couchdb_rs::{
    AttachmentSource, ClientError, Database, DesignDocument, DocRef, Document, FindRequest,
    GetOptions, IndexDefinition, SaveOptions, SecurityElement, Server, ViewOptions,
};
use serde_json::json;
use std::collections::HashMap;
use std::io::Write;
use wiremock::matchers::{body_bytes, body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn orders(mock: &MockServer) -> Database {
    Server::new(mock.uri()).unwrap().database("orders").unwrap()
}

fn doc(value: serde_json::Value) -> Document {
    value.try_into().unwrap()
}

fn update(id: &str, rev: &str) -> ResponseTemplate {
    ResponseTemplate::new(201).set_body_json(json!({"ok": true, "id": id, "rev": rev}))
}

#[tokio::test]
async fn test_get_and_get_opt() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders/o1"))
        .and(query_param("rev", "1-a"))
        .and(query_param("conflicts", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"_id": "o1", "_rev": "1-a", "total": 5})))
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/orders/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "unknown_error", "reason": "boom"})))
        .mount(&mock)
        .await;

    let db = orders(&mock);
    let options = GetOptions {
        conflicts: Some(true),
        ..GetOptions::rev("1-a")
    };
    let found = db.get("o1", &options).await.unwrap();
    assert_eq!(found.rev(), Some("1-a"));
    assert_eq!(found.get("total"), Some(&json!(5)));

    assert!(matches!(
        db.get("gone", &GetOptions::default()).await,
        Err(ClientError::NotFound(_))
    ));
    assert_eq!(db.get_opt("gone", &GetOptions::default()).await.unwrap(), None);
    assert!(matches!(
        db.get_opt("broken", &GetOptions::default()).await,
        Err(ClientError::InternalServer(_))
    ));
}

#[tokio::test]
async fn test_slash_in_id_is_encoded() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders/a%2Fb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"_id": "a/b", "_rev": "1-a"})))
        .expect(1)
        .mount(&mock)
        .await;

    let found = orders(&mock).get("a/b", &GetOptions::default()).await.unwrap();
    assert_eq!(found.id(), Some("a/b"));
}

#[tokio::test]
async fn test_exists_contains_and_rev() {
    let mock = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/orders/o1"))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"7-abc\""))
        .mount(&mock)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/orders/no-etag"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock)
        .await;

    let db = orders(&mock);
    assert!(db.exists().await.unwrap());
    assert!(db.check().await);
    assert!(db.contains("o1").await.unwrap());
    assert!(!db.contains("o2").await.unwrap());
    assert_eq!(db.rev("o1").await.unwrap().as_deref(), Some("7-abc"));
    assert_eq!(db.rev("o2").await.unwrap(), None);
    assert!(matches!(db.rev("no-etag").await, Err(ClientError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_create_in_batch_mode() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(query_param("batch", "ok"))
        .and(body_json(json!({"total": 3})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"ok": true, "id": "gen-1", "rev": ""})))
        .expect(1)
        .mount(&mock)
        .await;

    let result = orders(&mock)
        .create(&Document::new().with("total", 3), true)
        .await
        .unwrap();
    assert_eq!(result.id, "gen-1");
}

#[tokio::test]
async fn test_save_sends_rev_and_options() {
    let mock = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/orders/o1"))
        .and(query_param("rev", "1-a"))
        .and(query_param("new_edits", "false"))
        .and(body_json(json!({"_id": "o1", "_rev": "1-a", "total": 9})))
        .respond_with(update("o1", "2-b"))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("PUT"))
        .and(path("/orders/_local/checkpoint"))
        .respond_with(update("_local/checkpoint", "0-1"))
        .expect(1)
        .mount(&mock)
        .await;

    let db = orders(&mock);
    let options = SaveOptions {
        new_edits: Some(false),
        ..Default::default()
    };
    let result = db
        .save(&doc(json!({"_id": "o1", "_rev": "1-a", "total": 9})), &options)
        .await
        .unwrap();
    assert_eq!(result.rev, "2-b");

    let options = SaveOptions {
        path: Some("_local".to_string()),
        ..Default::default()
    };
    db.save(&doc(json!({"_id": "checkpoint", "seq": 10})), &options)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_save_conflict() {
    let mock = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/orders/o1"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": "conflict",
            "reason": "Document update conflict."
        })))
        .mount(&mock)
        .await;

    let err = orders(&mock)
        .save(&doc(json!({"_id": "o1"})), &SaveOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(err.status(), Some(409));
}

#[tokio::test]
async fn test_delete_and_copy() {
    let mock = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/orders/o1"))
        .and(query_param("rev", "2-b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "id": "o1", "rev": "3-c"})))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("COPY"))
        .and(path("/orders/o1"))
        .and(header("destination", "o2?rev=1-z"))
        .respond_with(update("o2", "2-z"))
        .expect(1)
        .mount(&mock)
        .await;

    let db = orders(&mock);
    assert!(db.delete("o1", "2-b", false).await.unwrap());
    let copied = db.copy("o1", "o2", None, Some("1-z")).await.unwrap();
    assert_eq!(copied.id, "o2");
}

#[tokio::test]
async fn test_bulk_docs_and_bulk_get() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders/_bulk_docs"))
        .and(body_json(json!({"docs": [{"_id": "a"}, {"_id": "b"}], "new_edits": true})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {"ok": true, "id": "a", "rev": "1-a"},
            {"id": "b", "error": "conflict", "reason": "Document update conflict."}
        ])))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/orders/_bulk_get"))
        .and(query_param("revs", "true"))
        .and(body_json(json!({"docs": [{"id": "a", "rev": "1-a"}, {"id": "zz"}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": [
            {"id": "a", "docs": [{"ok": {"_id": "a", "_rev": "1-a"}}]},
            {"id": "zz", "docs": [{"error": {"id": "zz", "error": "not_found"}}]}
        ]})))
        .expect(1)
        .mount(&mock)
        .await;

    let db = orders(&mock);
    let results = db
        .bulk_docs(&[doc(json!({"_id": "a"})), doc(json!({"_id": "b"}))], true)
        .await
        .unwrap();
    assert_eq!(results[0].rev.as_deref(), Some("1-a"));
    assert_eq!(results[1].error.as_deref(), Some("conflict"));

    let results = db
        .bulk_get(&[DocRef::new("a").with_rev("1-a"), DocRef::new("zz")], true)
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0].docs[0].ok.is_some());
    assert!(results[1].docs[0].error.is_some());
}

#[tokio::test]
async fn test_views_and_all_docs() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders/_all_docs"))
        .and(query_param("include_docs", "true"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_rows": 4, "offset": 0,
            "rows": [{"id": "a", "key": "a", "value": {"rev": "1-a"}, "doc": {"_id": "a"}}]
        })))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/orders/_design/reports/_view/by_day"))
        .and(query_param("reduce", "false"))
        .and(body_json(json!({"keys": ["2024-01-01", "2024-01-02"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_rows": 10, "offset": 3,
            "rows": [{"id": "x", "key": "2024-01-01", "value": 1}]
        })))
        .expect(1)
        .mount(&mock)
        .await;

    let db = orders(&mock);
    let all = db
        .all_docs(&ViewOptions::new().include_docs().limit(1))
        .await
        .unwrap();
    assert_eq!(all.total_rows, 4);
    assert!(all.rows[0].doc.is_some());

    let options = ViewOptions {
        reduce: Some(false),
        ..ViewOptions::new().keys(["2024-01-01", "2024-01-02"])
    };
    let view = db.view("reports", "by_day", &options).await.unwrap();
    assert_eq!(view.offset, 3);
    assert_eq!(view.rows[0].value, json!(1));
}

#[tokio::test]
async fn test_find_explain_and_indexes() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders/_find"))
        .and(wiremock::matchers::body_partial_json(json!({
            "selector": {"status": "open"},
            "limit": 10,
            "fields": ["_id", "total"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "docs": [{"_id": "o1", "total": 5}],
            "bookmark": "g1AAAA"
        })))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/orders/_explain"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"index": {"name": "_all_docs"}})))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/orders/_index"))
        .and(body_json(json!({
            "index": {"fields": ["status"]},
            "ddoc": "idx",
            "name": "by-status",
            "type": "json"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "created", "id": "_design/idx", "name": "by-status"
        })))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/orders/_index"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_rows": 1,
            "indexes": [{"ddoc": null, "name": "_all_docs", "type": "special", "def": {"fields": [{"_id": "asc"}]}}]
        })))
        .expect(1)
        .mount(&mock)
        .await;

    let db = orders(&mock);
    let request = FindRequest::new(json!({"status": "open"}))
        .limit(10)
        .fields(["_id", "total"]);
    let found = db.find(&request).await.unwrap();
    assert_eq!(found.docs.len(), 1);
    assert_eq!(found.bookmark.as_deref(), Some("g1AAAA"));

    let plan = db.explain(&request).await.unwrap();
    assert_eq!(plan["index"]["name"], "_all_docs");

    let created = db
        .save_index(&IndexDefinition::json(["status"]).named("idx", "by-status"))
        .await
        .unwrap();
    assert_eq!(created.result, "created");

    let indexes = db.indexes().await.unwrap();
    assert_eq!(indexes.indexes[0].index_type, "special");
}

#[tokio::test]
async fn test_attachments() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders/o1/receipt.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-MD5", "XUFAKrxLKna5cZ2REBfFkg==")
                .set_body_raw("hello", "text/plain"),
        )
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("PUT"))
        .and(path("/orders/o1/notes.txt"))
        .and(query_param("rev", "1-a"))
        .and(header("content-type", "text/plain"))
        .and(body_bytes(b"from disk".to_vec()))
        .respond_with(update("o1", "2-a"))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("PUT"))
        .and(path("/orders/o1/blob"))
        .and(header("content-type", "application/x-custom"))
        .respond_with(update("o1", "3-a"))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/orders/o1/blob"))
        .and(query_param("rev", "3-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "id": "o1", "rev": "4-a"})))
        .expect(1)
        .mount(&mock)
        .await;

    let db = orders(&mock);
    let attachment = db.get_attachment("o1", "receipt.txt", None).await.unwrap();
    assert_eq!(attachment.content, b"hello");
    assert_eq!(attachment.content_type.as_deref(), Some("text/plain"));
    assert_eq!(attachment.content_length, Some(5));
    assert_eq!(attachment.digest.as_deref(), Some("md5-XUFAKrxLKna5cZ2REBfFkg=="));

    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("notes.txt");
    std::fs::File::create(&file_path)
        .unwrap()
        .write_all(b"from disk")
        .unwrap();
    let result = db
        .put_attachment("o1", "notes.txt", AttachmentSource::Path(file_path), Some("1-a"))
        .await
        .unwrap();
    assert_eq!(result.rev, "2-a");

    let result = db
        .put_attachment(
            "o1",
            "blob",
            AttachmentSource::bytes(vec![1u8, 2, 3], "application/x-custom"),
            Some("2-a"),
        )
        .await
        .unwrap();
    assert_eq!(result.rev, "3-a");

    let result = db.delete_attachment("o1", "blob", "3-a", false).await.unwrap();
    assert_eq!(result.rev, "4-a");
}

#[tokio::test]
async fn test_missing_attachment_file() {
    let mock = MockServer::start().await;
    let err = orders(&mock)
        .put_attachment(
            "o1",
            "missing.bin",
            AttachmentSource::Path("/nonexistent/missing.bin".into()),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Io(_)));
}

#[tokio::test]
async fn test_put_design_folds_partitioned_option() {
    let mock = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/orders/_design/reports"))
        .and(body_json(json!({
            "_id": "_design/reports",
            "language": "javascript",
            "options": {"partitioned": false},
            "views": {"by_day": {"map": "function (doc) { emit(doc.day, 1); }", "reduce": "_count"}}
        })))
        .respond_with(update("_design/reports", "1-d"))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/orders/_design/reports"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"_id": "_design/reports", "_rev": "1-d"})))
        .expect(1)
        .mount(&mock)
        .await;

    let db = orders(&mock);
    let design = DesignDocument {
        language: Some("javascript".to_string()),
        partitioned: Some(false),
        ..DesignDocument::new().view("by_day", "function (doc) { emit(doc.day, 1); }", Some("_count"))
    };
    let result = db.put_design("reports", design).await.unwrap();
    assert_eq!(result.id, "_design/reports");

    let fetched = db.get_design("reports", &GetOptions::default()).await.unwrap();
    assert_eq!(fetched.rev(), Some("1-d"));
}

#[tokio::test]
async fn test_security_compact_and_purge() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders/_security"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("PUT"))
        .and(path("/orders/_security"))
        .and(body_json(json!({
            "admins": {"names": ["alice"], "roles": []},
            "members": {"names": [], "roles": ["staff"]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/orders/_compact/reports"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/orders/_purge"))
        .and(body_json(json!({"o1": ["1-a"]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "purge_seq": null,
            "purged": {"o1": ["1-a"]}
        })))
        .expect(1)
        .mount(&mock)
        .await;

    let db = orders(&mock);
    let security = db.security().await.unwrap();
    assert!(security.admins.names.is_empty());

    let mut admins = SecurityElement::default();
    admins.add_name("alice");
    let mut members = SecurityElement::default();
    members.add_role("staff");
    assert!(db.update_security(&admins, &members).await.unwrap());

    assert!(db.compact(Some("reports")).await.unwrap());

    let mut revs = HashMap::new();
    revs.insert("o1".to_string(), vec!["1-a".to_string()]);
    let purged = db.purge(&revs).await.unwrap();
    assert_eq!(purged["purged"]["o1"][0], "1-a");
}
