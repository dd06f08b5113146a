use base64::Engine;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use crate::error::CoreError;

/// Reserved users database
pub const USERS_DB: &str = "_users";
/// Reserved replicator database
pub const REPLICATOR_DB: &str = "_replicator";
/// Reserved global changes database
pub const GLOBAL_CHANGES_DB: &str = "_global_changes";

pub const RESERVED_DB_NAMES: [&str; 3] = [USERS_DB, REPLICATOR_DB, GLOBAL_CHANGES_DB];

/// Schemes accepted in server URLs and replication proxies
pub const VALID_SCHEMES: [&str; 3] = ["http", "https", "socks5"];

/// Prefix every `_users` document id carries
pub const USER_ID_PREFIX: &str = "org.couchdb.user:";

static DB_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_$()+/-]*$").expect("valid database name pattern"));

static USER_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^org\.couchdb\.user:.*$").expect("valid user id pattern"));

/// Components of a server URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts {
    pub scheme: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
}

impl UrlParts {
    /// `scheme://host[:port][/path]`, credentials stripped
    pub fn base_url(&self, port: Option<u16>) -> Result<Url, CoreError> {
        let mut base = format!("{}://{}", self.scheme, self.host);
        if let Some(port) = port.or(self.port) {
            base.push_str(&format!(":{}", port));
        }
        let path = self.path.trim_matches('/');
        if !path.is_empty() {
            base.push('/');
            base.push_str(path);
        }
        Ok(Url::parse(&base)?)
    }
}

/// Split a server URL into scheme, credentials, host, port and path.
/// URLs without a known scheme are treated as `http://`.
pub fn parse_url(url: &str) -> Result<UrlParts, CoreError> {
    let has_scheme = VALID_SCHEMES
        .iter()
        .any(|scheme| url.starts_with(&format!("{}://", scheme)));
    let url = if has_scheme {
        url.to_string()
    } else {
        format!("http://{}", url)
    };
    let parsed = Url::parse(&url)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| CoreError::InvalidArgument(format!("URL has no host: {}", url)))?;

    let decode = |raw: &str| {
        urlencoding::decode(raw)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| raw.to_string())
    };
    let user = Some(parsed.username()).filter(|u| !u.is_empty()).map(decode);
    let password = parsed.password().map(decode);

    Ok(UrlParts {
        scheme: parsed.scheme().to_string(),
        user,
        password,
        host: host.to_string(),
        port: parsed.port(),
        path: parsed.path().to_string(),
    })
}

/// Base64 of `user:password`, the value after `Basic ` in an Authorization header
pub fn basic_auth(user: &str, password: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", user, password))
}

pub fn validate_db_name(name: &str) -> bool {
    RESERVED_DB_NAMES.contains(&name) || DB_NAME_PATTERN.is_match(name)
}

pub fn validate_user_id(user_id: &str) -> bool {
    USER_ID_PATTERN.is_match(user_id)
}

pub fn validate_proxy(proxy: &str) -> bool {
    Url::parse(proxy)
        .map(|url| VALID_SCHEMES.contains(&url.scheme()))
        .unwrap_or(false)
}

pub fn user_name_to_id(name: &str) -> String {
    format!("{}{}", USER_ID_PREFIX, name)
}

/// Path segments for a document id. `_design/` and `_local/` ids keep their
/// prefix as a literal segment; any other `/` is encoded as part of the id.
pub fn doc_path(docid: &str) -> Vec<String> {
    for prefix in ["_design", "_local"] {
        if let Some(rest) = docid
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('/'))
        {
            return vec![prefix.to_string(), rest.to_string()];
        }
    }
    vec![docid.to_string()]
}

/// Path segments for a server-level resource such as `_users/org.couchdb.user:bob`:
/// the database name followed by the document path.
pub fn resource_path(resource: &str) -> Vec<String> {
    match resource.split_once('/') {
        Some((db, rest)) if !rest.is_empty() => {
            let mut path = vec![db.to_string()];
            path.extend(doc_path(rest));
            path
        }
        _ => vec![resource.trim_end_matches('/').to_string()],
    }
}

/// Scope `resource` to a partition: `_partition/{partition}/{resource}`
pub fn partition_path(resource: Vec<String>, partition: Option<&str>) -> Vec<String> {
    match partition {
        Some(partition) => {
            let mut path = vec!["_partition".to_string(), partition.to_string()];
            path.extend(resource);
            path
        }
        None => resource,
    }
}

/// Guess MIME type from file extension
pub fn guess_content_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") | Some("mjs") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("mp4") => "video/mp4",
        Some("xml") => "application/xml",
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        Some("md") => "text/markdown",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz") => "application/gzip",
        _ => "application/octet-stream",
    }
}
