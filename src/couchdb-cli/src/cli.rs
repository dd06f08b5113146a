use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use couchdb_rs::{
    AllDbsOptions, AuthMethod, ClientConfig, CreateDatabaseOptions, Document, FindRequest,
    GetOptions, ReplicationRequest, SaveOptions, Server,
};
use serde_json::{json, Value};
use std::path::PathBuf;

/// Command line client for CouchDB
#[derive(Parser, Debug)]
#[command(name = "couchdb", version)]
pub struct Cli {
    /// JSON config file; skipped when it does not exist
    #[arg(long, short = 'c', env = "COUCHDB_CONFIG", default_value = "couchdb.json")]
    pub config: PathBuf,

    /// Server URL, may embed credentials
    #[arg(long, env = "COUCHDB_URL")]
    pub url: Option<String>,

    #[arg(long, env = "COUCHDB_USER")]
    pub user: Option<String>,

    #[arg(long, env = "COUCHDB_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// `cookie` or `basic`
    #[arg(long, env = "COUCHDB_AUTH_METHOD")]
    pub auth_method: Option<AuthMethod>,

    /// Request timeout in seconds
    #[arg(long, env = "COUCHDB_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Accept invalid TLS certificates
    #[arg(long)]
    pub insecure: bool,

    /// Also write JSON logs to this directory
    #[arg(long, env = "COUCHDB_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Check that the server is up
    Up,
    /// Server welcome document, or database info when a name is given
    Info { db: Option<String> },
    /// List databases
    AllDbs {
        #[arg(long)]
        startkey: Option<String>,
        #[arg(long)]
        endkey: Option<String>,
        #[arg(long)]
        limit: Option<u64>,
        #[arg(long)]
        skip: Option<u64>,
        #[arg(long)]
        descending: bool,
    },
    CreateDb {
        name: String,
        #[arg(long)]
        partitioned: bool,
    },
    DeleteDb { name: String },
    /// Fetch a document
    Get {
        db: String,
        docid: String,
        #[arg(long)]
        rev: Option<String>,
    },
    /// Save a document from a JSON file; without `_id` the server assigns one
    Put { db: String, file: PathBuf },
    /// Run a Mango query
    Find {
        db: String,
        /// Selector as JSON, e.g. '{"type": "order"}'
        selector: String,
        #[arg(long, default_value_t = 25)]
        limit: u64,
    },
    /// Current revision of a document
    Rev { db: String, docid: String },
    /// Submit a replication to `_replicator`
    Replicate {
        source: String,
        target: String,
        #[arg(long)]
        continuous: bool,
        #[arg(long)]
        create_target: bool,
    },
}

impl Cli {
    /// Config file, overridden by environment and flags
    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut config = if self.config.exists() {
            ClientConfig::load(&self.config.to_string_lossy())
                .with_context(|| format!("Failed to load {}", self.config.display()))?
        } else {
            ClientConfig::default()
        };

        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(user) = &self.user {
            config.user = Some(user.clone());
        }
        if let Some(password) = &self.password {
            config.password = Some(password.clone());
        }
        if let Some(auth_method) = self.auth_method {
            config.auth_method = auth_method;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if self.insecure {
            config.disable_ssl_verification = true;
        }
        Ok(config)
    }
}

/// Execute a subcommand and return its JSON output
pub async fn run(command: &Command, server: &Server) -> Result<Value> {
    let output = match command {
        Command::Up => json!({ "up": server.up().await }),
        Command::Info { db: None } => server.info().await?,
        Command::Info { db: Some(db) } => server.database(db)?.info().await?,
        Command::AllDbs {
            startkey,
            endkey,
            limit,
            skip,
            descending,
        } => {
            let options = AllDbsOptions {
                startkey: startkey.clone(),
                endkey: endkey.clone(),
                limit: *limit,
                skip: *skip,
                descending: descending.then_some(true),
            };
            json!(server.all_dbs(&options).await?)
        }
        Command::CreateDb { name, partitioned } => {
            let options = CreateDatabaseOptions {
                partitioned: *partitioned,
                ..Default::default()
            };
            server.create(name, &options).await?;
            json!({ "ok": true, "db": name })
        }
        Command::DeleteDb { name } => json!({ "ok": server.delete(name).await? }),
        Command::Get { db, docid, rev } => {
            let options = GetOptions {
                rev: rev.clone(),
                ..Default::default()
            };
            serde_json::to_value(server.database(db)?.get(docid, &options).await?)?
        }
        Command::Put { db, file } => {
            let contents = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let doc: Document = serde_json::from_str(&contents)
                .with_context(|| format!("{} is not a JSON object", file.display()))?;
            let db = server.database(db)?;
            let result = if doc.id().is_some() {
                db.save(&doc, &SaveOptions::default()).await?
            } else {
                db.create(&doc, false).await?
            };
            serde_json::to_value(result)?
        }
        Command::Find { db, selector, limit } => {
            let selector: Value =
                serde_json::from_str(selector).context("Selector is not valid JSON")?;
            let request = FindRequest::new(selector).limit(*limit);
            serde_json::to_value(server.database(db)?.find(&request).await?)?
        }
        Command::Rev { db, docid } => {
            let rev = server.database(db)?.rev(docid).await?;
            json!({ "id": docid, "rev": rev })
        }
        Command::Replicate {
            source,
            target,
            continuous,
            create_target,
        } => {
            let mut request = ReplicationRequest::new(source.as_str(), target.as_str());
            request.continuous = continuous.then_some(true);
            request.create_target = create_target.then_some(true);
            server.replicate(&request).await?
        }
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["couchdb", "create-db", "sensors", "--partitioned"]).unwrap();
        assert_eq!(
            cli.command,
            Command::CreateDb {
                name: "sensors".to_string(),
                partitioned: true
            }
        );

        let cli = Cli::try_parse_from(["couchdb", "get", "orders", "o1", "--rev", "2-b"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Get {
                db: "orders".to_string(),
                docid: "o1".to_string(),
                rev: Some("2-b".to_string())
            }
        );

        let cli = Cli::try_parse_from(["couchdb", "find", "orders", r#"{"a": 1}"#]).unwrap();
        assert!(matches!(cli.command, Command::Find { limit: 25, .. }));

        let cli = Cli::try_parse_from(["couchdb", "all-dbs", "--limit", "10", "--skip", "20"]).unwrap();
        assert_eq!(
            cli.command,
            Command::AllDbs {
                startkey: None,
                endkey: None,
                limit: Some(10),
                skip: Some(20),
                descending: false
            }
        );

        let cli = Cli::try_parse_from(["couchdb", "info"]).unwrap();
        assert_eq!(cli.command, Command::Info { db: None });
    }

    #[test]
    fn test_parse_auth_method() {
        let cli = Cli::try_parse_from(["couchdb", "--auth-method", "basic", "up"]).unwrap();
        assert_eq!(cli.auth_method, Some(AuthMethod::Basic));
        assert!(Cli::try_parse_from(["couchdb", "--auth-method", "digest", "up"]).is_err());
    }

    #[test]
    fn test_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["couchdb"]).is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"url": "http://file-host:5984", "user": "file-user", "password": "file-pw", "timeout_secs": 30}}"#
        )
        .unwrap();
        let config_path = file.path().to_str().unwrap();

        let cli = Cli::try_parse_from([
            "couchdb",
            "--config",
            config_path,
            "--user",
            "flag-user",
            "--insecure",
            "up",
        ])
        .unwrap();
        let config = cli.client_config().unwrap();
        assert_eq!(config.url, "http://file-host:5984");
        assert_eq!(config.user.as_deref(), Some("flag-user"));
        assert_eq!(config.password.as_deref(), Some("file-pw"));
        assert_eq!(config.timeout_secs, 30);
        assert!(config.disable_ssl_verification);
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let cli = Cli::try_parse_from([
            "couchdb",
            "--config",
            "/nonexistent/couchdb.json",
            "--url",
            "http://db:5984",
            "up",
        ])
        .unwrap();
        let config = cli.client_config().unwrap();
        assert_eq!(config.url, "http://db:5984");
        assert_eq!(config.timeout_secs, 300);
    }

    #[test]
    fn test_invalid_config_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let cli = Cli::try_parse_from([
            "couchdb",
            "--config",
            file.path().to_str().unwrap(),
            "up",
        ])
        .unwrap();
        assert!(cli.client_config().is_err());
    }
}
