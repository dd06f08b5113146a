use couchdb_core::utils::{self, REPLICATOR_DB, USERS_DB};
use couchdb_core::{
    AllDbsOptions, ClientConfig, CoreError, CreateDatabaseOptions, DocUpdate, ReplicationRequest,
    UserDocument,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

use crate::connection::{Connection, OkResponse, Request};
use crate::database::Database;
use crate::error::{ClientError, Result};

/// Handle to a CouchDB server
///
/// Cloning is cheap: clones, and every [`Database`] opened from them, share
/// one HTTP client and session.
#[derive(Debug, Clone)]
pub struct Server {
    conn: Arc<Connection>,
}

#[derive(Serialize)]
struct DbsInfoRequest<'a> {
    keys: &'a [String],
}

impl Server {
    /// Connect anonymously, or with credentials embedded in the URL
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::from_config(&ClientConfig::new(url))
    }

    /// Connect with session-cookie authentication
    pub fn with_credentials(
        url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        Self::from_config(&ClientConfig::new(url).with_credentials(user, password))
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            conn: Arc::new(Connection::new(config)?),
        })
    }

    /// Server root URL, credentials removed
    pub fn url(&self) -> &Url {
        self.conn.base_url()
    }

    /// `true` if the server root answers successfully, `false` on any error
    pub async fn check(&self) -> bool {
        self.conn.check(Vec::new()).await
    }

    /// `true` if the server root answers successfully; transport errors propagate
    pub async fn exists(&self) -> Result<bool> {
        self.conn.contains(Vec::new()).await
    }

    /// `true` if `resource` (e.g. `mydb` or `_users/org.couchdb.user:bob`) exists
    pub async fn contains(&self, resource: &str) -> Result<bool> {
        self.conn.contains(utils::resource_path(resource)).await
    }

    /// Welcome document from `GET /`
    pub async fn info(&self) -> Result<Value> {
        self.conn.json(Request::get(Vec::<String>::new())).await
    }

    /// Current revision of a server-level resource, `None` if it does not
    /// exist. Other failures are returned as errors.
    pub async fn rev(&self, resource: &str) -> Result<Option<String>> {
        self.conn.rev(utils::resource_path(resource)).await
    }

    /// Authenticated user context from `GET /_session`
    pub async fn session_info(&self) -> Result<Value> {
        self.conn.json(Request::get(["_session"])).await
    }

    pub async fn active_tasks(&self) -> Result<Vec<Value>> {
        self.conn.json(Request::get(["_active_tasks"])).await
    }

    pub async fn all_dbs(&self, options: &AllDbsOptions) -> Result<Vec<String>> {
        self.conn
            .json(Request::get(["_all_dbs"]).query(options.to_query()))
            .await
    }

    /// Create a database and return a handle to it
    pub async fn create(&self, name: &str, options: &CreateDatabaseOptions) -> Result<Database> {
        let db = self.database(name)?;
        self.conn
            .send(Request::put([name]).query(options.to_query()))
            .await?;
        tracing::info!(db = name, partitioned = options.partitioned, "Database created");
        Ok(db)
    }

    /// Information about several databases at once
    pub async fn dbs_info(&self, names: &[String]) -> Result<Vec<Value>> {
        let request = Request::post(["_dbs_info"]).json(&DbsInfoRequest { keys: names })?;
        self.conn.json(request).await
    }

    /// Handle to a database without contacting the server
    pub fn database(&self, name: &str) -> Result<Database> {
        Database::new(self.conn.clone(), name)
    }

    /// Handle to a database after a HEAD request. Without `check`, a missing
    /// database or an unreachable server is tolerated; other server errors
    /// always fail.
    pub async fn get(&self, name: &str, check: bool) -> Result<Database> {
        let db = self.database(name)?;
        match self.conn.send(Request::head([name])).await {
            Ok(_) => Ok(db),
            Err(e) if !check && (e.is_not_found() || matches!(e, ClientError::Request(_))) => {
                tracing::debug!(db = name, error = %e, "Database not reachable, returning unchecked handle");
                Ok(db)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn delete(&self, name: &str) -> Result<bool> {
        if !utils::validate_db_name(name) {
            return Err(CoreError::NameCompliance(name.to_string()).into());
        }
        let response: OkResponse = self.conn.json(Request::delete([name])).await?;
        tracing::info!(db = name, "Database deleted");
        Ok(response.ok)
    }

    /// Start (or cancel) a replication by posting to `_replicator`
    pub async fn replicate(&self, request: &ReplicationRequest) -> Result<Value> {
        request.validate()?;
        let result = self
            .conn
            .json(Request::post([REPLICATOR_DB]).json(request)?)
            .await?;
        tracing::info!(continuous = ?request.continuous, "Replication submitted");
        Ok(result)
    }

    /// `true` if `GET /_up` succeeds
    pub async fn up(&self) -> bool {
        match self.conn.send(Request::get(["_up"])).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Server not up");
                false
            }
        }
    }

    /// `true` if `name`/`password` authenticate against this server
    pub async fn check_user(&self, name: &str, password: &str) -> Result<bool> {
        let config = self.conn.config().clone().with_credentials(name, password);
        Ok(Server::from_config(&config)?.check().await)
    }

    /// Create or update a `_users` document. A stale or missing revision is
    /// refreshed and the write retried once.
    pub async fn save_user(&self, mut user: UserDocument) -> Result<DocUpdate> {
        let user_id = match user.id.clone() {
            Some(id) => id,
            None => utils::user_name_to_id(&user.name),
        };
        if !utils::validate_user_id(&user_id) {
            return Err(CoreError::UserIdCompliance(user_id).into());
        }
        user.id = Some(user_id.clone());

        match self.put_user(&user_id, &user).await {
            Err(ClientError::Conflict(_)) => {
                tracing::debug!(user = %user_id, "User revision conflict, refreshing");
                user.rev = self.conn.rev(vec![USERS_DB.to_string(), user_id.clone()]).await?;
                self.put_user(&user_id, &user).await
            }
            result => result,
        }
    }

    async fn put_user(&self, user_id: &str, user: &UserDocument) -> Result<DocUpdate> {
        let request = Request::put([USERS_DB, user_id]).json(user)?;
        self.conn.json(request).await
    }
}
