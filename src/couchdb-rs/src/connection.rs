//! Shared HTTP plumbing: URL building, authentication and status translation
//!
//! One `Connection` backs a server handle and every database and partition
//! opened from it, so they all share the HTTP client and the session token.

use chrono::Utc;
use couchdb_core::{build_url, utils, AuthMethod, ClientConfig, CoreError, Query, SessionToken};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as HttpClient, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

use crate::error::{ClientError, Result};

#[derive(Clone)]
pub(crate) struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    fn authorization(&self) -> String {
        format!("Basic {}", utils::basic_auth(&self.user, &self.password))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Serialize)]
struct SessionRequest<'a> {
    name: &'a str,
    password: &'a str,
}

/// `{"ok": true}` acknowledgement
#[derive(Debug, Deserialize)]
pub(crate) struct OkResponse {
    #[serde(default)]
    pub ok: bool,
}

#[derive(Debug)]
pub(crate) enum Body {
    Empty,
    Json(Vec<u8>),
    Raw { data: Vec<u8>, content_type: String },
}

/// A request relative to the server root
#[derive(Debug)]
pub(crate) struct Request {
    method: Method,
    path: Vec<String>,
    query: Query,
    body: Body,
    headers: HeaderMap,
}

impl Request {
    pub fn new<I, S>(method: Method, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            path: path.into_iter().map(Into::into).collect(),
            query: Query::new(),
            body: Body::Empty,
            headers: HeaderMap::new(),
        }
    }

    pub fn get<I: IntoIterator<Item = S>, S: Into<String>>(path: I) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn head<I: IntoIterator<Item = S>, S: Into<String>>(path: I) -> Self {
        Self::new(Method::HEAD, path)
    }

    pub fn post<I: IntoIterator<Item = S>, S: Into<String>>(path: I) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put<I: IntoIterator<Item = S>, S: Into<String>>(path: I) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete<I: IntoIterator<Item = S>, S: Into<String>>(path: I) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Body::Json(serde_json::to_vec(body)?);
        Ok(self)
    }

    pub fn raw(mut self, data: Vec<u8>, content_type: impl Into<String>) -> Self {
        self.body = Body::Raw {
            data,
            content_type: content_type.into(),
        };
        self
    }

    pub fn header(mut self, name: HeaderName, value: &str) -> Result<Self> {
        let value = HeaderValue::from_str(value).map_err(|_| {
            CoreError::InvalidArgument(format!("invalid {} header value: {}", name, value))
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }
}

#[derive(Debug)]
pub(crate) struct Connection {
    base_url: Url,
    http: HttpClient,
    credentials: Option<Credentials>,
    auth_method: AuthMethod,
    config: ClientConfig,
    session: Mutex<Option<SessionToken>>,
}

impl Connection {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let parts = utils::parse_url(&config.url)?;
        let base_url = parts.base_url(config.port)?;

        let user = config.user.clone().or(parts.user);
        let password = config.password.clone().or(parts.password);
        let credentials = match (user, password) {
            (Some(user), Some(password)) => Some(Credentials { user, password }),
            _ => None,
        };

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.disable_ssl_verification)
            .build()?;

        tracing::debug!(
            url = %base_url,
            auth_method = %config.auth_method,
            authenticated = credentials.is_some(),
            "CouchDB connection configured"
        );

        Ok(Self {
            base_url,
            http,
            credentials,
            auth_method: config.auth_method,
            config: config.clone(),
            session: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn uses_session(&self) -> bool {
        self.auth_method == AuthMethod::Cookie && self.credentials.is_some()
    }

    /// Send a request and translate error statuses. A cookie-authenticated
    /// request rejected with 401 is retried once with a fresh session.
    pub async fn send(&self, request: Request) -> Result<Response> {
        let url = build_url(&self.base_url, &request.path, &request.query)?;
        let response = self.dispatch(&request, &url).await?;

        if response.status() == StatusCode::UNAUTHORIZED && self.uses_session() {
            tracing::warn!(method = %request.method, url = %url, "Session rejected, renewing and retrying");
            *self.session.lock().await = None;
            let retry = self.dispatch(&request, &url).await?;
            return check_response(retry).await;
        }

        check_response(response).await
    }

    /// Send a request and deserialize the JSON response
    pub async fn json<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// `true` when a HEAD on `path` succeeds, `false` on any error
    pub async fn check(&self, path: Vec<String>) -> bool {
        match self.send(Request::head(path)).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Check failed");
                false
            }
        }
    }

    /// `true` when a HEAD on `path` succeeds, `false` when the server answers
    /// with an error status; transport errors propagate
    pub async fn contains(&self, path: Vec<String>) -> Result<bool> {
        match self.send(Request::head(path)).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_server_error() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Current revision from the ETag of a HEAD request; `None` if missing.
    /// Errors other than 404, and a success without an ETag, are returned.
    pub async fn rev(&self, path: Vec<String>) -> Result<Option<String>> {
        let response = match self.send(Request::head(path)).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        let etag = header_value(&response, header::ETAG)
            .ok_or_else(|| ClientError::InvalidResponse("missing ETag header".to_string()))?;
        Ok(Some(etag.trim_matches('"').to_string()))
    }

    async fn dispatch(&self, request: &Request, url: &Url) -> Result<Response> {
        let mut builder = self
            .http
            .request(request.method.clone(), url.clone())
            .headers(request.headers.clone());

        if let Some(credentials) = &self.credentials {
            builder = match self.auth_method {
                AuthMethod::Basic => builder.header(header::AUTHORIZATION, credentials.authorization()),
                AuthMethod::Cookie => builder.header(header::COOKIE, self.session_cookie(credentials).await?),
            };
        }

        builder = match &request.body {
            Body::Empty => builder,
            Body::Json(bytes) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(bytes.clone()),
            Body::Raw { data, content_type } => builder
                .header(header::CONTENT_TYPE, content_type.as_str())
                .body(data.clone()),
        };

        let response = builder.send().await?;
        tracing::debug!(
            method = %request.method,
            url = %url,
            status = response.status().as_u16(),
            "CouchDB request"
        );

        if self.uses_session() {
            if let Some(token) = session_token(&response) {
                *self.session.lock().await = Some(token);
            }
        }
        Ok(response)
    }

    /// Cookie header for the current session, renewing it when missing or expired
    async fn session_cookie(&self, credentials: &Credentials) -> Result<String> {
        let mut session = self.session.lock().await;
        if let Some(token) = session.as_ref().filter(|t| !t.is_expired(Utc::now())) {
            return Ok(token.cookie_header());
        }
        let token = self.renew_session(credentials).await?;
        let cookie = token.cookie_header();
        *session = Some(token);
        Ok(cookie)
    }

    async fn renew_session(&self, credentials: &Credentials) -> Result<SessionToken> {
        let url = build_url(&self.base_url, &["_session"], &Query::new())?;
        let response = self
            .http
            .post(url)
            .header(header::AUTHORIZATION, credentials.authorization())
            .json(&SessionRequest {
                name: &credentials.user,
                password: &credentials.password,
            })
            .send()
            .await?;
        let response = check_response(response).await?;

        let token = session_token(&response).ok_or_else(|| {
            ClientError::InvalidResponse("no AuthSession cookie in /_session response".to_string())
        })?;
        tracing::info!(user = %credentials.user, expires_at = ?token.expires_at, "CouchDB session renewed");
        Ok(token)
    }
}

/// Map error statuses to `ClientError`, passing everything below 400 through
pub(crate) async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.as_u16() < 400 {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(ClientError::from_status(status, &text)
        .unwrap_or_else(|| ClientError::InvalidResponse(format!("unexpected status {}", status))))
}

pub(crate) fn header_value(response: &Response, name: HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn session_token(response: &Response) -> Option<SessionToken> {
    let now = Utc::now();
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| SessionToken::from_set_cookie(v, now))
}
