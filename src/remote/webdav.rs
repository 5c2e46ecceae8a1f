// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! HTTPS access to a code directory through `reqwest`.

use crate::{
    config::ServerProfile,
    path::encode_remote_path,
    remote::{
        multistatus::{parse_entries, PROPFIND_BODY},
        Creation, Existence, Listing, RemoteClient, RemoteEntry, RemoteError, Removal, Result,
        Upload,
    },
};

use async_trait::async_trait;
use reqwest::{header::CONTENT_LENGTH, Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::Path,
};
use tracing::{debug, instrument, warn};

/// Server path under which every code directory lives.
pub const WEBDAV_CARTRIDGES_PATH: &str = "/on/demandware.servlet/webdav/Sites/Cartridges";

/// Server path of the studio service used to enumerate code directories.
pub const STUDIO_SERVICE_PATH: &str = "/on/demandware.servlet/studiosvc/Sites";

/// Code directory client over HTTPS.
///
/// Addresses `https://{hostname}/on/demandware.servlet/webdav/Sites/Cartridges/{directory}`
/// and everything beneath it. TLS verification follows the profile.
#[derive(Clone)]
pub struct WebDavClient {
    client: Client,
    origin: String,
    code_directory: String,
    username: String,
    password: String,
    propfind: Method,
    mkcol: Method,
}

impl WebDavClient {
    /// Construct new client for target profile.
    ///
    /// # Errors
    ///
    /// - Return [`RemoteError::Client`] if HTTP client cannot be configured.
    pub fn new(profile: &ServerProfile) -> Result<Self> {
        Self::with_origin(profile, format!("https://{}", profile.hostname))
    }

    /// Construct new client for target profile against an explicit origin,
    /// e.g., "http://127.0.0.1:8080".
    ///
    /// # Errors
    ///
    /// - Return [`RemoteError::Client`] if HTTP client cannot be configured.
    pub fn with_origin(profile: &ServerProfile, origin: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!profile.verify_ssl)
            .build()
            .map_err(RemoteError::Client)?;

        Ok(Self {
            client,
            origin: origin.into().trim_end_matches('/').to_string(),
            code_directory: profile.code_directory.clone(),
            username: profile.username.clone(),
            password: profile.password.clone(),
            propfind: extension_method("PROPFIND")?,
            mkcol: extension_method("MKCOL")?,
        })
    }

    /// Absolute URL of remote-relative path.
    pub fn url(&self, path: &str) -> String {
        let root = format!(
            "{}{}/{}",
            self.origin,
            WEBDAV_CARTRIDGES_PATH,
            urlencoding::encode(&self.code_directory)
        );
        let path = path.trim_matches('/');
        if path.is_empty() {
            root
        } else {
            format!("{root}/{}", encode_remote_path(path))
        }
    }

    /// List code directories known to the server.
    ///
    /// # Errors
    ///
    /// - Return [`RemoteError::Unauthorized`] if credentials are rejected.
    /// - Return [`RemoteError::UnexpectedStatus`] for any other failed status.
    /// - Return [`RemoteError::MalformedJson`] if response cannot be decoded.
    /// - Return [`RemoteError::Request`] if the request itself fails.
    #[instrument(skip(self), level = "debug")]
    pub async fn list_code_directories(&self) -> Result<Vec<CodeDirectory>> {
        let url = format!("{}{}", self.origin, STUDIO_SERVICE_PATH);
        let builder = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "getAPIVersionReq": "" }));
        let response = self.send(builder, &Method::POST, &url).await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => return Err(RemoteError::Unauthorized),
            status if !status.is_success() => {
                return Err(RemoteError::UnexpectedStatus {
                    status: status.as_u16(),
                    url,
                })
            }
            _ => {}
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| request_error(&Method::POST, &url, source))?;
        let envelope: ApiVersionEnvelope = serde_json::from_slice(&body)?;
        let versions = envelope.response.versions;

        // Both spellings have been observed in the wild.
        let listing = if versions.lower.is_empty() {
            versions.upper
        } else {
            versions.lower
        };

        Ok(listing
            .into_iter()
            .filter_map(|version| {
                version.code_directory.map(|name| CodeDirectory {
                    name,
                    active: version.is_active,
                })
            })
            .collect())
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url)
    }

    // INVARIANT: Credentials are attached here, and only here.
    async fn send(&self, builder: RequestBuilder, method: &Method, url: &str) -> Result<Response> {
        let response = builder
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|source| request_error(method, url, source))?;
        debug!("{method} {url} -> {}", response.status());

        Ok(response)
    }

    async fn send_request(&self, method: Method, url: &str) -> Result<StatusCode> {
        let response = self.send(self.request(method.clone(), url), &method, url).await?;
        Ok(response.status())
    }

    async fn remove(&self, url: &str) -> Result<Removal> {
        Ok(match self.send_request(Method::DELETE, url).await? {
            StatusCode::UNAUTHORIZED => Removal::Unauthorized,
            StatusCode::NO_CONTENT => Removal::Deleted,
            status => Removal::Failed(status.as_u16()),
        })
    }
}

impl Debug for WebDavClient {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.debug_struct("WebDavClient")
            .field("origin", &self.origin)
            .field("code_directory", &self.code_directory)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RemoteClient for WebDavClient {
    async fn exists(&self, path: &str) -> Result<Existence> {
        let url = self.url(path);
        Ok(match self.send_request(Method::HEAD, &url).await? {
            StatusCode::UNAUTHORIZED => Existence::Unauthorized,
            StatusCode::NOT_FOUND => Existence::NotFound,
            status if status.is_success() => Existence::Found,
            status => {
                warn!("HEAD {url} answered {status}, treating it as existing");
                Existence::Found
            }
        })
    }

    async fn list_children(&self, path: &str) -> Result<Listing> {
        let url = self.url(path);
        let builder = self
            .request(self.propfind.clone(), &url)
            .header("Depth", "1")
            .body(PROPFIND_BODY);
        let response = self.send(builder, &self.propfind, &url).await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Ok(Listing::Unauthorized),
            StatusCode::NOT_FOUND => Ok(Listing::NotFound),
            StatusCode::MULTI_STATUS => {
                let body = response
                    .text()
                    .await
                    .map_err(|source| request_error(&self.propfind, &url, source))?;
                Ok(Listing::Entries(parse_entries(&body)?))
            }
            status => Ok(Listing::Failed(status.as_u16())),
        }
    }

    async fn make_directory(&self, path: &str) -> Result<Creation> {
        Ok(match self.send_request(self.mkcol.clone(), &self.url(path)).await? {
            StatusCode::UNAUTHORIZED => Creation::Unauthorized,
            StatusCode::CREATED => Creation::Created,
            status => Creation::Failed(status.as_u16()),
        })
    }

    async fn put_file(&self, path: &str, contents: Vec<u8>) -> Result<Upload> {
        let url = self.url(path);
        let builder = self.request(Method::PUT, &url).body(contents);
        let response = self.send(builder, &Method::PUT, &url).await?;

        Ok(upload_outcome(response.status()))
    }

    async fn put_local_file(&self, path: &str, local: &Path) -> Result<Upload> {
        let local_error = |source| RemoteError::LocalFile {
            path: local.to_path_buf(),
            source,
        };
        let file = tokio::fs::File::open(local).await.map_err(local_error)?;
        let length = file.metadata().await.map_err(local_error)?.len();

        let url = self.url(path);
        let builder = self
            .request(Method::PUT, &url)
            .header(CONTENT_LENGTH, length)
            .body(file);
        let response = self.send(builder, &Method::PUT, &url).await?;

        Ok(upload_outcome(response.status()))
    }

    async fn delete(&self, path: &str) -> Result<Removal> {
        self.remove(&self.url(path)).await
    }

    async fn delete_entry(&self, entry: &RemoteEntry) -> Result<Removal> {
        self.remove(&format!("{}{}", self.origin, entry.href())).await
    }

    async fn extract_archive(&self, path: &str) -> Result<Creation> {
        let url = self.url(path);
        let builder = self
            .request(Method::POST, &url)
            .form(&[("method", "UNZIP")]);
        let response = self.send(builder, &Method::POST, &url).await?;

        Ok(match response.status() {
            StatusCode::UNAUTHORIZED => Creation::Unauthorized,
            StatusCode::CREATED => Creation::Created,
            status => Creation::Failed(status.as_u16()),
        })
    }
}

/// Code directory as reported by the studio service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeDirectory {
    /// Name of the code directory.
    pub name: String,

    /// Whether this is the active code directory of the instance.
    pub active: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ApiVersionEnvelope {
    #[serde(rename = "getAPIVersionResp", default)]
    response: ApiVersionResponse,
}

#[derive(Debug, Default, Deserialize)]
struct ApiVersionResponse {
    #[serde(default)]
    versions: ApiVersions,
}

#[derive(Debug, Default, Deserialize)]
struct ApiVersions {
    #[serde(rename = "aPIVersion", default)]
    lower: Vec<ApiVersion>,

    #[serde(rename = "APIVersion", default)]
    upper: Vec<ApiVersion>,
}

#[derive(Debug, Deserialize)]
struct ApiVersion {
    #[serde(rename = "codeDirectory", default)]
    code_directory: Option<String>,

    #[serde(rename = "isActive", default)]
    is_active: bool,
}

fn upload_outcome(status: StatusCode) -> Upload {
    match status {
        StatusCode::UNAUTHORIZED => Upload::Unauthorized,
        StatusCode::CREATED => Upload::Created,
        StatusCode::NO_CONTENT => Upload::Replaced,
        status => Upload::Failed(status.as_u16()),
    }
}

fn extension_method(name: &str) -> Result<Method> {
    Method::from_bytes(name.as_bytes()).map_err(|_| RemoteError::InvalidMethod(name.into()))
}

fn request_error(method: &Method, url: &str, source: reqwest::Error) -> RemoteError {
    RemoteError::Request {
        method: method.to_string(),
        url: url.to_string(),
        source,
    }
}
