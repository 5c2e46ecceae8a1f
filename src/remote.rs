// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Remote code directory access.
//!
//! The code directory of an instance is exposed over a WebDAV-like HTTPS
//! interface. Every request carries basic credentials, and every response is
//! normalized into a small outcome vocabulary per operation. Anything that
//! goes wrong below the HTTP status level, e.g., timeouts, refused
//! connections, malformed bodies, is surfaced as a [`RemoteError`].
//!
//! # Remote Paths
//!
//! All operations take __remote-relative__ paths, i.e., paths relative to the
//! code directory with no leading or trailing slash. The empty path names the
//! code directory itself. Implementations are responsible for percent-encoding
//! path segments.
//!
//! # See Also
//!
//! 1. [`to_remote_relative`](crate::path::to_remote_relative)
//! 2. [`WebDavClient`]

pub mod multistatus;
pub mod webdav;

pub use webdav::{CodeDirectory, WebDavClient};

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Outcome of an existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    Found,
    NotFound,
    Unauthorized,
}

/// Outcome of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    /// Entries in the order the server returned them, self-reference first.
    Entries(Vec<RemoteEntry>),
    NotFound,
    Unauthorized,
    Failed(u16),
}

/// Outcome of an operation that creates something remotely, i.e., directory
/// creation and remote archive extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Creation {
    Created,
    Unauthorized,
    Failed(u16),
}

/// Outcome of a file upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upload {
    Created,
    Replaced,
    Unauthorized,
    Failed(u16),
}

/// Outcome of a removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Deleted,
    Unauthorized,
    Failed(u16),
}

/// Entry of a directory listing.
///
/// Holds the `href` exactly as the server reported it. Only used to drive
/// deletion, never retained afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteEntry {
    href: String,
}

impl RemoteEntry {
    /// Construct new remote entry.
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }

    /// Server-reported reference of the entry.
    pub fn href(&self) -> &str {
        &self.href
    }
}

/// Layer of indirection for code directory access.
#[async_trait]
pub trait RemoteClient: Send + Sync + 'static {
    /// Check if remote path exists.
    async fn exists(&self, path: &str) -> Result<Existence>;

    /// List remote directory at depth one.
    async fn list_children(&self, path: &str) -> Result<Listing>;

    /// Create remote directory.
    async fn make_directory(&self, path: &str) -> Result<Creation>;

    /// Upload file contents, replacing any previous contents.
    async fn put_file(&self, path: &str, contents: Vec<u8>) -> Result<Upload>;

    /// Upload contents of a local file without buffering it in memory.
    async fn put_local_file(&self, path: &str, local: &Path) -> Result<Upload>;

    /// Delete remote path.
    async fn delete(&self, path: &str) -> Result<Removal>;

    /// Delete entry reported by a previous listing.
    async fn delete_entry(&self, entry: &RemoteEntry) -> Result<Removal>;

    /// Ask the server to unpack a previously uploaded archive in place.
    async fn extract_archive(&self, path: &str) -> Result<Creation>;
}

/// Remote access error types.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Request could not be built, sent, or its response read.
    #[error("{method} {url} failed")]
    Request {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// HTTP client could not be configured.
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    /// Multi-status body is not well-formed.
    #[error("malformed multi-status response")]
    MalformedListing(#[from] roxmltree::Error),

    /// JSON body is not well-formed.
    #[error("malformed JSON response")]
    MalformedJson(#[from] serde_json::Error),

    /// Credentials were rejected outside of a pipeline operation.
    #[error("invalid username or password")]
    Unauthorized,

    /// Status not covered by the operation's outcome vocabulary.
    #[error("unexpected response status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// Local file to upload could not be opened.
    #[error("failed to open local file {path:?}")]
    LocalFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Extended method name could not be constructed.
    #[error("invalid request method {0:?}")]
    InvalidMethod(String),
}

/// Friendly result alias :3
pub type Result<T, E = RemoteError> = std::result::Result<T, E>;
