// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout for configuration files that cartsync uses to simplify
//! the process of serialization and deserialization. File I/O is kept to thin
//! load and save helpers.
//!
//! # Configuration Layers
//!
//! Cartsync reads two files. The __project file__ describes which server to
//! talk to, which code directory to target, and which local folders take part
//! in the project. The __settings file__ is global to the user, and controls
//! transport policy, i.e., whether TLS certificates are verified and whether
//! the code directory must already exist on the server.

use crate::path::{normalize, resolve_folder_root};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Debug, Display, Error as FmtError, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Project file layout.
///
/// # General Layout
///
/// A project file is composed of two basic parts: the server section and the
/// folder listing. The server section specifies the host, credentials, and
/// target code directory. The folder listing names every local root that gets
/// deployed. Each folder becomes a top-level entry under the code directory.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ProjectConfig {
    /// Server to synchronize with.
    pub server: ServerSection,

    /// Local folders that belong to the project.
    #[serde(rename = "folder", default)]
    pub folders: Vec<FolderEntry>,
}

impl ProjectConfig {
    /// Load project file from target path.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Io`] if file cannot be read.
    /// - Return [`ConfigError::Deserialize`] if file is not a valid layout.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        data.parse()
    }

    /// Write project file to target path.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Io`] if file cannot be written.
    /// - Return [`ConfigError::Serialize`] if layout cannot be serialized.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = toml::to_string_pretty(self)?;
        fs::write(path, data).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve folder listing into absolute project folders.
    ///
    /// Relative folder paths are resolved against `base`, which should be the
    /// directory holding the project file.
    pub fn project_folders(&self, base: impl AsRef<Path>) -> Vec<ProjectFolder> {
        self.folders
            .iter()
            .map(|folder| ProjectFolder::new(resolve_folder_root(&folder.path, base.as_ref())))
            .collect()
    }
}

impl FromStr for ProjectConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: ProjectConfig = toml::from_str(data)?;

        // INVARIANT: Perform shell expansion on every folder path.
        for folder in &mut config.folders {
            folder.path = PathBuf::from(
                shellexpand::full(folder.path.to_string_lossy().as_ref())?.into_owned(),
            );
        }

        Ok(config)
    }
}

impl Display for ProjectConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Server section of project file.
#[derive(Default, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ServerSection {
    /// Hostname of the instance, e.g., "dev01.example.com".
    pub hostname: String,

    /// Account name used for basic authentication.
    pub username: String,

    /// Account password. Prompted for at run time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Name of the code directory to deploy into.
    pub directory: String,

    /// Whether synchronization is enabled for this project.
    #[serde(default)]
    pub enabled: bool,
}

impl Debug for ServerSection {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.debug_struct("ServerSection")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("directory", &self.directory)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Folder entry of project file.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct FolderEntry {
    /// Absolute path, or path relative to the project file's directory.
    pub path: PathBuf,
}

/// Global synchronization settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Verify TLS certificates presented by the server.
    pub verify_ssl_certificates: bool,

    /// Refuse to create the code directory when it is missing on the server.
    pub verify_code_directory: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            verify_ssl_certificates: true,
            verify_code_directory: true,
        }
    }
}

impl SyncSettings {
    /// Load settings from target path, or use defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Io`] if file exists but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if file is not a valid layout.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        data.parse()
    }
}

impl FromStr for SyncSettings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(data)?)
    }
}

/// Everything needed to address and authenticate against one remote root.
///
/// Immutable for the duration of a synchronization run.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerProfile {
    pub hostname: String,
    pub username: String,
    pub password: String,
    pub code_directory: String,
    pub enabled: bool,
    pub verify_ssl: bool,
    pub verify_code_directory: bool,
}

impl ServerProfile {
    /// Assemble profile from server section, resolved password, and settings.
    pub fn new(
        server: &ServerSection,
        password: impl Into<String>,
        settings: &SyncSettings,
    ) -> Self {
        Self {
            hostname: server.hostname.clone(),
            username: server.username.clone(),
            password: password.into(),
            code_directory: server.directory.clone(),
            enabled: server.enabled,
            verify_ssl: settings.verify_ssl_certificates,
            verify_code_directory: settings.verify_code_directory,
        }
    }
}

impl Debug for ServerProfile {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.debug_struct("ServerProfile")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("code_directory", &self.code_directory)
            .field("enabled", &self.enabled)
            .field("verify_ssl", &self.verify_ssl)
            .field("verify_code_directory", &self.verify_code_directory)
            .finish_non_exhaustive()
    }
}

/// Local root directory taking part in the project.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ProjectFolder(PathBuf);

impl ProjectFolder {
    /// Construct new project folder from lexically [normalized](normalize)
    /// path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self(normalize(path))
    }

    /// Treat project folder as [`Path`] slice.
    pub fn as_path(&self) -> &Path {
        self.0.as_path()
    }

    /// Check if target path lives under this folder, once `.` and `..`
    /// components are resolved.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        normalize(path).starts_with(&self.0)
    }
}

impl Display for ProjectFolder {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_path().to_string_lossy().as_ref())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Failed to read or write configuration file.
    #[error("failed to access configuration file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
