// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Synchronization pipelines.
//!
//! Cartsync keeps a remote code directory in line with the local project
//! folders through two pipelines:
//!
//! 1. __Clean project__ wipes every entry of the code directory, archives all
//!    project folders into one zip file, uploads it, and asks the server to
//!    unpack it in place.
//! 2. __Upload file__ pushes a single saved file, creating any missing parent
//!    directories on the way.
//!
//! # Failure Semantics
//!
//! Every stage is strictly sequential, and the first failing stage ends the
//! run. Nothing is retried, and nothing is rolled back. In particular, a clean
//! project run that fails after entries were deleted but before the archive
//! was unpacked leaves the code directory empty or partially populated. Each
//! failure is reported once, as one [`SyncError`] naming the [`Stage`] that
//! failed.
//!
//! # Serialization
//!
//! All pipelines against the same hostname and code directory are serialized
//! through one lock held for the whole run. See [`TargetLocks`].

pub mod archive;
pub mod bulk;
pub mod ensure;
pub mod incremental;
pub mod lock;

pub use archive::{build_archive, ArchiveSummary, ARCHIVE_NAME};
pub use lock::{RemoteTarget, TargetLocks};

use crate::{
    config::{ProjectFolder, ServerProfile},
    path::{normalize, PathError},
    remote::{RemoteClient, RemoteError},
};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Synchronizes local project folders with one remote code directory.
#[derive(Debug)]
pub struct Synchronizer<C>
where
    C: RemoteClient,
{
    pub(crate) client: C,
    pub(crate) profile: ServerProfile,
    pub(crate) folders: Vec<ProjectFolder>,
    pub(crate) scratch_root: Option<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl<C> Synchronizer<C>
where
    C: RemoteClient,
{
    /// Construct new synchronizer that serializes through the process-wide
    /// lock registry.
    pub fn new(client: C, profile: ServerProfile, folders: Vec<ProjectFolder>) -> Self {
        Self::with_locks(client, profile, folders, TargetLocks::global())
    }

    /// Construct new synchronizer that serializes through target registry.
    pub fn with_locks(
        client: C,
        profile: ServerProfile,
        folders: Vec<ProjectFolder>,
        locks: &TargetLocks,
    ) -> Self {
        let lock = locks.lock_for(&RemoteTarget::from(&profile));
        Self {
            client,
            profile,
            folders,
            scratch_root: None,
            lock,
        }
    }

    /// Build temporary archives under `root` instead of the system default
    /// temporary directory.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Remote client in use.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Server profile in use.
    pub fn profile(&self) -> &ServerProfile {
        &self.profile
    }

    /// Project folders in use.
    pub fn folders(&self) -> &[ProjectFolder] {
        &self.folders
    }

    /// Wipe the code directory and redeploy every project folder.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::Disabled`] if the project is disabled.
    /// - Return whichever [`SyncError`] the first failing stage raises.
    #[instrument(skip(self), level = "debug")]
    pub async fn clean_project(&self) -> Result<()> {
        self.check_enabled()?;
        let _guard = self.lock.lock().await;
        debug!("acquired lock for {}", self.profile.code_directory);
        self.clean_project_locked().await
    }

    /// Upload one saved file.
    ///
    /// The file is matched against the first project folder containing it.
    /// Returns the remote-relative path the file was uploaded to, or `None` if
    /// no project folder contains it.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::Disabled`] if the project is disabled.
    /// - Return whichever [`SyncError`] the first failing stage raises.
    #[instrument(skip(self, local), level = "debug")]
    pub async fn upload_file(&self, local: impl AsRef<Path>) -> Result<Option<String>> {
        self.check_enabled()?;
        let local = normalize(local);
        let local = local.as_path();
        let Some(folder) = self.matching_folder(local) else {
            info!("{} is not part of any project folder", local.display());
            return Ok(None);
        };

        let _guard = self.lock.lock().await;
        debug!("acquired lock for {}", self.profile.code_directory);
        self.upload_file_locked(local, folder).await.map(Some)
    }

    /// Guarantee that remote directory and all of its parents exist.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::VerifyCodeDirectoryMissing`] if the code directory
    ///   is missing and may not be created.
    /// - Return whichever [`SyncError`] the failing existence check or
    ///   creation raises.
    #[instrument(skip(self), level = "debug")]
    pub async fn ensure(&self, remote_dir: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.ensure_locked(remote_dir).await
    }

    fn check_enabled(&self) -> Result<()> {
        if self.profile.enabled {
            Ok(())
        } else {
            Err(SyncError::Disabled)
        }
    }
}

/// Pipeline that can be offloaded through [`run_pipeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pipeline {
    /// Wipe the code directory and redeploy every project folder.
    CleanProject,

    /// Upload one saved file.
    UploadFile(PathBuf),
}

impl Display for Pipeline {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::CleanProject => fmt.write_str("clean project"),
            Self::UploadFile(path) => write!(fmt, "upload {}", path.display()),
        }
    }
}

/// Successful end of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Code directory now mirrors the project folders.
    Cleaned,

    /// File was uploaded to target remote-relative path.
    Uploaded(String),

    /// File does not belong to any project folder, so nothing happened.
    NotInProject,
}

/// Receives start and stop notifications of pipelines.
pub trait SyncReporter: Send + Sync {
    /// Pipeline is about to start.
    fn started(&self, pipeline: &Pipeline);

    /// Pipeline came to an end, successfully or not.
    fn finished(&self, pipeline: &Pipeline, outcome: &Result<Completion>);
}

/// Run pipeline as its own task.
///
/// The reporter is told when the pipeline starts and when it stops, on every
/// exit path. A panicking pipeline is reported as [`SyncError::Unknown`].
pub async fn run_pipeline<C>(
    synchronizer: Arc<Synchronizer<C>>,
    pipeline: Pipeline,
    reporter: &dyn SyncReporter,
) -> Result<Completion>
where
    C: RemoteClient,
{
    reporter.started(&pipeline);

    let task = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            match pipeline {
                Pipeline::CleanProject => synchronizer
                    .clean_project()
                    .await
                    .map(|_| Completion::Cleaned),
                Pipeline::UploadFile(path) => synchronizer
                    .upload_file(&path)
                    .await
                    .map(|remote| remote.map_or(Completion::NotInProject, Completion::Uploaded)),
            }
        })
    };

    let outcome = match task.await {
        Ok(outcome) => outcome,
        Err(error) => Err(SyncError::Unknown(error.to_string())),
    };

    reporter.finished(&pipeline, &outcome);
    outcome
}

/// Describe pipeline outcome to the user.
pub fn describe(pipeline: &Pipeline, outcome: &Result<Completion>) -> String {
    match outcome {
        Ok(Completion::Cleaned) => "Project has been successfully cleaned!".into(),
        Ok(Completion::Uploaded(remote)) => format!("Uploaded {remote}"),
        Ok(Completion::NotInProject) => match pipeline {
            Pipeline::UploadFile(path) => {
                format!("Skipped {}, not part of any project folder", shorten_path(path))
            }
            Pipeline::CleanProject => "Nothing to do".into(),
        },
        Err(error) => error.user_message(pipeline),
    }
}

/// Named stage of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CheckRoot,
    CreateRoot,
    CheckDirectory,
    CreateDirectory,
    ListChildren,
    DeleteChild,
    BuildArchive,
    UploadArchive,
    ExtractArchive,
    DeleteArchive,
    TranslatePath,
    ReadFile,
    UploadFile,
}

impl Display for Stage {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(match self {
            Self::CheckRoot => "check code directory",
            Self::CreateRoot => "create code directory",
            Self::CheckDirectory => "check directory",
            Self::CreateDirectory => "create directory",
            Self::ListChildren => "list code directory",
            Self::DeleteChild => "delete entry",
            Self::BuildArchive => "build archive",
            Self::UploadArchive => "upload archive",
            Self::ExtractArchive => "extract archive",
            Self::DeleteArchive => "delete archive",
            Self::TranslatePath => "translate path",
            Self::ReadFile => "read file",
            Self::UploadFile => "upload file",
        })
    }
}

/// Plain category of a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Disabled,
    Unauthorized,
    VerifyCodeDirectoryMissing,
    DirectoryCreationFailed,
    ListingFailed,
    DeleteFailed,
    UploadFailed,
    TransportError,
    Unknown,
}

/// All possible error types for pipeline runs.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Synchronization is turned off for the project.
    #[error("synchronization is disabled for this project")]
    Disabled,

    /// Credentials were rejected.
    #[error("{stage}: invalid username or password")]
    Unauthorized { stage: Stage },

    /// Code directory is missing, and policy forbids creating it.
    #[error("code directory {directory:?} does not exist on the server")]
    VerifyCodeDirectoryMissing { directory: String },

    /// Directory creation did not answer with created.
    #[error("{stage}: failed to create remote directory {path:?} (status {status})")]
    DirectoryCreationFailed {
        stage: Stage,
        path: String,
        status: u16,
    },

    /// Listing did not answer with multi-status, or its body is malformed.
    #[error("{stage}: failed to list code directory (status {status:?})")]
    ListingFailed {
        stage: Stage,
        status: Option<u16>,
        #[source]
        source: Option<RemoteError>,
    },

    /// Deletion did not answer with no content.
    #[error("{stage}: failed to delete remote entry {target:?} (status {status})")]
    DeleteFailed {
        stage: Stage,
        target: String,
        status: u16,
    },

    /// Upload or extraction did not answer with the expected status.
    #[error("{stage}: failed to upload {path:?} (status {status})")]
    UploadFailed {
        stage: Stage,
        path: String,
        status: u16,
    },

    /// Network or local I/O failure.
    #[error("{stage}: transport failure")]
    Transport {
        stage: Stage,
        #[source]
        source: TransportError,
    },

    /// Anything else, e.g., a panicking pipeline task.
    #[error("unknown failure: {0}")]
    Unknown(String),
}

impl SyncError {
    /// Wrap transport failure of target stage.
    pub(crate) fn transport<E>(stage: Stage) -> impl FnOnce(E) -> Self
    where
        E: Into<TransportError>,
    {
        move |error| Self::Transport {
            stage,
            source: error.into(),
        }
    }

    /// Plain category of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Disabled => ErrorKind::Disabled,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::VerifyCodeDirectoryMissing { .. } => ErrorKind::VerifyCodeDirectoryMissing,
            Self::DirectoryCreationFailed { .. } => ErrorKind::DirectoryCreationFailed,
            Self::ListingFailed { .. } => ErrorKind::ListingFailed,
            Self::DeleteFailed { .. } => ErrorKind::DeleteFailed,
            Self::UploadFailed { .. } => ErrorKind::UploadFailed,
            Self::Transport { .. } => ErrorKind::TransportError,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Stage the error was raised in, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Unauthorized { stage }
            | Self::DirectoryCreationFailed { stage, .. }
            | Self::ListingFailed { stage, .. }
            | Self::DeleteFailed { stage, .. }
            | Self::UploadFailed { stage, .. }
            | Self::Transport { stage, .. } => Some(*stage),
            Self::VerifyCodeDirectoryMissing { .. } => Some(Stage::CheckRoot),
            Self::Disabled | Self::Unknown(_) => None,
        }
    }

    /// User-readable message for failed pipeline.
    pub fn user_message(&self, pipeline: &Pipeline) -> String {
        match self.kind() {
            ErrorKind::Disabled => "Synchronization is not enabled for this project!".into(),
            ErrorKind::Unauthorized => "Invalid username or password!".into(),
            ErrorKind::VerifyCodeDirectoryMissing => {
                "Code directory does not exist on the server!".into()
            }
            ErrorKind::DirectoryCreationFailed
            | ErrorKind::ListingFailed
            | ErrorKind::DeleteFailed
            | ErrorKind::UploadFailed
            | ErrorKind::TransportError => match pipeline {
                Pipeline::CleanProject => "Error cleaning project!".into(),
                Pipeline::UploadFile(path) => format!("Error uploading {}!", shorten_path(path)),
            },
            ErrorKind::Unknown => "Unknown error!".into(),
        }
    }
}

/// Failure causes below the HTTP status level.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Archive(#[from] zip::result::ZipError),

    #[error(transparent)]
    Path(#[from] PathError),
}

// INVARIANT: Keep at most 64 characters, preferring the tail of the path.
fn shorten_path(path: &Path) -> String {
    let path = path.display().to_string();
    let count = path.chars().count();
    if count <= 64 {
        return path;
    }

    let tail = path.chars().skip(count - 61).collect::<String>();
    format!("...{tail}")
}

/// Friendly result alias :3
pub type Result<T, E = SyncError> = std::result::Result<T, E>;
