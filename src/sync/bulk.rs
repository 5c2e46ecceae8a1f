// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Clean project pipeline.
//!
//! Stages run strictly in this order:
//!
//! 1. Check the code directory, creating it if policy allows.
//! 2. List the code directory at depth one.
//! 3. Delete every listed entry except the first, one at a time.
//! 4. Pack all project folders into a temporary archive.
//! 5. Upload the archive into the code directory.
//! 6. Ask the server to unpack the archive.
//! 7. Delete the uploaded archive.
//!
//! The first failing stage ends the run. Effects of earlier stages are kept.

use crate::{
    remote::{Creation, Listing, RemoteClient, RemoteEntry, RemoteError, Removal, Upload},
    sync::{
        archive::{build_archive, ARCHIVE_NAME},
        Result, Stage, SyncError, Synchronizer,
    },
};

use std::path::Path;
use tracing::{info, warn};

impl<C> Synchronizer<C>
where
    C: RemoteClient,
{
    /// Run clean project pipeline. Caller must hold the target lock.
    pub(crate) async fn clean_project_locked(&self) -> Result<()> {
        self.ensure_code_directory().await?;

        let stale = self.list_stale_entries().await?;
        info!("delete {} entries from {}", stale.len(), self.profile.code_directory);
        for entry in &stale {
            self.delete_stale_entry(entry).await?;
        }

        // INVARIANT: Scratch directory lives until the end of the run, and is
        // removed on every exit path.
        let scratch = match &self.scratch_root {
            Some(root) => tempfile::tempdir_in(root),
            None => tempfile::tempdir(),
        }
        .map_err(SyncError::transport(Stage::BuildArchive))?;
        let archive_path = scratch.path().join(ARCHIVE_NAME);
        let summary = {
            let folders = self.folders.clone();
            let destination = archive_path.clone();
            tokio::task::spawn_blocking(move || build_archive(&folders, destination))
                .await
                .map_err(|error| SyncError::Unknown(error.to_string()))?
                .map_err(SyncError::transport(Stage::BuildArchive))?
        };

        let size = tokio::fs::metadata(&archive_path)
            .await
            .map_err(SyncError::transport(Stage::UploadArchive))?
            .len();
        info!(
            "upload archive of {} directories and {} files ({size} bytes)",
            summary.directories, summary.files,
        );
        self.upload_archive(&archive_path).await?;
        self.extract_archive().await?;
        self.delete_archive().await?;

        info!("code directory {} is clean", self.profile.code_directory);
        Ok(())
    }

    async fn list_stale_entries(&self) -> Result<Vec<RemoteEntry>> {
        let stage = Stage::ListChildren;
        let listing = match self.client.list_children("").await {
            Ok(listing) => listing,
            Err(error @ RemoteError::MalformedListing(_)) => {
                return Err(SyncError::ListingFailed {
                    stage,
                    status: Some(207),
                    source: Some(error),
                })
            }
            Err(error) => return Err(SyncError::transport(stage)(error)),
        };

        match listing {
            Listing::Entries(entries) => {
                let mut entries = entries.into_iter();

                // INVARIANT: The first entry is always the code directory
                // itself, and is never deleted.
                if let Some(first) = entries.next() {
                    let directory = urlencoding::encode(&self.profile.code_directory);
                    if !first.href().trim_end_matches('/').ends_with(directory.as_ref()) {
                        warn!(
                            "first listed entry {:?} does not look like the code directory, \
                             skipping it anyway",
                            first.href()
                        );
                    }
                }

                Ok(entries.collect())
            }
            Listing::NotFound => Ok(Vec::new()),
            Listing::Unauthorized => Err(SyncError::Unauthorized { stage }),
            Listing::Failed(status) => Err(SyncError::ListingFailed {
                stage,
                status: Some(status),
                source: None,
            }),
        }
    }

    async fn delete_stale_entry(&self, entry: &RemoteEntry) -> Result<()> {
        let stage = Stage::DeleteChild;
        let removal = self
            .client
            .delete_entry(entry)
            .await
            .map_err(SyncError::transport(stage))?;

        match removal {
            Removal::Deleted => Ok(()),
            Removal::Unauthorized => Err(SyncError::Unauthorized { stage }),
            Removal::Failed(status) => Err(SyncError::DeleteFailed {
                stage,
                target: entry.href().into(),
                status,
            }),
        }
    }

    async fn upload_archive(&self, archive_path: &Path) -> Result<()> {
        let stage = Stage::UploadArchive;
        let upload = self
            .client
            .put_local_file(ARCHIVE_NAME, archive_path)
            .await
            .map_err(SyncError::transport(stage))?;

        match upload {
            Upload::Created | Upload::Replaced => Ok(()),
            Upload::Unauthorized => Err(SyncError::Unauthorized { stage }),
            Upload::Failed(status) => Err(SyncError::UploadFailed {
                stage,
                path: ARCHIVE_NAME.into(),
                status,
            }),
        }
    }

    async fn extract_archive(&self) -> Result<()> {
        let stage = Stage::ExtractArchive;
        let creation = self
            .client
            .extract_archive(ARCHIVE_NAME)
            .await
            .map_err(SyncError::transport(stage))?;

        match creation {
            Creation::Created => Ok(()),
            Creation::Unauthorized => Err(SyncError::Unauthorized { stage }),
            Creation::Failed(status) => Err(SyncError::UploadFailed {
                stage,
                path: ARCHIVE_NAME.into(),
                status,
            }),
        }
    }

    async fn delete_archive(&self) -> Result<()> {
        let stage = Stage::DeleteArchive;
        let removal = self
            .client
            .delete(ARCHIVE_NAME)
            .await
            .map_err(SyncError::transport(stage))?;

        match removal {
            Removal::Deleted => Ok(()),
            Removal::Unauthorized => Err(SyncError::Unauthorized { stage }),
            Removal::Failed(status) => Err(SyncError::DeleteFailed {
                stage,
                target: ARCHIVE_NAME.into(),
                status,
            }),
        }
    }
}
