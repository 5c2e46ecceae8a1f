// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Remote directory creation.
//!
//! Only the code directory itself is guarded by the verification policy.
//! Directories beneath it are always created on demand.

use crate::{
    remote::{Creation, Existence, RemoteClient},
    sync::{Result, Stage, SyncError, Synchronizer},
};

use tracing::{debug, info};

impl<C> Synchronizer<C>
where
    C: RemoteClient,
{
    /// Guarantee that the code directory exists.
    ///
    /// Creates the code directory if it is missing, unless the verification
    /// policy is enabled.
    pub(crate) async fn ensure_code_directory(&self) -> Result<()> {
        let existence = self
            .client
            .exists("")
            .await
            .map_err(SyncError::transport(Stage::CheckRoot))?;

        match existence {
            Existence::Found => Ok(()),
            Existence::Unauthorized => Err(SyncError::Unauthorized {
                stage: Stage::CheckRoot,
            }),
            Existence::NotFound if self.profile.verify_code_directory => {
                Err(SyncError::VerifyCodeDirectoryMissing {
                    directory: self.profile.code_directory.clone(),
                })
            }
            Existence::NotFound => {
                info!("create code directory {}", self.profile.code_directory);
                self.create_directory("", Stage::CreateRoot).await
            }
        }
    }

    /// Guarantee that remote directory and all of its parents exist.
    ///
    /// Caller must hold the target lock.
    pub(crate) async fn ensure_locked(&self, remote_dir: &str) -> Result<()> {
        self.ensure_code_directory().await?;

        let mut prefix = String::new();
        for segment in remote_dir.split('/').filter(|segment| !segment.is_empty()) {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);

            let existence = self
                .client
                .exists(&prefix)
                .await
                .map_err(SyncError::transport(Stage::CheckDirectory))?;

            match existence {
                Existence::Found => debug!("{prefix} exists"),
                Existence::Unauthorized => {
                    return Err(SyncError::Unauthorized {
                        stage: Stage::CheckDirectory,
                    })
                }
                Existence::NotFound => {
                    info!("create directory {prefix}");
                    self.create_directory(&prefix, Stage::CreateDirectory).await?;
                }
            }
        }

        Ok(())
    }

    async fn create_directory(&self, path: &str, stage: Stage) -> Result<()> {
        let creation = self
            .client
            .make_directory(path)
            .await
            .map_err(SyncError::transport(stage))?;

        match creation {
            Creation::Created => Ok(()),
            Creation::Unauthorized => Err(SyncError::Unauthorized { stage }),
            Creation::Failed(status) => Err(SyncError::DirectoryCreationFailed {
                stage,
                path: path.into(),
                status,
            }),
        }
    }
}
