// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Upload file pipeline.
//!
//! A blind overwrite of one remote file. Nothing is archived, deleted, or
//! compared against previous contents.

use crate::{
    config::ProjectFolder,
    path::{remote_parent, to_remote_relative},
    remote::{RemoteClient, Upload},
    sync::{Result, Stage, SyncError, Synchronizer},
};

use std::path::Path;
use tracing::info;

impl<C> Synchronizer<C>
where
    C: RemoteClient,
{
    /// First project folder containing target local path.
    pub fn matching_folder(&self, local: impl AsRef<Path>) -> Option<&ProjectFolder> {
        self.folders
            .iter()
            .find(|folder| folder.contains(local.as_ref()))
    }

    /// Run upload file pipeline. Caller must hold the target lock.
    pub(crate) async fn upload_file_locked(
        &self,
        local: &Path,
        folder: &ProjectFolder,
    ) -> Result<String> {
        let remote = to_remote_relative(local, folder.as_path())
            .map_err(SyncError::transport(Stage::TranslatePath))?;
        self.ensure_locked(remote_parent(&remote)).await?;

        let contents = tokio::fs::read(local)
            .await
            .map_err(SyncError::transport(Stage::ReadFile))?;

        let stage = Stage::UploadFile;
        let upload = self
            .client
            .put_file(&remote, contents)
            .await
            .map_err(SyncError::transport(stage))?;

        match upload {
            Upload::Created | Upload::Replaced => {
                info!("uploaded {} to {remote}", local.display());
                Ok(remote)
            }
            Upload::Unauthorized => Err(SyncError::Unauthorized { stage }),
            Upload::Failed(status) => Err(SyncError::UploadFailed {
                stage,
                path: remote,
                status,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        config::ProjectFolder,
        sync::{
            tests::{synchronizer, Call, FakeRemote},
            ErrorKind, Stage, SyncError,
        },
    };

    use pretty_assertions::assert_eq;
    use std::{fs, sync::Arc};

    fn project() -> anyhow::Result<(tempfile::TempDir, ProjectFolder)> {
        let work = tempfile::tempdir()?;
        let project = work.path().join("project");
        fs::create_dir_all(project.join("cartridge/templates/default"))?;
        fs::write(project.join("cartridge/templates/default/x.isml"), "<isif/>")?;
        fs::write(project.join("cartridge/templates/default/y.isml"), "<iselse/>")?;
        Ok((work, ProjectFolder::new(project)))
    }

    #[tokio::test]
    async fn upload_into_translated_path() -> anyhow::Result<()> {
        let (_work, folder) = project()?;
        let local = folder.as_path().join("cartridge/templates/default/x.isml");
        let sync = synchronizer(FakeRemote::with_root(), true, vec![folder]);

        let result = sync.upload_file(&local).await?;
        assert_eq!(
            result.as_deref(),
            Some("project/cartridge/templates/default/x.isml")
        );
        assert_eq!(
            sync.client().creations(),
            vec![
                "project".to_string(),
                "project/cartridge".to_string(),
                "project/cartridge/templates".to_string(),
                "project/cartridge/templates/default".to_string(),
            ]
        );
        assert_eq!(
            sync.client().calls().last(),
            Some(&Call::Put("project/cartridge/templates/default/x.isml".into()))
        );
        assert_eq!(
            sync.client()
                .files
                .lock()
                .get("project/cartridge/templates/default/x.isml")
                .cloned(),
            Some(b"<isif/>".to_vec())
        );

        Ok(())
    }

    #[tokio::test]
    async fn overwrite_counts_as_success() -> anyhow::Result<()> {
        let (_work, folder) = project()?;
        let local = folder.as_path().join("cartridge/templates/default/x.isml");
        let sync = synchronizer(FakeRemote::with_root(), true, vec![folder]);

        sync.upload_file(&local).await?;
        let result = sync.upload_file(&local).await?;
        assert!(result.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn first_matching_folder_wins() -> anyhow::Result<()> {
        let (_work, folder) = project()?;
        let local = folder.as_path().join("cartridge/templates/default/x.isml");
        let inner = ProjectFolder::new(folder.as_path().join("cartridge"));
        let sync = synchronizer(FakeRemote::with_root(), true, vec![inner, folder]);

        let result = sync.upload_file(&local).await?;
        assert_eq!(result.as_deref(), Some("cartridge/templates/default/x.isml"));

        Ok(())
    }

    #[tokio::test]
    async fn unknown_file_is_skipped() -> anyhow::Result<()> {
        let (work, folder) = project()?;
        let sync = synchronizer(FakeRemote::with_root(), true, vec![folder]);

        let result = sync.upload_file(work.path().join("stray.js")).await?;
        assert_eq!(result, None);
        assert_eq!(sync.client().calls(), vec![]);

        Ok(())
    }

    #[tokio::test]
    async fn parent_segments_never_reach_remote_path() -> anyhow::Result<()> {
        let (work, folder) = project()?;
        fs::write(work.path().join("secret.js"), "leak")?;
        let sync = synchronizer(FakeRemote::with_root(), true, vec![folder.clone()]);

        let result = sync.upload_file(folder.as_path().join("../secret.js")).await?;
        assert_eq!(result, None);
        assert_eq!(sync.client().calls(), vec![]);

        let local = folder
            .as_path()
            .join("cartridge/./templates/../templates/default/x.isml");
        let result = sync.upload_file(&local).await?;
        assert_eq!(
            result.as_deref(),
            Some("project/cartridge/templates/default/x.isml")
        );

        Ok(())
    }

    #[tokio::test]
    async fn strict_policy_applies_to_uploads() -> anyhow::Result<()> {
        let (_work, folder) = project()?;
        let local = folder.as_path().join("cartridge/templates/default/x.isml");
        let sync = synchronizer(FakeRemote::default(), true, vec![folder]);

        let result = sync.upload_file(&local).await;
        assert_eq!(
            result.map_err(|error| error.kind()),
            Err(ErrorKind::VerifyCodeDirectoryMissing)
        );
        assert_eq!(sync.client().creations(), Vec::<String>::new());

        Ok(())
    }

    #[tokio::test]
    async fn rejected_upload() -> anyhow::Result<()> {
        let (_work, folder) = project()?;
        let local = folder.as_path().join("cartridge/templates/default/x.isml");
        let remote = FakeRemote {
            put_status: Some(500),
            ..FakeRemote::with_root()
        };
        let sync = synchronizer(remote, true, vec![folder]);

        let result = sync.upload_file(&local).await;
        assert!(matches!(
            result,
            Err(SyncError::UploadFailed {
                stage: Stage::UploadFile,
                status: 500,
                ..
            })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn unreadable_file_is_a_transport_error() -> anyhow::Result<()> {
        let (_work, folder) = project()?;
        let local = folder.as_path().join("cartridge/templates/default/gone.isml");
        let sync = synchronizer(FakeRemote::with_root(), true, vec![folder]);

        let result = sync.upload_file(&local).await;
        assert!(matches!(
            result,
            Err(SyncError::Transport {
                stage: Stage::ReadFile,
                ..
            })
        ));
        assert!(!sync
            .client()
            .calls()
            .iter()
            .any(|call| matches!(call, Call::Put(_))));

        Ok(())
    }

    #[tokio::test]
    async fn concurrent_uploads_do_not_interleave() -> anyhow::Result<()> {
        let (_work, folder) = project()?;
        let x = folder.as_path().join("cartridge/templates/default/x.isml");
        let y = folder.as_path().join("cartridge/templates/default/y.isml");
        let remote = FakeRemote {
            yield_between_calls: true,
            ..FakeRemote::with_root()
        };
        let sync = Arc::new(synchronizer(remote, true, vec![folder]));

        let (first, second) = tokio::join!(sync.upload_file(&x), sync.upload_file(&y));
        first?;
        second?;

        // Each run ends with its own upload, so a run's calls must all appear
        // before the next run's first call.
        let calls = sync.client().calls();
        let split = calls
            .iter()
            .position(|call| matches!(call, Call::Put(_)))
            .expect("an upload happened")
            + 1;
        let (run_a, run_b) = calls.split_at(split);
        assert_eq!(run_a.first(), Some(&Call::Exists("".into())));
        assert_eq!(run_b.first(), Some(&Call::Exists("".into())));
        assert!(matches!(run_b.last(), Some(Call::Put(_))));
        assert_eq!(
            run_b.iter().filter(|call| matches!(call, Call::Put(_))).count(),
            1
        );

        // The second run finds every directory already created by the first.
        assert!(!run_b
            .iter()
            .any(|call| matches!(call, Call::MakeDirectory(_))));
        assert_eq!(sync.client().creations().len(), 4);

        Ok(())
    }
}
