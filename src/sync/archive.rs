// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Project archive construction.
//!
//! All project folders are packed into one zip file whose entry names are the
//! remote-relative paths of the packed files and directories. Directories are
//! stored, files are deflated.

use crate::{
    config::ProjectFolder,
    path::to_remote_relative,
    sync::TransportError,
};

use std::{fs::File, io, path::Path};
use tracing::{debug, instrument};
use walkdir::WalkDir;
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

/// Name of the archive inside the code directory.
pub const ARCHIVE_NAME: &str = "cartsync_project.zip";

/// Number of entries written into an archive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub directories: usize,
    pub files: usize,
}

/// Pack every project folder into a zip file at `destination`.
///
/// Symbolic links to files are packed by content. Symbolic links to
/// directories are not followed.
///
/// # Errors
///
/// - Return [`TransportError::Walk`] if a folder cannot be traversed.
/// - Return [`TransportError::Io`] if a file cannot be read or written.
/// - Return [`TransportError::Archive`] if the zip file cannot be written.
/// - Return [`TransportError::Path`] if an entry cannot be named.
#[instrument(skip(folders, destination), level = "debug")]
pub fn build_archive(
    folders: &[ProjectFolder],
    destination: impl AsRef<Path>,
) -> Result<ArchiveSummary, TransportError> {
    let mut writer = ZipWriter::new(File::create(destination.as_ref())?);
    let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut summary = ArchiveSummary::default();

    for folder in folders {
        debug!("pack {folder}");
        for entry in WalkDir::new(folder.as_path()).sort_by_file_name() {
            let entry = entry?;
            let name = to_remote_relative(entry.path(), folder.as_path())?;

            if entry.file_type().is_dir() {
                writer.add_directory(name, stored)?;
                summary.directories += 1;
            } else if entry.path().is_file() {
                writer.start_file(name, deflated)?;
                io::copy(&mut File::open(entry.path())?, &mut writer)?;
                summary.files += 1;
            } else {
                debug!("skip {}", entry.path().display());
            }
        }
    }

    writer.finish()?;
    Ok(summary)
}
