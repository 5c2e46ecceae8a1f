// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Keep a remote cartridge code directory in sync with local project folders.
//!
//! A __code directory__ is the remote root under which deployable source lives
//! on an instance. It is exposed over a WebDAV-like HTTPS interface. Cartsync
//! offers two ways to keep it up to date:
//!
//! - __Clean project__ wipes the code directory, and redeploys every project
//!   folder through one archive that the server unpacks in place.
//! - __Upload file__ overwrites a single remote file after a local save.
//!
//! # See Also
//!
//! 1. [`Synchronizer`]
//! 2. [`ProjectConfig`]

pub mod config;
pub mod path;
pub mod remote;
pub mod sync;

pub use config::{ProjectConfig, ProjectFolder, ServerProfile, SyncSettings};
pub use remote::{RemoteClient, WebDavClient};
pub use sync::{run_pipeline, Completion, Pipeline, SyncError, SyncReporter, Synchronizer};
