// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Per-target pipeline serialization.

use crate::config::ServerProfile;

use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::{Arc, LazyLock},
};

/// Remote root addressed by a hostname and code directory pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteTarget {
    hostname: String,
    code_directory: String,
}

impl RemoteTarget {
    /// Construct new remote target.
    pub fn new(hostname: impl AsRef<str>, code_directory: impl Into<String>) -> Self {
        Self {
            hostname: hostname.as_ref().to_ascii_lowercase(),
            code_directory: code_directory.into(),
        }
    }
}

impl From<&ServerProfile> for RemoteTarget {
    fn from(profile: &ServerProfile) -> Self {
        Self::new(&profile.hostname, profile.code_directory.clone())
    }
}

/// Registry of pipeline locks, one per remote target.
#[derive(Debug, Default)]
pub struct TargetLocks {
    locks: Mutex<HashMap<RemoteTarget, Arc<tokio::sync::Mutex<()>>>>,
}

impl TargetLocks {
    /// Construct new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry.
    pub fn global() -> &'static TargetLocks {
        static GLOBAL: LazyLock<TargetLocks> = LazyLock::new(TargetLocks::new);
        &GLOBAL
    }

    /// Lock shared by every pipeline against target.
    pub fn lock_for(&self, target: &RemoteTarget) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.locks.lock().entry(target.clone()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_target_shares_lock() {
        let locks = TargetLocks::new();
        let a = locks.lock_for(&RemoteTarget::new("Dev01.example.com", "version1"));
        let b = locks.lock_for(&RemoteTarget::new("dev01.example.com", "version1"));
        let c = locks.lock_for(&RemoteTarget::new("dev01.example.com", "version2"));

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn guard_released_on_error_path() {
        let locks = TargetLocks::new();
        let target = RemoteTarget::new("dev01.example.com", "version1");

        let failing = async {
            let _guard = locks.lock_for(&target).lock_owned().await;
            Err::<(), _>("stage failed")
        };
        assert!(failing.await.is_err());

        let lock = locks.lock_for(&target);
        assert!(lock.try_lock().is_ok());
    }
}
