// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Translate local file system paths into __remote-relative__ paths, and
//! determine default locations of configuration files.
//!
//! # Remote-Relative Paths
//!
//! A remote-relative path names an entry under the code directory. It always
//! uses forward slashes, and never begins or ends with one. The first segment
//! of a remote-relative path is the base name of the project folder it came
//! from, so each project folder becomes a top-level entry of the code
//! directory.

use std::path::{Component, Path, PathBuf};

/// Default file name of a project file.
pub const PROJECT_FILE_NAME: &str = "cartsync.toml";

/// Translate local path into remote-relative path.
///
/// The path is taken relative to the __parent__ of `folder_root`, such that
/// the base name of `folder_root` becomes the first segment. Platform path
/// separators are replaced by `/`.
///
/// # Errors
///
/// - Return [`PathError::OutsideFolder`] if `local` does not live under
///   `folder_root`.
/// - Return [`PathError::NoBaseName`] if `folder_root` has no base name.
pub fn to_remote_relative(
    local: impl AsRef<Path>,
    folder_root: impl AsRef<Path>,
) -> Result<String> {
    let local = normalize(local);
    let folder_root = normalize(folder_root);
    let (local, folder_root) = (local.as_path(), folder_root.as_path());

    if !local.starts_with(folder_root) {
        return Err(PathError::OutsideFolder {
            path: local.to_path_buf(),
            folder: folder_root.to_path_buf(),
        });
    }

    if folder_root.file_name().is_none() {
        return Err(PathError::NoBaseName(folder_root.to_path_buf()));
    }

    let parent = folder_root.parent().unwrap_or_else(|| Path::new(""));
    let relative = local.strip_prefix(parent).unwrap_or(local);

    // INVARIANT: Only normal components make it into the remote path, so no
    // leading or trailing separator can ever appear.
    let segments = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>();

    Ok(segments.join("/"))
}

/// Lexically normalize a path.
///
/// Drops `.` components, and lets each `..` consume the component before it.
/// A `..` directly under the root is dropped. Leading `..` of a relative path
/// are kept. Symbolic links are not resolved, and the file system is never
/// touched.
pub fn normalize(path: impl AsRef<Path>) -> PathBuf {
    let mut normal = PathBuf::new();
    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normal.components().next_back() {
                Some(Component::Normal(_)) => {
                    normal.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normal.push(Component::ParentDir),
            },
            other => normal.push(other),
        }
    }

    normal
}

/// Percent-encode each segment of a remote-relative path for use in a URL.
///
/// Separators are kept as-is.
pub fn encode_remote_path(remote: &str) -> String {
    remote
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Determine parent of a remote-relative path.
///
/// Returns an empty string for top-level entries.
pub fn remote_parent(remote: &str) -> &str {
    remote
        .trim_matches('/')
        .rsplit_once('/')
        .map(|(parent, _)| parent)
        .unwrap_or("")
}

/// Resolve folder root as configured in a project file.
///
/// Relative roots are resolved against `base`, the directory containing the
/// project file. The result is always [normalized](normalize).
pub fn resolve_folder_root(root: impl AsRef<Path>, base: impl AsRef<Path>) -> PathBuf {
    let root = root.as_ref();
    if root.is_absolute() {
        normalize(root)
    } else {
        normalize(base.as_ref().join(root))
    }
}

/// Determine default absolute path to global settings file.
///
/// Uses `$XDG_CONFIG_HOME/cartsync/settings.toml`. Does not check if the path
/// returned actually exists.
///
/// # Errors
///
/// - Return [`PathError::NoConfigDir`] if configuration directory cannot be
///   determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_settings_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("cartsync").join("settings.toml"))
        .ok_or(PathError::NoConfigDir)
}

/// Path translation error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum PathError {
    /// Local path is not inside the project folder.
    #[error("path {path:?} is not inside project folder {folder:?}")]
    OutsideFolder { path: PathBuf, folder: PathBuf },

    /// Project folder root has no base name to use as first remote segment.
    #[error("project folder {0:?} has no base name")]
    NoBaseName(PathBuf),

    /// User configuration directory cannot be determined.
    #[error("cannot determine absolute path to user's configuration directory")]
    NoConfigDir,
}

/// Friendly result alias :3
pub type Result<T, E = PathError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    #[test_case("/work/project/cartridge/templates/default/x.isml", "/work/project", "project/cartridge/templates/default/x.isml"; "nested file")]
    #[test_case("/work/project", "/work/project", "project"; "folder root itself")]
    #[test_case("/work/project/cartridge/", "/work/project", "project/cartridge"; "trailing separator")]
    #[test_case("/work/project/a b/c.js", "/work/project/", "project/a b/c.js"; "root with trailing separator")]
    #[test_case("/project/x.js", "/project", "project/x.js"; "root directly under file system root")]
    #[test_case("/work/project/./cartridge/../x.js", "/work/project", "project/x.js"; "dot segments inside folder")]
    #[test_case("/work/other/../project/x.js", "/work/project", "project/x.js"; "dot segments before folder")]
    #[test_case("/work/project/x.js", "/work/tmp/../project", "project/x.js"; "dot segments in root")]
    #[test]
    fn translate_local_path(local: &str, root: &str, expect: &str) {
        let result = to_remote_relative(local, root).unwrap();
        pretty_assertions::assert_eq!(result, expect);
        assert!(!result.starts_with('/'));
        assert!(!result.ends_with('/'));
        assert!(!result.contains('\\'));
    }

    #[test]
    fn translate_rejects_foreign_paths() {
        let result = to_remote_relative("/work/other/x.js", "/work/project");
        assert!(matches!(result, Err(PathError::OutsideFolder { .. })));

        let result = to_remote_relative("/work/project2/x.js", "/work/project");
        assert!(matches!(result, Err(PathError::OutsideFolder { .. })));
    }

    #[test_case("/work/app/../secret/x.js", "/work/app"; "parent escape")]
    #[test_case("/work/app/cartridge/../../secret/x.js", "/work/app"; "nested parent escape")]
    #[test_case("/work/app/../app2/x.js", "/work/app"; "sibling with shared prefix")]
    #[test]
    fn translate_rejects_escaping_paths(local: &str, root: &str) {
        let result = to_remote_relative(local, root);
        assert!(matches!(result, Err(PathError::OutsideFolder { .. })));
    }

    #[test_case("/work/app/./cartridge/../x.js", "/work/app/x.js"; "absolute")]
    #[test_case("/../work/x.js", "/work/x.js"; "parent of root")]
    #[test_case("../a/./b/../c", "../a/c"; "relative with leading parent")]
    #[test_case("a/../../b", "../b"; "relative escape")]
    #[test_case("/work/app/", "/work/app"; "trailing separator")]
    #[test]
    fn normalize_lexically(path: &str, expect: &str) {
        pretty_assertions::assert_eq!(normalize(path), PathBuf::from(expect));
    }

    #[test]
    fn translate_rejects_root_without_base_name() {
        let result = to_remote_relative("/x.js", "/");
        assert!(matches!(result, Err(PathError::NoBaseName(_))));
    }

    #[test_case("project/a b/c#1.js", "project/a%20b/c%231.js"; "reserved characters")]
    #[test_case("project/ünï/x.js", "project/%C3%BCn%C3%AF/x.js"; "non ascii")]
    #[test_case("project/x-y_z.~js", "project/x-y_z.~js"; "unreserved characters")]
    #[test]
    fn encode_segments(remote: &str, expect: &str) {
        pretty_assertions::assert_eq!(encode_remote_path(remote), expect);
    }

    #[test_case("project/cartridge/templates/default/x.isml", "project/cartridge/templates/default"; "nested")]
    #[test_case("project/x.js", "project"; "shallow")]
    #[test_case("project", ""; "top level")]
    #[test]
    fn parent_of_remote_path(remote: &str, expect: &str) {
        pretty_assertions::assert_eq!(remote_parent(remote), expect);
    }

    #[test]
    fn resolve_relative_folder_root() {
        assert_eq!(
            resolve_folder_root("cartridges/app", "/work/project"),
            PathBuf::from("/work/project/cartridges/app")
        );
        assert_eq!(
            resolve_folder_root("/abs/app", "/work/project"),
            PathBuf::from("/abs/app")
        );
        assert_eq!(
            resolve_folder_root("../app", "/work/app/../app"),
            PathBuf::from("/work/app")
        );
    }
}
