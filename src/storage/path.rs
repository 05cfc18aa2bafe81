//! Pure, filesystem-independent path virtualization for the FTP working directory.
//!
//! Clients only ever see a virtual root `/`. [`virtual_join`] resolves a client-supplied
//! path (which may be absolute or relative, and may contain `.`/`..` segments) against the
//! session's current virtual working directory, clamping the result so it can never escape
//! above the virtual root. This is deliberately string-based: it never touches the real
//! filesystem (no `canonicalize`, no symlink resolution), because the real filesystem path
//! is only computed afterwards by joining the result onto the backend's physical root.

use std::path::{Component, Path, PathBuf};

/// Resolves `input` against `cwd` (both virtual, rooted at `/`), producing a normalized,
/// absolute virtual path that can never climb above `/`.
///
/// `..` at the virtual root is simply absorbed rather than treated as an error, matching the
/// forgiving behaviour most FTP clients expect from `CWD ..` at the top level.
pub fn virtual_join(cwd: &Path, input: &str) -> PathBuf {
    let input_path = Path::new(input);
    let mut stack: Vec<String> = if input_path.is_absolute() {
        Vec::new()
    } else {
        cwd.components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect()
    };

    for component in input_path.components() {
        match component {
            Component::Normal(s) => stack.push(s.to_string_lossy().into_owned()),
            Component::ParentDir => {
                stack.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    let mut result = PathBuf::from("/");
    result.extend(stack);
    result
}

/// Joins a resolved virtual path onto the backend's physical root, producing the real
/// on-disk path to operate on. The virtual path is expected to already be normalized and
/// rooted (as returned by [`virtual_join`]), so this is a plain concatenation.
pub fn physical_path(root: &Path, virtual_path: &Path) -> PathBuf {
    let mut real = root.to_path_buf();
    for component in virtual_path.components() {
        if let Component::Normal(s) = component {
            real.push(s);
        }
    }
    real
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_path_replaces_cwd() {
        assert_eq!(virtual_join(Path::new("/a/b"), "/c/d"), PathBuf::from("/c/d"));
    }

    #[test]
    fn relative_path_extends_cwd() {
        assert_eq!(virtual_join(Path::new("/a"), "b"), PathBuf::from("/a/b"));
    }

    #[test]
    fn dotdot_climbs_one_level() {
        assert_eq!(virtual_join(Path::new("/a/b"), ".."), PathBuf::from("/a"));
    }

    #[test]
    fn dotdot_cannot_escape_root() {
        assert_eq!(virtual_join(Path::new("/"), "../../.."), PathBuf::from("/"));
        assert_eq!(virtual_join(Path::new("/a"), "../../../etc/passwd"), PathBuf::from("/etc/passwd"));
    }

    #[test]
    fn mixed_traversal_is_clamped() {
        assert_eq!(virtual_join(Path::new("/a/b/c"), "../../../../x"), PathBuf::from("/x"));
    }

    #[test]
    fn physical_path_strips_virtual_root() {
        let real = physical_path(Path::new("/srv/ftp"), Path::new("/a/b"));
        assert_eq!(real, PathBuf::from("/srv/ftp/a/b"));
    }

    #[test]
    fn current_dir_component_is_noop() {
        assert_eq!(virtual_join(Path::new("/a"), "./b/./c"), PathBuf::from("/a/b/c"));
    }
}
