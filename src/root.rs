use std::path::{Path, PathBuf};

/// Pick the directory to expose for a user-supplied path
///
/// - An empty path serves the current directory
/// - A directory is served as-is
/// - Anything else (a file, or a path that can't be stat'ed) serves its parent directory
///
/// The returned directory is not guaranteed to exist.
pub fn resolve_served_root(path: &Path) -> PathBuf {
    if path.as_os_str().is_empty() {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }

    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => path.to_owned(),
        _ => parent_dir(path),
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    // `build/` names the directory itself, even before it exists
    if ends_with_separator(path) {
        return path.components().collect();
    }

    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => PathBuf::from("."),
        Some(parent) => parent.to_owned(),
        // `/` and prefixes are their own parent
        None => path.to_owned(),
    }
}

fn ends_with_separator(path: &Path) -> bool {
    path.as_os_str()
        .as_encoded_bytes()
        .last()
        .is_some_and(|b| std::path::is_separator(char::from(*b)))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn directory_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_served_root(dir.path()), dir.path());

        let nested = dir.path().join("site");
        std::fs::create_dir(&nested).unwrap();
        assert_eq!(resolve_served_root(&nested), nested);
    }

    #[test]
    fn file_resolves_to_parent() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("index.html");
        std::fs::write(&file, "<html></html>").unwrap();
        assert_eq!(resolve_served_root(&file), dir.path());
    }

    #[test]
    fn missing_path_resolves_to_parent() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone").join("report.pdf");
        assert_eq!(resolve_served_root(&missing), dir.path().join("gone"));
        assert!(!resolve_served_root(&missing).exists());
    }

    #[test]
    fn missing_directory_with_trailing_slash_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let mut build = dir.path().join("build").into_os_string();
        build.push("/");
        assert_eq!(
            resolve_served_root(Path::new(&build)),
            dir.path().join("build")
        );
        assert_eq!(
            resolve_served_root(Path::new("no-such-build-dir/")),
            Path::new("no-such-build-dir")
        );
    }

    #[test]
    fn bare_file_name_resolves_to_cwd() {
        assert_eq!(
            resolve_served_root(Path::new("no-such-file-here.txt")),
            Path::new(".")
        );
    }

    #[test]
    fn empty_path_is_cwd() {
        assert_eq!(
            resolve_served_root(Path::new("")),
            std::env::current_dir().unwrap()
        );
    }

    #[test]
    fn root_is_its_own_parent() {
        assert_eq!(parent_dir(Path::new("/")), Path::new("/"));
    }
}
