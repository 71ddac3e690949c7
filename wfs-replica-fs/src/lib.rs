//! Capability-based filesystem helpers for the on-disk metadata cache.
//!
//! Every helper resolves an ambient base directory once and performs the
//! actual IO relative to it through `cap-std`, so cache paths may be absolute
//! or relative.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io;
use std::path::Component;
use std::time::SystemTime;

/// What currently occupies a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Nothing exists at the path.
    Missing,
    /// A regular file.
    File,
    /// A directory.
    Dir,
    /// Something else, such as a socket.
    Other,
}

/// Classify `path` without following it further than `cap-std` allows.
pub fn path_kind(path: &Utf8Path) -> io::Result<PathKind> {
    let (dir, name) = match open_dir_and_file(path) {
        Ok(parts) => parts,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(PathKind::Missing),
        Err(err) => return Err(err),
    };
    match dir.metadata(name.as_str()) {
        Ok(meta) if meta.is_file() => Ok(PathKind::File),
        Ok(meta) if meta.is_dir() => Ok(PathKind::Dir),
        Ok(_) => Ok(PathKind::Other),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(PathKind::Missing),
        Err(err) => Err(err),
    }
}

/// Create `path` and any missing ancestors.
pub fn ensure_dir(path: &Utf8Path) -> io::Result<()> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    let (base_dir, relative) = base_dir_and_relative(path)?;
    if relative.as_os_str().is_empty() {
        return Ok(());
    }
    base_dir.create_dir_all(&relative)
}

/// Read a UTF-8 file in full.
pub fn read_to_string(path: &Utf8Path) -> io::Result<String> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.read_to_string(name.as_str())
}

/// Replace the contents of `path`, creating parent directories first.
///
/// The data is written to a sibling temporary file and renamed into place so
/// readers never observe a partially written document.
pub fn write_replacing(path: &Utf8Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let (dir, name) = open_dir_and_file(path)?;
    let staging = format!(".{name}.partial");
    dir.write(staging.as_str(), contents)?;
    dir.rename(staging.as_str(), &dir, name.as_str())
}

/// Last modification time of a file.
pub fn modified(path: &Utf8Path) -> io::Result<SystemTime> {
    let (dir, name) = open_dir_and_file(path)?;
    let modified = dir.metadata(name.as_str())?.modified()?;
    Ok(modified.into_std())
}

/// Remove a regular file.
pub fn remove_file(path: &Utf8Path) -> io::Result<()> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.remove_file(name.as_str())
}

/// Resolve the parent directory of `path` and return it with the file name.
pub fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("path should include a file name"))?
        .to_owned();
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Split an absolute or relative path into an ambient base directory and a
/// relative suffix.
pub fn base_dir_and_relative(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_path = path.as_std_path();

    let (base, relative) = match std_path.components().next() {
        // Windows drive or UNC prefix.
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            let base = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_path
                .strip_prefix(base.as_std_path())
                .or_else(|_| std_path.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from path"))?
                .to_path_buf();
            (base, relative)
        }
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_path
                .strip_prefix(base.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (base, relative)
        }
        _ => (Utf8PathBuf::from("."), std_path.to_path_buf()),
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    let relative =
        Utf8PathBuf::from_path_buf(relative).map_err(|_| io::Error::other("non-UTF-8 path"))?;

    Ok((dir, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn root() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
        (dir, path)
    }

    #[rstest]
    fn classifies_paths(root: (TempDir, Utf8PathBuf)) {
        let (_guard, base) = root;
        let file = base.join("capabilities.json");
        assert_eq!(path_kind(&file).expect("classify"), PathKind::Missing);
        write_replacing(&file, "{}").expect("write");
        assert_eq!(path_kind(&file).expect("classify"), PathKind::File);
        assert_eq!(path_kind(&base).expect("classify"), PathKind::Dir);
    }

    #[rstest]
    fn missing_parent_counts_as_missing(root: (TempDir, Utf8PathBuf)) {
        let (_guard, base) = root;
        let nested = base.join("absent").join("file.json");
        assert_eq!(path_kind(&nested).expect("classify"), PathKind::Missing);
    }

    #[rstest]
    fn write_creates_parents_and_replaces(root: (TempDir, Utf8PathBuf)) {
        let (_guard, base) = root;
        let file = base.join("a").join("b").join("schema.json");
        write_replacing(&file, "first").expect("first write");
        write_replacing(&file, "second").expect("second write");
        assert_eq!(read_to_string(&file).expect("read"), "second");
        assert!(modified(&file).is_ok());
        remove_file(&file).expect("remove");
        assert_eq!(path_kind(&file).expect("classify"), PathKind::Missing);
    }
}
