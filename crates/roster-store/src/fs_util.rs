//! Filesystem helpers shared by the store and the vaults

use roster_core::RosterError;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub(crate) const DIR_MODE: u32 = 0o700;
pub(crate) const FILE_MODE: u32 = 0o600;

/// Map an I/O failure to the matching error variant, naming the path
pub(crate) fn io_error(action: &str, path: &Path, err: io::Error) -> RosterError {
    let message = format!("Failed to {action} {}: {err}", path.display());
    match err.kind() {
        io::ErrorKind::NotFound => RosterError::not_found(message),
        io::ErrorKind::PermissionDenied => RosterError::permission_denied(message),
        io::ErrorKind::AlreadyExists => RosterError::already_exists(message),
        _ => RosterError::storage(message),
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

/// Create `path` and any missing parents, owner-only
pub(crate) fn create_private_dir(path: &Path) -> Result<(), RosterError> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|e| io_error("create directory", path, e))?;
    set_mode(path, DIR_MODE).map_err(|e| io_error("set permissions on", path, e))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write through a temporary sibling and rename into place
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<(), RosterError> {
    let temp = temp_path(path);
    let mut file = fs::File::create(&temp).map_err(|e| io_error("create", &temp, e))?;
    file.write_all(data)
        .map_err(|e| io_error("write", &temp, e))?;
    file.sync_all().map_err(|e| io_error("sync", &temp, e))?;
    set_mode(&temp, FILE_MODE).map_err(|e| io_error("set permissions on", &temp, e))?;
    fs::rename(&temp, path).map_err(|e| io_error("rename into", path, e))
}

/// Sorted names of entries in `dir` accepted by `select`; a missing
/// directory lists as empty
pub(crate) fn list_sorted(
    dir: &Path,
    mut select: impl FnMut(&fs::DirEntry) -> Option<String>,
) -> Result<Vec<String>, RosterError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error("read directory", dir, e)),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_error("read entry in", dir, e))?;
        if let Some(name) = select(&entry) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Visible sub-directory name
pub(crate) fn dir_name(entry: &fs::DirEntry) -> Option<String> {
    let name = entry.file_name().into_string().ok()?;
    if name.starts_with('.') || !entry.file_type().ok()?.is_dir() {
        return None;
    }
    Some(name)
}

/// Stem of a regular file with the given extension
pub(crate) fn file_stem_with(entry: &fs::DirEntry, extension: &str) -> Option<String> {
    if !entry.file_type().ok()?.is_file() {
        return None;
    }
    let path = entry.path();
    if path.extension()?.to_str()? != extension {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    (!stem.starts_with('.')).then(|| stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_replaces_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("U.jwt");
        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
        assert!(!temp_path(&path).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_modes_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("a/b");
        create_private_dir(&sub).unwrap();
        let file = sub.join("k.nk");
        write_atomic(&file, b"secret").unwrap();

        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&sub), DIR_MODE);
        assert_eq!(mode(&file), FILE_MODE);
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let names = list_sorted(&dir.path().join("nope"), dir_name).unwrap();
        assert!(names.is_empty());
    }
}
