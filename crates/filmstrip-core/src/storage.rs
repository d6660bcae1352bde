use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Hidden sibling of `path` that receives bytes before they are renamed into place.
pub fn staging_path(path: &Path) -> io::Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", path.display()),
        )
    })?;
    let mut staging = OsString::from(".");
    staging.push(name);
    staging.push(".partial");
    Ok(path.with_file_name(staging))
}

/// Write `bytes` to the staging sibling of `path`, then rename it onto `path`.
///
/// `path` is either left untouched or fully replaced; the staging file is removed on
/// failure.
pub fn write_staged(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let staging = staging_path(path)?;
    let written = fs::write(&staging, bytes).and_then(|()| fs::rename(&staging, path));
    if written.is_err() {
        let _ = fs::remove_file(&staging);
    }
    written
}
