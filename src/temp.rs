//! Scratch directories for short-lived work such as checking that a remote exists

use std::env;
use std::io;
use std::path::PathBuf;

use tempfile::TempDir;

/// System temp directory, made absolute when `TMPDIR` is relative.
///
/// A relative base resolves against the current working directory, so the
/// throwaway repository would land inside whatever tree the command runs
/// from, possibly a product directory or the workarea itself.
fn scratch_base() -> PathBuf {
    let base = env::temp_dir();
    if base.is_absolute() {
        return base;
    }
    #[cfg(windows)]
    {
        env::var("TEMP")
            .or_else(|_| env::var("TMP"))
            .map_or_else(|_| PathBuf::from("C:\\Windows\\Temp"), PathBuf::from)
    }
    #[cfg(not(windows))]
    {
        PathBuf::from("/tmp")
    }
}

/// A fresh directory named `<prefix>XXXX`, removed on drop
pub fn scratch_dir(prefix: &str) -> io::Result<TempDir> {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir_in(scratch_base())
}
