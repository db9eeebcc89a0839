//! Local file helpers.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use glob::Pattern;
use tempfile::TempDir;
use tracing::debug;

use crate::error::ShellError;
use crate::Result;

/// Prefix for temporary directories.
const TEMP_DIR_PREFIX: &str = "procshell-";

/// Recursively copy `source` into `dest`.
///
/// `dest` must not exist yet. Entries whose file name matches one of the
/// `ignore` glob patterns are skipped, at any depth.
pub fn upload_dir(source: &Path, dest: &Path, ignore: &[&str]) -> Result<()> {
    let patterns = ignore
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| ShellError::InvalidPattern {
                pattern: (*p).to_string(),
                message: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    copy_tree(source, dest, &patterns)
}

fn copy_tree(source: &Path, dest: &Path, ignore: &[Pattern]) -> Result<()> {
    fs::create_dir(dest)?;

    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if ignore.iter().any(|p| p.matches(&name_str)) {
            debug!("upload_dir: skipping {}", entry.path().display());
            continue;
        }

        let target = dest.join(&name);
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target, ignore)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}

/// Copy a single file, overwriting `dest`.
pub fn upload_file(source: &Path, dest: &Path) -> Result<()> {
    fs::copy(source, dest)?;
    Ok(())
}

/// Open a file using a mode string.
///
/// Accepts `r`, `w` or `a`, optionally followed by `b` and/or `+`.
pub fn open(path: &Path, mode: &str) -> Result<File> {
    Ok(open_options(mode)?.open(path)?)
}

fn open_options(mode: &str) -> Result<OpenOptions> {
    let invalid = || ShellError::InvalidOpenMode(mode.to_string());

    let mut chars = mode.chars();
    let kind = chars.next().ok_or_else(invalid)?;
    let mut plus = false;
    for c in chars {
        match c {
            'b' => {}
            '+' if !plus => plus = true,
            _ => return Err(invalid()),
        }
    }

    let mut options = OpenOptions::new();
    match kind {
        'r' => options.read(true).write(plus),
        'w' => options.write(true).create(true).truncate(true).read(plus),
        'a' => options.append(true).create(true).read(plus),
        _ => return Err(invalid()),
    };
    Ok(options)
}

/// Write `contents` to `path`, creating parent directories first.
pub fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

/// Create a temporary directory, deleted when the guard is dropped.
pub fn temporary_dir() -> Result<TempDir> {
    Ok(tempfile::Builder::new().prefix(TEMP_DIR_PREFIX).tempdir()?)
}
