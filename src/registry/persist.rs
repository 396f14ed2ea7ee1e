//! Crash-safe file writes and backups.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{FeederError, Result};

/// Prefix of overwrite backups (`.back_sourcelist.conf`).
pub const BACKUP_PREFIX: &str = ".back_";

/// Write `content` to `path` through a temporary sibling and a rename.
///
/// The parent directory is created when missing. A failed write leaves any
/// previous file at `path` untouched.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = temp_path(path);
    let written = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(content)?;
        file.sync_all()
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    debug!("Wrote {} bytes to '{}'", content.len(), path.display());
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

/// Backup location used before overwriting `path`.
pub fn backup_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{BACKUP_PREFIX}{name}"))
}

/// Backup location used before migrating `path` away from `version`:
/// `<stem>_v<version><ext>`, e.g. `sourcelist_v0.1.conf`.
pub fn versioned_backup_path(path: &Path, version: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_v{version}.{}", ext.to_string_lossy()),
        None => format!("{stem}_v{version}"),
    };
    path.with_file_name(name)
}

/// Copy `path` to `backup`, replacing a stale backup.
///
/// Fails unless the backup exists afterwards.
pub fn create_backup(path: &Path, backup: &Path) -> Result<PathBuf> {
    if backup.exists() {
        info!("Backup '{}' already exists, replacing it", backup.display());
        fs::remove_file(backup)?;
    }

    info!("Copying '{}' ==> '{}'", path.display(), backup.display());
    fs::copy(path, backup).map_err(|e| {
        FeederError::Save(format!("backup of '{}' failed: {}", path.display(), e))
    })?;

    if !backup.exists() {
        return Err(FeederError::Save(format!(
            "backup '{}' does not exist after copy",
            backup.display()
        )));
    }
    Ok(backup.to_path_buf())
}
