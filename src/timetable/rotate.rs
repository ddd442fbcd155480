use crate::error::SyncError;
use crate::timetable::naming::backup_file_name;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

/// Backup ordinals run from `_00` to `_999`.
pub const MAX_BACKUP_ORDINALS: u32 = 1000;

pub(crate) fn move_file(from: &Path, to: &Path) -> Result<(), SyncError> {
    if from == to {
        return Ok(());
    }

    match fs::rename(from, to) {
        Ok(_) => Ok(()),
        Err(rename_err) => {
            if matches!(
                rename_err.kind(),
                ErrorKind::CrossesDevices | ErrorKind::PermissionDenied
            ) {
                fs::copy(from, to).map_err(|err| SyncError::storage(to, err))?;
                fs::remove_file(from).map_err(|err| SyncError::storage(from, err))?;
                Ok(())
            } else {
                Err(SyncError::storage(from, rename_err))
            }
        }
    }
}

/// First backup path for `canonical` that is not occupied yet.
pub fn next_backup_slot(canonical: &Path) -> Result<PathBuf, SyncError> {
    let file_name = canonical
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            SyncError::storage(
                canonical,
                std::io::Error::new(ErrorKind::InvalidInput, "slot has no utf-8 file name"),
            )
        })?;
    let dir = canonical.parent().unwrap_or_else(|| Path::new(""));

    for ordinal in 0..MAX_BACKUP_ORDINALS {
        let candidate = dir.join(backup_file_name(file_name, ordinal));
        let occupied = candidate
            .try_exists()
            .map_err(|err| SyncError::storage(&candidate, err))?;
        if !occupied {
            return Ok(candidate);
        }
    }

    Err(SyncError::RevisionOrdinalExhausted {
        canonical: canonical.to_path_buf(),
        checked: MAX_BACKUP_ORDINALS,
    })
}

/// Moves the current content of `canonical` to its next backup slot and
/// returns that slot. The canonical name is free afterwards.
pub fn rotate(canonical: &Path) -> Result<PathBuf, SyncError> {
    let backup = next_backup_slot(canonical)?;
    move_file(canonical, &backup)?;
    info!(
        canonical = %canonical.display(),
        backup = %backup.display(),
        "rotated superseded revision"
    );
    Ok(backup)
}
