use crate::error::SyncError;
use crate::timetable::fingerprint::{fingerprint, fingerprint_file};
use crate::timetable::naming::NamingScheme;
use crate::timetable::rotate;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Bytes downloaded for one matched listing entry.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub file_name: String,
    pub source_url: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveDecision {
    Create,
    Rotate,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    Created,
    Updated { backup: PathBuf },
    Unchanged,
}

impl ArchiveOutcome {
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated { .. } => "updated",
            Self::Unchanged => "unchanged",
        }
    }
}

impl ArchiveDecision {
    pub fn is_change(self) -> bool {
        !matches!(self, Self::Skip)
    }
}

#[derive(Debug, Clone)]
pub struct RevisionArchiver {
    archive_dir: PathBuf,
    /// Where new bytes are written before they replace the canonical slot.
    staging_dir: PathBuf,
    naming: Option<NamingScheme>,
}

impl RevisionArchiver {
    pub fn new(archive_dir: impl Into<PathBuf>, naming: Option<NamingScheme>) -> Self {
        let archive_dir = archive_dir.into();
        Self {
            staging_dir: archive_dir.clone(),
            archive_dir,
            naming,
        }
    }

    #[cfg(test)]
    fn with_staging_dir(mut self, staging_dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = staging_dir.into();
        self
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    pub fn canonical_slot(&self, file_name: &str) -> PathBuf {
        self.archive_dir.join(file_name)
    }

    pub fn ensure_archive_dir(&self) -> Result<(), SyncError> {
        fs::create_dir_all(&self.archive_dir)
            .map_err(|err| SyncError::storage(&self.archive_dir, err))
    }

    /// Decides what `archive` would do with `doc` without touching the disk.
    pub fn inspect(&self, doc: &FetchedDocument) -> Result<ArchiveDecision, SyncError> {
        let slot = self.canonical_slot(&doc.file_name);
        let occupied = slot
            .try_exists()
            .map_err(|err| SyncError::storage(&slot, err))?;

        if !occupied {
            self.ensure_single_latest(&doc.file_name)?;
            return Ok(ArchiveDecision::Create);
        }

        let existing = fingerprint_file(&slot).map_err(|err| SyncError::storage(&slot, err))?;
        let incoming = fingerprint(&doc.bytes);
        debug!(
            slot = %slot.display(),
            existing = %existing,
            incoming = %incoming,
            "compared fingerprints"
        );
        if existing == incoming {
            Ok(ArchiveDecision::Skip)
        } else {
            Ok(ArchiveDecision::Rotate)
        }
    }

    pub fn archive(&self, doc: &FetchedDocument) -> Result<ArchiveOutcome, SyncError> {
        let slot = self.canonical_slot(&doc.file_name);
        match self.inspect(doc)? {
            ArchiveDecision::Skip => {
                debug!(file = %doc.file_name, "content unchanged");
                Ok(ArchiveOutcome::Unchanged)
            }
            ArchiveDecision::Create => {
                let staged = self.stage(&doc.bytes)?;
                persist(staged, &slot)?;
                info!(file = %doc.file_name, bytes = doc.bytes.len(), "archived new document");
                Ok(ArchiveOutcome::Created)
            }
            ArchiveDecision::Rotate => {
                // The canonical slot is only moved once the new bytes are on disk.
                let staged = self.stage(&doc.bytes)?;
                let backup = rotate::rotate(&slot)?;
                if let Err(err) = persist(staged, &slot) {
                    if let Err(restore_err) = rotate::move_file(&backup, &slot) {
                        warn!(
                            backup = %backup.display(),
                            "failed to restore superseded revision: {restore_err}"
                        );
                    }
                    return Err(err);
                }
                info!(
                    file = %doc.file_name,
                    backup = %backup.display(),
                    bytes = doc.bytes.len(),
                    "archived updated document"
                );
                Ok(ArchiveOutcome::Updated { backup })
            }
        }
    }

    fn stage(&self, bytes: &[u8]) -> Result<NamedTempFile, SyncError> {
        let mut staged = NamedTempFile::new_in(&self.staging_dir)
            .map_err(|err| SyncError::storage(&self.staging_dir, err))?;
        staged
            .write_all(bytes)
            .and_then(|_| staged.as_file().sync_all())
            .map_err(|err| SyncError::storage(staged.path(), err))?;
        Ok(staged)
    }

    /// A new canonical slot must not become a second latest file for a
    /// (group, period) that already has one under a different name.
    fn ensure_single_latest(&self, file_name: &str) -> Result<(), SyncError> {
        let Some(naming) = &self.naming else {
            return Ok(());
        };
        let Some(incoming) = naming.decode_file_name(file_name) else {
            return Ok(());
        };
        if !incoming.is_latest() {
            return Ok(());
        }
        let entries = match fs::read_dir(&self.archive_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(SyncError::storage(&self.archive_dir, err)),
        };

        for entry in entries {
            let entry = entry.map_err(|err| SyncError::storage(&self.archive_dir, err))?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name == file_name {
                continue;
            }
            let Some(existing) = naming.decode_file_name(&name) else {
                continue;
            };
            if existing.is_latest()
                && existing.group == incoming.group
                && existing.period == incoming.period
            {
                return Err(SyncError::ConflictingLatest {
                    group: incoming.group,
                    period: incoming.period,
                    existing: name,
                    incoming: file_name.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn persist(staged: NamedTempFile, slot: &Path) -> Result<(), SyncError> {
    staged
        .persist(slot)
        .map_err(|err| SyncError::storage(slot, err.error))?;
    Ok(())
}
