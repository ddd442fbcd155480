//! One sync run: fetch the listing, select entries, archive each document.

use crate::error::SyncError;
use crate::timetable::archive::{ArchiveDecision, ArchiveOutcome, FetchedDocument, RevisionArchiver};
use crate::timetable::fetch::Fetcher;
use crate::timetable::listing::{ListingLayout, file_name_from_link, parse_listing, resolve_link};
use crate::timetable::selector::{CandidateEntry, Selection, Selector, select};
use crate::timetable::util::truncate_with_ellipsis;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

const FAILURE_SUMMARY_CHARS: usize = 240;

pub struct SyncContext {
    pub listing_url: String,
    pub layout: ListingLayout,
    pub selector: Selector,
    pub archiver: RevisionArchiver,
    pub isolate_failures: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryStatus {
    Created,
    Updated { backup: PathBuf },
    Unchanged,
    Planned { decision: ArchiveDecision },
    Failed { code: String, message: String },
}

impl EntryStatus {
    pub fn is_change(&self) -> bool {
        match self {
            Self::Created | Self::Updated { .. } => true,
            Self::Planned { decision } => decision.is_change(),
            Self::Unchanged | Self::Failed { .. } => false,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Created => "created".to_string(),
            Self::Updated { backup } => format!("updated backup={}", backup.display()),
            Self::Unchanged => "unchanged".to_string(),
            Self::Planned { decision } => format!("planned:{decision:?}").to_ascii_lowercase(),
            Self::Failed { code, message } => format!("failed code={code} err={message}"),
        }
    }
}

impl From<ArchiveOutcome> for EntryStatus {
    fn from(outcome: ArchiveOutcome) -> Self {
        match outcome {
            ArchiveOutcome::Created => Self::Created,
            ArchiveOutcome::Updated { backup } => Self::Updated { backup },
            ArchiveOutcome::Unchanged => Self::Unchanged,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryReport {
    pub label: String,
    pub link: String,
    pub file_name: Option<String>,
    pub status: EntryStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncOutcome {
    pub listing_entries: usize,
    pub matched: usize,
    pub entries: Vec<EntryReport>,
    pub any_changes: bool,
}

impl SyncOutcome {
    pub fn failures(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, EntryStatus::Failed { .. }))
    }

    pub fn count(&self, label: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| match &e.status {
                EntryStatus::Created => label == "created",
                EntryStatus::Updated { .. } => label == "updated",
                EntryStatus::Unchanged => label == "unchanged",
                EntryStatus::Planned { .. } => label == "planned",
                EntryStatus::Failed { .. } => label == "failed",
            })
            .count()
    }

    /// Aggregate error for entries whose failure was isolated.
    pub fn failure_error(&self) -> Option<SyncError> {
        let failed: Vec<String> = self
            .failures()
            .map(|e| {
                format!(
                    "{}: {}",
                    e.file_name.as_deref().unwrap_or(&e.link),
                    e.status.label()
                )
            })
            .collect();
        if failed.is_empty() {
            return None;
        }
        Some(SyncError::EntriesFailed {
            failed: failed.len(),
            processed: self.entries.len(),
            summary: truncate_with_ellipsis(&failed.join("; "), FAILURE_SUMMARY_CHARS),
        })
    }
}

fn process_entry<F: Fetcher + ?Sized>(
    fetcher: &F,
    ctx: &SyncContext,
    entry: &CandidateEntry,
    file_name: Option<&str>,
) -> Result<EntryStatus, SyncError> {
    let Some(file_name) = file_name else {
        return Err(SyncError::DocumentFetchFailed {
            url: entry.link.clone(),
            reason: "link has no usable file name".to_string(),
        });
    };
    let url = resolve_link(&ctx.listing_url, &entry.link).map_err(|err| {
        SyncError::DocumentFetchFailed {
            url: entry.link.clone(),
            reason: format!("{err:#}"),
        }
    })?;
    let bytes = fetcher
        .fetch_bytes(url.as_str())
        .map_err(|err| SyncError::DocumentFetchFailed {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
    info!(file = file_name, bytes = bytes.len(), "downloaded document");

    let doc = FetchedDocument {
        file_name: file_name.to_string(),
        source_url: url.to_string(),
        bytes,
    };
    if ctx.dry_run {
        let decision = ctx.archiver.inspect(&doc)?;
        return Ok(EntryStatus::Planned { decision });
    }
    Ok(ctx.archiver.archive(&doc)?.into())
}

pub fn run_sync<F: Fetcher + ?Sized>(fetcher: &F, ctx: &SyncContext) -> Result<SyncOutcome, SyncError> {
    let html = fetcher
        .fetch_text(&ctx.listing_url)
        .map_err(|err| SyncError::UpstreamUnavailable {
            url: ctx.listing_url.clone(),
            reason: err.to_string(),
        })?;

    let entries = parse_listing(&html, &ctx.layout);
    let listing_entries = entries.len();
    let matched = match select(entries, &ctx.selector) {
        Selection::NoEntries => {
            return Err(SyncError::EmptyListing {
                url: ctx.listing_url.clone(),
            });
        }
        Selection::NoMatches { scanned } => {
            info!(scanned, selector = %ctx.selector.describe(), "no listing entry matched");
            return Ok(SyncOutcome {
                listing_entries,
                ..SyncOutcome::default()
            });
        }
        Selection::Matched { entries, .. } => entries,
    };

    if !ctx.dry_run {
        ctx.archiver.ensure_archive_dir()?;
    }

    let mut outcome = SyncOutcome {
        listing_entries,
        matched: matched.len(),
        ..SyncOutcome::default()
    };
    for entry in &matched {
        let file_name = file_name_from_link(&entry.link);
        let status = match process_entry(fetcher, ctx, entry, file_name.as_deref()) {
            Ok(status) => status,
            Err(err)
                if ctx.isolate_failures
                    || matches!(err, SyncError::RevisionOrdinalExhausted { .. }) =>
            {
                warn!(label = %entry.label, code = err.code().as_str(), "entry failed: {err}");
                EntryStatus::Failed {
                    code: err.code().as_str().to_string(),
                    message: err.to_string(),
                }
            }
            Err(err) => return Err(err),
        };
        outcome.any_changes |= status.is_change();
        outcome.entries.push(EntryReport {
            label: entry.label.clone(),
            link: entry.link.clone(),
            file_name,
            status,
        });
    }

    Ok(outcome)
}
