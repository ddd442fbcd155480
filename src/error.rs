use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("listing {url} unavailable: {reason}")]
    UpstreamUnavailable { url: String, reason: String },
    #[error("listing {url} contained no parseable entries")]
    EmptyListing { url: String },
    #[error("failed to fetch document {url}: {reason}")]
    DocumentFetchFailed { url: String, reason: String },
    #[error("storage failure at {}: {source}", path.display())]
    StorageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no free backup ordinal left for {} (checked {checked} slots)", canonical.display())]
    RevisionOrdinalExhausted { canonical: PathBuf, checked: u32 },
    #[error("group {group} period {period} already has a latest file {existing}; refusing {incoming}")]
    ConflictingLatest {
        group: String,
        period: u32,
        existing: String,
        incoming: String,
    },
    #[error("{failed} of {processed} matched entries failed: {summary}")]
    EntriesFailed {
        failed: usize,
        processed: usize,
        summary: String,
    },
    #[error("config invalid: {0}")]
    InvalidConfig(String),
}

impl SyncError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageIo {
            path: path.into(),
            source,
        }
    }

    pub fn code(&self) -> SyncErrorCode {
        match self {
            Self::UpstreamUnavailable { .. } => SyncErrorCode::E001UpstreamUnavailable,
            Self::EmptyListing { .. } => SyncErrorCode::E002EmptyListing,
            Self::DocumentFetchFailed { .. } => SyncErrorCode::E003DocumentFetchFailed,
            Self::StorageIo { .. } => SyncErrorCode::E004StorageIo,
            Self::RevisionOrdinalExhausted { .. } => SyncErrorCode::E005OrdinalExhausted,
            Self::ConflictingLatest { .. } => SyncErrorCode::E006ConflictingLatest,
            Self::EntriesFailed { .. } => SyncErrorCode::E007EntriesFailed,
            Self::InvalidConfig(_) => SyncErrorCode::E008InvalidConfig,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorCode {
    E001UpstreamUnavailable,
    E002EmptyListing,
    E003DocumentFetchFailed,
    E004StorageIo,
    E005OrdinalExhausted,
    E006ConflictingLatest,
    E007EntriesFailed,
    E008InvalidConfig,
}

impl SyncErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E001UpstreamUnavailable => "E001_UPSTREAM_UNAVAILABLE",
            Self::E002EmptyListing => "E002_EMPTY_LISTING",
            Self::E003DocumentFetchFailed => "E003_DOCUMENT_FETCH_FAILED",
            Self::E004StorageIo => "E004_STORAGE_IO",
            Self::E005OrdinalExhausted => "E005_ORDINAL_EXHAUSTED",
            Self::E006ConflictingLatest => "E006_CONFLICTING_LATEST",
            Self::E007EntriesFailed => "E007_ENTRIES_FAILED",
            Self::E008InvalidConfig => "E008_INVALID_CONFIG",
        }
    }
}

/// Finds the first `SyncError` in an `anyhow` chain.
pub fn sync_error_code(err: &anyhow::Error) -> Option<SyncErrorCode> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<SyncError>())
        .map(SyncError::code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn code_survives_anyhow_context() {
        let err: anyhow::Result<()> = Err(SyncError::EmptyListing {
            url: "https://example.test/".to_string(),
        })
        .context("sync failed");
        let err = err.expect_err("error");
        assert_eq!(
            sync_error_code(&err).map(SyncErrorCode::as_str),
            Some("E002_EMPTY_LISTING")
        );
    }

    #[test]
    fn plain_anyhow_errors_have_no_code() {
        let err = anyhow::anyhow!("boom");
        assert!(sync_error_code(&err).is_none());
    }
}
