use anyhow::{Result, anyhow};
use regex::Regex;
use serde::Serialize;

/// One item of the remote listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateEntry {
    pub label: String,
    pub link: String,
}

impl CandidateEntry {
    pub fn new(label: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            link: link.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Selector {
    Substring(String),
    Pattern(Regex),
}

impl Selector {
    pub fn from_config(mode: &str, value: &str) -> Result<Self> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "substring" | "contains" => Ok(Self::Substring(value.to_string())),
            "regex" | "pattern" => Regex::new(value)
                .map(Self::Pattern)
                .map_err(|err| anyhow!("invalid selection pattern `{value}`: {err}")),
            other => Err(anyhow!(
                "invalid selection mode `{other}`: use `substring` or `regex`"
            )),
        }
    }

    pub fn matches(&self, label: &str) -> bool {
        match self {
            Self::Substring(needle) => label.contains(needle.as_str()),
            Self::Pattern(pattern) => pattern.is_match(label),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Substring(needle) => format!("substring:{needle}"),
            Self::Pattern(pattern) => format!("regex:{}", pattern.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The listing had no entries at all.
    NoEntries,
    /// Entries were present but none matched.
    NoMatches { scanned: usize },
    Matched {
        scanned: usize,
        entries: Vec<CandidateEntry>,
    },
}

impl Selection {
    pub fn matched(&self) -> &[CandidateEntry] {
        match self {
            Self::Matched { entries, .. } => entries,
            _ => &[],
        }
    }
}

pub fn select(entries: Vec<CandidateEntry>, selector: &Selector) -> Selection {
    if entries.is_empty() {
        return Selection::NoEntries;
    }
    let scanned = entries.len();
    let matched: Vec<CandidateEntry> = entries
        .into_iter()
        .filter(|entry| selector.matches(&entry.label))
        .collect();
    if matched.is_empty() {
        Selection::NoMatches { scanned }
    } else {
        Selection::Matched {
            scanned,
            entries: matched,
        }
    }
}
