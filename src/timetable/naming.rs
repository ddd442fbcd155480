//! Filename encoding for archive slots.
//!
//! Canonical slots keep the name the listing links to, e.g.
//! `US_IT_2024_Sommer_FIAE_D_2024_abKW10.pdf`. A superseded version is moved
//! to `{stem}_{nn}{ext}` with a two-digit, zero-padded ordinal. Decoding turns
//! either form back into a [`RevisionRecord`] through the configured pattern,
//! which must expose `group` and `period` capture groups and may expose a
//! `revision` group for the backup ordinal.

use anyhow::{Result, anyhow};
use regex::Regex;
use std::path::Path;

pub const GROUP_CAPTURE: &str = "group";
pub const PERIOD_CAPTURE: &str = "period";
pub const REVISION_CAPTURE: &str = "revision";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionRecord {
    pub file_name: String,
    pub group: String,
    pub period: u32,
    pub explicit_revision: Option<u32>,
}

impl RevisionRecord {
    pub fn is_latest(&self) -> bool {
        self.explicit_revision.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NamingScheme {
    pattern: Regex,
}

impl NamingScheme {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|err| anyhow!("invalid naming pattern `{pattern}`: {err}"))?;
        let names: Vec<&str> = pattern.capture_names().flatten().collect();
        for required in [GROUP_CAPTURE, PERIOD_CAPTURE] {
            if !names.contains(&required) {
                return Err(anyhow!(
                    "naming pattern must define a `(?P<{required}>...)` capture group"
                ));
            }
        }
        Ok(Self { pattern })
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    /// Returns `None` for names outside the naming contract, including names
    /// whose numeric parts do not fit the record fields.
    pub fn decode_file_name(&self, file_name: &str) -> Option<RevisionRecord> {
        let captures = self.pattern.captures(file_name)?;
        let group = captures.name(GROUP_CAPTURE)?.as_str().to_string();
        let period = captures.name(PERIOD_CAPTURE)?.as_str().parse::<u32>().ok()?;
        let explicit_revision = match captures.name(REVISION_CAPTURE) {
            Some(m) => Some(m.as_str().parse::<u32>().ok()?),
            None => None,
        };
        Some(RevisionRecord {
            file_name: file_name.to_string(),
            group,
            period,
            explicit_revision,
        })
    }
}

fn split_stem_and_extension(file_name: &str) -> (&str, &str) {
    let path = Path::new(file_name);
    match (
        path.file_stem().and_then(|s| s.to_str()),
        path.extension().and_then(|s| s.to_str()),
    ) {
        (Some(stem), Some(ext)) => (stem, &file_name[stem.len()..stem.len() + ext.len() + 1]),
        _ => (file_name, ""),
    }
}

pub fn backup_file_name(canonical_name: &str, ordinal: u32) -> String {
    let (stem, ext) = split_stem_and_extension(canonical_name);
    format!("{stem}_{ordinal:02}{ext}")
}
