use crate::error::SyncError;
use crate::timetable::naming::{NamingScheme, RevisionRecord};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexedRevision {
    pub revision: u32,
    pub file_name: String,
    pub is_latest: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodHistory {
    pub period: u32,
    /// Newest first.
    pub revisions: Vec<IndexedRevision>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupHistory {
    pub group: String,
    /// Highest period first.
    pub periods: Vec<PeriodHistory>,
}

impl GroupHistory {
    pub fn newest(&self) -> Option<(&PeriodHistory, &IndexedRevision)> {
        let period = self.periods.first()?;
        let revision = period.revisions.first()?;
        Some((period, revision))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RevisionIndex {
    pub groups: Vec<GroupHistory>,
}

impl RevisionIndex {
    pub fn revision_count(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|g| &g.periods)
            .map(|p| p.revisions.len())
            .sum()
    }
}

/// File names directly inside `archive_dir`. A missing directory is an empty
/// archive.
pub fn scan_archive(archive_dir: &Path) -> Result<Vec<String>, SyncError> {
    let entries = match fs::read_dir(archive_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!(dir = %archive_dir.display(), "archive dir does not exist");
            return Ok(Vec::new());
        }
        Err(err) => return Err(SyncError::storage(archive_dir, err)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| SyncError::storage(archive_dir, err))?;
        let file_type = entry
            .file_type()
            .map_err(|err| SyncError::storage(entry.path(), err))?;
        if !file_type.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn number_bucket(group: &str, period: u32, mut records: Vec<RevisionRecord>) -> Result<PeriodHistory, SyncError> {
    let mut latest = records.iter().filter(|r| r.is_latest());
    if let (Some(first), Some(second)) = (latest.next(), latest.next()) {
        return Err(SyncError::ConflictingLatest {
            group: group.to_string(),
            period,
            existing: first.file_name.clone(),
            incoming: second.file_name.clone(),
        });
    }

    // Latest first, then explicit ordinals from newest to oldest.
    records.sort_by(|a, b| {
        b.is_latest()
            .cmp(&a.is_latest())
            .then_with(|| b.explicit_revision.cmp(&a.explicit_revision))
            .then_with(|| b.file_name.cmp(&a.file_name))
    });

    let total = records.len() as u32;
    let revisions = records
        .into_iter()
        .enumerate()
        .map(|(position, record)| IndexedRevision {
            revision: total - 1 - position as u32,
            is_latest: record.is_latest(),
            file_name: record.file_name,
        })
        .collect();

    Ok(PeriodHistory { period, revisions })
}

/// Groups listed in `group_order` come first in that order; any other group
/// found in the archive follows alphabetically.
pub fn build<S: AsRef<str>>(
    file_names: &[S],
    naming: &NamingScheme,
    group_order: &[String],
) -> Result<RevisionIndex, SyncError> {
    let mut grouped: BTreeMap<String, BTreeMap<u32, Vec<RevisionRecord>>> = BTreeMap::new();
    for name in file_names {
        let Some(record) = naming.decode_file_name(name.as_ref()) else {
            debug!(file = name.as_ref(), "ignoring file outside naming contract");
            continue;
        };
        grouped
            .entry(record.group.clone())
            .or_default()
            .entry(record.period)
            .or_default()
            .push(record);
    }

    let mut ordered_groups: Vec<String> = group_order
        .iter()
        .filter(|g| grouped.contains_key(g.as_str()))
        .cloned()
        .collect();
    for group in grouped.keys() {
        if !ordered_groups.contains(group) {
            ordered_groups.push(group.clone());
        }
    }

    let mut groups = Vec::with_capacity(ordered_groups.len());
    for group in ordered_groups {
        let Some(buckets) = grouped.remove(&group) else {
            continue;
        };
        let mut periods = Vec::with_capacity(buckets.len());
        for (period, records) in buckets.into_iter().rev() {
            periods.push(number_bucket(&group, period, records)?);
        }
        groups.push(GroupHistory { group, periods });
    }

    Ok(RevisionIndex { groups })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timetable::naming::backup_file_name;
    use tempfile::tempdir;

    const PATTERN: &str = r"^US_IT_2024_Sommer_FIAE_(?P<group>[DE])_(?:2024_)?abKW(?P<period>\d{2})(?:_(?P<revision>\d+))?\.pdf$";

    fn scheme() -> NamingScheme {
        NamingScheme::new(PATTERN).expect("pattern")
    }

    fn groups() -> Vec<String> {
        vec!["D".to_string(), "E".to_string()]
    }

    fn name(group: &str, week: u32) -> String {
        format!("US_IT_2024_Sommer_FIAE_{group}_2024_abKW{week:02}.pdf")
    }

    #[test]
    fn canonical_and_two_backups_are_numbered_newest_first() {
        let canonical = name("D", 10);
        let files = vec![
            backup_file_name(&canonical, 0),
            canonical.clone(),
            backup_file_name(&canonical, 1),
        ];
        let index = build(&files, &scheme(), &groups()).expect("index");

        let group = &index.groups[0];
        let (period, top) = group.newest().expect("newest");
        assert_eq!(period.period, 10);
        assert_eq!(top.file_name, canonical);
        assert!(top.is_latest);

        let numbers: Vec<u32> = period.revisions.iter().map(|r| r.revision).collect();
        assert_eq!(numbers, vec![2, 1, 0]);
        assert_eq!(period.revisions[1].file_name, backup_file_name(&canonical, 1));
        assert_eq!(period.revisions[2].file_name, backup_file_name(&canonical, 0));
    }

    #[test]
    fn single_backup_gives_canonical_revision_one() {
        let canonical = name("E", 12);
        let files = vec![canonical.clone(), backup_file_name(&canonical, 0)];
        let index = build(&files, &scheme(), &groups()).expect("index");
        let revisions = &index.groups[0].periods[0].revisions;
        assert_eq!(revisions[0].revision, 1);
        assert_eq!(revisions[0].file_name, canonical);
        assert_eq!(revisions[1].revision, 0);
    }

    #[test]
    fn periods_sort_numerically_descending() {
        let files = vec![name("D", 9), name("D", 12), name("D", 10)];
        let index = build(&files, &scheme(), &groups()).expect("index");
        let periods: Vec<u32> = index.groups[0].periods.iter().map(|p| p.period).collect();
        assert_eq!(periods, vec![12, 10, 9]);
    }

    #[test]
    fn groups_follow_declared_order_and_skip_empty_ones() {
        let files = vec![name("E", 10), name("D", 10)];
        let index = build(&files, &scheme(), &["E".to_string(), "D".to_string()]).expect("index");
        let order: Vec<&str> = index.groups.iter().map(|g| g.group.as_str()).collect();
        assert_eq!(order, vec!["E", "D"]);

        let only_e = build(&[name("E", 10)], &scheme(), &groups()).expect("index");
        assert_eq!(only_e.groups.len(), 1);
        assert_eq!(only_e.groups[0].group, "E");
    }

    #[test]
    fn undeclared_groups_follow_alphabetically() {
        let scheme = NamingScheme::new(r"^(?P<group>[A-Z])_KW(?P<period>\d+)(?:_(?P<revision>\d+))?\.pdf$")
            .expect("pattern");
        let files = vec!["Z_KW1.pdf", "B_KW1.pdf", "D_KW1.pdf"];
        let index = build(&files, &scheme, &["D".to_string()]).expect("index");
        let order: Vec<&str> = index.groups.iter().map(|g| g.group.as_str()).collect();
        assert_eq!(order, vec!["D", "B", "Z"]);
    }

    #[test]
    fn unrelated_files_are_ignored() {
        let files = vec!["index.md".to_string(), ".tmpAbc123".to_string(), name("D", 10)];
        let index = build(&files, &scheme(), &groups()).expect("index");
        assert_eq!(index.revision_count(), 1);
    }

    #[test]
    fn two_latest_files_in_one_bucket_are_rejected() {
        let files = vec![
            "US_IT_2024_Sommer_FIAE_D_2024_abKW10.pdf".to_string(),
            "US_IT_2024_Sommer_FIAE_D_abKW10.pdf".to_string(),
        ];
        let err = build(&files, &scheme(), &groups()).expect_err("conflict");
        assert!(matches!(err, SyncError::ConflictingLatest { period: 10, .. }));
    }

    #[test]
    fn scan_lists_only_files_and_tolerates_missing_dir() {
        let tmp = tempdir().expect("tempdir");
        assert!(scan_archive(&tmp.path().join("absent")).expect("scan").is_empty());

        fs::write(tmp.path().join("b.pdf"), "b").expect("write");
        fs::write(tmp.path().join("a.pdf"), "a").expect("write");
        fs::create_dir(tmp.path().join("nested")).expect("mkdir");
        assert_eq!(
            scan_archive(tmp.path()).expect("scan"),
            vec!["a.pdf".to_string(), "b.pdf".to_string()]
        );
    }
}
