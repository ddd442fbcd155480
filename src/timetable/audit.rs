use crate::timetable::paths::TimetablePaths;
use crate::timetable::util::now_epoch_secs;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub at_epoch_secs: u64,
    pub at: String,
    pub phase: String,
    pub status: String,
    pub message: String,
}

pub fn append_event(paths: &TimetablePaths, phase: &str, status: &str, message: &str) -> Result<()> {
    fs::create_dir_all(&paths.logs_dir)
        .with_context(|| format!("failed to create {}", paths.logs_dir.display()))?;
    let event = AuditEvent {
        at_epoch_secs: now_epoch_secs()?,
        at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        phase: phase.to_string(),
        status: status.to_string(),
        message: message.to_string(),
    };

    let line = format!("{}\n", serde_json::to_string(&event)?);
    let path = paths.logs_dir.join("audit.log");
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn events_append_as_json_lines() {
        let tmp = tempdir().expect("tempdir");
        let paths = TimetablePaths {
            home: tmp.path().to_path_buf(),
            archive_dir: tmp.path().join("dist"),
            index_file: tmp.path().join("dist/index.md"),
            logs_dir: tmp.path().join("logs"),
            config_file: tmp.path().join("timetable.toml"),
        };

        append_event(&paths, "sync", "changed", "created=1").expect("first");
        append_event(&paths, "sync", "unchanged", "created=0").expect("second");

        let raw = fs::read_to_string(paths.logs_dir.join("audit.log")).expect("read");
        let lines: Vec<serde_json::Value> = raw
            .lines()
            .map(|l| serde_json::from_str(l).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["status"], "changed");
        assert_eq!(lines[1]["message"], "created=0");
        assert!(lines[0]["at"].as_str().expect("at").ends_with('Z'));
    }
}
