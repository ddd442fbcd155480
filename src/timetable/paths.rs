use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct TimetablePaths {
    pub home: PathBuf,
    pub archive_dir: PathBuf,
    pub index_file: PathBuf,
    pub logs_dir: PathBuf,
    pub config_file: PathBuf,
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<TimetablePaths> {
    let cwd = env::current_dir().context("current directory could not be resolved")?;
    let home = env_or_default_path("TIMETABLE_HOME", cwd);

    let archive_dir = env_or_default_path("TIMETABLE_ARCHIVE_DIR", home.join("dist"));
    let index_file = env_or_default_path("TIMETABLE_INDEX_FILE", archive_dir.join("index.md"));
    let logs_dir = env_or_default_path("TIMETABLE_LOGS_DIR", home.join("logs"));
    let config_file = env_or_default_path("TIMETABLE_CONFIG_PATH", home.join("timetable.toml"));

    Ok(TimetablePaths {
        home,
        archive_dir,
        index_file,
        logs_dir,
        config_file,
    })
}
