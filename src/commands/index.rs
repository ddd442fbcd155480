use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::commands::CommandReport;
use crate::timetable::config::{TimetableConfig, load_config};
use crate::timetable::paths::{TimetablePaths, resolve_paths};
use crate::timetable::render::{render_json, render_markdown};
use crate::timetable::revision_index::{build, scan_archive};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexFormat {
    #[default]
    Markdown,
    Json,
}

#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    pub format: IndexFormat,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct IndexWriteOutcome {
    pub path: PathBuf,
    pub groups: usize,
    pub revisions: usize,
}

fn default_output(paths: &TimetablePaths, format: IndexFormat) -> PathBuf {
    match format {
        IndexFormat::Markdown => paths.index_file.clone(),
        IndexFormat::Json => paths.index_file.with_extension("json"),
    }
}

/// Rebuilds the index from the archive directory and writes it to `output`.
pub fn regenerate(
    archive_dir: &Path,
    cfg: &TimetableConfig,
    format: IndexFormat,
    output: &Path,
) -> Result<IndexWriteOutcome> {
    let names = scan_archive(archive_dir)?;
    let naming = cfg.naming_scheme()?;
    let index = build(&names, &naming, &cfg.index.group_order)?;

    let rendered = match format {
        IndexFormat::Markdown => render_markdown(&index, &cfg.index),
        IndexFormat::Json => render_json(&index)?,
    };
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(output, rendered).with_context(|| format!("failed to write {}", output.display()))?;
    info!(
        path = %output.display(),
        groups = index.groups.len(),
        revisions = index.revision_count(),
        "wrote revision index"
    );

    Ok(IndexWriteOutcome {
        path: output.to_path_buf(),
        groups: index.groups.len(),
        revisions: index.revision_count(),
    })
}

pub fn run(opts: &IndexOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths.config_file)?;
    let mut report = CommandReport::new("index");

    report.detail(format!("archive_dir={}", paths.archive_dir.display()));
    if !paths.archive_dir.exists() {
        report.issue("archive dir does not exist");
        return Ok(report);
    }

    let output = opts
        .output
        .clone()
        .unwrap_or_else(|| default_output(&paths, opts.format));
    let written = regenerate(&paths.archive_dir, &cfg, opts.format, &output)?;
    report.detail(format!("index_file={}", written.path.display()));
    report.detail(format!("groups={}", written.groups));
    report.detail(format!("revisions={}", written.revisions));
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn regenerate_writes_markdown_from_archive_names() {
        let tmp = tempdir().expect("tempdir");
        let archive = tmp.path().join("dist");
        fs::create_dir_all(&archive).expect("mkdir");
        for name in [
            "US_IT_2024_Sommer_FIAE_D_2024_abKW10.pdf",
            "US_IT_2024_Sommer_FIAE_D_2024_abKW10_00.pdf",
            "US_IT_2024_Sommer_FIAE_E_2024_abKW11.pdf",
            "notes.txt",
        ] {
            fs::write(archive.join(name), name).expect("seed");
        }
        let output = archive.join("index.md");

        let written = regenerate(
            &archive,
            &TimetableConfig::default(),
            IndexFormat::Markdown,
            &output,
        )
        .expect("regenerate");
        assert_eq!(written.groups, 2);
        assert_eq!(written.revisions, 3);

        let raw = fs::read_to_string(&output).expect("read index");
        assert!(raw.contains(
            "### [Aktuellster Plan Kurs D (KW 10)](./US_IT_2024_Sommer_FIAE_D_2024_abKW10.pdf)"
        ));
        assert!(raw.contains("  - [Revision 1](./US_IT_2024_Sommer_FIAE_D_2024_abKW10.pdf)"));
        assert!(raw.contains("  - [Revision 0](./US_IT_2024_Sommer_FIAE_D_2024_abKW10_00.pdf)"));
        assert!(!raw.contains("notes.txt"));

        // A second pass sees its own index file and ignores it.
        let again = regenerate(
            &archive,
            &TimetableConfig::default(),
            IndexFormat::Markdown,
            &output,
        )
        .expect("regenerate again");
        assert_eq!(again.revisions, 3);
        assert_eq!(fs::read_to_string(&output).expect("read index"), raw);
    }

    #[test]
    fn json_format_defaults_next_to_the_markdown_index() {
        let tmp = tempdir().expect("tempdir");
        let paths = TimetablePaths {
            home: tmp.path().to_path_buf(),
            archive_dir: tmp.path().join("dist"),
            index_file: tmp.path().join("dist/index.md"),
            logs_dir: tmp.path().join("logs"),
            config_file: tmp.path().join("timetable.toml"),
        };
        assert_eq!(
            default_output(&paths, IndexFormat::Json),
            tmp.path().join("dist/index.json")
        );
        assert_eq!(default_output(&paths, IndexFormat::Markdown), paths.index_file);
    }
}
