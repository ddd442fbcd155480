use anyhow::Result;
use std::env;

use crate::commands::CommandReport;
use crate::timetable::config::load_config;
use crate::timetable::paths::resolve_paths;
use crate::timetable::revision_index::{build, scan_archive};

mod generated {
    include!(concat!(env!("OUT_DIR"), "/timetable_env_allowlist.rs"));
}

/// `TIMETABLE_*` variables the binary reads that are set in this process.
pub fn active_env_overrides() -> Vec<&'static str> {
    generated::GENERATED_TIMETABLE_ENV_ALLOWLIST
        .iter()
        .copied()
        .filter(|key| env::var_os(key).is_some_and(|v| !v.is_empty()))
        .collect()
}

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("build_id={}", env!("BUILD_UUID")));
    report.detail(format!("home={}", paths.home.display()));
    report.detail(format!("archive_dir={}", paths.archive_dir.display()));
    report.detail(format!("index_file={}", paths.index_file.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));
    report.detail(format!(
        "config_file={} present={}",
        paths.config_file.display(),
        paths.config_file.is_file()
    ));
    let overrides = active_env_overrides();
    if !overrides.is_empty() {
        report.detail(format!("env_overrides={}", overrides.join(",")));
    }

    let cfg = match load_config(&paths.config_file) {
        Ok(cfg) => cfg,
        Err(err) => {
            report.issue(format!("config invalid: {err:#}"));
            return Ok(report);
        }
    };
    report.detail(format!("listing_url={}", cfg.source.listing_url));
    report.detail(format!(
        "selection={}:{}",
        cfg.selection.mode, cfg.selection.pattern
    ));
    report.detail(format!("groups={}", cfg.index.group_order.join(",")));

    let naming = cfg.naming_scheme()?;
    report.detail(format!("naming={}", naming.as_str()));

    let names = scan_archive(&paths.archive_dir)?;
    report.detail(format!("archive_files={}", names.len()));
    match build(&names, &naming, &cfg.index.group_order) {
        Ok(index) => {
            for group in &index.groups {
                if let Some((period, top)) = group.newest() {
                    report.detail(format!(
                        "latest.{}=period:{:02} revisions:{} file:{}",
                        group.group,
                        period.period,
                        period.revisions.len(),
                        top.file_name
                    ));
                }
            }
        }
        Err(err) => report.issue(format!("{}: {err}", err.code().as_str())),
    }

    report.detail(format!("index_file_present={}", paths.index_file.is_file()));
    Ok(report)
}
