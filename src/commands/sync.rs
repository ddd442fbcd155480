use anyhow::Result;
use tracing::{info, warn};

use crate::commands::CommandReport;
use crate::commands::index::{self, IndexFormat};
use crate::timetable::archive::RevisionArchiver;
use crate::timetable::audit;
use crate::timetable::config::{TimetableConfig, load_config};
use crate::timetable::fetch::{Fetcher, HttpFetcher};
use crate::timetable::paths::{TimetablePaths, resolve_paths};
use crate::timetable::sync::{SyncContext, SyncOutcome, run_sync};

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub dry_run: bool,
    pub skip_index: bool,
}

pub fn build_context(
    paths: &TimetablePaths,
    cfg: &TimetableConfig,
    dry_run: bool,
) -> Result<SyncContext> {
    Ok(SyncContext {
        listing_url: cfg.source.listing_url.clone(),
        layout: cfg.listing_layout()?,
        selector: cfg.selector()?,
        archiver: RevisionArchiver::new(&paths.archive_dir, Some(cfg.naming_scheme()?)),
        isolate_failures: cfg.sync.isolate_failures,
        dry_run,
    })
}

fn record(paths: &TimetablePaths, status: &str, message: &str) {
    if let Err(err) = audit::append_event(paths, "sync", status, message) {
        warn!("failed to append audit event: {err:#}");
    }
}

fn summarize(outcome: &SyncOutcome) -> String {
    format!(
        "listing={} matched={} created={} updated={} unchanged={} planned={} failed={}",
        outcome.listing_entries,
        outcome.matched,
        outcome.count("created"),
        outcome.count("updated"),
        outcome.count("unchanged"),
        outcome.count("planned"),
        outcome.count("failed"),
    )
}

pub fn run_with<F: Fetcher + ?Sized>(
    fetcher: &F,
    paths: &TimetablePaths,
    cfg: &TimetableConfig,
    opts: SyncOptions,
) -> Result<CommandReport> {
    let ctx = build_context(paths, cfg, opts.dry_run)?;
    let mut report = CommandReport::new("sync");
    report.detail(format!("listing_url={}", ctx.listing_url));
    report.detail(format!("archive_dir={}", ctx.archiver.archive_dir().display()));
    if opts.dry_run {
        report.detail("dry_run=true");
    }

    let outcome = match run_sync(fetcher, &ctx) {
        Ok(outcome) => outcome,
        Err(err) => {
            if !opts.dry_run {
                record(paths, "failed", &format!("{}: {err}", err.code().as_str()));
            }
            return Err(err.into());
        }
    };

    let summary = summarize(&outcome);
    info!(changes = outcome.any_changes, "{summary}");
    report.detail(summary.clone());
    for entry in &outcome.entries {
        let name = entry.file_name.as_deref().unwrap_or(&entry.link);
        report.detail(format!("{name}: {}", entry.status.label()));
    }
    if opts.dry_run {
        // Nothing was written, so a dry run never signals a change.
        report.detail(format!("planned_changes={}", outcome.any_changes));
    } else {
        report.changed = Some(outcome.any_changes);
    }

    if !opts.dry_run {
        let status = if outcome.any_changes { "changed" } else { "unchanged" };
        record(paths, status, &summary);
    }

    let wants_index = outcome.any_changes
        && !opts.dry_run
        && !opts.skip_index
        && cfg.sync.regenerate_index;
    if wants_index {
        let written = index::regenerate(
            &paths.archive_dir,
            cfg,
            IndexFormat::Markdown,
            &paths.index_file,
        )?;
        report.detail(format!(
            "index_file={} revisions={}",
            written.path.display(),
            written.revisions
        ));
    }

    if let Some(err) = outcome.failure_error() {
        warn!(code = err.code().as_str(), "{err}");
        report.issue(format!("{}: {err}", err.code().as_str()));
    }
    Ok(report)
}

pub fn run(opts: SyncOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths.config_file)?;
    let fetcher = HttpFetcher::new(cfg.source.request_timeout_secs, &cfg.source.user_agent)?;
    run_with(&fetcher, &paths, &cfg, opts)
}
