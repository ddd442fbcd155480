use crate::timetable::config::IndexConfig;
use crate::timetable::revision_index::RevisionIndex;
use anyhow::Result;
use reqwest::Url;

/// Relative link to a file in the same directory, percent-encoded as one path
/// segment. Parentheses are encoded too since they end a Markdown link.
fn link_target(file_name: &str) -> String {
    let Ok(mut url) = Url::parse("file:///") else {
        return format!("./{file_name}");
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(file_name);
    }
    let encoded = url
        .path()
        .trim_start_matches('/')
        .replace('(', "%28")
        .replace(')', "%29");
    format!("./{encoded}")
}

pub fn render_markdown(index: &RevisionIndex, labels: &IndexConfig) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", labels.title));

    for group in &index.groups {
        let Some((period, top)) = group.newest() else {
            continue;
        };
        out.push_str(&format!(
            "### [{} {} {} ({} {:02})]({})\n",
            labels.latest_label,
            labels.group_label,
            group.group,
            labels.period_label,
            period.period,
            link_target(&top.file_name)
        ));
    }

    out.push_str("\n---\n");
    out.push_str(&format!("\n# {}\n\n", labels.history_title));
    for group in &index.groups {
        out.push_str(&format!("## {} {}:\n", labels.group_label, group.group));
        for period in &group.periods {
            out.push_str(&format!(
                "- **{} {:02}**:\n",
                labels.period_label, period.period
            ));
            for revision in &period.revisions {
                out.push_str(&format!(
                    "  - [{} {}]({})\n",
                    labels.revision_label,
                    revision.revision,
                    link_target(&revision.file_name)
                ));
            }
        }
        out.push('\n');
    }

    out
}

pub fn render_json(index: &RevisionIndex) -> Result<String> {
    Ok(format!("{}\n", serde_json::to_string_pretty(index)?))
}
