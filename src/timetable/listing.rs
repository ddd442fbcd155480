use crate::timetable::selector::CandidateEntry;
use anyhow::{Context, Result, anyhow};
use reqwest::Url;
use scraper::{Html, Selector as CssSelector};
use tracing::{debug, warn};

/// CSS selectors locating entries on the listing page.
#[derive(Debug, Clone)]
pub struct ListingLayout {
    item: CssSelector,
    label: CssSelector,
    link: CssSelector,
}

fn parse_css(kind: &str, css: &str) -> Result<CssSelector> {
    CssSelector::parse(css).map_err(|err| anyhow!("invalid {kind} selector `{css}`: {err}"))
}

impl ListingLayout {
    pub fn new(item: &str, label: &str, link: &str) -> Result<Self> {
        Ok(Self {
            item: parse_css("item", item)?,
            label: parse_css("label", label)?,
            link: parse_css("link", link)?,
        })
    }
}

fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Items missing a label or a link are skipped.
pub fn parse_listing(html: &str, layout: &ListingLayout) -> Vec<CandidateEntry> {
    let document = Html::parse_document(html);
    let mut entries = Vec::new();

    for (position, item) in document.select(&layout.item).enumerate() {
        let label = item
            .select(&layout.label)
            .next()
            .map(|el| normalize_whitespace(&el.text().collect::<String>()))
            .filter(|label| !label.is_empty());
        let link = item
            .select(&layout.link)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty());

        match (label, link) {
            (Some(label), Some(link)) => entries.push(CandidateEntry::new(label, link)),
            (label, link) => {
                warn!(
                    position,
                    has_label = label.is_some(),
                    has_link = link.is_some(),
                    "skipping incomplete listing item"
                );
            }
        }
    }

    debug!(entries = entries.len(), "parsed listing");
    entries
}

pub fn resolve_link(listing_url: &str, link: &str) -> Result<Url> {
    let base = Url::parse(listing_url)
        .with_context(|| format!("invalid listing url `{listing_url}`"))?;
    base.join(link)
        .with_context(|| format!("cannot resolve link `{link}` against {listing_url}"))
}

/// Last path segment of a link, used as the canonical archive file name.
pub fn file_name_from_link(link: &str) -> Option<String> {
    let path = link.split(['?', '#']).next().unwrap_or_default();
    let name = path.rsplit('/').next().unwrap_or_default().trim();
    if name.is_empty() || name == "." || name == ".." || name.contains('\\') {
        return None;
    }
    Some(name.to_string())
}
