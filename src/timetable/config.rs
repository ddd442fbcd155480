use crate::error::SyncError;
use crate::timetable::listing::ListingLayout;
use crate::timetable::naming::NamingScheme;
use crate::timetable::selector::Selector;
use anyhow::{Result, anyhow};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

pub const DEFAULT_LISTING_URL: &str = "https://service.viona24.com/stpusnl/";
pub const DEFAULT_SELECTION_PATTERN: &str = "US IT 2024 Sommer FIAE [DE]";
pub const DEFAULT_NAMING_PATTERN: &str = r"^US_IT_2024_Sommer_FIAE_(?P<group>[DE])_2024_abKW(?P<period>\d{2})(?:_(?P<revision>\d+))?\.pdf$";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub listing_url: String,
    pub item_selector: String,
    pub label_selector: String,
    pub link_selector: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            item_selector: "ul#thelist li".to_string(),
            label_selector: "span.name".to_string(),
            link_selector: "a[href]".to_string(),
            request_timeout_secs: 30,
            user_agent: format!("timetable-archive/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// `regex` or `substring`.
    pub mode: String,
    pub pattern: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            mode: "regex".to_string(),
            pattern: DEFAULT_SELECTION_PATTERN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    pub pattern: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_NAMING_PATTERN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub group_order: Vec<String>,
    pub title: String,
    pub latest_label: String,
    pub history_title: String,
    pub group_label: String,
    pub period_label: String,
    pub revision_label: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            group_order: vec!["D".to_string(), "E".to_string()],
            title: "Stundenpläne".to_string(),
            latest_label: "Aktuellster Plan".to_string(),
            history_title: "Historie der Stundenpläne".to_string(),
            group_label: "Kurs".to_string(),
            period_label: "KW".to_string(),
            revision_label: "Revision".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Keep processing other entries after one entry fails.
    pub isolate_failures: bool,
    pub regenerate_index: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            isolate_failures: false,
            regenerate_index: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TimetableConfig {
    pub source: SourceConfig,
    pub selection: SelectionConfig,
    pub naming: NamingConfig,
    pub index: IndexConfig,
    pub sync: SyncConfig,
}

impl TimetableConfig {
    pub fn selector(&self) -> Result<Selector> {
        Selector::from_config(&self.selection.mode, &self.selection.pattern)
    }

    pub fn naming_scheme(&self) -> Result<NamingScheme> {
        NamingScheme::new(&self.naming.pattern)
    }

    pub fn listing_layout(&self) -> Result<ListingLayout> {
        ListingLayout::new(
            &self.source.item_selector,
            &self.source.label_selector,
            &self.source.link_selector,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialTimetableConfig {
    source: Option<SourceConfig>,
    selection: Option<SelectionConfig>,
    naming: Option<NamingConfig>,
    index: Option<IndexConfig>,
    sync: Option<SyncConfig>,
}

type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn env_or_string(lookup: EnvLookup, var: &str, fallback: &str) -> String {
    match lookup(var) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_or_u64(lookup: EnvLookup, var: &str, fallback: u64) -> u64 {
    match lookup(var) {
        Some(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        None => fallback,
    }
}

fn env_or_bool(lookup: EnvLookup, var: &str, fallback: bool) -> bool {
    match lookup(var) {
        Some(v) => match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "on" => true,
            "0" | "false" | "FALSE" | "no" | "off" => false,
            _ => fallback,
        },
        None => fallback,
    }
}

fn env_or_csv(lookup: EnvLookup, var: &str, fallback: &[String]) -> Vec<String> {
    match lookup(var) {
        Some(v) => {
            let out = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>();
            if out.is_empty() {
                fallback.to_vec()
            } else {
                out
            }
        }
        None => fallback.to_vec(),
    }
}

fn validate(cfg: &TimetableConfig) -> Result<()> {
    let url = cfg.source.listing_url.trim();
    if url.is_empty() {
        return Err(anyhow!("invalid listing url: cannot be empty"));
    }
    Url::parse(url).map_err(|err| anyhow!("invalid listing url `{url}`: {err}"))?;
    if cfg.source.request_timeout_secs == 0 {
        return Err(anyhow!("invalid request timeout: must be >= 1 second"));
    }
    if cfg.selection.pattern.trim().is_empty() {
        return Err(anyhow!("invalid selection pattern: cannot be empty"));
    }
    cfg.selector()?;
    cfg.naming_scheme()?;
    cfg.listing_layout()?;
    if cfg.index.group_order.iter().any(|g| g.trim().is_empty()) {
        return Err(anyhow!("invalid group order: group codes cannot be empty"));
    }
    Ok(())
}

fn merge_file_config(base: &mut TimetableConfig, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: PartialTimetableConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse timetable config {}: {err}", path.display()))?;
    if let Some(source) = parsed.source {
        base.source = source;
    }
    if let Some(selection) = parsed.selection {
        base.selection = selection;
    }
    if let Some(naming) = parsed.naming {
        base.naming = naming;
    }
    if let Some(index) = parsed.index {
        base.index = index;
    }
    if let Some(sync) = parsed.sync {
        base.sync = sync;
    }
    Ok(())
}

fn apply_env_overrides(cfg: &mut TimetableConfig, lookup: EnvLookup) {
    cfg.source.listing_url = env_or_string(lookup, "TIMETABLE_LISTING_URL", &cfg.source.listing_url);
    cfg.source.item_selector =
        env_or_string(lookup, "TIMETABLE_ITEM_SELECTOR", &cfg.source.item_selector);
    cfg.source.label_selector =
        env_or_string(lookup, "TIMETABLE_LABEL_SELECTOR", &cfg.source.label_selector);
    cfg.source.link_selector =
        env_or_string(lookup, "TIMETABLE_LINK_SELECTOR", &cfg.source.link_selector);
    cfg.source.request_timeout_secs = env_or_u64(
        lookup,
        "TIMETABLE_REQUEST_TIMEOUT_SECS",
        cfg.source.request_timeout_secs,
    );
    cfg.source.user_agent = env_or_string(lookup, "TIMETABLE_USER_AGENT", &cfg.source.user_agent);
    cfg.selection.mode = env_or_string(lookup, "TIMETABLE_SELECTION_MODE", &cfg.selection.mode);
    cfg.selection.pattern =
        env_or_string(lookup, "TIMETABLE_SELECTION_PATTERN", &cfg.selection.pattern);
    cfg.naming.pattern = env_or_string(lookup, "TIMETABLE_NAMING_PATTERN", &cfg.naming.pattern);
    cfg.index.group_order = env_or_csv(lookup, "TIMETABLE_GROUPS", &cfg.index.group_order);
    cfg.sync.isolate_failures = env_or_bool(
        lookup,
        "TIMETABLE_ISOLATE_FAILURES",
        cfg.sync.isolate_failures,
    );
    cfg.sync.regenerate_index = env_or_bool(
        lookup,
        "TIMETABLE_REGENERATE_INDEX",
        cfg.sync.regenerate_index,
    );
}

fn load_config_with(config_path: &Path, lookup: EnvLookup) -> Result<TimetableConfig> {
    let mut cfg = TimetableConfig::default();
    merge_file_config(&mut cfg, config_path)?;
    apply_env_overrides(&mut cfg, lookup);
    validate(&cfg).map_err(|err| SyncError::InvalidConfig(format!("{err:#}")))?;
    Ok(cfg)
}

pub fn load_config(config_path: &Path) -> Result<TimetableConfig> {
    load_config_with(config_path, &|var| env::var(var).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SyncErrorCode, sync_error_code};
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    #[test]
    fn defaults_are_valid_without_a_file() {
        let tmp = tempdir().expect("tempdir");
        let cfg = load_config_with(&tmp.path().join("timetable.toml"), &lookup_from(&[]))
            .expect("config");
        assert_eq!(cfg.source.listing_url, DEFAULT_LISTING_URL);
        assert_eq!(cfg.index.group_order, vec!["D", "E"]);
        assert!(!cfg.sync.isolate_failures);
        assert!(cfg.sync.regenerate_index);
    }

    #[test]
    fn file_sections_merge_and_keep_field_defaults() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("timetable.toml");
        fs::write(
            &path,
            "[selection]\nmode = \"substring\"\npattern = \"FIAE D\"\n\n[sync]\nisolate_failures = true\n",
        )
        .expect("write config");

        let cfg = load_config_with(&path, &lookup_from(&[])).expect("config");
        assert_eq!(cfg.selection.mode, "substring");
        assert_eq!(cfg.selection.pattern, "FIAE D");
        assert!(cfg.sync.isolate_failures);
        assert!(cfg.sync.regenerate_index);
        assert_eq!(cfg.source.item_selector, "ul#thelist li");
    }

    #[test]
    fn env_overrides_win_over_file() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("timetable.toml");
        fs::write(&path, "[source]\nlisting_url = \"https://file.example.test/\"\n")
            .expect("write config");

        let cfg = load_config_with(
            &path,
            &lookup_from(&[
                ("TIMETABLE_LISTING_URL", " https://env.example.test/list/ "),
                ("TIMETABLE_GROUPS", "E, D ,"),
                ("TIMETABLE_ISOLATE_FAILURES", "yes"),
                ("TIMETABLE_REQUEST_TIMEOUT_SECS", "not-a-number"),
            ]),
        )
        .expect("config");
        assert_eq!(cfg.source.listing_url, "https://env.example.test/list/");
        assert_eq!(cfg.index.group_order, vec!["E", "D"]);
        assert!(cfg.sync.isolate_failures);
        assert_eq!(cfg.source.request_timeout_secs, 30);
    }

    #[test]
    fn invalid_values_are_reported_as_config_errors() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("timetable.toml");
        for vars in [
            vec![("TIMETABLE_LISTING_URL", "not a url")],
            vec![("TIMETABLE_SELECTION_PATTERN", "[DE")],
            vec![("TIMETABLE_NAMING_PATTERN", r"^(?P<group>\w)\.pdf$")],
            vec![("TIMETABLE_REQUEST_TIMEOUT_SECS", "0")],
            vec![("TIMETABLE_ITEM_SELECTOR", "ul#")],
        ] {
            let err = load_config_with(&path, &lookup_from(&vars)).expect_err("invalid");
            assert_eq!(
                sync_error_code(&err),
                Some(SyncErrorCode::E008InvalidConfig),
                "{vars:?}"
            );
        }
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("timetable.toml");
        fs::write(&path, "[source\nlisting_url = 1").expect("write config");
        assert!(load_config_with(&path, &lookup_from(&[])).is_err());
    }
}
