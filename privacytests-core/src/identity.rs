//! Record normalization - which trials measured the same configuration
//!
//! Harness versions and remote-browser providers report the same attribute
//! under different keys. Each attribute is resolved through an ordered alias
//! list; the first present, truthy value wins.
//!
//! Global invariants enforced:
//! - `identity` never fails; unresolved dimensions become `"???"`
//! - Key order inside `capabilities` or `prefs` has no effect on the key
//! - Versions are compared at major.minor granularity

use crate::record::{display_value, is_truthy, TestRunRecord};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Placeholder for an attribute no alias could resolve
pub const UNKNOWN: &str = "???";

/// Preference keys that do not change privacy behavior
pub const IGNORED_PREFS: &[&str] = &["extensions.torlauncher.prompt_at_startup"];

/// Where an attribute may be found on a record
#[derive(Debug, Clone, Copy)]
enum Source {
    Browser,
    ReportedVersion,
    Capability(&'static str),
}

impl Source {
    fn lookup(self, record: &TestRunRecord) -> Option<&Value> {
        match self {
            Source::Browser => record.browser.as_ref(),
            Source::ReportedVersion => record.reported_version.as_ref(),
            Source::Capability(key) => record.capabilities.get(key),
        }
    }
}

const BROWSER_NAME: &[Source] = &[
    Source::Browser,
    Source::Capability("browserName"),
    Source::Capability("browser"),
];

const BROWSER_VERSION: &[Source] = &[
    Source::ReportedVersion,
    Source::Capability("browserVersion"),
    Source::Capability("version"),
    Source::Capability("browser_version"),
];

const PLATFORM_NAME: &[Source] = &[
    Source::Capability("platformName"),
    Source::Capability("os"),
    Source::Capability("platform"),
];

const PLATFORM_VERSION: &[Source] = &[
    Source::Capability("platformVersion"),
    Source::Capability("os_version"),
];

fn resolve(record: &TestRunRecord, sources: &[Source]) -> Option<String> {
    sources
        .iter()
        .filter_map(|source| source.lookup(record))
        .find(|value| is_truthy(value))
        .map(display_value)
}

/// Keep only major.minor: "120.0.6099.109" -> "120.0"
pub fn drop_micro_version(version: &str) -> String {
    version.split('.').take(2).collect::<Vec<_>>().join(".")
}

/// The derived key that identifies one browser configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct IdentityKey {
    pub browser: String,
    pub version: String,
    pub platform: String,
    pub platform_version: String,
    pub prefs: BTreeMap<String, String>,
    pub incognito: bool,
    pub tor: bool,
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} on {}", self.browser, self.version, self.platform)?;
        if !self.platform_version.is_empty() {
            write!(f, " {}", self.platform_version)?;
        }
        if !self.prefs.is_empty() {
            let prefs: Vec<String> = self
                .prefs
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect();
            write!(f, " [{}]", prefs.join(", "))?;
        }
        if self.incognito {
            write!(f, " private")?;
        }
        if self.tor {
            write!(f, " Tor")?;
        }
        Ok(())
    }
}

/// Derive the identity key of a record
pub fn identity(record: &TestRunRecord) -> IdentityKey {
    IdentityKey {
        browser: resolve(record, BROWSER_NAME).unwrap_or_else(|| UNKNOWN.to_string()),
        version: short_version(record),
        platform: resolve(record, PLATFORM_NAME).unwrap_or_else(|| UNKNOWN.to_string()),
        platform_version: resolve(record, PLATFORM_VERSION).unwrap_or_default(),
        prefs: relevant_prefs(record),
        incognito: record.is_incognito(),
        tor: record.is_tor(),
    }
}

fn short_version(record: &TestRunRecord) -> String {
    resolve(record, BROWSER_VERSION)
        .map(|version| drop_micro_version(&version))
        .filter(|version| !version.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn relevant_prefs(record: &TestRunRecord) -> BTreeMap<String, String> {
    record
        .prefs
        .iter()
        .flatten()
        .filter(|(key, _)| !IGNORED_PREFS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), display_value(value)))
        .collect()
}

/// What a column header shows for one configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnHeader {
    pub logo: Option<String>,
    pub browser: String,
    pub version: String,
    /// Extra lines: sorted preferences, then "private" and "Tor" markers
    pub details: Vec<String>,
}

/// Describe a record for its column header
///
/// The logo URL is only built when a base URL is configured and the record
/// carries a top-level browser label, which is the name logo assets use.
pub fn describe(record: &TestRunRecord, logo_base_url: Option<&str>) -> ColumnHeader {
    let key = identity(record);
    let logo = logo_base_url
        .zip(record.browser_label())
        .map(|(base, browser)| {
            format!(
                "{}/{browser}/{browser}_128x128.png",
                base.trim_end_matches('/'),
                browser = browser
            )
        });

    let mut details: Vec<String> = key
        .prefs
        .iter()
        .map(|(pref, value)| format!("{}: {}", pref, value))
        .collect();
    if key.incognito {
        details.push("private".to_string());
    }
    if key.tor {
        details.push("Tor".to_string());
    }

    ColumnHeader {
        logo,
        browser: key.browser,
        version: key.version,
        details,
    }
}
