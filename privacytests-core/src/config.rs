//! Configuration file support for report rendering
//!
//! Loads presentation settings from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.privacytestsrc.json` in the working directory
//! 3. `privacytests.config.json` in the working directory
//! 4. `"privacytests"` key in `package.json`
//!
//! All fields are optional. CLI flags take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_TITLE: &str = "PrivacyTests.org";
const DEFAULT_TABLE_TITLE: &str = "Desktop Browsers";
const DEFAULT_CSS_FILES: &[&str] = &["./template.css", "./inline.css"];
const DEFAULT_PREVIEW_IMAGE_URL: &str = "/preview1.png";
const DEFAULT_REPOSITORY_URL: &str = "https://github.com/arthuredelstein/browser-privacy";
const DEFAULT_RESULTS_DIR: &str = "./out/results";

/// Report configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrivacyTestsConfig {
    /// Page title (default: "PrivacyTests.org")
    #[serde(default)]
    pub title: Option<String>,

    /// Heading in the table's corner cell (default: "Desktop Browsers")
    #[serde(default)]
    pub table_title: Option<String>,

    /// Stylesheets linked from the page head
    #[serde(default)]
    pub css_files: Option<Vec<String>>,

    /// Social preview image
    #[serde(default)]
    pub preview_image_url: Option<String>,

    /// Repository the footer's source revision links into
    #[serde(default)]
    pub repository_url: Option<String>,

    /// Directory holding results JSON files and `latest.html`
    #[serde(default)]
    pub results_dir: Option<PathBuf>,

    /// Base URL of browser logo images; no logos when unset
    #[serde(default)]
    pub logo_base_url: Option<String>,
}

/// Configuration with every default filled in
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub title: String,
    pub table_title: String,
    pub css_files: Vec<String>,
    pub preview_image_url: String,
    pub repository_url: String,
    pub results_dir: PathBuf,
    pub logo_base_url: Option<String>,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl PrivacyTestsConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(ref title) = self.title {
            if title.trim().is_empty() {
                anyhow::bail!("title must not be empty");
            }
        }

        if let Some(ref dir) = self.results_dir {
            if dir.as_os_str().is_empty() {
                anyhow::bail!("results_dir must not be empty");
            }
        }

        if let Some(ref url) = self.repository_url {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                anyhow::bail!("repository_url must be an http(s) URL (got {})", url);
            }
        }

        if let Some(ref files) = self.css_files {
            if files.iter().any(|f| f.trim().is_empty()) {
                anyhow::bail!("css_files must not contain empty entries");
            }
        }

        Ok(())
    }

    /// Resolve config into its final form
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        Ok(ResolvedConfig {
            title: self
                .title
                .clone()
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            table_title: self
                .table_title
                .clone()
                .unwrap_or_else(|| DEFAULT_TABLE_TITLE.to_string()),
            css_files: self.css_files.clone().unwrap_or_else(|| {
                DEFAULT_CSS_FILES.iter().map(|f| f.to_string()).collect()
            }),
            preview_image_url: self
                .preview_image_url
                .clone()
                .unwrap_or_else(|| DEFAULT_PREVIEW_IMAGE_URL.to_string()),
            repository_url: self
                .repository_url
                .as_deref()
                .unwrap_or(DEFAULT_REPOSITORY_URL)
                .trim_end_matches('/')
                .to_string(),
            results_dir: self
                .results_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR)),
            logo_base_url: self.logo_base_url.clone(),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        PrivacyTestsConfig::default().resolve()
    }
}

/// Discover and load a config file from the project root
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(project_root: &Path) -> Result<Option<(PrivacyTestsConfig, PathBuf)>> {
    for name in [".privacytestsrc.json", "privacytests.config.json"] {
        let path = project_root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }

    let pkg_path = project_root.join("package.json");
    if pkg_path.exists() {
        if let Some(config) = load_from_package_json(&pkg_path)? {
            return Ok(Some((config, pkg_path)));
        }
    }

    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<PrivacyTestsConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: PrivacyTestsConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load config from the "privacytests" key in package.json
fn load_from_package_json(path: &Path) -> Result<Option<PrivacyTestsConfig>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let pkg: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    match pkg.get("privacytests") {
        Some(value) => {
            let config: PrivacyTestsConfig = serde_json::from_value(value.clone())
                .with_context(|| format!("invalid privacytests config in {}", path.display()))?;
            config
                .validate()
                .with_context(|| format!("invalid privacytests config in {}", path.display()))?;
            Ok(Some(config))
        }
        None => Ok(None),
    }
}

/// Load and resolve config for a project
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config from the project root.
/// Returns default config if nothing is found.
pub fn load_and_resolve(project_root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(project_root)? {
            Some((config, path)) => (config, Some(path)),
            None => (PrivacyTestsConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config_is_valid() {
        let resolved = ResolvedConfig::defaults().expect("default config should resolve");
        assert_eq!(resolved.title, "PrivacyTests.org");
        assert_eq!(resolved.table_title, "Desktop Browsers");
        assert_eq!(resolved.css_files, vec!["./template.css", "./inline.css"]);
        assert_eq!(resolved.preview_image_url, "/preview1.png");
        assert_eq!(resolved.results_dir, PathBuf::from("./out/results"));
        assert!(resolved.logo_base_url.is_none());
        assert!(resolved.config_path.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "title": "Mobile",
            "table_title": "Mobile Browsers",
            "css_files": ["./mobile.css"],
            "preview_image_url": "/preview2.png",
            "repository_url": "https://github.com/example/privacy/",
            "results_dir": "out/mobile",
            "logo_base_url": "/logos"
        }"#;
        let config: PrivacyTestsConfig = serde_json::from_str(json).unwrap();
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.title, "Mobile");
        assert_eq!(resolved.css_files, vec!["./mobile.css"]);
        assert_eq!(resolved.repository_url, "https://github.com/example/privacy");
        assert_eq!(resolved.results_dir, PathBuf::from("out/mobile"));
        assert_eq!(resolved.logo_base_url.as_deref(), Some("/logos"));
    }

    #[test]
    fn test_reject_unknown_fields() {
        let json = r#"{"unknown_field": true}"#;
        let result: Result<PrivacyTestsConfig, _> = serde_json::from_str(json);
        assert!(result.is_err(), "unknown fields should be rejected");
    }

    #[test]
    fn test_reject_empty_title() {
        let config: PrivacyTestsConfig = serde_json::from_str(r#"{"title": "  "}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_non_http_repository() {
        let config: PrivacyTestsConfig =
            serde_json::from_str(r#"{"repository_url": "git@github.com:x/y.git"}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_discover_rc_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(".privacytestsrc.json");
        fs::write(&config_path, r#"{"title": "Nightly"}"#).unwrap();

        let (config, path) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.title.as_deref(), Some("Nightly"));
        assert_eq!(path, config_path);
    }

    #[test]
    fn test_discover_package_json_key() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name": "browser-privacy", "privacytests": {"results_dir": "results"}}"#,
        )
        .unwrap();

        let resolved = load_and_resolve(dir.path(), None).unwrap();
        assert_eq!(resolved.results_dir, PathBuf::from("results"));
        assert_eq!(resolved.config_path, Some(dir.path().join("package.json")));
    }

    #[test]
    fn test_package_json_without_key_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name": "x"}"#).unwrap();
        let resolved = load_and_resolve(dir.path(), None).unwrap();
        assert!(resolved.config_path.is_none());
        assert_eq!(resolved.title, "PrivacyTests.org");
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(load_and_resolve(dir.path(), Some(&missing)).is_err());
    }
}
