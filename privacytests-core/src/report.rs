//! Report assembly and output
//!
//! Wraps the rendered table in the banner, footer and page shell, and writes
//! the result next to its source JSON.
//!
//! Global invariants enforced:
//! - The latest report is replaced atomically
//! - A report is built from exactly one results document

use crate::config::ResolvedConfig;
use crate::html::{escape, render_page, render_table, Page};
use crate::record::ResultsDocument;
use crate::table::build_table;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the always-current report inside the results directory
pub const LATEST_REPORT: &str = "latest.html";

/// Where one report build writes its output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub latest: PathBuf,
    pub per_run: PathBuf,
}

/// `latest.html` in the results directory, plus the input path with `.html`
pub fn output_paths(input: &Path, results_dir: &Path) -> ReportPaths {
    ReportPaths {
        latest: results_dir.join(LATEST_REPORT),
        per_run: input.with_extension("html"),
    }
}

/// The lexicographically last `*.json` file in `dir`
pub fn latest_results_file(dir: &Path) -> Result<PathBuf> {
    let mut names: Vec<String> = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read results directory: {}", dir.display()))?
    {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            if name.ends_with(".json") && entry.path().is_file() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    match names.pop() {
        Some(name) => Ok(dir.join(name)),
        None => anyhow::bail!("no results JSON files found in {}", dir.display()),
    }
}

fn parse_time(time_started: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(time_started)
        .map(|time| time.with_timezone(&Utc))
        .with_context(|| format!("invalid timeStarted: {}", time_started))
}

fn table_title(config: &ResolvedConfig) -> String {
    format!(
        r#"<div class="table-title">{}</div>
  <div class="instructions">(point anywhere for more info)</div>"#,
        escape(&config.table_title)
    )
}

/// Banner, comparison table and footer for one results document
pub fn content(document: &ResultsDocument, json_filename: &str, config: &ResolvedConfig) -> Result<String> {
    let started = parse_time(&document.time_started)?;
    let table = build_table(
        &document.all_tests,
        table_title(config),
        config.logo_base_url.as_deref(),
    );
    debug!(
        columns = table.headers.len().saturating_sub(1),
        rows = table.test_rows().count(),
        "built comparison table"
    );

    let short_revision: String = document.git.chars().take(8).collect();
    Ok(format!(
        r#"<div id="banner"><div>Open-source tests of web browser privacy.</div><div>Updated {date}</div></div>{table}<p class="footer">Tests ran at {ran_at}.
         Source version: <a href="{repo}/tree/{revision}"
    >{short_revision}</a>.
    Raw data in <a href="{json}">JSON</a>.
    </p>"#,
        date = started.format("%Y-%m-%d"),
        table = render_table(&table, "comparison-table"),
        ran_at = started.format("%Y-%m-%d %H:%M:%S UTC"),
        repo = escape(&config.repository_url),
        revision = escape(&document.git),
        short_revision = escape(&short_revision),
        json = escape(json_filename),
    ))
}

/// Complete HTML page for one results document
pub fn render_report(
    document: &ResultsDocument,
    json_filename: &str,
    config: &ResolvedConfig,
) -> Result<String> {
    let body = content(document, json_filename, config)?;
    Ok(render_page(&Page {
        title: &config.title,
        css_files: &config.css_files,
        preview_image_url: &config.preview_image_url,
        content: &body,
    }))
}

/// Write an HTML report with the atomic temp + rename pattern
pub fn write_report(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let temp_path = path.with_extension("html.tmp");
    fs::write(&temp_path, html)
        .with_context(|| format!("Failed to write temporary file: {}", temp_path.display()))?;
    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temporary file to: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(all_tests: serde_json::Value) -> ResultsDocument {
        serde_json::from_value(json!({
            "timeStarted": "2023-06-01T12:34:56.789Z",
            "git": "0123456789abcdef",
            "all_tests": all_tests
        }))
        .unwrap()
    }

    #[test]
    fn test_content_banner_and_footer() {
        let config = ResolvedConfig::defaults().unwrap();
        let html = content(&document(json!([])), "results.json", &config).unwrap();
        assert!(html.contains("<div>Updated 2023-06-01</div>"));
        assert!(html.contains("Tests ran at 2023-06-01 12:34:56 UTC."));
        assert!(html.contains(
            r#"<a href="https://github.com/arthuredelstein/browser-privacy/tree/0123456789abcdef""#
        ));
        assert!(html.contains(">01234567</a>"));
        assert!(html.contains(r#"<a href="results.json">JSON</a>"#));
        assert!(html.contains(r#"<div class="table-title">Desktop Browsers</div>"#));
    }

    #[test]
    fn test_invalid_time_is_an_error() {
        let config = ResolvedConfig::defaults().unwrap();
        let mut doc = document(json!([]));
        doc.time_started = "yesterday".to_string();
        assert!(content(&doc, "results.json", &config).is_err());
    }

    #[test]
    fn test_render_report_is_a_page() {
        let config = ResolvedConfig::defaults().unwrap();
        let html = render_report(&document(json!([])), "results.json", &config).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>PrivacyTests.org</title>"));
        assert!(html.contains(r#"<div id="banner">"#));
    }

    #[test]
    fn test_output_paths() {
        let paths = output_paths(
            Path::new("out/results/2023-06-01T12_34_56.json"),
            Path::new("out/results"),
        );
        assert_eq!(paths.latest, PathBuf::from("out/results/latest.html"));
        assert_eq!(
            paths.per_run,
            PathBuf::from("out/results/2023-06-01T12_34_56.html")
        );
    }

    #[test]
    fn test_latest_results_file_sorts_names() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["2023-01-02.json", "2023-03-01.json", "2023-02-15.json", "latest.html"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        let latest = latest_results_file(dir.path()).unwrap();
        assert_eq!(latest, dir.path().join("2023-03-01.json"));
    }

    #[test]
    fn test_latest_results_file_requires_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        assert!(latest_results_file(dir.path()).is_err());
    }

    #[test]
    fn test_write_report_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("latest.html");
        write_report(&path, "<html></html>").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "<html></html>");
        assert!(!path.with_extension("html.tmp").exists());
    }
}
