//! Comparison table construction
//!
//! Columns are configurations, rows are tests grouped by category. Every
//! pass/fail/unsupported decision is made here so the renderer stays pure.
//!
//! Global invariants enforced:
//! - Sections follow `Category::ALL`, whatever order the input uses
//! - A section's rows are exactly the reference column's tests
//! - Missing cells are `Cell::NoData`, never an error
//! - Any failing trial fails the cell

use crate::category::{Category, Section, WordBreak};
use crate::identity::{describe, ColumnHeader};
use crate::record::{TestOutcome, TestRunRecord};
use crate::tooltip::Tooltip;
use serde_json::Value;
use std::cmp::Ordering;

/// Records lacking this category are not shown as columns
pub const REQUIRED_CATEGORY: Category = Category::Supercookies;

/// Visual verdict for one test on one configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Good,
    Bad,
    Unsupported,
}

impl Verdict {
    pub fn class_name(self) -> &'static str {
        match self {
            Verdict::Good => "good",
            Verdict::Bad => "bad",
            Verdict::Unsupported => "na",
        }
    }
}

/// Classify an outcome; mixed trials resolve pessimistically
pub fn classify(outcome: &TestOutcome) -> Verdict {
    let all_unsupported = outcome
        .get("unsupported")
        .is_some_and(|field| field.all_equal(&Value::Bool(true)));
    if all_unsupported {
        return Verdict::Unsupported;
    }

    let any_failed = outcome
        .get("passed")
        .is_some_and(|field| field.any_equal(&Value::Bool(false)));
    let harness_errored = outcome
        .get("testFailed")
        .is_some_and(|field| field.any_equal(&Value::Bool(true)));
    if any_failed || harness_errored {
        Verdict::Bad
    } else {
        Verdict::Good
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    NoData,
    Status { verdict: Verdict, tooltip: Tooltip },
}

#[derive(Debug, Clone, PartialEq)]
pub enum HeaderCell {
    /// Trusted markup for the corner cell
    Title(String),
    Configuration(ColumnHeader),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestRow {
    pub name: String,
    pub description: String,
    pub word_break: WordBreak,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Subheading {
        title: &'static str,
        description: &'static str,
    },
    Test(TestRow),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<HeaderCell>,
    pub body: Vec<Row>,
}

impl Table {
    /// Data rows only, skipping subheadings
    pub fn test_rows(&self) -> impl Iterator<Item = &TestRow> {
        self.body.iter().filter_map(|row| match row {
            Row::Test(test) => Some(test),
            Row::Subheading { .. } => None,
        })
    }
}

/// Build the comparison table from (possibly aggregated) records
pub fn build_table(records: &[TestRunRecord], title: String, logo_base_url: Option<&str>) -> Table {
    let mut columns: Vec<&TestRunRecord> = records
        .iter()
        .filter(|record| record.results_for(REQUIRED_CATEGORY).is_some())
        .collect();
    columns.sort_by(|a, b| compare_browsers(a.browser_label(), b.browser_label()));

    let mut headers = vec![HeaderCell::Title(title)];
    headers.extend(
        columns
            .iter()
            .map(|record| HeaderCell::Configuration(describe(record, logo_base_url))),
    );

    if columns.is_empty() {
        return Table {
            headers,
            body: Vec::new(),
        };
    }

    let mut body = Vec::new();
    for category in Category::ALL {
        let section = category.section();
        body.push(Row::Subheading {
            title: section.subheading,
            description: section.description,
        });
        body.extend(section_rows(&columns, section).into_iter().map(Row::Test));
    }

    Table { headers, body }
}

fn section_rows(columns: &[&TestRunRecord], section: &Section) -> Vec<TestRow> {
    let category = section.category;
    let Some(reference) = columns.first().and_then(|record| record.results_for(category)) else {
        return Vec::new();
    };

    let mut names: Vec<&String> = reference.keys().collect();
    names.sort_by(|a, b| collate(a, b));

    names
        .into_iter()
        .map(|name| {
            let cells = columns
                .iter()
                .map(|record| {
                    match record.results_for(category).and_then(|tests| tests.get(name)) {
                        Some(outcome) => Cell::Status {
                            verdict: classify(outcome),
                            tooltip: (section.tooltip)(outcome),
                        },
                        None => Cell::NoData,
                    }
                })
                .collect();
            TestRow {
                name: name.clone(),
                description: reference
                    .get(name)
                    .and_then(TestOutcome::description)
                    .unwrap_or_default()
                    .to_string(),
                word_break: section.word_break,
                cells,
            }
        })
        .collect()
}

/// Records without a browser label sort first
fn compare_browsers(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => collate(a, b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Locale-style string ordering
///
/// Primary: punctuation and spaces, then digits, then letters, case folded.
/// Ties prefer lowercase, then fall back to code point order.
pub fn collate(a: &str, b: &str) -> Ordering {
    fn primary(s: &str) -> Vec<(u8, char)> {
        s.chars()
            .map(|c| {
                let class = if c.is_alphabetic() {
                    2
                } else if c.is_numeric() {
                    1
                } else {
                    0
                };
                (class, c.to_lowercase().next().unwrap_or(c))
            })
            .collect()
    }
    fn tertiary(s: &str) -> Vec<bool> {
        s.chars().map(char::is_uppercase).collect()
    }

    primary(a)
        .cmp(&primary(b))
        .then_with(|| tertiary(a).cmp(&tertiary(b)))
        .then_with(|| a.cmp(b))
}
