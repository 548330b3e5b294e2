//! Tooltip formatters, one per category shape
//!
//! A `Tooltip` can only be built from plain text and always holds the
//! attribute-escaped form, so its content cannot break the cell markup.

use crate::html::escape;
use crate::record::{FieldValue, TestOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tooltip(String);

impl Tooltip {
    pub fn new(text: &str) -> Self {
        Tooltip(escape(text.trim()))
    }

    /// Escaped text, safe inside a quoted HTML attribute
    pub fn as_attr(&self) -> &str {
        &self.0
    }
}

fn show(outcome: &TestOutcome, field: &str) -> String {
    outcome
        .get(field)
        .map(FieldValue::display)
        .unwrap_or_else(|| "undefined".to_string())
}

/// State partitioning and navigation: what was written and read back
pub fn cross_site(outcome: &TestOutcome) -> Tooltip {
    let text = format!(
        "write: {}\n\n\
         read: {}\n\n\
         result, same first party: {}\n\n\
         result, different first party: {}\n\n\
         unsupported: {}\n\n\
         passed: {}\n\n\
         test failed: {}",
        show(outcome, "write"),
        show(outcome, "read"),
        show(outcome, "readSameFirstParty"),
        show(outcome, "readDifferentFirstParty"),
        show(outcome, "unsupported"),
        show(outcome, "passed"),
        show(outcome, "testFailed"),
    );
    Tooltip::new(&text)
}

/// HTTPS, misc and query parameters: every field but the description
pub fn simple(outcome: &TestOutcome) -> Tooltip {
    let text = outcome
        .fields()
        .filter(|(key, _)| *key != "description")
        .map(|(key, value)| format!("{}: {}", key, value.display()))
        .collect::<Vec<_>>()
        .join("\n");
    Tooltip::new(&text)
}

/// Fingerprinting: measured vs desired expression and value
pub fn fingerprinting(outcome: &TestOutcome) -> Tooltip {
    let worker = outcome.get("worker").is_some_and(FieldValue::is_truthy);
    let text = format!(
        "expression: {}\n\
         desired expression: {}\n\
         actual value: {}\n\
         desired value: {}\n\
         passed: {}\n\
         {}",
        show(outcome, "expression"),
        show(outcome, "desired_expression"),
        show(outcome, "actual_value"),
        show(outcome, "desired_value"),
        show(outcome, "passed"),
        if worker { "[Worker]" } else { "" },
    );
    Tooltip::new(&text)
}
