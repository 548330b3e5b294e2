//! Results document model
//!
//! Mirrors the JSON written by the in-browser test harness. Only the fields the
//! pipeline reads are typed; every other key round-trips through `extra`.
//!
//! Global invariants enforced:
//! - Values read from JSON are always `FieldValue::Scalar`
//! - Only the trial aggregator produces `FieldValue::Sequence`
//! - A `testResults` that is not an object deserializes to `None`, never an error
//! - Inside it, only the malformed categories or tests are dropped

use crate::category::Category;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// A complete results file: one run of the suite over every configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsDocument {
    pub time_started: String,
    #[serde(default)]
    pub git: String,
    #[serde(default, rename = "all_tests")]
    pub all_tests: Vec<TestRunRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResultsDocument {
    /// Read and parse a results document from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read results file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("failed to parse results file: {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("results document is not valid JSON")
    }
}

/// One browser/configuration measurement session (a single trial)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_version: Option<Value>,
    #[serde(default, deserialize_with = "object_or_empty")]
    pub capabilities: Map<String, Value>,
    #[serde(
        default,
        deserialize_with = "object_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub prefs: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incognito: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tor: Option<Value>,
    #[serde(
        default,
        deserialize_with = "lenient_results",
        skip_serializing_if = "Option::is_none"
    )]
    pub test_results: Option<TestResults>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TestRunRecord {
    /// Top-level browser label as reported by the harness, if it is a string
    pub fn browser_label(&self) -> Option<&str> {
        self.browser.as_ref().and_then(Value::as_str)
    }

    /// Results for one category, if the record carries any
    pub fn results_for(&self, category: Category) -> Option<&CategoryResults> {
        self.test_results
            .as_ref()
            .and_then(|results| results.category(category))
    }

    pub fn is_incognito(&self) -> bool {
        self.incognito == Some(Value::Bool(true))
    }

    pub fn is_tor(&self) -> bool {
        self.tor == Some(Value::Bool(true))
    }
}

fn object_or_empty<'de, D: Deserializer<'de>>(d: D) -> Result<Map<String, Value>, D::Error> {
    Ok(object_or_none(d)?.unwrap_or_default())
}

fn object_or_none<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<Map<String, Value>>, D::Error> {
    match Value::deserialize(d)? {
        Value::Object(map) => Ok(Some(map)),
        _ => Ok(None),
    }
}

fn lenient_results<'de, D: Deserializer<'de>>(d: D) -> Result<Option<TestResults>, D::Error> {
    match Value::deserialize(d)? {
        Value::Object(categories) => Ok(Some(TestResults::from_lenient(categories))),
        _ => Ok(None),
    }
}

/// Test name -> outcome for one category
pub type CategoryResults = BTreeMap<String, TestOutcome>;

/// Category name -> results for a single record
///
/// Unknown categories are kept so a re-serialized document loses nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestResults(pub BTreeMap<String, CategoryResults>);

impl TestResults {
    pub fn category(&self, category: Category) -> Option<&CategoryResults> {
        self.0.get(category.key())
    }

    pub fn category_mut(&mut self, category: Category) -> Option<&mut CategoryResults> {
        self.0.get_mut(category.key())
    }

    pub fn insert(&mut self, category: Category, tests: CategoryResults) {
        self.0.insert(category.key().to_string(), tests);
    }

    /// Keep every category and test that is an object; drop the rest
    fn from_lenient(categories: Map<String, Value>) -> Self {
        let mut results = BTreeMap::new();
        for (name, tests) in categories {
            if Category::from_key(&name).is_none() {
                debug!(category = %name, "keeping unknown results category");
            }
            let Value::Object(tests) = tests else {
                debug!(category = %name, "dropping malformed results category");
                continue;
            };
            let outcomes: CategoryResults = tests
                .into_iter()
                .filter_map(|(test, outcome)| match outcome {
                    Value::Object(fields) => Some((test, TestOutcome::from(fields))),
                    _ => {
                        debug!(category = %name, test = %test, "dropping malformed test outcome");
                        None
                    }
                })
                .collect();
            results.insert(name, outcomes);
        }
        TestResults(results)
    }
}

/// Result of one test in one category
///
/// Field order follows the source JSON, which the simple tooltip relies on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct TestOutcome {
    fields: Vec<(String, FieldValue)>,
}

impl TestOutcome {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        self.fields
            .iter_mut()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Replace an existing field in place, or append a new one
    pub fn insert(&mut self, name: &str, value: FieldValue) {
        match self.get_mut(name) {
            Some(existing) => *existing = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    /// Builder-style insert of a scalar, handy for fixtures
    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.insert(name, FieldValue::Scalar(value));
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn description(&self) -> Option<&str> {
        match self.get("description") {
            Some(FieldValue::Scalar(Value::String(text))) => Some(text),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for TestOutcome {
    fn from(map: Map<String, Value>) -> Self {
        TestOutcome {
            fields: map
                .into_iter()
                .map(|(key, value)| (key, FieldValue::Scalar(value)))
                .collect(),
        }
    }
}

impl From<TestOutcome> for Map<String, Value> {
    fn from(outcome: TestOutcome) -> Self {
        outcome
            .fields
            .into_iter()
            .map(|(key, value)| (key, value.into_value()))
            .collect()
    }
}

/// An outcome field: a single trial's value, or the ordered values of
/// several trials of the same configuration
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Value),
    Sequence(Vec<Value>),
}

impl FieldValue {
    /// Per-trial values; a scalar is a one-trial view
    pub fn values(&self) -> &[Value] {
        match self {
            FieldValue::Scalar(value) => std::slice::from_ref(value),
            FieldValue::Sequence(values) => values,
        }
    }

    pub fn all_equal(&self, expected: &Value) -> bool {
        self.values().iter().all(|value| value == expected)
    }

    pub fn any_equal(&self, expected: &Value) -> bool {
        self.values().iter().any(|value| value == expected)
    }

    pub fn is_truthy(&self) -> bool {
        self.values().iter().any(is_truthy)
    }

    /// Widen to a sequence and append one more trial (`null` when absent)
    pub fn push_trial(&mut self, incoming: Option<&FieldValue>) {
        let mut values = match std::mem::replace(self, FieldValue::Sequence(Vec::new())) {
            FieldValue::Scalar(value) => vec![value],
            FieldValue::Sequence(values) => values,
        };
        match incoming {
            Some(field) => values.extend(field.values().iter().cloned()),
            None => values.push(Value::Null),
        }
        *self = FieldValue::Sequence(values);
    }

    /// Human-readable form; sequences are joined in trial order
    pub fn display(&self) -> String {
        match self {
            FieldValue::Scalar(value) => display_value(value),
            FieldValue::Sequence(values) => values
                .iter()
                .map(display_value)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            FieldValue::Scalar(value) => value,
            FieldValue::Sequence(values) => Value::Array(values),
        }
    }
}

/// Render a JSON value the way it reads in a tooltip or column header
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(text) => text.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Harness-style truthiness: `null`, `false`, `0` and `""` are falsy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_preserves_field_order() {
        let outcome: TestOutcome =
            serde_json::from_value(json!({"zeta": 1, "alpha": 2, "mid": 3})).unwrap();
        let keys: Vec<&str> = outcome.fields().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_json_array_reads_as_scalar() {
        let outcome: TestOutcome = serde_json::from_value(json!({"result": [1, 2]})).unwrap();
        assert_eq!(
            outcome.get("result"),
            Some(&FieldValue::Scalar(json!([1, 2])))
        );
    }

    #[test]
    fn test_malformed_results_become_none() {
        let record: TestRunRecord =
            serde_json::from_value(json!({"browser": "chrome", "testResults": "oops"})).unwrap();
        assert!(record.test_results.is_none());

        let record: TestRunRecord = serde_json::from_value(json!({"browser": "chrome"})).unwrap();
        assert!(record.test_results.is_none());
    }

    #[test]
    fn test_malformed_category_is_dropped_alone() {
        let record: TestRunRecord = serde_json::from_value(json!({
            "browser": "firefox",
            "testResults": {
                "supercookies": {"localStorage": {"passed": true}, "broken": "n/a"},
                "query": null,
                "https": 4,
                "extras": {"someTest": {"passed": false}}
            }
        }))
        .unwrap();
        let results = record.test_results.as_ref().unwrap();

        let supercookies = results.category(Category::Supercookies).unwrap();
        assert_eq!(
            supercookies.keys().collect::<Vec<_>>(),
            vec!["localStorage"]
        );
        assert!(results.category(Category::Query).is_none());
        assert!(results.category(Category::Https).is_none());
        assert!(results.0.contains_key("extras"));
    }

    #[test]
    fn test_unknown_record_fields_round_trip() {
        let input = json!({
            "browser": "firefox",
            "capabilities": {"os": "Windows"},
            "timeStarted": "2023-01-01T00:00:00.000Z",
            "testResults": {"https": {"upgrade": {"passed": true}}}
        });
        let record: TestRunRecord = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(
            record.extra.get("timeStarted"),
            Some(&json!("2023-01-01T00:00:00.000Z"))
        );
        assert_eq!(serde_json::to_value(&record).unwrap(), input);
    }

    #[test]
    fn test_sequence_serializes_as_array() {
        let mut outcome = TestOutcome::default().with("passed", json!(true));
        if let Some(field) = outcome.get_mut("passed") {
            field.push_trial(Some(&FieldValue::Scalar(json!(false))));
        }
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"passed": [true, false]})
        );
    }

    #[test]
    fn test_push_trial_pads_missing_with_null() {
        let mut field = FieldValue::Scalar(json!("a"));
        field.push_trial(None);
        assert_eq!(field, FieldValue::Sequence(vec![json!("a"), Value::Null]));
    }

    #[test]
    fn test_display_joins_sequences() {
        let field = FieldValue::Sequence(vec![json!(true), json!(false)]);
        assert_eq!(field.display(), "true, false");
        assert_eq!(display_value(&json!(["x", 1])), "x,1");
        assert_eq!(display_value(&json!("plain")), "plain");
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!("0")));
        assert!(is_truthy(&json!(2)));
    }

    #[test]
    fn test_incognito_requires_literal_true() {
        let record: TestRunRecord =
            serde_json::from_value(json!({"incognito": "yes", "tor": true})).unwrap();
        assert!(!record.is_incognito());
        assert!(record.is_tor());
    }
}
