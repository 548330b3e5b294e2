//! Trial aggregation - fold repeated runs of one configuration together
//!
//! Global invariants enforced:
//! - Output order is the first-encounter order of identities
//! - Every mergeable value of every counted trial is kept, in input order
//! - A configuration seen once keeps scalar fields
//! - Rows are never added here; the seed trial fixes categories and tests

use crate::category::Category;
use crate::identity::{identity, IdentityKey};
use crate::record::{FieldValue, ResultsDocument, TestOutcome, TestResults, TestRunRecord};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Outcome fields collected across trials instead of overwritten
pub const MERGEABLE_FIELDS: &[&str] = &[
    "passed",
    "testFailed",
    "readSameFirstParty",
    "readDifferentFirstParty",
    "actual_value",
    "desired_value",
    "IsTorExit",
    "cloudflareDoH",
    "nextDoH",
    "result",
    "unsupported",
    "upgraded",
];

pub fn is_mergeable(field: &str) -> bool {
    MERGEABLE_FIELDS.contains(&field)
}

/// One configuration with all of its trials folded into the seed record
#[derive(Debug, Clone)]
pub struct AggregatedRecord {
    pub identity: IdentityKey,
    pub trials: usize,
    pub record: TestRunRecord,
}

/// Group records by identity and merge their mergeable outcome fields
///
/// Records without usable `testResults` are skipped and not counted.
pub fn aggregate(records: &[TestRunRecord]) -> Vec<AggregatedRecord> {
    let mut aggregated: Vec<AggregatedRecord> = Vec::new();
    let mut index: HashMap<IdentityKey, usize> = HashMap::new();

    for (position, record) in records.iter().enumerate() {
        let Some(results) = record.test_results.as_ref() else {
            debug!(position, "skipping record without usable testResults");
            continue;
        };
        let key = identity(record);
        match index.get(&key) {
            Some(&slot) => merge_trial(&mut aggregated[slot], results),
            None => {
                index.insert(key.clone(), aggregated.len());
                aggregated.push(AggregatedRecord {
                    identity: key,
                    trials: 1,
                    record: record.clone(),
                });
            }
        }
    }

    aggregated
}

/// Copy of the document with `all_tests` replaced by one record per configuration
pub fn aggregate_document(document: &ResultsDocument) -> ResultsDocument {
    ResultsDocument {
        time_started: document.time_started.clone(),
        git: document.git.clone(),
        all_tests: aggregate(&document.all_tests)
            .into_iter()
            .map(|entry| entry.record)
            .collect(),
        extra: document.extra.clone(),
    }
}

fn merge_trial(seed: &mut AggregatedRecord, trial: &TestResults) {
    let prior_trials = seed.trials;
    seed.trials += 1;
    let Some(seed_results) = seed.record.test_results.as_mut() else {
        return;
    };

    for category in Category::ALL {
        let Some(seed_tests) = seed_results.category_mut(category) else {
            continue;
        };
        let trial_tests = trial.category(category);
        for (test_name, seed_outcome) in seed_tests.iter_mut() {
            let trial_outcome = trial_tests.and_then(|tests| tests.get(test_name));
            merge_outcome(seed_outcome, trial_outcome, prior_trials);
            if let Some(trial_outcome) = trial_outcome {
                warn_on_divergence(&seed.identity, category, test_name, seed_outcome, trial_outcome);
            }
        }
        if let Some(trial_tests) = trial_tests {
            for test_name in trial_tests.keys().filter(|name| !seed_tests.contains_key(*name)) {
                debug!(
                    configuration = %seed.identity,
                    category = category.key(),
                    test = %test_name,
                    "ignoring test missing from the first trial"
                );
            }
        }
    }
}

fn merge_outcome(seed: &mut TestOutcome, trial: Option<&TestOutcome>, prior_trials: usize) {
    for &field in MERGEABLE_FIELDS {
        let incoming = trial.and_then(|outcome| outcome.get(field));
        match seed.get_mut(field) {
            Some(existing) => existing.push_trial(incoming),
            None if incoming.is_some() => {
                let mut padded = FieldValue::Sequence(vec![Value::Null; prior_trials]);
                padded.push_trial(incoming);
                seed.insert(field, padded);
            }
            None => {}
        }
    }
}

fn warn_on_divergence(
    identity: &IdentityKey,
    category: Category,
    test_name: &str,
    seed: &TestOutcome,
    trial: &TestOutcome,
) {
    for (name, value) in trial.fields().filter(|(name, _)| !is_mergeable(name)) {
        if seed.get(name).is_some_and(|kept| kept != value) {
            warn!(
                configuration = %identity,
                category = category.key(),
                test = test_name,
                field = name,
                "trials disagree on a non-mergeable field; keeping the first trial's value"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> TestRunRecord {
        serde_json::from_value(value).unwrap()
    }

    fn https_trial(browser: &str, passed: bool) -> TestRunRecord {
        record(json!({
            "browser": browser,
            "reportedVersion": "118.0.2",
            "capabilities": {"os": "Windows"},
            "testResults": {
                "supercookies": {},
                "https": {"upgrade": {"passed": passed, "description": "Upgrade to HTTPS"}}
            }
        }))
    }

    fn field<'a>(
        entry: &'a AggregatedRecord,
        category: Category,
        test: &str,
        name: &str,
    ) -> Option<&'a FieldValue> {
        entry
            .record
            .results_for(category)
            .and_then(|tests| tests.get(test))
            .and_then(|outcome| outcome.get(name))
    }

    #[test]
    fn test_single_trial_stays_scalar() {
        let aggregated = aggregate(&[https_trial("firefox", true)]);
        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated[0].trials, 1);
        assert_eq!(
            field(&aggregated[0], Category::Https, "upgrade", "passed"),
            Some(&FieldValue::Scalar(json!(true)))
        );
    }

    #[test]
    fn test_repeated_trials_merge_in_order() {
        let trials = [
            https_trial("firefox", true),
            https_trial("firefox", false),
            https_trial("firefox", true),
        ];
        let aggregated = aggregate(&trials);
        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated[0].trials, 3);
        assert_eq!(
            field(&aggregated[0], Category::Https, "upgrade", "passed"),
            Some(&FieldValue::Sequence(vec![json!(true), json!(false), json!(true)]))
        );
        // Not mergeable: the first trial's value is kept
        assert_eq!(
            field(&aggregated[0], Category::Https, "upgrade", "description"),
            Some(&FieldValue::Scalar(json!("Upgrade to HTTPS")))
        );
    }

    #[test]
    fn test_distinct_identities_keep_first_encounter_order() {
        let trials = [
            https_trial("safari", true),
            https_trial("brave", true),
            https_trial("safari", false),
        ];
        let aggregated = aggregate(&trials);
        let browsers: Vec<&str> = aggregated.iter().map(|a| a.identity.browser.as_str()).collect();
        assert_eq!(browsers, vec!["safari", "brave"]);
        assert_eq!(aggregated[0].trials, 2);
        assert_eq!(aggregated[1].trials, 1);
    }

    #[test]
    fn test_records_without_results_are_not_trials() {
        let broken = record(json!({"browser": "firefox", "reportedVersion": "118.0.2",
                                   "capabilities": {"os": "Windows"}, "testResults": null}));
        let aggregated = aggregate(&[broken, https_trial("firefox", false)]);
        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated[0].trials, 1);
        assert_eq!(
            field(&aggregated[0], Category::Https, "upgrade", "passed"),
            Some(&FieldValue::Scalar(json!(false)))
        );
    }

    #[test]
    fn test_later_only_tests_are_ignored() {
        let mut second = https_trial("firefox", true);
        if let Some(results) = second.test_results.as_mut() {
            results.insert(
                Category::Misc,
                [("gpc".to_string(), TestOutcome::default().with("passed", json!(true)))]
                    .into_iter()
                    .collect(),
            );
        }
        let aggregated = aggregate(&[https_trial("firefox", true), second]);
        assert!(aggregated[0].record.results_for(Category::Misc).is_none());
    }

    #[test]
    fn test_missing_values_keep_positions() {
        let first = record(json!({
            "browser": "chrome",
            "testResults": {"fingerprinting": {"cores": {"expression": "navigator.hardwareConcurrency"}}}
        }));
        let second = record(json!({
            "browser": "chrome",
            "testResults": {"fingerprinting": {"cores": {"actual_value": 8}}}
        }));
        let third = record(json!({
            "browser": "chrome",
            "testResults": {"fingerprinting": {}}
        }));
        let aggregated = aggregate(&[first, second, third]);
        assert_eq!(
            field(&aggregated[0], Category::Fingerprinting, "cores", "actual_value"),
            Some(&FieldValue::Sequence(vec![Value::Null, json!(8), Value::Null]))
        );
        assert_eq!(
            field(&aggregated[0], Category::Fingerprinting, "cores", "passed"),
            None
        );
    }

    #[test]
    fn test_aggregate_document_keeps_metadata() {
        let document = ResultsDocument {
            time_started: "2023-06-01T12:00:00.000Z".to_string(),
            git: "0123456789abcdef".to_string(),
            all_tests: vec![https_trial("brave", true), https_trial("brave", true)],
            extra: serde_json::Map::new(),
        };
        let aggregated = aggregate_document(&document);
        assert_eq!(aggregated.all_tests.len(), 1);
        assert_eq!(aggregated.git, document.git);
        assert_eq!(document.all_tests.len(), 2);
    }
}
