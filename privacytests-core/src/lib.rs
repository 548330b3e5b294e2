//! PrivacyTests core library - turns browser privacy test runs into a comparison report

#![deny(warnings)]

// Global invariants enforced in this crate:
// - The pipeline is pure over in-memory data; only `report` touches the filesystem
// - No global mutable state
// - Deterministic ordering of columns, sections and rows
// - Identical input yields byte-for-byte identical output

pub mod aggregate;
pub mod category;
pub mod config;
pub mod html;
pub mod identity;
pub mod record;
pub mod report;
pub mod table;
pub mod tooltip;

pub use aggregate::{aggregate, aggregate_document, AggregatedRecord};
pub use category::Category;
pub use config::ResolvedConfig;
pub use identity::{identity, IdentityKey};
pub use record::{FieldValue, ResultsDocument, TestOutcome, TestRunRecord};
pub use table::{build_table, Cell, Table, Verdict};

use anyhow::Result;
use tracing::info;

pub struct RenderOptions {
    /// Fold repeated trials of one configuration before building the table
    pub aggregate: bool,
}

/// Run the whole pipeline over one results document and return the HTML page
pub fn render(
    document: &ResultsDocument,
    json_filename: &str,
    config: &ResolvedConfig,
    options: &RenderOptions,
) -> Result<String> {
    info!(records = document.all_tests.len(), aggregate = options.aggregate, "rendering results");
    if options.aggregate {
        let aggregated = aggregate_document(document);
        info!(
            configurations = aggregated.all_tests.len(),
            "aggregated repeated trials"
        );
        report::render_report(&aggregated, json_filename, config)
    } else {
        report::render_report(document, json_filename, config)
    }
}
