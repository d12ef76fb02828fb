//! Consolidation report model and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;

/// Counters and non-fatal notices of one consolidation run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReportConsolidate {
    /// Number of sources read.
    pub cnt_sources: u64,
    /// Data rows read across all sources.
    pub cnt_rows_read: u64,
    /// Item columns in the master table.
    pub cnt_items: u64,
    /// Store rows in the master table.
    pub cnt_stores: u64,
    /// Rows removed for a missing store number.
    pub cnt_rows_store_null_dropped: u64,
    /// References dropped because an earlier source already had them (sorted).
    pub refs_duplicate: Vec<String>,
    /// Non-fatal warnings in the order they were raised.
    pub warnings: Vec<String>,
}

impl ReportConsolidate {
    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Success line shown to the user.
    pub fn summary(&self) -> String {
        format!(
            "Consolidated {} lines × {} stores.",
            self.cnt_items, self.cnt_stores
        )
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_sources".to_string(), self.cnt_sources);
        dict_counts.insert("cnt_rows_read".to_string(), self.cnt_rows_read);
        dict_counts.insert("cnt_items".to_string(), self.cnt_items);
        dict_counts.insert("cnt_stores".to_string(), self.cnt_stores);
        dict_counts.insert(
            "cnt_rows_store_null_dropped".to_string(),
            self.cnt_rows_store_null_dropped,
        );
        dict_counts.insert(
            "cnt_refs_duplicate".to_string(),
            self.refs_duplicate.len() as u64,
        );
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} sources={} rows={} items={} stores={} duplicates={} dropped={} warnings={}",
            dict_counts["cnt_sources"],
            dict_counts["cnt_rows_read"],
            dict_counts["cnt_items"],
            dict_counts["cnt_stores"],
            dict_counts["cnt_refs_duplicate"],
            dict_counts["cnt_rows_store_null_dropped"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportConsolidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[CONSOLIDATE]"))
    }
}

/// Mutable accumulator filled while the pipeline runs.
#[derive(Debug, Default, Clone)]
pub struct ReportConsolidateBuilder {
    /// See [`ReportConsolidate::cnt_sources`].
    pub cnt_sources: u64,
    /// See [`ReportConsolidate::cnt_rows_read`].
    pub cnt_rows_read: u64,
    /// See [`ReportConsolidate::cnt_rows_store_null_dropped`].
    pub cnt_rows_store_null_dropped: u64,
    /// See [`ReportConsolidate::refs_duplicate`].
    pub refs_duplicate: Vec<String>,
    /// See [`ReportConsolidate::warnings`].
    pub warnings: Vec<String>,
}

impl ReportConsolidateBuilder {
    /// Count one source and its data rows.
    pub fn add_source(&mut self, n_rows: usize) {
        self.cnt_sources += 1;
        self.cnt_rows_read += n_rows as u64;
    }

    /// Add warning message.
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Record cross-source duplicates; one warning lists them all.
    pub fn add_refs_duplicate(&mut self, refs: &[String]) {
        if refs.is_empty() {
            return;
        }
        self.warnings.push(format!(
            "Duplicate brief reference(s) ignored: {}",
            refs.join(", ")
        ));
        self.refs_duplicate.extend(refs.iter().cloned());
    }

    /// Record rows dropped for a missing store number.
    pub fn add_rows_store_null_dropped(&mut self, n_rows: usize) {
        if n_rows == 0 {
            return;
        }
        self.cnt_rows_store_null_dropped += n_rows as u64;
        self.warnings.push(format!(
            "{n_rows} row(s) without a valid store number were dropped."
        ));
    }

    /// Finalize builder with the master table shape.
    pub fn build(self, n_items: usize, n_stores: usize) -> ReportConsolidate {
        ReportConsolidate {
            cnt_sources: self.cnt_sources,
            cnt_rows_read: self.cnt_rows_read,
            cnt_items: n_items as u64,
            cnt_stores: n_stores as u64,
            cnt_rows_store_null_dropped: self.cnt_rows_store_null_dropped,
            refs_duplicate: self.refs_duplicate,
            warnings: self.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_consolidate_to_dict_and_format() {
        let mut builder = ReportConsolidateBuilder::default();
        builder.add_source(4);
        builder.add_source(3);
        builder.add_refs_duplicate(&["A".to_string(), "B".to_string()]);
        builder.add_rows_store_null_dropped(1);
        let report = builder.build(5, 6);

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_sources"], 2);
        assert_eq!(dict_counts["cnt_rows_read"], 7);
        assert_eq!(dict_counts["cnt_refs_duplicate"], 2);
        assert_eq!(dict_counts["cnt_warnings"], 2);

        assert_eq!(
            report.warnings[0],
            "Duplicate brief reference(s) ignored: A, B"
        );
        assert_eq!(report.summary(), "Consolidated 5 lines × 6 stores.");

        let txt = report.format("[CONSOLIDATE]");
        assert_eq!(
            txt,
            "[CONSOLIDATE] sources=2 rows=7 items=5 stores=6 duplicates=2 dropped=1 warnings=2"
        );
        assert_eq!(report.to_string(), txt);
    }

    #[test]
    fn report_builder_skips_empty_notices() {
        let mut builder = ReportConsolidateBuilder::default();
        builder.add_refs_duplicate(&[]);
        builder.add_rows_store_null_dropped(0);
        let report = builder.build(0, 0);
        assert!(report.warnings.is_empty());
        assert_eq!(report.summary(), "Consolidated 0 lines × 0 stores.");
    }
}
