//! Consolidation options, source layout contract and top-level error types.

use chrono::NaiveDateTime;
use polars::error::PolarsError;
use thiserror::Error;

use crate::conf::{C_MASTER_SHEET_NAME, N_MASTER_COL_WIDTH, N_SOURCE_LAYOUT_VERSION};

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// How descriptive key attributes are reconciled when one store appears in
/// several rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumKeyConflictPolicy {
    /// First non-null value in upload order wins.
    #[default]
    First,
    /// Like `First`, but distinct non-null values for one store fail the run.
    Strict,
}

/// What happens to rows whose store number is missing or non-numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumNullStoreRule {
    /// Remove them before grouping and report the count.
    #[default]
    Drop,
    /// Fail the run.
    Error,
    /// Keep them as one null-keyed store, sorted last.
    Bucket,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region LayoutSpecification

/// Fixed-offset layout of one allocation export (zero-based rows/columns).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSourceLayout {
    /// Layout contract version.
    pub version: u32,
    /// Row holding each item's brief description.
    pub row_description: usize,
    /// Row holding each item's overage quantity.
    pub row_overs: usize,
    /// Row holding column labels; item columns carry their reference here.
    pub row_header: usize,
    /// First data row.
    pub row_data_start: usize,
    /// Width of the leading key-attribute span.
    pub n_key_cols: usize,
}

impl Default for SpecSourceLayout {
    fn default() -> Self {
        Self {
            version: N_SOURCE_LAYOUT_VERSION,
            row_description: 1,
            row_overs: 4,
            row_header: 6,
            row_data_start: 7,
            n_key_cols: 11,
        }
    }
}

impl SpecSourceLayout {
    /// Check internal consistency of the offsets.
    pub fn validate(&self) -> Result<(), String> {
        if self.row_data_start <= self.row_header {
            return Err("row_data_start must be greater than row_header.".to_string());
        }
        if self.row_description >= self.row_header || self.row_overs >= self.row_header {
            return Err("row_description and row_overs must sit above row_header.".to_string());
        }
        if self.n_key_cols == 0 {
            return Err("n_key_cols must be >= 1.".to_string());
        }
        Ok(())
    }
}

/// Placement of the master sheet parts (zero-based rows/columns).
#[derive(Debug, Clone, PartialEq)]
pub struct SpecMasterLayout {
    /// Output worksheet name.
    pub sheet_name: String,
    /// First summary row; the annotation sits on the row above.
    pub row_summary_start: usize,
    /// Column holding the summary labels; item values start right after it.
    pub col_labels: usize,
    /// Columns hidden from view.
    pub cols_hidden: Vec<usize>,
    /// Uniform column width.
    pub width_cols: f64,
}

impl Default for SpecMasterLayout {
    fn default() -> Self {
        Self {
            sheet_name: C_MASTER_SHEET_NAME.to_string(),
            row_summary_start: 1,
            col_labels: 10,
            cols_hidden: (2..=9).collect(),
            width_cols: N_MASTER_COL_WIDTH,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region OptionsAndErrors

/// Input options for [`crate::consolidate`].
#[derive(Debug, Clone, Default)]
pub struct SpecConsolidateOptions {
    /// Source export layout contract.
    pub layout_source: SpecSourceLayout,
    /// Output sheet placement.
    pub layout_master: SpecMasterLayout,
    /// Key attribute reconciliation policy.
    pub rule_key_conflict: EnumKeyConflictPolicy,
    /// Null store-number handling.
    pub rule_null_store: EnumNullStoreRule,
    /// Fixed consolidation timestamp; local "now" when `None`.
    pub consolidated_at: Option<NaiveDateTime>,
}

/// Fatal consolidation failures; no output is produced.
#[derive(Error, Debug)]
pub enum ConsolidateError {
    #[error("Failed to read allocation export {name}: {message}")]
    ReadFailed { name: String, message: String },

    #[error("Could not find a 'Store Number' column in {name}.")]
    MissingStoreNumberColumn { name: String },

    #[error("Allocation export {name} does not match source layout v{version}: {message}")]
    LayoutMismatch {
        name: String,
        version: u32,
        message: String,
    },

    #[error("Invalid source layout: {0}")]
    InvalidLayout(String),

    #[error("{n_rows} row(s) in {name} have a missing or non-numeric store number.")]
    NullStoreNumber { name: String, n_rows: usize },

    #[error("Store {store_number} has conflicting values for '{column}'.")]
    KeyConflict { store_number: String, column: String },

    #[error("Failed to write consolidated workbook: {0}")]
    WriteFailed(String),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
