//! `allockit_merge` v1:
//! Allocation export consolidation kernel.
//!
//! - `conf`        : fixed column names, labels and master styling presets
//! - `spec`        : options, source/master layouts, error taxonomy
//! - `extract`     : one export grid -> row table + item metadata
//! - `collide`     : first-wins item reference de-duplication across sources
//! - `aggregate`   : union and per-store grouping (polars lazy)
//! - `layout`      : summary block and master sheet plan
//! - `report`      : run counters and warnings
//! - `consolidate` : end-to-end pipeline and workbook output
pub mod aggregate;
pub mod collide;
pub mod conf;
pub mod consolidate;
pub mod extract;
pub mod layout;
pub mod report;
pub mod spec;

#[cfg(test)]
mod testing;

pub use aggregate::{EnumColumnAggRule, SpecAggregated, aggregate_allocations, union_tables};
pub use collide::{SpecCollisionState, SpecResolvedTables, resolve_collisions};
pub use conf::{
    C_MASTER_SHEET_NAME, C_STORE_NUMBER, N_SOURCE_LAYOUT_VERSION, TUP_KEY_COLS,
    TUP_SUMMARY_LABELS,
};
pub use consolidate::{
    SpecAllocationSource, SpecConsolidation, consolidate, consolidate_files, consolidate_to_file,
};
pub use extract::{SpecAllocationMeta, SpecExtractedTable, extract_allocation, parse_store_number};
pub use layout::{SpecSummaryColumn, derive_summary_columns, plan_master_layout};
pub use report::{ReportConsolidate, ReportConsolidateBuilder};
pub use spec::{
    ConsolidateError, EnumKeyConflictPolicy, EnumNullStoreRule, SpecConsolidateOptions,
    SpecMasterLayout, SpecSourceLayout,
};
