//! `allockit_io_xlsx` v1:
//! Rust-side XLSX helper kernel.
//!
//! - `conf`   : constants and default format presets
//! - `spec`   : cell values, grids, formats, sheet layouts, reports
//! - `util`   : pure helper functions
//! - `reader` : calamine-backed worksheet reader
//! - `writer` : rust_xlsxwriter-backed layout renderer
pub mod conf;
pub mod reader;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    EnumFmtKey, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    TUP_EXCEL_ILLEGAL, derive_default_xlsx_format, derive_default_xlsx_formats,
};
pub use reader::{read_sheet_grid, read_sheet_grid_from_bytes};
pub use spec::{
    EnumCellValue, SpecCellFormat, SpecPlacedCell, SpecSheetExtent, SpecSheetGrid,
    SpecSheetLayout, SpecXlsxReport,
};
pub use util::{
    derive_column_letter, normalize_cell_value, sanitize_sheet_name, validate_sheet_extent,
    validate_unique_columns,
};
pub use writer::XlsxWriter;
