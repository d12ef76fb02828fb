//! Fixed column names, labels and layout presets of allocation exports.

use allockit_io_xlsx::{EnumFmtKey, SpecCellFormat, derive_default_xlsx_format};

/// Identity column of every allocation export.
pub const C_STORE_NUMBER: &str = "Store Number";

/// Store key attributes, in sheet order.
pub const TUP_KEY_COLS: [&str; 11] = [
    C_STORE_NUMBER,
    "Store Name",
    "Address Line 1",
    "Address Line 2",
    "City or Town",
    "County",
    "Country",
    "Post Code",
    "Region / Area",
    "Location Type",
    "Trading Format",
];

pub const C_LABEL_BRIEF_DESCRIPTION: &str = "Brief Description";
pub const C_LABEL_TOTAL_INC_OVERS: &str = "Total (inc Overs)";
pub const C_LABEL_TOTAL_ALLOCATIONS: &str = "Total Allocations";
pub const C_LABEL_OVERS: &str = "Overs";

/// Summary rows written above the master table, top to bottom.
pub const TUP_SUMMARY_LABELS: [&str; 4] = [
    C_LABEL_BRIEF_DESCRIPTION,
    C_LABEL_TOTAL_INC_OVERS,
    C_LABEL_TOTAL_ALLOCATIONS,
    C_LABEL_OVERS,
];

/// Version of the fixed-offset source layout understood by the extractor.
pub const N_SOURCE_LAYOUT_VERSION: u32 = 1;

/// Output worksheet name.
pub const C_MASTER_SHEET_NAME: &str = "Master Allocation";
/// Orange header fill.
pub const C_HEADER_FILL: &str = "#F4B084";
/// Uniform column width of the master sheet.
pub const N_MASTER_COL_WIDTH: f64 = 18.0;

/// `strftime` pattern of the annotation cell.
pub const C_CONSOLIDATED_ON_FMT: &str = "Consolidated on %d/%m/%Y %H:%M";
/// `strftime` pattern of the default output file name.
pub const C_FILE_NAME_FMT: &str = "Consolidated_Allocation_%Y%m%d_%H%M.xlsx";

/// `true` if `name` is one of the store key attributes.
pub fn is_key_col(name: &str) -> bool {
    TUP_KEY_COLS.contains(&name)
}

/// Header style shared by summary cells and the table header row.
pub fn derive_master_header_format() -> SpecCellFormat {
    derive_default_xlsx_format(EnumFmtKey::Header).with_(SpecCellFormat {
        bg_color: Some(C_HEADER_FILL.to_string()),
        ..Default::default()
    })
}

/// Summary value cells: header style, centered.
pub fn derive_master_summary_value_format() -> SpecCellFormat {
    derive_master_header_format().with_(SpecCellFormat {
        align: Some("center".to_string()),
        ..Default::default()
    })
}

/// Body cells of key-attribute columns.
pub fn derive_master_key_body_format() -> SpecCellFormat {
    derive_default_xlsx_format(EnumFmtKey::Text)
}

/// Body cells of item columns.
pub fn derive_master_item_body_format() -> SpecCellFormat {
    derive_default_xlsx_format(EnumFmtKey::Number)
}

/// Annotation cell (consolidation timestamp).
pub fn derive_master_annotation_format() -> SpecCellFormat {
    derive_default_xlsx_format(EnumFmtKey::Annotation)
}
