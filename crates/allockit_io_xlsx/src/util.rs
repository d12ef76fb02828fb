//! Stateless helper utilities used by the XLSX reader and writer kernels.

use std::collections::{BTreeMap, BTreeSet};

use crate::conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
use crate::spec::EnumCellValue;

////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Normalize a value before it is written: non-finite numbers become blank.
pub fn normalize_cell_value(value: &EnumCellValue) -> EnumCellValue {
    match value {
        EnumCellValue::Number(n) if !n.is_finite() => EnumCellValue::None,
        _ => value.clone(),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DataFrameLikeUtils

/// Validate that `columns` has no duplicated names.
pub fn validate_unique_columns(columns: &[String]) -> Result<(), String> {
    if columns.len() == columns.iter().collect::<BTreeSet<_>>().len() {
        return Ok(());
    }

    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name).or_default().push(n_idx);
    }

    let c_msg = dict_pos
        .iter()
        .filter_map(|(c_name, l_pos)| {
            if l_pos.len() > 1 {
                Some(format!(
                    "{c_name:?} x{} at indices {:?}",
                    l_pos.len(),
                    l_pos
                ))
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("; ");

    Err(format!("Duplicate column names detected: {c_msg}"))
}

/// Check that `n_rows` x `n_cols` fits inside one Excel worksheet.
pub fn validate_sheet_extent(n_rows: usize, n_cols: usize) -> Result<(), String> {
    if n_rows > N_NROWS_EXCEL_MAX {
        return Err(format!(
            "Sheet needs {n_rows} rows; Excel allows at most {N_NROWS_EXCEL_MAX}."
        ));
    }
    if n_cols > N_NCOLS_EXCEL_MAX {
        return Err(format!(
            "Sheet needs {n_cols} columns; Excel allows at most {N_NCOLS_EXCEL_MAX}."
        ));
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Create suffixed sheet name (`base__2`, `base__3`, ...), respecting length cap.
pub fn create_sheet_identifier(base_name: &str, part_idx: usize) -> String {
    let c_sheet_name_suffix = format!("__{part_idx}");
    let n_len_base_name_max = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_sheet_name_suffix.len());

    let c_sheet_name_base: String = base_name
        .chars()
        .take(usize::max(1, n_len_base_name_max))
        .collect();

    format!("{c_sheet_name_base}{c_sheet_name_suffix}")
}

/// Convert zero-based column index to Excel letters (0 = A, 26 = AA).
pub fn derive_column_letter(col_idx: usize) -> String {
    let mut c_letters = String::new();
    let mut n = col_idx + 1;
    while n > 0 {
        let n_rem = (n - 1) % 26;
        c_letters.insert(0, (b'A' + n_rem as u8) as char);
        n = (n - 1) / 26;
    }
    c_letters
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_sheet_name_replaces_illegal_and_caps_length() {
        assert_eq!(sanitize_sheet_name("Master/Allocation", "_"), "Master_Allocation");
        assert_eq!(sanitize_sheet_name("   ", "_"), "Sheet");
        assert_eq!(
            sanitize_sheet_name(&"x".repeat(40), "_").len(),
            N_LEN_EXCEL_SHEET_NAME_MAX
        );
    }

    #[test]
    fn test_create_sheet_identifier_keeps_suffix_within_cap() {
        let c_name = create_sheet_identifier(&"y".repeat(40), 2);
        assert_eq!(c_name.len(), N_LEN_EXCEL_SHEET_NAME_MAX);
        assert!(c_name.ends_with("__2"));
    }

    #[test]
    fn test_validate_unique_columns_reports_positions() {
        let cols = vec!["A".to_string(), "B".to_string(), "A".to_string()];
        let err = validate_unique_columns(&cols).unwrap_err();
        assert!(err.contains("\"A\" x2 at indices [0, 2]"));
        assert!(validate_unique_columns(&cols[..2]).is_ok());
    }

    #[test]
    fn test_validate_sheet_extent_limits() {
        assert!(validate_sheet_extent(N_NROWS_EXCEL_MAX, N_NCOLS_EXCEL_MAX).is_ok());
        assert!(validate_sheet_extent(N_NROWS_EXCEL_MAX + 1, 1).is_err());
        assert!(validate_sheet_extent(1, N_NCOLS_EXCEL_MAX + 1).is_err());
    }

    #[test]
    fn test_derive_column_letter() {
        assert_eq!(derive_column_letter(0), "A");
        assert_eq!(derive_column_letter(9), "J");
        assert_eq!(derive_column_letter(25), "Z");
        assert_eq!(derive_column_letter(26), "AA");
        assert_eq!(derive_column_letter(27), "AB");
    }

    #[test]
    fn test_normalize_cell_value_blanks_non_finite() {
        assert_eq!(
            normalize_cell_value(&EnumCellValue::Number(f64::NAN)),
            EnumCellValue::None
        );
        assert_eq!(
            normalize_cell_value(&EnumCellValue::Number(3.0)),
            EnumCellValue::Number(3.0)
        );
    }
}
