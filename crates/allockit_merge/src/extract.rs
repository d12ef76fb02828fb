//! Record extraction: one allocation export grid into a row table plus
//! per-item metadata.

use std::collections::{BTreeMap, BTreeSet};

use allockit_io_xlsx::{EnumCellValue, SpecSheetGrid};
use polars::prelude::{Column, DataFrame};

use crate::conf::{C_STORE_NUMBER, TUP_KEY_COLS};
use crate::spec::{ConsolidateError, SpecSourceLayout};

/// Metadata of one item column, read from the fixed header rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecAllocationMeta {
    /// Brief description; empty when the source cell is blank.
    pub brief_description: String,
    /// Overage quantity; 0 when blank or non-numeric.
    pub overs: f64,
}

/// Output of [`extract_allocation`] for one source.
#[derive(Debug, Clone)]
pub struct SpecExtractedTable {
    /// Source name used in messages.
    pub name: String,
    /// Key columns (canonical names) followed by item columns.
    pub df_rows: DataFrame,
    /// Item references in source column order.
    pub l_item_refs: Vec<String>,
    /// Item reference -> metadata.
    pub dict_meta: BTreeMap<String, SpecAllocationMeta>,
    /// Data rows whose store number is missing or non-numeric.
    pub n_rows_store_null: usize,
    /// Non-fatal notices raised while reading this source.
    pub warnings: Vec<String>,
}

/// Parse one allocation export.
///
/// Fails when the grid does not reach the header row or when no label on the
/// header row reads "store number" (trimmed, case-insensitive).
pub fn extract_allocation(
    name: &str,
    grid: &SpecSheetGrid,
    layout: &SpecSourceLayout,
) -> Result<SpecExtractedTable, ConsolidateError> {
    layout.validate().map_err(ConsolidateError::InvalidLayout)?;
    if grid.row(layout.row_header).is_none() {
        return Err(ConsolidateError::LayoutMismatch {
            name: name.to_string(),
            version: layout.version,
            message: format!(
                "header row {} is missing (sheet has {} rows)",
                layout.row_header + 1,
                grid.height()
            ),
        });
    }

    let l_labels: Vec<String> = (0..grid.width())
        .map(|n_idx_col| {
            grid.get(layout.row_header, n_idx_col)
                .to_text()
                .map(|c_label| c_label.trim().to_string())
                .unwrap_or_default()
        })
        .collect();

    let Some(n_col_store) = find_label(&l_labels, C_STORE_NUMBER) else {
        return Err(ConsolidateError::MissingStoreNumberColumn {
            name: name.to_string(),
        });
    };

    let mut warnings = Vec::new();
    let mut l_key_positions: Vec<Option<usize>> = Vec::with_capacity(TUP_KEY_COLS.len());
    for c_key in TUP_KEY_COLS {
        let n_pos = if c_key == C_STORE_NUMBER {
            Some(n_col_store)
        } else {
            find_label(&l_labels, c_key)
        };
        if n_pos.is_none() {
            warnings.push(format!("{name}: column '{c_key}' not found; left blank."));
        }
        l_key_positions.push(n_pos);
    }
    let set_key_positions: BTreeSet<usize> = l_key_positions.iter().flatten().copied().collect();

    let l_rows_data: Vec<usize> = (layout.row_data_start..grid.height())
        .filter(|n_idx_row| {
            grid.row(*n_idx_row)
                .is_some_and(|row| row.iter().any(|cell| !cell.is_blank()))
        })
        .collect();

    let l_store_numbers: Vec<Option<i64>> = l_rows_data
        .iter()
        .map(|n_idx_row| parse_store_number(grid.get(*n_idx_row, n_col_store)))
        .collect();
    let n_rows_store_null = l_store_numbers.iter().filter(|v| v.is_none()).count();

    let mut l_columns = Vec::with_capacity(grid.width());
    l_columns.push(Column::new(C_STORE_NUMBER.into(), l_store_numbers));
    for (c_key, n_pos) in TUP_KEY_COLS.iter().zip(&l_key_positions).skip(1) {
        let l_values: Vec<Option<String>> = l_rows_data
            .iter()
            .map(|n_idx_row| match n_pos {
                Some(n_idx_col) => parse_key_text(grid.get(*n_idx_row, *n_idx_col)),
                None => None,
            })
            .collect();
        l_columns.push(Column::new((*c_key).into(), l_values));
    }

    let mut l_item_refs = Vec::new();
    let mut dict_meta = BTreeMap::new();
    for n_idx_col in layout.n_key_cols..grid.width() {
        let c_ref = &l_labels[n_idx_col];
        if c_ref.is_empty() || set_key_positions.contains(&n_idx_col) {
            continue;
        }
        if TUP_KEY_COLS.contains(&c_ref.as_str()) || dict_meta.contains_key(c_ref) {
            warnings.push(format!(
                "{name}: reference '{c_ref}' repeated in column {}; first column kept.",
                n_idx_col + 1
            ));
            continue;
        }

        let l_values: Vec<Option<f64>> = l_rows_data
            .iter()
            .map(|n_idx_row| grid.get(*n_idx_row, n_idx_col).to_f64())
            .collect();
        l_columns.push(Column::new(c_ref.as_str().into(), l_values));

        dict_meta.insert(
            c_ref.clone(),
            SpecAllocationMeta {
                brief_description: grid
                    .get(layout.row_description, n_idx_col)
                    .to_text()
                    .unwrap_or_default(),
                overs: grid.get(layout.row_overs, n_idx_col).to_f64().unwrap_or(0.0),
            },
        );
        l_item_refs.push(c_ref.clone());
    }

    let df_rows = DataFrame::new(l_columns)?;
    tracing::debug!(
        source = name,
        n_rows = df_rows.height(),
        n_items = l_item_refs.len(),
        n_rows_store_null,
        "extracted allocation export"
    );

    Ok(SpecExtractedTable {
        name: name.to_string(),
        df_rows,
        l_item_refs,
        dict_meta,
        n_rows_store_null,
        warnings,
    })
}

fn find_label(labels: &[String], name: &str) -> Option<usize> {
    labels
        .iter()
        .position(|c_label| c_label.to_lowercase() == name.to_lowercase())
}

/// Integral numbers (or text holding one) become the store identity.
pub fn parse_store_number(value: &EnumCellValue) -> Option<i64> {
    let n_value = value.to_f64()?;
    if n_value.fract() != 0.0 || n_value.abs() >= 9.0e15 {
        return None;
    }
    Some(n_value as i64)
}

fn parse_key_text(value: &EnumCellValue) -> Option<String> {
    if value.is_blank() {
        return None;
    }
    value.to_text()
}
