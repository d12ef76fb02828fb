//! Master sheet plan: annotation, summary block, table styling.
//!
//! Pure functions; rendering goes through [`allockit_io_xlsx::XlsxWriter`].

use std::collections::BTreeMap;

use allockit_io_xlsx::{EnumCellValue, SpecCellFormat, SpecPlacedCell, SpecSheetLayout};
use chrono::NaiveDateTime;
use polars::prelude::{ChunkAgg, DataFrame};

use crate::conf::{
    C_CONSOLIDATED_ON_FMT, TUP_SUMMARY_LABELS, derive_master_annotation_format,
    derive_master_header_format, derive_master_item_body_format, derive_master_key_body_format,
    derive_master_summary_value_format, is_key_col,
};
use crate::extract::SpecAllocationMeta;
use crate::spec::{ConsolidateError, SpecMasterLayout};

/// Derived summary values of one item column.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecSummaryColumn {
    pub item_ref: String,
    /// Zero-based column of the item in the master table.
    pub col_idx: usize,
    pub brief_description: String,
    pub total_allocations: f64,
    pub overs: f64,
    pub total_inc_overs: f64,
}

impl SpecSummaryColumn {
    /// Values in [`TUP_SUMMARY_LABELS`] order.
    pub fn values(&self) -> [EnumCellValue; 4] {
        let brief = if self.brief_description.is_empty() {
            EnumCellValue::None
        } else {
            EnumCellValue::String(self.brief_description.clone())
        };
        [
            brief,
            EnumCellValue::Number(self.total_inc_overs),
            EnumCellValue::Number(self.total_allocations),
            EnumCellValue::Number(self.overs),
        ]
    }
}

/// One summary column per item column of `df_master`, in table order.
///
/// References without metadata get a blank description and 0 overs.
pub fn derive_summary_columns(
    df_master: &DataFrame,
    dict_meta: &BTreeMap<String, SpecAllocationMeta>,
) -> Result<Vec<SpecSummaryColumn>, ConsolidateError> {
    let mut l_summary = Vec::new();
    for (n_idx_col, column) in df_master.get_columns().iter().enumerate() {
        let c_ref = column.name().as_str();
        if is_key_col(c_ref) {
            continue;
        }
        let total_allocations = column.as_materialized_series().f64()?.sum().unwrap_or(0.0);
        let meta = dict_meta.get(c_ref).cloned().unwrap_or_default();
        l_summary.push(SpecSummaryColumn {
            item_ref: c_ref.to_string(),
            col_idx: n_idx_col,
            brief_description: meta.brief_description,
            total_allocations,
            overs: meta.overs,
            total_inc_overs: total_allocations + meta.overs,
        });
    }
    Ok(l_summary)
}

/// Build the rendering plan of the master sheet.
///
/// A zero-column table yields a plan holding only the annotation cell.
pub fn plan_master_layout(
    df_master: &DataFrame,
    summary: &[SpecSummaryColumn],
    consolidated_at: &NaiveDateTime,
    layout: &SpecMasterLayout,
) -> SpecSheetLayout {
    let row_table_header = layout.row_summary_start + TUP_SUMMARY_LABELS.len();
    let mut cells_placed = vec![SpecPlacedCell {
        row_idx: 0,
        col_idx: 0,
        value: EnumCellValue::String(consolidated_at.format(C_CONSOLIDATED_ON_FMT).to_string()),
        fmt: derive_master_annotation_format(),
    }];

    if df_master.width() > 0 {
        let fmt_label = derive_master_header_format();
        let fmt_value = derive_master_summary_value_format();
        for (n_offset, c_label) in TUP_SUMMARY_LABELS.iter().enumerate() {
            let row_idx = layout.row_summary_start + n_offset;
            cells_placed.push(SpecPlacedCell {
                row_idx,
                col_idx: layout.col_labels,
                value: EnumCellValue::String((*c_label).to_string()),
                fmt: fmt_label.clone(),
            });
            for column in summary {
                cells_placed.push(SpecPlacedCell {
                    row_idx,
                    col_idx: column.col_idx,
                    value: column.values()[n_offset].clone(),
                    fmt: fmt_value.clone(),
                });
            }
        }
    }

    let fmts_body_by_col: Vec<SpecCellFormat> = df_master
        .get_column_names_str()
        .into_iter()
        .map(|c_name| {
            if is_key_col(c_name) {
                derive_master_key_body_format()
            } else {
                derive_master_item_body_format()
            }
        })
        .collect();

    SpecSheetLayout {
        sheet_name: layout.sheet_name.clone(),
        cells_placed,
        row_table_header,
        fmt_header: derive_master_header_format(),
        fmts_body_by_col,
        cols_hidden: layout.cols_hidden.clone(),
        width_cols: Some(layout.width_cols),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::{C_LABEL_TOTAL_ALLOCATIONS, C_STORE_NUMBER, TUP_KEY_COLS};
    use chrono::NaiveDate;
    use polars::prelude::Column;

    fn master_frame() -> DataFrame {
        let mut l_columns = vec![Column::new(C_STORE_NUMBER.into(), [1i64, 2])];
        for c_key in TUP_KEY_COLS.iter().skip(1) {
            l_columns.push(Column::new((*c_key).into(), [Some("x"), None::<&str>]));
        }
        l_columns.push(Column::new("REF-A".into(), [Some(3.0), None]));
        l_columns.push(Column::new("REF-B".into(), [2.0, 4.0]));
        DataFrame::new(l_columns).expect("frame")
    }

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(14, 5, 0))
            .expect("timestamp")
    }

    fn placed_at(layout: &SpecSheetLayout, row_idx: usize, col_idx: usize) -> &SpecPlacedCell {
        layout
            .cells_placed
            .iter()
            .find(|cell| cell.row_idx == row_idx && cell.col_idx == col_idx)
            .expect("placed cell")
    }

    #[test]
    fn test_summary_totals_include_overs() {
        let dict_meta = BTreeMap::from([(
            "REF-A".to_string(),
            SpecAllocationMeta {
                brief_description: "Poster".to_string(),
                overs: 10.0,
            },
        )]);

        let l_summary = derive_summary_columns(&master_frame(), &dict_meta).expect("summary");
        assert_eq!(l_summary.len(), 2);
        assert_eq!(l_summary[0].col_idx, 11);
        assert_eq!(l_summary[0].total_allocations, 3.0);
        assert_eq!(l_summary[0].total_inc_overs, 13.0);
        assert_eq!(l_summary[1].brief_description, "");
        assert_eq!(l_summary[1].overs, 0.0);
        for column in &l_summary {
            assert_eq!(column.total_allocations + column.overs, column.total_inc_overs);
        }
    }

    #[test]
    fn test_plan_places_annotation_labels_and_values() {
        let df = master_frame();
        let l_summary = derive_summary_columns(&df, &BTreeMap::new()).expect("summary");
        let layout = plan_master_layout(&df, &l_summary, &stamp(), &SpecMasterLayout::default());

        assert_eq!(layout.sheet_name, "Master Allocation");
        assert_eq!(layout.row_table_header, 5);
        assert_eq!(
            placed_at(&layout, 0, 0).value,
            EnumCellValue::String("Consolidated on 09/03/2024 14:05".to_string())
        );
        assert_eq!(placed_at(&layout, 0, 0).fmt.bold, Some(true));

        let label = placed_at(&layout, 3, 10);
        assert_eq!(
            label.value,
            EnumCellValue::String(C_LABEL_TOTAL_ALLOCATIONS.to_string())
        );
        assert_eq!(label.fmt.bg_color.as_deref(), Some("#F4B084"));
        assert_eq!(placed_at(&layout, 3, 12).value, EnumCellValue::Number(6.0));
        assert_eq!(placed_at(&layout, 1, 11).value, EnumCellValue::None);
        assert_eq!(placed_at(&layout, 2, 11).fmt.align.as_deref(), Some("center"));
        assert_eq!(layout.cells_placed.len(), 1 + 4 * 3);
    }

    #[test]
    fn test_plan_styles_columns() {
        let df = master_frame();
        let layout = plan_master_layout(&df, &[], &stamp(), &SpecMasterLayout::default());

        assert_eq!(layout.fmts_body_by_col.len(), df.width());
        assert_eq!(layout.fmts_body_by_col[0].align, None);
        assert_eq!(layout.fmts_body_by_col[0].border, Some(1));
        assert_eq!(layout.fmts_body_by_col[11].align.as_deref(), Some("center"));
        assert_eq!(layout.fmt_header.bold, Some(true));
        assert_eq!(layout.cols_hidden, (2..=9).collect::<Vec<_>>());
        assert_eq!(layout.width_cols, Some(18.0));
    }

    #[test]
    fn test_plan_for_empty_table_holds_only_annotation() {
        let layout = plan_master_layout(
            &DataFrame::empty(),
            &[],
            &stamp(),
            &SpecMasterLayout::default(),
        );
        assert_eq!(layout.cells_placed.len(), 1);
        assert!(layout.fmts_body_by_col.is_empty());
    }
}
