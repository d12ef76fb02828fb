//! Test fixtures: allocation export grids in source layout v1.

use allockit_io_xlsx::{EnumCellValue, SpecSheetGrid};
use polars::prelude::DataFrame;

use crate::conf::TUP_KEY_COLS;
use crate::spec::SpecSourceLayout;

pub(crate) struct GridBuilder {
    store_label: String,
    l_items: Vec<(String, String, Option<f64>)>,
    l_rows: Vec<Option<(EnumCellValue, String, Vec<EnumCellValue>)>>,
}

impl GridBuilder {
    pub(crate) fn new() -> Self {
        Self {
            store_label: TUP_KEY_COLS[0].to_string(),
            l_items: Vec::new(),
            l_rows: Vec::new(),
        }
    }

    pub(crate) fn store_label(mut self, label: &str) -> Self {
        self.store_label = label.to_string();
        self
    }

    pub(crate) fn item(mut self, reference: &str, description: &str, overs: Option<f64>) -> Self {
        self.l_items
            .push((reference.to_string(), description.to_string(), overs));
        self
    }

    pub(crate) fn store(self, store_number: i64, store_name: &str, qty: &[Option<f64>]) -> Self {
        let l_values = qty
            .iter()
            .map(|v| v.map_or(EnumCellValue::None, EnumCellValue::Number))
            .collect();
        self.store_raw(
            EnumCellValue::Number(store_number as f64),
            store_name,
            l_values,
        )
    }

    pub(crate) fn store_raw(
        mut self,
        store_number: EnumCellValue,
        store_name: &str,
        values: Vec<EnumCellValue>,
    ) -> Self {
        self.l_rows
            .push(Some((store_number, store_name.to_string(), values)));
        self
    }

    pub(crate) fn blank_row(mut self) -> Self {
        self.l_rows.push(None);
        self
    }

    pub(crate) fn build(self) -> SpecSheetGrid {
        let layout = SpecSourceLayout::default();
        let n_width = layout.n_key_cols + self.l_items.len();
        let mut l_rows = vec![vec![EnumCellValue::None; n_width]; layout.row_data_start];

        l_rows[0][0] = EnumCellValue::String("Allocation export".to_string());
        for (n_idx_col, c_key) in TUP_KEY_COLS.iter().enumerate() {
            l_rows[layout.row_header][n_idx_col] = EnumCellValue::String(c_key.to_string());
        }
        l_rows[layout.row_header][0] = EnumCellValue::String(self.store_label.clone());

        for (n_idx_item, (c_ref, c_desc, n_overs)) in self.l_items.iter().enumerate() {
            let n_idx_col = layout.n_key_cols + n_idx_item;
            l_rows[layout.row_description][n_idx_col] = text(c_desc);
            l_rows[layout.row_overs][n_idx_col] =
                n_overs.map_or(EnumCellValue::None, EnumCellValue::Number);
            l_rows[layout.row_header][n_idx_col] = text(c_ref);
        }

        for row in self.l_rows {
            let mut l_cells = vec![EnumCellValue::None; n_width];
            if let Some((store_number, store_name, values)) = row {
                l_cells[0] = store_number;
                l_cells[1] = text(&store_name);
                l_cells[10] = text("Convenience");
                for (n_idx_item, value) in values.into_iter().enumerate() {
                    l_cells[layout.n_key_cols + n_idx_item] = value;
                }
            }
            l_rows.push(l_cells);
        }

        SpecSheetGrid::from_rows("Allocation", l_rows)
    }
}

fn text(value: &str) -> EnumCellValue {
    if value.is_empty() {
        EnumCellValue::None
    } else {
        EnumCellValue::String(value.to_string())
    }
}

pub(crate) fn read_i64s(df: &DataFrame, name: &str) -> Vec<Option<i64>> {
    df.column(name)
        .expect("column")
        .as_materialized_series()
        .i64()
        .expect("i64 column")
        .into_iter()
        .collect()
}

pub(crate) fn read_f64s(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .expect("column")
        .as_materialized_series()
        .f64()
        .expect("f64 column")
        .into_iter()
        .collect()
}

pub(crate) fn read_strs(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .expect("column")
        .as_materialized_series()
        .str()
        .expect("str column")
        .into_iter()
        .map(|v| v.map(ToString::to_string))
        .collect()
}
