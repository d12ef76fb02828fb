//! XLSX writer kernel that renders a planned sheet layout around a DataFrame.

use std::collections::BTreeSet;
use std::path::Path;

use polars::prelude::{AnyValue, DataFrame};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};

use crate::spec::{
    EnumCellValue, SpecCellFormat, SpecPlacedCell, SpecSheetExtent, SpecSheetLayout,
    SpecXlsxReport,
};
use crate::util::{
    create_sheet_identifier, derive_column_letter, normalize_cell_value, sanitize_sheet_name,
    validate_sheet_extent, validate_unique_columns,
};

/// Stateful workbook writer.
///
/// The workbook is buffered in memory until [`Self::save`] or
/// [`Self::save_to_buffer`] is called.
pub struct XlsxWriter {
    workbook: Workbook,
    set_sheet_names_existing: BTreeSet<String>,
    l_reports: Vec<SpecXlsxReport>,
}

impl Default for XlsxWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl XlsxWriter {
    /// Create an empty in-memory workbook writer.
    pub fn new() -> Self {
        Self {
            workbook: Workbook::new(),
            set_sheet_names_existing: BTreeSet::new(),
            l_reports: Vec::new(),
        }
    }

    /// Return immutable snapshot of per-sheet write reports.
    pub fn report(&self) -> Vec<SpecXlsxReport> {
        self.l_reports.clone()
    }

    /// Flush workbook to disk.
    pub fn save(&mut self, path_file_out: &Path) -> Result<(), String> {
        self.workbook
            .save(path_file_out)
            .map_err(derive_xlsx_error_text)
    }

    /// Serialize workbook into XLSX bytes.
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>, String> {
        self.workbook
            .save_to_buffer()
            .map_err(derive_xlsx_error_text)
    }

    /// Write one sheet: placed cells first, then the table header and body.
    ///
    /// A zero-column `df_table` writes no table at all, which still yields a
    /// valid sheet holding only the placed cells.
    pub fn write_sheet_layout(
        &mut self,
        df_table: &DataFrame,
        layout: &SpecSheetLayout,
    ) -> Result<(), String> {
        let l_colnames_df: Vec<String> = df_table
            .get_column_names_str()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        validate_unique_columns(&l_colnames_df)?;

        let n_width_df = l_colnames_df.len();
        let n_height_df = df_table.height();
        if n_width_df > 0 && layout.fmts_body_by_col.len() != n_width_df {
            return Err(format!(
                "layout.fmts_body_by_col has {} formats; table has {n_width_df} columns.",
                layout.fmts_body_by_col.len()
            ));
        }

        let (n_rows_used, n_cols_used) = derive_used_extent(layout, n_width_df, n_height_df);
        validate_sheet_extent(n_rows_used, n_cols_used)?;

        let mut report = SpecXlsxReport::default();
        let sheet_name_unique =
            self.derive_unique_sheet_name(&sanitize_sheet_name(&layout.sheet_name, "_"));
        if sheet_name_unique != layout.sheet_name {
            report.warn(format!(
                "Sheet name {:?} written as {sheet_name_unique:?}.",
                layout.sheet_name
            ));
        }

        let worksheet = self.workbook.add_worksheet();
        worksheet
            .set_name(&sheet_name_unique)
            .map_err(derive_xlsx_error_text)?;

        for cell in &layout.cells_placed {
            write_placed_cell(worksheet, cell)?;
        }

        if n_width_df > 0 {
            let fmt_header = derive_rust_xlsx_format(&layout.fmt_header);
            for (n_idx_col, c_name) in l_colnames_df.iter().enumerate() {
                write_cell_with_format(
                    worksheet,
                    layout.row_table_header,
                    n_idx_col,
                    &EnumCellValue::String(c_name.clone()),
                    &fmt_header,
                )?;
            }

            let l_fmt_body_by_col: Vec<Format> = layout
                .fmts_body_by_col
                .iter()
                .map(derive_rust_xlsx_format)
                .collect();
            for (n_idx_col, col) in df_table.get_columns().iter().enumerate() {
                for n_row_local in 0..n_height_df {
                    let value = derive_cell_value_from_any_value(
                        col.get(n_row_local)
                            .map_err(|err| format!("Failed to access cell value: {err}"))?,
                    );
                    write_cell_with_format(
                        worksheet,
                        layout.row_table_header + 1 + n_row_local,
                        n_idx_col,
                        &normalize_cell_value(&value),
                        &l_fmt_body_by_col[n_idx_col],
                    )?;
                }
            }
        }

        if let Some(n_width) = layout.width_cols {
            for n_idx_col in 0..n_cols_used {
                worksheet
                    .set_column_width(cast_col_num(n_idx_col)?, n_width)
                    .map_err(derive_xlsx_error_text)?;
            }
        }
        for n_idx_col in layout.cols_hidden.iter().filter(|n| **n < n_cols_used) {
            worksheet
                .set_column_hidden(cast_col_num(*n_idx_col)?)
                .map_err(|err| {
                    format!(
                        "Failed to hide column {}: {err}",
                        derive_column_letter(*n_idx_col)
                    )
                })?;
        }

        report.sheets.push(SpecSheetExtent {
            sheet_name: sheet_name_unique,
            n_rows_used,
            n_cols_used,
        });
        self.l_reports.push(report);
        Ok(())
    }

    fn derive_unique_sheet_name(&mut self, name: &str) -> String {
        if !self.set_sheet_names_existing.contains(name) {
            self.set_sheet_names_existing.insert(name.to_string());
            return name.to_string();
        }

        let mut n_idx = 2usize;
        loop {
            let candidate = create_sheet_identifier(name, n_idx);
            if !self.set_sheet_names_existing.contains(&candidate) {
                self.set_sheet_names_existing.insert(candidate.clone());
                return candidate;
            }
            n_idx += 1;
        }
    }
}

/// Exclusive `(rows, cols)` extent covered by placed cells and the table.
pub fn derive_used_extent(
    layout: &SpecSheetLayout,
    n_width_df: usize,
    n_height_df: usize,
) -> (usize, usize) {
    let (mut n_rows_used, mut n_cols_used) = layout
        .cells_placed
        .iter()
        .fold((0usize, 0usize), |(n_rows, n_cols), cell| {
            (
                usize::max(n_rows, cell.row_idx + 1),
                usize::max(n_cols, cell.col_idx + 1),
            )
        });
    if n_width_df > 0 {
        n_rows_used = usize::max(n_rows_used, layout.row_table_header + 1 + n_height_df);
        n_cols_used = usize::max(n_cols_used, n_width_df);
    }
    (n_rows_used, n_cols_used)
}

fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::Boolean(val) => {
            EnumCellValue::String(if val { "True" } else { "False" }.to_string())
        }
        AnyValue::UInt8(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt16(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt32(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int8(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int16(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float64(val) => EnumCellValue::Number(val),
        _ => EnumCellValue::String(value.to_string()),
    }
}

fn write_placed_cell(worksheet: &mut Worksheet, cell: &SpecPlacedCell) -> Result<(), String> {
    write_cell_with_format(
        worksheet,
        cell.row_idx,
        cell.col_idx,
        &normalize_cell_value(&cell.value),
        &derive_rust_xlsx_format(&cell.fmt),
    )
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    format: &Format,
) -> Result<(), String> {
    match value {
        EnumCellValue::None => {
            worksheet
                .write_blank(cast_row_num(row_idx)?, cast_col_num(col_idx)?, format)
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::String(val) => {
            worksheet
                .write_string_with_format(
                    cast_row_num(row_idx)?,
                    cast_col_num(col_idx)?,
                    val,
                    format,
                )
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::Number(val) => {
            worksheet
                .write_number_with_format(
                    cast_row_num(row_idx)?,
                    cast_col_num(col_idx)?,
                    *val,
                    format,
                )
                .map_err(derive_xlsx_error_text)?;
        }
    }
    Ok(())
}

/// Translate a format spec into a `rust_xlsxwriter` format.
pub fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }

    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }

    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("row index overflow: {value}"))
}

fn cast_col_num(value: usize) -> Result<u16, String> {
    u16::try_from(value).map_err(|_| format!("column index overflow: {value}"))
}

fn derive_xlsx_error_text(err: XlsxError) -> String {
    format!("xlsx write error: {err}")
}
