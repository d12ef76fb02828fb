//! Worksheet reader that loads the first sheet of a workbook into a cell grid.

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{Data, Range, Reader, Sheets, open_workbook_auto, open_workbook_auto_from_rs};

use crate::spec::{EnumCellValue, SpecSheetGrid};

/// Read the first worksheet of the workbook at `path`.
///
/// The grid is anchored at A1: leading blank rows/columns stay in place so
/// positional offsets match what a user sees in Excel.
pub fn read_sheet_grid(path: &Path) -> Result<SpecSheetGrid, String> {
    let workbook = open_workbook_auto(path)
        .map_err(|err| format!("Failed to open workbook {}: {err}", path.display()))?;
    read_first_sheet(workbook)
}

/// Read the first worksheet of an in-memory workbook (xlsx, xls, xlsb, ods).
pub fn read_sheet_grid_from_bytes(v_bytes: &[u8]) -> Result<SpecSheetGrid, String> {
    let workbook = open_workbook_auto_from_rs(Cursor::new(v_bytes.to_vec()))
        .map_err(|err| format!("Failed to open workbook bytes: {err}"))?;
    read_first_sheet(workbook)
}

fn read_first_sheet<RS>(mut workbook: Sheets<RS>) -> Result<SpecSheetGrid, String>
where
    RS: Read + Seek,
{
    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        return Err("Workbook contains no sheets.".to_string());
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|err| format!("Failed to read sheet '{sheet_name}': {err}"))?;

    Ok(derive_grid_from_range(&sheet_name, &range))
}

/// Convert a calamine range into an A1-anchored grid.
pub fn derive_grid_from_range(sheet_name: &str, range: &Range<Data>) -> SpecSheetGrid {
    let (n_row_offset, n_col_offset) = range
        .start()
        .map(|(row, col)| (row as usize, col as usize))
        .unwrap_or((0, 0));

    let mut l_rows: Vec<Vec<EnumCellValue>> = vec![Vec::new(); n_row_offset];
    for row in range.rows() {
        let mut l_cells = vec![EnumCellValue::None; n_col_offset];
        l_cells.extend(row.iter().map(derive_cell_value_from_data));
        l_rows.push(l_cells);
    }

    SpecSheetGrid::from_rows(sheet_name, l_rows)
}

/// Map one calamine cell onto the kernel's cell value model.
pub fn derive_cell_value_from_data(cell: &Data) -> EnumCellValue {
    match cell {
        Data::Empty | Data::Error(_) => EnumCellValue::None,
        Data::String(s) => {
            if s.is_empty() {
                EnumCellValue::None
            } else {
                EnumCellValue::String(s.clone())
            }
        }
        Data::Float(n) => EnumCellValue::Number(*n),
        Data::Int(n) => EnumCellValue::Number(*n as f64),
        Data::Bool(b) => EnumCellValue::String(if *b { "True" } else { "False" }.to_string()),
        Data::DateTime(dt) => EnumCellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => EnumCellValue::String(s.clone()),
    }
}
