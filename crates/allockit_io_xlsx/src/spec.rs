//! Shared XLSX specification models.

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification; `None` fields leave the workbook default.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color (`#RRGGBB`).
    pub bg_color: Option<String>,
    /// Font color (`#RRGGBB`).
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            text_wrap: other.text_wrap.or(self.text_wrap),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellValues

/// Normalized cell value shared by the reader and the writer.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Missing/blank value.
    #[default]
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
}

impl EnumCellValue {
    /// `true` for blank cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::None => true,
            Self::String(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Display text of the cell; integral numbers drop the trailing `.0`.
    ///
    /// Blank cells yield `None`.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::String(s) => Some(s.clone()),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    Some(format!("{}", *n as i64))
                } else {
                    Some(n.to_string())
                }
            }
        }
    }

    /// Numeric reading of the cell; text is parsed after trimming.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Self::None => None,
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Number(_) => None,
            Self::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }
}

/// Dense, A1-anchored cell grid of one worksheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecSheetGrid {
    /// Name of the worksheet the grid was read from.
    pub sheet_name: String,
    rows: Vec<Vec<EnumCellValue>>,
    width: usize,
}

const CELL_VALUE_NONE: EnumCellValue = EnumCellValue::None;

impl SpecSheetGrid {
    /// Build a grid from row vectors; ragged rows are padded with blanks.
    pub fn from_rows(sheet_name: impl Into<String>, rows: Vec<Vec<EnumCellValue>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, EnumCellValue::None);
                row
            })
            .collect();
        Self {
            sheet_name: sheet_name.into(),
            rows,
            width,
        }
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Cell at zero-based `(row_idx, col_idx)`; out-of-range reads are blank.
    pub fn get(&self, row_idx: usize, col_idx: usize) -> &EnumCellValue {
        self.rows
            .get(row_idx)
            .and_then(|row| row.get(col_idx))
            .unwrap_or(&CELL_VALUE_NONE)
    }

    /// Full row slice, if present.
    pub fn row(&self, row_idx: usize) -> Option<&[EnumCellValue]> {
        self.rows.get(row_idx).map(Vec::as_slice)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetLayoutSpecification

/// One free-standing cell placed at an absolute position.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecPlacedCell {
    /// Zero-based row index.
    pub row_idx: usize,
    /// Zero-based column index.
    pub col_idx: usize,
    /// Cell value.
    pub value: EnumCellValue,
    /// Cell format.
    pub fmt: SpecCellFormat,
}

/// Complete rendering plan for one worksheet around a table.
///
/// The table header lands on `row_table_header` starting at column 0, body
/// rows follow directly below it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecSheetLayout {
    /// Requested worksheet name (sanitized on write).
    pub sheet_name: String,
    /// Cells written outside the table (annotations, summary blocks).
    pub cells_placed: Vec<SpecPlacedCell>,
    /// Zero-based row of the table header.
    pub row_table_header: usize,
    /// Format for every table header cell.
    pub fmt_header: SpecCellFormat,
    /// Per-column body format; must match the table width.
    pub fmts_body_by_col: Vec<SpecCellFormat>,
    /// Zero-based columns hidden from view (only applied inside the used range).
    pub cols_hidden: Vec<usize>,
    /// Uniform width for every used column; `None` keeps Excel defaults.
    pub width_cols: Option<f64>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Extent of one worksheet produced by the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetExtent {
    /// Actual unique sheet name in workbook.
    pub sheet_name: String,
    /// Number of rows used (exclusive end row).
    pub n_rows_used: usize,
    /// Number of columns used (exclusive end column).
    pub n_cols_used: usize,
}

/// Per-write call report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    /// Sheets produced by the write call.
    pub sheets: Vec<SpecSheetExtent>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
