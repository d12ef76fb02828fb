//! End-to-end consolidation: read, extract, resolve, aggregate, lay out.

use std::path::{Path, PathBuf};

use allockit_io_xlsx::{
    SpecSheetGrid, SpecSheetLayout, XlsxWriter, read_sheet_grid, read_sheet_grid_from_bytes,
};
use chrono::{Local, NaiveDateTime};
use polars::prelude::DataFrame;

use crate::aggregate::aggregate_allocations;
use crate::collide::resolve_collisions;
use crate::conf::C_FILE_NAME_FMT;
use crate::extract::extract_allocation;
use crate::layout::{SpecSummaryColumn, derive_summary_columns, plan_master_layout};
use crate::report::{ReportConsolidate, ReportConsolidateBuilder};
use crate::spec::{ConsolidateError, SpecConsolidateOptions};

/// One uploaded allocation export, already read into a grid.
#[derive(Debug, Clone)]
pub struct SpecAllocationSource {
    /// Display name (usually the file name).
    pub name: String,
    /// First worksheet of the export.
    pub grid: SpecSheetGrid,
}

impl SpecAllocationSource {
    /// Read the first worksheet of a workbook on disk.
    pub fn from_path(path: &Path) -> Result<Self, ConsolidateError> {
        let name = derive_source_name(path);
        let grid = read_sheet_grid(path).map_err(|message| ConsolidateError::ReadFailed {
            name: name.clone(),
            message,
        })?;
        Ok(Self { name, grid })
    }

    /// Read the first worksheet of an in-memory workbook.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self, ConsolidateError> {
        let name = name.into();
        let grid =
            read_sheet_grid_from_bytes(bytes).map_err(|message| ConsolidateError::ReadFailed {
                name: name.clone(),
                message,
            })?;
        Ok(Self { name, grid })
    }
}

fn derive_source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Result of one successful run; nothing is written until asked.
#[derive(Debug, Clone)]
pub struct SpecConsolidation {
    /// Master table: key attributes then item columns, one row per store.
    pub df_master: DataFrame,
    /// Derived summary values per item column.
    pub summary: Vec<SpecSummaryColumn>,
    /// Rendering plan of the master sheet.
    pub layout: SpecSheetLayout,
    pub report: ReportConsolidate,
    pub consolidated_at: NaiveDateTime,
}

impl SpecConsolidation {
    /// `Consolidated_Allocation_<YYYYMMDD>_<HHMM>.xlsx`
    pub fn file_name_default(&self) -> String {
        self.consolidated_at.format(C_FILE_NAME_FMT).to_string()
    }

    /// Write the master workbook to `path_file_out`.
    pub fn write_xlsx(&self, path_file_out: &Path) -> Result<(), ConsolidateError> {
        let mut writer = self.render()?;
        writer
            .save(path_file_out)
            .map_err(ConsolidateError::WriteFailed)?;
        tracing::info!(path = %path_file_out.display(), "wrote consolidated workbook");
        Ok(())
    }

    /// Master workbook as `.xlsx` bytes.
    pub fn to_xlsx_bytes(&self) -> Result<Vec<u8>, ConsolidateError> {
        let mut writer = self.render()?;
        writer.save_to_buffer().map_err(ConsolidateError::WriteFailed)
    }

    fn render(&self) -> Result<XlsxWriter, ConsolidateError> {
        let mut writer = XlsxWriter::new();
        writer
            .write_sheet_layout(&self.df_master, &self.layout)
            .map_err(ConsolidateError::WriteFailed)?;
        for report in writer.report() {
            for warning in &report.warnings {
                tracing::warn!("{warning}");
            }
        }
        Ok(writer)
    }
}

/// Consolidate sources in the given (upload) order.
///
/// Fatal structural problems abort the run; duplicates and dropped rows are
/// reported as warnings.
pub fn consolidate(
    sources: &[SpecAllocationSource],
    options: &SpecConsolidateOptions,
) -> Result<SpecConsolidation, ConsolidateError> {
    let mut builder = ReportConsolidateBuilder::default();

    let mut l_tables = Vec::with_capacity(sources.len());
    for source in sources {
        let table = extract_allocation(&source.name, &source.grid, &options.layout_source)?;
        builder.add_source(table.df_rows.height());
        for warning in &table.warnings {
            tracing::warn!(source = %source.name, "{warning}");
            builder.add_warning(warning.clone());
        }
        l_tables.push(table);
    }

    let resolved = resolve_collisions(l_tables)?;
    if !resolved.l_refs_duplicate.is_empty() {
        tracing::warn!(
            refs = %resolved.l_refs_duplicate.join(", "),
            "duplicate brief references ignored"
        );
    }
    builder.add_refs_duplicate(&resolved.l_refs_duplicate);

    let aggregated =
        aggregate_allocations(&resolved, options.rule_key_conflict, options.rule_null_store)?;
    if aggregated.n_rows_store_null_dropped > 0 {
        tracing::warn!(
            n_rows = aggregated.n_rows_store_null_dropped,
            "rows without a store number dropped"
        );
    }
    builder.add_rows_store_null_dropped(aggregated.n_rows_store_null_dropped);

    let df_master = aggregated.df_master;
    let summary = derive_summary_columns(&df_master, &resolved.dict_meta)?;
    let consolidated_at = options
        .consolidated_at
        .unwrap_or_else(|| Local::now().naive_local());
    let layout = plan_master_layout(&df_master, &summary, &consolidated_at, &options.layout_master);

    let report = builder.build(summary.len(), df_master.height());
    tracing::info!("{}", report.summary());

    Ok(SpecConsolidation {
        df_master,
        summary,
        layout,
        report,
        consolidated_at,
    })
}

/// Read and consolidate workbooks on disk, in the given order.
pub fn consolidate_files<P: AsRef<Path>>(
    paths: &[P],
    options: &SpecConsolidateOptions,
) -> Result<SpecConsolidation, ConsolidateError> {
    let sources = paths
        .iter()
        .map(|path| SpecAllocationSource::from_path(path.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    consolidate(&sources, options)
}

/// Consolidate workbooks on disk and write the master workbook.
///
/// When `path_out` is an existing directory the default file name is used
/// inside it. Returns the written path with the run result.
pub fn consolidate_to_file<P: AsRef<Path>>(
    paths: &[P],
    path_out: &Path,
    options: &SpecConsolidateOptions,
) -> Result<(PathBuf, SpecConsolidation), ConsolidateError> {
    let consolidation = consolidate_files(paths, options)?;
    let path_file_out = if path_out.is_dir() {
        path_out.join(consolidation.file_name_default())
    } else {
        path_out.to_path_buf()
    };
    consolidation.write_xlsx(&path_file_out)?;
    Ok((path_file_out, consolidation))
}
