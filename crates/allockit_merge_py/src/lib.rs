use std::collections::BTreeMap;
use std::path::PathBuf;

use allockit_merge::{
    ConsolidateError, EnumKeyConflictPolicy, EnumNullStoreRule, ReportConsolidate,
    SpecAllocationSource, SpecConsolidateOptions, consolidate, consolidate_files,
    consolidate_to_file,
};
use pyo3::exceptions::{PyOSError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyBytes;

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "allockit.merge.consolidate.v1";
const C_BRIDGE_TRANSPORT: &str = "rust_native";

#[pyclass(name = "ReportConsolidate")]
#[derive(Debug, Clone)]
struct PyReportConsolidate {
    #[pyo3(get)]
    cnt_sources: u64,
    #[pyo3(get)]
    cnt_rows_read: u64,
    #[pyo3(get)]
    cnt_items: u64,
    #[pyo3(get)]
    cnt_stores: u64,
    #[pyo3(get)]
    cnt_rows_store_null_dropped: u64,
    #[pyo3(get)]
    refs_duplicate: Vec<String>,
    #[pyo3(get)]
    warnings: Vec<String>,
    #[pyo3(get)]
    summary: String,
    /// Written workbook; `None` when nothing was written.
    #[pyo3(get)]
    file_out: Option<String>,
    inner: ReportConsolidate,
}

impl PyReportConsolidate {
    fn new(report: ReportConsolidate, file_out: Option<PathBuf>) -> Self {
        Self {
            cnt_sources: report.cnt_sources,
            cnt_rows_read: report.cnt_rows_read,
            cnt_items: report.cnt_items,
            cnt_stores: report.cnt_stores,
            cnt_rows_store_null_dropped: report.cnt_rows_store_null_dropped,
            refs_duplicate: report.refs_duplicate.clone(),
            warnings: report.warnings.clone(),
            summary: report.summary(),
            file_out: file_out.map(|path| path.to_string_lossy().to_string()),
            inner: report,
        }
    }
}

#[pymethods]
impl PyReportConsolidate {
    #[getter]
    fn warning_count(&self) -> usize {
        self.inner.warning_count()
    }

    fn to_dict(&self) -> BTreeMap<String, u64> {
        self.inner.to_dict()
    }

    #[pyo3(signature = (prefix = "[CONSOLIDATE]"))]
    fn format(&self, prefix: &str) -> String {
        self.inner.format(prefix)
    }

    fn __str__(&self) -> String {
        self.inner.to_string()
    }
}

fn parse_rule_key_conflict(value: &str) -> PyResult<EnumKeyConflictPolicy> {
    match value {
        "first" => Ok(EnumKeyConflictPolicy::First),
        "strict" => Ok(EnumKeyConflictPolicy::Strict),
        _ => Err(PyValueError::new_err(format!(
            "Invalid key conflict policy: `{value}`. Expected one of: ['first', 'strict']"
        ))),
    }
}

fn parse_rule_null_store(value: &str) -> PyResult<EnumNullStoreRule> {
    match value {
        "drop" => Ok(EnumNullStoreRule::Drop),
        "error" => Ok(EnumNullStoreRule::Error),
        "bucket" => Ok(EnumNullStoreRule::Bucket),
        _ => Err(PyValueError::new_err(format!(
            "Invalid null store rule: `{value}`. Expected one of: ['drop', 'error', 'bucket']"
        ))),
    }
}

fn derive_options(
    rule_key_conflict: &str,
    rule_null_store: &str,
) -> PyResult<SpecConsolidateOptions> {
    Ok(SpecConsolidateOptions {
        rule_key_conflict: parse_rule_key_conflict(rule_key_conflict)?,
        rule_null_store: parse_rule_null_store(rule_null_store)?,
        ..Default::default()
    })
}

fn map_consolidate_error(exception: ConsolidateError) -> PyErr {
    match exception {
        ConsolidateError::ReadFailed { .. }
        | ConsolidateError::WriteFailed(_)
        | ConsolidateError::Io(_) => PyOSError::new_err(exception.to_string()),
        ConsolidateError::Polars(_) => PyRuntimeError::new_err(exception.to_string()),
        ConsolidateError::MissingStoreNumberColumn { .. }
        | ConsolidateError::LayoutMismatch { .. }
        | ConsolidateError::InvalidLayout(_)
        | ConsolidateError::NullStoreNumber { .. }
        | ConsolidateError::KeyConflict { .. } => PyValueError::new_err(exception.to_string()),
    }
}

/// Consolidate workbooks on disk, in the given order.
///
/// `file_out` may be a file path or an existing directory (default file name
/// inside it); nothing is written when it is `None`.
#[pyfunction(name = "consolidate_files")]
#[pyo3(signature = (
    paths,
    file_out = None,
    rule_key_conflict = "first",
    rule_null_store = "drop"
))]
fn consolidate_files_py(
    py: Python<'_>,
    paths: Vec<String>,
    file_out: Option<String>,
    rule_key_conflict: &str,
    rule_null_store: &str,
) -> PyResult<PyReportConsolidate> {
    let options = derive_options(rule_key_conflict, rule_null_store)?;

    let (report, path_written) = py
        .allow_threads(|| match file_out {
            Some(file_out) => consolidate_to_file(&paths, &PathBuf::from(file_out), &options)
                .map(|(path, result)| (result.report, Some(path))),
            None => consolidate_files(&paths, &options).map(|result| (result.report, None)),
        })
        .map_err(map_consolidate_error)?;
    Ok(PyReportConsolidate::new(report, path_written))
}

/// Consolidate in-memory workbooks `[(name, bytes), ...]`.
///
/// Returns `(xlsx_bytes, report)`.
#[pyfunction(name = "consolidate_bytes")]
#[pyo3(signature = (sources, rule_key_conflict = "first", rule_null_store = "drop"))]
fn consolidate_bytes_py<'py>(
    py: Python<'py>,
    sources: Vec<(String, Vec<u8>)>,
    rule_key_conflict: &str,
    rule_null_store: &str,
) -> PyResult<(Bound<'py, PyBytes>, PyReportConsolidate)> {
    let options = derive_options(rule_key_conflict, rule_null_store)?;

    let (v_bytes, report) = py
        .allow_threads(|| {
            let l_sources = sources
                .iter()
                .map(|(name, v_bytes)| SpecAllocationSource::from_bytes(name.as_str(), v_bytes))
                .collect::<Result<Vec<_>, _>>()?;
            let result = consolidate(&l_sources, &options)?;
            Ok::<_, ConsolidateError>((result.to_xlsx_bytes()?, result.report))
        })
        .map_err(map_consolidate_error)?;
    Ok((
        PyBytes::new(py, &v_bytes),
        PyReportConsolidate::new(report, None),
    ))
}

#[pymodule]
fn _allockit_merge_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyReportConsolidate>()?;
    module.add_function(wrap_pyfunction!(consolidate_files_py, module)?)?;
    module.add_function(wrap_pyfunction!(consolidate_bytes_py, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
