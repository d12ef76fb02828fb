//! Union of resolved sources and per-store aggregation.

use polars::prelude::*;

use crate::collide::SpecResolvedTables;
use crate::conf::{C_STORE_NUMBER, TUP_KEY_COLS, is_key_col};
use crate::spec::{ConsolidateError, EnumKeyConflictPolicy, EnumNullStoreRule};

const C_PREFIX_N_UNIQUE: &str = "__n_unique__";

/// Per-column reduction applied inside one store group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumColumnAggRule {
    /// First non-null value in upload order.
    First,
    /// Sum with nulls counted as 0; an all-null group yields 0.
    Sum,
}

impl EnumColumnAggRule {
    pub fn for_column(name: &str) -> Self {
        if is_key_col(name) {
            Self::First
        } else {
            Self::Sum
        }
    }

    pub fn to_expr(self, name: &str) -> Expr {
        match self {
            Self::First => col(name).drop_nulls().first().alias(name),
            Self::Sum => col(name).fill_null(lit(0.0)).sum().alias(name),
        }
    }
}

/// Aggregated master table plus row accounting.
#[derive(Debug, Clone)]
pub struct SpecAggregated {
    /// One row per store, ascending by store number.
    pub df_master: DataFrame,
    /// Rows removed under [`EnumNullStoreRule::Drop`].
    pub n_rows_store_null_dropped: usize,
}

/// Stack the resolved tables into one frame over the ordered column union.
///
/// Columns absent from a table are filled with nulls; output columns are the
/// key attributes followed by item references in first-encountered order.
pub fn union_tables(resolved: &SpecResolvedTables) -> Result<DataFrame, ConsolidateError> {
    let l_cols_union: Vec<&str> = TUP_KEY_COLS
        .iter()
        .copied()
        .chain(resolved.l_item_refs.iter().map(String::as_str))
        .collect();

    let mut df_union: Option<DataFrame> = None;
    for df_table in resolved.frames() {
        let mut df_aligned = df_table.clone();
        let n_height = df_aligned.height();
        for c_name in &l_cols_union {
            if df_aligned.column(c_name).is_err() {
                df_aligned.with_column(Column::full_null(
                    (*c_name).into(),
                    n_height,
                    &DataType::Float64,
                ))?;
            }
        }
        let df_aligned = df_aligned.select(l_cols_union.iter().copied())?;
        match df_union.as_mut() {
            Some(df_acc) => {
                df_acc.vstack_mut(&df_aligned)?;
            }
            None => df_union = Some(df_aligned),
        }
    }

    Ok(df_union.unwrap_or_else(DataFrame::empty))
}

/// Group the resolved sources by store number.
///
/// Zero sources give an empty (zero-column) frame.
pub fn aggregate_allocations(
    resolved: &SpecResolvedTables,
    rule_key_conflict: EnumKeyConflictPolicy,
    rule_null_store: EnumNullStoreRule,
) -> Result<SpecAggregated, ConsolidateError> {
    if rule_null_store == EnumNullStoreRule::Error {
        if let Some(table) = resolved.l_tables.iter().find(|t| t.n_rows_store_null > 0) {
            return Err(ConsolidateError::NullStoreNumber {
                name: table.name.clone(),
                n_rows: table.n_rows_store_null,
            });
        }
    }

    let df_union = union_tables(resolved)?;
    if df_union.width() == 0 {
        return Ok(SpecAggregated {
            df_master: df_union,
            n_rows_store_null_dropped: 0,
        });
    }

    let l_cols: Vec<String> = df_union
        .get_column_names_str()
        .into_iter()
        .map(ToString::to_string)
        .collect();
    let l_cols_item: Vec<&str> = l_cols
        .iter()
        .map(String::as_str)
        .filter(|c| !is_key_col(c))
        .collect();

    let mut lf = df_union.lazy();
    let mut n_rows_store_null_dropped = 0usize;
    if rule_null_store == EnumNullStoreRule::Drop {
        n_rows_store_null_dropped = resolved.l_tables.iter().map(|t| t.n_rows_store_null).sum();
        lf = lf.filter(col(C_STORE_NUMBER).is_not_null());
    }

    let mut l_aggs: Vec<Expr> = l_cols
        .iter()
        .filter(|c| c.as_str() != C_STORE_NUMBER)
        .map(|c| EnumColumnAggRule::for_column(c).to_expr(c))
        .collect();
    let is_strict = rule_key_conflict == EnumKeyConflictPolicy::Strict;
    if is_strict {
        l_aggs.extend(TUP_KEY_COLS.iter().skip(1).map(|c_key| {
            col(*c_key)
                .drop_nulls()
                .n_unique()
                .alias(format!("{C_PREFIX_N_UNIQUE}{c_key}"))
        }));
    }

    let df_grouped = lf
        .with_columns(
            l_cols_item
                .iter()
                .map(|c| col(*c).cast(DataType::Float64))
                .collect::<Vec<_>>(),
        )
        .group_by_stable([col(C_STORE_NUMBER)])
        .agg(l_aggs)
        .sort(
            [C_STORE_NUMBER],
            SortMultipleOptions::default().with_nulls_last(true),
        )
        .collect()?;

    if is_strict {
        validate_key_agreement(&df_grouped)?;
    }
    let df_master = df_grouped.select(l_cols.iter().map(String::as_str))?;

    tracing::debug!(
        n_stores = df_master.height(),
        n_items = l_cols_item.len(),
        n_rows_store_null_dropped,
        "aggregated allocations"
    );
    Ok(SpecAggregated {
        df_master,
        n_rows_store_null_dropped,
    })
}

fn validate_key_agreement(df_grouped: &DataFrame) -> Result<(), ConsolidateError> {
    let col_store = df_grouped.column(C_STORE_NUMBER)?;
    for c_key in TUP_KEY_COLS.iter().skip(1) {
        let ser_n_unique = df_grouped
            .column(&format!("{C_PREFIX_N_UNIQUE}{c_key}"))?
            .as_materialized_series()
            .cast(&DataType::UInt64)?;
        let n_idx_conflict = ser_n_unique
            .u64()?
            .into_iter()
            .position(|n| n.is_some_and(|n| n > 1));
        if let Some(n_idx_row) = n_idx_conflict {
            return Err(ConsolidateError::KeyConflict {
                store_number: col_store.get(n_idx_row)?.to_string(),
                column: (*c_key).to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collide::resolve_collisions;
    use crate::extract::{SpecExtractedTable, extract_allocation};
    use crate::spec::SpecSourceLayout;
    use crate::testing::{GridBuilder, read_f64s, read_i64s, read_strs};
    use allockit_io_xlsx::EnumCellValue;

    fn extract(name: &str, builder: GridBuilder) -> SpecExtractedTable {
        extract_allocation(name, &builder.build(), &SpecSourceLayout::default())
            .expect("extract")
    }

    fn aggregate(
        tables: Vec<SpecExtractedTable>,
        rule_key_conflict: EnumKeyConflictPolicy,
        rule_null_store: EnumNullStoreRule,
    ) -> Result<SpecAggregated, ConsolidateError> {
        let resolved = resolve_collisions(tables).expect("resolve");
        aggregate_allocations(&resolved, rule_key_conflict, rule_null_store)
    }

    fn aggregate_default(tables: Vec<SpecExtractedTable>) -> SpecAggregated {
        aggregate(tables, EnumKeyConflictPolicy::First, EnumNullStoreRule::Drop)
            .expect("aggregate")
    }

    #[test]
    fn test_repeated_store_quantities_are_summed() {
        let table = extract(
            "a.xlsx",
            GridBuilder::new()
                .item("REF-A", "Poster", None)
                .store(5, "Five", &[Some(3.0)])
                .store(5, "Five", &[Some(5.0)]),
        );

        let agg = aggregate_default(vec![table]);
        assert_eq!(agg.df_master.height(), 1);
        assert_eq!(read_f64s(&agg.df_master, "REF-A"), vec![Some(8.0)]);
    }

    #[test]
    fn test_sources_are_merged_per_store_and_sorted() {
        let first = extract(
            "a.xlsx",
            GridBuilder::new()
                .item("REF-A", "Poster", None)
                .store(20, "Twenty", &[Some(3.0)])
                .store(10, "Ten", &[Some(1.0)]),
        );
        let second = extract(
            "b.xlsx",
            GridBuilder::new()
                .item("REF-B", "Strip", None)
                .store(10, "Ten", &[Some(5.0)])
                .store(30, "Thirty", &[Some(2.0)]),
        );

        let agg = aggregate_default(vec![first, second]);
        let df = &agg.df_master;
        assert_eq!(df.width(), TUP_KEY_COLS.len() + 2);
        assert_eq!(
            read_i64s(df, C_STORE_NUMBER),
            vec![Some(10), Some(20), Some(30)]
        );
        assert_eq!(read_f64s(df, "REF-A"), vec![Some(1.0), Some(3.0), Some(0.0)]);
        assert_eq!(read_f64s(df, "REF-B"), vec![Some(5.0), Some(0.0), Some(2.0)]);
    }

    #[test]
    fn test_first_non_null_key_value_wins() {
        let first = extract(
            "a.xlsx",
            GridBuilder::new()
                .item("REF-A", "Poster", None)
                .store(1, "", &[Some(1.0)])
                .store(1, "Main Street", &[Some(1.0)]),
        );
        let second = extract(
            "b.xlsx",
            GridBuilder::new()
                .item("REF-B", "Strip", None)
                .store(1, "High Street", &[Some(1.0)]),
        );

        let agg = aggregate_default(vec![first, second]);
        assert_eq!(
            read_strs(&agg.df_master, "Store Name"),
            vec![Some("Main Street".to_string())]
        );
    }

    #[test]
    fn test_strict_policy_rejects_disagreeing_keys() {
        let first = extract(
            "a.xlsx",
            GridBuilder::new()
                .item("REF-A", "Poster", None)
                .store(7, "Main Street", &[Some(1.0)]),
        );
        let second = extract(
            "b.xlsx",
            GridBuilder::new()
                .item("REF-B", "Strip", None)
                .store(7, "High Street", &[Some(1.0)]),
        );

        let err = aggregate(
            vec![first, second],
            EnumKeyConflictPolicy::Strict,
            EnumNullStoreRule::Drop,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConsolidateError::KeyConflict { ref store_number, ref column }
                if store_number == "7" && column == "Store Name"
        ));
    }

    #[test]
    fn test_strict_policy_accepts_agreeing_keys() {
        let first = extract(
            "a.xlsx",
            GridBuilder::new()
                .item("REF-A", "Poster", None)
                .store(7, "Main Street", &[Some(1.0)]),
        );
        let second = extract(
            "b.xlsx",
            GridBuilder::new()
                .item("REF-B", "Strip", None)
                .store(7, "Main Street", &[Some(2.0)]),
        );

        let agg = aggregate(
            vec![first, second],
            EnumKeyConflictPolicy::Strict,
            EnumNullStoreRule::Drop,
        )
        .expect("aggregate");
        assert_eq!(agg.df_master.width(), TUP_KEY_COLS.len() + 2);
    }

    fn table_with_null_store() -> SpecExtractedTable {
        extract(
            "nulls.xlsx",
            GridBuilder::new()
                .item("REF-A", "Poster", None)
                .store(2, "Two", &[Some(1.0)])
                .store_raw(
                    EnumCellValue::String("TBC".to_string()),
                    "Unknown",
                    vec![EnumCellValue::Number(4.0)],
                ),
        )
    }

    #[test]
    fn test_null_store_rows_are_dropped_and_counted() {
        let agg = aggregate_default(vec![table_with_null_store()]);
        assert_eq!(agg.n_rows_store_null_dropped, 1);
        assert_eq!(read_i64s(&agg.df_master, C_STORE_NUMBER), vec![Some(2)]);
    }

    #[test]
    fn test_null_store_rows_can_fail_the_run() {
        let err = aggregate(
            vec![table_with_null_store()],
            EnumKeyConflictPolicy::First,
            EnumNullStoreRule::Error,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConsolidateError::NullStoreNumber { ref name, n_rows: 1 } if name == "nulls.xlsx"
        ));
    }

    #[test]
    fn test_null_store_rows_can_be_bucketed_last() {
        let agg = aggregate(
            vec![table_with_null_store()],
            EnumKeyConflictPolicy::First,
            EnumNullStoreRule::Bucket,
        )
        .expect("aggregate");
        assert_eq!(agg.n_rows_store_null_dropped, 0);
        assert_eq!(read_i64s(&agg.df_master, C_STORE_NUMBER), vec![Some(2), None]);
        assert_eq!(read_f64s(&agg.df_master, "REF-A"), vec![Some(1.0), Some(4.0)]);
    }

    #[test]
    fn test_no_sources_give_an_empty_frame() {
        let agg = aggregate_default(Vec::new());
        assert_eq!(agg.df_master.width(), 0);
        assert_eq!(agg.df_master.height(), 0);
    }

    #[test]
    fn test_agg_rule_follows_column_kind() {
        assert_eq!(EnumColumnAggRule::for_column("Store Name"), EnumColumnAggRule::First);
        assert_eq!(EnumColumnAggRule::for_column("REF-A"), EnumColumnAggRule::Sum);
    }
}
