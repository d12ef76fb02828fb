//! Cross-source item reference de-duplication (first occurrence wins).

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::DataFrame;

use crate::conf::TUP_KEY_COLS;
use crate::extract::{SpecAllocationMeta, SpecExtractedTable};
use crate::spec::ConsolidateError;

/// Accumulator threaded through the fold over sources in upload order.
#[derive(Debug, Default)]
pub struct SpecCollisionState {
    set_refs_seen: BTreeSet<String>,
    l_refs_duplicate: Vec<String>,
    l_tables: Vec<SpecExtractedTable>,
}

impl SpecCollisionState {
    /// Fold step: keep key columns + references not seen in earlier sources.
    pub fn absorb(mut self, table: SpecExtractedTable) -> Result<Self, ConsolidateError> {
        let mut l_refs_new = Vec::with_capacity(table.l_item_refs.len());
        for c_ref in &table.l_item_refs {
            if self.set_refs_seen.insert(c_ref.clone()) {
                l_refs_new.push(c_ref.clone());
            } else {
                tracing::debug!(source = %table.name, reference = %c_ref, "duplicate reference dropped");
                self.l_refs_duplicate.push(c_ref.clone());
            }
        }

        if l_refs_new.len() == table.l_item_refs.len() {
            self.l_tables.push(table);
            return Ok(self);
        }

        let l_cols_keep: Vec<&str> = TUP_KEY_COLS
            .iter()
            .copied()
            .chain(l_refs_new.iter().map(String::as_str))
            .collect();
        let df_rows = table.df_rows.select(l_cols_keep)?;
        let dict_meta: BTreeMap<String, SpecAllocationMeta> = table
            .dict_meta
            .into_iter()
            .filter(|(c_ref, _)| l_refs_new.contains(c_ref))
            .collect();

        self.l_tables.push(SpecExtractedTable {
            df_rows,
            l_item_refs: l_refs_new,
            dict_meta,
            ..table
        });
        Ok(self)
    }

    /// Finish the fold.
    pub fn finish(self) -> SpecResolvedTables {
        let mut l_item_refs = Vec::new();
        let mut dict_meta = BTreeMap::new();
        for table in &self.l_tables {
            l_item_refs.extend(table.l_item_refs.iter().cloned());
            dict_meta.extend(
                table
                    .dict_meta
                    .iter()
                    .map(|(c_ref, meta)| (c_ref.clone(), meta.clone())),
            );
        }

        let l_refs_duplicate: Vec<String> = self
            .l_refs_duplicate
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        SpecResolvedTables {
            l_tables: self.l_tables,
            l_item_refs,
            dict_meta,
            l_refs_duplicate,
        }
    }
}

/// Sources after de-duplication, ready for the union.
#[derive(Debug)]
pub struct SpecResolvedTables {
    /// Filtered tables in upload order.
    pub l_tables: Vec<SpecExtractedTable>,
    /// All retained references in first-encountered order.
    pub l_item_refs: Vec<String>,
    /// Metadata of every retained reference.
    pub dict_meta: BTreeMap<String, SpecAllocationMeta>,
    /// Dropped references, unique and sorted.
    pub l_refs_duplicate: Vec<String>,
}

impl SpecResolvedTables {
    /// Row tables in upload order.
    pub fn frames(&self) -> Vec<&DataFrame> {
        self.l_tables.iter().map(|table| &table.df_rows).collect()
    }
}

/// Drop item references already seen in an earlier source.
///
/// Order-dependent and deterministic: for a reference present in several
/// sources only the first source's column and metadata survive.
pub fn resolve_collisions(
    tables: Vec<SpecExtractedTable>,
) -> Result<SpecResolvedTables, ConsolidateError> {
    let state = tables
        .into_iter()
        .try_fold(SpecCollisionState::default(), SpecCollisionState::absorb)?;
    Ok(state.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_allocation;
    use crate::spec::SpecSourceLayout;
    use crate::testing::{GridBuilder, read_f64s};

    fn extract(name: &str, builder: GridBuilder) -> SpecExtractedTable {
        extract_allocation(name, &builder.build(), &SpecSourceLayout::default())
            .expect("extract")
    }

    #[test]
    fn test_later_duplicate_reference_is_dropped() {
        let first = extract(
            "a.xlsx",
            GridBuilder::new()
                .item("REF-A", "From A", Some(1.0))
                .store(1, "One", &[Some(10.0)]),
        );
        let second = extract(
            "b.xlsx",
            GridBuilder::new()
                .item("REF-A", "From B", Some(7.0))
                .item("REF-B", "Only B", None)
                .store(1, "One", &[Some(99.0), Some(2.0)]),
        );

        let resolved = resolve_collisions(vec![first, second]).expect("resolve");

        assert_eq!(resolved.l_item_refs, vec!["REF-A", "REF-B"]);
        assert_eq!(resolved.l_refs_duplicate, vec!["REF-A"]);
        assert_eq!(resolved.dict_meta["REF-A"].brief_description, "From A");
        assert_eq!(resolved.dict_meta["REF-A"].overs, 1.0);

        let df_second = &resolved.l_tables[1].df_rows;
        assert_eq!(df_second.width(), TUP_KEY_COLS.len() + 1);
        assert!(df_second.column("REF-A").is_err());
        assert_eq!(read_f64s(df_second, "REF-B"), vec![Some(2.0)]);
        assert!(!resolved.l_tables[1].dict_meta.contains_key("REF-A"));
    }

    #[test]
    fn test_duplicates_are_reported_once_and_sorted() {
        let l_tables = ["a.xlsx", "b.xlsx", "c.xlsx"]
            .iter()
            .map(|name| {
                extract(
                    name,
                    GridBuilder::new()
                        .item("REF-Z", "z", None)
                        .item("REF-M", "m", None)
                        .store(1, "One", &[Some(1.0), Some(1.0)]),
                )
            })
            .collect();

        let resolved = resolve_collisions(l_tables).expect("resolve");
        assert_eq!(resolved.l_refs_duplicate, vec!["REF-M", "REF-Z"]);
        assert_eq!(resolved.l_item_refs, vec!["REF-Z", "REF-M"]);
        assert_eq!(resolved.frames().len(), 3);
    }

    #[test]
    fn test_no_sources_resolves_to_nothing() {
        let resolved = resolve_collisions(Vec::new()).expect("resolve");
        assert!(resolved.l_tables.is_empty());
        assert!(resolved.l_refs_duplicate.is_empty());
    }
}
