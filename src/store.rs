//! The table store: one in-memory [`Table`] per session plus lazily built grouping indices.
//!
//! Cluster and sub-cluster indices are derived, cached views owned by the store. Mutating
//! operations (`filter_by_column`, `keep_only_values`, `sort_by_custom_order`) clear the cache,
//! so an index can never go stale relative to the table it was built from.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;

use crate::error::{PipelineError, PipelineResult};
use crate::io::{read_table, write_table, LoadOptions, SaveOptions};
use crate::types::{Table, Value};

/// Hashable wrapper making [`Value`] usable as a grouping key.
///
/// Floats compare bit-exact (`to_bits`), so grouping tolerates any float value including NaN.
#[derive(Debug, Clone)]
struct GroupKey(Value);

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            (a, b) => a == b,
        }
    }
}

impl Eq for GroupKey {}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.0 {
            Value::Null => 0u8.hash(state),
            Value::Int64(v) => {
                1u8.hash(state);
                v.hash(state);
            }
            Value::Float64(v) => {
                2u8.hash(state);
                v.to_bits().hash(state);
            }
            Value::Bool(v) => {
                3u8.hash(state);
                v.hash(state);
            }
            Value::Utf8(s) => {
                4u8.hash(state);
                s.hash(state);
            }
        }
    }
}

/// Partition of a table's rows by one column's distinct values.
///
/// Every row lands in exactly one partition (nulls group under the null key), partitions are
/// disjoint, and their union reconstructs the table's row set. Iteration follows first-seen
/// order of the distinct values.
#[derive(Debug, Clone)]
pub struct ClusterIndex {
    keys: Vec<Value>,
    tables: Vec<Table>,
    lookup: HashMap<GroupKey, usize>,
}

impl ClusterIndex {
    /// Number of distinct partitions.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if the index holds no partitions (empty table).
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Distinct values in first-seen order.
    pub fn keys(&self) -> &[Value] {
        &self.keys
    }

    /// The partition for `value`, if present.
    pub fn get(&self, value: &Value) -> Option<&Table> {
        let idx = *self.lookup.get(&GroupKey(value.clone()))?;
        self.tables.get(idx)
    }

    /// Iterate `(value, partition)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Table)> {
        self.keys.iter().zip(self.tables.iter())
    }
}

/// Two-level partition: primary value, then a [`ClusterIndex`] over the sub column within that
/// primary partition.
#[derive(Debug, Clone)]
pub struct SubClusterIndex {
    primary_keys: Vec<Value>,
    indices: Vec<ClusterIndex>,
    lookup: HashMap<GroupKey, usize>,
}

impl SubClusterIndex {
    /// Number of primary partitions.
    pub fn len(&self) -> usize {
        self.primary_keys.len()
    }

    /// True if there are no primary partitions.
    pub fn is_empty(&self) -> bool {
        self.primary_keys.is_empty()
    }

    /// The sub-column index for one primary value, if present.
    pub fn get(&self, primary_value: &Value) -> Option<&ClusterIndex> {
        let idx = *self.lookup.get(&GroupKey(primary_value.clone()))?;
        self.indices.get(idx)
    }

    /// The sub-table for a `(primary value, sub value)` pair, if present.
    pub fn get_table(&self, primary_value: &Value, sub_value: &Value) -> Option<&Table> {
        self.get(primary_value)?.get(sub_value)
    }

    /// Iterate `(primary value, sub index)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&Value, &ClusterIndex)> {
        self.primary_keys.iter().zip(self.indices.iter())
    }
}

fn build_cluster_index(table: &Table, column: &str) -> PipelineResult<ClusterIndex> {
    let col_idx = column_index(table, column)?;

    let mut keys: Vec<Value> = Vec::new();
    let mut tables: Vec<Table> = Vec::new();
    let mut lookup: HashMap<GroupKey, usize> = HashMap::new();

    for row in &table.rows {
        let value = row[col_idx].clone();
        match lookup.get(&GroupKey(value.clone())) {
            Some(&idx) => tables[idx].rows.push(row.clone()),
            None => {
                lookup.insert(GroupKey(value.clone()), keys.len());
                keys.push(value);
                tables.push(Table::new(table.schema.clone(), vec![row.clone()]));
            }
        }
    }

    Ok(ClusterIndex { keys, tables, lookup })
}

fn column_index(table: &Table, column: &str) -> PipelineResult<usize> {
    table
        .schema
        .index_of(column)
        .ok_or_else(|| PipelineError::ColumnNotFound {
            column: column.to_string(),
            available: table.schema.field_names().map(str::to_string).collect(),
        })
}

/// One dataset's in-memory session: the table plus cached grouping indices.
#[derive(Debug)]
pub struct TableStore {
    table: Table,
    clusters: HashMap<String, ClusterIndex>,
    sub_clusters: HashMap<(String, String), SubClusterIndex>,
}

impl TableStore {
    /// Load a table from `path` and wrap it in a fresh store.
    ///
    /// Fails with [`PipelineError::FileNotFound`] when the path does not exist and
    /// [`PipelineError::UnsupportedFormat`] when the format is neither given nor resolvable.
    pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> PipelineResult<Self> {
        let table = read_table(path, options)?;
        Ok(Self::from_table(table))
    }

    /// Wrap an already-built [`Table`] in a fresh store.
    pub fn from_table(table: Table) -> Self {
        Self {
            table,
            clusters: HashMap::new(),
            sub_clusters: HashMap::new(),
        }
    }

    /// The current table.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Cached cluster index for `column`, if one has been built.
    pub fn cluster_index(&self, column: &str) -> Option<&ClusterIndex> {
        self.clusters.get(column)
    }

    /// Cached sub-cluster index for `(primary, sub)`, if one has been built.
    pub fn sub_cluster_index(&self, primary: &str, sub: &str) -> Option<&SubClusterIndex> {
        self.sub_clusters
            .get(&(primary.to_string(), sub.to_string()))
    }

    /// Normalize `column`'s string values to title case, then stable-sort rows so that values in
    /// `order` come first in that exact sequence, values not listed come next (grouped), and
    /// nulls come last.
    ///
    /// Applying the same sort twice yields the same row sequence as applying it once.
    pub fn sort_by_custom_order(&mut self, column: &str, order: &[String]) -> PipelineResult<()> {
        let col_idx = column_index(&self.table, column)?;

        for row in &mut self.table.rows {
            if let Value::Utf8(s) = &mut row[col_idx] {
                *s = title_case(s);
            }
        }

        let rank = |v: &Value| -> usize {
            match v {
                Value::Null => order.len() + 1,
                Value::Utf8(s) => order.iter().position(|c| c == s).unwrap_or(order.len()),
                _ => order.len(),
            }
        };

        let mut rows = std::mem::take(&mut self.table.rows);
        rows.sort_by_key(|row| rank(&row[col_idx]));
        self.table.rows = rows;

        self.invalidate_indices();
        Ok(())
    }

    /// Group all current rows by exact value equality on `column`.
    ///
    /// Overwrites any previously cached index for that column. Group iteration order is the
    /// first-seen order of distinct values.
    pub fn create_clusters(&mut self, column: &str) -> PipelineResult<&ClusterIndex> {
        let index = build_cluster_index(&self.table, column)?;
        self.clusters.insert(column.to_string(), index);
        Ok(&self.clusters[column])
    }

    /// Group each primary partition by `sub`, building the primary index first if absent.
    pub fn create_sub_clusters(
        &mut self,
        primary: &str,
        sub: &str,
    ) -> PipelineResult<&SubClusterIndex> {
        if !self.clusters.contains_key(primary) {
            self.create_clusters(primary)?;
        }
        let primary_index = &self.clusters[primary];

        let mut primary_keys: Vec<Value> = Vec::with_capacity(primary_index.len());
        let mut indices: Vec<ClusterIndex> = Vec::with_capacity(primary_index.len());
        let mut lookup: HashMap<GroupKey, usize> = HashMap::new();

        for (primary_value, partition) in primary_index.iter() {
            let sub_index = build_cluster_index(partition, sub)?;
            lookup.insert(GroupKey(primary_value.clone()), primary_keys.len());
            primary_keys.push(primary_value.clone());
            indices.push(sub_index);
        }

        let key = (primary.to_string(), sub.to_string());
        self.sub_clusters.insert(
            key.clone(),
            SubClusterIndex {
                primary_keys,
                indices,
                lookup,
            },
        );
        Ok(&self.sub_clusters[&key])
    }

    /// Look up one sub-table by `(primary value, sub value)`, building the sub-cluster index if
    /// absent. A key path with no matching rows returns `Ok(None)`, not an error.
    pub fn get_sub_cluster(
        &mut self,
        primary: &str,
        sub: &str,
        primary_value: &Value,
        sub_value: &Value,
    ) -> PipelineResult<Option<&Table>> {
        let key = (primary.to_string(), sub.to_string());
        if !self.sub_clusters.contains_key(&key) {
            self.create_sub_clusters(primary, sub)?;
        }

        Ok(self.sub_clusters[&key].get_table(primary_value, sub_value))
    }

    /// Remove every row whose value in `column` is in `values`; returns the removed count.
    ///
    /// Numeric membership crosses Int64/Float64 (`2` matches `2.0`).
    pub fn filter_by_column(&mut self, column: &str, values: &[Value]) -> PipelineResult<usize> {
        let col_idx = column_index(&self.table, column)?;
        let initial = self.table.row_count();

        self.table = self
            .table
            .filter_rows(|row| !values.iter().any(|v| value_matches(&row[col_idx], v)));

        let dropped = initial - self.table.row_count();
        self.invalidate_indices();
        Ok(dropped)
    }

    /// Keep only rows whose value in `column` is in `values`; returns the removed count.
    pub fn keep_only_values(&mut self, column: &str, values: &[Value]) -> PipelineResult<usize> {
        let col_idx = column_index(&self.table, column)?;
        let initial = self.table.row_count();

        self.table = self
            .table
            .filter_rows(|row| values.iter().any(|v| value_matches(&row[col_idx], v)));

        let dropped = initial - self.table.row_count();
        self.invalidate_indices();
        Ok(dropped)
    }

    /// Write the current table to `path`, creating missing intermediate directories.
    pub fn save(&self, path: impl AsRef<Path>, options: &SaveOptions) -> PipelineResult<()> {
        write_table(&self.table, path.as_ref(), options)
    }

    fn invalidate_indices(&mut self) {
        self.clusters.clear();
        self.sub_clusters.clear();
    }
}

fn value_matches(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int64(x), Value::Float64(y)) | (Value::Float64(y), Value::Int64(x)) => {
            *x as f64 == *y
        }
        _ => a == b,
    }
}

/// Title-case a string the way the sort normalization expects: the first alphabetic character
/// of each word is uppercased, the rest lowercased; any non-alphabetic character starts a new
/// word.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Field, Schema};

    fn region_table() -> Table {
        let schema = Schema::new(vec![
            Field::new("region", DataType::Utf8),
            Field::new("city", DataType::Utf8),
            Field::new("sales", DataType::Int64),
        ]);
        let rows = vec![
            vec![
                Value::Utf8("east".to_string()),
                Value::Utf8("Boston".to_string()),
                Value::Int64(10),
            ],
            vec![
                Value::Utf8("west".to_string()),
                Value::Utf8("Denver".to_string()),
                Value::Int64(20),
            ],
            vec![
                Value::Utf8("east".to_string()),
                Value::Utf8("Boston".to_string()),
                Value::Int64(30),
            ],
        ];
        Table::new(schema, rows)
    }

    #[test]
    fn title_case_matches_word_boundaries() {
        assert_eq!(title_case("east"), "East");
        assert_eq!(title_case("NEW york"), "New York");
        assert_eq!(title_case("semi-detached"), "Semi-Detached");
        assert_eq!(title_case("3 bed"), "3 Bed");
    }

    #[test]
    fn clusters_partition_the_region_table() {
        let mut store = TableStore::from_table(region_table());
        let index = store.create_clusters("region").unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.keys()[0], Value::Utf8("east".to_string()));
        assert_eq!(index.keys()[1], Value::Utf8("west".to_string()));

        let east = index.get(&Value::Utf8("east".to_string())).unwrap();
        let west = index.get(&Value::Utf8("west".to_string())).unwrap();
        assert_eq!(east.row_count(), 2);
        assert_eq!(west.row_count(), 1);

        // Partition property: disjoint union reconstructs the table's row set.
        let total: usize = index.iter().map(|(_, t)| t.row_count()).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn clusters_group_nulls_as_their_own_partition() {
        let schema = Schema::new(vec![Field::new("k", DataType::Utf8)]);
        let rows = vec![
            vec![Value::Utf8("a".to_string())],
            vec![Value::Null],
            vec![Value::Null],
        ];
        let mut store = TableStore::from_table(Table::new(schema, rows));
        let index = store.create_clusters("k").unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.get(&Value::Null).unwrap().row_count(), 2);
        let total: usize = index.iter().map(|(_, t)| t.row_count()).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn sub_clusters_partition_within_each_primary_group() {
        let mut store = TableStore::from_table(region_table());
        store.create_sub_clusters("region", "city").unwrap();

        let index = store.sub_cluster_index("region", "city").unwrap();
        assert_eq!(index.len(), 2);

        // Nested partition property: per-primary totals match the primary partition sizes.
        for (primary_value, sub_index) in index.iter() {
            let primary_rows = store
                .cluster_index("region")
                .unwrap()
                .get(primary_value)
                .unwrap()
                .row_count();
            let nested: usize = sub_index.iter().map(|(_, t)| t.row_count()).sum();
            assert_eq!(nested, primary_rows);
        }
    }

    #[test]
    fn get_sub_cluster_returns_none_for_missing_key_path() {
        let mut store = TableStore::from_table(region_table());
        let miss = store
            .get_sub_cluster(
                "region",
                "city",
                &Value::Utf8("east".to_string()),
                &Value::Utf8("Chicago".to_string()),
            )
            .unwrap();
        assert!(miss.is_none());

        let hit = store
            .get_sub_cluster(
                "region",
                "city",
                &Value::Utf8("east".to_string()),
                &Value::Utf8("Boston".to_string()),
            )
            .unwrap();
        assert_eq!(hit.unwrap().row_count(), 2);
    }

    #[test]
    fn filter_by_column_drops_matching_rows() {
        let mut store = TableStore::from_table(region_table());
        let dropped = store
            .filter_by_column("region", &[Value::Utf8("west".to_string())])
            .unwrap();

        assert_eq!(dropped, 1);
        assert_eq!(store.table().row_count(), 2);
        let region_idx = store.table().schema.index_of("region").unwrap();
        assert!(store
            .table()
            .rows
            .iter()
            .all(|r| r[region_idx] == Value::Utf8("east".to_string())));
    }

    #[test]
    fn filter_then_keep_same_values_empties_the_table() {
        let mut store = TableStore::from_table(region_table());
        let values = vec![Value::Utf8("east".to_string()), Value::Utf8("west".to_string())];
        store.filter_by_column("region", &values).unwrap();
        store.keep_only_values("region", &values).unwrap();
        assert_eq!(store.table().row_count(), 0);
    }

    #[test]
    fn numeric_membership_crosses_int_and_float() {
        let schema = Schema::new(vec![Field::new("n", DataType::Float64)]);
        let rows = vec![vec![Value::Float64(2.0)], vec![Value::Float64(3.5)]];
        let mut store = TableStore::from_table(Table::new(schema, rows));

        let dropped = store.filter_by_column("n", &[Value::Int64(2)]).unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(store.table().row_count(), 1);
    }

    #[test]
    fn custom_sort_orders_listed_then_unlisted_then_null() {
        let schema = Schema::new(vec![Field::new("kind", DataType::Utf8)]);
        let rows = vec![
            vec![Value::Null],
            vec![Value::Utf8("house".to_string())],
            vec![Value::Utf8("barn".to_string())],
            vec![Value::Utf8("CONDO".to_string())],
        ];
        let mut store = TableStore::from_table(Table::new(schema, rows));
        let order = vec!["Condo".to_string(), "House".to_string()];
        store.sort_by_custom_order("kind", &order).unwrap();

        let got: Vec<Value> = store.table().rows.iter().map(|r| r[0].clone()).collect();
        assert_eq!(
            got,
            vec![
                Value::Utf8("Condo".to_string()),
                Value::Utf8("House".to_string()),
                Value::Utf8("Barn".to_string()),
                Value::Null,
            ]
        );
    }

    #[test]
    fn custom_sort_is_idempotent_and_stable() {
        let schema = Schema::new(vec![
            Field::new("kind", DataType::Utf8),
            Field::new("id", DataType::Int64),
        ]);
        let rows = vec![
            vec![Value::Utf8("house".to_string()), Value::Int64(1)],
            vec![Value::Utf8("condo".to_string()), Value::Int64(2)],
            vec![Value::Utf8("house".to_string()), Value::Int64(3)],
        ];
        let mut store = TableStore::from_table(Table::new(schema, rows));
        let order = vec!["Condo".to_string(), "House".to_string()];

        store.sort_by_custom_order("kind", &order).unwrap();
        let once = store.table().rows.clone();
        store.sort_by_custom_order("kind", &order).unwrap();
        assert_eq!(store.table().rows, once);

        // Ties keep their original relative order.
        let ids: Vec<Value> = once.iter().map(|r| r[1].clone()).collect();
        assert_eq!(ids, vec![Value::Int64(2), Value::Int64(1), Value::Int64(3)]);
    }

    #[test]
    fn mutating_operations_invalidate_cached_indices() {
        let mut store = TableStore::from_table(region_table());
        store.create_sub_clusters("region", "city").unwrap();
        assert!(store.cluster_index("region").is_some());
        assert!(store.sub_cluster_index("region", "city").is_some());

        store
            .filter_by_column("region", &[Value::Utf8("west".to_string())])
            .unwrap();
        assert!(store.cluster_index("region").is_none());
        assert!(store.sub_cluster_index("region", "city").is_none());

        // Rebuilt indices see the filtered table.
        let index = store.create_clusters("region").unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn unknown_column_is_reported_with_available_names() {
        let mut store = TableStore::from_table(region_table());
        let err = store.create_clusters("nope").unwrap_err();
        match err {
            PipelineError::ColumnNotFound { column, available } => {
                assert_eq!(column, "nope");
                assert!(available.contains(&"region".to_string()));
            }
            other => panic!("expected ColumnNotFound, got {other:?}"),
        }
    }
}
