use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use crate::error::StoreError;

/// A row type with a primary key.
pub trait Keyed {
    type Key: Ord + Clone + Debug;

    const TABLE: &'static str;

    fn key(&self) -> Self::Key;
}

/// One table of the local store: rows ordered by primary key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "V: Serialize, V::Key: Serialize",
    deserialize = "V: Deserialize<'de>, V::Key: Deserialize<'de>"
))]
pub struct Table<V: Keyed> {
    rows: BTreeMap<V::Key, V>,
    // Prior value of every key touched since `begin`
    #[serde(skip)]
    journal: Option<BTreeMap<V::Key, Option<V>>>,
}

impl<V: Keyed> Default for Table<V> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            journal: None,
        }
    }
}

/// Undo support for a transaction. Only what changes after `begin` is
/// remembered, so rolling back costs the size of the change, not the table.
pub(crate) trait Journaled {
    fn begin(&mut self);
    fn commit(&mut self);
    fn rollback(&mut self);
}

impl<V: Keyed + Clone> Journaled for Table<V> {
    fn begin(&mut self) {
        self.journal = Some(BTreeMap::new());
    }

    fn commit(&mut self) {
        self.journal = None;
    }

    fn rollback(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };
        for (key, prior) in journal {
            match prior {
                Some(row) => {
                    self.rows.insert(key, row);
                }
                None => {
                    self.rows.remove(&key);
                }
            }
        }
    }
}

impl<V: Keyed + Clone> Table<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.rows.values()
    }

    pub fn get_all(&self) -> Vec<V> {
        self.rows.values().cloned().collect()
    }

    pub fn get_all_by_ids(&self, ids: &[V::Key]) -> Vec<V> {
        ids.iter().filter_map(|id| self.rows.get(id).cloned()).collect()
    }

    pub fn get_by_id(&self, id: &V::Key) -> Option<V> {
        self.rows.get(id).cloned()
    }

    pub fn get(&self, id: &V::Key) -> Option<&V> {
        self.rows.get(id)
    }

    pub fn get_mut(&mut self, id: &V::Key) -> Option<&mut V> {
        self.record(id);
        self.rows.get_mut(id)
    }

    pub fn exists(&self, id: &V::Key) -> bool {
        self.rows.contains_key(id)
    }

    /// Insert a new row, failing if the key is already taken.
    pub fn insert(&mut self, row: V) -> Result<(), StoreError> {
        let key = row.key();
        if self.rows.contains_key(&key) {
            return Err(StoreError::Conflict {
                table: V::TABLE,
                key: format!("{:?}", key),
            });
        }
        self.record(&key);
        self.rows.insert(key, row);
        Ok(())
    }

    pub fn insert_all(&mut self, rows: impl IntoIterator<Item = V>) -> Result<(), StoreError> {
        for row in rows {
            self.insert(row)?;
        }
        Ok(())
    }

    /// Insert or replace by key. Returns the previous row, if any.
    pub fn upsert(&mut self, row: V) -> Option<V> {
        let key = row.key();
        self.record(&key);
        self.rows.insert(key, row)
    }

    pub fn upsert_all(&mut self, rows: impl IntoIterator<Item = V>) {
        for row in rows {
            self.upsert(row);
        }
    }

    pub fn delete(&mut self, id: &V::Key) -> Option<V> {
        self.record(id);
        self.rows.remove(id)
    }

    /// Delete every row matching the predicate. Returns the number removed.
    pub fn delete_where(&mut self, mut predicate: impl FnMut(&V) -> bool) -> usize {
        let keys: Vec<V::Key> = self
            .rows
            .iter()
            .filter(|(_, row)| predicate(row))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            self.delete(key);
        }
        keys.len()
    }

    fn record(&mut self, key: &V::Key) {
        let Some(journal) = self.journal.as_mut() else {
            return;
        };
        if !journal.contains_key(key) {
            journal.insert(key.clone(), self.rows.get(key).cloned());
        }
    }
}

/// An ordered set of ids with the same undo support as `Table`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdSet<T: Ord> {
    items: BTreeSet<T>,
    #[serde(skip)]
    journal: Option<BTreeMap<T, bool>>,
}

impl<T: Ord> Default for IdSet<T> {
    fn default() -> Self {
        Self {
            items: BTreeSet::new(),
            journal: None,
        }
    }
}

impl<T: Ord + Clone> IdSet<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &T) -> bool {
        self.items.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Returns whether the id was new.
    pub fn insert(&mut self, id: T) -> bool {
        self.record(&id);
        self.items.insert(id)
    }

    pub fn remove(&mut self, id: &T) -> bool {
        self.record(id);
        self.items.remove(id)
    }

    pub fn extend(&mut self, ids: impl IntoIterator<Item = T>) {
        for id in ids {
            self.insert(id);
        }
    }

    fn record(&mut self, id: &T) {
        let Some(journal) = self.journal.as_mut() else {
            return;
        };
        if !journal.contains_key(id) {
            journal.insert(id.clone(), self.items.contains(id));
        }
    }
}

impl<T: Ord + Clone> Journaled for IdSet<T> {
    fn begin(&mut self) {
        self.journal = Some(BTreeMap::new());
    }

    fn commit(&mut self) {
        self.journal = None;
    }

    fn rollback(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };
        for (id, was_present) in journal {
            if was_present {
                self.items.insert(id);
            } else {
                self.items.remove(&id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: i64,
        name: &'static str,
    }

    impl Keyed for Row {
        type Key = i64;
        const TABLE: &'static str = "rows";

        fn key(&self) -> i64 {
            self.id
        }
    }

    #[test]
    fn test_insert_rejects_duplicate_key() {
        let mut table = Table::new();
        table.insert(Row { id: 1, name: "a" }).unwrap();
        let err = table.insert(Row { id: 1, name: "b" }).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { table: "rows", .. }));
        assert_eq!(table.get_by_id(&1).unwrap().name, "a");
    }

    #[test]
    fn test_upsert_replaces() {
        let mut table = Table::new();
        table.upsert(Row { id: 1, name: "a" });
        let previous = table.upsert(Row { id: 1, name: "b" });
        assert_eq!(previous.unwrap().name, "a");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get_by_id(&1).unwrap().name, "b");
    }

    #[test]
    fn test_get_all_by_ids_skips_missing() {
        let mut table = Table::new();
        table.upsert_all(vec![Row { id: 1, name: "a" }, Row { id: 3, name: "c" }]);
        let rows = table.get_all_by_ids(&[3, 2, 1]);
        assert_eq!(rows.len(), 2);
        assert!(table.exists(&3));
        assert!(!table.exists(&2));
    }

    #[test]
    fn test_rollback_restores_touched_rows() {
        let mut table = Table::new();
        table.upsert_all((1..=3).map(|id| Row { id, name: "x" }));

        table.begin();
        table.upsert(Row { id: 1, name: "changed" });
        table.upsert(Row { id: 1, name: "changed twice" });
        table.insert(Row { id: 4, name: "new" }).unwrap();
        table.delete(&2);
        if let Some(row) = table.get_mut(&3) {
            row.name = "edited";
        }
        table.rollback();

        assert_eq!(table.len(), 3);
        assert_eq!(table.get_by_id(&1).unwrap().name, "x");
        assert_eq!(table.get_by_id(&2).unwrap().name, "x");
        assert_eq!(table.get_by_id(&3).unwrap().name, "x");
        assert!(!table.exists(&4));
    }

    #[test]
    fn test_commit_ends_journal() {
        let mut table = Table::new();
        table.begin();
        table.upsert(Row { id: 1, name: "kept" });
        table.commit();
        // Nothing to undo once committed
        table.rollback();
        assert_eq!(table.get_by_id(&1).unwrap().name, "kept");
    }

    #[test]
    fn test_id_set_rollback() {
        let mut set = IdSet::default();
        set.insert(1);

        set.begin();
        set.extend([2, 3]);
        set.remove(&1);
        set.rollback();

        assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_delete_where() {
        let mut table = Table::new();
        table.upsert_all((1..=5).map(|id| Row { id, name: "x" }));
        assert_eq!(table.delete_where(|row| row.id % 2 == 0), 2);
        assert_eq!(table.len(), 3);
    }
}
