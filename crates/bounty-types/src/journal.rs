//! Savepoint journaling for all-or-nothing operations
//!
//! Stores record undo information while a savepoint is open. Savepoints
//! nest: a component operation opens its own savepoint inside the one
//! opened by its caller, and only the outermost commit discards the undo
//! log. Rolling back restores exactly the state at the matching `begin`.

use std::collections::HashMap;
use std::hash::Hash;

/// A store that can stage mutations and undo them.
pub trait Transactional {
    /// Open a savepoint
    fn begin(&mut self);
    /// Keep everything done since the matching `begin`
    fn commit(&mut self);
    /// Undo everything done since the matching `begin`
    fn rollback(&mut self);
}

/// Run `$body` with a savepoint open on every listed part.
///
/// All parts commit when the body returns `Ok`, all roll back otherwise.
#[macro_export]
macro_rules! atomically {
    ([$($part:expr),+ $(,)?], $body:expr) => {{
        $( $crate::Transactional::begin($part); )+
        let result = $body;
        match &result {
            Ok(_) => { $( $crate::Transactional::commit($part); )+ }
            Err(_) => { $( $crate::Transactional::rollback($part); )+ }
        }
        result
    }};
}

/// Hash map that journals previous values while a savepoint is open
#[derive(Clone, Debug)]
pub struct JournaledMap<K, V> {
    entries: HashMap<K, V>,
    undo: Vec<(K, Option<V>)>,
    savepoints: Vec<usize>,
}

impl<K, V> Default for JournaledMap<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            undo: Vec::new(),
            savepoints: Vec::new(),
        }
    }
}

impl<K, V> JournaledMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let previous = self.entries.insert(key.clone(), value);
        self.journal(key, previous.clone());
        previous
    }

    /// Apply `f` to an existing entry. Returns `None` when absent.
    pub fn update<R>(&mut self, key: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let entry = self.entries.get_mut(key)?;
        let previous = entry.clone();
        let out = f(entry);
        self.journal(key.clone(), Some(previous));
        Some(out)
    }

    /// Apply `f` to the entry, creating it from `V::default()` first if absent.
    pub fn upsert<R>(&mut self, key: K, f: impl FnOnce(&mut V) -> R) -> R
    where
        V: Default,
    {
        let previous = self.entries.get(&key).cloned();
        let out = f(self.entries.entry(key.clone()).or_default());
        self.journal(key, previous);
        out
    }

    /// Number of open savepoints
    pub fn depth(&self) -> usize {
        self.savepoints.len()
    }

    fn journal(&mut self, key: K, previous: Option<V>) {
        if !self.savepoints.is_empty() {
            self.undo.push((key, previous));
        }
    }
}

impl<K, V> Transactional for JournaledMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn begin(&mut self) {
        self.savepoints.push(self.undo.len());
    }

    fn commit(&mut self) {
        if self.savepoints.pop().is_some() && self.savepoints.is_empty() {
            self.undo.clear();
        }
    }

    fn rollback(&mut self) {
        let Some(mark) = self.savepoints.pop() else {
            return;
        };
        while self.undo.len() > mark {
            if let Some((key, previous)) = self.undo.pop() {
                match previous {
                    Some(value) => {
                        self.entries.insert(key, value);
                    }
                    None => {
                        self.entries.remove(&key);
                    }
                }
            }
        }
    }
}

/// A single value (counter, running total) with savepoint snapshots
#[derive(Clone, Debug, Default)]
pub struct Checkpoint<T> {
    value: T,
    saved: Vec<T>,
}

impl<T: Clone> Checkpoint<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            saved: Vec::new(),
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
    }

    pub fn update<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.value)
    }
}

impl<T: Clone> Transactional for Checkpoint<T> {
    fn begin(&mut self) {
        self.saved.push(self.value.clone());
    }

    fn commit(&mut self) {
        self.saved.pop();
    }

    fn rollback(&mut self) {
        if let Some(value) = self.saved.pop() {
            self.value = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MarketError, MarketResult};
    use proptest::prelude::*;

    #[test]
    fn rollback_restores_inserted_and_updated() {
        let mut map: JournaledMap<u32, String> = JournaledMap::new();
        map.insert(1, "one".into());

        map.begin();
        map.insert(2, "two".into());
        map.update(&1, |v| v.push('!'));
        map.rollback();

        assert_eq!(map.get(&1).map(String::as_str), Some("one"));
        assert!(!map.contains_key(&2));
    }

    #[test]
    fn writes_outside_savepoint_are_not_journaled() {
        let mut map: JournaledMap<u32, u32> = JournaledMap::new();
        map.insert(1, 1);
        map.rollback();
        assert_eq!(map.get(&1), Some(&1));
    }

    #[test]
    fn nested_commit_is_undone_by_outer_rollback() {
        let mut map: JournaledMap<u32, u32> = JournaledMap::new();
        let mut total = Checkpoint::new(0u64);

        map.begin();
        total.begin();
        map.insert(1, 10);
        total.set(10);

        map.begin();
        total.begin();
        map.insert(2, 20);
        total.set(30);
        map.commit();
        total.commit();

        map.rollback();
        total.rollback();

        assert!(map.is_empty());
        assert_eq!(*total.get(), 0);
        assert_eq!(map.depth(), 0);
    }

    #[test]
    fn inner_rollback_keeps_outer_work() {
        let mut map: JournaledMap<&'static str, Vec<u32>> = JournaledMap::new();
        map.begin();
        map.upsert("a", |v| v.push(1));
        map.begin();
        map.upsert("a", |v| v.push(2));
        map.upsert("b", |v| v.push(3));
        map.rollback();
        map.commit();

        assert_eq!(map.get(&"a"), Some(&vec![1]));
        assert!(!map.contains_key(&"b"));
    }

    #[test]
    fn atomically_rolls_back_every_part() {
        let mut map: JournaledMap<u32, u32> = JournaledMap::new();
        let mut counter = Checkpoint::new(1u64);

        let result: MarketResult<()> = atomically!([&mut map, &mut counter], {
            map.insert(7, 7);
            counter.set(2);
            Err(MarketError::InvalidState("boom".into()))
        });

        assert!(result.is_err());
        assert!(map.is_empty());
        assert_eq!(*counter.get(), 1);

        let result: MarketResult<u64> = atomically!([&mut map, &mut counter], {
            map.insert(8, 8);
            counter.set(3);
            Ok(*counter.get())
        });
        assert_eq!(result, Ok(3));
        assert_eq!(map.get(&8), Some(&8));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(u8, u8),
        Update(u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (any::<u8>(), any::<u8>()).prop_map(|(k, v)| Op::Insert(k % 8, v)),
            any::<u8>().prop_map(|k| Op::Update(k % 8)),
        ]
    }

    proptest! {
        #[test]
        fn property_rollback_restores_snapshot(
            seed in proptest::collection::vec((any::<u8>(), any::<u8>()), 0..8),
            ops in proptest::collection::vec(op_strategy(), 0..24),
        ) {
            let mut map: JournaledMap<u8, u8> = JournaledMap::new();
            for (k, v) in seed {
                map.insert(k % 8, v);
            }
            let before: HashMap<u8, u8> = map.iter().map(|(k, v)| (*k, *v)).collect();

            map.begin();
            for op in ops {
                match op {
                    Op::Insert(k, v) => { map.insert(k, v); }
                    Op::Update(k) => { map.update(&k, |v| *v = v.wrapping_add(1)); }
                }
            }
            map.rollback();

            let after: HashMap<u8, u8> = map.iter().map(|(k, v)| (*k, *v)).collect();
            prop_assert_eq!(before, after);
        }
    }
}
