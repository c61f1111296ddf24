//! The `DynamicMap` container
//!
//! A `DynamicMap` is a handle onto a shared entry table. Cloning the handle
//! shares the table, which is how a nested map stays addressable by callers
//! after it has been stored in a parent. Handles are single-threaded (`!Send`).

use crate::value::Value;
use jmap_format::Policy;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A value together with its serialization policy
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Entry {
    /// Stored value
    pub value: Value,
    /// Serialization policy
    pub policy: Policy,
}

impl Entry {
    /// Create an entry
    pub fn new(value: impl Into<Value>, policy: Policy) -> Self {
        Self {
            value: value.into(),
            policy,
        }
    }
}

pub(crate) struct Inner {
    pub(crate) entries: RefCell<HashMap<String, Entry>>,
    // Set while Debug walks this table; breaks reference cycles.
    visiting: Cell<bool>,
    // Tables this one is being compared against right now.
    comparing: RefCell<Vec<*const Inner>>,
}

/// String-keyed map of values with per-entry serialization policies
#[derive(Clone)]
pub struct DynamicMap {
    pub(crate) inner: Rc<Inner>,
}

impl DynamicMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty map with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Rc::new(Inner {
                entries: RefCell::new(HashMap::with_capacity(capacity)),
                visiting: Cell::new(false),
                comparing: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Number of entries, whatever their policy
    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    /// True when the map has no entries
    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }

    /// Stored value for `key`.
    ///
    /// Returns `None` for an absent key and `Some(Value::Null)` for a key
    /// stored with a null value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner
            .entries
            .borrow()
            .get(key)
            .map(|entry| entry.value.clone())
    }

    /// True when `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.entries.borrow().contains_key(key)
    }

    /// Policy of the entry at `key`
    pub fn policy(&self, key: &str) -> Option<Policy> {
        self.inner.entries.borrow().get(key).map(|entry| entry.policy)
    }

    /// Copy of the entry at `key`
    pub fn entry(&self, key: &str) -> Option<Entry> {
        self.inner.entries.borrow().get(key).cloned()
    }

    /// Insert or overwrite `key` with the `Default` policy
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.set_with(key, value, Policy::Default);
    }

    /// Insert or overwrite `key` with an explicit policy.
    ///
    /// A `DynamicMap` value is stored by handle, not copied.
    pub fn set_with(&self, key: impl Into<String>, value: impl Into<Value>, policy: Policy) {
        self.insert_entry(key.into(), Entry::new(value, policy));
    }

    /// Change the policy of an existing entry. Returns false if `key` is absent.
    pub fn set_policy(&self, key: &str, policy: Policy) -> bool {
        match self.inner.entries.borrow_mut().get_mut(key) {
            Some(entry) => {
                entry.policy = policy;
                true
            }
            None => false,
        }
    }

    /// Remove `key`, returning its entry. Absent keys are a no-op.
    pub fn delete(&self, key: &str) -> Option<Entry> {
        self.inner.entries.borrow_mut().remove(key)
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.inner.entries.borrow_mut().clear();
    }

    /// Snapshot of the keys, in no particular order
    pub fn keys(&self) -> Vec<String> {
        self.inner.entries.borrow().keys().cloned().collect()
    }

    /// Snapshot of the entries, in no particular order
    pub fn entries(&self) -> Vec<(String, Entry)> {
        self.inner
            .entries
            .borrow()
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    /// Shallow plain view of the map.
    ///
    /// Policies are dropped and the empty-string key is skipped. Nested maps
    /// stay as `Value::Map` handles.
    pub fn flatten(&self) -> HashMap<String, Value> {
        self.inner
            .entries
            .borrow()
            .iter()
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    /// Independent copy of this map and every map nested in it.
    ///
    /// Sharing inside the tree is preserved: a map reachable twice is copied
    /// once, and cycles are reproduced in the copy.
    pub fn deep_clone(&self) -> DynamicMap {
        let mut copies = HashMap::new();
        self.deep_clone_into(&mut copies)
    }

    fn deep_clone_into(&self, copies: &mut HashMap<*const Inner, DynamicMap>) -> DynamicMap {
        if let Some(copy) = copies.get(&Rc::as_ptr(&self.inner)) {
            return copy.clone();
        }

        let copy = DynamicMap::with_capacity(self.len());
        copies.insert(Rc::as_ptr(&self.inner), copy.clone());

        for (key, entry) in self.entries() {
            let value = deep_clone_value(entry.value, copies);
            copy.insert_entry(key, Entry::new(value, entry.policy));
        }
        copy
    }

    /// True when both handles refer to the same table
    pub fn ptr_eq(a: &DynamicMap, b: &DynamicMap) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    pub(crate) fn insert_entry(&self, key: String, entry: Entry) {
        self.inner.entries.borrow_mut().insert(key, entry);
    }

    pub(crate) fn ptr(&self) -> *const Inner {
        Rc::as_ptr(&self.inner)
    }
}

fn deep_clone_value(value: Value, copies: &mut HashMap<*const Inner, DynamicMap>) -> Value {
    match value {
        Value::Map(map) => Value::Map(map.deep_clone_into(copies)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| deep_clone_value(item, copies))
                .collect(),
        ),
        other => other,
    }
}

impl Default for DynamicMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks a table as being walked for the lifetime of the guard.
struct VisitGuard<'a>(&'a Inner);

impl<'a> VisitGuard<'a> {
    /// Returns `None` when the table is already being walked.
    fn enter(inner: &'a Inner) -> Option<Self> {
        if inner.visiting.replace(true) {
            None
        } else {
            Some(Self(inner))
        }
    }
}

impl Drop for VisitGuard<'_> {
    fn drop(&mut self) {
        self.0.visiting.set(false);
    }
}

struct CompareGuard<'a>(&'a Inner);

impl<'a> CompareGuard<'a> {
    /// Returns `None` when `inner` is already being compared with `other`.
    fn enter(inner: &'a Inner, other: *const Inner) -> Option<Self> {
        let mut comparing = inner.comparing.borrow_mut();
        if comparing.contains(&other) {
            return None;
        }
        comparing.push(other);
        Some(Self(inner))
    }
}

impl Drop for CompareGuard<'_> {
    fn drop(&mut self) {
        self.0.comparing.borrow_mut().pop();
    }
}

impl fmt::Debug for DynamicMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(_guard) = VisitGuard::enter(&self.inner) else {
            return f.write_str("DynamicMap(<cycle>)");
        };
        let entries = self.inner.entries.borrow();
        let mut keys: Vec<&String> = entries.keys().collect();
        keys.sort();
        let mut map = f.debug_map();
        for key in keys {
            let entry = &entries[key];
            if entry.policy == Policy::Default {
                map.entry(key, &entry.value);
            } else {
                map.entry(key, &(entry.policy, &entry.value));
            }
        }
        map.finish()
    }
}

impl PartialEq for DynamicMap {
    /// Same handle, or the same keys with equal values and policies.
    ///
    /// A comparison that loops back to a pair of maps already being compared
    /// counts that pair as equal.
    fn eq(&self, other: &Self) -> bool {
        if DynamicMap::ptr_eq(self, other) {
            return true;
        }
        let Some(_guard) = CompareGuard::enter(&self.inner, other.ptr()) else {
            return true;
        };
        let ours = self.inner.entries.borrow();
        let theirs = other.inner.entries.borrow();
        ours.len() == theirs.len()
            && ours
                .iter()
                .all(|(key, entry)| theirs.get(key) == Some(entry))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for DynamicMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = DynamicMap::new();
        map.extend(iter);
        map
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for DynamicMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREETING: &str = "greeting";
    const HELLO: &str = "hello";
    const LOCATION: &str = "location";
    const NESTED: &str = "nested";

    #[test]
    fn new_map_is_empty() {
        let map = DynamicMap::new();
        assert_eq!(map.len(), 0);
        assert!(map.is_empty());
        assert!(map.keys().is_empty());
    }

    #[test]
    fn set_and_get() {
        let map = DynamicMap::new();
        map.set(GREETING, HELLO);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(GREETING).unwrap(), HELLO);
        assert_eq!(map.policy(GREETING), Some(Policy::Default));
    }

    #[test]
    fn set_overwrites_value_and_policy() {
        let map = DynamicMap::new();
        map.set_with(GREETING, HELLO, Policy::Omit);
        map.set(GREETING, "howdy");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(GREETING).unwrap(), "howdy");
        assert_eq!(map.policy(GREETING), Some(Policy::Default));
    }

    #[test]
    fn get_distinguishes_absent_from_null() {
        let map = DynamicMap::new();
        map.set("empty", Value::Null);
        assert_eq!(map.get("empty"), Some(Value::Null));
        assert_eq!(map.get("missing"), None);
        assert!(map.contains_key("empty"));
        assert!(!map.contains_key("missing"));
    }

    #[test]
    fn len_counts_every_policy() {
        let map = DynamicMap::new();
        map.set_with("a", 1, Policy::Omit);
        map.set_with("b", 2, Policy::Null);
        map.set_with("c", Value::Null, Policy::OmitEmpty);
        map.set("d", 4);
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn delete_present_and_absent() {
        let map = DynamicMap::new();
        map.set(GREETING, HELLO);
        map.set(LOCATION, "us");
        assert_eq!(map.len(), 2);

        let removed = map.delete(GREETING).unwrap();
        assert_eq!(removed.value, HELLO);
        assert_eq!(map.len(), 1);

        assert!(map.delete("missing").is_none());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn set_policy_only_touches_existing() {
        let map = DynamicMap::new();
        map.set(GREETING, HELLO);
        assert!(map.set_policy(GREETING, Policy::Null));
        assert_eq!(map.policy(GREETING), Some(Policy::Null));
        assert!(!map.set_policy("missing", Policy::Omit));
        assert!(!map.contains_key("missing"));
    }

    #[test]
    fn nested_map_is_shared_by_handle() {
        let parent = DynamicMap::new();
        let child = DynamicMap::new();
        parent.set(NESTED, &child);

        child.set(LOCATION, "us");

        let stored = parent.get(NESTED).unwrap();
        let stored = stored.as_map().unwrap();
        assert!(DynamicMap::ptr_eq(stored, &child));
        assert_eq!(stored.get(LOCATION).unwrap(), "us");
    }

    #[test]
    fn flatten_skips_empty_key_and_policies() {
        let map = DynamicMap::new();
        map.set(GREETING, HELLO);
        map.set_with("", "reserved", Policy::Default);
        map.set_with("hidden", 1, Policy::Omit);

        let child = DynamicMap::new();
        child.set(LOCATION, "us");
        map.set(NESTED, &child);

        let flat = map.flatten();
        assert_eq!(map.len(), 4);
        assert_eq!(flat.len(), 3);
        assert!(!flat.contains_key(""));
        assert_eq!(flat[GREETING], HELLO);
        assert_eq!(flat["hidden"], 1i64);

        // Nested maps are not flattened recursively
        let nested = flat[NESTED].as_map().unwrap();
        assert!(DynamicMap::ptr_eq(nested, &child));
        assert_eq!(nested.flatten()[LOCATION], "us");
    }

    #[test]
    fn deep_clone_is_independent() {
        let map = DynamicMap::new();
        let child = DynamicMap::new();
        child.set(LOCATION, "us");
        map.set_with(NESTED, &child, Policy::Null);

        let copy = map.deep_clone();
        assert_eq!(copy, map);

        child.set(LOCATION, "ca");
        let copied_child = copy.get(NESTED).unwrap();
        assert_eq!(copied_child.as_map().unwrap().get(LOCATION).unwrap(), "us");
        assert_eq!(copy.policy(NESTED), Some(Policy::Null));
    }

    #[test]
    fn deep_clone_preserves_cycles() {
        let map = DynamicMap::new();
        map.set("self", &map);

        let copy = map.deep_clone();
        let inner = copy.get("self").unwrap();
        assert!(DynamicMap::ptr_eq(inner.as_map().unwrap(), &copy));
        assert!(!DynamicMap::ptr_eq(&copy, &map));

        // Break the cycles so both tables are freed
        map.clear();
        copy.clear();
    }

    #[test]
    fn equality_is_structural() {
        let a = DynamicMap::new();
        a.set(GREETING, HELLO);
        let b = DynamicMap::new();
        b.set(GREETING, HELLO);
        assert_eq!(a, b);

        b.set_policy(GREETING, Policy::Omit);
        assert_ne!(a, b);
    }

    #[test]
    fn cyclic_maps_compare_pairwise() {
        let looped = DynamicMap::new();
        looped.set("k", &looped);

        let leaf = DynamicMap::new();
        leaf.set("k", 1);
        let shallow = DynamicMap::new();
        shallow.set("k", &leaf);
        assert_ne!(looped, shallow);
        assert_ne!(shallow, looped);

        let twin = DynamicMap::new();
        twin.set("k", &twin);
        assert_eq!(looped, twin);

        looped.clear();
        twin.clear();
    }

    #[test]
    fn debug_output_terminates_on_cycles() {
        let map = DynamicMap::new();
        map.set(GREETING, HELLO);
        map.set_with("loop", &map, Policy::Omit);

        let rendered = format!("{:?}", map);
        assert!(rendered.contains("<cycle>"));
        assert!(rendered.contains("hello"));

        map.clear();
    }

    #[test]
    fn from_iterator_uses_default_policy() {
        let map: DynamicMap = vec![("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(map.len(), 2);
        assert_eq!(map.policy("a"), Some(Policy::Default));
        assert_eq!(map.get("b").unwrap(), 2i64);
    }
}
