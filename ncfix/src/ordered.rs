use std::{collections::HashSet, slice};

use crate::errors::{Error, Result};

/// A string keyed map that remembers insertion order.
///
/// Dimensions, variables and attributes of an array file all have a meaningful order, which is
/// the order they are declared in when a file is written. Entries live in a plain vector, so
/// lookups are linear; the maps held by a file are small.
///
#[derive(Clone, Debug, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self { entries: vec![] }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Insert a value, overwriting in place if `key` is already present, otherwise appending.
    ///
    /// Returns the previous value, if any.
    ///
    pub fn insert<S: Into<String>>(&mut self, key: S, value: V) -> Option<V> {
        let key = key.into();
        match self.get_mut(&key) {
            Some(existing) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Remove an entry, leaving the order of the remaining entries as it was.
    ///
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let index = self.position(key)?;
        Some(self.entries.remove(index).1)
    }

    /// Change the key of an entry without moving it.
    ///
    /// If another entry already uses `new`, it keeps its position and takes the value of `old`,
    /// and `old` is removed. Returns `false` if `old` is not present, in which case the map is
    /// untouched.
    ///
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        let Some(index) = self.position(old) else {
            return false;
        };
        if old == new {
            return true;
        }

        match self.position(new) {
            Some(other) => {
                let (_, value) = self.entries.remove(index);
                let other = if other > index { other - 1 } else { other };
                self.entries[other].1 = value;
            }
            None => self.entries[index].0 = new.to_string(),
        }

        true
    }

    /// Rebuild the map in the exact order given by `order`.
    ///
    /// # Errors
    ///
    /// * `ArityMismatch` if `order` doesn't name every entry exactly once by count, or names an
    ///   entry twice.
    /// * `KeyNotFound` if `order` names a key that isn't in the map.
    ///
    pub fn reorder<S: AsRef<str>>(&mut self, order: &[S]) -> Result<()> {
        if order.len() != self.len() {
            return Err(Error::ArityMismatch {
                expected: self.len(),
                found: order.len(),
            });
        }

        let mut seen = HashSet::new();
        for key in order {
            let key = key.as_ref();
            if !self.contains_key(key) {
                return Err(Error::KeyNotFound(key.to_string()));
            }
            seen.insert(key);
        }
        if seen.len() != self.len() {
            return Err(Error::ArityMismatch {
                expected: self.len(),
                found: seen.len(),
            });
        }

        let mut entries: Vec<Option<(String, V)>> = self.entries.drain(..).map(Some).collect();
        for key in order {
            let key = key.as_ref();
            let slot = entries
                .iter_mut()
                .find(|entry| matches!(entry, Some((k, _)) if k == key))
                .and_then(Option::take);
            if let Some(entry) = slot {
                self.entries.push(entry);
            }
        }

        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.iter_mut().map(|(_, v)| v)
    }

    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            inner: self.entries.iter(),
        }
    }
}

pub struct Iter<'a, V> {
    inner: slice::Iter<'a, (String, V)>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.as_str(), v))
    }
}

impl<'a, V> IntoIterator for &'a OrderedMap<V> {
    type Item = (&'a str, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }

        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> OrderedMap<i32> {
        [("a", 1), ("b", 2), ("c", 3)].into_iter().collect()
    }

    #[test]
    fn insert_appends_or_overwrites() {
        let mut map = abc();
        assert_eq!(map.insert("b", 20), Some(2));
        assert_eq!(map.insert("d", 4), None);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b", "c", "d"]);
        assert_eq!(map.get("b"), Some(&20));
    }

    #[test]
    fn remove_keeps_order() {
        let mut map = abc();
        assert_eq!(map.remove("b"), Some(2));
        assert_eq!(map.remove("b"), None);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn rename_keeps_position() {
        let mut map = abc();
        assert!(map.rename("b", "beta"));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "beta", "c"]);
        assert_eq!(map.get("beta"), Some(&2));
        assert!(!map.rename("nope", "x"));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn rename_onto_existing_key_takes_its_place() {
        let mut map = abc();
        assert!(map.rename("c", "a"));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(map.get("a"), Some(&3));

        let mut map = abc();
        assert!(map.rename("a", "c"));
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![("b", &2), ("c", &1)]);
    }

    #[test]
    fn reorder() -> Result<()> {
        let mut map = abc();
        map.reorder(&["c", "a", "b"])?;
        assert_eq!(
            map.iter().collect::<Vec<_>>(),
            vec![("c", &3), ("a", &1), ("b", &2)]
        );

        Ok(())
    }

    #[test]
    fn reorder_wrong_length() {
        let mut map = abc();
        match map.reorder(&["a", "b"]) {
            Err(Error::ArityMismatch { expected, found }) => {
                assert_eq!((expected, found), (3, 2));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(map, abc());
    }

    #[test]
    fn reorder_unknown_key() {
        let mut map = abc();
        match map.reorder(&["a", "b", "z"]) {
            Err(Error::KeyNotFound(key)) => assert_eq!(key, "z"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(map, abc());
    }

    #[test]
    fn reorder_duplicate_key() {
        let mut map = abc();
        assert!(matches!(
            map.reorder(&["a", "a", "b"]),
            Err(Error::ArityMismatch {
                expected: 3,
                found: 2
            })
        ));
        assert_eq!(map, abc());
    }
}
