//! NavigationPath - One Stack's Pushed History
//!
//! The path only grows by `push` and only shrinks by truncation. Every
//! shrinking operation is all-or-nothing: it either reaches the requested
//! length or leaves the path untouched.

/// Ordered sequence of destinations pushed onto one stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationPath<D> {
    entries: Vec<D>,
}

impl<D> Default for NavigationPath<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> NavigationPath<D> {
    pub fn new() -> Self {
        NavigationPath {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&D> {
        self.entries.last()
    }

    pub fn get(&self, index: usize) -> Option<&D> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, D> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[D] {
        &self.entries
    }

    pub fn push(&mut self, destination: D) {
        self.entries.push(destination);
    }

    /// Remove `count` trailing entries, or nothing at all.
    pub fn pop(&mut self, count: usize) -> bool {
        if count == 0 || count > self.entries.len() {
            return false;
        }
        let target = self.entries.len() - count;
        self.entries.truncate(target);
        true
    }

    /// Truncate to exactly `index` entries.
    ///
    /// Returns `false` without touching the path when `index` exceeds the
    /// current length. Truncating to the current length succeeds as a no-op.
    pub fn truncate_to(&mut self, index: usize) -> bool {
        if index > self.entries.len() {
            return false;
        }
        self.entries.truncate(index);
        true
    }

    /// Replace the whole history.
    pub fn replace(&mut self, entries: Vec<D>) {
        self.entries = entries;
    }
}

impl<D> From<Vec<D>> for NavigationPath<D> {
    fn from(entries: Vec<D>) -> Self {
        NavigationPath { entries }
    }
}

impl<D> FromIterator<D> for NavigationPath<D> {
    fn from_iter<I: IntoIterator<Item = D>>(iter: I) -> Self {
        NavigationPath {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a, D> IntoIterator for &'a NavigationPath<D> {
    type Item = &'a D;
    type IntoIter = std::slice::Iter<'a, D>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
