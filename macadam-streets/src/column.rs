//! Extend-only column primitives backing the stores.
//!
//! A [`SpliceList`] presents the concatenation of an immutable shared
//! baseline and a private tail as one indexable list. A root store owns
//! its baseline uniquely and may mutate it in place; an extend-only copy
//! shares the baseline by pointer and may only append.

use std::collections::HashMap;
use std::sync::Arc;

use crate::StoreError;

/// A paired pseudo-list: shared baseline + private tail.
///
/// Reads dispatch on the baseline length. Writes into the baseline range
/// of an extended copy fail with
/// [`StoreError::ImmutableBaselineViolation`]; the same writes on a root
/// list mutate in place (the `Arc` is still uniquely held there).
#[derive(Debug, Clone)]
pub(crate) struct SpliceList<T> {
    shared: Arc<Vec<T>>,
    tail: Vec<T>,
    extended: bool,
}

impl<T: Clone> SpliceList<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Vec::new()),
            tail: Vec::new(),
            extended: false,
        }
    }

    /// A new list sharing this one's storage as an immutable baseline.
    ///
    /// Only valid on a root list; copies of copies are not supported.
    pub fn extend_only_copy(&self) -> Self {
        debug_assert!(!self.extended, "extend-only copies nest only one level");
        Self {
            shared: Arc::clone(&self.shared),
            tail: Vec::new(),
            extended: true,
        }
    }

    pub fn len(&self) -> usize {
        self.shared.len() + self.tail.len()
    }

    /// Index of the first element that may be mutated. Zero for a root
    /// list, the baseline length for an extended copy.
    pub fn first_extendable(&self) -> usize {
        if self.extended { self.shared.len() } else { 0 }
    }

    pub fn get(&self, index: usize) -> &T {
        if index < self.shared.len() {
            &self.shared[index]
        } else {
            &self.tail[index - self.shared.len()]
        }
    }

    /// Replaces the element at `index`.
    ///
    /// # Errors
    ///
    /// [`StoreError::ImmutableBaselineViolation`] when `index` lies in the
    /// shared baseline of an extended copy.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set(&mut self, index: usize, value: T) -> Result<(), StoreError> {
        if index < self.shared.len() {
            if self.extended {
                return Err(StoreError::ImmutableBaselineViolation(index as u32));
            }
            Arc::make_mut(&mut self.shared)[index] = value;
        } else {
            self.tail[index - self.shared.len()] = value;
        }
        Ok(())
    }

    pub fn push(&mut self, value: T) {
        if self.extended {
            self.tail.push(value);
        } else {
            Arc::make_mut(&mut self.shared).push(value);
        }
    }
}

/// An extend-only list whose *entries* are copy-on-write.
///
/// Used for per-vertex incidence lists: an overlay that splits an edge
/// must grow or shrink the edge list of a baseline vertex without the
/// baseline observing anything. Patched entries live in a private map.
#[derive(Debug, Clone)]
pub(crate) struct PatchedList<T> {
    shared: Arc<Vec<T>>,
    tail: Vec<T>,
    patched: HashMap<usize, T>,
    extended: bool,
}

impl<T: Clone> PatchedList<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Vec::new()),
            tail: Vec::new(),
            patched: HashMap::new(),
            extended: false,
        }
    }

    pub fn extend_only_copy(&self) -> Self {
        debug_assert!(!self.extended, "extend-only copies nest only one level");
        Self {
            shared: Arc::clone(&self.shared),
            tail: Vec::new(),
            patched: HashMap::new(),
            extended: true,
        }
    }

    pub fn len(&self) -> usize {
        self.shared.len() + self.tail.len()
    }

    pub fn get(&self, index: usize) -> &T {
        if let Some(patch) = self.patched.get(&index) {
            return patch;
        }
        if index < self.shared.len() {
            &self.shared[index]
        } else {
            &self.tail[index - self.shared.len()]
        }
    }

    /// Mutates the entry at `index` in place, copying it out of the
    /// shared baseline first when necessary.
    pub fn modify(&mut self, index: usize, f: impl FnOnce(&mut T)) {
        if index < self.shared.len() {
            if self.extended {
                let entry = self
                    .patched
                    .entry(index)
                    .or_insert_with(|| self.shared[index].clone());
                f(entry);
            } else {
                f(&mut Arc::make_mut(&mut self.shared)[index]);
            }
        } else {
            f(&mut self.tail[index - self.shared.len()]);
        }
    }

    pub fn push(&mut self, value: T) {
        if self.extended {
            self.tail.push(value);
        } else {
            Arc::make_mut(&mut self.shared).push(value);
        }
    }
}
