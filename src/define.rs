//! Preprocessor define lists

use std::collections::HashMap;

/// A set of preprocessor defines supplied to a compilation.
///
/// Maps a symbol name to its value; an empty value means
/// defined-with-no-value (`#define NAME`). Defines are independent symbol
/// substitutions, so iteration order never affects the compiled result.
///
/// # Example
/// ```
/// use shc::DefineList;
///
/// let mut defines = DefineList::new();
/// defines.add("_BUFFER_SIZE", "42");
/// defines.add_flag("_RAY_TRACING");
/// assert_eq!(defines.get("_BUFFER_SIZE"), Some("42"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefineList {
    defines: HashMap<String, String>,
}

impl DefineList {
    /// Creates an empty define list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a define, overwriting any previous value for the same name.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.defines.insert(name.into(), value.into());
    }

    /// Inserts a define with an empty value.
    pub fn add_flag(&mut self, name: impl Into<String>) {
        self.add(name, "");
    }

    /// Removes a define if present; no-op otherwise.
    pub fn remove(&mut self, name: &str) {
        self.defines.remove(name);
    }

    /// Looks up the value of a define.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.defines.get(name).map(String::as_str)
    }

    /// Returns the number of defines.
    pub fn len(&self) -> usize {
        self.defines.len()
    }

    /// Returns true if no defines are set.
    pub fn is_empty(&self) -> bool {
        self.defines.is_empty()
    }

    /// Iterates over `(name, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defines.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for DefineList {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut list = DefineList::new();
        list.extend(iter);
        list
    }
}

impl<N: Into<String>, V: Into<String>> Extend<(N, V)> for DefineList {
    fn extend<I: IntoIterator<Item = (N, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.add(name, value);
        }
    }
}
