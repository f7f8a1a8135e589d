//! Variable-name deduplication for one decode session.

use std::collections::HashSet;

/// Renames repeated variable names with a session-wide suffix counter.
///
/// A name seen before anywhere in the session, in this plot or an earlier
/// one, gets the current counter appended and the counter advances. The
/// first occurrence keeps its name. Create one resolver per file decode and
/// never share it between decodes.
#[derive(Clone, Debug, Default)]
pub struct VariableNameResolver {
    seen: HashSet<String>,
    next_suffix: usize,
}

impl VariableNameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the unique name to use for `name` and record it.
    pub fn resolve(&mut self, name: &str) -> String {
        let mut resolved = name.to_string();
        while self.seen.contains(&resolved) {
            resolved = format!("{}{}", name, self.next_suffix);
            self.next_suffix += 1;
        }
        if resolved != name {
            tracing::debug!("Renamed duplicate variable '{}' to '{}'", name, resolved);
        }
        self.seen.insert(resolved.clone());
        resolved
    }

    /// Suffix the next collision will receive.
    #[inline]
    pub fn next_suffix(&self) -> usize {
        self.next_suffix
    }
}
