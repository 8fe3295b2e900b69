//! Technology tree - unlocked node ids queried by stat modifiers

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechTree {
    unlocked: AHashSet<String>,
}

impl TechTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the node was already unlocked
    pub fn unlock(&mut self, node: impl Into<String>) -> bool {
        self.unlocked.insert(node.into())
    }

    pub fn has_node(&self, node: &str) -> bool {
        self.unlocked.contains(node)
    }

    pub fn len(&self) -> usize {
        self.unlocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unlocked.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for TechTree {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self { unlocked: iter.into_iter().map(Into::into).collect() }
    }
}
