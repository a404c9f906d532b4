//! Client field-selection trees.

/// One level of a client query: a field name and the fields selected below it.
///
/// Leaves may name plain columns or relations; nodes with children always
/// name relations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionNode {
    /// Selected field or relation name.
    pub field_name: String,
    /// Selections below this field, in request order.
    pub children: Vec<SelectionNode>,
    /// Loaded for a dependent computation but not returned to the caller.
    pub load_only: bool,
}

impl SelectionNode {
    /// Select a plain field (or a relation with no sub-selection).
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            field_name: name.into(),
            children: Vec::new(),
            load_only: false,
        }
    }

    /// Select a relation and the fields below it.
    pub fn relation(name: impl Into<String>, children: Vec<SelectionNode>) -> Self {
        Self {
            field_name: name.into(),
            children,
            load_only: false,
        }
    }

    /// Mark this selection as load-only.
    pub fn load_only(mut self) -> Self {
        self.load_only = true;
        self
    }

    /// Merge siblings that select the same field, keeping first-appearance order.
    ///
    /// Children of merged nodes are merged recursively. A merged node is
    /// load-only only if every occurrence was.
    pub fn merge_siblings(nodes: &[SelectionNode]) -> Vec<SelectionNode> {
        let mut merged: Vec<SelectionNode> = Vec::new();
        for node in nodes {
            match merged.iter_mut().find(|m| m.field_name == node.field_name) {
                Some(existing) => {
                    existing.children.extend(node.children.iter().cloned());
                    existing.load_only = existing.load_only && node.load_only;
                }
                None => merged.push(node.clone()),
            }
        }
        for node in &mut merged {
            node.children = Self::merge_siblings(&node.children);
        }
        merged
    }
}
