use crate::model::record::LogRecord;

/// Sentinel child name for records missing a hierarchy key at some level.
pub const UNKNOWN_BUCKET: &str = "unknown";

/// A node in the grouping hierarchy: branches hold children, leaves hold the
/// records themselves. Children keep first-seen order.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub kind: GroupKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GroupKind {
    Branch(Vec<Group>),
    Leaf(Vec<LogRecord>),
}

impl Group {
    pub fn branch(name: impl Into<String>, children: Vec<Group>) -> Self {
        Self {
            name: name.into(),
            kind: GroupKind::Branch(children),
        }
    }

    pub fn leaf(name: impl Into<String>, records: Vec<LogRecord>) -> Self {
        Self {
            name: name.into(),
            kind: GroupKind::Leaf(records),
        }
    }

    pub fn children(&self) -> &[Group] {
        match &self.kind {
            GroupKind::Branch(children) => children,
            GroupKind::Leaf(_) => &[],
        }
    }

    /// Number of records held by this subtree.
    pub fn record_count(&self) -> usize {
        match &self.kind {
            GroupKind::Branch(children) => children.iter().map(Group::record_count).sum(),
            GroupKind::Leaf(records) => records.len(),
        }
    }

    pub fn leaf_count(&self) -> usize {
        match &self.kind {
            GroupKind::Branch(children) => children.iter().map(Group::leaf_count).sum(),
            GroupKind::Leaf(_) => 1,
        }
    }
}
