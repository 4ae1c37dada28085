use serde::{Deserialize, Serialize};

/// A reconstructed time interval inside one leaf track. Timestamps are
/// microseconds; `start_us <= end_us` always holds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Span {
    pub name: String,
    pub start_us: i64,
    pub end_us: i64,
    /// Set when the span had no matching end event and was closed at the
    /// leaf's last timestamp.
    pub truncated: bool,
}

impl Span {
    pub fn duration_us(&self) -> i64 {
        self.end_us - self.start_us
    }

    pub fn is_instant(&self) -> bool {
        self.start_us == self.end_us
    }
}

/// One node of the reconstructed hierarchy. Leaf nodes carry the spans built
/// from their records; branch bounds are min/max aggregates over children,
/// which makes parent/child containment hold by construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanNode {
    pub name: String,
    /// Nesting depth, 0 at the root.
    pub level: usize,
    pub start_us: i64,
    pub end_us: i64,
    pub spans: Vec<Span>,
    pub children: Vec<SpanNode>,
}

impl SpanNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of leaf tracks that survived reconstruction.
    pub fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(SpanNode::leaf_count).sum()
        }
    }

    pub fn span_count(&self) -> usize {
        self.spans.len() + self.children.iter().map(SpanNode::span_count).sum::<usize>()
    }

    /// Checks the containment invariant over the whole subtree.
    pub fn containment_holds(&self) -> bool {
        if self.start_us > self.end_us {
            return false;
        }
        let spans_ok = self
            .spans
            .iter()
            .all(|s| self.start_us <= s.start_us && s.start_us <= s.end_us && s.end_us <= self.end_us);
        let children_ok = self.children.iter().all(|c| {
            self.start_us <= c.start_us && c.end_us <= self.end_us && c.containment_holds()
        });
        spans_ok && children_ok
    }
}
