/// Snapshot of one node's runtime state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatistics {
    pub id: usize,
    pub kind: &'static str,
    pub layer: usize,
    /// Output tuples waiting for the node's layer to propagate.
    pub staged: usize,
    /// Entries in the left index of a join or exists node.
    pub left_indexed: usize,
    /// Entries in the right index of a join or exists node.
    pub right_indexed: usize,
    /// Groups of a group node, buckets of a distinct node, or facts
    /// tracked by a source node.
    pub buckets: usize,
}

/// Snapshot of a session's runtime state.
///
/// Two sessions over the same plan that hold the same facts report equal
/// statistics once settled, whatever mutations led there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatistics {
    /// Live facts.
    pub facts: usize,
    /// Live tuples across all nodes.
    pub tuples: usize,
    /// Live ledger entries of the score inliner.
    pub ledger_entries: usize,
    pub layers: usize,
    pub nodes: Vec<NodeStatistics>,
}

impl SessionStatistics {
    /// Sum of staged tuples over all nodes; zero once settled.
    pub fn staged(&self) -> usize {
        self.nodes.iter().map(|n| n.staged).sum()
    }
}
