//! Stable identifiers for declaration nodes.

/// Identity of a declaration node within one compilation session.
///
/// Ids are dense, so phase results keyed by declaration can live in plain
/// vectors indexed by `NodeId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Hands out fresh `NodeId`s. One generator per compilation session.
#[derive(Debug, Default)]
pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far. Phase tables size themselves to this.
    pub fn count(&self) -> usize {
        self.next as usize
    }
}
