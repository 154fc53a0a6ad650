//! Union-find over symbols.

use bb_ir::SymbolId;

/// Disjoint sets of symbols that may alias each other.
///
/// Union by rank with path compression. Ids are dense, so the forest is a
/// pair of vectors that grows on demand.
#[derive(Debug, Default, Clone)]
pub struct SymbolGroups {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl SymbolGroups {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure(&mut self, index: usize) {
        while self.parent.len() <= index {
            self.parent.push(self.parent.len());
            self.rank.push(0);
        }
    }

    fn root(&mut self, index: usize) -> usize {
        self.ensure(index);
        let mut root = index;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = index;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Representative index of the group containing `symbol`.
    pub fn find(&mut self, symbol: SymbolId) -> usize {
        self.root(symbol.index())
    }

    /// Merge the groups of `a` and `b`.
    pub fn union(&mut self, a: SymbolId, b: SymbolId) {
        let ra = self.root(a.index());
        let rb = self.root(b.index());
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] = self.rank[ra].saturating_add(1);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn same(&mut self, a: SymbolId, b: SymbolId) -> bool {
        self.find(a) == self.find(b)
    }

    /// Fully compress the forest into a read-only lookup table.
    pub fn freeze(mut self) -> GroupMap {
        let roots = (0..self.parent.len()).map(|i| self.root(i)).collect();
        GroupMap { roots }
    }
}

/// Immutable symbol-to-group table, shareable across scanning threads.
#[derive(Debug, Clone)]
pub struct GroupMap {
    roots: Vec<usize>,
}

impl GroupMap {
    /// Group of `symbol`. Symbols never seen by the union-find are their
    /// own singleton group.
    #[inline]
    pub fn group(&self, symbol: SymbolId) -> usize {
        self.roots
            .get(symbol.index())
            .copied()
            .unwrap_or(symbol.index())
    }
}
