//! In-memory IS_A graph with on-demand transitive closure.
//!
//! The graph is a flat arena keyed by concept id; parents are id-sets, so
//! multiple inheritance is first-class and no ownership cycles arise. An
//! ancestor set is never stored: it is computed per query by a DFS over
//! `parents` with a visited set, which bounds work on diamonds.
//!
//! Nodes carry an "updated" mark per branch path recording that their closure
//! changed as of that path; `is_ancestor_or_self_updated` propagates the mark
//! query-side so descendants of a moved node are picked up for rewriting.

use smallvec::SmallVec;
use std::collections::{BTreeSet, HashMap};
use termstore_core::ConceptId;

/// One concept in the graph: its direct parents and updated marks.
#[derive(Debug)]
pub struct Node {
    id: ConceptId,
    parents: BTreeSet<ConceptId>,
    updated_on: SmallVec<[String; 1]>,
}

impl Node {
    fn new(id: ConceptId) -> Self {
        Self {
            id,
            parents: BTreeSet::new(),
            updated_on: SmallVec::new(),
        }
    }

    pub fn id(&self) -> ConceptId {
        self.id
    }

    /// Direct parents
    pub fn parents(&self) -> &BTreeSet<ConceptId> {
        &self.parents
    }

    /// Record that this node's closure changed as of `branch_path`
    pub fn mark_updated(&mut self, branch_path: &str) {
        if !self.updated_on.iter().any(|p| p == branch_path) {
            self.updated_on.push(branch_path.to_string());
        }
    }

    /// Whether this node bears the updated mark for `branch_path`
    pub fn is_updated(&self, branch_path: &str) -> bool {
        self.updated_on.iter().any(|p| p == branch_path)
    }
}

/// Arena of concept nodes with parent edges.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: HashMap<ConceptId, Node>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: ConceptId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Ensure both nodes exist and insert `parent` into the child's parent
    /// set. Returns the child node for chaining.
    pub fn add_parent(&mut self, child: ConceptId, parent: ConceptId) -> &mut Node {
        self.nodes.entry(parent).or_insert_with(|| Node::new(parent));
        let node = self.nodes.entry(child).or_insert_with(|| Node::new(child));
        node.parents.insert(parent);
        node
    }

    /// Remove `parent` from the child's parent set. Returns `None` if the
    /// child was never indexed, in which case the removal is a no-op.
    pub fn remove_parent(&mut self, child: ConceptId, parent: ConceptId) -> Option<&mut Node> {
        let node = self.nodes.get_mut(&child)?;
        node.parents.remove(&parent);
        Some(node)
    }

    /// The strict ancestors of `id`: the union of `parents` along every path.
    ///
    /// DFS with a visited set, so diamonds are walked once and the traversal
    /// terminates regardless of graph shape. Acyclicity is an upstream
    /// invariant and is not defended against here.
    pub fn transitive_closure(&self, id: ConceptId) -> BTreeSet<ConceptId> {
        let mut ancestors = BTreeSet::new();
        let mut stack: Vec<ConceptId> = match self.nodes.get(&id) {
            Some(node) => node.parents.iter().copied().collect(),
            None => return ancestors,
        };
        while let Some(current) = stack.pop() {
            if ancestors.insert(current) {
                if let Some(node) = self.nodes.get(&current) {
                    stack.extend(node.parents.iter().copied());
                }
            }
        }
        ancestors
    }

    /// Whether `id` or any of its transitive ancestors bears the updated mark
    /// for `branch_path`.
    pub fn is_ancestor_or_self_updated(&self, id: ConceptId, branch_path: &str) -> bool {
        let mut visited = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(node) = self.nodes.get(&current) {
                if node.is_updated(branch_path) {
                    return true;
                }
                stack.extend(node.parents.iter().copied());
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATH: &str = "MAIN";

    #[test]
    fn closure_of_a_chain() {
        let mut graph = GraphBuilder::new();
        graph.add_parent(2, 1);
        graph.add_parent(3, 2);

        assert_eq!(graph.transitive_closure(3), BTreeSet::from([1, 2]));
        assert_eq!(graph.transitive_closure(2), BTreeSet::from([1]));
        assert!(graph.transitive_closure(1).is_empty());
    }

    #[test]
    fn closure_deduplicates_diamonds() {
        //     1
        //    / \
        //   2   3
        //    \ /
        //     4
        let mut graph = GraphBuilder::new();
        graph.add_parent(2, 1);
        graph.add_parent(3, 1);
        graph.add_parent(4, 2);
        graph.add_parent(4, 3);

        assert_eq!(graph.transitive_closure(4), BTreeSet::from([1, 2, 3]));
    }

    #[test]
    fn multiple_inheritance_unions_all_paths() {
        let mut graph = GraphBuilder::new();
        graph.add_parent(5, 2);
        graph.add_parent(5, 9);
        graph.add_parent(2, 1);
        graph.add_parent(9, 8);

        assert_eq!(graph.transitive_closure(5), BTreeSet::from([1, 2, 8, 9]));
    }

    #[test]
    fn remove_parent_of_unknown_child_is_none() {
        let mut graph = GraphBuilder::new();
        assert!(graph.remove_parent(42, 1).is_none());

        graph.add_parent(2, 1);
        let node = graph.remove_parent(2, 1).unwrap();
        assert!(node.parents().is_empty());
    }

    #[test]
    fn updated_mark_propagates_to_descendants() {
        let mut graph = GraphBuilder::new();
        graph.add_parent(2, 1);
        graph.add_parent(3, 2);
        graph.add_parent(4, 3);

        graph.add_parent(2, 1).mark_updated(PATH);

        assert!(graph.is_ancestor_or_self_updated(2, PATH));
        assert!(graph.is_ancestor_or_self_updated(4, PATH));
        assert!(!graph.is_ancestor_or_self_updated(1, PATH));
        // A different branch path is unaffected
        assert!(!graph.is_ancestor_or_self_updated(4, "MAIN/A"));
    }

    #[test]
    fn add_parent_chains_mark_updated() {
        let mut graph = GraphBuilder::new();
        graph.add_parent(2, 1).mark_updated(PATH);
        assert!(graph.node(2).unwrap().is_updated(PATH));
        assert!(!graph.node(1).unwrap().is_updated(PATH));
    }
}
