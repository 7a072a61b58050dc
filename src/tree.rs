//! Unrooted leaf-labeled trees stored as paired directed edges.
//!
//! # Overview
//! Every undirected tree edge `{u, v}` is stored twice: once as `u → v` and
//! once as `v → u`. The two copies point at each other through their
//! *back edge*. A directed edge `e` identifies the subtree you reach by
//! leaving its origin along `e`, which is what all the leaf-set and butterfly
//! computations are keyed on.
//!
//! ```text
//!   (A,B,(C,D));
//!
//!        A   B                      edges (down / back):
//!         \ /                         r→A / A→r
//!          r                          r→B / B→r
//!          |                          r→x / x→r
//!          x                          x→C / C→x
//!         / \                         x→D / D→x
//!        C   D
//! ```
//!
//! # Arena layout
//! Leaves, internal nodes and edges live in three dense vectors, each indexed
//! by the entity's own id (`leaves[i].id() == i`). Nodes are referenced through
//! [`NodeRef`], a two-case variant; there are no owning pointers between
//! entities, so a [`Tree`] can be cloned, sent across threads and inspected
//! freely.

use std::collections::HashMap;

use crate::error::{QuartetError, Result};

/// Dense id of a leaf, in `[0, num_leaves)`.
pub type LeafId = usize;
/// Dense id of an internal node, in `[0, num_internal_nodes)`.
pub type InternalId = usize;
/// Dense id of a directed edge, in `[0, num_edges)`.
pub type EdgeId = usize;

/// Reference to a node of either kind.
///
/// `is_leaf` / `is_internal` are the only discriminators the algorithms use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Leaf(LeafId),
    Internal(InternalId),
}

impl NodeRef {
    #[inline]
    pub fn is_leaf(self) -> bool {
        matches!(self, NodeRef::Leaf(_))
    }

    #[inline]
    pub fn is_internal(self) -> bool {
        !self.is_leaf()
    }
}

/// A leaf: a label, a dense id and exactly one incident edge.
#[derive(Debug, Clone)]
pub struct LeafNode {
    label: String,
    id: LeafId,
    edge: Option<EdgeId>,
}

impl LeafNode {
    pub(crate) fn new(label: String, id: LeafId) -> Self {
        LeafNode { label, id, edge: None }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn id(&self) -> LeafId {
        self.id
    }

    /// The single edge leaving this leaf, `None` only while under construction.
    pub fn edge(&self) -> Option<EdgeId> {
        self.edge
    }

    /// Sets the single edge slot; attaching again overwrites it.
    pub(crate) fn attach(&mut self, edge: EdgeId) {
        self.edge = Some(edge);
    }
}

/// An internal node with its incident edges in attachment order.
#[derive(Debug, Clone)]
pub struct InternalNode {
    label: String,
    id: InternalId,
    edges: Vec<EdgeId>,
    /// Positions in `edges` whose destination is an internal node.
    internal_edge_idxs: Vec<usize>,
}

impl InternalNode {
    pub(crate) fn new(label: String, id: InternalId) -> Self {
        InternalNode {
            label,
            id,
            edges: Vec::new(),
            internal_edge_idxs: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn id(&self) -> InternalId {
        self.id
    }

    /// Outgoing edges, in the order they were attached.
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    /// Indices into [`InternalNode::edges`] of the edges leading to internal nodes.
    pub fn internal_edge_idxs(&self) -> &[usize] {
        &self.internal_edge_idxs
    }

    pub fn degree(&self) -> usize {
        self.edges.len()
    }

    pub(crate) fn attach(&mut self, edge: EdgeId, destination: NodeRef) {
        if destination.is_internal() {
            self.internal_edge_idxs.push(self.edges.len());
        }
        self.edges.push(edge);
    }
}

/// One orientation of a tree edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectedEdge {
    id: EdgeId,
    origin: NodeRef,
    destination: NodeRef,
    back: EdgeId,
}

impl DirectedEdge {
    pub(crate) fn new(id: EdgeId, origin: NodeRef, destination: NodeRef, back: EdgeId) -> Self {
        DirectedEdge { id, origin, destination, back }
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn origin(&self) -> NodeRef {
        self.origin
    }

    pub fn destination(&self) -> NodeRef {
        self.destination
    }

    /// The oppositely oriented edge of the same tree edge.
    pub fn back(&self) -> EdgeId {
        self.back
    }
}

/// Borrowed view of a node, for code that needs the label or kind-specific data.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Leaf(&'a LeafNode),
    Internal(&'a InternalNode),
}

impl<'a> Node<'a> {
    pub fn label(&self) -> &'a str {
        match self {
            Node::Leaf(leaf) => leaf.label(),
            Node::Internal(internal) => internal.label(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    pub fn is_internal(&self) -> bool {
        !self.is_leaf()
    }
}

/// A tree owning its leaves, internal nodes and directed edges.
///
/// Built with [`crate::builder::TreeBuilder`] or converted from a parsed
/// `phylotree` tree with [`Tree::from_phylo`]. Read-only afterwards, except for
/// leaf renumbering.
#[derive(Debug, Clone)]
pub struct Tree {
    root: NodeRef,
    internal_nodes: Vec<InternalNode>,
    leaf_nodes: Vec<LeafNode>,
    edges: Vec<DirectedEdge>,
}

impl Tree {
    pub(crate) fn from_parts(
        root: NodeRef,
        internal_nodes: Vec<InternalNode>,
        leaf_nodes: Vec<LeafNode>,
        edges: Vec<DirectedEdge>,
    ) -> Self {
        Tree { root, internal_nodes, leaf_nodes, edges }
    }

    pub fn root(&self) -> NodeRef {
        self.root
    }

    pub fn num_leaves(&self) -> usize {
        self.leaf_nodes.len()
    }

    pub fn num_internal_nodes(&self) -> usize {
        self.internal_nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn leaf(&self, id: LeafId) -> &LeafNode {
        &self.leaf_nodes[id]
    }

    pub fn internal(&self, id: InternalId) -> &InternalNode {
        &self.internal_nodes[id]
    }

    pub fn edge(&self, id: EdgeId) -> &DirectedEdge {
        &self.edges[id]
    }

    pub fn leaves(&self) -> &[LeafNode] {
        &self.leaf_nodes
    }

    pub fn internal_nodes(&self) -> &[InternalNode] {
        &self.internal_nodes
    }

    pub fn edges(&self) -> &[DirectedEdge] {
        &self.edges
    }

    pub fn node(&self, node: NodeRef) -> Node<'_> {
        match node {
            NodeRef::Leaf(id) => Node::Leaf(&self.leaf_nodes[id]),
            NodeRef::Internal(id) => Node::Internal(&self.internal_nodes[id]),
        }
    }

    /// All edges leaving `node` (one for a leaf, `degree` for an internal node).
    pub fn incident_edges(&self, node: NodeRef) -> &[EdgeId] {
        match node {
            NodeRef::Leaf(id) => self.leaf_nodes[id].edge.as_slice(),
            NodeRef::Internal(id) => &self.internal_nodes[id].edges,
        }
    }

    /// Edges continuing away from `edge`: everything leaving its destination
    /// except the way back.
    pub fn child_edges(&self, edge: EdgeId) -> impl Iterator<Item = EdgeId> + '_ {
        let DirectedEdge { destination, back, .. } = self.edges[edge];
        self.incident_edges(destination)
            .iter()
            .copied()
            .filter(move |&child| child != back)
    }

    /// Edges pointing away from the root, children listed before their parent.
    ///
    /// Walks each internal node's edges in stored order. Iterative, so deep
    /// (caterpillar) trees do not exhaust the stack.
    pub fn down_edges_postorder(&self) -> Vec<EdgeId> {
        let mut order = Vec::with_capacity(self.edges.len() / 2);
        let mut stack: Vec<(EdgeId, bool)> = self
            .incident_edges(self.root)
            .iter()
            .rev()
            .map(|&edge| (edge, false))
            .collect();

        while let Some((edge, expanded)) = stack.pop() {
            if expanded {
                order.push(edge);
                continue;
            }
            stack.push((edge, true));
            let DirectedEdge { destination, back, .. } = self.edges[edge];
            for &child in self.incident_edges(destination).iter().rev() {
                if child != back {
                    stack.push((child, false));
                }
            }
        }

        order
    }

    /// Leaf labels indexed by leaf id.
    pub fn leaf_labels(&self) -> Vec<&str> {
        self.leaf_nodes.iter().map(LeafNode::label).collect()
    }

    /// Give every leaf the id of the identically labeled leaf in `other`.
    ///
    /// Afterwards both trees agree on the label ↔ leaf id correspondence, the
    /// precondition of every cross-tree computation.
    ///
    /// # Errors
    /// [`QuartetError::LeafSetMismatch`] if the leaf counts differ or a label
    /// has no counterpart in `other`; [`QuartetError::DuplicateLabel`] if two
    /// leaves would claim the same id.
    pub fn renumber_leaves_to_match(&mut self, other: &Tree) -> Result<()> {
        if self.num_leaves() != other.num_leaves() {
            return Err(QuartetError::LeafSetMismatch(format!(
                "{} leaves vs {} leaves",
                self.num_leaves(),
                other.num_leaves()
            )));
        }

        let index: HashMap<&str, LeafId> = other
            .leaf_nodes
            .iter()
            .map(|leaf| (leaf.label(), leaf.id()))
            .collect();

        let mut taken = vec![false; self.num_leaves()];
        let mut new_ids = Vec::with_capacity(self.num_leaves());
        for leaf in &self.leaf_nodes {
            let id = *index.get(leaf.label()).ok_or_else(|| {
                QuartetError::LeafSetMismatch(format!("label '{}' missing from other tree", leaf.label()))
            })?;
            if std::mem::replace(&mut taken[id], true) {
                return Err(QuartetError::DuplicateLabel(leaf.label().to_string()));
            }
            new_ids.push(id);
        }

        self.apply_leaf_permutation(&new_ids);
        Ok(())
    }

    /// Renumber leaves in alphabetical label order.
    ///
    /// Two trees over the same label set end up with identical ids, so trees
    /// converted independently can be compared without a pairwise renumbering.
    pub fn sort_leaves_by_label(&mut self) {
        let mut order: Vec<LeafId> = (0..self.num_leaves()).collect();
        order.sort_by(|&a, &b| self.leaf_nodes[a].label.cmp(&self.leaf_nodes[b].label));

        let mut new_ids = vec![0; order.len()];
        for (rank, old) in order.into_iter().enumerate() {
            new_ids[old] = rank;
        }
        self.apply_leaf_permutation(&new_ids);
    }

    /// Move leaf `old` to id `new_ids[old]`, rewriting every reference to it.
    fn apply_leaf_permutation(&mut self, new_ids: &[LeafId]) {
        let remap = |node: NodeRef| match node {
            NodeRef::Leaf(id) => NodeRef::Leaf(new_ids[id]),
            internal => internal,
        };

        for edge in &mut self.edges {
            edge.origin = remap(edge.origin);
            edge.destination = remap(edge.destination);
        }
        self.root = remap(self.root);

        let mut slots: Vec<Option<LeafNode>> = (0..self.leaf_nodes.len()).map(|_| None).collect();
        for mut leaf in std::mem::take(&mut self.leaf_nodes) {
            let id = new_ids[leaf.id];
            leaf.id = id;
            slots[id] = Some(leaf);
        }
        self.leaf_nodes = slots.into_iter().flatten().collect();
    }

    /// Check the structural invariants the engine relies on.
    ///
    /// - ids are dense and match their arena position
    /// - back edges are mutual and reverse each other
    /// - every edge is listed exactly once, by its origin
    /// - every leaf has its edge; internal-edge index lists match destinations
    /// - the edges form one tree reachable from the root
    ///
    /// # Errors
    /// [`QuartetError::MalformedTree`] describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        let malformed = |msg: String| Err(QuartetError::MalformedTree(msg));

        for (i, leaf) in self.leaf_nodes.iter().enumerate() {
            if leaf.id != i {
                return malformed(format!("leaf at position {i} has id {}", leaf.id));
            }
        }
        for (i, internal) in self.internal_nodes.iter().enumerate() {
            if internal.id != i {
                return malformed(format!("internal node at position {i} has id {}", internal.id));
            }
        }
        for (i, edge) in self.edges.iter().enumerate() {
            if edge.id != i {
                return malformed(format!("edge at position {i} has id {}", edge.id));
            }
            if !self.contains(edge.origin) || !self.contains(edge.destination) {
                return malformed(format!("edge {i} references a missing node"));
            }
            let Some(back) = self.edges.get(edge.back) else {
                return malformed(format!("edge {i} has missing back edge {}", edge.back));
            };
            if edge.back == i || back.back != i {
                return malformed(format!("edge {i} and {} are not mutual back edges", edge.back));
            }
            if back.origin != edge.destination || back.destination != edge.origin {
                return malformed(format!("back edge {} does not reverse edge {i}", edge.back));
            }
        }
        if !self.contains(self.root) {
            return malformed("root references a missing node".to_string());
        }

        let mut listed = vec![false; self.edges.len()];
        for leaf in &self.leaf_nodes {
            let Some(edge) = leaf.edge else {
                return malformed(format!("leaf '{}' has no edge", leaf.label));
            };
            self.check_listed(edge, NodeRef::Leaf(leaf.id), &mut listed)?;
        }
        for internal in &self.internal_nodes {
            let node = NodeRef::Internal(internal.id);
            for &edge in &internal.edges {
                self.check_listed(edge, node, &mut listed)?;
            }
            let expected: Vec<usize> = internal
                .edges
                .iter()
                .enumerate()
                .filter(|&(_, &edge)| self.edges[edge].destination.is_internal())
                .map(|(idx, _)| idx)
                .collect();
            if expected != internal.internal_edge_idxs {
                return malformed(format!("internal node {} has stale internal-edge indices", internal.id));
            }
        }
        if let Some(orphan) = listed.iter().position(|&seen| !seen) {
            return malformed(format!("edge {orphan} is not attached to its origin"));
        }

        let num_nodes = self.leaf_nodes.len() + self.internal_nodes.len();
        if self.edges.len() != 2 * num_nodes.saturating_sub(1) {
            return malformed(format!("{} edges for {num_nodes} nodes", self.edges.len()));
        }
        self.check_connected(num_nodes)
    }

    fn contains(&self, node: NodeRef) -> bool {
        match node {
            NodeRef::Leaf(id) => id < self.leaf_nodes.len(),
            NodeRef::Internal(id) => id < self.internal_nodes.len(),
        }
    }

    fn check_listed(&self, edge: EdgeId, owner: NodeRef, listed: &mut [bool]) -> Result<()> {
        match self.edges.get(edge) {
            Some(e) if e.origin == owner => {}
            _ => {
                return Err(QuartetError::MalformedTree(format!(
                    "edge {edge} listed by a node it does not leave"
                )));
            }
        }
        if std::mem::replace(&mut listed[edge], true) {
            return Err(QuartetError::MalformedTree(format!("edge {edge} listed twice")));
        }
        Ok(())
    }

    /// Visit from the root, refusing to enter any node twice.
    fn check_connected(&self, num_nodes: usize) -> Result<()> {
        let mut seen_leaf = vec![false; self.leaf_nodes.len()];
        let mut seen_internal = vec![false; self.internal_nodes.len()];
        let mut visited = 0;
        let mut stack = vec![(self.root, None::<EdgeId>)];

        while let Some((node, arrived_by)) = stack.pop() {
            let seen = match node {
                NodeRef::Leaf(id) => &mut seen_leaf[id],
                NodeRef::Internal(id) => &mut seen_internal[id],
            };
            if std::mem::replace(seen, true) {
                return Err(QuartetError::MalformedTree("tree contains a cycle".to_string()));
            }
            visited += 1;
            for &edge in self.incident_edges(node) {
                if Some(self.edges[edge].back) != arrived_by {
                    stack.push((self.edges[edge].destination, Some(edge)));
                }
            }
        }

        if visited != num_nodes {
            return Err(QuartetError::MalformedTree(format!(
                "{visited} of {num_nodes} nodes reachable from the root"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TreeBuilder;

    /// `(A,B,(C,D));` built by hand, root first.
    fn four_leaf_tree() -> Tree {
        let mut builder = TreeBuilder::new();
        let root = builder.add_internal("r");
        let a = builder.add_leaf("A");
        builder.connect(root, a);
        let b = builder.add_leaf("B");
        builder.connect(root, b);
        let x = builder.add_internal("x");
        builder.connect(root, x);
        let c = builder.add_leaf("C");
        builder.connect(x, c);
        let d = builder.add_leaf("D");
        builder.connect(x, d);
        builder.build(root)
    }

    #[test]
    fn arena_ids_are_dense() {
        let tree = four_leaf_tree();
        assert_eq!(tree.num_leaves(), 4);
        assert_eq!(tree.num_internal_nodes(), 2);
        assert_eq!(tree.num_edges(), 10);
        for (i, leaf) in tree.leaves().iter().enumerate() {
            assert_eq!(leaf.id(), i);
        }
        for (i, edge) in tree.edges().iter().enumerate() {
            assert_eq!(edge.id(), i);
        }
        tree.validate().unwrap();
    }

    #[test]
    fn back_edges_are_mutual() {
        let tree = four_leaf_tree();
        for edge in tree.edges() {
            let back = tree.edge(edge.back());
            assert_eq!(back.back(), edge.id());
            assert_eq!(back.origin(), edge.destination());
            assert_eq!(back.destination(), edge.origin());
        }
    }

    #[test]
    fn internal_edge_indices_skip_leaf_edges() {
        let tree = four_leaf_tree();
        let root = tree.internal(0);
        assert_eq!(root.degree(), 3);
        assert_eq!(root.internal_edge_idxs(), &[2]);

        // x gets its back edge to r first, then C and D
        let x = tree.internal(1);
        assert_eq!(x.degree(), 3);
        assert_eq!(x.internal_edge_idxs(), &[0]);
    }

    #[test]
    fn node_view_exposes_labels() {
        let tree = four_leaf_tree();
        let root = tree.node(tree.root());
        assert!(root.is_internal());
        assert_eq!(root.label(), "r");
        let a = tree.node(NodeRef::Leaf(0));
        assert!(a.is_leaf());
        assert_eq!(a.label(), "A");
    }

    #[test]
    fn down_edges_visit_children_first() {
        let tree = four_leaf_tree();
        let order = tree.down_edges_postorder();
        assert_eq!(order.len(), tree.num_edges() / 2);

        let position: HashMap<EdgeId, usize> =
            order.iter().enumerate().map(|(pos, &e)| (e, pos)).collect();
        for &edge in &order {
            for child in tree.child_edges(edge) {
                assert!(position[&child] < position[&edge]);
            }
        }
    }

    #[test]
    fn renumbering_follows_labels() {
        let reference = four_leaf_tree();

        let mut builder = TreeBuilder::new();
        let root = builder.add_internal("r");
        let x = builder.add_internal("x");
        builder.connect(root, x);
        for label in ["D", "C"] {
            let leaf = builder.add_leaf(label);
            builder.connect(x, leaf);
        }
        for label in ["B", "A"] {
            let leaf = builder.add_leaf(label);
            builder.connect(root, leaf);
        }
        let mut tree = builder.build(root);
        assert_eq!(tree.leaf_labels(), vec!["D", "C", "B", "A"]);

        tree.renumber_leaves_to_match(&reference).unwrap();
        assert_eq!(tree.leaf_labels(), vec!["A", "B", "C", "D"]);
        tree.validate().unwrap();

        // edges follow their leaves
        for leaf in tree.leaves() {
            let edge = tree.edge(leaf.edge().unwrap());
            assert_eq!(edge.origin(), NodeRef::Leaf(leaf.id()));
            assert_eq!(tree.edge(edge.back()).destination(), NodeRef::Leaf(leaf.id()));
        }
    }

    #[test]
    fn renumbering_rejects_foreign_labels() {
        let reference = four_leaf_tree();
        let mut builder = TreeBuilder::new();
        let root = builder.add_internal("");
        for label in ["A", "B", "C", "E"] {
            let leaf = builder.add_leaf(label);
            builder.connect(root, leaf);
        }
        let mut tree = builder.build(root);
        assert!(matches!(
            tree.renumber_leaves_to_match(&reference),
            Err(QuartetError::LeafSetMismatch(_))
        ));
    }

    #[test]
    fn sorting_by_label_is_canonical() {
        let mut builder = TreeBuilder::new();
        let root = builder.add_internal("");
        for label in ["kiwi", "apple", "fig"] {
            let leaf = builder.add_leaf(label);
            builder.connect(root, leaf);
        }
        let mut tree = builder.build(root);
        tree.sort_leaves_by_label();
        assert_eq!(tree.leaf_labels(), vec!["apple", "fig", "kiwi"]);
        tree.validate().unwrap();
    }

    #[test]
    fn validate_detects_detached_leaf() {
        let mut builder = TreeBuilder::new();
        let root = builder.add_internal("");
        for label in ["A", "B"] {
            let leaf = builder.add_leaf(label);
            builder.connect(root, leaf);
        }
        builder.add_leaf("C");
        let tree = builder.build(root);
        assert!(matches!(tree.validate(), Err(QuartetError::MalformedTree(_))));
    }

    #[test]
    fn validate_detects_reattached_leaf() {
        let mut builder = TreeBuilder::new();
        let root = builder.add_internal("");
        let other = builder.add_internal("");
        builder.connect(root, other);
        let a = builder.add_leaf("A");
        builder.connect(root, a);
        // second attachment overwrites the leaf's edge slot
        builder.connect(other, a);
        let tree = builder.build(root);
        assert!(tree.validate().is_err());
    }

    #[test]
    fn leaf_rooted_tree_is_valid() {
        let mut builder = TreeBuilder::new();
        let a = builder.add_leaf("A");
        let x = builder.add_internal("");
        builder.connect(a, x);
        for label in ["B", "C"] {
            let leaf = builder.add_leaf(label);
            builder.connect(x, leaf);
        }
        let tree = builder.build(a);
        tree.validate().unwrap();
        assert_eq!(tree.down_edges_postorder().len(), 3);
    }
}
