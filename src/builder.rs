//! Construction of [`Tree`]s: by hand through [`TreeBuilder`], or from a
//! parsed `phylotree` tree.

use std::collections::HashSet;

use phylotree::tree::Tree as PhyloTree;

use crate::error::{QuartetError, Result};
use crate::tree::{DirectedEdge, EdgeId, InternalNode, LeafNode, NodeRef, Tree};

/// Incrementally assembles a tree; ids are handed out densely in creation order.
///
/// ```
/// use quartet_distances::builder::TreeBuilder;
///
/// let mut builder = TreeBuilder::new();
/// let root = builder.add_internal("");
/// for label in ["A", "B", "C"] {
///     let leaf = builder.add_leaf(label);
///     builder.connect(root, leaf);
/// }
/// let tree = builder.build(root);
/// assert_eq!(tree.num_edges(), 6);
/// assert!(tree.validate().is_ok());
/// ```
#[derive(Debug, Default)]
pub struct TreeBuilder {
    internal_nodes: Vec<InternalNode>,
    leaf_nodes: Vec<LeafNode>,
    edges: Vec<DirectedEdge>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_leaf(&mut self, label: impl Into<String>) -> NodeRef {
        let id = self.leaf_nodes.len();
        self.leaf_nodes.push(LeafNode::new(label.into(), id));
        NodeRef::Leaf(id)
    }

    pub fn add_internal(&mut self, label: impl Into<String>) -> NodeRef {
        let id = self.internal_nodes.len();
        self.internal_nodes.push(InternalNode::new(label.into(), id));
        NodeRef::Internal(id)
    }

    /// Join `parent` and `child` with a pair of directed edges.
    ///
    /// The edge pointing away from `parent` gets the lower id and is returned.
    /// Both endpoints get their outgoing edge appended; a leaf that is
    /// connected twice keeps only the latest edge, which
    /// [`Tree::validate`] reports.
    pub fn connect(&mut self, parent: NodeRef, child: NodeRef) -> EdgeId {
        let down = self.edges.len();
        let up = down + 1;
        self.edges.push(DirectedEdge::new(down, parent, child, up));
        self.edges.push(DirectedEdge::new(up, child, parent, down));
        self.attach(parent, down, child);
        self.attach(child, up, parent);
        down
    }

    pub fn num_leaves(&self) -> usize {
        self.leaf_nodes.len()
    }

    pub fn build(self, root: NodeRef) -> Tree {
        Tree::from_parts(root, self.internal_nodes, self.leaf_nodes, self.edges)
    }

    fn attach(&mut self, origin: NodeRef, edge: EdgeId, destination: NodeRef) {
        match origin {
            NodeRef::Leaf(id) => self.leaf_nodes[id].attach(edge),
            NodeRef::Internal(id) => self.internal_nodes[id].attach(edge, destination),
        }
    }
}

impl Tree {
    /// Convert a parsed tree, numbering leaves in alphabetical label order.
    ///
    /// Nodes without children become leaves and must carry a unique, non-empty
    /// name. Internal node names are kept as labels when present.
    ///
    /// # Errors
    /// [`QuartetError::UnnamedLeaf`], [`QuartetError::DuplicateLabel`], or a
    /// [`QuartetError::Tree`] for an inconsistent phylotree arena.
    pub fn from_phylo(phylo: &PhyloTree) -> Result<Self> {
        let root_id = phylo.get_root()?;
        let mut builder = TreeBuilder::new();
        let mut labels = HashSet::new();

        let root = add_phylo_node(&mut builder, phylo, root_id, &mut labels)?;
        let mut stack = vec![(root_id, root)];
        while let Some((node_id, node)) = stack.pop() {
            for &child_id in &phylo.get(&node_id)?.children {
                let child = add_phylo_node(&mut builder, phylo, child_id, &mut labels)?;
                builder.connect(node, child);
                stack.push((child_id, child));
            }
        }

        let mut tree = builder.build(root);
        tree.sort_leaves_by_label();
        Ok(tree)
    }

    /// Parse a Newick string and convert it with [`Tree::from_phylo`].
    pub fn from_newick(newick: &str) -> Result<Self> {
        let phylo =
            PhyloTree::from_newick(newick).map_err(|e| QuartetError::Newick(e.to_string()))?;
        Self::from_phylo(&phylo)
    }
}

fn add_phylo_node(
    builder: &mut TreeBuilder,
    phylo: &PhyloTree,
    node_id: usize,
    labels: &mut HashSet<String>,
) -> Result<NodeRef> {
    let node = phylo.get(&node_id)?;
    if !node.children.is_empty() {
        return Ok(builder.add_internal(node.name.clone().unwrap_or_default()));
    }

    let label = node
        .name
        .clone()
        .filter(|name| !name.is_empty())
        .ok_or(QuartetError::UnnamedLeaf)?;
    if !labels.insert(label.clone()) {
        return Err(QuartetError::DuplicateLabel(label));
    }
    Ok(builder.add_leaf(label))
}
