//! Leaf-set sizes per directed edge, within one tree and across two trees.
//!
//! For a directed edge `e`, `L(e)` is the set of leaves reached by leaving
//! `e`'s origin along `e`. Within one tree `|L(e)| + |L(back(e))| = n`.
//! Across two trees over the same leaves, `shared(e1, e2) = |L(e1) ∩ L(e2)|`
//! is tabulated for every edge pair.
//!
//! Only *down* edges (pointing away from the root) are computed directly, in
//! post-order. Every up-edge value is then a complement of a down-edge value.

use crate::tree::{EdgeId, NodeRef, Tree};

/// Marks a table cell that has not been computed yet.
pub const UNKNOWN: u32 = u32::MAX;

/// `|L(e)|` for every directed edge of `tree`, indexed by edge id.
pub fn subtree_leaf_set_sizes(tree: &Tree) -> Vec<u32> {
    let mut sizes = vec![UNKNOWN; tree.num_edges()];

    for edge in tree.down_edges_postorder() {
        sizes[edge] = match tree.edge(edge).destination() {
            NodeRef::Leaf(_) => 1,
            NodeRef::Internal(_) => tree.child_edges(edge).map(|child| sizes[child]).sum(),
        };
    }

    let num_leaves = tree.num_leaves() as u32;
    for edge in 0..sizes.len() {
        if sizes[edge] == UNKNOWN {
            sizes[edge] = num_leaves - sizes[tree.edge(edge).back()];
        }
    }
    sizes
}

/// Dense `E1 × E2` table of shared leaf-set sizes.
///
/// Memory grows with the product of the two edge counts, which bounds the
/// practical input size long before the arithmetic does.
#[derive(Debug, Clone)]
pub struct SharedLeafSetSizes {
    rows: usize,
    cols: usize,
    cells: Vec<u32>,
}

impl SharedLeafSetSizes {
    fn unknown(rows: usize, cols: usize) -> Self {
        SharedLeafSetSizes { rows, cols, cells: vec![UNKNOWN; rows * cols] }
    }

    /// `|L1(e1) ∩ L2(e2)|`.
    #[inline]
    pub fn get(&self, e1: EdgeId, e2: EdgeId) -> u32 {
        self.cells[e1 * self.cols + e2]
    }

    #[inline]
    fn set(&mut self, e1: EdgeId, e2: EdgeId, value: u32) {
        self.cells[e1 * self.cols + e2] = value;
    }

    #[inline]
    fn known(&self, e1: EdgeId, e2: EdgeId) -> u32 {
        let value = self.get(e1, e2);
        debug_assert_ne!(value, UNKNOWN, "shared size ({e1}, {e2}) read before it was computed");
        value
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// True once every cell holds a computed value.
    pub fn is_complete(&self) -> bool {
        !self.cells.contains(&UNKNOWN)
    }
}

/// Tabulate `|L1(e1) ∩ L2(e2)|` for every pair of directed edges.
///
/// Both trees must number their leaves identically (see
/// [`Tree::renumber_leaves_to_match`]); `sizes1` and `sizes2` come from
/// [`subtree_leaf_set_sizes`].
///
/// Down/down cells follow the recurrence
///
/// ```text
/// leaf a,   leaf b      → [a == b]
/// leaf,     internal e2 → Σ over children c2 of e2: shared(e1, c2)
/// internal e1, any      → Σ over children c1 of e1: shared(c1, e2)
/// ```
///
/// evaluated with both trees in post-order so every operand is ready. The
/// remaining cells are complements:
///
/// ```text
/// shared(up1, d2)  = |L2(d2)| − shared(d1, d2)
/// shared(d1, up2)  = |L1(d1)| − shared(d1, d2)
/// shared(up1, up2) = n − (|L1(d1)| + |L2(d2)| − shared(d1, d2))
/// ```
pub fn shared_leaf_set_sizes(
    tree1: &Tree,
    sizes1: &[u32],
    tree2: &Tree,
    sizes2: &[u32],
) -> SharedLeafSetSizes {
    assert_eq!(
        tree1.num_leaves(),
        tree2.num_leaves(),
        "shared leaf-set sizes need trees over the same leaves"
    );

    let down1 = tree1.down_edges_postorder();
    let down2 = tree2.down_edges_postorder();
    let mut table = SharedLeafSetSizes::unknown(tree1.num_edges(), tree2.num_edges());

    for &e1 in &down1 {
        let destination1 = tree1.edge(e1).destination();
        for &e2 in &down2 {
            let shared = match (destination1, tree2.edge(e2).destination()) {
                (NodeRef::Leaf(a), NodeRef::Leaf(b)) => u32::from(a == b),
                (NodeRef::Leaf(_), NodeRef::Internal(_)) => {
                    tree2.child_edges(e2).map(|c2| table.known(e1, c2)).sum()
                }
                (NodeRef::Internal(_), _) => {
                    tree1.child_edges(e1).map(|c1| table.known(c1, e2)).sum()
                }
            };
            table.set(e1, e2, shared);
        }
    }

    let num_leaves = tree1.num_leaves() as u32;
    for &d1 in &down1 {
        let up1 = tree1.edge(d1).back();
        for &d2 in &down2 {
            let up2 = tree2.edge(d2).back();
            let both = table.get(d1, d2);
            table.set(up1, d2, sizes2[d2] - both);
            table.set(d1, up2, sizes1[d1] - both);
            table.set(up1, up2, num_leaves - (sizes1[d1] + sizes2[d2] - both));
        }
    }

    debug_assert!(table.is_complete());
    table
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::naive::edge_leaf_sets;
    use crate::test_support::{leaf_labels, random_tree};

    #[test]
    fn sizes_of_small_tree() {
        let tree = Tree::from_newick("(A,B,(C,D,E));").unwrap();
        let sizes = subtree_leaf_set_sizes(&tree);
        for edge in tree.edges() {
            let expected = match (edge.origin(), edge.destination()) {
                (_, NodeRef::Leaf(_)) => 1,
                (NodeRef::Leaf(_), _) => 4,
                // root is internal node 0, (C,D,E) is internal node 1
                (NodeRef::Internal(0), NodeRef::Internal(_)) => 3,
                (NodeRef::Internal(_), NodeRef::Internal(_)) => 2,
            };
            assert_eq!(sizes[edge.id()], expected, "edge {}", edge.id());
        }
    }

    #[test]
    fn sizes_are_complementary() {
        let mut rng = StdRng::seed_from_u64(7);
        let labels = leaf_labels(40);
        for max_children in 2..=5 {
            let tree = random_tree(&mut rng, &labels, max_children);
            let sizes = subtree_leaf_set_sizes(&tree);
            for edge in tree.edges() {
                assert_eq!(sizes[edge.id()] + sizes[edge.back()], 40);
            }
        }
    }

    #[test]
    fn sizes_match_explicit_leaf_sets() {
        let mut rng = StdRng::seed_from_u64(11);
        let tree = random_tree(&mut rng, &leaf_labels(25), 4);
        let sizes = subtree_leaf_set_sizes(&tree);
        let sets = edge_leaf_sets(&tree);
        for (edge, set) in sets.iter().enumerate() {
            assert_eq!(sizes[edge] as usize, set.count_ones());
        }
    }

    #[test]
    fn shared_sizes_match_explicit_intersections() {
        let mut rng = StdRng::seed_from_u64(23);
        let labels = leaf_labels(18);
        let t1 = random_tree(&mut rng, &labels, 3);
        let mut t2 = random_tree(&mut rng, &labels, 5);
        t2.renumber_leaves_to_match(&t1).unwrap();

        let (s1, s2) = (subtree_leaf_set_sizes(&t1), subtree_leaf_set_sizes(&t2));
        let table = shared_leaf_set_sizes(&t1, &s1, &t2, &s2);
        assert!(table.is_complete());
        assert_eq!((table.rows(), table.cols()), (t1.num_edges(), t2.num_edges()));

        let (sets1, sets2) = (edge_leaf_sets(&t1), edge_leaf_sets(&t2));
        for e1 in 0..t1.num_edges() {
            for e2 in 0..t2.num_edges() {
                assert_eq!(table.get(e1, e2) as usize, sets1[e1].and_count(&sets2[e2]));
            }
        }
    }

    #[test]
    fn shared_sizes_obey_complement_identities() {
        let mut rng = StdRng::seed_from_u64(5);
        let labels = leaf_labels(30);
        let t1 = random_tree(&mut rng, &labels, 4);
        let mut t2 = random_tree(&mut rng, &labels, 2);
        t2.renumber_leaves_to_match(&t1).unwrap();

        let (s1, s2) = (subtree_leaf_set_sizes(&t1), subtree_leaf_set_sizes(&t2));
        let table = shared_leaf_set_sizes(&t1, &s1, &t2, &s2);
        for e1 in t1.edges() {
            for e2 in t2.edges() {
                let (i, j) = (e1.id(), e2.id());
                assert_eq!(table.get(i, j) + table.get(e1.back(), j), s2[j]);
                assert_eq!(table.get(i, j) + table.get(i, e2.back()), s1[i]);
            }
        }
    }

    #[test]
    fn identical_trees_share_their_own_sizes() {
        let tree = Tree::from_newick("((A,B),(C,D),(E,(F,G)));").unwrap();
        let sizes = subtree_leaf_set_sizes(&tree);
        let table = shared_leaf_set_sizes(&tree, &sizes, &tree, &sizes);
        for edge in 0..tree.num_edges() {
            assert_eq!(table.get(edge, edge), sizes[edge]);
        }
    }
}
