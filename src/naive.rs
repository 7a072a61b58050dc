//! Brute-force quartet comparison, `O(n⁴ · edges)`.
//!
//! Reads every quartet topology straight off explicit leaf sets. Far too slow
//! for real inputs but simple enough to trust, so it serves as the reference
//! the butterfly engine is checked against.

use itertools::Itertools;

use crate::bitset::Bitset;
use crate::quartet::QuartetDistance;
use crate::tree::{NodeRef, Tree};

/// How a tree resolves the quartet `{a, b, c, d}` (given in that order).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuartetTopology {
    Unresolved,
    /// `ab|cd`
    AbCd,
    /// `ac|bd`
    AcBd,
    /// `ad|bc`
    AdBc,
}

/// The leaf set `L(e)` of every directed edge, indexed by edge id.
pub fn edge_leaf_sets(tree: &Tree) -> Vec<Bitset> {
    let n = tree.num_leaves();
    let mut sets = vec![Bitset::for_leaves(n); tree.num_edges()];

    for edge in tree.down_edges_postorder() {
        let mut set = Bitset::for_leaves(n);
        match tree.edge(edge).destination() {
            NodeRef::Leaf(leaf) => set.set(leaf),
            NodeRef::Internal(_) => {
                for child in tree.child_edges(edge) {
                    set.or_assign(&sets[child]);
                }
            }
        }
        let back = tree.edge(edge).back();
        sets[back] = set.complement(n);
        sets[edge] = set;
    }
    sets
}

/// Topology of `quartet` according to the leaf sets of one tree.
pub fn classify(sets: &[Bitset], quartet: [usize; 4]) -> QuartetTopology {
    let [a, b, c, d] = quartet;
    for set in sets {
        let inside = [a, b, c, d].map(|leaf| set.contains(leaf));
        if inside.iter().filter(|&&x| x).count() != 2 {
            continue;
        }
        // the leaf sharing a side with `a`
        return if inside[0] == inside[1] {
            QuartetTopology::AbCd
        } else if inside[0] == inside[2] {
            QuartetTopology::AcBd
        } else {
            QuartetTopology::AdBc
        };
    }
    QuartetTopology::Unresolved
}

/// Same counts as [`crate::quartet::quartet_distance`], by enumerating quartets.
pub fn naive_quartet_distance(tree1: &Tree, tree2: &Tree) -> QuartetDistance {
    assert_eq!(tree1.num_leaves(), tree2.num_leaves());
    let (sets1, sets2) = (edge_leaf_sets(tree1), edge_leaf_sets(tree2));

    let mut counts = QuartetDistance {
        num_leaves: tree1.num_leaves() as u64,
        ..QuartetDistance::default()
    };
    for quartet in (0..tree1.num_leaves()).combinations(4) {
        let quartet = [quartet[0], quartet[1], quartet[2], quartet[3]];
        let top1 = classify(&sets1, quartet);
        let top2 = classify(&sets2, quartet);

        let resolved1 = top1 != QuartetTopology::Unresolved;
        let resolved2 = top2 != QuartetTopology::Unresolved;
        counts.b1 += u64::from(resolved1);
        counts.b2 += u64::from(resolved2);
        if resolved1 && resolved2 {
            if top1 == top2 {
                counts.shared += 1;
            } else {
                counts.diff += 1;
            }
        }
        counts.qdist += u64::from(top1 != top2);
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_four_leaf_splits() {
        let tree = Tree::from_newick("(A,C,(B,D));").unwrap();
        let sets = edge_leaf_sets(&tree);
        // leaves sorted by label: A=0, B=1, C=2, D=3
        assert_eq!(classify(&sets, [0, 1, 2, 3]), QuartetTopology::AcBd);
        assert_eq!(classify(&sets, [1, 0, 2, 3]), QuartetTopology::AdBc);
    }

    #[test]
    fn star_is_unresolved() {
        let tree = Tree::from_newick("(A,B,C,D,E);").unwrap();
        let sets = edge_leaf_sets(&tree);
        for quartet in (0..5).combinations(4) {
            let quartet = [quartet[0], quartet[1], quartet[2], quartet[3]];
            assert_eq!(classify(&sets, quartet), QuartetTopology::Unresolved);
        }
    }

    #[test]
    fn leaf_sets_pair_up() {
        let tree = Tree::from_newick("((A,B),(C,D),(E,F,G));").unwrap();
        let sets = edge_leaf_sets(&tree);
        for edge in tree.edges() {
            let (here, there) = (&sets[edge.id()], &sets[edge.back()]);
            assert_eq!(here.count_ones() + there.count_ones(), 7);
            assert_eq!(here.and_count(there), 0);
        }
    }

    #[test]
    fn identity_holds_for_counts() {
        let t1 = Tree::from_newick("((A,B),(C,D),(E,F));").unwrap();
        let t2 = Tree::from_newick("((A,C),(B,D,E),F);").unwrap();
        let d = naive_quartet_distance(&t1, &t2);
        assert_eq!(d.qdist + 2 * d.shared + d.diff, d.b1 + d.b2);
    }
}
