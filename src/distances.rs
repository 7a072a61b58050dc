//! Quartet distances between parsed phylotree trees.
//!
//! This is the layer between tree files and the butterfly engine:
//!
//! 1. **Leaf-set check**: both trees must carry the same labels, each once.
//! 2. **Conversion**: each tree is turned into the edge-paired [`Tree`] model,
//!    with leaves numbered by label so ids agree across trees.
//! 3. **Counting**: [`quartet_distance`] for one pair, or a rayon fan-out over
//!    every pair of a tree collection.

use std::collections::HashSet;

use phylotree::tree::Tree as PhyloTree;
use rayon::prelude::*;

use crate::error::{QuartetError, Result};
use crate::quartet::{PreparedTree, QuartetDistance, quartet_distance, quartet_distance_prepared};
use crate::tree::Tree;

/// Labels of all leaves of `tree`.
///
/// # Errors
/// [`QuartetError::UnnamedLeaf`] or [`QuartetError::DuplicateLabel`].
pub fn leaf_label_set(tree: &PhyloTree) -> Result<HashSet<String>> {
    let mut labels = HashSet::new();
    for id in tree.get_leaves() {
        let name = tree
            .get(&id)?
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .ok_or(QuartetError::UnnamedLeaf)?;
        if let Some(duplicate) = labels.replace(name) {
            return Err(QuartetError::DuplicateLabel(duplicate));
        }
    }
    Ok(labels)
}

/// Fail unless `a` and `b` have exactly the same leaf labels.
pub fn check_same_leaf_set(a: &PhyloTree, b: &PhyloTree) -> Result<()> {
    let (left, right) = (leaf_label_set(a)?, leaf_label_set(b)?);
    if left.len() != right.len() {
        return Err(QuartetError::LeafSetMismatch(format!(
            "{} leaves vs {} leaves",
            left.len(),
            right.len()
        )));
    }
    if let Some(label) = left.symmetric_difference(&right).next() {
        return Err(QuartetError::LeafSetMismatch(format!(
            "label '{label}' is present in only one tree"
        )));
    }
    Ok(())
}

/// Quartet distance between two parsed trees.
///
/// # Example
/// ```
/// use phylotree::tree::Tree;
/// use quartet_distances::distances::quartet_distance_phylo;
///
/// let a = Tree::from_newick("(A,B,(C,D));").unwrap();
/// let b = Tree::from_newick("(A,C,(B,D));").unwrap();
/// assert_eq!(quartet_distance_phylo(&a, &b).unwrap().qdist, 1);
/// ```
///
/// # Errors
/// Returns an error if the leaf sets differ or a tree cannot be converted.
pub fn quartet_distance_phylo(a: &PhyloTree, b: &PhyloTree) -> Result<QuartetDistance> {
    check_same_leaf_set(a, b)?;
    let first = Tree::from_phylo(a)?;
    let mut second = Tree::from_phylo(b)?;
    second.renumber_leaves_to_match(&first)?;
    Ok(quartet_distance(&first, &second))
}

/// Convert every tree, checking they all share the first tree's leaf set.
///
/// Converted trees number their leaves by label, so any two of them can be
/// compared directly.
pub fn build_quartet_trees(trees: &[PhyloTree]) -> Result<Vec<Tree>> {
    // phylotree trees cache internally and are not Sync; convert sequentially.
    let converted = trees
        .iter()
        .map(Tree::from_phylo)
        .collect::<Result<Vec<_>>>()?;

    if let Some((first, rest)) = converted.split_first() {
        let reference = first.leaf_labels();
        for (idx, tree) in rest.iter().enumerate() {
            if tree.leaf_labels() != reference {
                return Err(QuartetError::LeafSetMismatch(format!(
                    "tree {} has a different leaf set than tree 0",
                    idx + 1
                )));
            }
        }
    }
    Ok(converted)
}

/// Quartet distance for every unordered pair `(i, j)`, `i < j`.
pub fn compute_pairwise_quartet_parallel(trees: &[Tree]) -> Vec<(usize, usize, QuartetDistance)> {
    let prepared: Vec<PreparedTree<'_>> = trees.par_iter().map(PreparedTree::new).collect();
    let n = prepared.len();

    #[cfg(feature = "tracing")]
    tracing::debug!(trees = n, pairs = n * n.saturating_sub(1) / 2, "computing pairwise quartet distances");

    (0..n)
        .into_par_iter()
        .flat_map_iter(|i| (i + 1..n).map(move |j| (i, j)))
        .map(|(i, j)| (i, j, quartet_distance_prepared(&prepared[i], &prepared[j])))
        .collect()
}

/// Spread pairwise results into a symmetric `n × n` matrix with a zero diagonal.
pub fn symmetric_matrix<T, F>(n: usize, pairs: &[(usize, usize, QuartetDistance)], value: F) -> Vec<Vec<T>>
where
    T: Copy + Default,
    F: Fn(&QuartetDistance) -> T,
{
    let mut matrix = vec![vec![T::default(); n]; n];
    for (i, j, dist) in pairs {
        let v = value(dist);
        matrix[*i][*j] = v;
        matrix[*j][*i] = v;
    }
    matrix
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;
    use crate::naive::naive_quartet_distance;

    // https://evolution.genetics.washington.edu/phylip/doc/treedist.html
    const TREEDIST_TREES: [&str; 12] = [
        "(A:0.1,(B:0.1,(H:0.1,(D:0.1,(J:0.1,(((G:0.1,E:0.1):0.1,(F:0.1,I:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(D:0.1,((J:0.1,H:0.1):0.1,(((G:0.1,E:0.1):0.1,(F:0.1,I:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(D:0.1,(H:0.1,(J:0.1,(((G:0.1,E:0.1):0.1,(F:0.1,I:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,(G:0.1,((F:0.1,I:0.1):0.1,((J:0.1,(H:0.1,D:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,(G:0.1,((F:0.1,I:0.1):0.1,(((J:0.1,H:0.1):0.1,D:0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,((F:0.1,I:0.1):0.1,(G:0.1,((J:0.1,(H:0.1,D:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,((F:0.1,I:0.1):0.1,(G:0.1,(((J:0.1,H:0.1):0.1,D:0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,((G:0.1,(F:0.1,I:0.1):0.1):0.1,((J:0.1,(H:0.1,D:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,((G:0.1,(F:0.1,I:0.1):0.1):0.1,(((J:0.1,H:0.1):0.1,D:0.1):0.1,C:0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,(G:0.1,((F:0.1,I:0.1):0.1,((J:0.1,(H:0.1,D:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(D:0.1,(H:0.1,(J:0.1,(((G:0.1,E:0.1):0.1,(F:0.1,I:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,((G:0.1,(F:0.1,I:0.1):0.1):0.1,((J:0.1,(H:0.1,D:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1);",
    ];

    // Pairs with Robinson-Foulds distance 0 have quartet distance 0 as well.
    const TREEDIST_QDIST: [[u64; 12]; 12] = [
        [0, 27, 12, 100, 105, 108, 113, 92, 97, 100, 12, 92],
        [27, 0, 15, 95, 88, 103, 96, 87, 80, 95, 15, 87],
        [12, 15, 0, 100, 103, 108, 111, 92, 95, 100, 0, 92],
        [100, 95, 100, 0, 7, 24, 31, 24, 31, 0, 100, 24],
        [105, 88, 103, 7, 0, 31, 24, 31, 24, 7, 103, 31],
        [108, 103, 108, 24, 31, 0, 7, 24, 31, 24, 108, 24],
        [113, 96, 111, 31, 24, 7, 0, 31, 24, 31, 111, 31],
        [92, 87, 92, 24, 31, 24, 31, 0, 7, 24, 92, 0],
        [97, 80, 95, 31, 24, 31, 24, 7, 0, 31, 95, 7],
        [100, 95, 100, 0, 7, 24, 31, 24, 31, 0, 100, 24],
        [12, 15, 0, 100, 103, 108, 111, 92, 95, 100, 0, 92],
        [92, 87, 92, 24, 31, 24, 31, 0, 7, 24, 92, 0],
    ];

    fn treedist_trees() -> Vec<PhyloTree> {
        TREEDIST_TREES
            .iter()
            .map(|s| PhyloTree::from_newick(s).unwrap())
            .collect()
    }

    #[test]
    fn quartet_distance_treedist() {
        let trees = treedist_trees();
        for (i0, i1) in (0..trees.len()).tuple_combinations() {
            let d = quartet_distance_phylo(&trees[i0], &trees[i1]).unwrap();
            assert_eq!(d.qdist, TREEDIST_QDIST[i0][i1], "trees {i0} and {i1}");
            // binary trees on ten leaves resolve all 210 quartets
            assert_eq!((d.b1, d.b2), (210, 210));
            assert_eq!(d.shared + d.diff, 210);
        }
    }

    #[test]
    fn pairwise_matches_single_pair_and_brute_force() {
        let converted = build_quartet_trees(&treedist_trees()).unwrap();
        let pairs = compute_pairwise_quartet_parallel(&converted);
        assert_eq!(pairs.len(), 12 * 11 / 2);
        for (i, j, d) in &pairs {
            assert_eq!(*d, naive_quartet_distance(&converted[*i], &converted[*j]));
        }

        let matrix = symmetric_matrix(converted.len(), &pairs, |d| d.qdist);
        for (i, row) in matrix.iter().enumerate() {
            assert_eq!(row.as_slice(), TREEDIST_QDIST[i].as_slice());
        }
    }

    #[test]
    fn four_leaf_scenario_from_newick() {
        let a = PhyloTree::from_newick("(A,B,(C,D));").unwrap();
        let b = PhyloTree::from_newick("(A,C,(B,D));").unwrap();
        let d = quartet_distance_phylo(&a, &b).unwrap();
        assert_eq!(d.as_tuple(), (1, 1, 1, 0, 1));
    }

    #[test]
    fn mismatched_leaf_sets_are_rejected() {
        let a = PhyloTree::from_newick("(A,B,(C,D));").unwrap();
        let b = PhyloTree::from_newick("(A,B,(C,E));").unwrap();
        let c = PhyloTree::from_newick("(A,B,(C,D,E));").unwrap();
        assert!(matches!(check_same_leaf_set(&a, &b), Err(QuartetError::LeafSetMismatch(_))));
        assert!(matches!(quartet_distance_phylo(&a, &c), Err(QuartetError::LeafSetMismatch(_))));
        assert!(build_quartet_trees(&[a, c]).is_err());
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let a = PhyloTree::from_newick("(A,B,(C,C));").unwrap();
        assert!(matches!(leaf_label_set(&a), Err(QuartetError::DuplicateLabel(_))));
    }

    #[test]
    fn normalized_matrix() {
        let converted = build_quartet_trees(&treedist_trees()[..3]).unwrap();
        let pairs = compute_pairwise_quartet_parallel(&converted);
        let matrix = symmetric_matrix(3, &pairs, QuartetDistance::normalized);
        assert_eq!(matrix[0][0], 0.0);
        assert!((matrix[0][1] - 27.0 / 210.0).abs() < 1e-12);
        assert_eq!(matrix[1][2], matrix[2][1]);
    }
}
