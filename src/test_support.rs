//! Random tree generation shared by the unit tests.

use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::seq::index::sample;

use crate::builder::TreeBuilder;
use crate::tree::Tree;

/// `t0, t1, …, t{n-1}`.
pub(crate) fn leaf_labels(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("t{i}")).collect()
}

/// One internal node holding every leaf.
pub(crate) fn star_tree(labels: &[String]) -> Tree {
    let mut builder = TreeBuilder::new();
    let root = builder.add_internal("");
    for label in labels {
        let leaf = builder.add_leaf(label.clone());
        builder.connect(root, leaf);
    }
    builder.build(root)
}

/// A random tree over `labels` in which every node has between two and
/// `max_children` children. `max_children == 2` gives binary trees with a
/// degree-two root.
///
/// Leaves are created in shuffled order, so two trees drawn from the same
/// labels generally need [`Tree::renumber_leaves_to_match`] before comparison.
pub(crate) fn random_tree(rng: &mut StdRng, labels: &[String], max_children: usize) -> Tree {
    assert!(labels.len() >= 2 && max_children >= 2);
    let mut shuffled = labels.to_vec();
    shuffled.shuffle(rng);

    let mut builder = TreeBuilder::new();
    let root = builder.add_internal("");
    let mut pending = vec![(root, shuffled.as_slice())];
    while let Some((parent, group)) = pending.pop() {
        let parts = rng.gen_range(2..=max_children.min(group.len()));
        let mut cuts: Vec<usize> = sample(rng, group.len() - 1, parts - 1)
            .into_iter()
            .map(|cut| cut + 1)
            .collect();
        cuts.sort_unstable();
        cuts.push(group.len());

        let mut start = 0;
        for cut in cuts {
            let part = &group[start..cut];
            start = cut;
            if let [label] = part {
                let leaf = builder.add_leaf(label.clone());
                builder.connect(parent, leaf);
            } else {
                let child = builder.add_internal("");
                builder.connect(parent, child);
                pending.push((child, part));
            }
        }
    }

    let tree = builder.build(root);
    debug_assert!(tree.validate().is_ok());
    tree
}
