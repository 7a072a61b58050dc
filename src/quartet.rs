//! Quartet distance by counting butterflies.
//!
//! # Overview
//! A *butterfly* `ab|cd` is a quartet resolved by a tree: some tree edge puts
//! `{a, b}` on one side and `{c, d}` on the other. Every resolved quartet is
//! seen from the tree four times, once per ordered choice of "centre" node
//! pair, so every sum below is divided by four at the end.
//!
//! With `B1`, `B2` the butterfly counts of the two trees, `S` the quartets
//! resolved identically in both and `D` those resolved differently in both:
//!
//! ```text
//! qdist = B1 + B2 − 2·S − D
//! ```
//!
//! # Node pair sums
//! For an internal node `v1` of `T1` (edges `e1_0..e1_{k-1}`) and `v2` of `T2`
//! (edges `e2_0..e2_{m-1}`), the `k × m` matrix `I[i][j] = shared(e1_i, e2_j)`
//! and its row sums `R`, column sums `C` and total `M` determine how many
//! butterflies centred at `v1`/`v2` agree or disagree. Only pairs of nodes with
//! degree ≥ 3 contribute, and only cells where both edges lead to internal
//! nodes; cells on leaf-directed edges add nothing to either sum.
//!
//! The cubic cross terms need `Σ_k Σ_l I[i][l]·I[k][l]·I[k][j]`, obtained with
//! two small matrix products ordered so the `k × k` or `m × m` Gram matrix is
//! the smaller one.
//!
//! All per-cell formulas run in `i128`; the sums are exact and asserted to be
//! multiples of four.

use rayon::prelude::*;

use crate::combinatorics::{choose, choose2};
use crate::leaf_sets::{SharedLeafSetSizes, shared_leaf_set_sizes, subtree_leaf_set_sizes};
use crate::matrix::{Matrix, Transpose};
use crate::tree::{InternalNode, Tree};

/// Everything computed when comparing two trees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct QuartetDistance {
    pub num_leaves: u64,
    /// Quartets whose topology differs between the trees.
    pub qdist: u64,
    /// Resolved quartets of the first tree.
    pub b1: u64,
    /// Resolved quartets of the second tree.
    pub b2: u64,
    /// Quartets resolved the same way in both trees.
    pub shared: u64,
    /// Quartets resolved in both trees, differently.
    pub diff: u64,
}

impl QuartetDistance {
    /// `(qdist, b1, b2, shared, diff)`.
    pub fn as_tuple(&self) -> (u64, u64, u64, u64, u64) {
        (self.qdist, self.b1, self.b2, self.shared, self.diff)
    }

    /// `qdist / C(n, 4)`, or `0.0` with fewer than four leaves.
    pub fn normalized(&self) -> f64 {
        ratio(self.qdist, choose(self.num_leaves, 4))
    }

    /// `shared / min(b1, b2)`, or `0.0` if either tree resolves nothing.
    pub fn normalized_shared(&self) -> f64 {
        ratio(self.shared, self.b1.min(self.b2))
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 { 0.0 } else { numerator as f64 / denominator as f64 }
}

/// A tree with its per-tree work done: leaf-set sizes and butterfly count.
///
/// Comparing one tree against many others should prepare it once.
#[derive(Debug, Clone)]
pub struct PreparedTree<'a> {
    tree: &'a Tree,
    sizes: Vec<u32>,
    butterflies: u64,
}

impl<'a> PreparedTree<'a> {
    pub fn new(tree: &'a Tree) -> Self {
        let sizes = subtree_leaf_set_sizes(tree);
        let butterflies = count_butterflies(tree, &sizes);
        PreparedTree { tree, sizes, butterflies }
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub fn sizes(&self) -> &[u32] {
        &self.sizes
    }

    pub fn butterflies(&self) -> u64 {
        self.butterflies
    }
}

/// Number of resolved quartets of `tree`.
///
/// For an internal node with edge sizes `s_i`, `S = Σ s_i`, `S2 = Σ s_i²`,
/// each edge contributes `C(s_i, 2) · (S² − S2 − 2·S·s_i + 2·s_i²)`: a pair
/// from `s_i` times an ordered pair from two other edges. Every butterfly is
/// reached four times.
pub fn count_butterflies(tree: &Tree, sizes: &[u32]) -> u64 {
    let mut total: i128 = 0;
    for node in tree.internal_nodes() {
        if node.degree() < 3 {
            continue;
        }
        let (sum, sum_sq) = node.edges().iter().fold((0i128, 0i128), |(s, s2), &e| {
            let x = i128::from(sizes[e]);
            (s + x, s2 + x * x)
        });
        for &edge in node.edges() {
            let x = i128::from(sizes[edge]);
            total += choose2(x) * (sum * sum - sum_sq - 2 * sum * x + 2 * x * x);
        }
    }
    exact_quarter(total, "butterfly")
}

/// Quartet distance between two trees over the same leaves.
///
/// # Panics
/// If the trees disagree on the leaf count. Leaf ids must already agree
/// label-wise (see [`Tree::renumber_leaves_to_match`]).
pub fn quartet_distance(tree1: &Tree, tree2: &Tree) -> QuartetDistance {
    quartet_distance_prepared(&PreparedTree::new(tree1), &PreparedTree::new(tree2))
}

/// [`quartet_distance`] splitting the node-pair sums over the rayon pool.
pub fn quartet_distance_parallel(tree1: &Tree, tree2: &Tree) -> QuartetDistance {
    compare(&PreparedTree::new(tree1), &PreparedTree::new(tree2), true)
}

/// [`quartet_distance`] for trees prepared ahead of time.
pub fn quartet_distance_prepared(p1: &PreparedTree<'_>, p2: &PreparedTree<'_>) -> QuartetDistance {
    compare(p1, p2, false)
}

fn compare(p1: &PreparedTree<'_>, p2: &PreparedTree<'_>, parallel: bool) -> QuartetDistance {
    let (tree1, tree2) = (p1.tree, p2.tree);
    assert_eq!(
        tree1.num_leaves(),
        tree2.num_leaves(),
        "quartet distance needs trees over the same leaves"
    );

    let table = shared_leaf_set_sizes(tree1, &p1.sizes, tree2, &p2.sizes);
    let (shared, diff) = if parallel {
        count_shared_and_different_parallel(tree1, tree2, &table)
    } else {
        count_shared_and_different(tree1, tree2, &table)
    };

    let qdist = i128::from(p1.butterflies) + i128::from(p2.butterflies)
        - 2 * i128::from(shared)
        - i128::from(diff);
    assert!(qdist >= 0, "negative quartet distance {qdist}");

    #[cfg(feature = "tracing")]
    tracing::debug!(
        leaves = tree1.num_leaves(),
        b1 = p1.butterflies,
        b2 = p2.butterflies,
        shared,
        diff,
        qdist = qdist as u64,
        "quartet distance computed"
    );

    QuartetDistance {
        num_leaves: tree1.num_leaves() as u64,
        qdist: qdist as u64,
        b1: p1.butterflies,
        b2: p2.butterflies,
        shared,
        diff,
    }
}

/// Butterflies resolved alike (`S`) and differently (`D`) in both trees.
pub fn count_shared_and_different(
    tree1: &Tree,
    tree2: &Tree,
    table: &SharedLeafSetSizes,
) -> (u64, u64) {
    let mut scratch = PairScratch::default();
    let (mut shared, mut diff) = (0i128, 0i128);
    for node1 in tree1.internal_nodes() {
        let (s, d) = row_counts(&mut scratch, node1, tree2, table);
        shared += s;
        diff += d;
    }
    (exact_quarter(shared, "shared"), exact_quarter(diff, "different"))
}

/// [`count_shared_and_different`] with one scratch buffer per rayon worker.
pub fn count_shared_and_different_parallel(
    tree1: &Tree,
    tree2: &Tree,
    table: &SharedLeafSetSizes,
) -> (u64, u64) {
    let (shared, diff) = tree1
        .internal_nodes()
        .par_iter()
        .fold(
            || (PairScratch::default(), 0i128, 0i128),
            |(mut scratch, shared, diff), node1| {
                let (s, d) = row_counts(&mut scratch, node1, tree2, table);
                (scratch, shared + s, diff + d)
            },
        )
        .map(|(_, shared, diff)| (shared, diff))
        .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1));
    (exact_quarter(shared, "shared"), exact_quarter(diff, "different"))
}

fn exact_quarter(total: i128, what: &str) -> u64 {
    assert!(
        total >= 0 && total % 4 == 0,
        "{what} sum {total} is not a non-negative multiple of four"
    );
    let quarter = total / 4;
    assert!(quarter <= i128::from(u64::MAX), "{what} count {quarter} overflows u64");
    quarter as u64
}

/// Buffers reused across node pairs; only ever grows.
#[derive(Debug, Default)]
struct PairScratch {
    /// `I`
    shared: Matrix<i64>,
    /// `I'[i][j] = I·(M − R_i − C_j + I)`
    shared_rest: Matrix<i64>,
    gram: Matrix<i64>,
    cubic: Matrix<i64>,
    row_sums: Vec<i64>,
    col_sums: Vec<i64>,
    rest_row_sums: Vec<i64>,
    rest_col_sums: Vec<i64>,
    /// `R''_i = Σ_j I·(C_j − I)`
    row_cross: Vec<i64>,
    /// `C''_j = Σ_i I·(R_i − I)`
    col_cross: Vec<i64>,
    squares: Vec<i64>,
}

fn reset(buffer: &mut Vec<i64>, len: usize) {
    buffer.clear();
    buffer.resize(len, 0);
}

/// Sums for `node1` against every internal node of `tree2`.
fn row_counts(
    scratch: &mut PairScratch,
    node1: &InternalNode,
    tree2: &Tree,
    table: &SharedLeafSetSizes,
) -> (i128, i128) {
    if node1.degree() < 3 {
        return (0, 0);
    }
    let (mut shared, mut diff) = (0i128, 0i128);
    for node2 in tree2.internal_nodes().iter().filter(|n| n.degree() >= 3) {
        let (s, d) = node_pair_counts(scratch, node1, node2, table);
        shared += s;
        diff += d;
    }
    (shared, diff)
}

/// Shared and different butterfly sums for one node pair, before the
/// division by four.
fn node_pair_counts(
    scratch: &mut PairScratch,
    node1: &InternalNode,
    node2: &InternalNode,
    table: &SharedLeafSetSizes,
) -> (i128, i128) {
    let (edges1, edges2) = (node1.edges(), node2.edges());
    let (rows, cols) = (edges1.len(), edges2.len());
    let PairScratch {
        shared: mi,
        shared_rest,
        gram,
        cubic,
        row_sums: r,
        col_sums: c,
        rest_row_sums,
        rest_col_sums,
        row_cross,
        col_cross,
        squares,
    } = scratch;

    mi.resize(rows, cols);
    reset(r, rows);
    reset(c, cols);
    let mut m = 0i64;
    for (i, &e1) in edges1.iter().enumerate() {
        for (j, &e2) in edges2.iter().enumerate() {
            let v = i64::from(table.get(e1, e2));
            mi[(i, j)] = v;
            r[i] += v;
            c[j] += v;
            m += v;
        }
    }

    shared_rest.resize(rows, cols);
    reset(rest_row_sums, rows);
    reset(rest_col_sums, cols);
    reset(row_cross, rows);
    reset(col_cross, cols);
    let mut m_rest = 0i64;
    for i in 0..rows {
        for j in 0..cols {
            let v = mi[(i, j)];
            let rest = v * (m - r[i] - c[j] + v);
            shared_rest[(i, j)] = rest;
            rest_row_sums[i] += rest;
            rest_col_sums[j] += rest;
            m_rest += rest;
            row_cross[i] += v * (c[j] - v);
            col_cross[j] += v * (r[i] - v);
        }
    }

    let (ie1, ie2) = (node1.internal_edge_idxs(), node2.internal_edge_idxs());
    let m = i128::from(m);

    let mut shared = 0i128;
    for &i in ie1 {
        for &j in ie2 {
            let v = i128::from(mi[(i, j)]);
            if v < 2 {
                continue;
            }
            let (ri, cj) = (i128::from(r[i]), i128::from(c[j]));
            let outside = i128::from(m_rest) - i128::from(rest_row_sums[i])
                - i128::from(rest_col_sums[j])
                + i128::from(shared_rest[(i, j)]);
            let bracket = outside
                + (v - ri - cj) * (m - ri - cj + v)
                + i128::from(row_cross[i])
                - v * (cj - v)
                + i128::from(col_cross[j])
                - v * (ri - v);
            shared += choose2(v) * bracket;
        }
    }

    // Gram matrix on the smaller side, then the cubic term I·Iᵗ·I.
    let wide = rows < cols;
    if wide {
        reset(squares, cols);
        Matrix::mult(&*mi, Transpose::No, &*mi, Transpose::Yes, gram);
        Matrix::mult(&*gram, Transpose::No, &*mi, Transpose::No, cubic);
    } else {
        reset(squares, rows);
        Matrix::mult(&*mi, Transpose::Yes, &*mi, Transpose::No, gram);
        Matrix::mult(&*mi, Transpose::No, &*gram, Transpose::No, cubic);
    }
    for i in 0..rows {
        for j in 0..cols {
            let v = mi[(i, j)];
            squares[if wide { j } else { i }] += v * v;
        }
    }

    let mut diff = 0i128;
    for &i in ie1 {
        for &j in ie2 {
            let v = i128::from(mi[(i, j)]);
            if v == 0 {
                continue;
            }
            let (ri, cj) = (i128::from(r[i]), i128::from(c[j]));
            let (gram_diag, square_sum) = if wide {
                (gram[(i, i)], squares[j])
            } else {
                (gram[(j, j)], squares[i])
            };
            let term = (m - ri - cj + v) * (ri - v) * (cj - v)
                + (ri - v) * (v * (ri - v) - i128::from(col_cross[j]))
                + (cj - v) * (v * (cj - v) - i128::from(row_cross[i]))
                + i128::from(cubic[(i, j)])
                - v * i128::from(gram_diag)
                - v * (i128::from(square_sum) - v * v);
            diff += v * term;
        }
    }

    (shared, diff)
}
