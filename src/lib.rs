//! Crate root: module orchestration and public re-exports.
//!
//! Modules:
//! - `tree`: unrooted trees as paired directed edges in dense arenas.
//! - `builder`: `TreeBuilder` and conversion from parsed `phylotree` trees.
//! - `leaf_sets`: leaf-set sizes per edge and the shared-size table of two trees.
//! - `matrix`: small dense matrix with reusable storage and transposed products.
//! - `quartet`: the butterfly-counting quartet distance engine.
//! - `naive`: brute-force quartet comparison used as a cross-check.
//! - `distances`: leaf-set checks and pairwise distances over `phylotree` trees.
//! - `io`: reading Newick and BEAST/NEXUS tree files, writing TSV matrices.
//! - `bitset`: explicit leaf sets.
//! - `combinatorics`: binomial coefficients.
//! - `error`: the crate error type.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod bitset;
pub mod builder;
pub mod combinatorics;
pub mod distances;
pub mod error;
pub mod io;
pub mod leaf_sets;
pub mod matrix;
pub mod naive;
pub mod quartet;
pub mod tree;

#[cfg(feature = "python")]
pub mod api;

#[cfg(test)]
mod test_support;

// Re-export frequently used types & functions
pub use builder::TreeBuilder;
pub use distances::quartet_distance_phylo;
pub use error::{QuartetError, Result};
pub use io::{read_beast_trees, read_newick_file, write_matrix_tsv};
pub use quartet::{QuartetDistance, quartet_distance, quartet_distance_parallel};
pub use tree::Tree;
