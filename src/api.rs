//! Python binding layer for quartet distance calculations.
//!
//! Provides Python functions for comparing two Newick strings and for
//! computing pairwise quartet distances from BEAST/NEXUS tree files.

use phylotree::tree::Tree as PhyloTree;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::distances::{
    build_quartet_trees, compute_pairwise_quartet_parallel, quartet_distance_phylo, symmetric_matrix,
};
use crate::error::QuartetError;
use crate::io::read_beast_trees;

fn to_py_err(e: QuartetError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Quartet distance between two Newick strings.
///
/// Returns:
///     A tuple `(qdist, b1, b2, shared, diff)`.
///
/// Raises:
///     ValueError: If a string does not parse or the leaf sets differ
#[pyfunction]
fn quartet_distance(newick1: &str, newick2: &str) -> PyResult<(u64, u64, u64, u64, u64)> {
    let (a, b) = (parse_newick(newick1)?, parse_newick(newick2)?);
    let dist = quartet_distance_phylo(&a, &b).map_err(to_py_err)?;
    Ok(dist.as_tuple())
}

fn parse_newick(newick: &str) -> PyResult<PhyloTree> {
    PhyloTree::from_newick(newick)
        .map_err(|e| PyValueError::new_err(format!("Failed to parse Newick string: {e}")))
}

/// Compute pairwise quartet distances from multiple tree files.
///
/// Args:
///     paths: List of file paths to BEAST/NEXUS tree files
///     burnin_trees: Number of trees to skip at the beginning of each file (default: 0)
///     burnin_states: Minimum STATE value to keep trees (default: 0)
///     use_real_taxa: Use TRANSLATE block for taxon names when available (default: True)
///
/// Returns:
///     A tuple of (tree_names, distance_matrix) where distance_matrix holds
///     the number of quartets whose topology differs
///
/// Raises:
///     ValueError: If no trees are found or trees have different leaf sets
#[pyfunction]
#[pyo3(signature = (paths, burnin_trees=0, burnin_states=0, use_real_taxa=true))]
fn pairwise_quartet(
    paths: Vec<String>,
    burnin_trees: usize,
    burnin_states: usize,
    use_real_taxa: bool,
) -> PyResult<(Vec<String>, Vec<Vec<u64>>)> {
    let (names, trees) = read_all_trees(&paths, burnin_trees, burnin_states, use_real_taxa)?;
    let converted = build_quartet_trees(&trees).map_err(to_py_err)?;
    let pairs = compute_pairwise_quartet_parallel(&converted);
    Ok((names, symmetric_matrix(converted.len(), &pairs, |d| d.qdist)))
}

/// Like `pairwise_quartet`, with each distance divided by C(n, 4).
#[pyfunction]
#[pyo3(signature = (paths, burnin_trees=0, burnin_states=0, use_real_taxa=true))]
fn pairwise_quartet_normalized(
    paths: Vec<String>,
    burnin_trees: usize,
    burnin_states: usize,
    use_real_taxa: bool,
) -> PyResult<(Vec<String>, Vec<Vec<f64>>)> {
    let (names, trees) = read_all_trees(&paths, burnin_trees, burnin_states, use_real_taxa)?;
    let converted = build_quartet_trees(&trees).map_err(to_py_err)?;
    let pairs = compute_pairwise_quartet_parallel(&converted);
    Ok((names, symmetric_matrix(converted.len(), &pairs, |d| d.normalized())))
}

/// Read trees from every file, prefixing names with the file index.
fn read_all_trees(
    paths: &[String],
    burnin_trees: usize,
    burnin_states: usize,
    use_real_taxa: bool,
) -> PyResult<(Vec<String>, Vec<PhyloTree>)> {
    let mut all_names = Vec::new();
    let mut all_trees = Vec::new();

    for (file_idx, path) in paths.iter().enumerate() {
        let (_taxons, named_trees) =
            read_beast_trees(path, burnin_trees, burnin_states, use_real_taxa).map_err(to_py_err)?;
        if named_trees.is_empty() {
            return Err(to_py_err(QuartetError::NoTrees(format!("'{path}' after burnin removal"))));
        }
        for (name, tree) in named_trees {
            all_names.push(format!("file{file_idx}_{name}"));
            all_trees.push(tree);
        }
    }

    if all_trees.len() < 2 {
        return Err(PyValueError::new_err(
            "Need at least 2 trees to compute pairwise distances",
        ));
    }
    Ok((all_names, all_trees))
}

/// Python module definition
#[pymodule]
fn quartet_distances(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(quartet_distance, m)?)?;
    m.add_function(wrap_pyfunction!(pairwise_quartet, m)?)?;
    m.add_function(wrap_pyfunction!(pairwise_quartet_normalized, m)?)?;
    Ok(())
}
