//! Error types for quartet_distances

use phylotree::tree::TreeError;
use thiserror::Error;

/// Result type alias for quartet_distances operations
pub type Result<T> = std::result::Result<T, QuartetError>;

/// Errors raised while loading, converting or checking trees.
///
/// The butterfly engine itself does not return errors: it expects trees that
/// already passed through this layer (see [`crate::tree::Tree::validate`]).
#[derive(Error, Debug)]
pub enum QuartetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Newick parse error: {0}")]
    Newick(String),

    #[error("Leaf without a label")]
    UnnamedLeaf,

    #[error("Duplicate leaf label: {0}")]
    DuplicateLabel(String),

    #[error("Leaf sets differ: {0}")]
    LeafSetMismatch(String),

    #[error("Malformed tree: {0}")]
    MalformedTree(String),

    #[error("No trees found in {0}")]
    NoTrees(String),
}
