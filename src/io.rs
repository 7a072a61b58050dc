//! Reading trees from Newick and BEAST/NEXUS files, writing distance matrices.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use phylotree::tree::Tree as PhyloTree;

use crate::error::{QuartetError, Result};

/// Taxon translation table and named trees read from one BEAST file.
pub type BeastTrees = (HashMap<String, String>, Vec<(String, PhyloTree)>);

/// Read a single Newick tree, which may be spread over several lines.
///
/// Lines are trimmed and joined without separators before parsing.
pub fn read_newick_file<P: AsRef<Path>>(path: P) -> Result<PhyloTree> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let newick: String = content.lines().map(str::trim).collect();
    if newick.is_empty() {
        return Err(QuartetError::NoTrees(path.display().to_string()));
    }
    PhyloTree::from_newick(&newick)
        .map_err(|e| QuartetError::Newick(format!("{}: {e}", path.display())))
}

/// Remove BEAST `[&...]` annotations, keeping everything else.
///
/// `:[&rate=0.1]2.5` becomes `:2.5`.
fn strip_beast_annotations(newick: &str) -> String {
    let mut result = String::with_capacity(newick.len());
    let mut in_annotation = false;
    let mut chars = newick.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '[' && chars.peek() == Some(&'&') {
            in_annotation = true;
        } else if ch == ']' && in_annotation {
            in_annotation = false;
        } else if !in_annotation {
            result.push(ch);
        }
    }
    result
}

/// Read the `TREE` lines of a BEAST `.trees` file.
///
/// Trees are named `<file stem>_tree_STATE<n>`. Burn-in drops the first
/// `burnin_trees` trees, or keeps only trees with `STATE_ > burnin_states`;
/// with both at zero every tree is kept. With `use_real_taxa` the leaves are
/// renamed through the `TRANSLATE` block.
///
/// # Errors
/// I/O failures and trees that fail to parse.
pub fn read_beast_trees<P: AsRef<Path>>(
    path: P,
    burnin_trees: usize,
    burnin_states: usize,
    use_real_taxa: bool,
) -> Result<BeastTrees> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;

    let base_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.trim_end_matches(".trees"))
        .unwrap_or("unknown");

    let taxons = parse_taxon_block(&content);

    let trees = collect_tree_blocks(&content)
        .into_iter()
        .enumerate()
        .map(|(idx, block)| (idx, extract_state(block.header), block))
        .filter(|(idx, state, _)| {
            (burnin_trees == 0 && burnin_states == 0)
                || (burnin_trees > 0 && *idx >= burnin_trees)
                || (burnin_states > 0 && *state > burnin_states)
        })
        .map(|(idx, state, block)| {
            let newick = strip_beast_annotations(&block.body);
            let mut tree = PhyloTree::from_newick(&newick).map_err(|e| {
                QuartetError::Newick(format!("tree {idx} of {}: {e}", path.display()))
            })?;
            if use_real_taxa {
                rename_leaf_nodes(&mut tree, &taxons);
            }
            Ok((format!("{base_name}_tree_STATE{state}"), tree))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((taxons, trees))
}

fn extract_state(header: &str) -> usize {
    header
        .to_ascii_uppercase()
        .find("STATE_")
        .and_then(|start| {
            header[start + "STATE_".len()..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect::<String>()
                .parse()
                .ok()
        })
        .unwrap_or(0)
}

struct TreeBlock<'a> {
    header: &'a str,
    body: String,
}

fn collect_tree_blocks(content: &str) -> Vec<TreeBlock<'_>> {
    content
        .lines()
        .skip_while(|line| !line.trim_start().to_ascii_uppercase().starts_with("TREE "))
        .take_while(|line| !line.trim().to_ascii_uppercase().starts_with("END;"))
        .filter_map(|line| {
            let (header, body) = line.split_once(" = ")?;
            Some(TreeBlock { header: header.trim(), body: body.trim().to_string() })
        })
        .collect()
}

/// `TRANSLATE` entries: `1 'taxon_a',` maps `"1"` to `"taxon_a"`.
fn parse_taxon_block(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .skip_while(|line| !line.trim().to_ascii_uppercase().starts_with("TRANSLATE"))
        .skip(1)
        .take_while(|line| !line.trim().starts_with(';'))
        .filter_map(|line| {
            let line = line.trim().trim_end_matches([',', ';']);
            let mut parts = line.split_whitespace();
            let id = parts.next()?.to_string();
            let label = parts.next()?.trim_matches('\'').to_string();
            Some((id, label))
        })
        .collect()
}

/// Rename leaves through `translate`; leaves without an entry keep their name.
pub fn rename_leaf_nodes(tree: &mut PhyloTree, translate: &HashMap<String, String>) {
    for leaf_id in tree.get_leaves() {
        if let Ok(node) = tree.get_mut(&leaf_id) {
            if let Some(label) = node.name.as_ref().and_then(|name| translate.get(name)) {
                node.name = Some(label.clone());
            }
        }
    }
}

/// Write a labeled square matrix as TSV, gzip-compressed if `path` ends in `.gz`.
pub fn write_matrix_tsv<P: AsRef<Path>, T: std::fmt::Display>(
    path: P,
    names: &[String],
    matrix: &[Vec<T>],
) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut out: Box<dyn Write> = if path.to_string_lossy().ends_with(".gz") {
        Box::new(BufWriter::new(GzEncoder::new(file, Compression::default())))
    } else {
        Box::new(BufWriter::new(file))
    };

    writeln!(out, "\t{}", names.join("\t"))?;
    for (name, row) in names.iter().zip(matrix) {
        write!(out, "{name}")?;
        for value in row {
            write!(out, "\t{value}")?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}
