use clap::{Parser, Subcommand};
use phylotree::tree::Tree as PhyloTree;
use quartet_distances::distances::{
    build_quartet_trees, check_same_leaf_set, compute_pairwise_quartet_parallel, symmetric_matrix,
};
use quartet_distances::io::{read_beast_trees, read_newick_file, write_matrix_tsv};
use quartet_distances::naive::naive_quartet_distance;
use quartet_distances::quartet::{quartet_distance, quartet_distance_parallel};
use quartet_distances::tree::Tree;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Quartet distances between unrooted trees, in sub-cubic time.
#[derive(Parser, Debug)]
#[command(name = "quartet-dist", version, about = "Quartet distance between phylogenetic trees")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare two Newick files and print the counts as one TSV row
    Pair {
        /// First Newick tree file
        tree1: PathBuf,

        /// Second Newick tree file
        tree2: PathBuf,

        /// Spread the node-pair sums over all cores
        #[arg(long = "parallel", default_value_t = false)]
        parallel: bool,

        /// Re-count every quartet by brute force and compare (small trees only)
        #[arg(long = "verify", default_value_t = false)]
        verify: bool,
    },

    /// Pairwise quartet distance matrix (TSV) for all trees of a BEAST/NEXUS file
    Matrix {
        /// Path to BEAST .trees (NEXUS) file
        #[arg(short = 'i', long = "input")]
        input: PathBuf,

        /// Output path for the TSV matrix (`.gz` compresses)
        #[arg(short = 'o', long = "output")]
        output: PathBuf,

        /// Burn-in by number of trees (drop first N trees)
        #[arg(short = 't', long = "burnin-trees", default_value_t = 0)]
        burnin_trees: usize,

        /// Burn-in by state (keep trees with STATE_ > value)
        #[arg(short = 's', long = "burnin-states", default_value_t = 0)]
        burnin_states: usize,

        /// Use TRANSLATE block to map taxon IDs to labels when available
        #[arg(long = "use-real-taxa", default_value_t = false)]
        use_real_taxa: bool,

        /// Write qdist / C(n, 4) instead of raw counts
        #[arg(long = "normalized", default_value_t = false)]
        normalized: bool,

        /// Quiet mode: suppresses progress messages on stdout
        #[arg(short = 'q', long = "quiet", default_value_t = false)]
        quiet: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Commands::Pair { tree1, tree2, parallel, verify } => run_pair(&tree1, &tree2, parallel, verify),
        Commands::Matrix {
            input,
            output,
            burnin_trees,
            burnin_states,
            use_real_taxa,
            normalized,
            quiet,
        } => run_matrix(&input, &output, burnin_trees, burnin_states, use_real_taxa, normalized, !quiet),
    }
}

fn run_pair(path1: &Path, path2: &Path, parallel: bool, verify: bool) {
    let read = |path: &Path| match read_newick_file(path) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("Failed to read {path:?}: {e}");
            std::process::exit(2);
        }
    };
    let (phylo1, phylo2) = (read(path1), read(path2));

    if let Err(e) = check_same_leaf_set(&phylo1, &phylo2) {
        eprintln!("Trees do not have the same leaf set: {e}");
        std::process::exit(1);
    }

    let convert = |phylo: &PhyloTree| match Tree::from_phylo(phylo) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("Failed to convert tree: {e}");
            std::process::exit(3);
        }
    };
    let first = convert(&phylo1);
    let mut second = convert(&phylo2);
    if let Err(e) = second
        .renumber_leaves_to_match(&first)
        .and_then(|()| first.validate())
        .and_then(|()| second.validate())
    {
        eprintln!("Failed to prepare trees: {e}");
        std::process::exit(3);
    }

    let dist = if parallel {
        quartet_distance_parallel(&first, &second)
    } else {
        quartet_distance(&first, &second)
    };

    if verify {
        let expected = naive_quartet_distance(&first, &second);
        if expected != dist {
            eprintln!("Brute-force count disagrees: {expected:?} vs {dist:?}");
            std::process::exit(5);
        }
    }

    println!("N\tB1\tB2\tS\tD\tNorm B\tQ\tNorm Q");
    println!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        dist.num_leaves,
        dist.b1,
        dist.b2,
        dist.shared,
        dist.diff,
        dist.normalized_shared(),
        dist.qdist,
        dist.normalized()
    );
}

fn run_matrix(
    input: &Path,
    output: &Path,
    burnin_trees: usize,
    burnin_states: usize,
    use_real_taxa: bool,
    normalized: bool,
    verbose: bool,
) {
    let t0 = Instant::now();
    let (taxons, named_trees) = match read_beast_trees(input, burnin_trees, burnin_states, use_real_taxa) {
        Ok(read) => read,
        Err(e) => {
            eprintln!("Failed to read {input:?}: {e}");
            std::process::exit(2);
        }
    };
    if named_trees.is_empty() {
        eprintln!("No trees parsed from {input:?}.");
        std::process::exit(2);
    }
    let read_s = t0.elapsed().as_secs_f64();
    log_if(verbose, format!("Reading in beast {read_s:.3}s"));
    log_if(verbose, format!("Read in {} taxons for {} trees", taxons.len(), named_trees.len()));
    let (names, trees): (Vec<String>, Vec<_>) = named_trees.into_iter().unzip();

    let t1 = Instant::now();
    let converted = match build_quartet_trees(&trees) {
        Ok(converted) => converted,
        Err(e) => {
            eprintln!("Failed to convert trees: {e}");
            std::process::exit(3);
        }
    };
    log_if(verbose, format!("Converting trees {:.3}s", t1.elapsed().as_secs_f64()));

    let t2 = Instant::now();
    let n = names.len();
    log_if(verbose, format!("Determining quartet distances for {} combinations", n * (n - 1) / 2));
    let pairs = compute_pairwise_quartet_parallel(&converted);
    log_if(verbose, format!("Determining quartet distances {:.3}s", t2.elapsed().as_secs_f64()));

    let t3 = Instant::now();
    let written = if normalized {
        write_matrix_tsv(output, &names, &symmetric_matrix(n, &pairs, |d| d.normalized()))
    } else {
        write_matrix_tsv(output, &names, &symmetric_matrix(n, &pairs, |d| d.qdist))
    };
    if let Err(e) = written {
        eprintln!("Failed to write output {output:?}: {e}");
        std::process::exit(4);
    }
    log_if(verbose, format!("Writing to output {:.3}s", t3.elapsed().as_secs_f64()));
}

fn log_if(show: bool, msg: String) {
    if show {
        println!("{}", msg);
    }
}
