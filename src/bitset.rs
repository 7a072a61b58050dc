//! Fixed-width leaf sets, used by the brute-force quartet classifier.
//!
//! # Overview
//! Bit `i` stands for the leaf with id `i`. The fast engine never materializes
//! leaf sets (it only needs their sizes), but an explicit set per directed
//! edge is the most direct way to read a quartet topology off a tree, which
//! is what [`crate::naive`] does to cross-check the engine.
//!
//! # Example
//! For leaves `[A, B, C, D]` with ids `[0, 1, 2, 3]`:
//! - `{A, C}` → `0b0101`
//! - complement of `{A, C}` → `{B, D}` → `0b1010`

/// A set of leaf ids stored in 64-bit words.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Bitset(Vec<u64>);

impl Bitset {
    /// Empty set with room for ids `0..num_leaves`.
    ///
    /// ```
    /// # use quartet_distances::bitset::Bitset;
    /// let set = Bitset::for_leaves(100);
    /// assert_eq!(set.count_ones(), 0);
    /// ```
    pub fn for_leaves(num_leaves: usize) -> Self {
        Bitset(vec![0u64; num_leaves.div_ceil(64)])
    }

    #[inline]
    pub fn set(&mut self, idx: usize) {
        self.0[idx >> 6] |= 1u64 << (idx & 63);
    }

    #[inline]
    pub fn contains(&self, idx: usize) -> bool {
        self.0[idx >> 6] & (1u64 << (idx & 63)) != 0
    }

    /// `self ∪= other`.
    #[inline]
    pub fn or_assign(&mut self, other: &Bitset) {
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a |= *b;
        }
    }

    /// Number of leaves in the set.
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// `|self ∩ other|` without allocating the intersection.
    ///
    /// ```
    /// # use quartet_distances::bitset::Bitset;
    /// let mut a = Bitset::for_leaves(8);
    /// let mut b = Bitset::for_leaves(8);
    /// for i in [0, 2, 5] { a.set(i); }
    /// for i in [2, 5, 7] { b.set(i); }
    /// assert_eq!(a.and_count(&b), 2);
    /// ```
    #[inline]
    pub fn and_count(&self, other: &Bitset) -> usize {
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a & b).count_ones() as usize)
            .sum()
    }

    /// The leaves of `0..num_leaves` not in `self`.
    ///
    /// Bits past `num_leaves` in the last word stay clear.
    pub fn complement(&self, num_leaves: usize) -> Bitset {
        let mut out = Bitset(self.0.iter().map(|w| !w).collect());
        let tail = num_leaves & 63;
        if tail != 0 {
            if let Some(last) = out.0.last_mut() {
                *last &= (1u64 << tail) - 1;
            }
        }
        out
    }
}
