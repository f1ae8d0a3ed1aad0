//! Random permutations and their application to value arrays and indicators.
//!
//! The convention throughout is `apply(a, p)[i] = a[p[i]]`.

use rand::{CryptoRng, Rng, RngCore};
use zeroize::Zeroize;

use crate::error::{Result, SubsetSumError};

/// A bijection over `[0, len)`.
#[derive(Clone, Debug, PartialEq, Eq, Zeroize)]
pub struct Permutation {
    indices: Vec<usize>,
}

/// Fisher-Yates shuffle: for `i` in `0..len-1` swap `i` with a uniform `j` in `[i, len)`.
pub fn shuffle<T, R: RngCore + CryptoRng>(items: &mut [T], rng: &mut R) {
    let len = items.len();
    if len < 2 {
        return;
    }
    for i in 0..=len - 2 {
        let j = rng.gen_range(i..len);
        items.swap(i, j);
    }
}

impl Permutation {
    pub fn identity(len: usize) -> Self {
        Self {
            indices: (0..len).collect(),
        }
    }

    /// Uniformly random permutation of `len` elements.
    pub fn random<R: RngCore + CryptoRng>(len: usize, rng: &mut R) -> Self {
        let mut perm = Self::identity(len);
        shuffle(&mut perm.indices, rng);
        perm
    }

    /// Wraps an index vector, checking that it is a bijection.
    pub fn from_indices(indices: Vec<usize>) -> Result<Self> {
        let perm = Self { indices };
        perm.validate(perm.len())?;
        Ok(perm)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    /// Checks that this is a bijection over `[0, expected_len)`.
    ///
    /// Disclosed permutations come from the other party, so nothing about
    /// them is trusted until this passes.
    pub fn validate(&self, expected_len: usize) -> Result<()> {
        if self.indices.len() != expected_len {
            return Err(SubsetSumError::LengthMismatch {
                expected: expected_len,
                got: self.indices.len(),
            });
        }
        let mut seen = vec![false; expected_len];
        for (position, &index) in self.indices.iter().enumerate() {
            if index >= expected_len || seen[index] {
                return Err(SubsetSumError::PermutationMismatch { index: position });
            }
            seen[index] = true;
        }
        Ok(())
    }

    /// `result[i] = items[self[i]]`.
    pub fn apply<T: Clone>(&self, items: &[T]) -> Result<Vec<T>> {
        if items.len() != self.indices.len() {
            return Err(SubsetSumError::LengthMismatch {
                expected: self.indices.len(),
                got: items.len(),
            });
        }
        Ok(self.indices.iter().map(|&i| items[i].clone()).collect())
    }

    /// Same indexing rule as [`Permutation::apply`], for a 0/1 indicator.
    pub fn apply_to_indicator(&self, indicator: &[u8]) -> Result<Vec<u8>> {
        self.apply(indicator)
    }
}
