//! The four messages exchanged in one round.
//!
//! Each message is an immutable value handed from one role to the other;
//! nothing in here refers back to the sender's state.

use num_bigint::BigUint;

use crate::error::{Result, SubsetSumError};
use crate::pedersen::Commitment;
use crate::permutation::Permutation;

/// Prover -> Verifier: commitments for both branches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitMessage {
    pub branches: [Vec<Commitment>; 2],
}

impl CommitMessage {
    pub fn branch(&self, challenge: Challenge) -> &[Commitment] {
        &self.branches[challenge.index()]
    }

    pub fn other_branch(&self, challenge: Challenge) -> &[Commitment] {
        &self.branches[challenge.other().index()]
    }

    /// Both branches must hold exactly `len` commitments.
    pub fn check_len(&self, len: usize) -> Result<()> {
        for branch in &self.branches {
            if branch.len() != len {
                return Err(SubsetSumError::LengthMismatch {
                    expected: len,
                    got: branch.len(),
                });
            }
        }
        Ok(())
    }
}

/// Verifier -> Prover: which branch to open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Challenge(u8);

impl Challenge {
    pub const ZERO: Challenge = Challenge(0);
    pub const ONE: Challenge = Challenge(1);

    pub fn new(bit: u8) -> Result<Self> {
        match bit {
            0 | 1 => Ok(Self(bit)),
            other => Err(SubsetSumError::InvalidChallenge(other)),
        }
    }

    pub fn bit(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The branch that stays closed.
    pub fn other(self) -> Self {
        Self(1 - self.0)
    }
}

/// Prover -> Verifier: full opening of the challenged branch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpeningMessage {
    pub values: Vec<BigUint>,
    pub permutation: Permutation,
    pub randomness: Vec<BigUint>,
}

/// Prover -> Verifier: the indicator of the closed branch and the opening of
/// the aggregate commitment it selects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalOpening {
    pub permuted_indicator: Vec<u8>,
    pub sum_randomness: BigUint,
    pub target: BigUint,
}

impl FinalOpening {
    /// Number of selected positions the verifier gets to see.
    pub fn observed_cardinality(&self) -> usize {
        self.permuted_indicator.iter().filter(|&&b| b == 1).count()
    }
}
