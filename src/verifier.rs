//! Verifier role.
//!
//! Every check returns `Ok(())` or the error naming what failed. The verifier
//! only ever reads the disclosed messages and its own copy of the public
//! statement.

use rand::{CryptoRng, RngCore};
use rayon::prelude::*;
use tracing::debug;

use crate::config::Variant;
use crate::error::{Result, SubsetSumError};
use crate::instance::PublicStatement;
use crate::messages::{Challenge, CommitMessage, FinalOpening, OpeningMessage};
use crate::padding::pad_statement;
use crate::pedersen::{Commitment, PedersenParams};
use crate::transcript::interactive_challenge;

#[derive(Clone, Debug)]
pub struct Verifier {
    params: PedersenParams,
    statement: PublicStatement,
}

impl Verifier {
    /// Creates a verifier for `statement`. For the variable variant the public
    /// values are padded here, on the verifier's side.
    pub fn new(params: PedersenParams, statement: &PublicStatement, variant: Variant) -> Result<Self> {
        params.validate()?;
        let statement = match variant {
            Variant::Fixed => statement.clone(),
            Variant::Variable => pad_statement(statement),
        };
        Ok(Self { params, statement })
    }

    pub fn params(&self) -> &PedersenParams {
        &self.params
    }

    /// The statement being checked; padded for the variable variant.
    pub fn statement(&self) -> &PublicStatement {
        &self.statement
    }

    fn len(&self) -> usize {
        self.statement.values.len()
    }

    /// Validates the commitment message and flips a fair coin.
    pub fn challenge<R: RngCore + CryptoRng>(&self, commit: &CommitMessage, rng: &mut R) -> Result<Challenge> {
        commit.check_len(self.len())?;
        Ok(interactive_challenge(rng))
    }

    /// Checks that every commitment of the challenged branch unveils to the
    /// disclosed value, and that the disclosed values are the public ones
    /// reordered by the disclosed permutation.
    pub fn check_opening(
        &self,
        commit: &CommitMessage,
        challenge: Challenge,
        opening: &OpeningMessage,
    ) -> Result<()> {
        let len = self.len();
        commit.check_len(len)?;
        for got in [opening.values.len(), opening.randomness.len()] {
            if got != len {
                return Err(SubsetSumError::LengthMismatch { expected: len, got });
            }
        }
        opening.permutation.validate(len)?;

        let commitments = commit.branch(challenge);
        let broken = (0..len).into_par_iter().find_first(|&i| {
            !self
                .params
                .unveil(&commitments[i], &opening.randomness[i], &opening.values[i])
        });
        if let Some(index) = broken {
            return Err(SubsetSumError::BindingViolation { index });
        }

        let perm = opening.permutation.as_slice();
        if let Some(index) = (0..len).find(|&i| opening.values[i] != self.statement.values[perm[i]]) {
            return Err(SubsetSumError::PermutationMismatch { index });
        }

        debug!(branch = challenge.bit(), "Opening accepted");
        Ok(())
    }

    /// Multiplies the closed branch's commitments at the positions the
    /// disclosed indicator selects.
    pub fn aggregate(
        &self,
        commit: &CommitMessage,
        challenge: Challenge,
        final_opening: &FinalOpening,
    ) -> Result<Commitment> {
        let len = self.len();
        let indicator = &final_opening.permuted_indicator;
        if indicator.len() != len {
            return Err(SubsetSumError::LengthMismatch {
                expected: len,
                got: indicator.len(),
            });
        }
        if indicator.iter().any(|&b| b > 1) {
            return Err(SubsetSumError::FinalCheckFailed);
        }

        let closed = commit.other_branch(challenge);
        Ok(self.params.aggregate(
            closed
                .iter()
                .zip(indicator.iter())
                .filter(|(_, &bit)| bit == 1)
                .map(|(c, _)| c),
        ))
    }

    /// Accepts iff the aggregate unveils to the public target under the
    /// disclosed summed randomness.
    pub fn final_check(&self, aggregate: &Commitment, final_opening: &FinalOpening) -> Result<()> {
        if final_opening.target != self.statement.target {
            return Err(SubsetSumError::FinalCheckFailed);
        }
        if self
            .params
            .unveil(aggregate, &final_opening.sum_randomness, &final_opening.target)
        {
            debug!("Final aggregate accepted");
            Ok(())
        } else {
            Err(SubsetSumError::FinalCheckFailed)
        }
    }

    /// Runs the opening check, aggregation and final check for one round.
    pub fn verify_round(
        &self,
        commit: &CommitMessage,
        challenge: Challenge,
        opening: &OpeningMessage,
        final_opening: &FinalOpening,
    ) -> Result<()> {
        self.check_opening(commit, challenge, opening)?;
        let aggregate = self.aggregate(commit, challenge, final_opening)?;
        self.final_check(&aggregate, final_opening)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RandomnessReduction;
    use crate::instance::SubsetSumInstance;
    use crate::permutation::Permutation;
    use num_bigint::BigUint;
    use crate::prover::Prover;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    struct Fixture {
        prover: Prover,
        verifier: Verifier,
    }

    fn fixture(variant: Variant) -> Fixture {
        let mut rng = ChaCha20Rng::seed_from_u64(200);
        let params = PedersenParams::generate(64, true, &mut rng).unwrap();
        let instance = SubsetSumInstance::new(
            [10u32, 20, 30, 40, 50, 60].iter().map(|&v| BigUint::from(v)).collect(),
            BigUint::from(101u32),
            vec![0, 1, 0, 0, 1, 0],
        )
        .unwrap();
        let prover =
            Prover::new(params.clone(), &instance, variant, RandomnessReduction::GroupOrder).unwrap();
        let verifier = Verifier::new(params, &instance.statement(), variant).unwrap();
        Fixture { prover, verifier }
    }

    #[test]
    fn test_honest_round_both_challenges() {
        let f = fixture(Variant::Fixed);
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        for challenge in [Challenge::ZERO, Challenge::ONE] {
            let (round, commit) = f.prover.commit(&mut rng).unwrap();
            let (opened, opening) = round.open(challenge);
            let final_opening = opened.final_open().unwrap();
            f.verifier
                .verify_round(&commit, challenge, &opening, &final_opening)
                .unwrap();
        }
    }

    #[test]
    fn test_variable_round_pads_on_both_sides() {
        let f = fixture(Variant::Variable);
        assert_eq!(f.verifier.statement(), &f.prover.statement());
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let (round, commit) = f.prover.commit(&mut rng).unwrap();
        let challenge = f.verifier.challenge(&commit, &mut rng).unwrap();
        let (opened, opening) = round.open(challenge);
        let final_opening = opened.final_open().unwrap();
        assert_eq!(final_opening.observed_cardinality(), 6);
        f.verifier
            .verify_round(&commit, challenge, &opening, &final_opening)
            .unwrap();
    }

    #[test]
    fn test_tampered_value_is_binding_violation() {
        let f = fixture(Variant::Fixed);
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let (round, commit) = f.prover.commit(&mut rng).unwrap();
        let (_, mut opening) = round.open(Challenge::ZERO);
        opening.values[2] += 1u32;
        assert!(matches!(
            f.verifier.check_opening(&commit, Challenge::ZERO, &opening),
            Err(SubsetSumError::BindingViolation { index: 2 })
        ));
    }

    #[test]
    fn test_wrong_permutation_is_mismatch() {
        let f = fixture(Variant::Fixed);
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let (round, commit) = f.prover.commit(&mut rng).unwrap();
        let (_, mut opening) = round.open(Challenge::ONE);

        // Swap two permutation entries; values no longer line up
        let mut indices = opening.permutation.as_slice().to_vec();
        indices.swap(0, 1);
        opening.permutation = Permutation::from_indices(indices).unwrap();
        assert!(matches!(
            f.verifier.check_opening(&commit, Challenge::ONE, &opening),
            Err(SubsetSumError::PermutationMismatch { .. })
        ));

        // A non-bijection is rejected before any value is looked at
        opening.permutation = Permutation::identity(5);
        assert!(matches!(
            f.verifier.check_opening(&commit, Challenge::ONE, &opening),
            Err(SubsetSumError::LengthMismatch { expected: 6, got: 5 })
        ));
    }

    #[test]
    fn test_short_opening_is_rejected() {
        let f = fixture(Variant::Fixed);
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let (round, commit) = f.prover.commit(&mut rng).unwrap();
        let (_, mut opening) = round.open(Challenge::ZERO);
        opening.randomness.pop();
        assert!(matches!(
            f.verifier.check_opening(&commit, Challenge::ZERO, &opening),
            Err(SubsetSumError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_wrong_target_fails_final_check() {
        let f = fixture(Variant::Fixed);
        let mut rng = ChaCha20Rng::seed_from_u64(6);
        let (round, commit) = f.prover.commit(&mut rng).unwrap();
        let (opened, _) = round.open(Challenge::ZERO);
        let mut final_opening = opened.final_open().unwrap();

        let aggregate = f.verifier.aggregate(&commit, Challenge::ZERO, &final_opening).unwrap();
        f.verifier.final_check(&aggregate, &final_opening).unwrap();

        final_opening.target = BigUint::from(71u32);
        assert!(matches!(
            f.verifier.final_check(&aggregate, &final_opening),
            Err(SubsetSumError::FinalCheckFailed)
        ));
    }

    #[test]
    fn test_malformed_indicator_is_rejected() {
        let f = fixture(Variant::Fixed);
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let (round, commit) = f.prover.commit(&mut rng).unwrap();
        let (opened, _) = round.open(Challenge::ONE);
        let mut final_opening = opened.final_open().unwrap();
        final_opening.permuted_indicator[0] = 2;
        assert!(matches!(
            f.verifier.aggregate(&commit, Challenge::ONE, &final_opening),
            Err(SubsetSumError::FinalCheckFailed)
        ));
        final_opening.permuted_indicator.push(0);
        assert!(f.verifier.aggregate(&commit, Challenge::ONE, &final_opening).is_err());
    }

    #[test]
    fn test_challenge_rejects_wrong_shape() {
        let f = fixture(Variant::Fixed);
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        let (_, mut commit) = f.prover.commit(&mut rng).unwrap();
        commit.branches[1].pop();
        assert!(f.verifier.challenge(&commit, &mut rng).is_err());
    }
}
