//! Prover role.
//!
//! A round moves through three owned states: [`Prover::commit`] yields a
//! [`CommittedRound`], opening the challenged branch yields an
//! [`OpenedRound`], and the final opening consumes it. The borrow checker
//! makes it impossible to open twice or to reuse a round's secrets.

use num_bigint::BigUint;
use num_traits::Zero;
use rand::{CryptoRng, RngCore};
use tracing::debug;
use zeroize::Zeroize;

use crate::config::{RandomnessReduction, Variant};
use crate::error::{Result, SubsetSumError};
use crate::instance::{PublicStatement, SubsetSumInstance};
use crate::messages::{Challenge, CommitMessage, FinalOpening, OpeningMessage};
use crate::padding::pad_instance;
use crate::pedersen::{Commitment, Opening, PedersenParams};
use crate::permutation::Permutation;

/// Holds the witness and answers one round at a time.
#[derive(Clone, Debug)]
pub struct Prover {
    params: PedersenParams,
    instance: SubsetSumInstance,
    claimed_target: BigUint,
    variant: Variant,
    reduction: RandomnessReduction,
}

/// One permuted copy of the instance and everything needed to open it.
struct Branch {
    permutation: Permutation,
    values: Vec<BigUint>,
    commitments: Vec<Commitment>,
    openings: Vec<Opening>,
}

impl Drop for Branch {
    fn drop(&mut self) {
        self.permutation.zeroize();
    }
}

/// State after the commitments have been sent.
///
/// Holds both permuted branches together with their openings. The only way
/// forward is [`CommittedRound::open`], which consumes the state: the
/// challenged branch is disclosed in full and the other one is carried into
/// [`OpenedRound`] for the final aggregate opening. Dropping a round without
/// opening it wipes both permutations.
///
/// Rounds borrow their [`Prover`], so any number of them can be in flight
/// at once (one per thread when rounds run in parallel).
pub struct CommittedRound<'p> {
    prover: &'p Prover,
    branches: [Branch; 2],
}

/// State after the challenged branch has been opened.
pub struct OpenedRound<'p> {
    prover: &'p Prover,
    closed: Branch,
}

impl Prover {
    /// Creates a prover for `instance`; the variable variant pads it first.
    ///
    /// Fails with [`SubsetSumError::DegenerateInstance`] when an honest run
    /// over these parameters could not be accepted, see [`check_completeness`].
    pub fn new(
        params: PedersenParams,
        instance: &SubsetSumInstance,
        variant: Variant,
        reduction: RandomnessReduction,
    ) -> Result<Self> {
        params.validate()?;
        check_completeness(&params, instance, reduction)?;
        let instance = match variant {
            Variant::Fixed => instance.clone(),
            Variant::Variable => pad_instance(instance)?,
        };
        Ok(Self {
            claimed_target: instance.target().clone(),
            params,
            instance,
            variant,
            reduction,
        })
    }

    /// Claims a different target than the witness sums to.
    ///
    /// An honest prover never does this; it exists to exercise rejection.
    pub fn with_claimed_target(mut self, target: BigUint) -> Self {
        self.claimed_target = target;
        self
    }

    pub fn params(&self) -> &PedersenParams {
        &self.params
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Length `L` of the committed arrays.
    pub fn committed_len(&self) -> usize {
        self.instance.len()
    }

    /// The statement this prover claims: public values, modulus, claimed target.
    ///
    /// For the variable variant the values are the padded ones.
    pub fn statement(&self) -> PublicStatement {
        PublicStatement {
            values: self.instance.values().to_vec(),
            modulus: self.instance.modulus().clone(),
            target: self.claimed_target.clone(),
        }
    }

    fn reduction_modulus(&self) -> BigUint {
        match self.reduction {
            RandomnessReduction::GroupOrder => self.params.group_order(),
            RandomnessReduction::SubsetSumModulus => self.instance.modulus().clone(),
        }
    }

    fn commit_branch<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<Branch> {
        let permutation = Permutation::random(self.committed_len(), rng);
        let values = permutation.apply(self.instance.values())?;
        let (commitments, openings) = self.params.commit_batch(&values, rng)?;
        Ok(Branch {
            permutation,
            values,
            commitments,
            openings,
        })
    }

    /// Samples two fresh permutations and commits to both permuted arrays.
    pub fn commit<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<(CommittedRound<'_>, CommitMessage)> {
        let first = self.commit_branch(rng)?;
        let second = self.commit_branch(rng)?;
        let message = CommitMessage {
            branches: [first.commitments.clone(), second.commitments.clone()],
        };
        debug!(len = self.committed_len(), "Prover committed to both branches");
        Ok((
            CommittedRound {
                prover: self,
                branches: [first, second],
            },
            message,
        ))
    }
}

impl<'p> CommittedRound<'p> {
    /// Opens every commitment of the challenged branch.
    pub fn open(self, challenge: Challenge) -> (OpenedRound<'p>, OpeningMessage) {
        let [first, second] = self.branches;
        let (opened, closed) = if challenge == Challenge::ZERO {
            (first, second)
        } else {
            (second, first)
        };

        let message = OpeningMessage {
            values: opened.values.clone(),
            permutation: opened.permutation.clone(),
            randomness: opened.openings.iter().map(|o| o.randomness.clone()).collect(),
        };
        debug!(branch = challenge.bit(), "Prover opened challenged branch");
        (
            OpenedRound {
                prover: self.prover,
                closed,
            },
            message,
        )
    }
}

impl<'p> OpenedRound<'p> {
    /// Discloses the closed branch's permuted indicator, the summed randomness
    /// of the positions it selects, and the claimed target.
    pub fn final_open(self) -> Result<FinalOpening> {
        let mut permuted_indicator = self
            .closed
            .permutation
            .apply_to_indicator(self.prover.instance.solution())?;

        let modulus = self.prover.reduction_modulus();
        let sum_randomness = permuted_indicator
            .iter()
            .zip(self.closed.openings.iter())
            .filter(|(&bit, _)| bit == 1)
            .fold(BigUint::zero(), |acc, (_, o)| (acc + &o.randomness) % &modulus);

        let opening = FinalOpening {
            permuted_indicator: permuted_indicator.clone(),
            sum_randomness,
            target: self.prover.claimed_target.clone(),
        };
        permuted_indicator.zeroize();
        Ok(opening)
    }
}

/// Checks that an honest run over `params` accepts `instance`.
///
/// The aggregate commitment opens to the integer sum of the selected values,
/// while the target is that sum reduced mod `M`. Both agree in the exponent
/// only if `p - 1` divides `M` or the sum does not reach `M`. Reducing the
/// opening randomness mod `M` likewise needs `p - 1` to divide `M`.
pub fn check_completeness(
    params: &PedersenParams,
    instance: &SubsetSumInstance,
    reduction: RandomnessReduction,
) -> Result<()> {
    let order = params.group_order();
    let aligned = (instance.modulus() % &order).is_zero();
    if aligned {
        return Ok(());
    }
    if instance.selected_integer_sum() >= *instance.modulus() {
        return Err(SubsetSumError::DegenerateInstance(format!(
            "Selected values wrap the modulus {} which is not a multiple of p - 1",
            instance.modulus()
        )));
    }
    if reduction == RandomnessReduction::SubsetSumModulus {
        return Err(SubsetSumError::DegenerateInstance(format!(
            "Randomness cannot be reduced mod {}: not a multiple of p - 1",
            instance.modulus()
        )));
    }
    Ok(())
}
