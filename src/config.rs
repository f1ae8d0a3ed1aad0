//! Run configuration.

use std::path::PathBuf;

use num_bigint::BigUint;

use crate::error::{Result, SubsetSumError};
use crate::pedersen::MIN_PARAM_BITS;

/// Which protocol variant to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Length `n`; an opened round reveals the true solution size.
    Fixed,
    /// Padded to length `2n`; every round reveals exactly `n` selected entries.
    Variable,
}

impl Variant {
    pub fn label(self) -> &'static str {
        match self {
            Variant::Fixed => "fixed",
            Variant::Variable => "variable",
        }
    }
}

/// Modulus used to reduce the aggregated opening randomness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum RandomnessReduction {
    /// `p - 1`, the order of the commitment group.
    #[default]
    GroupOrder,
    /// The subset-sum modulus `M`. Only complete when `M` is a multiple of the
    /// order of `h`, e.g. `M = p - 1`.
    SubsetSumModulus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ChallengeMode {
    /// Verifier samples each bit from its own RNG.
    #[default]
    Interactive,
    /// Bits are derived from a transcript over all rounds' commitments.
    FiatShamir,
}

/// How the commitment parameters are obtained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamsConfig {
    /// Bit length of the prime modulus
    pub bits: u64,
    /// Request a safe prime `p = 2q + 1`
    pub safe_prime: bool,
    /// Directory holding `PED_<bits>.dat`; `None` disables persistence
    pub directory: Option<PathBuf>,
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self {
            bits: 2048,
            safe_prime: true,
            directory: Some(PathBuf::from(".")),
        }
    }
}

impl ParamsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.bits < MIN_PARAM_BITS {
            return Err(SubsetSumError::InvalidParameters(format!(
                "bits must be at least {}, got {}",
                MIN_PARAM_BITS, self.bits
            )));
        }
        Ok(())
    }
}

/// Shape of the generated instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceConfig {
    /// Number of values `n`
    pub n: usize,
    /// Number of selected values `K`
    pub k: usize,
    /// Subset-sum modulus; `None` means `p - 1`
    pub modulus: Option<BigUint>,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            n: 256,
            k: 16,
            modulus: None,
        }
    }
}

impl InstanceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.k > self.n {
            return Err(SubsetSumError::DegenerateInstance(format!(
                "Solution size {} exceeds instance size {}",
                self.k, self.n
            )));
        }
        if matches!(&self.modulus, Some(m) if *m == BigUint::from(0u32)) {
            return Err(SubsetSumError::DegenerateInstance(
                "Modulus must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters of a proof run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Independent rounds; a cheating prover survives with probability `2^-rounds`
    pub rounds: usize,
    pub variant: Variant,
    pub randomness_reduction: RandomnessReduction,
    pub challenge_mode: ChallengeMode,
    /// Run rounds on the rayon pool instead of one after another
    pub parallel_rounds: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            rounds: 40,
            variant: Variant::Fixed,
            randomness_reduction: RandomnessReduction::GroupOrder,
            challenge_mode: ChallengeMode::Interactive,
            parallel_rounds: false,
        }
    }
}

impl ProtocolConfig {
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.rounds == 0 {
            return Err(SubsetSumError::InvalidParameters(
                "At least one round is required".to_string(),
            ));
        }
        Ok(())
    }
}
