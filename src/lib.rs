//! Interactive zero-knowledge proof of knowledge of a modular subset-sum
//! solution, built on Pedersen commitments and cut-and-choose permutations.
//!
//! The fixed variant proves knowledge of an indicator `x` with
//! `sum a[i] * x[i] = S (mod M)`. The variable variant pads the instance so
//! that every round reveals the same number of selected entries, hiding the
//! solution size.

pub mod arith;
pub mod config;
pub mod error;
pub mod instance;
pub mod messages;
pub mod padding;
pub mod param_file;
pub mod pedersen;
pub mod permutation;
pub mod protocol;
pub mod prover;
pub mod transcript;
pub mod verifier;


pub use config::{ChallengeMode, InstanceConfig, ParamsConfig, ProtocolConfig, RandomnessReduction, Variant};
pub use error::{Result, SubsetSumError};
pub use instance::{PublicStatement, SubsetSumInstance};
pub use messages::{Challenge, CommitMessage, FinalOpening, OpeningMessage};
pub use pedersen::{Commitment, Opening, PedersenParams};
pub use permutation::Permutation;
pub use protocol::{
    prove_and_verify, ProofReport, ProofSession, RejectReason, RoundPhase, RoundRecord, Verdict,
};
pub use prover::Prover;
pub use verifier::Verifier;

use rand::{CryptoRng, RngCore};
use tracing::info;

/// Obtains commitment parameters as configured: loaded from or saved to
/// `PED_<bits>.dat` when a directory is set, freshly generated otherwise.
pub fn setup<R: RngCore + CryptoRng>(config: &ParamsConfig, rng: &mut R) -> Result<PedersenParams> {
    config.validate()?;
    let params = match &config.directory {
        Some(directory) => param_file::load_or_generate(directory, config.bits, config.safe_prime, rng)?,
        None => {
            let params = PedersenParams::generate(config.bits, config.safe_prime, rng)?;
            params.self_test(rng)?;
            params
        }
    };
    info!(bits = params.bits(), fingerprint = %params.fingerprint_hex(), "Using commitment parameters");
    Ok(params)
}

/// Generates a random YES-instance. Without an explicit modulus the group
/// order `p - 1` is used.
pub fn generate_instance<R: RngCore + CryptoRng>(
    params: &PedersenParams,
    config: &InstanceConfig,
    rng: &mut R,
) -> Result<SubsetSumInstance> {
    config.validate()?;
    let modulus = match &config.modulus {
        Some(m) => m.clone(),
        None => params.group_order(),
    };
    SubsetSumInstance::generate(&modulus, config.n, config.k, rng)
}

/// Runs the fixed and then the variable variant over the same instance.
pub fn prove_both_variants<R: RngCore + CryptoRng>(
    params: &PedersenParams,
    instance: &SubsetSumInstance,
    config: &ProtocolConfig,
    rng: &mut R,
) -> Result<[ProofReport; 2]> {
    let fixed = prove_and_verify(params, instance, &config.clone().with_variant(Variant::Fixed), rng)?;
    let variable = prove_and_verify(params, instance, &config.clone().with_variant(Variant::Variable), rng)?;
    Ok([fixed, variable])
}
