//! Pedersen commitments over the multiplicative group modulo a prime.
//!
//! A commitment to `m` is `c = g^m * h^s mod p` for uniformly sampled `s`.
//! The scheme is perfectly hiding and computationally binding as long as the
//! discrete log of `h` base `g` stays unknown, and it is additively
//! homomorphic: multiplying commitments commits to the sum of the messages
//! under the sum of the randomness.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::arith::{self, append_len_prefixed};
use crate::error::{Result, SubsetSumError};

/// Smallest modulus size accepted by [`PedersenParams::generate`].
pub const MIN_PARAM_BITS: u64 = 16;

/// Public parameters of the commitment scheme: a prime `p` and two
/// generators `g`, `h` of `Z_p^*`.
///
/// Both roles hold the same read-only copy. Binding rests on nobody knowing
/// `log_g(h)`, so `g` and `h` are sampled independently and must differ.
/// With a safe prime `p = 2q + 1` both generators are primitive roots, so
/// exponents live mod `p - 1`: messages and randomness may exceed `p` and
/// still commit to their residue mod `p - 1`.
///
/// Parameters are expensive to generate at realistic sizes; see
/// [`crate::param_file`] for the on-disk form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PedersenParams {
    /// Prime modulus
    pub p: BigUint,
    /// Message generator
    pub g: BigUint,
    /// Randomness generator
    pub h: BigUint,
}

/// A commitment value. The opening randomness lives in [`Opening`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Commitment {
    pub value: BigUint,
}

/// Private randomness needed to unveil a [`Commitment`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Opening {
    pub randomness: BigUint,
}

impl PedersenParams {
    /// Generates fresh parameters with a `bits`-bit prime modulus.
    ///
    /// Generators are drawn independently so nobody learns `log_g(h)`.
    pub fn generate<R: RngCore + CryptoRng>(bits: u64, safe_prime: bool, rng: &mut R) -> Result<Self> {
        if bits < MIN_PARAM_BITS {
            return Err(SubsetSumError::InvalidParameters(format!(
                "Modulus of {} bits is below the minimum of {}",
                bits, MIN_PARAM_BITS
            )));
        }

        info!(bits, safe_prime, "Generating commitment parameters");
        let p = arith::generate_prime(bits, safe_prime, rng)?;
        let g = sample_generator(&p, rng)?;
        let h = loop {
            let candidate = sample_generator(&p, rng)?;
            if candidate != g {
                break candidate;
            }
        };

        let params = Self { p, g, h };
        info!(fingerprint = %params.fingerprint_hex(), "Commitment parameters ready");
        Ok(params)
    }

    /// Builds parameters from existing values after checking them.
    pub fn from_parts(p: BigUint, g: BigUint, h: BigUint) -> Result<Self> {
        let params = Self { p, g, h };
        params.validate()?;
        Ok(params)
    }

    /// Checks the structural requirements on `(p, g, h)`.
    pub fn validate(&self) -> Result<()> {
        let two = BigUint::from(2u32);
        if self.p <= BigUint::from(3u32) {
            return Err(SubsetSumError::InvalidParameters(format!(
                "Modulus {} too small",
                self.p
            )));
        }
        let upper = &self.p - 1u32;
        for (name, x) in [("g", &self.g), ("h", &self.h)] {
            if x < &two || x >= &upper {
                return Err(SubsetSumError::InvalidParameters(format!(
                    "Generator {} outside [2, p-1)",
                    name
                )));
            }
        }
        if self.g == self.h {
            return Err(SubsetSumError::InvalidParameters(
                "Generators g and h must differ".to_string(),
            ));
        }
        Ok(())
    }

    /// Order of the multiplicative group, `p - 1`.
    pub fn group_order(&self) -> BigUint {
        &self.p - 1u32
    }

    /// Bit length of the modulus.
    pub fn bits(&self) -> u64 {
        self.p.bits()
    }

    /// Commits to `m` with fresh randomness sampled uniformly from `[0, p)`.
    pub fn commit<R: RngCore + CryptoRng>(&self, m: &BigUint, rng: &mut R) -> Result<(Commitment, Opening)> {
        let s = arith::sample_below(&self.p, rng)?;
        let commitment = self.commit_with(m, &s);
        Ok((commitment, Opening { randomness: s }))
    }

    /// Deterministic commit with caller-supplied randomness.
    pub fn commit_with(&self, m: &BigUint, s: &BigUint) -> Commitment {
        let x1 = self.g.modpow(m, &self.p);
        let x2 = self.h.modpow(s, &self.p);
        Commitment {
            value: (x1 * x2) % &self.p,
        }
    }

    /// Returns true iff `c` opens to `m` under randomness `s`.
    pub fn unveil(&self, c: &Commitment, s: &BigUint, m: &BigUint) -> bool {
        self.commit_with(m, s) == *c
    }

    /// Commits to every value in `values`.
    ///
    /// Randomness is drawn from `rng` up front in index order, so the output only
    /// depends on the RNG state; the exponentiations then run on the rayon pool.
    pub fn commit_batch<R: RngCore + CryptoRng>(
        &self,
        values: &[BigUint],
        rng: &mut R,
    ) -> Result<(Vec<Commitment>, Vec<Opening>)> {
        let randomness = values
            .iter()
            .map(|_| arith::sample_below(&self.p, rng))
            .collect::<Result<Vec<_>>>()?;

        let commitments: Vec<Commitment> = values
            .par_iter()
            .zip(randomness.par_iter())
            .map(|(m, s)| self.commit_with(m, s))
            .collect();

        debug!(count = values.len(), "Committed batch");
        let openings = randomness
            .into_iter()
            .map(|randomness| Opening { randomness })
            .collect();
        Ok((commitments, openings))
    }

    /// Multiplies the selected commitments together.
    ///
    /// The product commits to the sum of the selected messages under the sum of
    /// the selected randomness. An empty selection yields the commitment to zero
    /// with zero randomness, i.e. `1`.
    pub fn aggregate<'a, I>(&self, commitments: I) -> Commitment
    where
        I: IntoIterator<Item = &'a Commitment>,
    {
        let value = commitments
            .into_iter()
            .fold(BigUint::one(), |acc, c| (acc * &c.value) % &self.p);
        Commitment { value }
    }

    /// blake3 digest over `(p, g, h)`, used to identify a parameter set.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"pedersen-params");
        let mut buf = Vec::new();
        append_len_prefixed(&mut buf, &self.p);
        append_len_prefixed(&mut buf, &self.g);
        append_len_prefixed(&mut buf, &self.h);
        hasher.update(&buf);
        *hasher.finalize().as_bytes()
    }

    /// First eight bytes of the fingerprint in hex, for logs.
    pub fn fingerprint_hex(&self) -> String {
        self.fingerprint()[..8]
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    /// Commits to a random value and checks it unveils.
    pub fn self_test<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<()> {
        let m = arith::sample_below(&self.p, rng)?;
        let (c, opening) = self.commit(&m, rng)?;
        if self.unveil(&c, &opening.randomness, &m) {
            debug!("Commitment self-test passed");
            Ok(())
        } else {
            Err(SubsetSumError::InvalidParameters(
                "Commitment self-test failed".to_string(),
            ))
        }
    }
}

/// Samples an element whose square and `(p-1)/2`-th power are both not one.
///
/// For a safe prime this accepts exactly the primitive roots. Candidates come
/// from `[2, p-1)` so zero and the trivial elements never qualify.
fn sample_generator<R: RngCore + CryptoRng>(p: &BigUint, rng: &mut R) -> Result<BigUint> {
    let two = BigUint::from(2u32);
    let upper = p - 1u32;
    let half_order = &upper >> 1u32;
    if half_order.is_zero() {
        return Err(SubsetSumError::InvalidParameters(format!(
            "Modulus {} has no generators of high order",
            p
        )));
    }

    loop {
        let g = arith::sample_range(&two, &upper, rng)?;
        let square = (&g * &g) % p;
        let power_q = g.modpow(&half_order, p);
        if !square.is_one() && !power_q.is_one() {
            return Ok(g);
        }
    }
}
