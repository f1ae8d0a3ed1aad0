//! Modular subset-sum instances.
//!
//! An instance is an array `a` of values mod `M`, a target `S` and the
//! witness: a 0/1 indicator whose selected values sum to `S` mod `M`.

use num_bigint::BigUint;
use num_traits::Zero;
use rand::{CryptoRng, RngCore};
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::arith;
use crate::error::{Result, SubsetSumError};
use crate::permutation::shuffle;

/// A YES-instance together with its witness.
#[derive(Clone, Debug, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SubsetSumInstance {
    #[zeroize(skip)]
    values: Vec<BigUint>,
    #[zeroize(skip)]
    modulus: BigUint,
    #[zeroize(skip)]
    target: BigUint,
    solution: Vec<u8>,
}

/// The part of an instance both roles see: values, modulus and target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicStatement {
    pub values: Vec<BigUint>,
    pub modulus: BigUint,
    pub target: BigUint,
}

impl SubsetSumInstance {
    /// Generates a random YES-instance with `n` values and `k` selected ones.
    ///
    /// Values are uniform in `[0, modulus)`; the selected positions come from
    /// shuffling `k` ones followed by `n - k` zeros.
    pub fn generate<R: RngCore + CryptoRng>(
        modulus: &BigUint,
        n: usize,
        k: usize,
        rng: &mut R,
    ) -> Result<Self> {
        check_shape(modulus, n, k)?;
        info!(n, k, "Generating modular subset-sum instance");

        let values = (0..n)
            .map(|_| arith::sample_below(modulus, rng))
            .collect::<Result<Vec<_>>>()?;

        let mut solution: Vec<u8> = std::iter::repeat(1)
            .take(k)
            .chain(std::iter::repeat(0).take(n - k))
            .collect();
        shuffle(&mut solution, rng);

        let instance = Self::new(values, modulus.clone(), solution)?;
        debug!(sum = %instance.target, "Instance ready");
        Ok(instance)
    }

    /// Builds an instance from explicit values and indicator, computing the target.
    pub fn new(values: Vec<BigUint>, modulus: BigUint, solution: Vec<u8>) -> Result<Self> {
        let k = solution.iter().filter(|&&b| b == 1).count();
        check_shape(&modulus, values.len(), k)?;
        if solution.len() != values.len() {
            return Err(SubsetSumError::DegenerateInstance(format!(
                "{} values but {} indicator entries",
                values.len(),
                solution.len()
            )));
        }
        if let Some(position) = solution.iter().position(|&b| b > 1) {
            return Err(SubsetSumError::DegenerateInstance(format!(
                "Indicator entry {} is not 0 or 1",
                position
            )));
        }
        if let Some(position) = values.iter().position(|v| v >= &modulus) {
            return Err(SubsetSumError::DegenerateInstance(format!(
                "Value at position {} is not reduced mod M",
                position
            )));
        }

        let target = selected_sum(&values, &solution, &modulus);
        Ok(Self {
            values,
            modulus,
            target,
            solution,
        })
    }

    pub fn values(&self) -> &[BigUint] {
        &self.values
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    pub fn target(&self) -> &BigUint {
        &self.target
    }

    pub fn solution(&self) -> &[u8] {
        &self.solution
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of selected elements, `K`.
    pub fn cardinality(&self) -> usize {
        self.solution.iter().filter(|&&b| b == 1).count()
    }

    /// Recomputes the indicated sum and compares it with the target.
    pub fn verify_solution(&self) -> bool {
        selected_sum(&self.values, &self.solution, &self.modulus) == self.target
    }

    /// Sum of the selected values over the integers, before reduction mod `M`.
    ///
    /// This is what the aggregate commitment opens to.
    pub fn selected_integer_sum(&self) -> BigUint {
        self.values
            .iter()
            .zip(self.solution.iter())
            .filter(|(_, &bit)| bit == 1)
            .fold(BigUint::zero(), |acc, (v, _)| acc + v)
    }

    /// The public statement with the instance's own target.
    pub fn statement(&self) -> PublicStatement {
        PublicStatement {
            values: self.values.clone(),
            modulus: self.modulus.clone(),
            target: self.target.clone(),
        }
    }
}

/// `sum_{i: indicator[i] = 1} values[i] mod modulus`.
pub fn selected_sum(values: &[BigUint], indicator: &[u8], modulus: &BigUint) -> BigUint {
    values
        .iter()
        .zip(indicator.iter())
        .filter(|(_, &bit)| bit == 1)
        .fold(BigUint::zero(), |acc, (v, _)| (acc + v) % modulus)
}

fn check_shape(modulus: &BigUint, n: usize, k: usize) -> Result<()> {
    if modulus.is_zero() {
        return Err(SubsetSumError::DegenerateInstance(
            "Modulus must be positive".to_string(),
        ));
    }
    if k > n {
        return Err(SubsetSumError::DegenerateInstance(format!(
            "Solution size {} exceeds instance size {}",
            k, n
        )));
    }
    Ok(())
}
