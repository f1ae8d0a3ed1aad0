//! Size-hiding padding for the variable-size variant.
//!
//! An instance of length `n` with `K` selected values becomes an instance of
//! length `2n`: the original values followed by `n` zeros, and an indicator
//! that additionally selects the first `n - K` zeros. Every padded instance
//! therefore selects exactly `n` entries and the indicated sum is unchanged.

use num_bigint::BigUint;
use num_traits::Zero;
use tracing::debug;

use crate::error::Result;
use crate::instance::{PublicStatement, SubsetSumInstance};

/// Pads `instance` to length `2n` with exactly `n` selected entries.
pub fn pad_instance(instance: &SubsetSumInstance) -> Result<SubsetSumInstance> {
    let n = instance.len();
    let k = instance.cardinality();

    let values: Vec<BigUint> = instance
        .values()
        .iter()
        .cloned()
        .chain(std::iter::repeat_with(BigUint::zero).take(n))
        .collect();

    let solution: Vec<u8> = instance
        .solution()
        .iter()
        .copied()
        .chain(std::iter::repeat(1).take(n - k))
        .chain(std::iter::repeat(0).take(k))
        .collect();

    debug!(n, dummies = n - k, "Padded instance");
    SubsetSumInstance::new(values, instance.modulus().clone(), solution)
}

/// Pads the public values the same way; the target is unchanged.
pub fn pad_statement(statement: &PublicStatement) -> PublicStatement {
    let n = statement.values.len();
    PublicStatement {
        values: statement
            .values
            .iter()
            .cloned()
            .chain(std::iter::repeat_with(BigUint::zero).take(n))
            .collect(),
        modulus: statement.modulus.clone(),
        target: statement.target.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_pad_small_instance() {
        let instance = SubsetSumInstance::new(
            [5u32, 9, 2, 7].iter().map(|&v| BigUint::from(v)).collect(),
            BigUint::from(101u32),
            vec![0, 0, 1, 0],
        )
        .unwrap();
        let padded = pad_instance(&instance).unwrap();

        assert_eq!(padded.len(), 8);
        assert_eq!(padded.cardinality(), 4);
        assert_eq!(padded.solution(), &[0, 0, 1, 0, 1, 1, 1, 0]);
        assert_eq!(&padded.values()[..4], instance.values());
        assert!(padded.values()[4..].iter().all(|v| v.is_zero()));
        assert_eq!(padded.target(), &BigUint::from(2u32));
        assert_eq!(pad_statement(&instance.statement()), padded.statement());
    }

    #[test]
    fn test_pad_full_and_empty_selection() {
        let modulus = BigUint::from(13u32);
        let values: Vec<BigUint> = (1u32..=3).map(BigUint::from).collect();

        let full = SubsetSumInstance::new(values.clone(), modulus.clone(), vec![1, 1, 1]).unwrap();
        let padded = pad_instance(&full).unwrap();
        assert_eq!(padded.solution(), &[1, 1, 1, 0, 0, 0]);

        let empty = SubsetSumInstance::new(values, modulus, vec![0, 0, 0]).unwrap();
        let padded = pad_instance(&empty).unwrap();
        assert_eq!(padded.solution(), &[0, 0, 0, 1, 1, 1]);
        assert!(padded.target().is_zero());
    }

    proptest! {
        #[test]
        fn prop_padding_hides_cardinality(seed in any::<u64>(), n in 1usize..40, k_frac in 0.0f64..=1.0) {
            let k = ((n as f64) * k_frac).floor() as usize;
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            let modulus = BigUint::from(1009u32);
            let instance = SubsetSumInstance::generate(&modulus, n, k, &mut rng).unwrap();
            let padded = pad_instance(&instance).unwrap();

            prop_assert_eq!(padded.len(), 2 * n);
            prop_assert_eq!(padded.cardinality(), n);
            prop_assert_eq!(padded.target(), instance.target());
            prop_assert!(padded.verify_solution());
        }
    }
}
