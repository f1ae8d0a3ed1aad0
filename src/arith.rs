//! Big-integer helpers on top of `num-bigint`.
//!
//! Covers the pieces of arithmetic the protocol needs that `BigUint` does not
//! ship with: uniform sampling in a range, Miller-Rabin primality, prime and
//! safe-prime generation, and fixed-layout byte codecs.

use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};

use crate::error::{Result, SubsetSumError};

/// Number of random Miller-Rabin witnesses on top of the fixed small bases.
const MILLER_RABIN_ROUNDS: usize = 32;

/// Small primes used both as trial divisors and as deterministic witnesses.
const SMALL_PRIMES: [u32; 54] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191,
    193, 197, 199, 211, 223, 227, 229, 233, 239, 241, 251,
];

/// Give up after this many candidates; reaching it means the RNG is broken.
const MAX_PRIME_CANDIDATES: usize = 1_000_000;

/// Samples uniformly from `[0, bound)`.
pub fn sample_below<R: RngCore + CryptoRng>(bound: &BigUint, rng: &mut R) -> Result<BigUint> {
    if bound.is_zero() {
        return Err(SubsetSumError::ArithmeticFailure(
            "Cannot sample below zero".to_string(),
        ));
    }
    Ok(rng.gen_biguint_below(bound))
}

/// Samples uniformly from `[low, high)`.
pub fn sample_range<R: RngCore + CryptoRng>(
    low: &BigUint,
    high: &BigUint,
    rng: &mut R,
) -> Result<BigUint> {
    if low >= high {
        return Err(SubsetSumError::ArithmeticFailure(format!(
            "Empty sampling range [{}, {})",
            low, high
        )));
    }
    Ok(rng.gen_biguint_range(low, high))
}

/// Tests if `n` is probably prime.
///
/// Trial division by the small primes first, then Miller-Rabin with the small
/// primes as fixed witnesses followed by `MILLER_RABIN_ROUNDS` random ones.
pub fn is_probable_prime<R: RngCore + CryptoRng>(n: &BigUint, rng: &mut R) -> bool {
    let two = BigUint::from(2u32);
    if n < &two {
        return false;
    }

    for &p in SMALL_PRIMES.iter() {
        let p = BigUint::from(p);
        if n == &p {
            return true;
        }
        if (n % &p).is_zero() {
            return false;
        }
    }

    // Write n-1 as d * 2^r where d is odd
    let n_minus_one = n - 1u32;
    let r = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> r;

    let witness_fails = |a: &BigUint| -> bool {
        let mut x = a.modpow(&d, n);
        if x.is_one() || x == n_minus_one {
            return false;
        }
        for _ in 1..r {
            x = (&x * &x) % n;
            if x == n_minus_one {
                return false;
            }
        }
        true
    };

    for &a in SMALL_PRIMES.iter().take(12) {
        if witness_fails(&BigUint::from(a)) {
            return false;
        }
    }

    // n > 251 here, so [2, n-1) is never empty
    for _ in 0..MILLER_RABIN_ROUNDS {
        let a = rng.gen_biguint_range(&two, &n_minus_one);
        if witness_fails(&a) {
            return false;
        }
    }

    true
}

fn random_odd_with_bits<R: RngCore + CryptoRng>(bits: u64, rng: &mut R) -> BigUint {
    let mut candidate = rng.gen_biguint(bits);
    candidate.set_bit(bits - 1, true);
    candidate.set_bit(0, true);
    candidate
}

/// Generates a prime of exactly `bits` bits.
///
/// With `safe` set the result is a safe prime `p = 2q + 1` with `q` prime, so
/// `p - 1` has only the factors 2 and `q`.
pub fn generate_prime<R: RngCore + CryptoRng>(bits: u64, safe: bool, rng: &mut R) -> Result<BigUint> {
    let min_bits = if safe { 4 } else { 3 };
    if bits < min_bits {
        return Err(SubsetSumError::InvalidParameters(format!(
            "Prime bit length {} too small (minimum {})",
            bits, min_bits
        )));
    }

    for _ in 0..MAX_PRIME_CANDIDATES {
        if safe {
            let q = random_odd_with_bits(bits - 1, rng);
            let p = (&q << 1u32) + 1u32;
            // The cheap p-sieve rejects most candidates before the expensive q test
            if has_small_factor(&p) || has_small_factor(&q) {
                continue;
            }
            if is_probable_prime(&q, rng) && is_probable_prime(&p, rng) {
                return Ok(p);
            }
        } else {
            let p = random_odd_with_bits(bits, rng);
            if is_probable_prime(&p, rng) {
                return Ok(p);
            }
        }
    }

    Err(SubsetSumError::ArithmeticFailure(format!(
        "No {}-bit prime found after {} candidates",
        bits, MAX_PRIME_CANDIDATES
    )))
}

fn has_small_factor(n: &BigUint) -> bool {
    SMALL_PRIMES.iter().any(|&p| {
        let p = BigUint::from(p);
        n != &p && (n % &p).is_zero()
    })
}

/// Big-endian magnitude bytes; zero encodes as an empty buffer.
pub fn to_be_bytes(n: &BigUint) -> Vec<u8> {
    if n.is_zero() {
        Vec::new()
    } else {
        n.to_bytes_be()
    }
}

/// Inverse of [`to_be_bytes`].
pub fn from_be_bytes(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// Length-prefixed encoding used when feeding values into transcripts and hashes.
pub fn append_len_prefixed(out: &mut Vec<u8>, n: &BigUint) {
    let bytes = to_be_bytes(n);
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(&bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_small_primes() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let primes = [2u32, 3, 5, 7, 97, 101, 257, 7919, 104_729];
        for p in primes {
            assert!(is_probable_prime(&BigUint::from(p), &mut rng), "{} is prime", p);
        }
        let composites = [0u32, 1, 4, 9, 91, 561, 1105, 7917, 104_730];
        for c in composites {
            assert!(!is_probable_prime(&BigUint::from(c), &mut rng), "{} is composite", c);
        }
    }

    #[test]
    fn test_large_known_prime() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        // 2^127 - 1
        let m127 = (BigUint::one() << 127u32) - 1u32;
        assert!(is_probable_prime(&m127, &mut rng));
        assert!(!is_probable_prime(&(&m127 + 2u32), &mut rng));
    }

    #[test]
    fn test_generate_prime_bit_length() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let p = generate_prime(64, false, &mut rng).unwrap();
        assert_eq!(p.bits(), 64);
        assert!(is_probable_prime(&p, &mut rng));
    }

    #[test]
    fn test_generate_safe_prime() {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let p = generate_prime(64, true, &mut rng).unwrap();
        assert_eq!(p.bits(), 64);
        let q = (&p - 1u32) >> 1u32;
        assert!(is_probable_prime(&q, &mut rng));
    }

    #[test]
    fn test_generate_prime_rejects_tiny_bits() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        assert!(generate_prime(2, false, &mut rng).is_err());
        assert!(generate_prime(3, true, &mut rng).is_err());
    }

    #[test]
    fn test_sampling_bounds() {
        let mut rng = ChaCha20Rng::seed_from_u64(6);
        let bound = BigUint::from(10u32);
        for _ in 0..200 {
            assert!(sample_below(&bound, &mut rng).unwrap() < bound);
        }
        assert!(sample_below(&BigUint::zero(), &mut rng).is_err());

        let low = BigUint::from(5u32);
        for _ in 0..200 {
            let x = sample_range(&low, &bound, &mut rng).unwrap();
            assert!(x >= low && x < bound);
        }
        assert!(sample_range(&bound, &low, &mut rng).is_err());
    }

    #[test]
    fn test_byte_codec() {
        let n = BigUint::from(0x0102_0304u32);
        assert_eq!(to_be_bytes(&n), vec![1, 2, 3, 4]);
        assert_eq!(from_be_bytes(&[1, 2, 3, 4]), n);
        assert!(to_be_bytes(&BigUint::zero()).is_empty());
        assert!(from_be_bytes(&[]).is_zero());
    }
}
