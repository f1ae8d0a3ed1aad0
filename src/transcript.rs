//! Where challenge bits come from.
//!
//! Interactive runs draw the bit from the verifier's own coins. Fiat-Shamir
//! runs derive every round's bit from a single merlin transcript that has
//! absorbed the parameters, the statement and the commitments of all
//! rounds.

use merlin::Transcript;
use rand::{CryptoRng, Rng, RngCore};

use crate::arith::append_len_prefixed;
use crate::config::Variant;
use crate::instance::PublicStatement;
use crate::messages::{Challenge, CommitMessage};
use crate::pedersen::PedersenParams;

const DOMAIN_SEPARATOR: &[u8] = b"pedersen-subset-sum-v1";

/// A fair coin from the verifier's RNG.
pub fn interactive_challenge<R: RngCore + CryptoRng>(rng: &mut R) -> Challenge {
    if rng.gen::<bool>() {
        Challenge::ONE
    } else {
        Challenge::ZERO
    }
}

/// Non-interactive challenge derivation over a whole run.
pub struct FiatShamirTranscript {
    transcript: Transcript,
}

impl FiatShamirTranscript {
    pub fn new(params: &PedersenParams, statement: &PublicStatement, variant: Variant) -> Self {
        let mut transcript = Transcript::new(DOMAIN_SEPARATOR);
        transcript.append_message(b"params", &params.fingerprint());
        transcript.append_message(b"variant", variant.label().as_bytes());

        let mut buf = Vec::new();
        append_len_prefixed(&mut buf, &statement.modulus);
        append_len_prefixed(&mut buf, &statement.target);
        transcript.append_message(b"modulus-target", &buf);

        transcript.append_u64(b"len", statement.values.len() as u64);
        for value in &statement.values {
            buf.clear();
            append_len_prefixed(&mut buf, value);
            transcript.append_message(b"value", &buf);
        }

        Self { transcript }
    }

    /// Absorbs one round's commitments. Rounds must be absorbed in order.
    pub fn absorb_commitments(&mut self, round: u64, message: &CommitMessage) {
        self.transcript.append_u64(b"round", round);
        let mut buf = Vec::new();
        for (branch, commitments) in message.branches.iter().enumerate() {
            self.transcript.append_u64(b"branch", branch as u64);
            for c in commitments {
                buf.clear();
                append_len_prefixed(&mut buf, &c.value);
                self.transcript.append_message(b"commitment", &buf);
            }
        }
    }

    /// Squeezes `count` challenge bits, one per absorbed round.
    pub fn challenges(mut self, count: usize) -> Vec<Challenge> {
        let mut bytes = vec![0u8; (count + 7) / 8];
        self.transcript.challenge_bytes(b"challenge-bits", &mut bytes);
        (0..count)
            .map(|i| {
                if (bytes[i / 8] >> (i % 8)) & 1 == 1 {
                    Challenge::ONE
                } else {
                    Challenge::ZERO
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pedersen::Commitment;
    use num_bigint::BigUint;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn fixture() -> (PedersenParams, PublicStatement) {
        let params = PedersenParams {
            p: BigUint::from(1_000_003u32),
            g: BigUint::from(2u32),
            h: BigUint::from(5u32),
        };
        let statement = PublicStatement {
            values: (1u32..=4).map(BigUint::from).collect(),
            modulus: BigUint::from(101u32),
            target: BigUint::from(3u32),
        };
        (params, statement)
    }

    fn commit_message(seed: u32) -> CommitMessage {
        let c = |v: u32| Commitment { value: BigUint::from(v) };
        CommitMessage {
            branches: [vec![c(seed), c(seed + 1)], vec![c(seed + 2), c(seed + 3)]],
        }
    }

    fn derive(messages: &[CommitMessage]) -> Vec<Challenge> {
        let (params, statement) = fixture();
        let mut transcript = FiatShamirTranscript::new(&params, &statement, Variant::Fixed);
        for (round, msg) in messages.iter().enumerate() {
            transcript.absorb_commitments(round as u64, msg);
        }
        transcript.challenges(messages.len())
    }

    #[test]
    fn test_fiat_shamir_is_deterministic() {
        let messages: Vec<_> = (0..16).map(|i| commit_message(i * 10)).collect();
        assert_eq!(derive(&messages), derive(&messages));
        assert_eq!(derive(&messages).len(), 16);
    }

    #[test]
    fn test_fiat_shamir_depends_on_commitments() {
        // 64 bits agreeing by chance is negligible
        let a: Vec<_> = (0..64).map(|i| commit_message(i * 10)).collect();
        let mut b = a.clone();
        b[63] = commit_message(9999);
        assert_ne!(derive(&a), derive(&b));
    }

    #[test]
    fn test_interactive_challenge_uses_both_branches() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let ones = (0..1000)
            .filter(|_| interactive_challenge(&mut rng) == Challenge::ONE)
            .count();
        assert!((400..600).contains(&ones));
    }
}
