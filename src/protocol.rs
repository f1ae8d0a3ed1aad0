//! Orchestration of proof rounds.
//!
//! One round runs
//! `Init -> Committed -> Challenged -> Opened -> Checked -> SumOpened -> Accepted | Rejected`.
//! Rounds are independent: each draws its own permutations, randomness and
//! challenge from per-round generators seeded off the caller's RNG, so
//! sequential and parallel runs of the same seed make identical decisions.
//! The first rejected round (in round order) decides the run.

use std::fmt;
use std::time::{Duration, Instant};

use rand::{CryptoRng, RngCore};
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{ChallengeMode, ProtocolConfig, Variant};
use crate::error::{Result, SubsetSumError};
use crate::instance::SubsetSumInstance;
use crate::messages::{Challenge, CommitMessage};
use crate::pedersen::PedersenParams;
use crate::prover::{CommittedRound, Prover};
use crate::transcript::FiatShamirTranscript;
use crate::verifier::Verifier;

/// Phases of a single round. `Accepted` and `Rejected` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoundPhase {
    Init,
    Committed,
    Challenged,
    Opened,
    Checked,
    SumOpened,
    Accepted,
    Rejected,
}

impl RoundPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RoundPhase::Accepted | RoundPhase::Rejected)
    }
}

/// Which check rejected a round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// An opened commitment did not unveil to its claimed value
    Binding { index: usize },
    /// The opened branch is not a permutation of the public values
    Permutation { index: Option<usize> },
    /// The aggregate of the closed branch did not unveil to the target
    FinalAggregate,
    /// The challenge was not a bit
    Challenge,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Binding { index } => write!(f, "binding check failed at commitment {}", index),
            RejectReason::Permutation { index: Some(index) } => {
                write!(f, "permutation check failed at position {}", index)
            }
            RejectReason::Permutation { index: None } => write!(f, "permutation check failed (shape)"),
            RejectReason::FinalAggregate => write!(f, "final aggregate check failed"),
            RejectReason::Challenge => write!(f, "invalid challenge"),
        }
    }
}

impl RejectReason {
    /// Classifies a verification error. Errors that are not a verdict on the
    /// prover (arithmetic, configuration, IO) are handed back unchanged.
    fn classify(err: SubsetSumError) -> std::result::Result<Self, SubsetSumError> {
        match err {
            SubsetSumError::BindingViolation { index } => Ok(RejectReason::Binding { index }),
            SubsetSumError::PermutationMismatch { index } => Ok(RejectReason::Permutation { index: Some(index) }),
            SubsetSumError::LengthMismatch { .. } => Ok(RejectReason::Permutation { index: None }),
            SubsetSumError::FinalCheckFailed => Ok(RejectReason::FinalAggregate),
            SubsetSumError::InvalidChallenge(_) => Ok(RejectReason::Challenge),
            other => Err(other),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoundOutcome {
    Accepted,
    Rejected(RejectReason),
}

/// Wall-clock time spent per phase of a round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhaseTimings {
    pub commit: Duration,
    pub open_and_check: Duration,
    pub final_check: Duration,
}

impl PhaseTimings {
    pub fn total(&self) -> Duration {
        self.commit + self.open_and_check + self.final_check
    }
}

/// What happened in one round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundRecord {
    pub round: u64,
    pub challenge: Option<Challenge>,
    /// Last phase reached; terminal once the round is decided
    pub phase: RoundPhase,
    pub outcome: RoundOutcome,
    /// Number of selected positions the verifier saw in the final opening
    pub observed_cardinality: Option<usize>,
    pub timings: PhaseTimings,
}

impl RoundRecord {
    pub fn accepted(&self) -> bool {
        self.outcome == RoundOutcome::Accepted
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject { round: u64, reason: RejectReason },
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Accept => write!(f, "ACCEPT"),
            Verdict::Reject { round, reason } => write!(f, "REJECT (round {}: {})", round, reason),
        }
    }
}

/// Result of a whole run. Rounds after the first rejection are not reported.
#[derive(Clone, Debug)]
pub struct ProofReport {
    pub variant: Variant,
    pub rounds_requested: usize,
    pub rounds: Vec<RoundRecord>,
    pub verdict: Verdict,
    pub elapsed: Duration,
}

impl ProofReport {
    pub fn accepted(&self) -> bool {
        self.verdict == Verdict::Accept
    }

    /// Upper bound on the probability that a cheating prover got this far.
    pub fn soundness_error(&self) -> f64 {
        0.5f64.powi(self.rounds.len() as i32)
    }
}

/// A round whose commitments are out and whose challenge is not yet known.
struct PendingRound<'p> {
    round: u64,
    state: CommittedRound<'p>,
    message: CommitMessage,
    coins: ChaCha20Rng,
    commit_time: Duration,
}

/// Drives a prover and a verifier through the configured number of rounds.
///
/// The session owns neither party. It seeds one prover RNG and one verifier
/// RNG per round from the caller's generator, then runs the rounds in one of
/// three ways:
///
/// - interactive and sequential: commit, challenge and check round by round,
///   stopping at the first rejection;
/// - interactive and parallel: every round on the rayon pool, each with its
///   own coins, so the decisions match the sequential run;
/// - Fiat-Shamir: all rounds commit first, then one transcript over every
///   commitment yields all challenge bits.
///
/// Verification failures become a rejecting [`Verdict`]. Anything else
/// (bad parameters, a broken RNG) is returned as an error.
pub struct ProofSession<'a> {
    prover: &'a Prover,
    verifier: &'a Verifier,
    config: &'a ProtocolConfig,
}

impl<'a> ProofSession<'a> {
    pub fn new(prover: &'a Prover, verifier: &'a Verifier, config: &'a ProtocolConfig) -> Result<Self> {
        config.validate()?;
        if prover.variant() != config.variant {
            return Err(SubsetSumError::InvalidParameters(format!(
                "Prover runs the {} variant but the session is configured for {}",
                prover.variant().label(),
                config.variant.label()
            )));
        }
        if prover.params() != verifier.params() {
            return Err(SubsetSumError::InvalidParameters(
                "Prover and verifier use different commitment parameters".to_string(),
            ));
        }
        Ok(Self {
            prover,
            verifier,
            config,
        })
    }

    /// Runs all rounds and reports the verdict.
    ///
    /// `Err` is reserved for failures that say nothing about the prover's
    /// honesty; a cheating prover yields `Ok` with a rejecting verdict.
    pub fn run<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<ProofReport> {
        let started = Instant::now();
        info!(
            variant = self.config.variant.label(),
            rounds = self.config.rounds,
            mode = ?self.config.challenge_mode,
            parallel = self.config.parallel_rounds,
            "Starting proof"
        );

        // Two independent seeds per round: prover randomness and verifier coins
        let mut seeds = Vec::with_capacity(self.config.rounds);
        for _ in 0..self.config.rounds {
            let mut prover_seed = [0u8; 32];
            let mut verifier_seed = [0u8; 32];
            rng.try_fill_bytes(&mut prover_seed)?;
            rng.try_fill_bytes(&mut verifier_seed)?;
            seeds.push((prover_seed, verifier_seed));
        }

        let records = match self.config.challenge_mode {
            ChallengeMode::Interactive if !self.config.parallel_rounds => self.run_sequential(&seeds)?,
            _ => self.run_batched(&seeds)?,
        };

        let verdict = records
            .iter()
            .find_map(|r| match &r.outcome {
                RoundOutcome::Rejected(reason) => Some(Verdict::Reject {
                    round: r.round,
                    reason: reason.clone(),
                }),
                RoundOutcome::Accepted => None,
            })
            .unwrap_or(Verdict::Accept);

        let rounds = match &verdict {
            Verdict::Reject { round, .. } => records.into_iter().take(*round as usize + 1).collect(),
            Verdict::Accept => records,
        };

        let report = ProofReport {
            variant: self.config.variant,
            rounds_requested: self.config.rounds,
            rounds,
            verdict,
            elapsed: started.elapsed(),
        };
        info!(verdict = %report.verdict, elapsed_ms = report.elapsed.as_millis() as u64, "Proof finished");
        Ok(report)
    }

    /// Strictly alternating exchange, stopping at the first rejection.
    fn run_sequential(&self, seeds: &[([u8; 32], [u8; 32])]) -> Result<Vec<RoundRecord>> {
        let mut records = Vec::with_capacity(seeds.len());
        for (round, (prover_seed, verifier_seed)) in seeds.iter().enumerate() {
            let mut pending = self.commit_round(round as u64, *prover_seed, *verifier_seed)?;
            let challenge = match self.verifier.challenge(&pending.message, &mut pending.coins) {
                Ok(challenge) => challenge,
                Err(err) => {
                    records.push(rejected_early(&pending, RejectReason::classify(err)?));
                    break;
                }
            };
            let record = self.respond(pending, challenge)?;
            let rejected = !record.accepted();
            records.push(record);
            if rejected {
                break;
            }
        }
        Ok(records)
    }

    /// Commits every round first, then derives challenges and checks rounds.
    ///
    /// Used for Fiat-Shamir, where all commitments must be fixed before any
    /// bit is derived, and for parallel interactive runs.
    fn run_batched(&self, seeds: &[([u8; 32], [u8; 32])]) -> Result<Vec<RoundRecord>> {
        let commit_one = |(round, (prover_seed, verifier_seed)): (usize, &([u8; 32], [u8; 32]))| {
            self.commit_round(round as u64, *prover_seed, *verifier_seed)
        };
        let mut pending: Vec<PendingRound<'_>> = if self.config.parallel_rounds {
            seeds.par_iter().enumerate().map(commit_one).collect::<Result<_>>()?
        } else {
            seeds.iter().enumerate().map(commit_one).collect::<Result<_>>()?
        };

        let challenges: Vec<Result<Challenge>> = match self.config.challenge_mode {
            ChallengeMode::FiatShamir => {
                let mut transcript =
                    FiatShamirTranscript::new(self.verifier.params(), self.verifier.statement(), self.config.variant);
                let mut shape_errors = Vec::with_capacity(pending.len());
                for p in &pending {
                    shape_errors.push(p.message.check_len(self.verifier.statement().values.len()));
                    transcript.absorb_commitments(p.round, &p.message);
                }
                transcript
                    .challenges(pending.len())
                    .into_iter()
                    .zip(shape_errors)
                    .map(|(challenge, shape)| shape.map(|_| challenge))
                    .collect()
            }
            ChallengeMode::Interactive => pending
                .iter_mut()
                .map(|p| self.verifier.challenge(&p.message, &mut p.coins))
                .collect(),
        };

        let respond_one = |(p, challenge): (PendingRound<'_>, Result<Challenge>)| -> Result<RoundRecord> {
            match challenge {
                Ok(challenge) => self.respond(p, challenge),
                Err(err) => Ok(rejected_early(&p, RejectReason::classify(err)?)),
            }
        };
        let work: Vec<_> = pending.drain(..).zip(challenges).collect();
        if self.config.parallel_rounds {
            work.into_par_iter().map(respond_one).collect()
        } else {
            work.into_iter().map(respond_one).collect()
        }
    }

    fn commit_round(&self, round: u64, prover_seed: [u8; 32], verifier_seed: [u8; 32]) -> Result<PendingRound<'a>> {
        let started = Instant::now();
        let mut prover_rng = ChaCha20Rng::from_seed(prover_seed);
        let (state, message) = self.prover.commit(&mut prover_rng)?;
        debug!(round, "Round committed");
        Ok(PendingRound {
            round,
            state,
            message,
            coins: ChaCha20Rng::from_seed(verifier_seed),
            commit_time: started.elapsed(),
        })
    }

    /// Open, check, final-open and final-check one round whose challenge is known.
    fn respond(&self, pending: PendingRound<'_>, challenge: Challenge) -> Result<RoundRecord> {
        let PendingRound {
            round,
            state,
            message,
            commit_time,
            ..
        } = pending;
        let mut record = RoundRecord {
            round,
            challenge: Some(challenge),
            phase: RoundPhase::Challenged,
            outcome: RoundOutcome::Accepted,
            observed_cardinality: None,
            timings: PhaseTimings {
                commit: commit_time,
                ..Default::default()
            },
        };

        let started = Instant::now();
        let (opened, opening) = state.open(challenge);
        record.phase = RoundPhase::Opened;
        let checked = self.verifier.check_opening(&message, challenge, &opening);
        record.timings.open_and_check = started.elapsed();
        if let Err(err) = checked {
            return reject(record, err);
        }
        record.phase = RoundPhase::Checked;

        let started = Instant::now();
        let final_opening = opened.final_open()?;
        record.phase = RoundPhase::SumOpened;
        record.observed_cardinality = Some(final_opening.observed_cardinality());
        let result = self
            .verifier
            .aggregate(&message, challenge, &final_opening)
            .and_then(|aggregate| self.verifier.final_check(&aggregate, &final_opening));
        record.timings.final_check = started.elapsed();
        if let Err(err) = result {
            return reject(record, err);
        }

        record.phase = RoundPhase::Accepted;
        debug!(round, branch = challenge.bit(), "Round accepted");
        Ok(record)
    }
}

fn reject(mut record: RoundRecord, err: SubsetSumError) -> Result<RoundRecord> {
    let reason = RejectReason::classify(err)?;
    warn!(round = record.round, phase = ?record.phase, %reason, "Round rejected");
    record.phase = RoundPhase::Rejected;
    record.outcome = RoundOutcome::Rejected(reason);
    Ok(record)
}

fn rejected_early(pending: &PendingRound<'_>, reason: RejectReason) -> RoundRecord {
    warn!(round = pending.round, %reason, "Round rejected before opening");
    RoundRecord {
        round: pending.round,
        challenge: None,
        phase: RoundPhase::Rejected,
        outcome: RoundOutcome::Rejected(reason),
        observed_cardinality: None,
        timings: PhaseTimings {
            commit: pending.commit_time,
            ..Default::default()
        },
    }
}

/// Builds an honest prover and verifier for `instance` and runs the protocol.
pub fn prove_and_verify<R: RngCore + CryptoRng>(
    params: &PedersenParams,
    instance: &SubsetSumInstance,
    config: &ProtocolConfig,
    rng: &mut R,
) -> Result<ProofReport> {
    if !instance.verify_solution() {
        return Err(SubsetSumError::DegenerateInstance(
            "Witness does not sum to the target".to_string(),
        ));
    }
    let prover = Prover::new(params.clone(), instance, config.variant, config.randomness_reduction)?;
    let verifier = Verifier::new(params.clone(), &instance.statement(), config.variant)?;
    ProofSession::new(&prover, &verifier, config)?.run(rng)
}
