use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use num_bigint::BigUint;
use pedersen_subset_sum::{
    generate_instance, prove_and_verify, setup, ChallengeMode, InstanceConfig, ParamsConfig, ProofReport,
    ProtocolConfig, RandomnessReduction, Variant,
};
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum VariantArg {
    Fixed,
    Variable,
    Both,
}

#[derive(Parser, Debug)]
#[command(
    name = "pss-prove",
    version,
    about = "Prove and verify knowledge of a modular subset-sum solution",
    long_about = None
)]
struct Cli {
    /// Bit length of the commitment modulus p
    #[arg(short = 'b', long = "bits", default_value_t = 2048)]
    bits: u64,
    /// Number of values in the instance
    #[arg(short = 'n', long = "n", default_value_t = 256)]
    n: usize,
    /// Number of selected values
    #[arg(short = 'k', long = "k", default_value_t = 16)]
    k: usize,
    /// Subset-sum modulus M in decimal (default: p - 1)
    #[arg(short = 'm', long = "modulus")]
    modulus: Option<BigUint>,
    /// Number of rounds
    #[arg(short = 'r', long = "rounds", default_value_t = 40)]
    rounds: usize,
    #[arg(long = "variant", value_enum, default_value_t = VariantArg::Both)]
    variant: VariantArg,
    /// Derive challenges from a transcript instead of verifier coins
    #[arg(long = "fiat-shamir", default_value_t = false)]
    fiat_shamir: bool,
    /// Run rounds on the thread pool
    #[arg(long = "parallel", default_value_t = false)]
    parallel: bool,
    /// Reduce the summed opening randomness mod M instead of p - 1 (M must be a multiple of p - 1)
    #[arg(long = "reduce-mod-m", default_value_t = false)]
    reduce_mod_m: bool,
    /// Accept a plain prime modulus instead of a safe prime
    #[arg(long = "no-safe-prime", default_value_t = false)]
    no_safe_prime: bool,
    /// Directory holding PED_<bits>.dat
    #[arg(long = "param-dir", default_value = ".")]
    param_dir: PathBuf,
    /// Neither read nor write the parameter file
    #[arg(long = "no-persist", default_value_t = false)]
    no_persist: bool,
    /// Seed the RNG for a reproducible run
    #[arg(long = "seed")]
    seed: Option<u64>,
    /// Log per-round progress
    #[arg(short = 'v', long = "verbose", default_value_t = false)]
    verbose: bool,
}

fn print_report(report: &ProofReport) {
    let mut commit = Duration::ZERO;
    let mut open = Duration::ZERO;
    let mut last = Duration::ZERO;
    let mut busy = Duration::ZERO;
    for record in &report.rounds {
        commit += record.timings.commit;
        open += record.timings.open_and_check;
        last += record.timings.final_check;
        busy += record.timings.total();
    }

    println!("variant:        {}", report.variant.label());
    println!("rounds:         {}/{}", report.rounds.len(), report.rounds_requested);
    println!("commit:         {:?}", commit);
    println!("open + check:   {:?}", open);
    println!("final check:    {:?}", last);
    println!("round work:     {:?}", busy);
    println!("wall clock:     {:?}", report.elapsed);
    if report.accepted() {
        println!("soundness err:  2^-{}", report.rounds.len());
    }
    println!("verdict:        {}", report.verdict);
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter::Targets::new().with_target("pedersen_subset_sum", level).with_target("pss_prove", level))
        .init();

    let mut rng = match cli.seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_entropy(),
    };

    let params_config = ParamsConfig {
        bits: cli.bits,
        safe_prime: !cli.no_safe_prime,
        directory: if cli.no_persist { None } else { Some(cli.param_dir.clone()) },
    };
    let params = setup(&params_config, &mut rng).context("setting up commitment parameters")?;

    let instance_config = InstanceConfig {
        n: cli.n,
        k: cli.k,
        modulus: cli.modulus.clone(),
    };
    let instance = generate_instance(&params, &instance_config, &mut rng).context("generating instance")?;

    let variants: &[Variant] = match cli.variant {
        VariantArg::Fixed => &[Variant::Fixed],
        VariantArg::Variable => &[Variant::Variable],
        VariantArg::Both => &[Variant::Fixed, Variant::Variable],
    };

    let base = ProtocolConfig {
        rounds: cli.rounds,
        randomness_reduction: if cli.reduce_mod_m {
            RandomnessReduction::SubsetSumModulus
        } else {
            RandomnessReduction::GroupOrder
        },
        challenge_mode: if cli.fiat_shamir {
            ChallengeMode::FiatShamir
        } else {
            ChallengeMode::Interactive
        },
        parallel_rounds: cli.parallel,
        ..ProtocolConfig::default()
    };

    let mut rejected = Vec::new();
    for &variant in variants {
        let config = base.clone().with_variant(variant);
        let report = prove_and_verify(&params, &instance, &config, &mut rng)
            .with_context(|| format!("running the {} variant", variant.label()))?;
        print_report(&report);
        println!();
        if !report.accepted() {
            rejected.push(variant.label());
        }
    }

    if !rejected.is_empty() {
        bail!("proof rejected for: {}", rejected.join(", "));
    }
    Ok(())
}
