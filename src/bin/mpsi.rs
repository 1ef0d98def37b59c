use anyhow::Result;
use clap::Parser;
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::SeedableRng;
use threshold_mpsi_with_paillier::cli_utils::{MpsiArgs, ProtocolKind};
use threshold_mpsi_with_paillier::protocol::{
    AdditiveMpsi, IntegratedMpsi, PolynomialMpsi, RunReport,
};
use threshold_mpsi_with_paillier::set_utils::create_sets_with_check;

fn main() -> Result<()> {
    let args = MpsiArgs::parse();

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    println!(
        "{} parties, {} elements each, {} planted common, {}-bit primes",
        args.num_parties, args.set_size, args.common_size, args.prime_bits
    );
    let (common, sets) = create_sets_with_check(
        args.num_parties,
        args.set_size,
        args.common_size,
        args.element_len,
        &mut rng,
    )?;
    if args.verbose {
        for (i, set) in sets.iter().enumerate() {
            println!("sets[{}] = {:?}", i, set);
        }
    }
    println!(
        "expected intersection ({} elements): {:?}",
        common.len(),
        common.iter().sorted().collect_vec()
    );

    match args.protocol {
        ProtocolKind::Additive => run_additive(&args, &sets, &mut rng)?,
        ProtocolKind::Integrated => run_integrated(&args, &sets, &mut rng)?,
        ProtocolKind::Polynomial => run_polynomial(&args, &sets, &mut rng)?,
        ProtocolKind::All => {
            run_additive(&args, &sets, &mut rng)?;
            run_integrated(&args, &sets, &mut rng)?;
            run_polynomial(&args, &sets, &mut rng)?;
        }
    }

    Ok(())
}

fn run_additive(args: &MpsiArgs, sets: &[Vec<String>], rng: &mut StdRng) -> Result<()> {
    println!("\n== additive bloom-filter protocol ==");
    let protocol = AdditiveMpsi::with_derived_params(
        args.prime_bits,
        args.set_size,
        args.fp_exponent,
        args.random_bits,
    )?;
    println!(
        "bloom filter: {} bits, {} hash functions",
        protocol.bloom_size, protocol.bloom_hashes
    );

    let report = protocol.run(sets, rng)?;
    print_report(&report);
    Ok(())
}

fn run_integrated(args: &MpsiArgs, sets: &[Vec<String>], rng: &mut StdRng) -> Result<()> {
    println!("\n== integrated bloom-filter protocol ==");
    let protocol =
        IntegratedMpsi::with_derived_params(args.prime_bits, args.set_size, args.fp_exponent)?;
    println!(
        "bloom filter: {} bits, {} hash functions",
        protocol.bloom_size, protocol.bloom_hashes
    );

    let report = protocol.run(sets, rng)?;
    print_report(&report);
    Ok(())
}

fn run_polynomial(args: &MpsiArgs, sets: &[Vec<String>], rng: &mut StdRng) -> Result<()> {
    println!("\n== polynomial protocol ==");
    let protocol = PolynomialMpsi {
        prime_bits: args.prime_bits,
        mask_bits: args.random_bits,
    };

    let report = protocol.run(sets, rng)?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    if report.intersections.len() == 1 {
        let view = report.intersection();
        println!(
            "intersection ({} elements): {:?}",
            view.len(),
            view.iter().sorted().collect_vec()
        );
    } else {
        for (i, view) in report.intersections.iter().enumerate() {
            println!(
                "party {} view ({} elements): {:?}",
                i,
                view.len(),
                view.iter().sorted().collect_vec()
            );
        }
    }

    let stats = &report.stats;
    for role in 0..stats.transfers.num_roles() {
        println!(
            "role {}: setup {:?}, online {:?}, sent {} B, received {} B",
            role,
            stats.timings.setup(role),
            stats.timings.online(role),
            stats.transfers.total_sent(role),
            stats.transfers.total_received(role)
        );
    }
}
