//! CLI (CommandLine Interface) utilities for the threshold MPSI driver.
//!
//! Here, you can know the options for the protocols through enum types and
//! structs. See [protocol](crate::protocol) for what the options actually
//! control.

use clap::{Parser, ValueEnum};
use std::fmt::Display;

/// Which protocol engine to run. More details: [protocol](crate::protocol).
#[derive(Clone, Copy, ValueEnum, Debug, PartialEq, Eq)]
pub enum ProtocolKind {
    /// Additive bloom-filter protocol. See [AdditiveMpsi](crate::protocol::AdditiveMpsi).
    Additive,
    /// Integrated bloom-filter protocol. See [IntegratedMpsi](crate::protocol::IntegratedMpsi).
    Integrated,
    /// Encrypted root-polynomial protocol. See [PolynomialMpsi](crate::protocol::PolynomialMpsi).
    Polynomial,
    /// Run all three engines on the same datasets.
    All,
}

impl Display for ProtocolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolKind::Additive => write!(f, "additive"),
            ProtocolKind::Integrated => write!(f, "integrated"),
            ProtocolKind::Polynomial => write!(f, "polynomial"),
            ProtocolKind::All => write!(f, "all"),
        }
    }
}

/// Arguments for the threshold MPSI driver.
/// This struct implements [clap::Parser] to make that this binary has CommandLine Arguments.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, next_line_help = true)]
pub struct MpsiArgs {
    /// Protocol engine to run.
    #[arg(short = 'P', long, default_value_t = ProtocolKind::All)]
    pub protocol: ProtocolKind,

    /// Number of participants in the protocol.
    ///
    /// The integrated protocol adds one dealer role on top of these; the
    /// other two run the last participant as the server.
    #[arg(short = 'N', long, default_value_t = 4)]
    pub num_parties: usize,

    /// Number of elements of the set that each participant has.
    #[arg(short = 'n', long, default_value_t = 200)]
    pub set_size: usize,

    /// The size of the aggregate product of the sets that each party has.
    #[arg(short = 'm', long, default_value_t = 3)]
    pub common_size: usize,

    /// Length of the random set elements.
    #[arg(short = 'l', long, default_value_t = 10)]
    pub element_len: usize,

    /// Bit length of each of the two safe primes of the key.
    #[arg(short = 'b', long, default_value_t = 60)]
    pub prime_bits: u64,

    /// Bloom filter false-positive exponent e, for a rate of 2^-e.
    ///
    /// Only the two bloom-filter protocols use it.
    #[arg(short = 'e', long, default_value_t = 50)]
    pub fp_exponent: u32,

    /// Bit length of the blinding exponents and evaluation masks.
    #[arg(short = 'r', long, default_value_t = 100)]
    pub random_bits: u64,

    /// Fix the RNG seed for a reproducible run.
    ///
    /// Unset means seeding from the OS entropy source.
    #[arg(short = 's', long)]
    pub seed: Option<u64>,

    /// Verbose mode.
    ///
    /// If specified, print the sets and the expected intersection.
    #[arg(long = "verbose", default_value_t = false)]
    pub verbose: bool,
}
