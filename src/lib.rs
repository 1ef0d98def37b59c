//! # Threshold-Paillier Multi-party PSI project
//!
//! This library implements and benchmarks three multi-party private
//! set-intersection protocols on top of a threshold Paillier cryptosystem:
//! an additive bloom-filter protocol, an integrated bloom-filter protocol
//! with a semi-trusted dealer, and a polynomial protocol based on oblivious
//! polynomial evaluation.
//!
//! [protocol] is the main module of this library.
#![warn(missing_docs)]

pub mod bloom;
pub mod cli_utils;
mod hash_utils;
pub mod ope;
pub mod paillier;
pub mod poly;
pub mod protocol;
pub mod set_utils;
pub mod stats;
