//! Bloom filters with homomorphic encodings.
//!
//! A filter of m bits with k hash functions backs both bloom-filter based
//! protocols. For the homomorphic exchanges the bit array is encrypted
//! index-aligned under one of two encodings: direct (the bit value), so
//! that adding filters counts how many parties hold each bit, and
//! inverted (the logical complement), so that an element contained in the
//! filter contributes an all-zero sum over its k positions.

use crate::hash_utils::hash_to_index;
use crate::paillier::{Ciphertext, PublicKey};
use anyhow::{bail, Context, Result};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::{CryptoRng, Rng};

/// How a filter bit maps to a plaintext before encryption.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitEncoding {
    /// Encrypt the bit value itself.
    Direct,
    /// Encrypt the logical complement of the bit.
    Inverted,
}

/// Probabilistic set-membership structure with one-sided error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BloomFilter {
    size: usize,
    num_hashes: usize,
    bits: Vec<bool>,
}

impl BloomFilter {
    /// An empty filter of `size` bits probed by `num_hashes` hash functions.
    pub fn new(size: usize, num_hashes: usize) -> Result<Self> {
        if size == 0 {
            bail!("bloom filter size must be positive @{}:{}", file!(), line!());
        }
        if num_hashes == 0 {
            bail!(
                "bloom filter needs at least one hash function @{}:{}",
                file!(),
                line!()
            );
        }
        Ok(Self {
            size,
            num_hashes,
            bits: vec![false; size],
        })
    }

    /// Derive (m, k) for `set_size` elements at a false-positive rate of
    /// 2^-`fp_exponent`.
    pub fn optimal_params(set_size: usize, fp_exponent: u32) -> Result<(usize, usize)> {
        if set_size == 0 {
            bail!("set_size must be positive @{}:{}", file!(), line!());
        }
        if fp_exponent == 0 {
            bail!("fp_exponent must be positive @{}:{}", file!(), line!());
        }
        let ln2 = std::f64::consts::LN_2;
        let ln_fp = -(fp_exponent as f64) * ln2;
        let size = (set_size as f64 * ln_fp / -(ln2 * ln2)).ceil() as usize;
        let num_hashes = ((size as f64 / set_size as f64) * ln2).round() as usize;
        Ok((size, num_hashes))
    }

    /// Rebuild a filter from an already computed bit vector.
    pub fn from_bits(size: usize, num_hashes: usize, bits: &[bool]) -> Result<Self> {
        if bits.len() != size {
            bail!(
                "bit vector has {} entries, filter size is {} @{}:{}",
                bits.len(),
                size,
                file!(),
                line!()
            );
        }
        let mut filter = Self::new(size, num_hashes)?;
        filter.bits.copy_from_slice(bits);
        Ok(filter)
    }

    /// Filter size m.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of hash functions k.
    pub fn num_hashes(&self) -> usize {
        self.num_hashes
    }

    /// The raw bit array.
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// The k positions probed for `x`.
    pub fn positions(&self, x: &str) -> Vec<usize> {
        (0..self.num_hashes)
            .map(|i| hash_to_index(i, x, self.size))
            .collect()
    }

    /// Set the k positions of `x`.
    pub fn insert(&mut self, x: &str) {
        for i in 0..self.num_hashes {
            let pos = hash_to_index(i, x, self.size);
            self.bits[pos] = true;
        }
    }

    /// True iff every position of `x` is set. Never false for an inserted
    /// element; true for a non-member with probability ~2^-fp_exponent.
    pub fn check(&self, x: &str) -> bool {
        (0..self.num_hashes).all(|i| self.bits[hash_to_index(i, x, self.size)])
    }

    /// Encrypt the bit array index-aligned under `encoding`.
    pub fn encode<RNG>(
        &self,
        public: &PublicKey,
        encoding: BitEncoding,
        rng: &mut RNG,
    ) -> Result<Vec<Ciphertext>>
    where
        RNG: CryptoRng + Rng,
    {
        self.bits
            .iter()
            .map(|&bit| {
                let plain = match encoding {
                    BitEncoding::Direct => bit,
                    BitEncoding::Inverted => !bit,
                };
                let value = if plain { BigUint::one() } else { BigUint::zero() };
                public
                    .encrypt(&value, rng)
                    .with_context(|| format!("@{}:{}", file!(), line!()))
            })
            .collect()
    }
}
