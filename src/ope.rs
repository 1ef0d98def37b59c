//! Oblivious polynomial evaluation on encrypted coefficient vectors.
//!
//! A party encodes its dataset as the monic polynomial whose roots are the
//! hashes of its elements and ships the coefficients encrypted. The peer
//! evaluates the encrypted polynomial at its own hashed points with
//! Horner's rule, multiplying each value by a fresh non-zero mask so that
//! a decrypted non-zero result carries no information beyond "not a root".

use crate::hash_utils::hash_to_residue;
use crate::paillier::{random_nonzero, Ciphertext, PublicKey};
use crate::poly::Polynomial;
use anyhow::{bail, Context, Result};
use num_bigint::BigUint;
use rand::{CryptoRng, Rng};

/// Root-polynomial encoder for one party's dataset.
#[derive(Clone, Debug)]
pub struct Ope {
    root_poly: Polynomial,
}

impl Ope {
    /// Hash an element into the plaintext space.
    pub fn hash_root(element: &str, modulus: &BigUint) -> BigUint {
        hash_to_residue(element, modulus)
    }

    /// Build the monic polynomial whose roots are the hashes of `dataset`.
    pub fn interpolate(dataset: &[String], modulus: &BigUint) -> Result<Self> {
        if dataset.is_empty() {
            bail!("cannot interpolate an empty dataset @{}:{}", file!(), line!());
        }
        let roots = dataset
            .iter()
            .map(|x| Self::hash_root(x, modulus))
            .collect::<Vec<_>>();
        Ok(Self {
            root_poly: Polynomial::from_roots(&roots, modulus),
        })
    }

    /// The underlying root polynomial.
    pub fn root_polynomial(&self) -> &Polynomial {
        &self.root_poly
    }

    /// Encrypt each coefficient independently, constant term first.
    pub fn encrypt_coefficients<RNG>(
        &self,
        public: &PublicKey,
        rng: &mut RNG,
    ) -> Result<Vec<Ciphertext>>
    where
        RNG: CryptoRng + Rng,
    {
        self.root_poly
            .coefficients()
            .iter()
            .map(|c| {
                public
                    .encrypt(c, rng)
                    .with_context(|| format!("@{}:{}", file!(), line!()))
            })
            .collect()
    }

    /// Evaluate an encrypted coefficient vector at the hashes of `dataset`,
    /// masking every value with a fresh non-zero scalar of `mask_bits` bits.
    ///
    /// The mask preserves exactly the zero/non-zero distinction of the
    /// evaluation; it must never be skipped.
    pub fn evaluate_encrypted<RNG>(
        public: &PublicKey,
        coefficients: &[Ciphertext],
        dataset: &[String],
        mask_bits: u64,
        rng: &mut RNG,
    ) -> Result<Vec<Ciphertext>>
    where
        RNG: CryptoRng + Rng,
    {
        let Some((highest, rest)) = coefficients.split_last() else {
            bail!("empty coefficient vector @{}:{}", file!(), line!());
        };
        if dataset.is_empty() {
            bail!("empty dataset @{}:{}", file!(), line!());
        }
        if mask_bits == 0 {
            bail!("mask_bits must be positive @{}:{}", file!(), line!());
        }

        dataset
            .iter()
            .map(|element| {
                let point = Self::hash_root(element, public.modulus());
                let mut acc = highest.clone();
                for c in rest.iter().rev() {
                    acc = public.add(&public.multiply_by_scalar(&acc, &point), c);
                }
                let mask = random_nonzero(mask_bits, rng);
                Ok(public.multiply_by_scalar(&acc, &mask))
            })
            .collect()
    }
}
