//! Threshold Paillier cryptosystem.
//!
//! Additively homomorphic encryption with t-of-l threshold decryption,
//! following Fouque, Poupard and Stern's sharing of the Paillier secret
//! (the s = 1 case of Damgård-Jurik). The modulus is n = p·q for safe
//! primes p = 2p'+1 and q = 2q'+1; ciphertexts live in Z_{n²} with
//! generator n+1. The secret exponent d (d ≡ 0 mod p'q', d ≡ 1 mod n) is
//! Shamir-shared over Z_{n·p'q'}; any t shares reconstruct a decryption
//! through integer Lagrange weights scaled by Δ = l!.
//!
//! Ciphertexts support plaintext addition ([PublicKey::add]),
//! multiplication by a known scalar ([PublicKey::multiply_by_scalar]) and
//! randomness refresh ([PublicKey::rerandomize]). Decryption is
//! non-interactive: each share holder publishes a [DecryptionShare] and
//! anyone holding `threshold` of them recovers the plaintext with
//! [PublicKey::combine].

mod keygen;

pub use keygen::key_gen;

use crate::stats::PayloadSize;
use keygen::mod_inverse;
use num_bigint::{BigInt, BigUint, RandBigInt};
use num_traits::{One, Signed, Zero};
use rand::{CryptoRng, Rng};
use thiserror::Error;

/// Contract violations of the threshold scheme.
#[derive(Debug, Error)]
pub enum ThresholdError {
    /// Fewer decryption shares than the threshold were supplied.
    #[error("insufficient decryption shares: got {got}, need {need}")]
    InsufficientShares {
        /// Number of shares supplied.
        got: usize,
        /// The key's decryption threshold.
        need: usize,
    },
    /// Two of the supplied shares carry the same share index.
    #[error("duplicate share index {index}")]
    DuplicateShareIndex {
        /// The repeated index.
        index: usize,
    },
    /// The plaintext does not lie in Z_n.
    #[error("plaintext out of range for the plaintext space")]
    PlaintextOutOfRange,
    /// A share value has no inverse mod n², so it cannot enter the
    /// Lagrange recombination with a negative weight.
    #[error("share {index} is not invertible modulo n^2")]
    ShareNotInvertible {
        /// Index of the offending share.
        index: usize,
    },
}

/// Public half of a threshold Paillier key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    n: BigUint,
    n_squared: BigUint,
    num_shares: usize,
    threshold: usize,
    delta: BigUint,
    inv_four_delta_sq: BigUint,
}

/// A Paillier ciphertext: an element of Z_{n²}.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ciphertext(BigUint);

/// One party's private share of the threshold decryption key.
#[derive(Clone, Debug)]
pub struct PrivateKeyShare {
    index: usize,
    share: BigUint,
    public: PublicKey,
}

/// One party's contribution toward decrypting a ciphertext.
#[derive(Clone, Debug)]
pub struct DecryptionShare {
    index: usize,
    value: BigUint,
}

impl PublicKey {
    /// Plaintext modulus n.
    pub fn modulus(&self) -> &BigUint {
        &self.n
    }

    /// Number of dealt key shares l.
    pub fn num_shares(&self) -> usize {
        self.num_shares
    }

    /// Decryption threshold t.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Encrypt a plaintext from Z_n: c = (1+n)^M · r^n mod n².
    pub fn encrypt<RNG>(
        &self,
        plaintext: &BigUint,
        rng: &mut RNG,
    ) -> Result<Ciphertext, ThresholdError>
    where
        RNG: CryptoRng + Rng,
    {
        if plaintext >= &self.n {
            return Err(ThresholdError::PlaintextOutOfRange);
        }
        // (1+n)^M ≡ 1 + M·n (mod n²)
        let g_pow = (BigUint::one() + plaintext * &self.n) % &self.n_squared;
        let r = rng.gen_biguint_range(&BigUint::one(), &self.n);
        Ok(Ciphertext(
            (g_pow * r.modpow(&self.n, &self.n_squared)) % &self.n_squared,
        ))
    }

    /// Homomorphic plaintext addition.
    pub fn add(&self, c1: &Ciphertext, c2: &Ciphertext) -> Ciphertext {
        Ciphertext((&c1.0 * &c2.0) % &self.n_squared)
    }

    /// Homomorphic multiplication of the plaintext by a known scalar.
    pub fn multiply_by_scalar(&self, c: &Ciphertext, scalar: &BigUint) -> Ciphertext {
        Ciphertext(c.0.modpow(scalar, &self.n_squared))
    }

    /// Re-draw the ciphertext randomness without changing the plaintext.
    pub fn rerandomize<RNG>(&self, c: &Ciphertext, rng: &mut RNG) -> Ciphertext
    where
        RNG: CryptoRng + Rng,
    {
        let r = rng.gen_biguint_range(&BigUint::one(), &self.n);
        Ciphertext((&c.0 * r.modpow(&self.n, &self.n_squared)) % &self.n_squared)
    }

    /// Combine at least `threshold` decryption shares into the plaintext.
    ///
    /// Only the first `threshold` shares are used; the result is the same
    /// for every qualifying subset and does not depend on share order.
    pub fn combine(&self, shares: &[DecryptionShare]) -> Result<BigUint, ThresholdError> {
        if shares.len() < self.threshold {
            return Err(ThresholdError::InsufficientShares {
                got: shares.len(),
                need: self.threshold,
            });
        }
        let subset = &shares[..self.threshold];
        for (i, share) in subset.iter().enumerate() {
            if subset[..i].iter().any(|other| other.index == share.index) {
                return Err(ThresholdError::DuplicateShareIndex { index: share.index });
            }
        }

        let delta = BigInt::from(self.delta.clone());
        let mut c_prime = BigUint::one();
        for share in subset {
            let mut exponent = &delta * BigInt::from(2);
            let mut denominator = BigInt::one();
            for other in subset {
                if other.index == share.index {
                    continue;
                }
                exponent *= BigInt::from(-(other.index as i64));
                denominator *= BigInt::from(share.index as i64 - other.index as i64);
            }
            // Δ = l! clears every Lagrange denominator, so this is exact
            let exponent = exponent / denominator;

            let base = if exponent.is_negative() {
                mod_inverse(&share.value, &self.n_squared)
                    .ok_or(ThresholdError::ShareNotInvertible { index: share.index })?
            } else {
                share.value.clone()
            };
            c_prime = (c_prime * base.modpow(exponent.magnitude(), &self.n_squared))
                % &self.n_squared;
        }

        // c' ≡ 1 (mod n), so L(c') = (c' - 1)/n is exact
        let l_value = (c_prime - BigUint::one()) / &self.n;
        Ok((l_value * &self.inv_four_delta_sq) % &self.n)
    }
}

impl PrivateKeyShare {
    /// 1-based Shamir index of this share.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The public key this share belongs to.
    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    /// This party's decryption share c_i = c^{2Δ·s_i} mod n².
    pub fn partial_decrypt(&self, c: &Ciphertext) -> DecryptionShare {
        let exponent: BigUint = (&self.public.delta * &self.share) << 1u32;
        DecryptionShare {
            index: self.index,
            value: c.0.modpow(&exponent, &self.public.n_squared),
        }
    }
}

impl DecryptionShare {
    /// 1-based Shamir index of the contributing key share.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Draw a uniformly random non-zero value of at most `bits` bits.
pub fn random_nonzero<RNG>(bits: u64, rng: &mut RNG) -> BigUint
where
    RNG: CryptoRng + Rng,
{
    assert!(bits > 0);
    loop {
        let r = rng.gen_biguint(bits);
        if !r.is_zero() {
            return r;
        }
    }
}

impl PayloadSize for Ciphertext {
    fn payload_bytes(&self) -> u64 {
        (self.0.bits() + 7) / 8
    }
}

impl PayloadSize for DecryptionShare {
    fn payload_bytes(&self) -> u64 {
        // index as a fixed u64 plus the share value
        8 + (self.value.bits() + 7) / 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    fn decrypt_with(
        keys: &[&PrivateKeyShare],
        public: &PublicKey,
        c: &Ciphertext,
    ) -> BigUint {
        let shares = keys.iter().map(|k| k.partial_decrypt(c)).collect::<Vec<_>>();
        public.combine(&shares).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_all_subsets() {
        let mut rng = thread_rng();
        let keys = key_gen(24, 3, 2, &mut rng).unwrap();
        let public = keys[0].public().clone();

        let plaintext = rng.gen_biguint_below(public.modulus());
        let c = public.encrypt(&plaintext, &mut rng).unwrap();

        // every 2-subset, in both orders, yields the same plaintext
        assert_eq!(decrypt_with(&[&keys[0], &keys[1]], &public, &c), plaintext);
        assert_eq!(decrypt_with(&[&keys[1], &keys[2]], &public, &c), plaintext);
        assert_eq!(decrypt_with(&[&keys[2], &keys[0]], &public, &c), plaintext);
        assert_eq!(decrypt_with(&[&keys[2], &keys[1]], &public, &c), plaintext);
    }

    #[test]
    fn test_extra_shares_are_ignored() {
        let mut rng = thread_rng();
        let keys = key_gen(16, 4, 2, &mut rng).unwrap();
        let public = keys[0].public().clone();

        let plaintext = BigUint::from(42u32);
        let c = public.encrypt(&plaintext, &mut rng).unwrap();

        let all = keys.iter().map(|k| k.partial_decrypt(&c)).collect::<Vec<_>>();
        assert_eq!(public.combine(&all).unwrap(), plaintext);
    }

    #[test]
    fn test_homomorphic_add() {
        let mut rng = thread_rng();
        let keys = key_gen(16, 2, 2, &mut rng).unwrap();
        let public = keys[0].public().clone();

        let a = BigUint::from(1234u32);
        let b = BigUint::from(5678u32);
        let c = public.add(
            &public.encrypt(&a, &mut rng).unwrap(),
            &public.encrypt(&b, &mut rng).unwrap(),
        );

        let expected = (&a + &b) % public.modulus();
        assert_eq!(decrypt_with(&[&keys[0], &keys[1]], &public, &c), expected);
    }

    #[test]
    fn test_multiply_by_scalar() {
        let mut rng = thread_rng();
        let keys = key_gen(16, 2, 2, &mut rng).unwrap();
        let public = keys[0].public().clone();

        let a = BigUint::from(999u32);
        let scalar = BigUint::from(77u32);
        let c = public.multiply_by_scalar(&public.encrypt(&a, &mut rng).unwrap(), &scalar);

        let expected = (&a * &scalar) % public.modulus();
        assert_eq!(decrypt_with(&[&keys[0], &keys[1]], &public, &c), expected);
    }

    #[test]
    fn test_scalar_on_zero_stays_zero() {
        let mut rng = thread_rng();
        let keys = key_gen(16, 2, 2, &mut rng).unwrap();
        let public = keys[0].public().clone();

        let c = public.encrypt(&BigUint::zero(), &mut rng).unwrap();
        let blinded = public.multiply_by_scalar(&c, &random_nonzero(100, &mut rng));

        assert_eq!(
            decrypt_with(&[&keys[0], &keys[1]], &public, &blinded),
            BigUint::zero()
        );
    }

    #[test]
    fn test_rerandomize_preserves_plaintext() {
        let mut rng = thread_rng();
        let keys = key_gen(16, 2, 2, &mut rng).unwrap();
        let public = keys[0].public().clone();

        let plaintext = BigUint::from(31337u32) % public.modulus();
        let c = public.encrypt(&plaintext, &mut rng).unwrap();
        let fresh = public.rerandomize(&c, &mut rng);

        assert_ne!(fresh, c);
        assert_eq!(decrypt_with(&[&keys[0], &keys[1]], &public, &fresh), plaintext);
    }

    #[test]
    fn test_combine_insufficient_shares() {
        let mut rng = thread_rng();
        let keys = key_gen(16, 3, 3, &mut rng).unwrap();
        let public = keys[0].public().clone();

        let c = public.encrypt(&BigUint::one(), &mut rng).unwrap();
        let shares = vec![keys[0].partial_decrypt(&c), keys[1].partial_decrypt(&c)];

        let err = public.combine(&shares).unwrap_err();
        assert!(matches!(
            err,
            ThresholdError::InsufficientShares { got: 2, need: 3 }
        ));
    }

    #[test]
    fn test_combine_duplicate_index() {
        let mut rng = thread_rng();
        let keys = key_gen(16, 2, 2, &mut rng).unwrap();
        let public = keys[0].public().clone();

        let c = public.encrypt(&BigUint::one(), &mut rng).unwrap();
        let shares = vec![keys[0].partial_decrypt(&c), keys[0].partial_decrypt(&c)];

        let err = public.combine(&shares).unwrap_err();
        assert!(matches!(err, ThresholdError::DuplicateShareIndex { index: 1 }));
    }

    #[test]
    fn test_encrypt_out_of_range() {
        let mut rng = thread_rng();
        let keys = key_gen(16, 2, 2, &mut rng).unwrap();
        let public = keys[0].public().clone();

        let err = public.encrypt(public.modulus(), &mut rng).unwrap_err();
        assert!(matches!(err, ThresholdError::PlaintextOutOfRange));
    }

    #[test]
    fn test_random_nonzero() {
        let mut rng = thread_rng();
        for _ in 0..100 {
            let r = random_nonzero(1, &mut rng);
            assert_eq!(r, BigUint::one());
        }
        for _ in 0..100 {
            let r = random_nonzero(8, &mut rng);
            assert!(!r.is_zero());
            assert!(r.bits() <= 8);
        }
    }
}
