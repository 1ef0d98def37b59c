//! Trusted-dealer key generation: safe primes, the CRT secret exponent and
//! Shamir share dealing.

use super::{PrivateKeyShare, PublicKey};
use anyhow::{bail, Context, Result};
use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, Rng};

const SMALL_PRIMES: &[u64] = &[
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
];

const MILLER_RABIN_ROUNDS: usize = 40;

/// Trusted-dealer setup: one key share per party, any `threshold` of which
/// decrypt together.
///
/// The plaintext modulus is the product of two distinct safe primes of
/// `prime_bits` bits each. The secret exponent is Shamir-shared into
/// `num_shares` shares with 1-based indices; every share carries a copy of
/// the public key.
pub fn key_gen<RNG>(
    prime_bits: u64,
    num_shares: usize,
    threshold: usize,
    rng: &mut RNG,
) -> Result<Vec<PrivateKeyShare>>
where
    RNG: CryptoRng + Rng,
{
    if prime_bits < 8 {
        bail!("prime_bits (={}) < 8 @{}:{}", prime_bits, file!(), line!());
    }
    if num_shares == 0 {
        bail!("num_shares must be positive @{}:{}", file!(), line!());
    }
    if threshold == 0 || threshold > num_shares {
        bail!(
            "threshold (={}) must lie in 1..={} @{}:{}",
            threshold,
            num_shares,
            file!(),
            line!()
        );
    }

    let p = gen_safe_prime(prime_bits, rng);
    let q = loop {
        let q = gen_safe_prime(prime_bits, rng);
        if q != p {
            break q;
        }
    };

    let n = &p * &q;
    let n_squared = &n * &n;
    let p_prime: BigUint = &p >> 1u32;
    let q_prime: BigUint = &q >> 1u32;
    let m = &p_prime * &q_prime;
    let nm = &n * &m;

    // d ≡ 0 (mod m) and d ≡ 1 (mod n)
    let m_inv = mod_inverse(&m, &n)
        .with_context(|| format!("m not invertible mod n @{}:{}", file!(), line!()))?;
    let d = &m * &m_inv;

    let delta = factorial(num_shares);
    let four_delta_sq = BigUint::from(4u32) * &delta * &delta;
    let inv_four_delta_sq = mod_inverse(&four_delta_sq, &n)
        .with_context(|| format!("4*delta^2 not invertible mod n @{}:{}", file!(), line!()))?;

    let public = PublicKey {
        n,
        n_squared,
        num_shares,
        threshold,
        delta,
        inv_four_delta_sq,
    };

    // Shamir polynomial f with f(0) = d over Z_{nm}
    let coeffs = (1..threshold)
        .map(|_| rng.gen_biguint_below(&nm))
        .collect::<Vec<_>>();

    let shares = (1..=num_shares)
        .map(|i| {
            let x = BigUint::from(i);
            let mut value = BigUint::zero();
            for c in coeffs.iter().rev() {
                value = (&value * &x + c) % &nm;
            }
            value = (&value * &x + &d) % &nm;
            PrivateKeyShare {
                index: i,
                share: value,
                public: public.clone(),
            }
        })
        .collect::<Vec<_>>();

    Ok(shares)
}

/// Generate a safe prime p = 2q + 1 of exactly `bits` bits.
pub(crate) fn gen_safe_prime<RNG>(bits: u64, rng: &mut RNG) -> BigUint
where
    RNG: CryptoRng + Rng,
{
    loop {
        let mut q = rng.gen_biguint(bits - 1);
        q.set_bit(bits - 2, true);
        q.set_bit(0, true);
        if !is_probable_prime(&q, rng) {
            continue;
        }
        let p: BigUint = (&q << 1u32) + 1u32;
        if is_probable_prime(&p, rng) {
            return p;
        }
    }
}

/// Miller-Rabin with random bases, after trial division by the first primes.
pub(crate) fn is_probable_prime<RNG>(n: &BigUint, rng: &mut RNG) -> bool
where
    RNG: CryptoRng + Rng,
{
    let two = BigUint::from(2u32);
    if *n < two {
        return false;
    }
    for &p in SMALL_PRIMES {
        let p = BigUint::from(p);
        if *n == p {
            return true;
        }
        if (n % &p).is_zero() {
            return false;
        }
    }

    let n_minus_1 = n - BigUint::one();
    let s = n_minus_1.trailing_zeros().unwrap_or(0);
    let d = &n_minus_1 >> s;

    'witness: for _ in 0..MILLER_RABIN_ROUNDS {
        let a = rng.gen_biguint_range(&two, &n_minus_1);
        let mut x = a.modpow(&d, n);
        if x.is_one() || x == n_minus_1 {
            continue;
        }
        for _ in 1..s {
            x = (&x * &x) % n;
            if x == n_minus_1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Modular inverse of `a` mod `modulus`, or `None` when they share a factor.
pub(crate) fn mod_inverse(a: &BigUint, modulus: &BigUint) -> Option<BigUint> {
    let a = BigInt::from(a % modulus);
    let m = BigInt::from(modulus.clone());
    let e = a.extended_gcd(&m);
    if !e.gcd.is_one() {
        return None;
    }
    e.x.mod_floor(&m).to_biguint()
}

pub(crate) fn factorial(l: usize) -> BigUint {
    (1..=l as u64).fold(BigUint::one(), |acc, v| acc * v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    #[test]
    fn test_is_probable_prime() {
        let mut rng = thread_rng();

        for prime in [2u64, 3, 97, 7919, 104_729] {
            assert!(is_probable_prime(&BigUint::from(prime), &mut rng), "{}", prime);
        }

        // 561 is a Carmichael number
        for composite in [0u64, 1, 4, 100, 561, 7917] {
            assert!(
                !is_probable_prime(&BigUint::from(composite), &mut rng),
                "{}",
                composite
            );
        }
    }

    #[test]
    fn test_safe_prime_structure() {
        let mut rng = thread_rng();

        let p = gen_safe_prime(24, &mut rng);
        let q: BigUint = &p >> 1u32;

        assert_eq!(p.bits(), 24);
        assert!(is_probable_prime(&p, &mut rng));
        assert!(is_probable_prime(&q, &mut rng));
    }

    #[test]
    fn test_factorial() {
        assert_eq!(factorial(0), BigUint::from(1u32));
        assert_eq!(factorial(1), BigUint::from(1u32));
        assert_eq!(factorial(5), BigUint::from(120u32));
    }

    #[test]
    fn test_mod_inverse() {
        let inv = mod_inverse(&BigUint::from(3u32), &BigUint::from(7u32)).unwrap();
        assert_eq!(inv, BigUint::from(5u32));

        assert!(mod_inverse(&BigUint::from(6u32), &BigUint::from(9u32)).is_none());
    }

    #[test]
    fn test_key_gen_shapes() {
        let mut rng = thread_rng();

        let keys = key_gen(16, 5, 3, &mut rng).unwrap();

        assert_eq!(keys.len(), 5);
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(key.index(), i + 1);
            assert_eq!(key.public(), keys[0].public());
        }
        assert_eq!(keys[0].public().threshold(), 3);
        assert_eq!(keys[0].public().num_shares(), 5);
        // two 16-bit primes
        assert!(keys[0].public().modulus().bits() >= 31);
    }

    #[test]
    fn test_key_gen_rejects_bad_params() {
        let mut rng = thread_rng();

        assert!(key_gen(4, 3, 2, &mut rng).is_err());
        assert!(key_gen(16, 0, 0, &mut rng).is_err());
        assert!(key_gen(16, 3, 0, &mut rng).is_err());
        assert!(key_gen(16, 3, 4, &mut rng).is_err());
    }
}
