//! Polynomial MPSI over encrypted root polynomials.
//!
//! Every client encodes its dataset as the monic polynomial vanishing on
//! its hashed elements and ships the coefficients encrypted. The server
//! sums the polynomials coefficient-wise, padding shorter vectors with
//! encryptions of zero, evaluates the sum at its own hashed elements with
//! masked Horner steps, and after threshold decryption keeps the elements
//! that evaluated to zero. A sum of t polynomials that all vanish at a
//! point vanishes there too, so common elements always decrypt to zero;
//! a stray zero for a non-member requires hitting a root of the summed
//! polynomial by hash accident.

use crate::ope::Ope;
use crate::paillier::{key_gen, Ciphertext, DecryptionShare, PrivateKeyShare};
use crate::protocol::{ensure_datasets, ensure_keys, RunReport};
use crate::stats::{PayloadSize, Phase, ProtocolStats, RoleId};
use anyhow::{bail, Context, Result};
use num_bigint::BigUint;
use num_traits::Zero;
use rand::{CryptoRng, Rng};
use std::time::Instant;

/// Parameters of the polynomial protocol.
#[derive(Clone, Copy, Debug)]
pub struct PolynomialMpsi {
    /// Bit length of each of the two safe primes.
    pub prime_bits: u64,
    /// Bit length of the server's evaluation masks.
    pub mask_bits: u64,
}

impl PolynomialMpsi {
    /// Role id of the server. Client i runs as role i+1.
    pub const SERVER: RoleId = 0;

    /// Generate a fresh key and run. Clients take `datasets[0..n-1]` in
    /// order, the server runs on the last dataset.
    pub fn run<RNG>(&self, datasets: &[Vec<String>], rng: &mut RNG) -> Result<RunReport>
    where
        RNG: CryptoRng + Rng,
    {
        ensure_datasets(datasets, 2)?;
        let keys = key_gen(self.prime_bits, datasets.len(), datasets.len() - 1, rng)?;
        self.run_with_keys(datasets, &keys, rng)
    }

    /// Run on pre-generated key shares, `keys[0]` for the server and
    /// `keys[i]` for client i. The report holds the server's view of the
    /// intersection.
    pub fn run_with_keys<RNG>(
        &self,
        datasets: &[Vec<String>],
        keys: &[PrivateKeyShare],
        rng: &mut RNG,
    ) -> Result<RunReport>
    where
        RNG: CryptoRng + Rng,
    {
        ensure_datasets(datasets, 2)?;
        let num_roles = datasets.len();
        let num_clients = num_roles - 1;
        ensure_keys(keys, num_roles, num_clients)?;

        let mut stats = ProtocolStats::new(num_roles);

        let mut clients = Vec::with_capacity(num_clients);
        for i in 0..num_clients {
            let start = Instant::now();
            let client = PolyClient::init(keys[i + 1].clone(), &datasets[i], rng)?;
            stats.timings.record(i + 1, Phase::Setup, start.elapsed());
            clients.push(client);
        }

        let start = Instant::now();
        let server = PolyServer::new(
            keys[0].clone(),
            datasets[num_clients].clone(),
            self.mask_bits,
        )?;
        stats.timings.record(Self::SERVER, Phase::Setup, start.elapsed());

        // round 1: encrypted coefficient vectors to the server
        let coefficient_vectors = clients
            .iter()
            .map(|c| c.coefficients().to_vec())
            .collect::<Vec<_>>();
        for (i, vector) in coefficient_vectors.iter().enumerate() {
            stats.transfers.record(i + 1, Self::SERVER, vector.payload_bytes());
        }

        // round 2: sum, evaluate masked, broadcast
        let start = Instant::now();
        let summed = server.sum_polynomials(&coefficient_vectors, rng)?;
        let evaluated = server.evaluate(&summed, rng)?;
        stats.timings.record(Self::SERVER, Phase::Online, start.elapsed());
        for i in 0..num_clients {
            stats.transfers.record(Self::SERVER, i + 1, evaluated.payload_bytes());
        }

        // round 3: threshold decryption by the clients
        let mut shares = Vec::with_capacity(num_clients);
        for (i, client) in clients.iter().enumerate() {
            let start = Instant::now();
            let share_row = client.decryption_shares(&evaluated);
            stats.timings.record(i + 1, Phase::Online, start.elapsed());
            stats.transfers.record(i + 1, Self::SERVER, share_row.payload_bytes());
            shares.push(share_row);
        }

        let start = Instant::now();
        let intersection = server.intersect(&shares)?;
        stats.timings.record(Self::SERVER, Phase::Online, start.elapsed());

        Ok(RunReport {
            intersections: vec![intersection],
            stats,
        })
    }
}

/// A client role: key share and encrypted root polynomial.
pub struct PolyClient {
    key: PrivateKeyShare,
    coefficients: Vec<Ciphertext>,
}

impl PolyClient {
    /// Interpolate the dataset's root polynomial and encrypt it.
    pub fn init<RNG>(key: PrivateKeyShare, dataset: &[String], rng: &mut RNG) -> Result<Self>
    where
        RNG: CryptoRng + Rng,
    {
        let coefficients = {
            let ope = Ope::interpolate(dataset, key.public().modulus())?;
            ope.encrypt_coefficients(key.public(), rng)?
        };
        Ok(Self { key, coefficients })
    }

    /// The client's first message, constant term first.
    pub fn coefficients(&self) -> &[Ciphertext] {
        &self.coefficients
    }

    /// Partially decrypt the masked evaluations.
    pub fn decryption_shares(&self, evaluated: &[Ciphertext]) -> Vec<DecryptionShare> {
        evaluated.iter().map(|c| self.key.partial_decrypt(c)).collect()
    }
}

/// The server role: sums, evaluates and learns the intersection.
pub struct PolyServer {
    key: PrivateKeyShare,
    dataset: Vec<String>,
    mask_bits: u64,
}

impl PolyServer {
    /// A server over `dataset` masking evaluations with `mask_bits` bits.
    pub fn new(key: PrivateKeyShare, dataset: Vec<String>, mask_bits: u64) -> Result<Self> {
        if mask_bits == 0 {
            bail!("mask_bits must be positive @{}:{}", file!(), line!());
        }
        Ok(Self {
            key,
            dataset,
            mask_bits,
        })
    }

    /// Coefficient-wise sum of the clients' encrypted polynomials. Each
    /// coefficient starts from a fresh encryption of zero, which pads the
    /// shorter vectors and rerandomizes the sum in one step.
    pub fn sum_polynomials<RNG>(
        &self,
        coefficient_vectors: &[Vec<Ciphertext>],
        rng: &mut RNG,
    ) -> Result<Vec<Ciphertext>>
    where
        RNG: CryptoRng + Rng,
    {
        if coefficient_vectors.is_empty() {
            bail!("no coefficient vectors to sum @{}:{}", file!(), line!());
        }
        for (i, vector) in coefficient_vectors.iter().enumerate() {
            if vector.is_empty() {
                bail!(
                    "client {} sent an empty coefficient vector @{}:{}",
                    i,
                    file!(),
                    line!()
                );
            }
        }
        let public = self.key.public();
        let len = coefficient_vectors.iter().map(|v| v.len()).max().unwrap_or(0);

        (0..len)
            .map(|j| {
                let mut acc = public
                    .encrypt(&BigUint::zero(), rng)
                    .with_context(|| format!("@{}:{}", file!(), line!()))?;
                for vector in coefficient_vectors {
                    if let Some(c) = vector.get(j) {
                        acc = public.add(&acc, c);
                    }
                }
                Ok(acc)
            })
            .collect()
    }

    /// Masked Horner evaluation of the summed polynomial at every own
    /// element.
    pub fn evaluate<RNG>(&self, summed: &[Ciphertext], rng: &mut RNG) -> Result<Vec<Ciphertext>>
    where
        RNG: CryptoRng + Rng,
    {
        Ope::evaluate_encrypted(self.key.public(), summed, &self.dataset, self.mask_bits, rng)
    }

    /// Combine the clients' decryption shares per element; zero means the
    /// element is in the intersection.
    pub fn intersect(&self, shares: &[Vec<DecryptionShare>]) -> Result<Vec<String>> {
        for (i, row) in shares.iter().enumerate() {
            if row.len() != self.dataset.len() {
                bail!(
                    "client {} returned {} decryption shares, expected {} @{}:{}",
                    i,
                    row.len(),
                    self.dataset.len(),
                    file!(),
                    line!()
                );
            }
        }
        let public = self.key.public();
        let mut intersection = Vec::new();
        for (j, y) in self.dataset.iter().enumerate() {
            let column = shares.iter().map(|row| row[j].clone()).collect::<Vec<_>>();
            let value = public.combine(&column).with_context(|| {
                format!("combining shares for element {} @{}:{}", j, file!(), line!())
            })?;
            if value.is_zero() {
                intersection.push(y.clone());
            }
        }
        Ok(intersection)
    }
}
