//! Additively blinded bloom-filter MPSI.
//!
//! One designated server intersects its dataset with those of c clients
//! and is the only role to learn the result. Decryption threshold is c,
//! with c+1 dealt key shares.
//!
//! Round structure, all through the orchestrating [AdditiveMpsi::run]:
//!
//! 1. every client inserts its elements into a bloom filter and sends the
//!    filter encrypted under the inverted encoding,
//! 2. for each own element the server sums the k encrypted bits at the
//!    element's filter positions within each client's filter, sums those
//!    per-client sums across clients and broadcasts the combined vector,
//! 3. every client multiplies each entry of the combined vector by a
//!    fresh non-zero exponent and sends the blinded row back,
//! 4. the server folds the blinded rows, adding every client's row
//!    exactly once, and broadcasts the folded vector,
//! 5. the clients return decryption shares and the server combines them:
//!    an element is in the intersection iff its value decrypts to zero.
//!
//! A zero sum means every client's filter contained all k positions of
//! the element; the blinding exponents keep non-zero sums uniformly
//! unreadable without disturbing zeros.

use crate::bloom::{BitEncoding, BloomFilter};
use crate::paillier::{
    key_gen, random_nonzero, Ciphertext, DecryptionShare, PrivateKeyShare,
};
use crate::protocol::{ensure_datasets, ensure_keys, RunReport};
use crate::stats::{PayloadSize, Phase, ProtocolStats, RoleId};
use anyhow::{bail, Context, Result};
use num_traits::Zero;
use rand::{CryptoRng, Rng};
use std::time::Instant;

/// Parameters of the additive bloom-filter protocol.
#[derive(Clone, Copy, Debug)]
pub struct AdditiveMpsi {
    /// Bit length of each of the two safe primes.
    pub prime_bits: u64,
    /// Bloom filter size m.
    pub bloom_size: usize,
    /// Number of bloom hash functions k.
    pub bloom_hashes: usize,
    /// Bit length of the clients' blinding exponents.
    pub exponent_bits: u64,
}

impl AdditiveMpsi {
    /// Role id of the server. Client i runs as role i+1.
    pub const SERVER: RoleId = 0;

    /// Derive the bloom filter from `set_size` and a false-positive rate
    /// of 2^-`fp_exponent`.
    pub fn with_derived_params(
        prime_bits: u64,
        set_size: usize,
        fp_exponent: u32,
        exponent_bits: u64,
    ) -> Result<Self> {
        let (bloom_size, bloom_hashes) = BloomFilter::optimal_params(set_size, fp_exponent)?;
        Ok(Self {
            prime_bits,
            bloom_size,
            bloom_hashes,
            exponent_bits,
        })
    }

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
            let client = AdditiveClient::init(
                keys[i + 1].clone(),
                &datasets[i],
                self.bloom_size,
                self.bloom_hashes,
                self.exponent_bits,
                rng,
            )?;
            stats.timings.record(i + 1, Phase::Setup, start.elapsed());
            clients.push(client);
        }

        let start = Instant::now();
        let server = AdditiveServer::new(
            keys[0].clone(),
            datasets[num_clients].clone(),
            self.bloom_size,
            self.bloom_hashes,
        )?;
        stats.timings.record(Self::SERVER, Phase::Setup, start.elapsed());

        // round 1: encrypted filters to the server
        let filters = clients
            .iter()
            .map(|c| c.encoded_filter().to_vec())
            .collect::<Vec<_>>();
        for (i, filter) in filters.iter().enumerate() {
            stats.transfers.record(i + 1, Self::SERVER, filter.payload_bytes());
        }

        // round 2: aggregation across clients, combined vector broadcast
        let start = Instant::now();
        let aggregated = server.aggregate_filters(&filters, rng)?;
        stats.timings.record(Self::SERVER, Phase::Online, start.elapsed());
        for i in 0..num_clients {
            stats.transfers.record(Self::SERVER, i + 1, aggregated.payload_bytes());
        }

        // round 3: blinding
        let mut blinded = Vec::with_capacity(num_clients);
        for (i, client) in clients.iter().enumerate() {
            let start = Instant::now();
            let b = client.blind(&aggregated, rng);
            stats.timings.record(i + 1, Phase::Online, start.elapsed());
            stats.transfers.record(i + 1, Self::SERVER, b.payload_bytes());
            blinded.push(b);
        }

        // round 4: fold and broadcast
        let start = Instant::now();
        let recombined = server.recombine_blinded(&blinded, rng)?;
        stats.timings.record(Self::SERVER, Phase::Online, start.elapsed());
        for i in 0..num_clients {
            stats.transfers.record(Self::SERVER, i + 1, recombined.payload_bytes());
        }

        // round 5: threshold decryption by the clients
        let mut shares = Vec::with_capacity(num_clients);
        for (i, client) in clients.iter().enumerate() {
            let start = Instant::now();
            let share_row = client.decryption_shares(&recombined);
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

/// A client role: holds its key share and its encrypted filter.
pub struct AdditiveClient {
    key: PrivateKeyShare,
    encoded_filter: Vec<Ciphertext>,
    exponent_bits: u64,
}

impl AdditiveClient {
    /// Insert `dataset` into a fresh filter and encrypt it inverted.
    pub fn init<RNG>(
        key: PrivateKeyShare,
        dataset: &[String],
        bloom_size: usize,
        bloom_hashes: usize,
        exponent_bits: u64,
        rng: &mut RNG,
    ) -> Result<Self>
    where
        RNG: CryptoRng + Rng,
    {
        if exponent_bits == 0 {
            bail!("exponent_bits must be positive @{}:{}", file!(), line!());
        }
        let mut filter = BloomFilter::new(bloom_size, bloom_hashes)?;
        for x in dataset {
            filter.insert(x);
        }
        let encoded_filter = filter.encode(key.public(), BitEncoding::Inverted, rng)?;
        Ok(Self {
            key,
            encoded_filter,
            exponent_bits,
        })
    }

    /// The client's first message.
    pub fn encoded_filter(&self) -> &[Ciphertext] {
        &self.encoded_filter
    }

    /// Multiply every aggregated value by a fresh non-zero exponent. Zero
    /// plaintexts stay zero, everything else becomes unreadable.
    pub fn blind<RNG>(&self, aggregated: &[Ciphertext], rng: &mut RNG) -> Vec<Ciphertext>
    where
        RNG: CryptoRng + Rng,
    {
        let public = self.key.public();
        aggregated
            .iter()
            .map(|c| {
                let exponent = random_nonzero(self.exponent_bits, rng);
                public.rerandomize(&public.multiply_by_scalar(c, &exponent), rng)
            })
            .collect()
    }

    /// Partially decrypt the folded vector.
    pub fn decryption_shares(&self, recombined: &[Ciphertext]) -> Vec<DecryptionShare> {
        recombined.iter().map(|c| self.key.partial_decrypt(c)).collect()
    }
}

/// The server role: aggregates, folds and learns the intersection.
pub struct AdditiveServer {
    key: PrivateKeyShare,
    dataset: Vec<String>,
    probe: BloomFilter,
}

impl AdditiveServer {
    /// A server over `dataset`; the filter parameters must match the
    /// clients' filters.
    pub fn new(
        key: PrivateKeyShare,
        dataset: Vec<String>,
        bloom_size: usize,
        bloom_hashes: usize,
    ) -> Result<Self> {
        // never inserted into, only used to hash elements to positions
        let probe = BloomFilter::new(bloom_size, bloom_hashes)?;
        Ok(Self { key, dataset, probe })
    }

    /// For each own element, sum the k encrypted bits at the element's
    /// positions within each client's filter and fold those sums across
    /// clients into one combined value per element.
    pub fn aggregate_filters<RNG>(
        &self,
        filters: &[Vec<Ciphertext>],
        rng: &mut RNG,
    ) -> Result<Vec<Ciphertext>>
    where
        RNG: CryptoRng + Rng,
    {
        let Some((first, rest)) = filters.split_first() else {
            bail!("no encrypted filters to aggregate @{}:{}", file!(), line!());
        };
        for (i, filter) in filters.iter().enumerate() {
            if filter.len() != self.probe.size() {
                bail!(
                    "client {} sent a filter of {} entries, expected {} @{}:{}",
                    i,
                    filter.len(),
                    self.probe.size(),
                    file!(),
                    line!()
                );
            }
        }
        let public = self.key.public();
        let sum_positions = |filter: &[Ciphertext], positions: &[usize]| {
            let mut acc = filter[positions[0]].clone();
            for &pos in &positions[1..] {
                acc = public.add(&acc, &filter[pos]);
            }
            acc
        };
        let aggregated = self
            .dataset
            .iter()
            .map(|y| {
                let positions = self.probe.positions(y);
                let mut acc = sum_positions(first, &positions);
                for filter in rest {
                    acc = public.add(&acc, &sum_positions(filter, &positions));
                }
                public.rerandomize(&acc, rng)
            })
            .collect();
        Ok(aggregated)
    }

    /// Sum the blinded rows, each client contributing exactly once.
    pub fn recombine_blinded<RNG>(
        &self,
        blinded: &[Vec<Ciphertext>],
        rng: &mut RNG,
    ) -> Result<Vec<Ciphertext>>
    where
        RNG: CryptoRng + Rng,
    {
        let Some((first, rest)) = blinded.split_first() else {
            bail!("no blinded rows to recombine @{}:{}", file!(), line!());
        };
        for (i, row) in blinded.iter().enumerate() {
            if row.len() != self.dataset.len() {
                bail!(
                    "client {} returned {} blinded values, expected {} @{}:{}",
                    i,
                    row.len(),
                    self.dataset.len(),
                    file!(),
                    line!()
                );
            }
        }
        let public = self.key.public();
        Ok((0..self.dataset.len())
            .map(|j| {
                let mut acc = first[j].clone();
                for row in rest {
                    acc = public.add(&acc, &row[j]);
                }
                public.rerandomize(&acc, rng)
            })
            .collect())
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
