//! Integrated bloom-filter MPSI with a keyless dealer.
//!
//! n parties hold datasets and key shares; a dealer holds only the public
//! key. Parties send their filters encrypted under the direct encoding,
//! the dealer folds them position-wise and subtracts the party count, and
//! the folded vector goes back to every party. After an all-pairs
//! exchange of decryption shares each party rebuilds the intersection
//! filter locally and checks its own elements, so every party ends up
//! with the same view of the intersection. Decryption is n-of-n: a
//! position decrypts to zero exactly when all n parties had its bit set.

use crate::bloom::{BitEncoding, BloomFilter};
use crate::paillier::{key_gen, Ciphertext, DecryptionShare, PrivateKeyShare, PublicKey};
use crate::protocol::{ensure_datasets, ensure_keys, RunReport};
use crate::stats::{PayloadSize, Phase, ProtocolStats, RoleId};
use anyhow::{bail, Context, Result};
use num_bigint::BigUint;
use num_traits::Zero;
use rand::{CryptoRng, Rng};
use std::time::Instant;

/// Parameters of the integrated bloom-filter protocol.
#[derive(Clone, Copy, Debug)]
pub struct IntegratedMpsi {
    /// Bit length of each of the two safe primes.
    pub prime_bits: u64,
    /// Bloom filter size m.
    pub bloom_size: usize,
    /// Number of bloom hash functions k.
    pub bloom_hashes: usize,
}

impl IntegratedMpsi {
    /// Role id of the dealer in a run with `num_parties` parties; party i
    /// runs as role i.
    pub const fn dealer_role(num_parties: usize) -> RoleId {
        num_parties
    }

    /// Derive the bloom filter from `set_size` and a false-positive rate
    /// of 2^-`fp_exponent`.
    pub fn with_derived_params(prime_bits: u64, set_size: usize, fp_exponent: u32) -> Result<Self> {
        let (bloom_size, bloom_hashes) = BloomFilter::optimal_params(set_size, fp_exponent)?;
        Ok(Self {
            prime_bits,
            bloom_size,
            bloom_hashes,
        })
    }

    /// Generate a fresh n-of-n key and run; party i takes `datasets[i]`.
    pub fn run<RNG>(&self, datasets: &[Vec<String>], rng: &mut RNG) -> Result<RunReport>
    where
        RNG: CryptoRng + Rng,
    {
        ensure_datasets(datasets, 2)?;
        let keys = key_gen(self.prime_bits, datasets.len(), datasets.len(), rng)?;
        self.run_with_keys(datasets, &keys, rng)
    }

    /// Run on pre-generated key shares, `keys[i]` for party i. The report
    /// holds one view of the intersection per party, in party order.
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
        let num_parties = datasets.len();
        ensure_keys(keys, num_parties, num_parties)?;
        let dealer_role = Self::dealer_role(num_parties);

        let mut stats = ProtocolStats::new(num_parties + 1);

        let mut parties = Vec::with_capacity(num_parties);
        for (i, dataset) in datasets.iter().enumerate() {
            let start = Instant::now();
            let party = IntegratedParty::init(
                keys[i].clone(),
                dataset.clone(),
                self.bloom_size,
                self.bloom_hashes,
                rng,
            )?;
            stats.timings.record(i, Phase::Setup, start.elapsed());
            parties.push(party);
        }
        let dealer =
            IntegratedDealer::new(keys[0].public().clone(), num_parties, self.bloom_size)?;

        // round 1: encrypted filters to the dealer
        let filters = parties
            .iter()
            .map(|p| p.encoded_filter().to_vec())
            .collect::<Vec<_>>();
        for (i, filter) in filters.iter().enumerate() {
            stats.transfers.record(i, dealer_role, filter.payload_bytes());
        }

        // round 2: fold and broadcast
        let start = Instant::now();
        let folded = dealer.fold_filters(&filters, rng)?;
        stats.timings.record(dealer_role, Phase::Online, start.elapsed());
        for i in 0..num_parties {
            stats.transfers.record(dealer_role, i, folded.payload_bytes());
        }

        // round 3: all-pairs exchange of decryption shares
        let mut all_shares = Vec::with_capacity(num_parties);
        for (i, party) in parties.iter().enumerate() {
            let start = Instant::now();
            let shares = party.decryption_shares(&folded);
            stats.timings.record(i, Phase::Online, start.elapsed());
            let bytes = shares.payload_bytes();
            for j in 0..num_parties {
                if j != i {
                    stats.transfers.record(i, j, bytes);
                }
            }
            all_shares.push(shares);
        }

        // round 4: every party rebuilds the filter and checks its elements
        let mut intersections = Vec::with_capacity(num_parties);
        for (i, party) in parties.iter().enumerate() {
            let start = Instant::now();
            let view = party.intersect(&all_shares)?;
            stats.timings.record(i, Phase::Online, start.elapsed());
            intersections.push(view);
        }

        Ok(RunReport {
            intersections,
            stats,
        })
    }
}

/// A party role: dataset, key share and encrypted filter.
pub struct IntegratedParty {
    key: PrivateKeyShare,
    dataset: Vec<String>,
    encoded_filter: Vec<Ciphertext>,
    bloom_hashes: usize,
}

impl IntegratedParty {
    /// Insert `dataset` into a fresh filter and encrypt it directly.
    pub fn init<RNG>(
        key: PrivateKeyShare,
        dataset: Vec<String>,
        bloom_size: usize,
        bloom_hashes: usize,
        rng: &mut RNG,
    ) -> Result<Self>
    where
        RNG: CryptoRng + Rng,
    {
        let mut filter = BloomFilter::new(bloom_size, bloom_hashes)?;
        for x in &dataset {
            filter.insert(x);
        }
        let encoded_filter = filter.encode(key.public(), BitEncoding::Direct, rng)?;
        Ok(Self {
            key,
            dataset,
            encoded_filter,
            bloom_hashes,
        })
    }

    /// The party's first message.
    pub fn encoded_filter(&self) -> &[Ciphertext] {
        &self.encoded_filter
    }

    /// Partially decrypt every position of the folded vector.
    pub fn decryption_shares(&self, folded: &[Ciphertext]) -> Vec<DecryptionShare> {
        folded.iter().map(|c| self.key.partial_decrypt(c)).collect()
    }

    /// Combine all parties' share vectors position-wise, rebuild the
    /// intersection filter and keep the own elements it contains.
    pub fn intersect(&self, shares: &[Vec<DecryptionShare>]) -> Result<Vec<String>> {
        let public = self.key.public();
        let size = self.encoded_filter.len();
        if shares.len() != public.num_shares() {
            bail!(
                "expected {} share vectors, got {} @{}:{}",
                public.num_shares(),
                shares.len(),
                file!(),
                line!()
            );
        }
        for (i, row) in shares.iter().enumerate() {
            if row.len() != size {
                bail!(
                    "party {} shared {} decryptions, filter size is {} @{}:{}",
                    i,
                    row.len(),
                    size,
                    file!(),
                    line!()
                );
            }
        }

        let mut bits = Vec::with_capacity(size);
        for j in 0..size {
            let column = shares.iter().map(|row| row[j].clone()).collect::<Vec<_>>();
            let value = public.combine(&column).with_context(|| {
                format!("combining shares for position {} @{}:{}", j, file!(), line!())
            })?;
            bits.push(value.is_zero());
        }
        let filter = BloomFilter::from_bits(size, self.bloom_hashes, &bits)?;

        Ok(self
            .dataset
            .iter()
            .filter(|x| filter.check(x))
            .cloned()
            .collect())
    }
}

/// The dealer role: holds the public key only.
pub struct IntegratedDealer {
    public: PublicKey,
    num_parties: usize,
    bloom_size: usize,
}

impl IntegratedDealer {
    /// A dealer expecting `num_parties` filters of `bloom_size` entries.
    pub fn new(public: PublicKey, num_parties: usize, bloom_size: usize) -> Result<Self> {
        if num_parties < 2 {
            bail!("num_parties (={}) < 2 @{}:{}", num_parties, file!(), line!());
        }
        Ok(Self {
            public,
            num_parties,
            bloom_size,
        })
    }

    /// Position-wise sum of all filters, shifted down by the party count:
    /// a position decrypts to zero iff every party had its bit set.
    pub fn fold_filters<RNG>(
        &self,
        filters: &[Vec<Ciphertext>],
        rng: &mut RNG,
    ) -> Result<Vec<Ciphertext>>
    where
        RNG: CryptoRng + Rng,
    {
        if filters.len() != self.num_parties {
            bail!(
                "expected {} filters, got {} @{}:{}",
                self.num_parties,
                filters.len(),
                file!(),
                line!()
            );
        }
        for (i, filter) in filters.iter().enumerate() {
            if filter.len() != self.bloom_size {
                bail!(
                    "party {} sent a filter of {} entries, expected {} @{}:{}",
                    i,
                    filter.len(),
                    self.bloom_size,
                    file!(),
                    line!()
                );
            }
        }

        let offset = self.public.modulus() - BigUint::from(self.num_parties);
        let neg_count = self
            .public
            .encrypt(&offset, rng)
            .with_context(|| format!("@{}:{}", file!(), line!()))?;

        // filters is non-empty, num_parties >= 2
        let (first, rest) = (&filters[0], &filters[1..]);
        Ok((0..self.bloom_size)
            .map(|j| {
                let mut acc = first[j].clone();
                for filter in rest {
                    acc = self.public.add(&acc, &filter[j]);
                }
                self.public
                    .rerandomize(&self.public.add(&acc, &neg_count), rng)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set_utils::create_sets_with_check;
    use rand::thread_rng;
    use std::collections::HashSet;

    fn test_integrated_base(num_parties: usize, set_size: usize, common_size: usize) {
        let mut rng = thread_rng();
        let (common, datasets) =
            create_sets_with_check(num_parties, set_size, common_size, 10, &mut rng).unwrap();

        let protocol = IntegratedMpsi::with_derived_params(48, set_size, 30).unwrap();
        let report = protocol.run(&datasets, &mut rng).unwrap();

        let expected: HashSet<String> = common.into_iter().collect();
        assert_eq!(report.intersections.len(), num_parties);
        for view in &report.intersections {
            let got: HashSet<String> = view.iter().cloned().collect();
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn test_two_parties() {
        test_integrated_base(2, 10, 3);
    }

    #[test]
    fn test_five_parties() {
        test_integrated_base(5, 16, 5);
    }

    #[test]
    fn test_empty_intersection() {
        test_integrated_base(3, 12, 0);
    }

    #[test]
    fn test_four_parties_one_planted_element() {
        // the 2^-50 rate pushes the derived filter past 3600 positions
        let mut rng = thread_rng();
        let (common, datasets) = create_sets_with_check(4, 50, 1, 10, &mut rng).unwrap();

        let protocol = IntegratedMpsi::with_derived_params(48, 50, 50).unwrap();
        let report = protocol.run(&datasets, &mut rng).unwrap();

        let expected: HashSet<String> = common.into_iter().collect();
        assert_eq!(report.intersections.len(), 4);
        for view in &report.intersections {
            let got: HashSet<String> = view.iter().cloned().collect();
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn test_dealer_rejects_missing_filters() {
        let mut rng = thread_rng();
        let keys = key_gen(32, 3, 3, &mut rng).unwrap();
        let public = keys[0].public().clone();

        let party = IntegratedParty::init(
            keys[0].clone(),
            vec!["A".to_string()],
            64,
            3,
            &mut rng,
        )
        .unwrap();

        let dealer = IntegratedDealer::new(public, 3, 64).unwrap();
        let filters = vec![party.encoded_filter().to_vec()];
        assert!(dealer.fold_filters(&filters, &mut rng).is_err());
    }

    #[test]
    fn test_rejects_wrong_threshold_keys() {
        let mut rng = thread_rng();
        let (_, datasets) = create_sets_with_check(3, 8, 2, 10, &mut rng).unwrap();

        let protocol = IntegratedMpsi::with_derived_params(32, 8, 20).unwrap();
        // 3 parties need a 3-of-3 key
        let keys = key_gen(32, 3, 2, &mut rng).unwrap();

        assert!(protocol.run_with_keys(&datasets, &keys, &mut rng).is_err());
    }

    #[test]
    fn test_intersect_rejects_missing_share_vector() {
        let mut rng = thread_rng();
        let keys = key_gen(32, 2, 2, &mut rng).unwrap();

        let parties = keys
            .iter()
            .map(|key| {
                IntegratedParty::init(
                    key.clone(),
                    vec!["A".to_string()],
                    64,
                    3,
                    &mut rng,
                )
                .unwrap()
            })
            .collect::<Vec<_>>();

        let dealer = IntegratedDealer::new(keys[0].public().clone(), 2, 64).unwrap();
        let filters = parties
            .iter()
            .map(|p| p.encoded_filter().to_vec())
            .collect::<Vec<_>>();
        let folded = dealer.fold_filters(&filters, &mut rng).unwrap();

        let shares = vec![parties[0].decryption_shares(&folded)];
        assert!(parties[0].intersect(&shares).is_err());
    }
}
