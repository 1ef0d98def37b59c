use criterion::Bencher;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, Instant};
use threshold_mpsi_with_paillier::paillier::key_gen;
use threshold_mpsi_with_paillier::protocol::{AdditiveMpsi, IntegratedMpsi, PolynomialMpsi};
use threshold_mpsi_with_paillier::set_utils::create_sets_random;

pub(crate) const PRIME_BITS: u64 = 32;
pub(crate) const FP_EXPONENT: u32 = 20;
pub(crate) const BLIND_BITS: u64 = 100;
pub(crate) const ELEMENT_LEN: usize = 10;

const BENCH_SEED: u64 = 0x5eed;

pub(crate) fn additive_fn(nparties: usize) -> impl FnMut(&mut Bencher<'_>, &usize) {
    move |b, &size| {
        let mut rng = StdRng::seed_from_u64(BENCH_SEED);
        // key generation is kept out of the measurement
        let keys = key_gen(PRIME_BITS, nparties, nparties - 1, &mut rng).unwrap();
        let protocol =
            AdditiveMpsi::with_derived_params(PRIME_BITS, size, FP_EXPONENT, BLIND_BITS).unwrap();

        b.iter_custom(move |iter| {
            let (_common, sets) =
                create_sets_random(nparties, size, ELEMENT_LEN, &mut rng).unwrap();
            let mut total_time = Duration::new(0, 0);

            for _ in 0..iter {
                let start = Instant::now();
                let _res = protocol.run_with_keys(&sets, &keys, &mut rng).unwrap();
                total_time += start.elapsed();
            }

            total_time
        });
    }
}

pub(crate) fn integrated_fn(nparties: usize) -> impl FnMut(&mut Bencher<'_>, &usize) {
    move |b, &size| {
        let mut rng = StdRng::seed_from_u64(BENCH_SEED);
        let keys = key_gen(PRIME_BITS, nparties, nparties, &mut rng).unwrap();
        let protocol =
            IntegratedMpsi::with_derived_params(PRIME_BITS, size, FP_EXPONENT).unwrap();

        b.iter_custom(move |iter| {
            let (_common, sets) =
                create_sets_random(nparties, size, ELEMENT_LEN, &mut rng).unwrap();
            let mut total_time = Duration::new(0, 0);

            for _ in 0..iter {
                let start = Instant::now();
                let _res = protocol.run_with_keys(&sets, &keys, &mut rng).unwrap();
                total_time += start.elapsed();
            }

            total_time
        });
    }
}

pub(crate) fn polynomial_fn(nparties: usize) -> impl FnMut(&mut Bencher<'_>, &usize) {
    move |b, &size| {
        let mut rng = StdRng::seed_from_u64(BENCH_SEED);
        let keys = key_gen(PRIME_BITS, nparties, nparties - 1, &mut rng).unwrap();
        let protocol = PolynomialMpsi {
            prime_bits: PRIME_BITS,
            mask_bits: BLIND_BITS,
        };

        b.iter_custom(move |iter| {
            let (_common, sets) =
                create_sets_random(nparties, size, ELEMENT_LEN, &mut rng).unwrap();
            let mut total_time = Duration::new(0, 0);

            for _ in 0..iter {
                let start = Instant::now();
                let _res = protocol.run_with_keys(&sets, &keys, &mut rng).unwrap();
                total_time += start.elapsed();
            }

            total_time
        });
    }
}
