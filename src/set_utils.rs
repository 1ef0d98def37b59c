//! Utility functions for creating string datasets for the set intersection protocols.

use anyhow::{bail, Result};
use rand::seq::SliceRandom;
use rand::{CryptoRng, Rng};
use std::collections::HashSet;

const ELEMENT_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Draw one uppercase-alphanumeric element of `element_len` characters.
pub fn random_element<RNG>(element_len: usize, rng: &mut RNG) -> String
where
    RNG: CryptoRng + Rng,
{
    (0..element_len)
        .map(|_| ELEMENT_CHARS[rng.gen_range(0..ELEMENT_CHARS.len())] as char)
        .collect()
}

/// Create sets for the set intersection protocol with a check that intersection size is common_size.
pub fn create_sets_with_check<RNG>(
    nparties: usize,
    set_size: usize,
    common_size: usize,
    element_len: usize,
    rng: &mut RNG,
) -> Result<(Vec<String>, Vec<Vec<String>>)>
where
    RNG: CryptoRng + Rng,
{
    let mut sets =
        create_party_sets(nparties, set_size, common_size, element_len, rng)?;

    let set0 = sets[0].clone();
    let common = sets.iter().skip(1).fold(set0, |acc, set| {
        acc.into_iter()
            .filter(|x| set.contains(x))
            .collect::<Vec<_>>()
    });

    for set in sets.iter_mut() {
        set.shuffle(rng);
    }

    Ok((common, sets))
}

/// Create sets for the set intersection protocol without checks.
/// It is useful to create big sets for performance testing.
pub fn create_sets_without_check<RNG>(
    nparties: usize,
    set_size: usize,
    common_size: usize,
    element_len: usize,
    rng: &mut RNG,
) -> Result<(Vec<String>, Vec<Vec<String>>)>
where
    RNG: CryptoRng + Rng,
{
    let common = (0..common_size)
        .map(|_| random_element(element_len, rng))
        .collect::<Vec<_>>();

    let mut sets =
        create_party_sets_from(&common, nparties, set_size, element_len, rng)?;

    for set in sets.iter_mut() {
        set.shuffle(rng);
    }

    Ok((common, sets))
}

/// Create sets for the set intersection protocol so that intersection of sets is random size.
pub fn create_sets_random<RNG>(
    nparties: usize,
    set_size: usize,
    element_len: usize,
    rng: &mut RNG,
) -> Result<(Vec<String>, Vec<Vec<String>>)>
where
    RNG: CryptoRng + Rng,
{
    let common_size = rng.gen_range(0..set_size);

    create_sets_without_check(nparties, set_size, common_size, element_len, rng)
}

fn create_party_sets<RNG>(
    nparties: usize,
    set_size: usize,
    common_size: usize,
    element_len: usize,
    rng: &mut RNG,
) -> Result<Vec<Vec<String>>>
where
    RNG: CryptoRng + Rng,
{
    let common = (0..common_size)
        .map(|_| random_element(element_len, rng))
        .collect::<Vec<_>>();

    create_party_sets_from(&common, nparties, set_size, element_len, rng)
}

fn create_party_sets_from<RNG>(
    common: &[String],
    nparties: usize,
    set_size: usize,
    element_len: usize,
    rng: &mut RNG,
) -> Result<Vec<Vec<String>>>
where
    RNG: CryptoRng + Rng,
{
    if nparties <= 1 {
        bail!("nparties (={}) <= 1 @{}:{}", nparties, file!(), line!());
    }

    if set_size < common.len() {
        bail!(
            "set_size (={}) < common_size (={}) @{}:{}",
            set_size,
            common.len(),
            file!(),
            line!()
        );
    }

    let sets = (0..nparties)
        .map(|i| {
            let mut set = HashSet::<String>::from_iter(common.iter().cloned());

            // marker elements: marker `c` lands in every set except party c's,
            // so it can never survive into the intersection
            let mut counter: usize = 0;
            while set.len() < set_size {
                if counter >= nparties {
                    break;
                }

                if i == counter {
                    counter += 1;
                    continue;
                }

                let x = format!("{:0width$}", counter, width = element_len);

                set.insert(x);

                counter += 1;
            }

            while set.len() < set_size {
                set.insert(random_element(element_len, rng));
            }
            Ok(set.into_iter().collect::<Vec<_>>())
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(sets)
}
