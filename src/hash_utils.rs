use num_bigint::BigUint;
use sha2::{Digest, Sha256};

// H_i: str -> [0, size)
#[inline]
pub fn hash_to_index(i: usize, x: &str, size: usize) -> usize {
    let mut hasher = Sha256::new();
    hasher.update((i as u64).to_be_bytes());
    hasher.update(x.as_bytes());
    let res = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&res.as_slice()[..8]);
    (u64::from_be_bytes(head) % size as u64) as usize
}

// H: str -> Z_modulus
#[inline]
pub fn hash_to_residue(x: &str, modulus: &BigUint) -> BigUint {
    let mut hasher = Sha256::new();
    hasher.update(x.as_bytes());
    let res = hasher.finalize();
    BigUint::from_bytes_be(res.as_slice()) % modulus
}
