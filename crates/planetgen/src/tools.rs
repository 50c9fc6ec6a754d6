use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Draws a short, human-typeable seed. This is the only place ambient
/// randomness is used; everything downstream is derived from the seed.
pub fn generate_seed8() -> u32 {
    seed8_from(&mut rand::rng())
}

/// An eight-digit seed drawn from `rng`.
pub fn seed8_from(rng: &mut impl Rng) -> u32 {
    rng.random_range(0u32..100_000_000u32)
}

pub fn expand_seed64(code: u32) -> u64 {
    splitmix64(code as u64)
}

pub fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Independent seed for one pipeline stage.
pub fn stage_seed(seed: u64, salt: u64) -> u64 {
    splitmix64(seed ^ splitmix64(salt))
}

pub fn stage_rng(seed: u64, salt: u64) -> StdRng {
    StdRng::seed_from_u64(stage_seed(seed, salt))
}

/// Hashes an index together with a seed; used for per-item choices that
/// must not depend on the order in which the rng was consumed.
pub fn hash_index(index: usize, seed: u64) -> u64 {
    let a = splitmix64(seed ^ 0x9E37);
    splitmix64(a ^ (index as u64).wrapping_mul(0xC2B2AE3D))
}
