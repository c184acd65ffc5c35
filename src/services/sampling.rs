use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::image::ImageKey;

/// Draw `sample_size` distinct keys uniformly from `1..=pool_size`.
///
/// Returns `None` when the pool cannot supply that many distinct keys.
pub fn sample_keys<R: Rng + ?Sized>(
    rng: &mut R,
    pool_size: u32,
    sample_size: u32,
) -> Option<Vec<ImageKey>> {
    if sample_size > pool_size {
        return None;
    }

    let keys = rand::seq::index::sample(rng, pool_size as usize, sample_size as usize)
        .into_iter()
        .map(|i| ImageKey::from_index(i as u32 + 1))
        .collect();
    Some(keys)
}

/// Seeded when reproducible runs are wanted, entropy-seeded otherwise.
pub fn sampling_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
