use rand::{rngs::SmallRng, SeedableRng};

/// Rng owned by a policy, seeded when reproducibility matters.
#[derive(Debug, Clone)]
pub struct MaybeSeededRng {
    pub seed: Option<u64>,
    rng: SmallRng,
}

impl MaybeSeededRng {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = if let Some(seed) = seed {
            SmallRng::seed_from_u64(seed)
        } else {
            SmallRng::from_os_rng()
        };

        Self { seed, rng }
    }

    pub fn get_rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }
}

// splitmix64 finalizer
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE5_E4B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Derives an independent stream seed from a base seed and a path of indices,
/// e.g. `derive_seed(base, &[environment, repetition, stream])`.
pub fn derive_seed(base: u64, path: &[u64]) -> u64 {
    path.iter().fold(mix(base), |acc, &part| mix(acc ^ mix(part)))
}

pub fn seeded(base: u64, path: &[u64]) -> SmallRng {
    SmallRng::seed_from_u64(derive_seed(base, path))
}
