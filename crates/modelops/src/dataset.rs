use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const DATA_SEED: u64 = 42;

/// Standard-normal draw (Box–Muller).
fn standard_normal(rng: &mut StdRng) -> f64 {
    // 1 - U keeps the log argument in (0, 1]
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Seeded synthetic binary task: features ~ N(0, 1), label is 1 when the
/// row sum is positive.
pub fn generate_sample_data(n_samples: usize, n_features: usize) -> (Vec<Vec<f64>>, Vec<u32>) {
    let mut rng = StdRng::seed_from_u64(DATA_SEED);
    let x: Vec<Vec<f64>> = (0..n_samples)
        .map(|_| (0..n_features).map(|_| standard_normal(&mut rng)).collect())
        .collect();
    let y = x.iter().map(|row| u32::from(row.iter().sum::<f64>() > 0.0)).collect();
    (x, y)
}
