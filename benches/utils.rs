#![allow(dead_code)]
use cellcount::{Dataset, Observation, Stain};
use rand::distributions::Uniform;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub(crate) fn create_cells(n_samples: usize) -> Dataset {
    // reproducible seed
    let mut rng = StdRng::seed_from_u64(1903);

    let intensity_distribution = Uniform::new(1.0, 10.0);
    let noise_distribution = Uniform::new(-4.0, 4.0);
    let slopes = [5.0, 8.0];

    (0..n_samples)
        .map(|i| {
            let stain = Stain::ALL[i % 2];
            let intensity = rng.sample(intensity_distribution);
            let count = slopes[stain.index()] * intensity + rng.sample(noise_distribution);
            Observation::new(stain, intensity, Some(count.round().max(0.0) as u32))
        })
        .collect::<Result<Dataset, _>>()
        .unwrap()
}

// prediction_pair
//
// Generates (y, y_hat)-tuple
pub(crate) fn prediction_pair(n_samples: usize) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(1903);
    let y_distribution = Uniform::new(0.0, 100.0);
    let noise_distribution = Uniform::new(-1.0, 1.0);
    let y: Vec<f64> = (0..n_samples).map(|_| rng.sample(y_distribution)).collect();
    let y_hat = y.iter().map(|v| v + rng.sample(noise_distribution)).collect();
    (y, y_hat)
}
