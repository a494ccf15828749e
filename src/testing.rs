use crate::data::{Dataset, Observation, Stain};
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::Rng;

/// Cells drawn from `count = beta[stain] * intensity + noise`, noise uniform in
/// `[-noise, noise]`, rounded to whole cells. Stains alternate row by row.
pub(crate) fn synthetic_cells(rng: &mut StdRng, n: usize, beta: [f64; 2], noise: f64) -> Dataset {
    let intensity_distribution = Uniform::new(1.0, 10.0);
    let noise_distribution = Uniform::new_inclusive(-noise, noise);
    (0..n)
        .map(|i| {
            let stain = Stain::ALL[i % 2];
            let intensity = rng.sample(intensity_distribution);
            let count = beta[stain.index()] * intensity + rng.sample(noise_distribution);
            Observation::new(stain, intensity, Some(count.round().max(0.0) as u32))
        })
        .collect::<Result<Dataset, _>>()
        .expect("intensities are drawn from [1, 10)")
}

pub(crate) fn precision_round(n: f64, precision: i32) -> f64 {
    let p = (10.0_f64).powi(precision);
    (n * p).round() / p
}

#[test]
fn test_round() {
    assert_eq!(0.3, precision_round(0.3333, 1));
    assert_eq!(0.2343, precision_round(0.2343123123123, 4));
}
