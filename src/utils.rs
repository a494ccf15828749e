use crate::errors::CountError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cmp::Ordering;

/// Create a string of all available items.
pub fn items_to_strings(items: Vec<&str>) -> String {
    let mut s = String::new();
    for i in items {
        s.push_str(i);
        s.push_str(&String::from(", "));
    }
    s
}

pub fn fmt_vec_output(v: &[f64]) -> String {
    let mut res = String::new();
    if let Some(last) = v.len().checked_sub(1) {
        if last == 0 {
            return format!("{:.4}", v[0]);
        }
        for n in &v[..last] {
            res.push_str(format!("{:.4}", n).as_str());
            res.push_str(", ");
        }
        res.push_str(format!("{:.4}", &v[last]).as_str());
    }
    res
}

// Validation
pub fn validate_float_parameter(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), CountError> {
    if value.is_nan() || value < min || max < value {
        let ex_msg = format!("real value within range {} and {}", min, max);
        Err(CountError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Check that a probability is strictly between `min` and `max`.
pub fn validate_open_interval(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), CountError> {
    if value.is_nan() || value <= min || max <= value {
        let ex_msg = format!("real value strictly between {} and {}", min, max);
        Err(CountError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Independent generator for one trial of a resampling run.
///
/// The stream only depends on `seed` and `trial`, so trials give the same draws
/// whichever thread runs them and in whatever order.
pub fn trial_rng(seed: u64, trial: usize) -> StdRng {
    StdRng::seed_from_u64(seed ^ (trial as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

pub fn mean(v: &[f64]) -> Result<f64, CountError> {
    if v.is_empty() {
        return Err(CountError::EmptyQuantileInput("mean".to_string()));
    }
    Ok(v.iter().sum::<f64>() / v.len() as f64)
}

/// Population variance, the mean squared deviation from the mean.
pub fn variance(v: &[f64]) -> Result<f64, CountError> {
    let m = mean(v)?;
    Ok(v.iter().map(|x| (x - m).powi(2)).sum::<f64>() / v.len() as f64)
}

fn sorted(v: &[f64]) -> Vec<f64> {
    let mut s = v.to_vec();
    s.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    s
}

fn quantile_sorted(s: &[f64], p: f64) -> f64 {
    let h = (s.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    s[lo] + (h - lo as f64) * (s[hi] - s[lo])
}

/// Empirical quantile, interpolating linearly between order statistics.
///
/// * `v` - Values to find the quantile of, in any order.
/// * `p` - Probability in [0, 1].
pub fn quantile(v: &[f64], p: f64) -> Result<f64, CountError> {
    Ok(quantiles(v, &[p])?[0])
}

/// Several empirical quantiles of the same values, sorting only once.
pub fn quantiles(v: &[f64], p: &[f64]) -> Result<Vec<f64>, CountError> {
    if v.is_empty() {
        return Err(CountError::EmptyQuantileInput("a quantile".to_string()));
    }
    for p_ in p {
        validate_float_parameter(*p_, 0.0, 1.0, "quantile")?;
    }
    let s = sorted(v);
    Ok(p.iter().map(|p_| quantile_sorted(&s, *p_)).collect())
}
