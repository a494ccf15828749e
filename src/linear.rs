//! Linear
//!
//! Ordinary least squares fit of counts on stain-specific intensity slopes,
//! optionally with intercepts.
use crate::data::{Dataset, Stain};
use crate::errors::CountError;
use crate::model::{Predictor, Regressor};
use crate::utils::{fmt_vec_output, items_to_strings};
use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Which coefficients the model has.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ModelSpec {
    /// `count ~ intensity:stain`, one slope per stain and no intercept.
    #[default]
    SlopesOnly,
    /// `count ~ 1 + intensity:stain`, a common intercept and one slope per stain.
    SharedIntercept,
    /// `count ~ stain + intensity:stain`, an intercept and a slope per stain.
    SeparateIntercepts,
}

/// A single coefficient of a linear model.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Term {
    Intercept,
    StainIntercept(Stain),
    Slope(Stain),
}

impl Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Term::Intercept => write!(f, "intercept"),
            Term::StainIntercept(s) => write!(f, "stain{}", s),
            Term::Slope(s) => write!(f, "intensity:stain{}", s),
        }
    }
}

impl Term {
    fn value(&self, stain: Stain, intensity: f64) -> f64 {
        match self {
            Term::Intercept => 1.0,
            Term::StainIntercept(s) => {
                if stain == *s {
                    1.0
                } else {
                    0.0
                }
            }
            Term::Slope(s) => {
                if stain == *s {
                    intensity
                } else {
                    0.0
                }
            }
        }
    }
}

impl FromStr for ModelSpec {
    type Err = CountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SlopesOnly" => Ok(ModelSpec::SlopesOnly),
            "SharedIntercept" => Ok(ModelSpec::SharedIntercept),
            "SeparateIntercepts" => Ok(ModelSpec::SeparateIntercepts),
            _ => Err(CountError::ParseString(
                s.to_string(),
                "ModelSpec".to_string(),
                items_to_strings(vec!["SlopesOnly", "SharedIntercept", "SeparateIntercepts"]),
            )),
        }
    }
}

impl ModelSpec {
    /// Coefficients of the model, in design matrix column order.
    pub fn terms(&self) -> Vec<Term> {
        let slopes = Stain::ALL.iter().map(|s| Term::Slope(*s));
        match self {
            ModelSpec::SlopesOnly => slopes.collect(),
            ModelSpec::SharedIntercept => std::iter::once(Term::Intercept).chain(slopes).collect(),
            ModelSpec::SeparateIntercepts => Stain::ALL
                .iter()
                .map(|s| Term::StainIntercept(*s))
                .chain(slopes)
                .collect(),
        }
    }

    pub fn n_parameters(&self) -> usize {
        self.terms().len()
    }

    /// Row-major design matrix of `data` under this spec.
    pub fn design_matrix(&self, data: &Dataset) -> DMatrix<f64> {
        let terms = self.terms();
        let values: Vec<f64> = data
            .iter()
            .flat_map(|o| terms.iter().map(move |t| t.value(o.stain(), o.intensity())))
            .collect();
        DMatrix::from_row_slice(data.len(), terms.len(), &values)
    }

    /// Least squares fit of the counts in `data`.
    ///
    /// The system is solved through a singular value decomposition. Designs
    /// with fewer rows than coefficients, or with linearly dependent columns
    /// (for example a stain that does not appear in `data`), are rejected.
    pub fn fit(&self, data: &Dataset) -> Result<LinearModel, CountError> {
        let p = self.n_parameters();
        let n = data.len();
        if n < p {
            return Err(CountError::DegenerateInput(format!(
                "{} rows are not enough to fit {} coefficients",
                n, p
            )));
        }
        let y = DVector::from_vec(data.targets()?);
        let beta = solve_least_squares(self.design_matrix(data), y)?;
        let coefficients: Vec<f64> = beta.iter().copied().collect();
        debug!("Fitted {:?} on {} rows: [{}]", self, n, fmt_vec_output(&coefficients));
        Ok(LinearModel {
            spec: *self,
            coefficients,
        })
    }
}

/// Minimum norm solution of `x * beta = y`, rejecting non-finite entries and
/// rank deficient designs.
fn solve_least_squares(x: DMatrix<f64>, y: DVector<f64>) -> Result<DVector<f64>, CountError> {
    let (n, p) = x.shape();
    if let Some(i) = x.iter().position(|v| !v.is_finite()) {
        // Column-major storage.
        return Err(CountError::DegenerateInput(format!(
            "design matrix has a non-finite entry in row {}",
            i % n
        )));
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(CountError::DegenerateInput("response has a non-finite value".to_string()));
    }
    let svd = x.svd(true, true);
    let largest = svd.singular_values.max();
    let tol = largest * (n.max(p) as f64) * f64::EPSILON;
    let rank = if largest > 0.0 { svd.rank(tol) } else { 0 };
    if rank < p {
        return Err(CountError::DegenerateInput(format!(
            "design matrix has rank {} but {} coefficients, check that every stain is present with non-zero intensity",
            rank, p
        )));
    }
    svd.solve(&y, tol).map_err(|e| CountError::DegenerateInput(e.to_string()))
}

impl Regressor for ModelSpec {
    type Model = LinearModel;

    fn fit(&self, data: &Dataset) -> Result<LinearModel, CountError> {
        ModelSpec::fit(self, data)
    }
}

/// A fitted linear model. Immutable once fit.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct LinearModel {
    spec: ModelSpec,
    coefficients: Vec<f64>,
}

impl LinearModel {
    pub fn spec(&self) -> ModelSpec {
        self.spec
    }

    pub fn terms(&self) -> Vec<Term> {
        self.spec.terms()
    }

    /// Coefficients in the order of `terms`.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Value of a single coefficient.
    pub fn coefficient(&self, term: Term) -> Result<f64, CountError> {
        self.terms()
            .iter()
            .position(|t| *t == term)
            .map(|i| self.coefficients[i])
            .ok_or_else(|| missing_term(self.spec, term))
    }

    pub fn predict_one(&self, stain: Stain, intensity: f64) -> f64 {
        self.terms()
            .iter()
            .zip(&self.coefficients)
            .map(|(t, c)| t.value(stain, intensity) * c)
            .sum()
    }

    /// Predictions along a grid of intensities for one stain, for drawing the
    /// fitted line.
    pub fn fitted_line(&self, stain: Stain, intensities: &[f64]) -> Vec<f64> {
        intensities.iter().map(|x| self.predict_one(stain, *x)).collect()
    }
}

impl Predictor for LinearModel {
    fn predict(&self, data: &Dataset) -> Vec<f64> {
        data.iter().map(|o| self.predict_one(o.stain(), o.intensity())).collect()
    }
}

fn missing_term(spec: ModelSpec, term: Term) -> CountError {
    let terms: Vec<String> = spec.terms().iter().map(|t| t.to_string()).collect();
    CountError::InvalidParameter(
        "term".to_string(),
        format!("one of {}", terms.join(", ")),
        term.to_string(),
    )
}

/// Statistic that refits `spec` and reads off one coefficient, for use with the
/// bootstrap.
pub fn coefficient_statistic(
    spec: ModelSpec,
    term: Term,
) -> Result<impl Fn(&Dataset) -> Result<f64, CountError> + Sync + Send, CountError> {
    if !spec.terms().contains(&term) {
        return Err(missing_term(spec, term));
    }
    Ok(move |data: &Dataset| spec.fit(data)?.coefficient(term))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Observation;
    use crate::testing::synthetic_cells;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn exact_data() -> Dataset {
        // count = 3 * intensity for stain one, 5 * intensity for stain two.
        let rows = [(Stain::One, 1.0), (Stain::One, 2.0), (Stain::Two, 1.0), (Stain::Two, 3.0)];
        rows.iter()
            .map(|(s, x)| {
                let slope = if *s == Stain::One { 3.0 } else { 5.0 };
                Observation::new(*s, *x, Some((slope * x) as u32)).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_terms() {
        assert_eq!(ModelSpec::SlopesOnly.n_parameters(), 2);
        assert_eq!(
            ModelSpec::SharedIntercept.terms(),
            vec![Term::Intercept, Term::Slope(Stain::One), Term::Slope(Stain::Two)]
        );
        assert_eq!(ModelSpec::SeparateIntercepts.n_parameters(), 4);
        assert_eq!(Term::Slope(Stain::Two).to_string(), "intensity:stain2");
    }

    #[test]
    fn test_design_matrix() {
        let x = ModelSpec::SharedIntercept.design_matrix(&exact_data());
        assert_eq!(x.nrows(), 4);
        assert_eq!(x.ncols(), 3);
        assert_eq!(x[(1, 0)], 1.0);
        assert_eq!(x[(1, 1)], 2.0);
        assert_eq!(x[(1, 2)], 0.0);
        assert_eq!(x[(3, 1)], 0.0);
        assert_eq!(x[(3, 2)], 3.0);
    }

    #[test]
    fn test_fit_exact() {
        let model = ModelSpec::SlopesOnly.fit(&exact_data()).unwrap();
        assert!((model.coefficient(Term::Slope(Stain::One)).unwrap() - 3.0).abs() < 1e-10);
        assert!((model.coefficient(Term::Slope(Stain::Two)).unwrap() - 5.0).abs() < 1e-10);
        assert!((model.predict_one(Stain::Two, 2.0) - 10.0).abs() < 1e-10);
        assert!(model.coefficient(Term::Intercept).is_err());
        let res = model.residuals(&exact_data()).unwrap();
        assert!(res.iter().all(|r| r.abs() < 1e-10));
    }

    #[test]
    fn test_fit_with_intercept() {
        // count = 2 + 4 * intensity, both stains.
        let data: Dataset = [(Stain::One, 1.0), (Stain::One, 2.0), (Stain::Two, 1.0), (Stain::Two, 4.0)]
            .iter()
            .map(|(s, x)| Observation::new(*s, *x, Some((2.0 + 4.0 * x) as u32)).unwrap())
            .collect();
        let model = ModelSpec::SharedIntercept.fit(&data).unwrap();
        assert!((model.coefficient(Term::Intercept).unwrap() - 2.0).abs() < 1e-9);
        assert!((model.coefficient(Term::Slope(Stain::One)).unwrap() - 4.0).abs() < 1e-9);
        assert!((model.coefficient(Term::Slope(Stain::Two)).unwrap() - 4.0).abs() < 1e-9);
        let line = model.fitted_line(Stain::One, &[0.0, 10.0]);
        assert!((line[0] - 2.0).abs() < 1e-9);
        assert!((line[1] - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_separate_intercepts() {
        let data: Dataset = [
            (Stain::One, 1.0, 3),
            (Stain::One, 2.0, 5),
            (Stain::One, 3.0, 7),
            (Stain::Two, 1.0, 12),
            (Stain::Two, 2.0, 14),
        ]
        .iter()
        .map(|(s, x, c)| Observation::new(*s, *x, Some(*c)).unwrap())
        .collect();
        let model = ModelSpec::SeparateIntercepts.fit(&data).unwrap();
        assert!((model.coefficient(Term::StainIntercept(Stain::One)).unwrap() - 1.0).abs() < 1e-9);
        assert!((model.coefficient(Term::StainIntercept(Stain::Two)).unwrap() - 10.0).abs() < 1e-9);
        assert!((model.coefficient(Term::Slope(Stain::Two)).unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_degenerate() {
        let data = exact_data();
        // Stain two is absent from the first two rows.
        let only_one = data.subset(&[0, 1]).unwrap();
        assert!(matches!(
            ModelSpec::SlopesOnly.fit(&only_one),
            Err(CountError::DegenerateInput(_))
        ));
        // Fewer rows than coefficients.
        let tiny = data.subset(&[0, 2]).unwrap();
        assert!(matches!(
            ModelSpec::SeparateIntercepts.fit(&tiny),
            Err(CountError::DegenerateInput(_))
        ));
        assert!(matches!(
            ModelSpec::SlopesOnly.fit(&Dataset::default()),
            Err(CountError::DegenerateInput(_))
        ));
        // All intensities zero.
        let zeros: Dataset = (0..4)
            .map(|i| Observation::new(if i % 2 == 0 { Stain::One } else { Stain::Two }, 0.0, Some(1)).unwrap())
            .collect();
        assert!(matches!(
            ModelSpec::SlopesOnly.fit(&zeros),
            Err(CountError::DegenerateInput(_))
        ));
    }

    #[test]
    fn test_solve_rejects_non_finite_design() {
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        for bad in [f64::INFINITY, f64::NAN, f64::NEG_INFINITY] {
            let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, bad, 0.0, 0.0, 2.0]);
            match solve_least_squares(x, y.clone()) {
                Err(CountError::DegenerateInput(msg)) => assert!(msg.contains("row 1"), "{}", msg),
                other => panic!("expected a degenerate input error, got {:?}", other),
            }
        }
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 2.0, 0.0, 0.0, 2.0]);
        let bad_y = DVector::from_vec(vec![1.0, f64::NAN, 3.0]);
        assert!(matches!(solve_least_squares(x, bad_y), Err(CountError::DegenerateInput(_))));
    }

    #[test]
    fn test_fit_rejects_invalid_intensity_rows() {
        assert!(Observation::new(Stain::One, f64::INFINITY, Some(1)).is_err());
        assert!(Observation::new(Stain::One, -3.0, Some(1)).is_err());
        let rows = r#"{"observations":[
            {"stain":"One","intensity":1.0,"count":3},
            {"stain":"Two","intensity":-3.0,"count":5}
        ]}"#;
        assert!(serde_json::from_str::<Dataset>(rows).is_err());
        // Every row that reaches the fitter has a finite non-negative intensity.
        let data = exact_data();
        assert!(data.intensities().iter().all(|x| x.is_finite() && *x >= 0.0));
        assert!(ModelSpec::SlopesOnly.fit(&data).is_ok());
    }

    #[test]
    fn test_fit_missing_count() {
        let mut rows: Vec<Observation> = exact_data().iter().copied().collect();
        rows.push(Observation::new(Stain::One, 1.0, None).unwrap());
        assert!(matches!(
            ModelSpec::SlopesOnly.fit(&Dataset::new(rows)),
            Err(CountError::MissingCount(4))
        ));
    }

    #[test]
    fn test_slope_converges_with_sample_size() {
        let beta = [5.0, 8.0];
        let mut rng = StdRng::seed_from_u64(1903);
        let mut avg_err = Vec::new();
        for n in [20, 200, 2000] {
            let mut err = 0.0;
            for _ in 0..20 {
                let data = synthetic_cells(&mut rng, n, beta, 4.0);
                let model = ModelSpec::SlopesOnly.fit(&data).unwrap();
                err += (model.coefficient(Term::Slope(Stain::One)).unwrap() - beta[0]).abs();
            }
            avg_err.push(err / 20.0);
        }
        assert!(avg_err[0] > avg_err[2]);
        assert!(avg_err[1] > avg_err[2]);
        assert!(avg_err[2] < 0.03);
    }

    #[test]
    fn test_coefficient_statistic() {
        let stat = coefficient_statistic(ModelSpec::SlopesOnly, Term::Slope(Stain::Two)).unwrap();
        assert!((stat(&exact_data()).unwrap() - 5.0).abs() < 1e-10);
        assert!(coefficient_statistic(ModelSpec::SlopesOnly, Term::Intercept).is_err());
    }

    #[test]
    fn test_model_spec_parse() {
        assert_eq!(ModelSpec::from_str("SharedIntercept").unwrap(), ModelSpec::SharedIntercept);
        assert!(ModelSpec::from_str("Quadratic").is_err());
    }
}
