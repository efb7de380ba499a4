//! Contamination regression over the extracted predictor features.
//!
//! The model is a ridge regression on standardized predictors, stored as JSON.
//! Training tables are the TSVs written by `training-data`; columns are located by
//! header name, so extra columns and any column order are accepted.

use crate::{features::PREDICTOR_NAMES, util::Result};
use anyhow::{anyhow, Context};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

const NUM_PREDICTORS: usize = PREDICTOR_NAMES.len();

/// Anything that maps a predictor vector to a contamination fraction.
pub trait ContaminationModel {
    fn predict(&self, predictors: &[f64; NUM_PREDICTORS]) -> f64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeModel {
    /// Predictor names in column order, checked on load.
    pub predictors: Vec<String>,
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub lambda: f64,
}

impl ContaminationModel for RidgeModel {
    fn predict(&self, predictors: &[f64; NUM_PREDICTORS]) -> f64 {
        let linear: f64 = predictors
            .iter()
            .zip(&self.means)
            .zip(&self.scales)
            .zip(&self.coefficients)
            .map(|(((x, mean), scale), coef)| coef * (x - mean) / scale)
            .sum();
        (self.intercept + linear).clamp(0.0, 1.0)
    }
}

impl RidgeModel {
    /// Fits `y ~ x` with an L2 penalty `lambda` on the standardized coefficients.
    ///
    /// Constant columns get a unit scale and therefore a zero coefficient.
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, lambda: f64) -> Result<RidgeModel> {
        let (n, p) = x.dim();
        if p != NUM_PREDICTORS {
            return Err(anyhow!("Expected {} predictor columns, got {}", NUM_PREDICTORS, p));
        }
        if n == 0 || n != y.len() {
            return Err(anyhow!(
                "Training data needs matching, non-empty rows: {} predictor rows, {} targets",
                n,
                y.len()
            ));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(anyhow!("Training data contains non-finite values"));
        }

        let means = x
            .mean_axis(Axis(0))
            .ok_or_else(|| anyhow!("Cannot standardize empty training data"))?;
        let scales = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });
        let z = (x - &means) / &scales;
        let intercept = y.sum() / n as f64;
        let centered_y = y - intercept;

        let mut gram = z.t().dot(&z);
        for i in 0..p {
            gram[[i, i]] += lambda;
        }
        let rhs = z.t().dot(&centered_y);
        let coefficients = solve(gram, rhs)?;

        Ok(RidgeModel {
            predictors: PREDICTOR_NAMES.iter().map(|s| s.to_string()).collect(),
            means: means.to_vec(),
            scales: scales.to_vec(),
            coefficients: coefficients.to_vec(),
            intercept,
            lambda,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create model file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .with_context(|| format!("Failed to write model to {}", path.display()))?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<RidgeModel> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open model file {}", path.display()))?;
        let model: RidgeModel = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse model {}", path.display()))?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        if self.predictors.iter().map(String::as_str).ne(PREDICTOR_NAMES) {
            return Err(anyhow!(
                "Model predictors {:?} do not match expected {:?}",
                self.predictors,
                PREDICTOR_NAMES
            ));
        }
        for (name, len) in [
            ("means", self.means.len()),
            ("scales", self.scales.len()),
            ("coefficients", self.coefficients.len()),
        ] {
            if len != NUM_PREDICTORS {
                return Err(anyhow!("Model {} has {} entries, expected {}", name, len, NUM_PREDICTORS));
            }
        }
        if self.scales.iter().any(|&s| s <= 0.0) {
            return Err(anyhow!("Model scales must be positive"));
        }
        Ok(())
    }
}

/// Solves `a * x = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() < 1e-12 {
            return Err(anyhow!(
                "Singular system while fitting the model; try a larger --lambda"
            ));
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[[row, k]] * x[k]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }
    Ok(x)
}

/// Reads predictors and contamination fractions from a training table.
pub fn read_training_table(path: &Path) -> Result<(Array2<f64>, Array1<f64>)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open training data {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow!("Column {} missing from {}", name, path.display()))
    };
    let target_idx = column("contamination_fraction")?;
    let predictor_idx = PREDICTOR_NAMES
        .iter()
        .map(|name| column(*name))
        .collect::<Result<Vec<_>>>()?;

    let parse = |record: &csv::StringRecord, idx: usize, line: usize| -> Result<f64> {
        let field = record.get(idx).unwrap_or_default();
        field
            .trim()
            .parse::<f64>()
            .map_err(|_| anyhow!("Invalid value '{}' at line {} of {}", field, line, path.display()))
    };

    let mut rows = Vec::new();
    let mut targets = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let line = i + 2;
        targets.push(parse(&record, target_idx, line)?);
        for &idx in &predictor_idx {
            rows.push(parse(&record, idx, line)?);
        }
    }
    let n = targets.len();
    if n == 0 {
        return Err(anyhow!("No training rows in {}", path.display()));
    }
    let x = Array2::from_shape_vec((n, NUM_PREDICTORS), rows)?;
    Ok((x, Array1::from(targets)))
}
