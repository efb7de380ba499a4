//! Fixed-schema feature record derived from a tally and a fitted mixture.

use crate::{collector::SiteTally, error::ContamError, math, mixture::MixtureModel};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Column names of a `FeatureRecord`, in output order.
pub const FEATURE_NAMES: [&str; 18] = [
    "average_depth",
    "homozygosity",
    "heterozygosity",
    "fraction_homozygous_minAB0",
    "fraction_heterozygous_minABfracBelow30",
    "fraction_heterozygous_minABfracBelow20",
    "fraction_heterozygous_minABfracBelow15",
    "fraction_heterozygous_minABfracBelow10",
    "mean_bad_het_MAF",
    "median_bad_het_MAF",
    "mean_bad_hom_MAF",
    "median_bad_hom_MAF",
    "mu1",
    "mu2",
    "sd1",
    "sd2",
    "weights1",
    "weights2",
];

/// Features consumed by the contamination regression, in model column order.
pub const PREDICTOR_NAMES: [&str; 7] = [
    "fraction_heterozygous_minABfracBelow20",
    "fraction_homozygous_minAB0",
    "heterozygosity",
    "weights1",
    "weights2",
    "mu1",
    "mu2",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub average_depth: f64,
    pub homozygosity: f64,
    pub heterozygosity: f64,
    #[serde(rename = "fraction_homozygous_minAB0")]
    pub fraction_homozygous_min_ab0: f64,
    #[serde(rename = "fraction_heterozygous_minABfracBelow30")]
    pub fraction_heterozygous_below30: f64,
    #[serde(rename = "fraction_heterozygous_minABfracBelow20")]
    pub fraction_heterozygous_below20: f64,
    #[serde(rename = "fraction_heterozygous_minABfracBelow15")]
    pub fraction_heterozygous_below15: f64,
    #[serde(rename = "fraction_heterozygous_minABfracBelow10")]
    pub fraction_heterozygous_below10: f64,
    #[serde(rename = "mean_bad_het_MAF")]
    pub mean_bad_het_maf: f64,
    #[serde(rename = "median_bad_het_MAF")]
    pub median_bad_het_maf: f64,
    #[serde(rename = "mean_bad_hom_MAF")]
    pub mean_bad_hom_maf: f64,
    #[serde(rename = "median_bad_hom_MAF")]
    pub median_bad_hom_maf: f64,
    pub mu1: f64,
    pub mu2: f64,
    pub sd1: f64,
    pub sd2: f64,
    pub weights1: f64,
    pub weights2: f64,
}

impl FeatureRecord {
    /// Values in `FEATURE_NAMES` order.
    pub fn values(&self) -> [f64; 18] {
        [
            self.average_depth,
            self.homozygosity,
            self.heterozygosity,
            self.fraction_homozygous_min_ab0,
            self.fraction_heterozygous_below30,
            self.fraction_heterozygous_below20,
            self.fraction_heterozygous_below15,
            self.fraction_heterozygous_below10,
            self.mean_bad_het_maf,
            self.median_bad_het_maf,
            self.mean_bad_hom_maf,
            self.median_bad_hom_maf,
            self.mu1,
            self.mu2,
            self.sd1,
            self.sd2,
            self.weights1,
            self.weights2,
        ]
    }

    /// Values in `PREDICTOR_NAMES` order.
    pub fn predictors(&self) -> [f64; 7] {
        [
            self.fraction_heterozygous_below20,
            self.fraction_homozygous_min_ab0,
            self.heterozygosity,
            self.weights1,
            self.weights2,
            self.mu1,
            self.mu2,
        ]
    }
}

fn ratio(
    numerator: u64,
    denominator: u64,
    feature: &'static str,
    denominator_name: &'static str,
) -> Result<f64, ContamError> {
    if denominator == 0 {
        return Err(ContamError::DivisionByZero {
            feature,
            denominator: denominator_name,
        });
    }
    Ok(numerator as f64 / denominator as f64)
}

fn mean_and_median(
    values: &[f64],
    feature: &'static str,
    empty_fill: Option<f64>,
) -> Result<(f64, f64), ContamError> {
    match (math::median(values), empty_fill) {
        (Some(median), _) => Ok((values.iter().mean(), median)),
        (None, Some(fill)) => Ok((fill, fill)),
        (None, None) => Err(ContamError::EmptyInput { feature }),
    }
}

/// Builds the feature record; fails on any zero denominator or empty bad-MAF list.
pub fn summarize(tally: &SiteTally, mixture: &MixtureModel) -> Result<FeatureRecord, ContamError> {
    summarize_with_fill(tally, mixture, None)
}

/// As `summarize`, but an empty bad-MAF list yields `empty_fill` for its mean and
/// median when a fill value is given.
pub fn summarize_with_fill(
    tally: &SiteTally,
    mixture: &MixtureModel,
    empty_fill: Option<f64>,
) -> Result<FeatureRecord, ContamError> {
    let called = tally.called();
    let het = tally.heterozygous;

    let (mean_bad_het_maf, median_bad_het_maf) = mean_and_median(
        &tally.bad_het_mafs,
        "mean_bad_het_MAF",
        empty_fill,
    )?;
    let (mean_bad_hom_maf, median_bad_hom_maf) = mean_and_median(
        &tally.bad_hom_mafs,
        "mean_bad_hom_MAF",
        empty_fill,
    )?;

    let [c1, c2] = mixture.components;

    Ok(FeatureRecord {
        average_depth: ratio(tally.total_depth, tally.sites, "average_depth", "sites")?,
        homozygosity: ratio(tally.homozygous, called, "homozygosity", "genotyped calls")?,
        heterozygosity: ratio(het, called, "heterozygosity", "genotyped calls")?,
        fraction_homozygous_min_ab0: ratio(
            tally.min_ad_zero,
            tally.homozygous,
            "fraction_homozygous_minAB0",
            "homozygous calls",
        )?,
        fraction_heterozygous_below30: ratio(
            tally.het_below_30(),
            het,
            "fraction_heterozygous_minABfracBelow30",
            "heterozygous calls",
        )?,
        fraction_heterozygous_below20: ratio(
            tally.het_below_20(),
            het,
            "fraction_heterozygous_minABfracBelow20",
            "heterozygous calls",
        )?,
        fraction_heterozygous_below15: ratio(
            tally.het_below_15(),
            het,
            "fraction_heterozygous_minABfracBelow15",
            "heterozygous calls",
        )?,
        fraction_heterozygous_below10: ratio(
            tally.het_below_10(),
            het,
            "fraction_heterozygous_minABfracBelow10",
            "heterozygous calls",
        )?,
        mean_bad_het_maf,
        median_bad_het_maf,
        mean_bad_hom_maf,
        median_bad_hom_maf,
        mu1: c1.mean()?,
        mu2: c2.mean()?,
        sd1: c1.sd()?,
        sd2: c2.sd()?,
        weights1: c1.weight,
        weights2: c2.weight,
    })
}
