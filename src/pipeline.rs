//! Per-sample feature extraction: collect, fit the mixture, summarize.

use crate::{
    collector::{self, SiteTally},
    error::ContamError,
    features::{self, FeatureRecord},
    genotype::GenotypeSource,
    mixture::{self, EmParams, MixtureModel},
    region::GenomicRegion,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    pub em: EmParams,
    /// Substitute for mean/median of an empty bad-MAF list; `None` makes it an error.
    pub empty_fill: Option<f64>,
}

/// Everything computed for one sample.
#[derive(Debug, Clone)]
pub struct SampleFeatures {
    pub tally: SiteTally,
    pub mixture: MixtureModel,
    pub converged: bool,
    pub features: FeatureRecord,
}

/// Fits the mixture to the tally's MAFs, accepting a non-converged best-effort fit.
pub fn fit_tally(tally: &SiteTally, params: &EmParams) -> Result<(MixtureModel, bool), ContamError> {
    let fit = mixture::fit_lognormal_mixture(&tally.mafs, params)?;
    match fit.into_model() {
        Ok(model) => Ok((model, true)),
        Err(ContamError::Convergence {
            iterations,
            best_effort,
        }) => {
            log::warn!(
                "Mixture fit did not converge after {} iterations, using last estimate",
                iterations
            );
            Ok((*best_effort, false))
        }
        Err(e) => Err(e),
    }
}

/// Runs the full extraction for one sample against its own source.
pub fn extract_features<S>(
    source: &mut S,
    loci: &[GenomicRegion],
    options: &ExtractOptions,
) -> Result<SampleFeatures, ContamError>
where
    S: GenotypeSource + ?Sized,
{
    let tally = collector::collect(source, loci)?;
    let (mixture, converged) = fit_tally(&tally, &options.em)?;
    let features = features::summarize_with_fill(&tally, &mixture, options.empty_fill)?;
    Ok(SampleFeatures {
        tally,
        mixture,
        converged,
        features,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        collector::tests::MemorySource,
        genotype::{GenotypeCall, SiteRecord},
    };

    fn source_with(calls: Vec<([u32; 2], Vec<u32>)>) -> (MemorySource, Vec<GenomicRegion>) {
        let mut source = MemorySource::default();
        let mut loci = Vec::new();
        for (i, (gt, ad)) in calls.into_iter().enumerate() {
            let region = GenomicRegion::new("chr1", i as u32 * 10, i as u32 * 10 + 1).unwrap();
            let depth = ad.iter().sum();
            source.insert(
                region.clone(),
                vec![SiteRecord::new(vec![GenotypeCall::new(Some(gt), Some(ad), Some(depth))])],
            );
            loci.push(region);
        }
        (source, loci)
    }

    #[test]
    fn missing_anomalies_need_a_fill() {
        let (mut source, loci) = source_with(vec![
            ([0, 1], vec![15, 5]),
            ([0, 1], vec![10, 10]),
            ([0, 0], vec![20, 0]),
        ]);
        let err = extract_features(&mut source, &loci, &ExtractOptions::default()).unwrap_err();
        assert!(matches!(err, ContamError::EmptyInput { .. }));

        let options = ExtractOptions {
            empty_fill: Some(f64::NAN),
            ..ExtractOptions::default()
        };
        let sample = extract_features(&mut source, &loci, &options).unwrap();
        assert!(sample.features.mean_bad_hom_maf.is_nan());
        assert_eq!(sample.features.median_bad_het_maf, 0.25);
    }

    #[test]
    fn best_effort_fit_is_kept() {
        let tally = SiteTally {
            mafs: vec![0.05, 0.07, 0.3, 0.45, 0.5],
            ..SiteTally::default()
        };
        let params = EmParams {
            max_iterations: 1,
            tolerance: 0.0,
            ..EmParams::default()
        };
        let (model, converged) = fit_tally(&tally, &params).unwrap();
        assert!(!converged);
        let [w1, w2] = model.weights();
        assert!((w1 + w2 - 1.0).abs() < 1e-9);
    }
}
