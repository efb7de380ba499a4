//! Per-sample genotype calls and the reader seam the collector folds over.
//!
//! `GenotypeSource` is the boundary to the genomic-data reader: anything that can
//! return the call records overlapping a region can feed the collector. The VCF
//! implementation lives in `handles`.

use crate::{error::ContamError, region::GenomicRegion};

/// A single sample's call at one site.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenotypeCall {
    /// Diploid allele indices; `None` when the GT is missing or not diploid.
    pub genotype: Option<[u32; 2]>,
    /// Per-allele read depths (REF first); `None` when AD is absent or incomplete.
    pub allele_depths: Option<Vec<u32>>,
    /// Total read depth (DP).
    pub depth: Option<u32>,
}

/// Classification of a diploid genotype relative to the reference and first alternate allele.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zygosity {
    HomRef,
    HomAlt,
    /// Homozygous for some other allele index, e.g. `2/2`.
    HomOther,
    Het,
}

impl GenotypeCall {
    pub fn new(genotype: Option<[u32; 2]>, allele_depths: Option<Vec<u32>>, depth: Option<u32>) -> Self {
        let allele_depths = allele_depths.filter(|ad| ad.len() >= 2);
        Self {
            genotype,
            allele_depths,
            depth,
        }
    }

    pub fn zygosity(&self) -> Option<Zygosity> {
        let [a, b] = self.genotype?;
        Some(match (a, b) {
            (0, 0) => Zygosity::HomRef,
            (1, 1) => Zygosity::HomAlt,
            (a, b) if a == b => Zygosity::HomOther,
            _ => Zygosity::Het,
        })
    }

    /// Total reads across all alleles, `None` when AD is absent.
    pub fn allele_depth_sum(&self) -> Option<u64> {
        self.allele_depths
            .as_ref()
            .map(|ad| ad.iter().map(|&d| u64::from(d)).sum())
    }
}

/// All selected samples' calls at one VCF record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SiteRecord {
    pub calls: Vec<GenotypeCall>,
}

impl SiteRecord {
    pub fn new(calls: Vec<GenotypeCall>) -> Self {
        Self { calls }
    }

    /// Depth credited to the site: the DP of the first selected sample.
    pub fn depth(&self) -> u64 {
        self.calls
            .first()
            .and_then(|c| c.depth)
            .map(u64::from)
            .unwrap_or(0)
    }
}

/// Source of call records for a set of regions.
///
/// Implementations hold a cursor and are not required to be reentrant; each collection
/// run owns its own source.
pub trait GenotypeSource {
    fn fetch(&mut self, region: &GenomicRegion) -> Result<Vec<SiteRecord>, ContamError>;
}

impl<S: GenotypeSource + ?Sized> GenotypeSource for &mut S {
    fn fetch(&mut self, region: &GenomicRegion) -> Result<Vec<SiteRecord>, ContamError> {
        (**self).fetch(region)
    }
}

/// Minor allele fraction: `min(AD) / sum(AD)`.
///
/// `None` when fewer than two allele depths are given or they sum to zero.
pub fn minor_allele_fraction(allele_depths: &[u32]) -> Option<f64> {
    if allele_depths.len() < 2 {
        return None;
    }
    let total: u64 = allele_depths.iter().map(|&d| u64::from(d)).sum();
    if total == 0 {
        return None;
    }
    let min = allele_depths.iter().copied().min()?;
    Some(f64::from(min) / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zygosity_classification() {
        let call = |gt| GenotypeCall::new(Some(gt), Some(vec![10, 10]), Some(20));
        assert_eq!(call([0, 0]).zygosity(), Some(Zygosity::HomRef));
        assert_eq!(call([1, 1]).zygosity(), Some(Zygosity::HomAlt));
        assert_eq!(call([2, 2]).zygosity(), Some(Zygosity::HomOther));
        assert_eq!(call([0, 1]).zygosity(), Some(Zygosity::Het));
        assert_eq!(call([1, 2]).zygosity(), Some(Zygosity::Het));
        assert_eq!(GenotypeCall::default().zygosity(), None);
    }

    #[test]
    fn short_allele_depths_are_dropped() {
        let call = GenotypeCall::new(Some([0, 0]), Some(vec![12]), None);
        assert_eq!(call.allele_depths, None);
    }

    #[test]
    fn maf_is_bounded() {
        for ad in [vec![0, 0], vec![0, 7], vec![3, 7], vec![5, 5], vec![9, 1, 2], vec![0, 0, 4]] {
            match minor_allele_fraction(&ad) {
                None => assert_eq!(ad.iter().sum::<u32>(), 0),
                Some(frac) => {
                    assert!((0.0..=1.0).contains(&frac));
                    assert_eq!(frac == 0.0, ad.contains(&0));
                }
            }
        }
    }

    #[test]
    fn maf_needs_two_alleles() {
        assert_eq!(minor_allele_fraction(&[12]), None);
        assert_eq!(minor_allele_fraction(&[]), None);
    }

    #[test]
    fn maf_uses_smallest_allele() {
        assert_eq!(minor_allele_fraction(&[30, 10]), Some(0.25));
        assert_eq!(minor_allele_fraction(&[6, 2, 2]), Some(0.2));
    }

    #[test]
    fn site_depth_uses_first_sample() {
        let site = SiteRecord::new(vec![
            GenotypeCall::new(Some([0, 1]), Some(vec![5, 5]), Some(11)),
            GenotypeCall::new(Some([0, 0]), Some(vec![9, 0]), Some(40)),
        ]);
        assert_eq!(site.depth(), 11);
        assert_eq!(SiteRecord::default().depth(), 0);
    }
}
