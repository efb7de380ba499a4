//! Allele-balance collection over a fixed set of loci.
//!
//! The collector folds every call overlapping the loci into a `SiteTally`: zygosity
//! counts, the list of minor allele fractions and the "bad" fractions observed at
//! anomalous homozygous calls and low-balance heterozygous calls.

use crate::{
    error::ContamError,
    genotype::{minor_allele_fraction, GenotypeCall, GenotypeSource, SiteRecord, Zygosity},
    region::GenomicRegion,
};

/// Heterozygous minor-allele-fraction thresholds, widest first.
///
/// The buckets are cumulative: a fraction below 0.10 counts toward every bucket.
pub const LOW_AB_THRESHOLDS: [f64; 4] = [0.30, 0.20, 0.15, 0.10];

/// Running counters for one collection run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SiteTally {
    /// Records visited across all loci.
    pub sites: u64,
    /// Sum of the per-record depth.
    pub total_depth: u64,
    /// Calls whose smallest allele depth is zero.
    pub min_ad_zero: u64,
    pub homozygous: u64,
    pub hom_ref: u64,
    pub hom_alt: u64,
    /// Hom-ref calls with reads supporting the alternate allele.
    pub hom_ref_alt_support: u64,
    /// Hom-alt calls with reads supporting the reference allele.
    pub hom_alt_ref_support: u64,
    pub heterozygous: u64,
    /// Heterozygous calls below each of `LOW_AB_THRESHOLDS`, same order.
    pub het_below: [u64; 4],
    /// Calls without usable AD or genotype.
    pub skipped_calls: u64,
    /// Minor allele fractions of heterozygous and anomalous homozygous calls.
    pub mafs: Vec<f64>,
    pub bad_het_mafs: Vec<f64>,
    pub bad_hom_mafs: Vec<f64>,
}

impl SiteTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn het_below_30(&self) -> u64 {
        self.het_below[0]
    }

    pub fn het_below_20(&self) -> u64 {
        self.het_below[1]
    }

    pub fn het_below_15(&self) -> u64 {
        self.het_below[2]
    }

    pub fn het_below_10(&self) -> u64 {
        self.het_below[3]
    }

    /// Calls that were classified as homozygous or heterozygous.
    pub fn called(&self) -> u64 {
        self.homozygous + self.heterozygous
    }

    pub fn observe_record(&mut self, record: &SiteRecord) {
        self.sites += 1;
        self.total_depth += record.depth();
        for call in &record.calls {
            self.observe_call(call);
        }
    }

    pub fn observe_call(&mut self, call: &GenotypeCall) {
        let (Some(ad), Some(zygosity)) = (call.allele_depths.as_deref(), call.zygosity()) else {
            self.skipped_calls += 1;
            return;
        };
        let Some(frac) = minor_allele_fraction(ad) else {
            self.skipped_calls += 1;
            return;
        };

        if ad.iter().min() == Some(&0) {
            self.min_ad_zero += 1;
        }

        match zygosity {
            Zygosity::HomAlt => {
                self.hom_alt += 1;
                if ad[0] != 0 {
                    self.hom_alt_ref_support += 1;
                    self.push_bad_hom(frac);
                }
                self.homozygous += 1;
            }
            Zygosity::HomRef => {
                self.hom_ref += 1;
                if ad[1] != 0 {
                    self.hom_ref_alt_support += 1;
                    self.push_bad_hom(frac);
                }
                self.homozygous += 1;
            }
            Zygosity::HomOther => self.homozygous += 1,
            Zygosity::Het => {
                self.heterozygous += 1;
                self.mafs.push(frac);
                if frac < LOW_AB_THRESHOLDS[0] {
                    self.bad_het_mafs.push(frac);
                }
                for (count, threshold) in self.het_below.iter_mut().zip(LOW_AB_THRESHOLDS) {
                    if frac < threshold {
                        *count += 1;
                    }
                }
            }
        }
    }

    fn push_bad_hom(&mut self, frac: f64) {
        self.mafs.push(frac);
        self.bad_hom_mafs.push(frac);
    }
}

/// Folds every record overlapping `loci` into a fresh tally.
///
/// Fails with a data error when no record overlaps any locus, since every ratio
/// downstream divides by the number of visited sites.
pub fn collect<S>(source: &mut S, loci: &[GenomicRegion]) -> Result<SiteTally, ContamError>
where
    S: GenotypeSource + ?Sized,
{
    let tally = loci.iter().try_fold(SiteTally::new(), |mut tally, locus| {
        for record in source.fetch(locus)? {
            tally.observe_record(&record);
        }
        Ok::<_, ContamError>(tally)
    })?;

    if tally.sites == 0 {
        return Err(ContamError::data(format!(
            "No call records overlap any of the {} loci",
            loci.len()
        )));
    }

    log::debug!(
        "Collected {} sites: {} homozygous ({} ref, {} alt), {} heterozygous, {} skipped calls",
        tally.sites,
        tally.homozygous,
        tally.hom_ref,
        tally.hom_alt,
        tally.heterozygous,
        tally.skipped_calls
    );
    log::debug!(
        "Anomalous homozygous calls: {} hom-ref with alt reads, {} hom-alt with ref reads",
        tally.hom_ref_alt_support,
        tally.hom_alt_ref_support
    );
    Ok(tally)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory source keyed by region.
    #[derive(Default)]
    pub struct MemorySource {
        pub records: HashMap<GenomicRegion, Vec<SiteRecord>>,
    }

    impl MemorySource {
        pub fn insert(&mut self, region: GenomicRegion, records: Vec<SiteRecord>) {
            self.records.insert(region, records);
        }
    }

    impl GenotypeSource for MemorySource {
        fn fetch(&mut self, region: &GenomicRegion) -> Result<Vec<SiteRecord>, ContamError> {
            Ok(self.records.get(region).cloned().unwrap_or_default())
        }
    }

    fn call(gt: [u32; 2], ad: &[u32]) -> GenotypeCall {
        GenotypeCall::new(Some(gt), Some(ad.to_vec()), Some(ad.iter().sum()))
    }

    fn region(start: u32) -> GenomicRegion {
        GenomicRegion::new("chr1", start, start + 1).unwrap()
    }

    fn tally_of(calls: &[GenotypeCall]) -> SiteTally {
        let mut tally = SiteTally::new();
        for c in calls {
            tally.observe_record(&SiteRecord::new(vec![c.clone()]));
        }
        tally
    }

    #[test]
    fn clean_homozygous_calls_add_no_mafs() {
        let tally = tally_of(&[call([0, 0], &[30, 0]), call([1, 1], &[0, 25])]);
        assert_eq!(tally.homozygous, 2);
        assert_eq!(tally.hom_ref, 1);
        assert_eq!(tally.hom_alt, 1);
        assert_eq!(tally.min_ad_zero, 2);
        assert!(tally.mafs.is_empty());
        assert!(tally.bad_hom_mafs.is_empty());
    }

    #[test]
    fn anomalous_homozygous_calls_are_bad() {
        let tally = tally_of(&[call([0, 0], &[27, 3]), call([1, 1], &[2, 18])]);
        assert_eq!(tally.hom_ref_alt_support, 1);
        assert_eq!(tally.hom_alt_ref_support, 1);
        assert_eq!(tally.mafs, vec![0.1, 0.1]);
        assert_eq!(tally.bad_hom_mafs, vec![0.1, 0.1]);
        assert_eq!(tally.min_ad_zero, 0);
    }

    #[test]
    fn single_allele_depth_is_skipped() {
        let mut tally = SiteTally::new();
        for genotype in [[0, 0], [1, 1], [0, 1]] {
            tally.observe_call(&GenotypeCall {
                genotype: Some(genotype),
                allele_depths: Some(vec![12]),
                depth: Some(12),
            });
        }
        assert_eq!(tally.skipped_calls, 3);
        assert_eq!(tally.called(), 0);
        assert_eq!(tally.min_ad_zero, 0);
        assert!(tally.mafs.is_empty());
    }

    #[test]
    fn other_homozygous_alleles_only_count_as_homozygous() {
        let tally = tally_of(&[call([2, 2], &[1, 1, 20])]);
        assert_eq!(tally.homozygous, 1);
        assert_eq!(tally.hom_ref + tally.hom_alt, 0);
        assert!(tally.mafs.is_empty());
    }

    #[test]
    fn heterozygous_buckets_are_cumulative() {
        let tally = tally_of(&[
            call([0, 1], &[95, 5]),  // 0.05
            call([0, 1], &[88, 12]), // 0.12
            call([0, 1], &[82, 18]), // 0.18
            call([0, 1], &[75, 25]), // 0.25
            call([0, 1], &[50, 50]), // 0.50
        ]);
        assert_eq!(tally.heterozygous, 5);
        assert_eq!(tally.het_below_30(), 4);
        assert_eq!(tally.het_below_20(), 3);
        assert_eq!(tally.het_below_15(), 2);
        assert_eq!(tally.het_below_10(), 1);
        assert_eq!(tally.bad_het_mafs, vec![0.05, 0.12, 0.18, 0.25]);
        assert_eq!(tally.mafs.len(), 5);
    }

    #[test]
    fn threshold_is_strict() {
        let tally = tally_of(&[call([0, 1], &[7, 3])]);
        assert_eq!(tally.het_below, [0, 0, 0, 0]);
        assert!(tally.bad_het_mafs.is_empty());
    }

    #[test]
    fn unusable_calls_are_skipped_and_counted() {
        let tally = tally_of(&[
            GenotypeCall::new(Some([0, 1]), None, Some(10)),
            call([0, 1], &[0, 0]),
            GenotypeCall::new(None, Some(vec![5, 5]), Some(10)),
        ]);
        assert_eq!(tally.sites, 3);
        assert_eq!(tally.skipped_calls, 3);
        assert_eq!(tally.called(), 0);
        assert_eq!(tally.min_ad_zero, 0);
    }

    #[test]
    fn depth_is_summed_per_site() {
        let tally = tally_of(&[call([0, 1], &[10, 10]), call([0, 0], &[30, 0])]);
        assert_eq!(tally.total_depth, 50);
    }

    #[test]
    fn collect_folds_all_loci() {
        let mut source = MemorySource::default();
        source.insert(region(10), vec![SiteRecord::new(vec![call([0, 1], &[40, 10])])]);
        source.insert(region(20), vec![SiteRecord::new(vec![call([1, 1], &[0, 30])])]);
        let tally = collect(&mut source, &[region(10), region(20), region(30)]).unwrap();
        assert_eq!(tally.sites, 2);
        assert_eq!(tally.heterozygous, 1);
        assert_eq!(tally.homozygous, 1);
        assert_eq!(tally.mafs, vec![0.2]);
    }

    #[test]
    fn collect_without_records_is_data_error() {
        let mut source = MemorySource::default();
        let err = collect(&mut source, &[region(10)]).unwrap_err();
        assert!(matches!(err, ContamError::Data { .. }));
    }

    #[test]
    fn collect_is_idempotent() {
        let mut source = MemorySource::default();
        source.insert(
            region(5),
            vec![
                SiteRecord::new(vec![call([0, 1], &[13, 7]), call([0, 0], &[19, 1])]),
                SiteRecord::new(vec![call([1, 1], &[3, 29])]),
            ],
        );
        let loci = [region(5)];
        let first = collect(&mut source, &loci).unwrap();
        let second = collect(&mut source, &loci).unwrap();
        assert_eq!(first, second);
        let bits = |t: &SiteTally| t.mafs.iter().map(|m| m.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&first), bits(&second));
    }
}
