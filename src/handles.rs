//! Indexed VCF access for the collector.
//!
//! A `VcfSource` owns one htslib cursor and must not be shared between concurrent
//! collection runs; open one per sample being processed.

use crate::{
    error::ContamError,
    genotype::{GenotypeCall, GenotypeSource, SiteRecord},
    readers::open_vcf_reader,
    region::GenomicRegion,
    util::Result,
};
use anyhow::anyhow;
use rust_htslib::bcf::{self, record::GenotypeAllele, Read};
use std::{collections::HashSet, path::Path};

/// htslib sentinel that pads per-sample integer vectors.
const VECTOR_END_INTEGER: i32 = i32::MIN + 1;

pub struct VcfSource {
    reader: bcf::IndexedReader,
    samples: Vec<usize>,
    missing_contigs: HashSet<String>,
}

impl VcfSource {
    /// Opens an indexed VCF/BCF. With `sample = None` every sample in the file is read.
    pub fn new(path: &Path, sample: Option<&str>) -> Result<VcfSource> {
        let reader = open_vcf_reader(path)?;
        let header = reader.header();
        let names = header.samples();
        if names.is_empty() {
            return Err(anyhow!("VCF file {} has no samples", path.display()));
        }
        let samples = match sample {
            Some(name) => {
                let idx = names
                    .iter()
                    .position(|n| *n == name.as_bytes())
                    .ok_or_else(|| anyhow!("Sample {} not found in {}", name, path.display()))?;
                vec![idx]
            }
            None => (0..names.len()).collect(),
        };
        Ok(VcfSource {
            reader,
            samples,
            missing_contigs: HashSet::new(),
        })
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

fn decode_integers(values: &[i32]) -> Option<Vec<u32>> {
    values
        .iter()
        .take_while(|&&v| v != VECTOR_END_INTEGER)
        .map(|&v| u32::try_from(v).ok())
        .collect()
}

fn diploid_genotype(alleles: &[GenotypeAllele]) -> Option<[u32; 2]> {
    match alleles {
        [a, b] => Some([a.index()?, b.index()?]),
        _ => None,
    }
}

fn site_from_record(record: &bcf::Record, samples: &[usize]) -> SiteRecord {
    let genotypes = record.genotypes().ok();
    let allele_depths = record.format(b"AD").integer().ok();
    let depths = record.format(b"DP").integer().ok();

    let calls = samples
        .iter()
        .map(|&i| {
            let genotype = genotypes
                .as_ref()
                .and_then(|gts| diploid_genotype(&gts.get(i)));
            let ad = allele_depths
                .as_ref()
                .and_then(|ads| ads.get(i).and_then(|v| decode_integers(v)));
            let dp = depths
                .as_ref()
                .and_then(|dps| dps.get(i).and_then(|v| decode_integers(v)))
                .and_then(|v| v.first().copied());
            GenotypeCall::new(genotype, ad, dp)
        })
        .collect();
    SiteRecord::new(calls)
}

impl GenotypeSource for VcfSource {
    fn fetch(&mut self, region: &GenomicRegion) -> std::result::Result<Vec<SiteRecord>, ContamError> {
        let rid = match self.reader.header().name2rid(region.contig.as_bytes()) {
            Ok(rid) => rid,
            Err(_) => {
                if self.missing_contigs.insert(region.contig.clone()) {
                    log::debug!("Contig {} not present in VCF header, skipping", region.contig);
                }
                return Ok(Vec::new());
            }
        };
        log::trace!("Fetching {}", region);
        self.reader
            .fetch(rid, u64::from(region.start), Some(region.last_position()))?;

        let samples = &self.samples;
        let mut sites = Vec::new();
        for result in self.reader.records() {
            let record = result?;
            sites.push(site_from_record(&record, samples));
        }
        Ok(sites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_stops_at_vector_end() {
        assert_eq!(
            decode_integers(&[12, 3, VECTOR_END_INTEGER, VECTOR_END_INTEGER]),
            Some(vec![12, 3])
        );
    }

    #[test]
    fn decode_missing_value_is_none() {
        assert_eq!(decode_integers(&[i32::MIN, 4]), None);
    }

    #[test]
    fn diploid_genotypes_only() {
        use GenotypeAllele::*;
        assert_eq!(diploid_genotype(&[Unphased(0), Phased(1)]), Some([0, 1]));
        assert_eq!(diploid_genotype(&[Unphased(1)]), None);
        assert_eq!(diploid_genotype(&[UnphasedMissing, UnphasedMissing]), None);
    }
}
