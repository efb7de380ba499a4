use crate::util::Result;
use anyhow::anyhow;
use std::fmt;

/// A BED-style interval: 0-based, half-open.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenomicRegion {
    pub contig: String,
    pub start: u32,
    pub end: u32,
}

impl GenomicRegion {
    pub fn new(contig: impl Into<String>, start: u32, end: u32) -> Result<Self> {
        if start >= end {
            return Err(anyhow!("Invalid region: start {} >= end {}", start, end));
        }

        Ok(Self {
            contig: contig.into(),
            start,
            end,
        })
    }

    pub fn from_str_components(chrom: &str, start_str: &str, end_str: &str) -> Result<Self> {
        let start: u32 = start_str
            .parse()
            .map_err(|_| anyhow!("Invalid start position: {}", start_str))?;
        let end: u32 = end_str
            .parse()
            .map_err(|_| anyhow!("Invalid end position: {}", end_str))?;
        Self::new(chrom, start, end)
    }

    /// Inclusive 0-based end coordinate, as expected by indexed VCF fetches.
    pub fn last_position(&self) -> u64 {
        u64::from(self.end) - 1
    }
}

impl fmt::Display for GenomicRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.contig, self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::GenomicRegion;

    #[test]
    fn init_region_from_str_components_ok() {
        let region = GenomicRegion::from_str_components("chr1", "100", "200").unwrap();
        assert_eq!(region.contig, "chr1");
        assert_eq!(region.start, 100);
        assert_eq!(region.end, 200);
    }

    #[test]
    fn init_region_from_invalid_interval_err() {
        assert_eq!(
            GenomicRegion::from_str_components("chr1", "200", "100")
                .unwrap_err()
                .to_string(),
            "Invalid region: start 200 >= end 100".to_string()
        );
    }

    #[test]
    fn init_region_from_str_components_invalid_start_err() {
        assert_eq!(
            GenomicRegion::from_str_components("chr1", "a", "200")
                .unwrap_err()
                .to_string(),
            "Invalid start position: a".to_string()
        );
    }

    #[test]
    fn init_region_from_str_components_invalid_end_err() {
        assert_eq!(
            GenomicRegion::from_str_components("chr1", "100", "b")
                .unwrap_err()
                .to_string(),
            "Invalid end position: b".to_string()
        );
    }

    #[test]
    fn single_base_region_is_half_open() {
        let region = GenomicRegion::new("chr2", 99, 100).unwrap();
        assert_eq!(region.last_position(), 99);
        assert_eq!(region.to_string(), "chr2:99-100");
    }
}
