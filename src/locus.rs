//! Loading the tag-SNP loci over which allele balance is characterised.
//!
use crate::{readers::open_loci_reader, region::GenomicRegion, util::Result};
use anyhow::{anyhow, Context};
use std::{io::BufRead, path::Path};

fn is_header_line(line: &str) -> bool {
    line.starts_with('#') || line.starts_with("track") || line.starts_with("browser")
}

/// Parses one BED line into a region using its first three columns.
///
/// Returns `Ok(None)` for blank and header lines.
pub fn parse_bed_line(line: &str) -> Result<Option<GenomicRegion>> {
    let line = line.trim_end();
    if line.trim().is_empty() || is_header_line(line) {
        return Ok(None);
    }
    const MIN_FIELD_COUNT: usize = 3;
    let split_line: Vec<&str> = line.split_whitespace().collect();
    if split_line.len() < MIN_FIELD_COUNT {
        return Err(anyhow!(
            "Expected at least {} fields in the format 'chrom start end', found {}: {}",
            MIN_FIELD_COUNT,
            split_line.len(),
            line
        ));
    }
    GenomicRegion::from_str_components(split_line[0], split_line[1], split_line[2]).map(Some)
}

/// Reads every locus from `reader`, naming the offending line on error.
pub fn read_loci<R: BufRead>(reader: R) -> Result<Vec<GenomicRegion>> {
    let mut loci = Vec::new();
    for (line_number, result_line) in reader.lines().enumerate() {
        let line =
            result_line.with_context(|| format!("Error reading BED line {}", line_number + 1))?;
        if let Some(region) = parse_bed_line(&line)
            .with_context(|| format!("Error processing BED line {}", line_number + 1))?
        {
            loci.push(region);
        }
    }
    Ok(loci)
}

/// Loads all loci from a BED file. An empty file is an error.
pub fn load_loci(path: &Path) -> Result<Vec<GenomicRegion>> {
    let reader = open_loci_reader(path)?;
    let loci = read_loci(reader).with_context(|| format!("Failed to read {}", path.display()))?;
    if loci.is_empty() {
        return Err(anyhow!("No loci found in {}", path.display()));
    }
    log::debug!("Loaded {} loci from {}", loci.len(), path.display());
    Ok(loci)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn can_parse_bed_line() {
        let region = parse_bed_line("chr1\t1000\t1001\trs123").unwrap().unwrap();
        assert_eq!(region, GenomicRegion::new("chr1", 1000, 1001).unwrap());
    }

    #[test]
    fn skips_headers_and_blank_lines() {
        assert_eq!(parse_bed_line("").unwrap(), None);
        assert_eq!(parse_bed_line("# comment").unwrap(), None);
        assert_eq!(parse_bed_line("track name=tags").unwrap(), None);
    }

    #[test]
    fn short_line_is_error() {
        assert!(parse_bed_line("chr1\t1000").is_err());
    }

    #[test]
    fn read_loci_reports_line_number() {
        let bed = "chr1\t10\t11\nchr1\t20\tx\n";
        let err = read_loci(Cursor::new(bed)).unwrap_err();
        assert_eq!(err.to_string(), "Error processing BED line 2");
    }

    #[test]
    fn read_loci_keeps_order() {
        let bed = "#header\nchr2\t5\t6\n\nchr1\t10\t12\n";
        let loci = read_loci(Cursor::new(bed)).unwrap();
        assert_eq!(
            loci,
            vec![
                GenomicRegion::new("chr2", 5, 6).unwrap(),
                GenomicRegion::new("chr1", 10, 12).unwrap(),
            ]
        );
    }
}
