use crate::util::Result;
use anyhow::anyhow;
use rust_htslib::{bcf, bgzf};
use std::{
    io::BufReader,
    path::{Path, PathBuf},
};

/// Returns the index accompanying `vcf_path`, trying `.tbi` then `.csi`.
pub fn find_vcf_index(vcf_path: &Path) -> Result<PathBuf> {
    for ext in ["tbi", "csi"] {
        let mut index = vcf_path.as_os_str().to_owned();
        index.push(format!(".{}", ext));
        let index = PathBuf::from(index);
        if index.exists() {
            return Ok(index);
        }
    }
    Err(anyhow!(
        "No .tbi or .csi index found for {}. Create it using 'tabix -p vcf {}'",
        vcf_path.display(),
        vcf_path.display()
    ))
}

/// Opens an indexed VCF/BCF for region queries.
pub fn open_vcf_reader(path: &Path) -> Result<bcf::IndexedReader> {
    let index = find_vcf_index(path)?;
    log::trace!("Using index {}", index.display());
    bcf::IndexedReader::from_path(path)
        .map_err(|e| anyhow!("Failed to open VCF file {}: {}", path.display(), e))
}

pub type LociReader = BufReader<bgzf::Reader>;
const BUFFER_CAPACITY: usize = 128 * 1024;

/// Opens a BED file of loci; plain text and BGZF-compressed input are both accepted.
pub fn open_loci_reader(path: &Path) -> Result<LociReader> {
    let inner = bgzf::Reader::from_path(path)
        .map_err(|e| anyhow!("Failed to open loci from {}: {}", path.display(), e))?;
    Ok(BufReader::with_capacity(BUFFER_CAPACITY, inner))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_index_is_reported() {
        let err = find_vcf_index(Path::new("/no/such/sample.vcf.gz")).unwrap_err();
        assert!(err.to_string().contains("tabix -p vcf"));
    }

    #[test]
    fn missing_vcf_is_error() {
        assert!(open_vcf_reader(Path::new("/no/such/sample.vcf.gz")).is_err());
    }
}
