//! Utility functions and types for error handling and file path validation.

use anyhow::anyhow;
use std::path::Path;

/// Result type used by the command layer.
pub type Result<T> = anyhow::Result<T>;

/// Logs the provided error and exits the program.
pub fn handle_error_and_exit(err: anyhow::Error) -> ! {
    log::error!("{:#}", err);
    std::process::exit(1);
}

/// Checks if the provided file path exists.
pub fn try_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(anyhow!("Path/File does not exist: {}", path.display()));
    }
    Ok(())
}

/// Logs a warning and returns `default` in place of the failed value.
pub fn log_warning<T>(err: impl Into<anyhow::Error>, default: T) -> T {
    log::warn!("{:#}", err.into());
    default
}

/// Derives a display name for a sample from its VCF path (file name without VCF extensions).
pub fn sample_name_from_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    for suffix in [".vcf.gz", ".vcf.bgz", ".bcf", ".vcf"] {
        if let Some(stem) = file_name.strip_suffix(suffix) {
            if !stem.is_empty() {
                return stem.to_string();
            }
        }
    }
    file_name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_name_strips_vcf_extensions() {
        assert_eq!(sample_name_from_path(Path::new("/data/NA12878.vcf.gz")), "NA12878");
        assert_eq!(sample_name_from_path(Path::new("s1.bcf")), "s1");
        assert_eq!(sample_name_from_path(Path::new("calls.txt")), "calls.txt");
    }

    #[test]
    fn missing_path_is_error() {
        assert!(try_exists(Path::new("/definitely/not/here.vcf.gz")).is_err());
    }
}
