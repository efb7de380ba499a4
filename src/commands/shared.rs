use crate::{
    features::{FeatureRecord, FEATURE_NAMES},
    handles::VcfSource,
    pipeline::{self, ExtractOptions, SampleFeatures},
    region::GenomicRegion,
    util::{try_exists, Result},
};
use anyhow::{anyhow, Context};
use crossbeam_channel::{unbounded, Receiver};
use csv::{Writer, WriterBuilder};
use rayon::{prelude::*, ThreadPoolBuilder};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
    thread,
};

/// A VCF with a known contamination fraction.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub vcf: PathBuf,
    pub contamination_fraction: f64,
}

/// Parses the two-column `<vcf> <fraction>` input list. Blank lines and `#` comments are ignored.
pub fn parse_input_list<R: BufRead>(reader: R) -> Result<Vec<TrainingSample>> {
    let mut samples = Vec::new();
    for (line_number, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Error reading input list line {}", line_number + 1))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let (vcf, fraction) = match fields[..] {
            [vcf, fraction] => (vcf, fraction),
            _ => {
                return Err(anyhow!(
                    "Expected 2 fields '<vcf> <contamination fraction>' at input list line {}, found {}",
                    line_number + 1,
                    fields.len()
                ))
            }
        };
        let contamination_fraction = fraction.parse::<f64>().map_err(|_| {
            anyhow!(
                "Invalid contamination fraction '{}' at input list line {}",
                fraction,
                line_number + 1
            )
        })?;
        samples.push(TrainingSample {
            vcf: PathBuf::from(vcf),
            contamination_fraction,
        });
    }
    Ok(samples)
}

pub fn read_input_list(path: &Path) -> Result<Vec<TrainingSample>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open input list {}", path.display()))?;
    let samples = parse_input_list(BufReader::new(file))?;
    if samples.is_empty() {
        return Err(anyhow!("No samples listed in {}", path.display()));
    }
    Ok(samples)
}

/// Extracts features for one VCF with its own reader handle.
pub fn extract_sample(
    vcf: &Path,
    sample: Option<&str>,
    loci: &[GenomicRegion],
    options: &ExtractOptions,
) -> Result<SampleFeatures> {
    log::info!("Processing {}", vcf.display());
    try_exists(vcf)?;
    let mut source = VcfSource::new(vcf, sample)?;
    log::debug!("Reading {} sample(s) from {}", source.sample_count(), vcf.display());
    let result = match pipeline::extract_features(&mut source, loci, options) {
        Ok(result) => result,
        Err(err) if err.is_recoverable() => {
            return Err(anyhow::Error::new(err)
                .context(format!("Too few informative calls in {}", vcf.display())))
        }
        Err(err) => {
            return Err(anyhow::Error::new(err)
                .context(format!("Feature extraction failed for {}", vcf.display())))
        }
    };
    log::debug!(
        "{}: {} sites, {} MAFs, mixture converged={}",
        vcf.display(),
        result.tally.sites,
        result.tally.mafs.len(),
        result.converged
    );
    log::info!("Finished {}", vcf.display());
    Ok(result)
}

pub fn tsv_writer<W: Write>(inner: W) -> Writer<W> {
    WriterBuilder::new().delimiter(b'\t').from_writer(inner)
}

pub fn tsv_writer_from_path(path: &str) -> Result<Writer<File>> {
    WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("Failed to create output file {}", path))
}

pub fn write_header<W: Write>(writer: &mut Writer<W>, leading: &[&str]) -> Result<()> {
    writer.write_record(leading.iter().copied().chain(FEATURE_NAMES))?;
    Ok(())
}

pub fn write_feature_row<W: Write>(
    writer: &mut Writer<W>,
    leading: &[String],
    record: &FeatureRecord,
) -> Result<()> {
    let values = record.values().map(|v| v.to_string());
    writer.write_record(leading.iter().map(String::as_str).chain(values.iter().map(String::as_str)))?;
    writer.flush()?;
    Ok(())
}

/// Extracts features for every sample, `num_threads` at a time, and writes one
/// `base contamination_fraction <features>` row per successful sample in input order.
///
/// Failed samples are logged and left out. Returns the number of rows written.
pub fn extract_training_rows<W: Write + Send + 'static>(
    samples: &[TrainingSample],
    loci: &[GenomicRegion],
    options: &ExtractOptions,
    num_threads: usize,
    mut writer: Writer<W>,
) -> Result<usize> {
    write_header(&mut writer, &["base", "contamination_fraction"])?;

    let (sender, receiver) = unbounded();
    let writer_thread = process_writer_thread(writer, receiver);

    let pool = initialize_thread_pool(num_threads)?;
    pool.install(|| {
        samples
            .par_iter()
            .enumerate()
            .for_each_with(sender, |s, (index, sample)| {
                let row = match extract_sample(&sample.vcf, None, loci, options) {
                    Ok(result) => Some((
                        vec![
                            sample.vcf.display().to_string(),
                            sample.contamination_fraction.to_string(),
                        ],
                        result.features,
                    )),
                    Err(err) => {
                        log::error!("Excluding {}: {:#}", sample.vcf.display(), err);
                        None
                    }
                };
                if s.send((index, row)).is_err() {
                    log::error!("Writer thread stopped before {}", sample.vcf.display());
                }
            });
    });

    writer_thread
        .join()
        .map_err(|_| anyhow!("Writer thread panicked"))?
}

type Row = (Vec<String>, FeatureRecord);

fn process_writer_thread<W: Write + Send + 'static>(
    mut writer: Writer<W>,
    receiver: Receiver<(usize, Option<Row>)>,
) -> thread::JoinHandle<Result<usize>> {
    thread::spawn(move || {
        let mut pending: BTreeMap<usize, Option<Row>> = BTreeMap::new();
        let mut next = 0;
        let mut written = 0;
        for (index, row) in &receiver {
            pending.insert(index, row);
            while let Some(row) = pending.remove(&next) {
                if let Some((leading, record)) = row {
                    write_feature_row(&mut writer, &leading, &record)?;
                    written += 1;
                }
                next += 1;
            }
        }
        log::debug!("All samples processed, exiting writer thread.");
        Ok(written)
    })
}

fn initialize_thread_pool(num_threads: usize) -> Result<rayon::ThreadPool> {
    log::info!("Starting job pool with {} thread(s)...", num_threads);
    ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| anyhow!("Failed to initialize thread pool: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_input_list() {
        let list = "# vcf fraction\n/data/a.vcf.gz\t0.01\n\n/data/b.vcf.gz 0.05\n";
        let samples = parse_input_list(Cursor::new(list)).unwrap();
        assert_eq!(
            samples,
            vec![
                TrainingSample {
                    vcf: PathBuf::from("/data/a.vcf.gz"),
                    contamination_fraction: 0.01
                },
                TrainingSample {
                    vcf: PathBuf::from("/data/b.vcf.gz"),
                    contamination_fraction: 0.05
                },
            ]
        );
    }

    #[test]
    fn input_list_errors_name_the_line() {
        let err = parse_input_list(Cursor::new("a.vcf.gz 0.1\nb.vcf.gz\n")).unwrap_err();
        assert!(err.to_string().contains("line 2"));
        let err = parse_input_list(Cursor::new("a.vcf.gz high\n")).unwrap_err();
        assert!(err.to_string().contains("Invalid contamination fraction 'high'"));
    }

    #[test]
    fn header_has_leading_columns() {
        let mut writer = tsv_writer(vec![]);
        write_header(&mut writer, &["sample"]).unwrap();
        let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(out.trim_end(), format!("sample\t{}", FEATURE_NAMES.join("\t")));
    }

    #[test]
    fn unreadable_samples_are_excluded() {
        let samples = vec![TrainingSample {
            vcf: PathBuf::from("/no/such/sample.vcf.gz"),
            contamination_fraction: 0.02,
        }];
        let loci = vec![GenomicRegion::new("chr1", 0, 1).unwrap()];
        let written = extract_training_rows(
            &samples,
            &loci,
            &ExtractOptions::default(),
            1,
            tsv_writer(std::io::sink()),
        )
        .unwrap();
        assert_eq!(written, 0);
    }
}
