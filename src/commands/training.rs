use crate::{
    cli::TrainingDataArgs,
    commands::shared,
    locus,
    pipeline::ExtractOptions,
    util::Result,
};
use anyhow::anyhow;
use std::path::Path;

pub fn training_data(args: TrainingDataArgs) -> Result<()> {
    let options = ExtractOptions {
        em: args.em.params(),
        empty_fill: args.empty_fill,
    };
    write_training_table(
        &args.input_list,
        &args.loci,
        &args.output_path,
        &options,
        args.num_threads,
    )
}

/// Extracts every listed sample into a training table at `output_path`.
pub(crate) fn write_training_table(
    input_list: &Path,
    loci_path: &Path,
    output_path: &str,
    options: &ExtractOptions,
    num_threads: usize,
) -> Result<()> {
    let samples = shared::read_input_list(input_list)?;
    let loci = locus::load_loci(loci_path)?;
    log::info!(
        "Extracting features for {} samples over {} loci",
        samples.len(),
        loci.len()
    );

    let writer = shared::tsv_writer_from_path(output_path)?;
    let written = shared::extract_training_rows(&samples, &loci, options, num_threads, writer)?;
    if written == 0 {
        return Err(anyhow!("Feature extraction failed for every sample in {}", input_list.display()));
    }
    if written < samples.len() {
        log::warn!(
            "{} of {} samples were excluded from {}",
            samples.len() - written,
            samples.len(),
            output_path
        );
    }
    log::info!("Wrote {} training rows to {}", written, output_path);
    Ok(())
}
