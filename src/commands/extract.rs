use crate::{
    cli::ExtractArgs,
    commands::shared,
    locus,
    pipeline::ExtractOptions,
    util::{self, Result},
};
use std::io;

pub fn extract(args: ExtractArgs) -> Result<()> {
    let loci = locus::load_loci(&args.loci)?;
    log::info!("Loaded {} loci from {}", loci.len(), args.loci.display());

    let options = ExtractOptions {
        em: args.em.params(),
        empty_fill: args.empty_fill,
    };
    let result = shared::extract_sample(&args.vcf, args.sample.as_deref(), &loci, &options)?;
    let name = args
        .sample
        .clone()
        .unwrap_or_else(|| util::sample_name_from_path(&args.vcf));

    match &args.output_path {
        Some(path) => {
            let mut writer = shared::tsv_writer_from_path(path)?;
            shared::write_header(&mut writer, &["sample"])?;
            shared::write_feature_row(&mut writer, &[name], &result.features)?;
        }
        None => {
            let mut writer = shared::tsv_writer(io::stdout().lock());
            shared::write_header(&mut writer, &["sample"])?;
            shared::write_feature_row(&mut writer, &[name], &result.features)?;
        }
    }
    Ok(())
}
