use crate::{
    cli::PredictArgs,
    commands::shared,
    locus,
    pipeline::ExtractOptions,
    regression::{ContaminationModel, RidgeModel},
    util::{self, Result},
};
use std::io::{self, Write};

pub fn predict(args: PredictArgs) -> Result<()> {
    let model = RidgeModel::load(&args.model)?;
    let loci = locus::load_loci(&args.loci)?;
    let options = ExtractOptions {
        em: args.em.params(),
        empty_fill: None,
    };

    let prediction = match shared::extract_sample(&args.vcf, args.sample.as_deref(), &loci, &options) {
        Ok(result) => Some(model.predict(&result.features.predictors())),
        Err(err) => util::log_warning(err.context("No prediction possible"), None),
    };

    let name = args
        .sample
        .clone()
        .unwrap_or_else(|| util::sample_name_from_path(&args.vcf));
    let mut out = io::stdout().lock();
    writeln!(out, "sample\tpredicted_contamination")?;
    match prediction {
        Some(value) => writeln!(out, "{}\t{}", name, value)?,
        None => writeln!(out, "{}\tNA", name)?,
    }
    Ok(())
}
