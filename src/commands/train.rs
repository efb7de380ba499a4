use crate::{
    cli::TrainArgs,
    commands::training,
    pipeline::ExtractOptions,
    regression::{self, RidgeModel},
    util::Result,
};
use anyhow::anyhow;
use itertools::Itertools;
use std::path::{Path, PathBuf};

pub fn train(args: TrainArgs) -> Result<()> {
    let table = match (&args.training_data, &args.input_list) {
        (Some(path), _) => path.clone(),
        (None, Some(input_list)) => {
            let (loci, extracted) = match (&args.loci, &args.extracted_features) {
                (Some(loci), Some(extracted)) => (loci, extracted),
                _ => return Err(anyhow!("--inputlist needs --loci and --extracted-features")),
            };
            let options = ExtractOptions {
                em: args.em.params(),
                empty_fill: None,
            };
            training::write_training_table(input_list, loci, extracted, &options, args.num_threads)?;
            PathBuf::from(extracted)
        }
        (None, None) => return Err(anyhow!("Either --training-data or --inputlist is required")),
    };

    let (x, y) = regression::read_training_table(&table)?;
    log::info!("Fitting model on {} samples from {}", y.len(), table.display());
    let model = RidgeModel::fit(&x, &y, args.lambda)?;
    log::debug!(
        "Coefficients: {}",
        model
            .predictors
            .iter()
            .zip(&model.coefficients)
            .map(|(name, coef)| format!("{}={:.4}", name, coef))
            .join(", ")
    );
    model.save(Path::new(&args.output_path))?;
    log::info!("Model written to {}", args.output_path);
    Ok(())
}
