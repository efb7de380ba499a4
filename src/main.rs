use abcontam::{
    cli::{init_verbose, Cli, Command},
    commands::{extract, predict, train, training_data},
    util::{handle_error_and_exit, Result},
};
use clap::Parser;

fn runner() -> Result<()> {
    let cli = Cli::parse();
    init_verbose(&cli);
    log::debug!("Running {} v{}", cli.command.name(), *abcontam::cli::FULL_VERSION);
    match cli.command {
        Command::Extract(args) => extract(args)?,
        Command::TrainingData(args) => training_data(args)?,
        Command::Train(args) => train(args)?,
        Command::Predict(args) => predict(args)?,
    }
    Ok(())
}

fn main() {
    if let Err(e) = runner() {
        handle_error_and_exit(e);
    }
}
