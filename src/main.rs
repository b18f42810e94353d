use anyhow::{Context, Result};
use onset_resnet::cli::{parse_args, setup_logging, Cli, Commands};
use onset_resnet::data::{load_splits, load_test};
use onset_resnet::train::{evaluate_checkpoint, Split};
use onset_resnet::{Experiment, ExperimentConfig, FrozenParameters, TracingReporter};
use tracing::{error, info};

fn main() {
    let cli = parse_args();
    setup_logging(cli.verbose);

    let result = match &cli.command {
        None => run_train(&cli),
        Some(Commands::Evaluate { checkpoint }) => run_evaluate(&cli, checkpoint),
    };

    if let Err(e) = result {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<ExperimentConfig> {
    let base = match &cli.config {
        Some(path) => ExperimentConfig::load_json(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => ExperimentConfig::default(),
    };
    Ok(cli.apply(base))
}

fn run_train(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let splits = load_splits(&config.data)
        .with_context(|| format!("failed to load splits from {}", config.data.train.display()))?;

    let mut experiment = Experiment::new(config, FrozenParameters, TracingReporter)
        .context("failed to build the network")?;
    let summary = experiment.run(&splits).context("run failed")?;

    info!(
        best_val_auc = ?summary.best_val_auc,
        test_loss = summary.test.loss,
        test_auc = ?summary.test.auc,
        "run finished"
    );
    if let Some(path) = &summary.best_checkpoint {
        info!("best model saved to {}", path.display());
    }
    Ok(())
}

fn run_evaluate(cli: &Cli, checkpoint: &std::path::Path) -> Result<()> {
    let config = load_config(cli)?;
    let test = load_test(&config.data)
        .with_context(|| format!("failed to load test split from {}", config.data.test_inputs.display()))?;

    let report = evaluate_checkpoint(checkpoint, &test, config.batch_size, Split::Test)
        .with_context(|| format!("failed to evaluate {}", checkpoint.display()))?;

    info!(examples = report.examples, loss = report.loss, auc = ?report.auc, "test split");
    if let Some(cm) = &report.confusion {
        info!("Confusion Matrix - Test\n{cm}");
    }
    Ok(())
}
