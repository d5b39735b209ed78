use anyhow::Context;
use clap::{Parser, Subcommand};
use dispatch_eval::{
    config::{Config, LoggingConfig, CONFIG_PATH_ENV},
    dataset::{self, DatasetBuilder, DatasetFormat, Schema, SchemaKind},
    ml::{BaggingConfig, ClassificationHarness, CostMatrix, CostStrategy, LearnerKind},
    report::{self, ReportFormat},
};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "dispatch-eval", version)]
#[command(
    about = "Build dispatch-priority datasets and evaluate cost-sensitive classifiers",
    long_about = None
)]
struct Cli {
    /// Configuration file layered over the built-in defaults
    #[arg(short, long, global = true, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a labeled dataset from a CSV of call records and write it out
    Build {
        #[arg(value_name = "CSV")]
        csv: PathBuf,

        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Feature set: full or call_only
        #[arg(short, long)]
        schema: Option<SchemaKind>,

        /// Output format: arff or json
        #[arg(short, long, default_value_t = DatasetFormat::Arff)]
        format: DatasetFormat,

        /// Relation name recorded in the output
        #[arg(short, long)]
        relation: Option<String>,
    },

    /// Cross-validate a classifier under one or more cost matrices
    Classify {
        #[arg(value_name = "CSV")]
        csv: PathBuf,

        /// Cost matrix literal such as "[0 1; 2 0]"; repeat for a sweep
        #[arg(short = 'C', long = "cost", value_name = "MATRIX")]
        costs: Vec<String>,

        /// Number of cross-validation folds
        #[arg(short = 'k', long)]
        folds: Option<usize>,

        /// Seed for fold assignment and bagging
        #[arg(short, long)]
        seed: Option<u64>,

        /// Base learner: svm, logistic_regression, decision_tree, naive_bayes
        #[arg(short, long)]
        learner: Option<LearnerKind>,

        /// Wrap the learner in a bagging ensemble of this size
        #[arg(short, long, value_name = "SIZE")]
        bagging: Option<usize>,

        /// Cost strategy: reweight or minimize_expected_cost
        #[arg(long)]
        strategy: Option<CostStrategy>,

        /// Features to keep (comma separated, label included)
        #[arg(long, value_delimiter = ',')]
        features: Vec<String>,

        /// Feature set built from the CSV before selection
        #[arg(long)]
        schema: Option<SchemaKind>,

        /// Assign folds without stratifying by class
        #[arg(long)]
        no_stratify: bool,

        /// Report format: text or json
        #[arg(short, long, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config =
        Config::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging);

    tracing::debug!("dispatch-eval v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Build {
            csv,
            output,
            schema,
            format,
            relation,
        } => {
            let schema = schema.unwrap_or(config.dataset.schema);
            let relation = relation.unwrap_or(config.dataset.relation);

            let dataset = DatasetBuilder::new(Schema::for_kind(schema))
                .with_relation(relation)
                .build_from_path(&csv)
                .with_context(|| format!("Failed to build dataset from {}", csv.display()))?;

            dataset::write(&dataset, &output, format)
                .with_context(|| format!("Failed to write {}", output.display()))?;
        }

        Commands::Classify {
            csv,
            costs,
            folds,
            seed,
            learner,
            bagging,
            strategy,
            features,
            schema,
            no_stratify,
            format,
        } => {
            let evaluation = &mut config.evaluation;
            if let Some(folds) = folds {
                evaluation.folds = folds;
            }
            if let Some(seed) = seed {
                evaluation.seed = seed;
            }
            if let Some(learner) = learner {
                evaluation.learner = learner;
            }
            if let Some(size) = bagging {
                evaluation.bagging = Some(BaggingConfig {
                    size,
                    ..evaluation.bagging.clone().unwrap_or_default()
                });
            }
            if let Some(strategy) = strategy {
                evaluation.cost_strategy = strategy;
            }
            if no_stratify {
                evaluation.stratify = false;
            }
            if !costs.is_empty() {
                evaluation.cost_matrices = costs;
            }
            if !features.is_empty() {
                config.selection.features = features;
            }
            if let Some(schema) = schema {
                config.dataset.schema = schema;
            }
            config.check().context("Invalid options")?;

            let cost_matrices: Vec<CostMatrix> = config.evaluation.cost_matrices()?;

            let built = DatasetBuilder::new(Schema::for_kind(config.dataset.schema))
                .with_relation(config.dataset.relation.clone())
                .build_from_path(&csv)
                .with_context(|| format!("Failed to build dataset from {}", csv.display()))?;
            let selected = dataset::select(&built, &config.selection.features)?;

            let harness = ClassificationHarness::new(
                config.evaluation.learner_config(),
                config.evaluation.cross_validation(),
            );
            let results = harness
                .sweep(&selected, &cost_matrices)
                .context("Cross-validation failed")?;

            print!("{}", report::render(&selected.relation, &results, format)?);
        }
    }

    Ok(())
}

/// Log to stderr so reports on stdout stay clean
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
