use crate::dataset::{Schema, SchemaKind};
use crate::error::{AppError, Result};
use crate::ml::{
    BaggingConfig, CostMatrix, CostStrategy, CrossValidation, LearnerConfig, LearnerKind,
    SvmConfig,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

/// Environment variable naming an optional configuration file
pub const CONFIG_PATH_ENV: &str = "DISPATCH_EVAL_CONFIG";

/// Prefix for environment overrides, e.g. `DISPATCH_EVAL__EVALUATION__FOLDS=5`
pub const ENV_PREFIX: &str = "DISPATCH_EVAL";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Dataset construction
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Features retained before classification
    #[validate(nested)]
    pub selection: SelectionConfig,

    /// Cross-validation and learner settings
    #[validate(nested)]
    pub evaluation: EvaluationConfig,
}

impl Config {
    /// Load configuration from the embedded defaults, the file named by
    /// `DISPATCH_EVAL_CONFIG` and the environment
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).ok();
        Self::load_from(path.as_deref().map(Path::new))
    }

    /// Load configuration, layering an explicit file over the embedded defaults
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ));

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: Config = builder
            // Override with environment variables (prefix: DISPATCH_EVAL__)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.check()?;
        Ok(config)
    }

    /// Validate field constraints and cross-field rules
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        if let Some(bagging) = &self.evaluation.bagging {
            bagging.validate()?;
        }
        self.evaluation.cost_matrices()?;

        let schema = Schema::for_kind(self.dataset.schema);
        if let Some(missing) = self
            .selection
            .features
            .iter()
            .find(|name| !schema.features().iter().any(|f| &f.name == *name))
        {
            return Err(AppError::Configuration(format!(
                "selected feature {} is not built by the {} schema; set selection.features (or --features) to features of that schema",
                missing, self.dataset.schema
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Relation name written to ARFF output
    #[serde(default = "default_relation")]
    pub relation: String,

    /// Feature set built from the CSV
    #[serde(default)]
    pub schema: SchemaKind,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            relation: default_relation(),
            schema: SchemaKind::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SelectionConfig {
    /// Feature names to keep; must include the label
    #[validate(length(min = 1))]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EvaluationConfig {
    /// Number of cross-validation folds
    #[validate(range(min = 2))]
    pub folds: usize,

    /// Partitioning and resampling seed
    #[serde(default)]
    pub seed: u64,

    /// Base learner
    #[serde(default)]
    pub learner: LearnerKind,

    /// How costs influence the learner
    #[serde(default)]
    pub cost_strategy: CostStrategy,

    /// Stratify folds by class
    #[serde(default = "default_stratify")]
    pub stratify: bool,

    /// Cost matrix literals evaluated in order
    #[validate(length(min = 1))]
    pub cost_matrices: Vec<String>,

    /// Wrap the base learner in a bagging ensemble
    #[serde(default)]
    pub bagging: Option<BaggingConfig>,

    /// SVM hyperparameters
    #[serde(default)]
    #[validate(nested)]
    pub svm: SvmConfig,
}

impl EvaluationConfig {
    /// Parse every configured cost matrix literal
    pub fn cost_matrices(&self) -> Result<Vec<CostMatrix>> {
        self.cost_matrices
            .iter()
            .map(|literal| CostMatrix::parse(literal))
            .collect()
    }

    pub fn learner_config(&self) -> LearnerConfig {
        LearnerConfig {
            kind: self.learner,
            svm: self.svm.clone(),
            bagging: self.bagging.clone(),
            cost_strategy: self.cost_strategy,
        }
    }

    pub fn cross_validation(&self) -> CrossValidation {
        CrossValidation::new(self.folds, self.seed).with_stratify(self.stratify)
    }
}

fn default_log_filter() -> String {
    "dispatch_eval=info".to_string()
}

fn default_relation() -> String {
    crate::dataset::DEFAULT_RELATION.to_string()
}

fn default_stratify() -> bool {
    true
}
