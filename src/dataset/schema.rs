use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// Label value for calls whose dispatched priority matched the true priority
pub const LABEL_CORRECT: &str = "Correct";

/// Label value for calls dispatched at the wrong priority
pub const LABEL_INCORRECT: &str = "Incorrect";

const AMBULANCE_TYPES: &[&str] = &["1", "2"]; // ALS, BLS

const BINARY_VALUES: &[&str] = &["0", "1"];

const PRIORITIES: &[&str] = &["1", "2", "3"];

const CLASS_VALUES: &[&str] = &[LABEL_CORRECT, LABEL_INCORRECT];

const SYMPTOMS: &[&str] = &[
    "Sick, non-specific",
    "Heart Problems",
    "Back pain",
    "Fire",
    "Diabetes",
    "Transport",
    "Car accident",
    "Environmental",
    "Falls",
    "Psychological",
    "Bleeding",
    "Abdominal pain",
    "Seizure",
    "Unknown",
    "Stroke",
    "Unconscious",
    "Trauma, non-specific",
    "Poisoning",
    "Allergic reaction",
    "Assault",
    "Head pain",
    "Bite",
    "Choking",
    "CPR",
    "Electrical",
    "Eye",
    "Gynecological",
];

/// Every feature the registry knows about, in registry order.
///
/// Names are the external identifiers used in dataset files and for feature
/// selection (`SERVICE_TIME_AT_CALL`, `CLASS`, ...).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Feature {
    AmbulanceType,
    ServiceTimeAtCall,
    TravelTimeToCall,
    TravelTimeToHospital,
    TravelTimeHospitalToHome,
    Queued,
    QueueTime,
    Symptoms,
    DispatcherPriority,
    TruePriority,
    DispatcherSurvivalProbability,
    TrueSurvivalProbability,
    Class,
}

impl Feature {
    /// Full descriptor for this feature
    pub fn descriptor(self) -> FeatureDescriptor {
        let (kind, source) = match self {
            Feature::AmbulanceType => (
                FeatureKind::categorical(AMBULANCE_TYPES),
                FeatureSource::column("Ambulance Type (1 for ALS 2 for BLS)"),
            ),
            Feature::ServiceTimeAtCall => {
                (FeatureKind::Numeric, FeatureSource::column("Service Time At Call"))
            }
            Feature::TravelTimeToCall => {
                (FeatureKind::Numeric, FeatureSource::column("Travel Time To Call"))
            }
            Feature::TravelTimeToHospital => (
                FeatureKind::Numeric,
                FeatureSource::column("Travel Time to Hospital"),
            ),
            Feature::TravelTimeHospitalToHome => (
                FeatureKind::Numeric,
                FeatureSource::column("Travel Time Hospital to Home"),
            ),
            // Redundant with QUEUE_TIME > 0, kept for parity with the call sheet.
            Feature::Queued => (
                FeatureKind::categorical(BINARY_VALUES),
                FeatureSource::column("Queued? (1=yes 0=no)"),
            ),
            Feature::QueueTime => (FeatureKind::Numeric, FeatureSource::column("Queue Time")),
            Feature::Symptoms => (
                FeatureKind::categorical(SYMPTOMS),
                FeatureSource::column("Call \"symptoms\""),
            ),
            Feature::DispatcherPriority => (
                FeatureKind::categorical(PRIORITIES),
                FeatureSource::column("Dispatched Priority"),
            ),
            Feature::TruePriority => (
                FeatureKind::categorical(PRIORITIES),
                FeatureSource::column("True Priority"),
            ),
            Feature::DispatcherSurvivalProbability => (
                FeatureKind::Numeric,
                FeatureSource::column("Dispatched-Based Survival Probability"),
            ),
            Feature::TrueSurvivalProbability => (
                FeatureKind::Numeric,
                FeatureSource::column("True-Based Survival Probability"),
            ),
            Feature::Class => (
                FeatureKind::categorical(CLASS_VALUES),
                FeatureSource::PriorityAgreement {
                    truth: "True Priority".to_string(),
                    dispatched: "Dispatched Priority".to_string(),
                },
            ),
        };

        FeatureDescriptor {
            name: self.to_string(),
            kind,
            source,
        }
    }
}

/// Semantic type of a feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureKind {
    /// Closed, ordered value set; stored as the 0-based index into `values`
    Categorical { values: Vec<String> },

    /// Continuous value
    Numeric,
}

impl FeatureKind {
    fn categorical(values: &[&str]) -> Self {
        FeatureKind::Categorical {
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// Where a feature's raw value comes from in a CSV row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSource {
    /// Read verbatim from the named header column
    Column(String),

    /// `Correct` when the two columns hold identical strings, `Incorrect` otherwise
    PriorityAgreement { truth: String, dispatched: String },
}

impl FeatureSource {
    fn column(name: &str) -> Self {
        FeatureSource::Column(name.to_string())
    }

    /// Header columns this source reads
    pub fn columns(&self) -> Vec<&str> {
        match self {
            FeatureSource::Column(name) => vec![name.as_str()],
            FeatureSource::PriorityAgreement { truth, dispatched } => {
                vec![truth.as_str(), dispatched.as_str()]
            }
        }
    }
}

/// Immutable description of one dataset column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    /// Feature name
    pub name: String,

    /// Categorical value set or numeric
    pub kind: FeatureKind,

    /// Source column or derivation rule
    pub source: FeatureSource,
}

impl FeatureDescriptor {
    /// Position of `raw` in the closed value set, `None` for numeric features
    /// and for values outside the set
    pub fn index_of(&self, raw: &str) -> Option<usize> {
        match &self.kind {
            FeatureKind::Categorical { values } => values.iter().position(|v| v == raw),
            FeatureKind::Numeric => None,
        }
    }

    /// Declared values, empty for numeric features
    pub fn values(&self) -> &[String] {
        match &self.kind {
            FeatureKind::Categorical { values } => values,
            FeatureKind::Numeric => &[],
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self.kind, FeatureKind::Categorical { .. })
    }
}

/// Registered schema variants
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SchemaKind {
    /// Call characteristics, priorities and survival probabilities
    #[default]
    Full,

    /// Call characteristics only
    CallOnly,
}

/// Ordered set of feature descriptors
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    features: Vec<FeatureDescriptor>,
}

impl Schema {
    /// Every registered feature, ending with CLASS
    pub fn full() -> Self {
        Self::from_features(&Feature::iter().collect::<Vec<_>>())
    }

    /// Ambulance, travel, queue and symptom features plus CLASS
    pub fn call_only() -> Self {
        Self::from_features(&[
            Feature::AmbulanceType,
            Feature::ServiceTimeAtCall,
            Feature::TravelTimeToCall,
            Feature::TravelTimeToHospital,
            Feature::TravelTimeHospitalToHome,
            Feature::Queued,
            Feature::QueueTime,
            Feature::Symptoms,
            Feature::Class,
        ])
    }

    /// Schema for a registered variant
    pub fn for_kind(kind: SchemaKind) -> Self {
        match kind {
            SchemaKind::Full => Self::full(),
            SchemaKind::CallOnly => Self::call_only(),
        }
    }

    /// Build a schema from a feature subset; order follows the registry and
    /// duplicates are dropped.
    pub fn from_features(features: &[Feature]) -> Self {
        let features = Feature::iter()
            .filter(|f| features.contains(f))
            .map(Feature::descriptor)
            .collect();
        Self { features }
    }

    pub fn features(&self) -> &[FeatureDescriptor] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Distinct header columns the schema reads, in first-use order
    pub fn source_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        for descriptor in &self.features {
            for column in descriptor.source.columns() {
                if !columns.contains(&column) {
                    columns.push(column);
                }
            }
        }
        columns
    }

    pub fn into_features(self) -> Vec<FeatureDescriptor> {
        self.features
    }
}
