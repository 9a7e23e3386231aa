use crate::error::{NsgaError, Result};
use crate::evaluator::{FailurePolicy, ObjectiveFunction, ResamplingMethod};
use crate::normalization::ExtremePointMethod;
use crate::pareto::Direction;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;

// Field definitions and associated default values

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Param {
    #[serde(default)]
    pub general: General,
    #[serde(default)]
    pub data: Data,
    #[serde(default)]
    pub nsga: NSGA,
    #[serde(default)]
    pub objectives: Objectives,
    #[serde(default)]
    pub model: Model,
    #[serde(default)]
    pub voting: Voting,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct General {
    #[serde(default = "seed_default")]
    pub seed: u64,
    #[serde(default = "one_default")]
    pub thread_number: usize,
    #[serde(default = "log_base_default")]
    pub log_base: String,
    #[serde(default = "log_suffix_default")]
    pub log_suffix: String,
    #[serde(default = "log_level_default")]
    pub log_level: String,
    #[serde(default = "true_default")]
    pub display_colorful: bool,
    #[serde(default = "true_default")]
    pub keep_trace: bool,
    #[serde(default = "empty_string")]
    pub save_exp: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[allow(non_snake_case)]
pub struct Data {
    /// Delimited file, one sample per row, one feature per column
    #[serde(default = "empty_string")]
    pub X: String,
    /// Name of the column holding the binary class (0/1)
    #[serde(default = "target_default")]
    pub target: String,
    #[serde(default = "delimiter_default")]
    pub delimiter: String,
    /// Optional column naming samples; row numbers are used otherwise
    #[serde(default = "empty_string")]
    pub sample_column: String,
    /// Per-feature cost, appended as an objective when any entry is nonzero
    #[serde(default = "empty_vec")]
    pub feature_costs: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NSGA {
    #[serde(default = "pop_size_default")]
    pub population_size: usize,
    #[serde(default = "max_generations_default")]
    pub max_generations: usize,
    #[serde(default = "mutation_rate_default")]
    pub mutation_rate: f64,
    #[serde(default = "extreme_point_method_default")]
    pub extreme_point_method: ExtremePointMethod,
    #[serde(default = "max_reference_points_default")]
    pub max_reference_points: usize,
    #[serde(default = "failure_policy_default")]
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Objectives {
    #[serde(default = "functions_default")]
    pub functions: Vec<ObjectiveFunction>,
    /// Names of the objectives, defaults to the function names
    #[serde(default = "empty_vec")]
    pub names: Vec<String>,
    /// Directions of the objectives, defaults to each function's natural direction
    #[serde(default = "empty_vec")]
    pub directions: Vec<Direction>,
    /// Appends the number of selected features as a minimized objective
    #[serde(default = "true_default")]
    pub num_features: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Model {
    #[serde(default = "resampling_default")]
    pub resampling: ResamplingMethod,
    #[serde(default = "folds_default")]
    pub folds: usize,
    #[serde(default = "holdout_ratio_default")]
    pub holdout_ratio: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Voting {
    #[serde(default = "half_default")]
    pub threshold: f64,
}

// Default section definitions

impl Default for General {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Data {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for NSGA {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Objectives {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Model {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Voting {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Param {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Param {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Objectives {
    /// Names of the configured objective functions, extra objectives excluded
    pub fn resolved_names(&self) -> Vec<String> {
        if self.names.is_empty() {
            self.functions.iter().map(|f| f.name().to_string()).collect()
        } else {
            self.names.clone()
        }
    }

    /// Directions of the configured objective functions, extra objectives excluded
    pub fn resolved_directions(&self) -> Vec<Direction> {
        if self.directions.is_empty() {
            self.functions.iter().map(|f| f.natural_direction()).collect()
        } else {
            self.directions.clone()
        }
    }
}

pub fn get(param_file: String) -> Result<Param> {
    let param_file_reader = File::open(param_file)?;
    let param_reader = BufReader::new(param_file_reader);

    let mut config: Param = serde_yaml::from_reader(param_reader)?;

    validate(&mut config)?;

    Ok(config)
}

pub fn validate(param: &mut Param) -> Result<()> {
    if param.general.log_base.len() > 0 {
        param.general.display_colorful = false;
    }

    if param.general.thread_number == 0 {
        return Err(NsgaError::Config("thread_number must be at least 1.".to_string()));
    }

    validate_nsga(param)?;
    validate_objectives(param)?;
    validate_model(param)?;

    if !(0.0..=1.0).contains(&param.voting.threshold) {
        return Err(NsgaError::Config(format!(
            "Invalid voting threshold={:.3}. Must be in range [0, 1].",
            param.voting.threshold
        )));
    }

    if param.data.feature_costs.iter().any(|c| *c < 0.0 || !c.is_finite()) {
        return Err(NsgaError::Config("Feature costs must be finite and >= 0.".to_string()));
    }

    Ok(())
}

pub(crate) fn validate_nsga(param: &Param) -> Result<()> {
    if param.nsga.population_size < 2 {
        return Err(NsgaError::Config(format!(
            "Invalid population_size={}. At least 2 individuals are required for cross-over.",
            param.nsga.population_size
        )));
    }

    if !(0.0..=1.0).contains(&param.nsga.mutation_rate) {
        return Err(NsgaError::Config(format!(
            "Invalid mutation_rate={:.3}. Must be in range [0, 1].",
            param.nsga.mutation_rate
        )));
    }

    if param.nsga.max_reference_points == 0 {
        return Err(NsgaError::Config("max_reference_points must be at least 1.".to_string()));
    }

    if param.nsga.max_generations == 0 {
        warn!("max_generations=0: the initial population will be returned without evolution.");
    }

    Ok(())
}

fn validate_objectives(param: &Param) -> Result<()> {
    let objectives = &param.objectives;

    if objectives.functions.is_empty() && !objectives.num_features && param.data.feature_costs.iter().all(|c| *c == 0.0) {
        return Err(NsgaError::Config("At least one objective is required.".to_string()));
    }

    if !objectives.names.is_empty() && objectives.names.len() != objectives.functions.len() {
        return Err(NsgaError::Config(format!(
            "{} objective names provided for {} objective functions.",
            objectives.names.len(),
            objectives.functions.len()
        )));
    }

    if !objectives.directions.is_empty() && objectives.directions.len() != objectives.functions.len() {
        return Err(NsgaError::Config(format!(
            "{} objective directions provided for {} objective functions.",
            objectives.directions.len(),
            objectives.functions.len()
        )));
    }

    let names = objectives.resolved_names();
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(NsgaError::Config(format!("Objective name '{}' is used twice.", name)));
        }
    }

    for (function, direction) in objectives.functions.iter().zip(objectives.resolved_directions()) {
        if function.natural_direction() != direction {
            warn!(
                "Objective {} is set to {:?} while its natural direction is {:?}.",
                function.name(),
                direction,
                function.natural_direction()
            );
        }
    }

    Ok(())
}

fn validate_model(param: &Param) -> Result<()> {
    match param.model.resampling {
        ResamplingMethod::kfold if param.model.folds < 2 => Err(NsgaError::Config(format!(
            "Invalid folds={}. k-fold resampling requires at least 2 folds.",
            param.model.folds
        ))),
        ResamplingMethod::holdout if !(param.model.holdout_ratio > 0.0 && param.model.holdout_ratio < 1.0) => {
            Err(NsgaError::Config(format!(
                "Invalid holdout_ratio={:.3}. Must be in range (0, 1).",
                param.model.holdout_ratio
            )))
        }
        _ => Ok(()),
    }
}

// Default value definitions

fn seed_default() -> u64 {
    4815162342
}
fn empty_string() -> String {
    "".to_string()
}
fn empty_vec<T>() -> Vec<T> {
    Vec::new()
}
fn target_default() -> String {
    "class".to_string()
}
fn delimiter_default() -> String {
    "\t".to_string()
}
fn log_base_default() -> String {
    "".to_string()
}
fn log_suffix_default() -> String {
    "log".to_string()
}
fn log_level_default() -> String {
    "info".to_string()
}
fn true_default() -> bool {
    true
}
fn one_default() -> usize {
    1
}
fn half_default() -> f64 {
    0.5
}
fn pop_size_default() -> usize {
    100
}
fn max_generations_default() -> usize {
    100
}
fn mutation_rate_default() -> f64 {
    0.05
}
fn extreme_point_method_default() -> ExtremePointMethod {
    ExtremePointMethod::axis_max
}
fn max_reference_points_default() -> usize {
    100_000
}
fn failure_policy_default() -> FailurePolicy {
    FailurePolicy::penalize
}
fn functions_default() -> Vec<ObjectiveFunction> {
    vec![ObjectiveFunction::auc]
}
fn resampling_default() -> ResamplingMethod {
    ResamplingMethod::none
}
fn folds_default() -> usize {
    5
}
fn holdout_ratio_default() -> f64 {
    0.2
}
