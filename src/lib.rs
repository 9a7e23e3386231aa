#![allow(non_snake_case)]

pub mod data;
pub mod error;
pub mod evaluator;
pub mod experiment;
pub mod ga;
pub mod individual;
pub mod niching;
pub mod normalization;
pub mod param;
pub mod pareto;
pub mod population;
pub mod reference_points;
pub mod utils;
pub mod voting;

use crate::error::{NsgaError, Result};
use crate::evaluator::{Evaluator, FitnessEvaluator, SubsetScoreEvaluator};
use crate::experiment::{Experiment, RuntimeStats};
use crate::ga::{ga, LogObserver};
use crate::pareto::Direction;
use crate::voting::FrontResult;
use chrono::Local;
use data::Data;
use param::Param;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use log::debug;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Crate version followed by the git hash it was built from, when known
pub fn version() -> String {
    match option_env!("NSGA3FS_GIT_SHA") {
        Some(sha) => format!("{}#{}", env!("CARGO_PKG_VERSION"), sha),
        None => env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// Loads the dataset named by the parameters and runs the feature selection on it
pub fn run(param: &Param, running: Arc<AtomicBool>) -> Result<Experiment> {
    let mut data = Data::new();
    data.load_data(
        &param.data.X,
        &param.data.target,
        &param.data.delimiter,
        &param.data.sample_column,
    )?;
    cinfo!(param.general.display_colorful, "\x1b[2;97m{:?}\x1b[0m", data);

    run_on_data(&data, param, running)
}

/// Runs the feature selection on an in-memory dataset with the subset score evaluator
pub fn run_on_data(data: &Data, param: &Param, running: Arc<AtomicBool>) -> Result<Experiment> {
    let mut param = param.clone();
    param::validate(&mut param)?;

    let mut rng = ChaCha8Rng::seed_from_u64(param.general.seed);
    let model = SubsetScoreEvaluator::new(data, param.objectives.functions.clone(), &param.model, &mut rng)?;

    run_with_evaluator(
        &model,
        &param.objectives.resolved_names(),
        &param.objectives.resolved_directions(),
        &data.features,
        &param,
        running,
    )
}

/// Runs the feature selection with a custom evaluator
///
/// # Arguments
///
/// * `evaluator` - Computes the model objectives of an individual
/// * `objective_names` - Names of the objectives returned by `evaluator`
/// * `directions` - Directions of the objectives returned by `evaluator`
/// * `feature_names` - Names of the features, one per gene
/// * `param` - Parameters of the run (`num_features` and `feature_costs` append objectives)
/// * `running` - Cleared to stop the run at the next generation boundary
pub fn run_with_evaluator(
    evaluator: &dyn Evaluator,
    objective_names: &[String],
    directions: &[Direction],
    feature_names: &[String],
    param: &Param,
    running: Arc<AtomicBool>,
) -> Result<Experiment> {
    let start = std::time::Instant::now();
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();

    param::validate_nsga(param)?;
    if objective_names.len() != directions.len() {
        return Err(NsgaError::Config(format!(
            "{} objective names provided for {} directions",
            objective_names.len(),
            directions.len()
        )));
    }

    let fitness = FitnessEvaluator::new(
        evaluator,
        param.objectives.num_features,
        &param.data.feature_costs,
        feature_names.len(),
    )?;
    let (objective_names, directions) = fitness.objective_layout(objective_names, directions);
    if objective_names.is_empty() {
        return Err(NsgaError::Config("At least one objective is required.".to_string()));
    }
    for (i, name) in objective_names.iter().enumerate() {
        if objective_names[..i].contains(name) {
            return Err(NsgaError::Config(format!("Objective name '{}' is used twice.", name)));
        }
    }
    debug!("Objectives: {:?} {:?}", objective_names, directions);

    // Launch training
    let mut observer = LogObserver::new(param.general.display_colorful);
    let evolution = ga(&fitness, feature_names.len(), &directions, param, &mut observer, running)?;

    let result = FrontResult::new(
        &evolution.population,
        feature_names,
        &objective_names,
        &directions,
        param.voting.threshold,
        param.nsga.extreme_point_method,
    )?;

    let exec_time = start.elapsed().as_secs_f64();
    let experiment_name = param.general.save_exp.split('.').next().filter(|s| !s.is_empty()).unwrap_or("nsga3fs");

    Ok(Experiment {
        id: format!("{}_{}", experiment_name, timestamp),
        timestamp,
        version: version(),
        parameters: param.clone(),
        feature_names: feature_names.to_vec(),
        objective_names,
        directions,
        result,
        runtime_stats: RuntimeStats::from_evolution(&evolution, exec_time),
        trace: if param.general.keep_trace { Some(evolution.events) } else { None },
    })
}
