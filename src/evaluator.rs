use crate::data::Data;
use crate::error::{EvaluationFailure, NsgaError, Result};
use crate::individual::Individual;
use crate::param;
use crate::pareto::Direction;
use crate::utils::{compute_auc_from_value, split_into_balanced_random_chunks, youden_threshold, ConfusionMatrix};
use log::{debug, warn};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Objective values of one individual, in objective name order
pub type ObjectiveVector = Vec<f64>;

/// Name of the objective counting selected features
pub const NUM_FEATURES_OBJECTIVE: &str = "num_features";
/// Name of the objective summing the cost of selected features
pub const FEATURE_COST_OBJECTIVE: &str = "feature_cost";

/// Computes the objective vector of an individual
///
/// Implementations must be pure: the same individual always yields the same vector.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, individual: &Individual) -> std::result::Result<ObjectiveVector, EvaluationFailure>;
}

impl<E: Evaluator + ?Sized> Evaluator for &E {
    fn evaluate(&self, individual: &Individual) -> std::result::Result<ObjectiveVector, EvaluationFailure> {
        (**self).evaluate(individual)
    }
}

//-----------------------------------------------------------------------------
// Configuration enums
//-----------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum ObjectiveFunction {
    auc,
    accuracy,
    sensitivity,
    specificity,
    mcc,
    f1_score,
    npv,
    ppv,
    g_mean,
    error_rate,
}

impl ObjectiveFunction {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectiveFunction::auc => "auc",
            ObjectiveFunction::accuracy => "accuracy",
            ObjectiveFunction::sensitivity => "sensitivity",
            ObjectiveFunction::specificity => "specificity",
            ObjectiveFunction::mcc => "mcc",
            ObjectiveFunction::f1_score => "f1_score",
            ObjectiveFunction::npv => "npv",
            ObjectiveFunction::ppv => "ppv",
            ObjectiveFunction::g_mean => "g_mean",
            ObjectiveFunction::error_rate => "error_rate",
        }
    }

    /// Direction in which the metric improves
    pub fn natural_direction(&self) -> Direction {
        match self {
            ObjectiveFunction::error_rate => Direction::minimize,
            _ => Direction::maximize,
        }
    }

    fn value(&self, cm: &ConfusionMatrix, auc: f64) -> f64 {
        match self {
            ObjectiveFunction::auc => auc,
            ObjectiveFunction::accuracy => cm.accuracy(),
            ObjectiveFunction::sensitivity => cm.sensitivity(),
            ObjectiveFunction::specificity => cm.specificity(),
            ObjectiveFunction::mcc => cm.mcc(),
            ObjectiveFunction::f1_score => cm.f1_score(),
            ObjectiveFunction::npv => cm.npv(),
            ObjectiveFunction::ppv => cm.ppv(),
            ObjectiveFunction::g_mean => cm.g_mean(),
            ObjectiveFunction::error_rate => 1.0 - cm.accuracy(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum ResamplingMethod {
    /// Threshold and metrics computed on the whole dataset
    none,
    /// Stratified train/test split
    holdout,
    /// Stratified k-fold, metrics averaged over the folds
    kfold,
}

/// What the evaluation pool does when an individual cannot be evaluated
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum FailurePolicy {
    /// Stop the run with the evaluation error
    abort,
    /// Retry once, then give the individual the worst possible fitness
    penalize,
}

//-----------------------------------------------------------------------------
// Subset score evaluator
//-----------------------------------------------------------------------------

/// Train and test sample indices of one resampling split
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Scores each sample with the sum of its selected feature values, cuts the score at the
/// Youden-optimal threshold of the train part and reports metrics on the test part
pub struct SubsetScoreEvaluator<'a> {
    data: &'a Data,
    functions: Vec<ObjectiveFunction>,
    splits: Vec<Split>,
}

impl<'a> SubsetScoreEvaluator<'a> {
    /// Builds the evaluator and fixes its resampling splits
    ///
    /// # Arguments
    ///
    /// * `data` - Dataset the individuals are scored on
    /// * `functions` - Objectives to compute, in order
    /// * `model` - Resampling parameters
    /// * `rng` - Random number generator used to draw the splits
    pub fn new(
        data: &'a Data,
        functions: Vec<ObjectiveFunction>,
        model: &param::Model,
        rng: &mut ChaCha8Rng,
    ) -> Result<SubsetScoreEvaluator<'a>> {
        if data.sample_len == 0 {
            return Err(NsgaError::Data("cannot evaluate individuals on an empty dataset".to_string()));
        }

        let splits = match model.resampling {
            ResamplingMethod::none => {
                let all: Vec<usize> = (0..data.sample_len).collect();
                vec![Split { train: all.clone(), test: all }]
            }
            ResamplingMethod::holdout => vec![holdout_split(data, model.holdout_ratio, rng)?],
            ResamplingMethod::kfold => kfold_splits(data, model.folds, rng)?,
        };
        debug!("{} resampling split(s) drawn ({:?})", splits.len(), model.resampling);

        Ok(SubsetScoreEvaluator { data, functions, splits })
    }

    pub fn splits(&self) -> &[Split] {
        &self.splits
    }
}

impl Evaluator for SubsetScoreEvaluator<'_> {
    fn evaluate(&self, individual: &Individual) -> std::result::Result<ObjectiveVector, EvaluationFailure> {
        let selected = individual.selected_features();
        if selected.is_empty() {
            return Err(EvaluationFailure::new(individual.id, "no feature selected"));
        }
        if let Some(j) = selected.iter().find(|j| **j >= self.data.feature_len) {
            return Err(EvaluationFailure::new(
                individual.id,
                format!("feature {} is out of the {} dataset features", j, self.data.feature_len),
            ));
        }

        let mut objectives = vec![0.0; self.functions.len()];
        for split in &self.splits {
            let y_train: Vec<u8> = split.train.iter().map(|&s| self.data.y[s]).collect();
            let y_test: Vec<u8> = split.test.iter().map(|&s| self.data.y[s]).collect();

            let threshold = youden_threshold(&self.data.subset_scores(&selected, &split.train), &y_train);
            let test_scores = self.data.subset_scores(&selected, &split.test);
            let cm = ConfusionMatrix::from_value(&test_scores, &y_test, threshold);
            let auc = compute_auc_from_value(&test_scores, &y_test);

            for (objective, function) in objectives.iter_mut().zip(&self.functions) {
                *objective += function.value(&cm, auc);
            }
        }

        let n_splits = self.splits.len() as f64;
        Ok(objectives.into_iter().map(|v| v / n_splits).collect())
    }
}

fn holdout_split(data: &Data, ratio: f64, rng: &mut ChaCha8Rng) -> Result<Split> {
    let (indices_class0, indices_class1) = data.class_indices();
    let mut train = Vec::new();
    let mut test = Vec::new();

    for mut indices in [indices_class0, indices_class1] {
        indices.shuffle(rng);
        let n_test = ((indices.len() as f64) * ratio).round() as usize;
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }

    if train.is_empty() || test.is_empty() {
        return Err(NsgaError::Config(format!(
            "holdout_ratio={:.3} leaves an empty train or test part on {} samples",
            ratio, data.sample_len
        )));
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok(Split { train, test })
}

fn kfold_splits(data: &Data, folds: usize, rng: &mut ChaCha8Rng) -> Result<Vec<Split>> {
    if folds < 2 || folds > data.sample_len {
        return Err(NsgaError::Config(format!(
            "{} folds cannot be drawn from {} samples",
            folds, data.sample_len
        )));
    }

    let (indices_class0, indices_class1) = data.class_indices();
    let class0_folds = split_into_balanced_random_chunks(indices_class0, folds, rng);
    let class1_folds = split_into_balanced_random_chunks(indices_class1, folds, rng);

    let validation_folds: Vec<Vec<usize>> = class0_folds
        .into_iter()
        .zip(class1_folds)
        .map(|(i0, i1)| i0.into_iter().chain(i1).collect())
        .collect();

    let mut splits = Vec::with_capacity(folds);
    for (i, test) in validation_folds.iter().enumerate() {
        if test.is_empty() {
            warn!("Fold #{} holds no sample and is skipped.", i + 1);
            continue;
        }
        let mut train: Vec<usize> = validation_folds
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .flat_map(|(_, fold)| fold.iter().copied())
            .collect();
        train.sort_unstable();
        let mut test = test.clone();
        test.sort_unstable();
        splits.push(Split { train, test });
    }
    Ok(splits)
}

//-----------------------------------------------------------------------------
// Fitness adapter
//-----------------------------------------------------------------------------

/// Wraps a model evaluator and appends the feature count and feature cost objectives
pub struct FitnessEvaluator<E: Evaluator> {
    inner: E,
    num_features: bool,
    feature_costs: Option<Vec<f64>>,
}

impl<E: Evaluator> FitnessEvaluator<E> {
    /// # Arguments
    ///
    /// * `inner` - Evaluator of the model objectives
    /// * `num_features` - Appends the number of selected features
    /// * `feature_costs` - Per-feature cost, appended as a summed objective when any entry is nonzero
    /// * `feature_len` - Number of features of the dataset
    ///
    /// # Errors
    ///
    /// Config error when costs are negative, non finite, or do not match the feature count
    pub fn new(inner: E, num_features: bool, feature_costs: &[f64], feature_len: usize) -> Result<FitnessEvaluator<E>> {
        if !feature_costs.is_empty() && feature_costs.len() != feature_len {
            return Err(NsgaError::Config(format!(
                "{} feature costs provided for {} features",
                feature_costs.len(),
                feature_len
            )));
        }

        let feature_costs = if feature_costs.iter().all(|c| *c == 0.0) {
            None
        } else if feature_costs.iter().any(|c| *c < 0.0 || !c.is_finite()) {
            return Err(NsgaError::Config("feature costs must be finite and >= 0".to_string()));
        } else {
            Some(feature_costs.to_vec())
        };

        Ok(FitnessEvaluator {
            inner,
            num_features,
            feature_costs,
        })
    }

    /// Names and directions of the appended objectives, in column order
    pub fn extra_objectives(&self) -> Vec<(String, Direction)> {
        let mut extra = Vec::new();
        if self.num_features {
            extra.push((NUM_FEATURES_OBJECTIVE.to_string(), Direction::minimize));
        }
        if self.feature_costs.is_some() {
            extra.push((FEATURE_COST_OBJECTIVE.to_string(), Direction::minimize));
        }
        extra
    }

    /// Full objective layout: the model objectives followed by the appended ones
    pub fn objective_layout(&self, names: &[String], directions: &[Direction]) -> (Vec<String>, Vec<Direction>) {
        let mut names = names.to_vec();
        let mut directions = directions.to_vec();
        for (name, direction) in self.extra_objectives() {
            names.push(name);
            directions.push(direction);
        }
        (names, directions)
    }
}

impl<E: Evaluator> Evaluator for FitnessEvaluator<E> {
    fn evaluate(&self, individual: &Individual) -> std::result::Result<ObjectiveVector, EvaluationFailure> {
        let mut objectives = self.inner.evaluate(individual)?;
        if self.num_features {
            objectives.push(individual.k() as f64);
        }
        if let Some(costs) = &self.feature_costs {
            let cost = individual
                .selected_features()
                .iter()
                .map(|j| costs.get(*j).copied().unwrap_or(0.0))
                .sum();
            objectives.push(cost);
        }
        Ok(objectives)
    }
}

//-----------------------------------------------------------------------------
// Evaluation pool
//-----------------------------------------------------------------------------

/// Objective vectors of one evaluation batch, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub fitness: Vec<(u64, ObjectiveVector)>,
    /// Individuals that received the penalty fitness
    pub failures: usize,
}

/// Fixed-size worker pool evaluating a batch of individuals
pub struct EvaluationPool {
    pool: rayon::ThreadPool,
    policy: FailurePolicy,
}

impl EvaluationPool {
    pub fn new(thread_number: usize, policy: FailurePolicy) -> Result<EvaluationPool> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(thread_number)
            .build()
            .map_err(|e| NsgaError::Config(format!("cannot build a pool of {} threads: {}", thread_number, e)))?;
        Ok(EvaluationPool { pool, policy })
    }

    /// Evaluates every individual and returns once all evaluations are complete
    ///
    /// # Arguments
    ///
    /// * `evaluator` - Objective evaluator
    /// * `individuals` - Batch to evaluate
    /// * `directions` - Direction of each objective, also fixing the expected vector length
    ///
    /// # Errors
    ///
    /// The first failure in batch order when the policy is `abort`
    pub fn evaluate_all<E: Evaluator + ?Sized>(
        &self,
        evaluator: &E,
        individuals: &[&Individual],
        directions: &[Direction],
    ) -> Result<EvaluationReport> {
        let outcomes: Vec<std::result::Result<(u64, ObjectiveVector, bool), EvaluationFailure>> =
            self.pool.install(|| {
                individuals
                    .par_iter()
                    .map(|individual| self.evaluate_one(evaluator, individual, directions))
                    .collect()
            });

        let mut report = EvaluationReport {
            fitness: Vec::with_capacity(outcomes.len()),
            failures: 0,
        };
        for outcome in outcomes {
            let (id, objectives, penalized) = outcome?;
            if penalized {
                report.failures += 1;
            }
            report.fitness.push((id, objectives));
        }
        Ok(report)
    }

    fn evaluate_one<E: Evaluator + ?Sized>(
        &self,
        evaluator: &E,
        individual: &Individual,
        directions: &[Direction],
    ) -> std::result::Result<(u64, ObjectiveVector, bool), EvaluationFailure> {
        let first = checked_evaluation(evaluator, individual, directions.len());
        let failure = match (first, self.policy) {
            (Ok(objectives), _) => return Ok((individual.id, objectives, false)),
            (Err(failure), FailurePolicy::abort) => return Err(failure),
            (Err(failure), FailurePolicy::penalize) => failure,
        };

        debug!("{} Retrying once.", failure);
        match checked_evaluation(evaluator, individual, directions.len()) {
            Ok(objectives) => Ok((individual.id, objectives, false)),
            Err(failure) => {
                warn!("{} The individual is given the worst fitness.", failure);
                Ok((individual.id, directions.iter().map(|d| d.worst()).collect(), true))
            }
        }
    }
}

fn checked_evaluation<E: Evaluator + ?Sized>(
    evaluator: &E,
    individual: &Individual,
    n_objectives: usize,
) -> std::result::Result<ObjectiveVector, EvaluationFailure> {
    let objectives = evaluator.evaluate(individual)?;
    if objectives.len() != n_objectives {
        return Err(EvaluationFailure::new(
            individual.id,
            format!("{} objective values returned, {} expected", objectives.len(), n_objectives),
        ));
    }
    if let Some(v) = objectives.iter().find(|v| !v.is_finite()) {
        return Err(EvaluationFailure::new(individual.id, format!("non finite objective value {}", v)));
    }
    Ok(objectives)
}
