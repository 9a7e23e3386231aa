/// End-to-End Integration Tests for the NSGA-III feature selection
///
/// These tests validate the complete workflow:
/// 1. Building or loading a dataset
/// 2. Running the generational loop with the subset score evaluator or a custom one
/// 3. Verifying the front, the majority vote and the runtime statistics
/// 4. Testing serialization/deserialization of the experiment
///
/// Run with: cargo test --test test_feature_selection_e2e -- --nocapture
use nsga3fs::data::Data;
use nsga3fs::error::{EvaluationFailure, NsgaError};
use nsga3fs::evaluator::{Evaluator, FailurePolicy, ObjectiveFunction, ObjectiveVector, ResamplingMethod};
use nsga3fs::experiment::Experiment;
use nsga3fs::individual::Individual;
use nsga3fs::param::Param;
use nsga3fs::pareto::{dominates, Direction};
use nsga3fs::{run, run_on_data, run_with_evaluator};
use std::collections::HashSet;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Helper function to create small parameters
fn create_params(population_size: usize, max_generations: usize) -> Param {
    let mut param = Param::default();

    param.general.seed = 42;
    param.general.thread_number = 2;
    param.general.display_colorful = false;
    param.general.keep_trace = true;

    param.nsga.population_size = population_size;
    param.nsga.max_generations = max_generations;
    param.nsga.mutation_rate = 0.1;

    param
}

/// Three features, f0 informative, f1 noisy, f2 weakly informative
fn create_three_feature_data() -> Data {
    Data::from_matrix(
        vec!["f0".to_string(), "f1".to_string(), "f2".to_string()],
        vec![
            vec![0.1, 0.9, 0.2],
            vec![0.3, 0.2, 0.1],
            vec![0.2, 0.5, 0.6],
            vec![0.4, 0.7, 0.3],
            vec![0.8, 0.1, 0.5],
            vec![0.9, 0.6, 0.4],
            vec![0.7, 0.3, 0.9],
            vec![0.6, 0.8, 0.7],
        ],
        vec![0, 0, 0, 0, 1, 1, 1, 1],
    )
    .unwrap()
}

fn assert_front_is_non_dominated(experiment: &Experiment) {
    let table = &experiment.result.front.fitness_table;
    for a in table {
        for b in table {
            assert!(!dominates(a, b, &experiment.directions), "{:?} dominates {:?} inside the front", a, b);
        }
    }
}

/// Minimizes the Hamming distance to a hidden subset
struct HiddenSubsetEvaluator {
    target: Vec<u8>,
}

impl Evaluator for HiddenSubsetEvaluator {
    fn evaluate(&self, individual: &Individual) -> Result<ObjectiveVector, EvaluationFailure> {
        let distance = individual
            .genes
            .iter()
            .zip(&self.target)
            .filter(|(a, b)| a != b)
            .count();
        Ok(vec![distance as f64])
    }
}

/// Fails on every individual selecting the first feature
struct FirstFeatureCrashes;

impl Evaluator for FirstFeatureCrashes {
    fn evaluate(&self, individual: &Individual) -> Result<ObjectiveVector, EvaluationFailure> {
        if individual.genes[0] == 1 {
            Err(EvaluationFailure::new(individual.id, "model did not converge"))
        } else {
            Ok(vec![individual.k() as f64 * 0.1])
        }
    }
}

#[test]
fn test_three_features_one_generation() {
    let data = create_three_feature_data();
    let mut param = create_params(4, 1);
    param.objectives.functions = vec![ObjectiveFunction::error_rate];
    param.objectives.num_features = true;

    let experiment = run_on_data(&data, &param, Arc::new(AtomicBool::new(true))).unwrap();

    assert_eq!(experiment.objective_names, vec!["error_rate", "num_features"]);
    assert_eq!(experiment.directions, vec![Direction::minimize, Direction::minimize]);

    let result = &experiment.result;
    assert!(!result.is_empty() && result.len() <= 4, "front size must be in [1, 4], got {}", result.len());

    assert_eq!(result.majority_vote.votes.len(), 3);
    for vote in &result.majority_vote.votes {
        assert!((0.0..=1.0).contains(&vote.vote), "vote {} out of [0, 1]", vote.vote);
    }

    let names: HashSet<&String> = data.features.iter().collect();
    for view in &result.per_individual {
        assert!(!view.selected_feature_names.is_empty());
        assert!(view.selected_feature_names.iter().all(|f| names.contains(f)));
        assert_eq!(view.objective_values.len(), 2);
    }
    assert_front_is_non_dominated(&experiment);

    assert_eq!(experiment.runtime_stats.generations, 1);
    assert_eq!(experiment.runtime_stats.evaluations, 8, "4 initial individuals and 4 children");
    assert_eq!(experiment.trace.as_ref().map(|t| t.len()), Some(2));
}

#[test]
fn test_kfold_auc_run_with_feature_costs() {
    let data = create_three_feature_data();
    let mut param = create_params(12, 5);
    param.objectives.functions = vec![ObjectiveFunction::auc];
    param.model.resampling = ResamplingMethod::kfold;
    param.model.folds = 2;
    param.data.feature_costs = vec![1.0, 0.5, 2.0];

    let experiment = run_on_data(&data, &param, Arc::new(AtomicBool::new(true))).unwrap();

    assert_eq!(experiment.objective_names, vec!["auc", "num_features", "feature_cost"]);
    assert_eq!(experiment.runtime_stats.reference_points, 15, "three objectives use a 15-point lattice");
    assert_eq!(experiment.result.objective_summary.len(), 3);
    for row in &experiment.result.front.fitness_table {
        assert!((0.0..=1.0).contains(&row[0]));
        assert!(row[1] >= 1.0 && row[1] <= 3.0);
    }
    assert_front_is_non_dominated(&experiment);
}

#[test]
fn test_custom_evaluator_converges_to_hidden_subset() {
    let target = vec![1, 0, 1, 1, 0, 0, 1, 0, 0, 1];
    let feature_names: Vec<String> = (0..target.len()).map(|j| format!("feature_{}", j)).collect();
    let evaluator = HiddenSubsetEvaluator { target: target.clone() };

    let mut param = create_params(20, 40);
    param.objectives.num_features = false;

    let experiment = run_with_evaluator(
        &evaluator,
        &["distance".to_string()],
        &[Direction::minimize],
        &feature_names,
        &param,
        Arc::new(AtomicBool::new(true)),
    )
    .unwrap();

    let best = experiment.result.front.fitness_table.iter().map(|row| row[0]).fold(f64::INFINITY, f64::min);
    assert!(best <= 1.0, "the search should get within one flip of the hidden subset, got {}", best);
    assert_eq!(experiment.runtime_stats.reference_points, 1);
}

#[test]
fn test_csv_file_run() {
    let path = std::env::temp_dir().join(format!("nsga3fs_e2e_{}.csv", std::process::id()));
    {
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "sample,f0,f1,f2,outcome").unwrap();
        let data = create_three_feature_data();
        for (i, row) in data.X.iter().enumerate() {
            writeln!(file, "s{},{},{},{},{}", i, row[0], row[1], row[2], data.y[i]).unwrap();
        }
    }

    let mut param = create_params(6, 3);
    param.data.X = path.to_string_lossy().to_string();
    param.data.delimiter = ",".to_string();
    param.data.target = "outcome".to_string();
    param.data.sample_column = "sample".to_string();
    param.objectives.functions = vec![ObjectiveFunction::accuracy];

    let experiment = run(&param, Arc::new(AtomicBool::new(true))).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(experiment.feature_names, vec!["f0", "f1", "f2"]);
    assert!(!experiment.result.is_empty());
}

#[test]
fn test_missing_file_is_an_error() {
    let mut param = create_params(4, 1);
    param.data.X = "does/not/exist.tsv".to_string();
    assert!(run(&param, Arc::new(AtomicBool::new(true))).is_err());
}

#[test]
fn test_abort_policy_stops_the_run() {
    let mut param = create_params(8, 3);
    param.nsga.failure_policy = FailurePolicy::abort;
    let feature_names: Vec<String> = (0..4).map(|j| format!("f{}", j)).collect();

    let result = run_with_evaluator(
        &FirstFeatureCrashes,
        &["loss".to_string()],
        &[Direction::minimize],
        &feature_names,
        &param,
        Arc::new(AtomicBool::new(true)),
    );
    assert!(matches!(result, Err(NsgaError::Evaluation(_))));
}

#[test]
fn test_penalize_policy_discards_failing_individuals() {
    let mut param = create_params(8, 3);
    param.nsga.failure_policy = FailurePolicy::penalize;
    param.objectives.num_features = false;
    let feature_names: Vec<String> = (0..4).map(|j| format!("f{}", j)).collect();

    let experiment = run_with_evaluator(
        &FirstFeatureCrashes,
        &["loss".to_string()],
        &[Direction::minimize],
        &feature_names,
        &param,
        Arc::new(AtomicBool::new(true)),
    )
    .unwrap();

    assert!(experiment.runtime_stats.failures > 0);
    for individual in &experiment.result.front.individuals {
        assert_eq!(individual.genes[0], 0, "penalized individuals cannot reach the front");
    }
}

#[test]
fn test_cleared_running_flag_returns_initial_population() {
    let data = create_three_feature_data();
    let param = create_params(4, 100);
    let running = Arc::new(AtomicBool::new(true));
    running.store(false, Ordering::Relaxed);

    let experiment = run_on_data(&data, &param, running).unwrap();
    assert!(experiment.runtime_stats.interrupted);
    assert_eq!(experiment.runtime_stats.generations, 0);
    assert!(!experiment.result.is_empty());
}

#[test]
fn test_same_seed_same_front() {
    let data = create_three_feature_data();
    let param = create_params(10, 4);

    let first = run_on_data(&data, &param, Arc::new(AtomicBool::new(true))).unwrap();
    let second = run_on_data(&data, &param, Arc::new(AtomicBool::new(true))).unwrap();

    assert_eq!(first.result.front.individuals, second.result.front.individuals);
    assert_eq!(first.result.majority_vote, second.result.majority_vote);
}

#[test]
fn test_invalid_parameters_are_rejected() {
    let data = create_three_feature_data();

    let mut param = create_params(4, 1);
    param.data.feature_costs = vec![1.0, 2.0];
    assert!(matches!(
        run_on_data(&data, &param, Arc::new(AtomicBool::new(true))),
        Err(NsgaError::Config(_))
    ));

    let mut param = create_params(4, 1);
    param.data.feature_costs = vec![0.0, 0.0];
    assert!(matches!(
        run_on_data(&data, &param, Arc::new(AtomicBool::new(true))),
        Err(NsgaError::Config(_))
    ));

    let mut param = create_params(1, 1);
    param.objectives.functions = vec![ObjectiveFunction::auc];
    assert!(matches!(
        run_on_data(&data, &param, Arc::new(AtomicBool::new(true))),
        Err(NsgaError::Config(_))
    ));
}

#[test]
fn test_experiment_serialization() {
    let data = create_three_feature_data();
    let param = create_params(6, 2);
    let experiment = run_on_data(&data, &param, Arc::new(AtomicBool::new(true))).unwrap();

    let path = std::env::temp_dir().join(format!("nsga3fs_e2e_{}.bin", std::process::id()));
    experiment.save_auto(&path).unwrap();
    let loaded = Experiment::load_auto(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded, experiment);
    assert!(loaded.display_results().contains("Pareto front"));
}

#[test]
fn test_shipped_parameter_file_runs() {
    let mut param = nsga3fs::param::get("param.yaml".to_string()).unwrap();
    param.nsga.population_size = 8;
    param.nsga.max_generations = 2;
    param.general.display_colorful = false;

    let experiment = run(&param, Arc::new(AtomicBool::new(true))).unwrap();
    assert_eq!(experiment.objective_names, vec!["auc", "specificity", "num_features"]);
    assert_eq!(experiment.feature_names.len(), 5);
    assert_front_is_non_dominated(&experiment);
}
